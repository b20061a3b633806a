//! Shared-state synchronization patterns, each separately testable.
//!
//! The three counter paths (unsynchronized, mutex, atomic) are kept as
//! distinct types on purpose; the contrast between them is the point.

pub mod counter;
pub mod deadlock;
pub mod rendezvous;

pub use counter::{AtomicCounter, MutexCounter, RacyCounter, SharedCounter};
pub use deadlock::LockOrder;
pub use rendezvous::RendezvousReport;
