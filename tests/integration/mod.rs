//! Integration test suite for koan.
//!
//! These tests verify the properties of the concurrency patterns
//! themselves, not just unit behavior: that the unsynchronized counter
//! really races, that the deadlock really deadlocks, that stealing and
//! partitioning lose no work, and that the dispatcher's ordering,
//! isolation, and cancellation contracts hold under real threads.
//!
//! # Test Categories
//!
//! - `counters`: racy vs synchronized vs atomic increment experiments
//! - `deadlock`: deadlock reproduction and the ordered fix
//! - `dispatcher`: worker pool ordering, failure policies, shutdown
//! - `distribution`: static partitioning and work stealing
//! - `rendezvous`: barrier all-or-none release
//!
//! # CI Compatibility
//!
//! The deadlock test deliberately burns its 2 second timeout and leaks
//! two blocked threads; everything else finishes in milliseconds.

mod fixtures;

mod dispatcher;
mod distribution;
mod rendezvous;
