//! Two-lock transfer: deadlock on inconsistent acquisition order, fixed
//! by a single global order.
//!
//! Two workers move money between two accounts. With `Inconsistent` each
//! worker grabs its own account first; a rendezvous between the first and
//! second acquisition guarantees both hold one lock and want the other,
//! so the run genuinely deadlocks and is reported as a timeout. With
//! `Global` both workers acquire the accounts in the same fixed order and
//! the run completes well inside the same bound.

use std::sync::{Arc, Barrier, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};

use crate::{klog_debug, Error, Result};

/// Lock acquisition order for the transfer workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOrder {
    /// Each worker locks its own account first. Deadlocks.
    Inconsistent,
    /// Both workers lock the accounts in one fixed order. Safe.
    Global,
}

impl std::fmt::Display for LockOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockOrder::Inconsistent => write!(f, "inconsistent"),
            LockOrder::Global => write!(f, "global"),
        }
    }
}

type Account = Arc<Mutex<i64>>;

/// Run two opposing transfers under the given acquisition order.
///
/// # Errors
///
/// Returns `Error::Timeout` when the workers fail to finish within
/// `timeout`, the expected outcome for `LockOrder::Inconsistent`. The
/// deadlocked worker threads are detached and leaked, never joined; a
/// deadlocked thread cannot be recovered.
pub fn run_transfers(order: LockOrder, timeout: Duration) -> Result<()> {
    let alpha: Account = Arc::new(Mutex::new(100));
    let beta: Account = Arc::new(Mutex::new(100));
    // Rendezvous between first and second acquisition forces both workers
    // to hold one lock before either tries for the other.
    let gate = Arc::new(Barrier::new(2));
    let (done_tx, done_rx) = bounded(2);

    match order {
        LockOrder::Inconsistent => {
            spawn_transfer(alpha.clone(), beta.clone(), 25, Some(gate.clone()), done_tx.clone());
            spawn_transfer(beta, alpha, 10, Some(gate), done_tx);
        }
        LockOrder::Global => {
            spawn_transfer(alpha.clone(), beta.clone(), 25, None, done_tx.clone());
            spawn_transfer(alpha, beta, -10, None, done_tx);
        }
    }

    let deadline = Instant::now() + timeout;
    for _ in 0..2 {
        done_rx
            .recv_deadline(deadline)
            .map_err(|_| Error::Timeout(timeout))?;
    }
    klog_debug!("transfers completed under {} order", order);
    Ok(())
}

/// Spawn one detached transfer worker: lock `first`, optionally wait at
/// the gate, lock `second`, move `amount` from first to second.
fn spawn_transfer(
    first: Account,
    second: Account,
    amount: i64,
    gate: Option<Arc<Barrier>>,
    done: Sender<()>,
) {
    std::thread::spawn(move || {
        let mut from = lock(&first);
        if let Some(gate) = &gate {
            gate.wait();
        }
        let mut to = lock(&second);
        *from -= amount;
        *to += amount;
        drop(to);
        drop(from);
        let _ = done.send(());
    });
}

fn lock(account: &Account) -> MutexGuard<'_, i64> {
    account.lock().unwrap_or_else(|e| e.into_inner())
}
