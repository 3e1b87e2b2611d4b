//! Per-account serialization of nonce use
//!
//! A nonce is read from the node when a transaction is built and only
//! consumed once it is broadcast. Two in-flight requests for the same
//! account would otherwise read the same value.

use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Registry of one async mutex per account.
///
/// Hold the guard from nonce fetch through broadcast. Waiters are served
/// in FIFO order; different accounts never block each other.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    locks: Arc<DashMap<Address, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, account: Address) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(
            &self
                .locks
                .entry(account)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        let guard = lock.lock_owned().await;
        debug!(%account, "account lock acquired");
        guard
    }

    /// Number of accounts seen so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
