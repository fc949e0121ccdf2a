use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::{LedgerError, Result};

/// Default wait before a posting gives up on a busy account.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Keyed async mutexes serializing ledger writes per account.
///
/// Two holders of the same account key exclude each other; different keys
/// never contend. An entry lives only while someone holds or waits for it.
#[derive(Debug)]
pub struct AccountLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
    timeout: Duration,
}

/// Exclusive ownership of one account. Releasing it evicts the entry when
/// nobody else is waiting.
#[derive(Debug)]
pub struct AccountLockGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a AccountLocks,
    account_id: String,
}

impl Drop for AccountLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.evict_if_idle(&self.account_id);
    }
}

impl AccountLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Waits for exclusive ownership of `account_id`, up to the configured timeout.
    pub async fn acquire(&self, account_id: &str) -> Result<AccountLockGuard<'_>> {
        let lock = self
            .locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(AccountLockGuard {
                guard: Some(guard),
                locks: self,
                account_id: account_id.to_string(),
            }),
            Err(_) => {
                self.evict_if_idle(account_id);
                Err(LedgerError::LockTimeout {
                    account_id: account_id.to_string(),
                    waited_ms: self.timeout.as_millis() as u64,
                }
                .into())
            }
        }
    }

    // The map holds the only reference once no guard or waiter is left.
    fn evict_if_idle(&self, account_id: &str) {
        self.locks
            .remove_if(account_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of accounts that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for AccountLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}
