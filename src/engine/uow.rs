//! Unit of work
//!
//! Tracks the deltas of one in-flight transfer between the atomic apply
//! and the transaction-log append. Exactly one of `commit` or `abort`
//! runs on every exit path; dropping an unreleased unit is a bug and is
//! logged as such, because `Drop` cannot run the async rollback.

use std::sync::Arc;
use tracing::{error, warn};

use crate::core_types::ApplyId;
use crate::store::{AccountStore, Adjustment, StoreError};

/// Guard over an applied-but-not-yet-recorded set of deltas
pub struct UnitOfWork {
    store: Arc<dyn AccountStore>,
    apply_id: ApplyId,
    adjustments: Option<Vec<Adjustment>>,
}

impl UnitOfWork {
    /// Wrap deltas that have already been applied under `apply_id`
    pub fn applied(
        store: Arc<dyn AccountStore>,
        apply_id: ApplyId,
        adjustments: Vec<Adjustment>,
    ) -> Self {
        Self {
            store,
            apply_id,
            adjustments: Some(adjustments),
        }
    }

    /// Keep the applied deltas: the transfer is complete
    pub fn commit(mut self) {
        self.adjustments = None;
    }

    /// Undo every applied delta with one inverse apply.
    ///
    /// The inverse is pure credits plus the mirrored system-total delta,
    /// so it cannot fail a non-negativity precondition; only store
    /// availability can make it fail.
    pub async fn abort(mut self, rollback_apply_id: ApplyId) -> Result<(), StoreError> {
        let Some(adjustments) = self.adjustments.take() else {
            return Ok(());
        };
        let inverse: Vec<Adjustment> = adjustments.iter().rev().map(|a| a.inverse()).collect();

        match self.store.apply_atomic(rollback_apply_id, &inverse).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(
                    apply_id = self.apply_id,
                    rollback_apply_id,
                    error = %e,
                    "Rollback of applied deltas failed; ledger needs manual reconciliation"
                );
                Err(e)
            }
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.adjustments.is_some() {
            // Backstop only. Every engine path must commit or abort.
            warn!(
                apply_id = self.apply_id,
                "Unit of work dropped without commit or abort"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::store::MemoryStore;

    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let mut a = Account::new_user(1, "u", "u@x.io", "0171", "$h");
        a.balance = 1_000;
        store.insert(a);
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_commit_keeps_deltas() {
        let store = seeded_store();
        let adj = vec![Adjustment::debit_balance(1, 400)];
        store.apply_atomic(10, &adj).await.unwrap();

        let uow = UnitOfWork::applied(store.clone(), 10, adj);
        uow.commit();

        assert_eq!(store.get(1).await.unwrap().unwrap().balance, 600);
    }

    #[tokio::test]
    async fn test_abort_restores_deltas() {
        let store = seeded_store();
        let adj = vec![
            Adjustment::debit_balance(1, 400),
            Adjustment::system_total(-400),
        ];
        store.apply_atomic(11, &adj).await.unwrap();
        assert_eq!(store.get(1).await.unwrap().unwrap().balance, 600);

        let uow = UnitOfWork::applied(store.clone(), 11, adj);
        uow.abort(12).await.unwrap();

        assert_eq!(store.get(1).await.unwrap().unwrap().balance, 1_000);
        assert_eq!(store.system_total().await.unwrap(), 1_000);
    }
}
