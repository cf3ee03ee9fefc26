//! In-memory account store
//!
//! Single mutex over the whole account map. Every `apply_atomic` runs
//! validate-then-apply under one lock acquisition, which gives the
//! serialization guarantee directly: a racing debit against a borderline
//! balance observes the post-apply balance of whichever apply won the
//! lock, and fails the non-negativity precondition.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AccountStore, AdjustField, AdjustTarget, Adjustment, DashboardSummary, StoreError};
use crate::account::{Account, AccountType};
use crate::core_types::{AccountId, ApplyId};

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    system_total: i64,
    applied: HashSet<ApplyId>,
}

/// Mutex-guarded account map with an applied-id journal
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account. Registration mints the starting balance and
    /// earnings into SystemTotal.
    pub fn insert(&self, account: Account) {
        let mut inner = self.inner.lock().unwrap();
        inner.system_total += account.balance as i64 + account.earnings as i64;
        inner.accounts.insert(account.id, account);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning means a panic mid-apply; the map may be torn,
        // refusing to continue is the only sound option.
        self.inner.lock().expect("memory store poisoned")
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.lock();
        Ok(inner.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.lock();
        Ok(inner.accounts.values().find(|a| a.phone == phone).cloned())
    }

    async fn find_admin(&self) -> Result<Option<Account>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.account_type == AccountType::Admin)
            .cloned())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let inner = self.lock();
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn apply_atomic(
        &self,
        apply_id: ApplyId,
        adjustments: &[Adjustment],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();

        // Idempotent re-apply is a no-op success
        if inner.applied.contains(&apply_id) {
            return Ok(());
        }

        // Validate all deltas against a working copy before touching the
        // real map, so a failed precondition leaves everything unchanged.
        let mut staged: HashMap<(AccountId, AdjustField), i64> = HashMap::new();
        let mut staged_total = inner.system_total;

        for adj in adjustments {
            match adj.target {
                AdjustTarget::Account { id, field } => {
                    let account = inner
                        .accounts
                        .get(&id)
                        .ok_or(StoreError::AccountMissing(id))?;
                    let current = *staged.entry((id, field)).or_insert_with(|| match field {
                        AdjustField::Balance => account.balance as i64,
                        AdjustField::Earnings => account.earnings as i64,
                    });
                    let after = current + adj.delta;
                    if after < 0 {
                        return Err(StoreError::InsufficientFunds(id));
                    }
                    staged.insert((id, field), after);
                }
                AdjustTarget::SystemTotal => {
                    staged_total += adj.delta;
                }
            }
        }

        // Commit the staged values
        for ((id, field), value) in staged {
            let account = inner
                .accounts
                .get_mut(&id)
                .ok_or(StoreError::AccountMissing(id))?;
            match field {
                AdjustField::Balance => account.balance = value as u64,
                AdjustField::Earnings => account.earnings = value as u64,
            }
        }
        inner.system_total = staged_total;
        inner.applied.insert(apply_id);

        Ok(())
    }

    async fn was_applied(&self, apply_id: ApplyId) -> Result<bool, StoreError> {
        let inner = self.lock();
        Ok(inner.applied.contains(&apply_id))
    }

    async fn system_total(&self) -> Result<i64, StoreError> {
        let inner = self.lock();
        Ok(inner.system_total)
    }

    async fn dashboard(&self) -> Result<DashboardSummary, StoreError> {
        let inner = self.lock();
        let total_users = inner
            .accounts
            .values()
            .filter(|a| a.account_type == AccountType::User)
            .count() as u64;
        let total_agents = inner
            .accounts
            .values()
            .filter(|a| a.account_type == AccountType::Agent)
            .count() as u64;
        let admin_earnings = inner
            .accounts
            .values()
            .find(|a| a.account_type == AccountType::Admin)
            .map(|a| a.earnings)
            .unwrap_or(0);

        Ok(DashboardSummary {
            total_users,
            total_agents,
            total_money: inner.system_total,
            admin_earnings,
        })
    }
}
