//! Account Store
//!
//! The only interface through which balances, earnings and the
//! SystemTotal aggregate are mutated. `apply_atomic` is all-or-nothing:
//! either every listed delta is applied or none is, and the
//! non-negativity precondition for debited fields is evaluated inside the
//! same atomic step as the write. Read-then-check-then-write sequences in
//! application code are forbidden.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::Account;
use crate::core_types::{AccountId, Amount, ApplyId};

/// Which monetary field of an account an adjustment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustField {
    Balance,
    Earnings,
}

/// Target of one signed delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustTarget {
    Account { id: AccountId, field: AdjustField },
    /// Aggregate counter of money in circulation
    SystemTotal,
}

/// One signed delta against an account field or the system total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub target: AdjustTarget,
    pub delta: i64,
}

impl Adjustment {
    pub fn debit_balance(id: AccountId, amount: Amount) -> Self {
        Self {
            target: AdjustTarget::Account {
                id,
                field: AdjustField::Balance,
            },
            delta: -(amount as i64),
        }
    }

    pub fn credit_balance(id: AccountId, amount: Amount) -> Self {
        Self {
            target: AdjustTarget::Account {
                id,
                field: AdjustField::Balance,
            },
            delta: amount as i64,
        }
    }

    pub fn credit_earnings(id: AccountId, amount: Amount) -> Self {
        Self {
            target: AdjustTarget::Account {
                id,
                field: AdjustField::Earnings,
            },
            delta: amount as i64,
        }
    }

    pub fn system_total(delta: i64) -> Self {
        Self {
            target: AdjustTarget::SystemTotal,
            delta,
        }
    }

    /// The adjustment that undoes this one
    pub fn inverse(&self) -> Self {
        Self {
            target: self.target,
            delta: -self.delta,
        }
    }
}

/// Store errors.
///
/// `InsufficientFunds` and `AccountMissing` are definitive business
/// determinations and must never be retried. `Conflict` is a transient
/// write conflict the engine may retry a bounded number of times.
/// `Unknown` means the outcome of an apply could not be determined; the
/// caller must re-verify via `was_applied`, never assume.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountMissing(AccountId),

    #[error("Insufficient funds on account {0}")]
    InsufficientFunds(AccountId),

    #[error("Write conflict, retryable")]
    Conflict,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Apply outcome unknown: {0}")]
    Unknown(String),
}

/// Aggregate numbers for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_users: u64,
    pub total_agents: u64,
    /// SystemTotal: money in circulation, minor units
    pub total_money: i64,
    pub admin_earnings: Amount,
}

/// Account persistence contract.
///
/// `apply_atomic` must be idempotent per `apply_id`: re-applying an
/// already-applied id is a no-op success. This is what makes
/// unknown-outcome recovery possible.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError>;

    /// The single system-wide Admin account, if present
    async fn find_admin(&self) -> Result<Option<Account>, StoreError>;

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Apply every delta or none.
    ///
    /// Non-negativity of every debited balance/earnings field is part of
    /// the same atomic step. Adjustments are applied in order, so two
    /// deltas against the same field compose.
    async fn apply_atomic(
        &self,
        apply_id: ApplyId,
        adjustments: &[Adjustment],
    ) -> Result<(), StoreError>;

    /// Whether an apply with this id has been committed.
    /// Used to resolve unknown-outcome applies.
    async fn was_applied(&self, apply_id: ApplyId) -> Result<bool, StoreError>;

    /// Current SystemTotal (money in circulation), minor units
    async fn system_total(&self) -> Result<i64, StoreError>;

    async fn dashboard(&self) -> Result<DashboardSummary, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_constructors() {
        let d = Adjustment::debit_balance(7, 1_000);
        assert_eq!(d.delta, -1_000);
        assert_eq!(
            d.target,
            AdjustTarget::Account {
                id: 7,
                field: AdjustField::Balance
            }
        );

        let c = Adjustment::credit_earnings(9, 500);
        assert_eq!(c.delta, 500);

        let s = Adjustment::system_total(-42);
        assert_eq!(s.target, AdjustTarget::SystemTotal);
    }

    #[test]
    fn test_inverse() {
        let d = Adjustment::debit_balance(7, 1_000);
        let inv = d.inverse();
        assert_eq!(inv.delta, 1_000);
        assert_eq!(inv.target, d.target);
        assert_eq!(inv.inverse(), d);
    }
}
