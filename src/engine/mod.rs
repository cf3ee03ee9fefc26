//! Transfer Engine
//!
//! Orchestrates the three money-moving operations: validation, PIN check,
//! fee computation, atomic multi-account adjustment and transaction-log
//! append, as one all-or-nothing unit of work per request.
//!
//! # State Machine
//!
//! ```text
//! VALIDATED → APPLYING → COMPLETED
//! VALIDATED → REJECTED            (typed error, no mutation)
//! APPLYING  → ABORTED             (applied deltas rolled back)
//! ```
//!
//! # Safety Invariants
//!
//! 1. Balances are never read-checked-written in engine code; solvency is
//!    enforced inside `AccountStore::apply_atomic`
//! 2. Store conflicts are retried a bounded number of times; business
//!    rejections are never retried
//! 3. An unknown-outcome apply is re-verified via `was_applied`, never
//!    assumed either way
//! 4. No transaction record is ever written for a non-completed attempt

pub mod error;
pub mod state;
pub mod uow;


pub use error::{EngineError, ErrorKind};
pub use state::TransferState;
pub use uow::UnitOfWork;

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::account::{Account, AccountType};
use crate::config::EngineSettings;
use crate::core_types::{AccountId, Amount, ApplyId, TransferKind};
use crate::fee::{self, compute_fee};
use crate::money::MAX_AMOUNT;
use crate::pin::verify_pin;
use crate::store::{AccountStore, Adjustment, DashboardSummary, StoreError};
use crate::txlog::{Transaction, TransactionLog, TxnStatus};

/// Snowflake ID generator for apply and transaction ids.
///
/// Format: timestamp millis (41 bits) | machine_id (8 bits) | sequence (15 bits).
/// Monotonic within one generator, so transaction ids are time-ordered.
struct SnowflakeGenerator {
    machine_id: u8,
    sequence: u32,
    last_timestamp: u64,
}

impl SnowflakeGenerator {
    fn new(machine_id: u8) -> Self {
        Self {
            machine_id,
            sequence: 0,
            last_timestamp: 0,
        }
    }

    fn generate(&mut self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        if now == self.last_timestamp {
            self.sequence += 1;
        } else {
            self.sequence = 0;
            self.last_timestamp = now;
        }

        (now << 23) | ((self.machine_id as u64) << 15) | (self.sequence as u64 & 0x7FFF)
    }
}

/// Peer-to-peer transfer request
#[derive(Debug, Clone)]
pub struct SendMoneyRequest {
    pub sender_email: String,
    pub recipient_phone: String,
    /// Minor units
    pub amount: Amount,
    /// Caller-generated idempotency token; a replay returns the original
    /// completed transaction instead of moving money twice
    pub client_id: Option<String>,
}

/// Agent cash-out request (user withdraws through an agent)
#[derive(Debug, Clone)]
pub struct CashOutRequest {
    pub user_email: String,
    pub agent_phone: String,
    pub amount: Amount,
    pub pin: String,
    pub client_id: Option<String>,
}

/// Agent cash-in request (agent deposits into a user account)
#[derive(Debug, Clone)]
pub struct CashInRequest {
    pub agent_email: String,
    pub user_phone: String,
    pub amount: Amount,
    pub pin: String,
    pub client_id: Option<String>,
}

/// Transfer Engine - drives each request through the state machine
pub struct TransferEngine {
    store: Arc<dyn AccountStore>,
    log: Arc<dyn TransactionLog>,
    /// Fee sink, resolved once at construction
    admin_id: AccountId,
    max_conflict_retries: u32,
    id_gen: Mutex<SnowflakeGenerator>,
}

impl TransferEngine {
    /// Build an engine over a store and log.
    ///
    /// Resolves the single Admin fee-sink account up front; a missing
    /// admin is a fatal precondition, not a per-transfer lookup failure.
    pub async fn new(
        store: Arc<dyn AccountStore>,
        log: Arc<dyn TransactionLog>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let admin = store
            .find_admin()
            .await
            .map_err(internal)?
            .ok_or(EngineError::AdminNotFound)?;
        info!(admin_id = admin.id, "Fee sink resolved");

        Ok(Self {
            store,
            log,
            admin_id: admin.id,
            max_conflict_retries: settings.max_conflict_retries,
            id_gen: Mutex::new(SnowflakeGenerator::new(settings.machine_id)),
        })
    }

    /// Peer-to-peer transfer.
    ///
    /// Debits the sender `amount + fee`, credits the recipient
    /// `amount - fee`, credits the admin balance `fee`, and shrinks
    /// SystemTotal by the fee retained out of circulation.
    pub async fn send_money(&self, req: &SendMoneyRequest) -> Result<Transaction, EngineError> {
        if let Some(txn) = self.replay(req.client_id.as_deref()).await? {
            return Ok(txn);
        }

        self.check_amount("send_money", req.amount, fee::SEND_MONEY_MIN_AMOUNT)?;

        let sender = self
            .store
            .find_by_email(&req.sender_email)
            .await
            .map_err(internal)?
            .ok_or_else(|| self.reject("send_money", EngineError::SenderNotFound))?;
        let recipient = self
            .store
            .find_by_phone(&req.recipient_phone)
            .await
            .map_err(internal)?
            .ok_or_else(|| self.reject("send_money", EngineError::RecipientNotFound))?;

        if sender.id == recipient.id {
            return Err(self.reject("send_money", EngineError::SameAccount));
        }
        self.ensure_active("send_money", &sender)?;
        self.ensure_active("send_money", &recipient)?;

        let fees = compute_fee(TransferKind::SendMoney, req.amount);

        let mut adjustments = vec![
            Adjustment::debit_balance(sender.id, req.amount + fees.fee),
            Adjustment::credit_balance(recipient.id, req.amount - fees.fee),
        ];
        if fees.fee > 0 {
            adjustments.push(Adjustment::credit_balance(self.admin_id, fees.admin_balance_fee));
            adjustments.push(Adjustment::system_total(-(fees.fee as i64)));
        }

        let txn = self.transaction(
            TransferKind::SendMoney,
            &sender,
            &recipient.phone,
            req.amount,
            fees.fee,
            req.client_id.clone(),
        );
        self.commit_transfer("send_money", adjustments, txn).await
    }

    /// Agent cash-out.
    ///
    /// Debits the user `amount + 1.5% fee`, credits the agent's balance
    /// with the amount and their earnings with 1.0%, credits the admin's
    /// earnings with 0.5%, and shrinks SystemTotal by the amount leaving
    /// circulation.
    pub async fn cash_out(&self, req: &CashOutRequest) -> Result<Transaction, EngineError> {
        if let Some(txn) = self.replay(req.client_id.as_deref()).await? {
            return Ok(txn);
        }

        self.check_amount("cash_out", req.amount, fee::CASH_MIN_AMOUNT)?;

        let user = self
            .store
            .find_by_email(&req.user_email)
            .await
            .map_err(internal)?
            .ok_or_else(|| self.reject("cash_out", EngineError::UserNotFound))?;
        let agent = self
            .store
            .find_by_phone(&req.agent_phone)
            .await
            .map_err(internal)?
            .filter(|a| a.account_type == AccountType::Agent)
            .ok_or_else(|| self.reject("cash_out", EngineError::AgentNotFound))?;

        self.ensure_active("cash_out", &user)?;
        self.ensure_active("cash_out", &agent)?;
        self.check_pin("cash_out", &req.pin, &user)?;

        let fees = compute_fee(TransferKind::CashOut, req.amount);

        let mut adjustments = vec![
            Adjustment::debit_balance(user.id, req.amount + fees.fee),
            Adjustment::credit_balance(agent.id, req.amount),
        ];
        if fees.agent_earning > 0 {
            adjustments.push(Adjustment::credit_earnings(agent.id, fees.agent_earning));
        }
        if fees.admin_earning > 0 {
            adjustments.push(Adjustment::credit_earnings(self.admin_id, fees.admin_earning));
        }
        adjustments.push(Adjustment::system_total(-(req.amount as i64)));

        let txn = self.transaction(
            TransferKind::CashOut,
            &user,
            &agent.phone,
            req.amount,
            fees.fee,
            req.client_id.clone(),
        );
        self.commit_transfer("cash_out", adjustments, txn).await
    }

    /// Agent cash-in.
    ///
    /// Moves the amount from the agent's balance to the user's balance
    /// and mints it into SystemTotal: physical cash entered the system.
    /// Free of fees.
    pub async fn cash_in(&self, req: &CashInRequest) -> Result<Transaction, EngineError> {
        if let Some(txn) = self.replay(req.client_id.as_deref()).await? {
            return Ok(txn);
        }

        self.check_amount("cash_in", req.amount, fee::CASH_MIN_AMOUNT)?;

        let agent = self
            .store
            .find_by_email(&req.agent_email)
            .await
            .map_err(internal)?
            .filter(|a| a.account_type == AccountType::Agent)
            .ok_or_else(|| self.reject("cash_in", EngineError::AgentNotFound))?;
        let user = self
            .store
            .find_by_phone(&req.user_phone)
            .await
            .map_err(internal)?
            .ok_or_else(|| self.reject("cash_in", EngineError::UserNotFound))?;

        self.ensure_active("cash_in", &agent)?;
        self.ensure_active("cash_in", &user)?;
        self.check_pin("cash_in", &req.pin, &agent)?;

        let adjustments = vec![
            Adjustment::debit_balance(agent.id, req.amount),
            Adjustment::credit_balance(user.id, req.amount),
            Adjustment::system_total(req.amount as i64),
        ];

        let txn = self.transaction(
            TransferKind::CashIn,
            &agent,
            &user.phone,
            req.amount,
            0,
            req.client_id.clone(),
        );
        self.commit_transfer("cash_in", adjustments, txn).await
    }

    /// Completed transfers where the participant (phone) was sender or
    /// recipient, newest first, capped at 100
    pub async fn history(&self, participant: &str) -> Result<Vec<Transaction>, EngineError> {
        self.log
            .history(participant)
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    /// Aggregate counters for the admin dashboard
    pub async fn dashboard(&self) -> Result<DashboardSummary, EngineError> {
        self.store.dashboard().await.map_err(internal)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn next_id(&self) -> u64 {
        self.id_gen.lock().unwrap().generate()
    }

    /// Idempotency check: a replayed client_id short-circuits to the
    /// original completed transaction
    async fn replay(&self, client_id: Option<&str>) -> Result<Option<Transaction>, EngineError> {
        let Some(cid) = client_id else {
            return Ok(None);
        };
        let existing = self
            .log
            .find_by_client_id(cid)
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        if let Some(ref txn) = existing {
            debug!(client_id = cid, txn_id = %txn.txn_id, "Duplicate client_id, replaying");
        }
        Ok(existing)
    }

    fn reject(&self, op: &'static str, err: EngineError) -> EngineError {
        debug!(
            op,
            code = err.code(),
            state = %TransferState::Rejected,
            "Transfer rejected"
        );
        err
    }

    /// Range check at the Validated step. The upper bound keeps every
    /// signed ledger delta representable, so apply-time arithmetic can
    /// never wrap.
    fn check_amount(
        &self,
        op: &'static str,
        amount: Amount,
        min: Amount,
    ) -> Result<(), EngineError> {
        if amount < min {
            return Err(self.reject(op, EngineError::AmountBelowMinimum { min }));
        }
        if amount > MAX_AMOUNT {
            return Err(self.reject(op, EngineError::AmountAboveMaximum { max: MAX_AMOUNT }));
        }
        Ok(())
    }

    fn ensure_active(&self, op: &'static str, account: &Account) -> Result<(), EngineError> {
        if account.is_blocked {
            return Err(self.reject(op, EngineError::AccountBlocked));
        }
        if !account.is_approved {
            return Err(self.reject(op, EngineError::AgentNotApproved));
        }
        Ok(())
    }

    fn check_pin(&self, op: &'static str, pin: &str, account: &Account) -> Result<(), EngineError> {
        match verify_pin(pin, &account.pin_hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(self.reject(op, EngineError::InvalidPin)),
            Err(e) => Err(EngineError::Internal(e.to_string())),
        }
    }

    fn transaction(
        &self,
        kind: TransferKind,
        payer: &Account,
        recipient_phone: &str,
        amount: Amount,
        fee: Amount,
        client_id: Option<String>,
    ) -> Transaction {
        Transaction {
            txn_id: format!("TXN{}", self.next_id()),
            kind,
            sender: payer.email.clone(),
            sender_phone: payer.phone.clone(),
            recipient: recipient_phone.to_string(),
            amount,
            fee,
            status: TxnStatus::Completed,
            timestamp: chrono::Utc::now(),
            client_id,
        }
    }

    /// Applying phase: atomic apply with bounded conflict retry, then the
    /// log append under a unit-of-work guard.
    async fn commit_transfer(
        &self,
        op: &'static str,
        adjustments: Vec<Adjustment>,
        txn: Transaction,
    ) -> Result<Transaction, EngineError> {
        debug!(op, txn_id = %txn.txn_id, state = %TransferState::Applying, "Applying transfer");

        let apply_id = self.apply_with_retry(op, &adjustments).await?;
        let uow = UnitOfWork::applied(self.store.clone(), apply_id, adjustments);

        if let Err(e) = self.log.append(&txn).await {
            // Aborting: money must not stay moved without its record
            warn!(
                op,
                txn_id = %txn.txn_id,
                error = %e,
                state = %TransferState::Aborted,
                "Log append failed, rolling back applied deltas"
            );
            let rollback_id = self.next_id();
            if let Err(rollback_err) = uow.abort(rollback_id).await {
                return Err(EngineError::Internal(format!(
                    "log append failed and rollback failed: {rollback_err}"
                )));
            }
            return Err(EngineError::Internal(format!("log append failed: {e}")));
        }

        uow.commit();
        info!(
            op,
            txn_id = %txn.txn_id,
            kind = %txn.kind,
            amount = txn.amount,
            fee = txn.fee,
            state = %TransferState::Completed,
            "Transfer completed"
        );
        Ok(txn)
    }

    /// Run one atomic apply; retry on transient conflicts within the
    /// configured budget; re-verify unknown outcomes via `was_applied`.
    async fn apply_with_retry(
        &self,
        op: &'static str,
        adjustments: &[Adjustment],
    ) -> Result<ApplyId, EngineError> {
        let mut attempt = 0u32;
        loop {
            let apply_id = self.next_id();
            match self.store.apply_atomic(apply_id, adjustments).await {
                Ok(()) => return Ok(apply_id),
                Err(StoreError::Conflict) => {
                    attempt += 1;
                    if attempt > self.max_conflict_retries {
                        warn!(op, attempt, "Conflict retries exhausted");
                        return Err(EngineError::Conflict {
                            retries: self.max_conflict_retries,
                        });
                    }
                    debug!(op, attempt, "Write conflict, retrying apply");
                }
                Err(StoreError::Unknown(reason)) => {
                    // Outcome indeterminate: re-verify, never assume
                    match self.store.was_applied(apply_id).await {
                        Ok(true) => return Ok(apply_id),
                        Ok(false) => {
                            attempt += 1;
                            if attempt > self.max_conflict_retries {
                                return Err(EngineError::Internal(format!(
                                    "apply outcome unknown, verified unapplied, retries exhausted: {reason}"
                                )));
                            }
                            debug!(op, attempt, "Unknown outcome verified unapplied, retrying");
                        }
                        Err(verify_err) => {
                            return Err(EngineError::Internal(format!(
                                "apply outcome unknown and unverifiable: {reason}; {verify_err}"
                            )));
                        }
                    }
                }
                Err(StoreError::InsufficientFunds(id)) => {
                    debug!(op, account_id = id, state = %TransferState::Rejected, "Insufficient funds");
                    return Err(EngineError::InsufficientFunds);
                }
                Err(StoreError::AccountMissing(id)) => {
                    return Err(EngineError::Internal(format!(
                        "account {id} vanished during apply"
                    )));
                }
                Err(StoreError::Unavailable(reason)) => {
                    return Err(EngineError::Internal(reason));
                }
            }
        }
    }
}

fn internal(e: StoreError) -> EngineError {
    EngineError::Internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_generator() {
        let mut id_generator = SnowflakeGenerator::new(1);
        let id1 = id_generator.generate();
        let id2 = id_generator.generate();

        assert_ne!(id1, id2);
        assert!(id2 > id1); // Monotonically increasing
    }
}
