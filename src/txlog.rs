//! Transaction Log - settlement audit trail
//!
//! Append-only record of completed transfers. Records are written exactly
//! once per successful transfer and never mutated or deleted; a rejected
//! or aborted attempt leaves no record at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::core_types::{Amount, TransferKind};

/// History queries return at most this many records, newest first
pub const HISTORY_LIMIT: usize = 100;

/// Transaction status. The log only ever holds completed transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    Completed,
}

/// Immutable record of one completed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Time-ordered unique id, "TXN" + snowflake
    pub txn_id: String,
    pub kind: TransferKind,
    /// Payer's email
    pub sender: String,
    /// Payer's phone, used for participant history lookups
    pub sender_phone: String,
    /// Payee's phone
    pub recipient: String,
    /// Amount in minor units, fee excluded
    pub amount: Amount,
    /// Fee in minor units
    pub fee: Amount,
    pub status: TxnStatus,
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied idempotency token, if any
    pub client_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Transaction log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only transaction log contract
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, txn: &Transaction) -> Result<(), LogError>;

    /// Transfers where the participant (phone) is sender or recipient,
    /// newest first, capped at [`HISTORY_LIMIT`]
    async fn history(&self, participant: &str) -> Result<Vec<Transaction>, LogError>;

    /// Look up a completed transfer by its client idempotency token
    async fn find_by_client_id(&self, client_id: &str) -> Result<Option<Transaction>, LogError>;
}

/// In-memory append-only log
#[derive(Default)]
pub struct MemoryTxLog {
    entries: Mutex<Vec<Transaction>>,
}

impl MemoryTxLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records appended
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransactionLog for MemoryTxLog {
    async fn append(&self, txn: &Transaction) -> Result<(), LogError> {
        self.entries.lock().unwrap().push(txn.clone());
        Ok(())
    }

    async fn history(&self, participant: &str) -> Result<Vec<Transaction>, LogError> {
        let entries = self.entries.lock().unwrap();
        // Append order is time order, so newest-first is a reverse scan
        let mut result: Vec<Transaction> = entries
            .iter()
            .rev()
            .filter(|t| t.sender_phone == participant || t.recipient == participant)
            .take(HISTORY_LIMIT)
            .cloned()
            .collect();
        result.shrink_to_fit();
        Ok(result)
    }

    async fn find_by_client_id(&self, client_id: &str) -> Result<Option<Transaction>, LogError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .find(|t| t.client_id.as_deref() == Some(client_id))
            .cloned())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: u64, sender_phone: &str, recipient: &str) -> Transaction {
        Transaction {
            txn_id: format!("TXN{}", id),
            kind: TransferKind::SendMoney,
            sender: "s@x.io".into(),
            sender_phone: sender_phone.into(),
            recipient: recipient.into(),
            amount: 5_000,
            fee: 0,
            status: TxnStatus::Completed,
            timestamp: Utc::now(),
            client_id: None,
        }
    }

    #[tokio::test]
    async fn test_history_filters_by_participant() {
        let log = MemoryTxLog::new();
        log.append(&txn(1, "0171", "0172")).await.unwrap();
        log.append(&txn(2, "0173", "0171")).await.unwrap();
        log.append(&txn(3, "0173", "0174")).await.unwrap();

        let history = log.history("0171").await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first
        assert_eq!(history[0].txn_id, "TXN2");
        assert_eq!(history[1].txn_id, "TXN1");
    }

    #[tokio::test]
    async fn test_history_capped_at_limit() {
        let log = MemoryTxLog::new();
        for i in 0..150 {
            log.append(&txn(i, "0171", "0172")).await.unwrap();
        }

        let history = log.history("0171").await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        // The newest record is the last appended
        assert_eq!(history[0].txn_id, "TXN149");
        assert_eq!(history[99].txn_id, "TXN50");
    }

    #[tokio::test]
    async fn test_find_by_client_id() {
        let log = MemoryTxLog::new();
        let mut t = txn(1, "0171", "0172");
        t.client_id = Some("cid-abc".into());
        log.append(&t).await.unwrap();

        let found = log.find_by_client_id("cid-abc").await.unwrap();
        assert_eq!(found.unwrap().txn_id, "TXN1");
        assert!(log.find_by_client_id("cid-zzz").await.unwrap().is_none());
    }
}
