//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

use serde::{Deserialize, Serialize};

/// Account ID - globally unique identifier for an account.
///
/// # Constraints:
/// - **Immutable**: Once assigned, NEVER changes
/// - Primary key for account lookup in every store implementation
pub type AccountId = u64;

/// Amount in minor units (1/100 of the display unit).
///
/// All monetary arithmetic is integer arithmetic over minor units.
/// Floats never enter the money path.
pub type Amount = u64;

/// Apply ID - unique identifier for one atomic ledger apply.
///
/// Snowflake-generated per attempt. Lets the engine re-verify an
/// unknown-outcome apply instead of guessing.
pub type ApplyId = u64;

/// Transfer kind - the three money-moving operations of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    #[serde(rename = "Send Money")]
    SendMoney,
    #[serde(rename = "Cash Out")]
    CashOut,
    #[serde(rename = "Cash-In")]
    CashIn,
}

impl TransferKind {
    /// Wire name, matches the transaction log records
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::SendMoney => "Send Money",
            TransferKind::CashOut => "Cash Out",
            TransferKind::CashIn => "Cash-In",
        }
    }
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(TransferKind::SendMoney.as_str(), "Send Money");
        assert_eq!(TransferKind::CashOut.as_str(), "Cash Out");
        assert_eq!(TransferKind::CashIn.as_str(), "Cash-In");
    }

    #[test]
    fn test_kind_serde_roundtrip() {
        let json = serde_json::to_string(&TransferKind::CashIn).unwrap();
        assert_eq!(json, "\"Cash-In\"");
        let back: TransferKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransferKind::CashIn);
    }
}
