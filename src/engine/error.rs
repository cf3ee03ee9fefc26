//! Engine error types
//!
//! Variants carry the specific failure; `kind()` collapses them onto the
//! stable six-way taxonomy callers dispatch on, and `code()` gives the
//! stable machine-readable string for API responses.

use thiserror::Error;

use crate::core_types::Amount;
use crate::money::format_amount;

/// Stable error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authentication,
    InsufficientFunds,
    Conflict,
    Internal,
}

/// Transfer engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    // === Validation ===
    #[error("Amount below minimum of {}", format_amount(*min))]
    AmountBelowMinimum { min: Amount },

    #[error("Amount above maximum of {}", format_amount(*max))]
    AmountAboveMaximum { max: Amount },

    #[error("Sender and recipient cannot be the same account")]
    SameAccount,

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Agent is not approved")]
    AgentNotApproved,

    // === Not found ===
    #[error("Sender not found")]
    SenderNotFound,

    #[error("Recipient not found")]
    RecipientNotFound,

    #[error("Agent not found")]
    AgentNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Admin account not found")]
    AdminNotFound,

    // === Authentication ===
    #[error("Invalid PIN")]
    InvalidPin,

    // === Funds ===
    #[error("Insufficient balance")]
    InsufficientFunds,

    // === Concurrency ===
    #[error("Write conflict persisted after {retries} retries")]
    Conflict { retries: u32 },

    // === System ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AmountBelowMinimum { .. }
            | EngineError::AmountAboveMaximum { .. }
            | EngineError::SameAccount
            | EngineError::AccountBlocked
            | EngineError::AgentNotApproved => ErrorKind::Validation,
            EngineError::SenderNotFound
            | EngineError::RecipientNotFound
            | EngineError::AgentNotFound
            | EngineError::UserNotFound
            | EngineError::AdminNotFound => ErrorKind::NotFound,
            EngineError::InvalidPin => ErrorKind::Authentication,
            EngineError::InsufficientFunds => ErrorKind::InsufficientFunds,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::AmountBelowMinimum { .. } => "AMOUNT_BELOW_MINIMUM",
            EngineError::AmountAboveMaximum { .. } => "AMOUNT_ABOVE_MAXIMUM",
            EngineError::SameAccount => "SAME_ACCOUNT",
            EngineError::AccountBlocked => "ACCOUNT_BLOCKED",
            EngineError::AgentNotApproved => "AGENT_NOT_APPROVED",
            EngineError::SenderNotFound => "SENDER_NOT_FOUND",
            EngineError::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            EngineError::AgentNotFound => "AGENT_NOT_FOUND",
            EngineError::UserNotFound => "USER_NOT_FOUND",
            EngineError::AdminNotFound => "ADMIN_NOT_FOUND",
            EngineError::InvalidPin => "INVALID_PIN",
            EngineError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            EngineError::Conflict { .. } => "CONFLICT",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Business determinations must not be retried; only conflicts may be
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            EngineError::AmountBelowMinimum { min: 5_000 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::AmountAboveMaximum { max: 1_000 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(EngineError::AdminNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(EngineError::InvalidPin.kind(), ErrorKind::Authentication);
        assert_eq!(
            EngineError::InsufficientFunds.kind(),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(EngineError::Conflict { retries: 3 }.kind(), ErrorKind::Conflict);
        assert_eq!(
            EngineError::Internal("x".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(EngineError::InvalidPin.code(), "INVALID_PIN");
        assert_eq!(EngineError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(EngineError::SameAccount.code(), "SAME_ACCOUNT");
    }

    #[test]
    fn test_messages() {
        let e = EngineError::AmountBelowMinimum { min: 5_000 };
        assert_eq!(e.to_string(), "Amount below minimum of 50.00");
    }

    #[test]
    fn test_retryable() {
        assert!(EngineError::Conflict { retries: 3 }.is_retryable());
        assert!(!EngineError::InsufficientFunds.is_retryable());
        assert!(!EngineError::InvalidPin.is_retryable());
    }
}
