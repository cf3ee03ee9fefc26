//! Transfer state definitions
//!
//! Every request moves through exactly one of three paths:
//!
//! ```text
//! VALIDATED → APPLYING → COMPLETED
//! VALIDATED → REJECTED            (no mutation)
//! APPLYING  → ABORTED             (partial mutation rolled back)
//! ```

use std::fmt;

/// Per-request transfer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Request passed validation, nothing written yet
    Validated,

    /// Atomic apply in progress
    Applying,

    /// Terminal: all deltas applied, transaction recorded
    Completed,

    /// Terminal: rejected before the apply step, state untouched
    Rejected,

    /// Terminal: failed during the apply step, all deltas rolled back
    Aborted,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Rejected | TransferState::Aborted
        )
    }

    /// Whether the request mutated any state
    #[inline]
    pub fn mutated(&self) -> bool {
        matches!(self, TransferState::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Validated => "VALIDATED",
            TransferState::Applying => "APPLYING",
            TransferState::Completed => "COMPLETED",
            TransferState::Rejected => "REJECTED",
            TransferState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Rejected.is_terminal());
        assert!(TransferState::Aborted.is_terminal());

        assert!(!TransferState::Validated.is_terminal());
        assert!(!TransferState::Applying.is_terminal());
    }

    #[test]
    fn test_only_completed_mutates() {
        assert!(TransferState::Completed.mutated());
        assert!(!TransferState::Rejected.mutated());
        assert!(!TransferState::Aborted.mutated());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Validated.to_string(), "VALIDATED");
        assert_eq!(TransferState::Aborted.to_string(), "ABORTED");
    }
}
