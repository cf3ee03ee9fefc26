//! Fee calculation utilities
//!
//! All amounts are minor units; proportional rates use 10^6 precision
//! (10_000 = 1.0%). The policy is pure: same kind + amount always yields
//! the same breakdown.

use crate::core_types::{Amount, TransferKind};
use crate::money::round_half_up;

/// Minimum Send Money amount (50.00 units)
pub const SEND_MONEY_MIN_AMOUNT: Amount = 5_000;

/// Send Money amounts above this threshold pay the flat fee (100.00 units)
pub const SEND_MONEY_FEE_THRESHOLD: Amount = 10_000;

/// Flat Send Money fee (5.00 units), credited to the admin balance
pub const SEND_MONEY_FLAT_FEE: Amount = 500;

/// Minimum Cash Out / Cash-In amount (0.01 units)
pub const CASH_MIN_AMOUNT: Amount = 1;

/// Cash Out agent commission rate (1.0%)
pub const CASH_OUT_AGENT_RATE: u64 = 10_000;

/// Cash Out admin commission rate (0.5%)
pub const CASH_OUT_ADMIN_RATE: u64 = 5_000;

/// Fee breakdown for one transfer.
///
/// Invariant: `fee == agent_earning + admin_earning + admin_balance_fee`.
/// The total payer debit is `amount + fee`; the splits are what get
/// credited, so the signed deltas of a transfer always sum to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Total fee debited from the payer on top of the amount
    pub fee: Amount,
    /// Share credited to the agent's earnings (Cash Out only)
    pub agent_earning: Amount,
    /// Share credited to the admin's earnings (Cash Out only)
    pub admin_earning: Amount,
    /// Share credited to the admin's balance (Send Money only)
    pub admin_balance_fee: Amount,
}

impl FeeBreakdown {
    pub const ZERO: FeeBreakdown = FeeBreakdown {
        fee: 0,
        agent_earning: 0,
        admin_earning: 0,
        admin_balance_fee: 0,
    };
}

/// Compute the fee breakdown for a transfer kind and amount.
///
/// - Send Money: flat 5.00 fee above 100.00, entire fee to admin balance
/// - Cash Out: 1.0% to agent earnings + 0.5% to admin earnings, each
///   rounded half-up; the total fee is defined as the sum of the rounded
///   splits so the books balance exactly
/// - Cash-In: free
pub fn compute_fee(kind: TransferKind, amount: Amount) -> FeeBreakdown {
    match kind {
        TransferKind::SendMoney => {
            if amount > SEND_MONEY_FEE_THRESHOLD {
                FeeBreakdown {
                    fee: SEND_MONEY_FLAT_FEE,
                    admin_balance_fee: SEND_MONEY_FLAT_FEE,
                    ..FeeBreakdown::ZERO
                }
            } else {
                FeeBreakdown::ZERO
            }
        }
        TransferKind::CashOut => {
            let agent_earning = round_half_up(amount, CASH_OUT_AGENT_RATE);
            let admin_earning = round_half_up(amount, CASH_OUT_ADMIN_RATE);
            FeeBreakdown {
                fee: agent_earning + admin_earning,
                agent_earning,
                admin_earning,
                admin_balance_fee: 0,
            }
        }
        TransferKind::CashIn => FeeBreakdown::ZERO,
    }
}
