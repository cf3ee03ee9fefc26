//! Account model
//!
//! One record per participant. `earnings` exists for every account type
//! with a well-defined default of 0 for users, so there is no optional
//! field shape to reason about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, Amount};

/// User starting balance at registration (40.00 units)
pub const USER_STARTING_BALANCE: Amount = 4_000;

/// Agent starting balance at registration (100000.00 units)
pub const AGENT_STARTING_BALANCE: Amount = 10_000_000;

/// Account type. Exactly one Admin account exists system-wide and acts
/// as the fee sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum AccountType {
    User = 1,
    Agent = 2,
    Admin = 3,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "User",
            AccountType::Agent => "Agent",
            AccountType::Admin => "Admin",
        }
    }
}

impl TryFrom<i16> for AccountType {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccountType::User),
            2 => Ok(AccountType::Agent),
            3 => Ok(AccountType::Admin),
            other => Err(format!("invalid account type id: {}", other)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account record.
///
/// Mutated only through `AccountStore::apply_atomic`; balances and
/// earnings are never written via read-modify-write in application code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_type: AccountType,
    /// Balance in minor units, never negative
    pub balance: Amount,
    /// Accumulated commissions in minor units (Agent/Admin; 0 for User)
    pub earnings: Amount,
    /// Argon2 PHC string of the login PIN
    pub pin_hash: String,
    pub is_blocked: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// New user account with the registration defaults
    pub fn new_user(id: AccountId, name: &str, email: &str, phone: &str, pin_hash: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            account_type: AccountType::User,
            balance: USER_STARTING_BALANCE,
            earnings: 0,
            pin_hash: pin_hash.to_string(),
            is_blocked: false,
            is_approved: true,
            created_at: Utc::now(),
        }
    }

    /// New agent account. Agents start blocked and unapproved until an
    /// admin approves them.
    pub fn new_agent(id: AccountId, name: &str, email: &str, phone: &str, pin_hash: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            account_type: AccountType::Agent,
            balance: AGENT_STARTING_BALANCE,
            earnings: 0,
            pin_hash: pin_hash.to_string(),
            is_blocked: true,
            is_approved: false,
            created_at: Utc::now(),
        }
    }

    /// The system-wide fee sink account
    pub fn new_admin(id: AccountId, name: &str, email: &str, phone: &str, pin_hash: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            account_type: AccountType::Admin,
            balance: 0,
            earnings: 0,
            pin_hash: pin_hash.to_string(),
            is_blocked: false,
            is_approved: true,
            created_at: Utc::now(),
        }
    }

    /// Whether this account may participate in a transfer
    #[inline]
    pub fn can_transact(&self) -> bool {
        !self.is_blocked && self.is_approved
    }
}
