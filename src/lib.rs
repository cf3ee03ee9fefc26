//! mbank - Mobile Money Transfer Engine
//!
//! A ledger-backed transfer engine for a mobile money system: users,
//! agents and one admin fee sink, moving money through atomic
//! all-or-nothing units of work.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (AccountId, Amount, TransferKind)
//! - [`money`] - Minor-unit arithmetic, parsing and formatting
//! - [`fee`] - Fee schedule and fee-split computation
//! - [`account`] - Account model and registration defaults
//! - [`pin`] - PIN hashing and verification
//! - [`store`] - Account store contract, in-memory and PostgreSQL backends
//! - [`txlog`] - Append-only transaction log
//! - [`engine`] - Transfer engine (SendMoney, CashOut, CashIn)
//! - [`config`] - YAML application configuration
//! - [`logging`] - Tracing subscriber setup

// Core types - must be first!
pub mod core_types;

// Domain components
pub mod account;
pub mod fee;
pub mod money;
pub mod pin;

// Persistence
pub mod store;
pub mod txlog;

// Engine
pub mod engine;

// Infrastructure
pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use account::{Account, AccountType};
pub use config::{AppConfig, EngineSettings};
pub use core_types::{AccountId, Amount, ApplyId, TransferKind};
pub use engine::{
    CashInRequest, CashOutRequest, EngineError, ErrorKind, SendMoneyRequest, TransferEngine,
    TransferState,
};
pub use fee::{FeeBreakdown, compute_fee};
pub use store::{
    AccountStore, Adjustment, DashboardSummary, MemoryStore, PgStore, StoreError,
};
pub use txlog::{MemoryTxLog, Transaction, TransactionLog, TxnStatus};
