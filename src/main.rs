//! mbank - Mobile Money Transfer Engine
//!
//! Demo entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│  Store   │───▶│  Engine  │───▶│  TxLog   │
//! │  (YAML)  │    │ (atomic) │    │ (FSM)    │    │ (append) │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Seeds an in-memory ledger with an admin, a user and an approved
//! agent, then runs one cash-in, one send and one cash-out to show the
//! fee flows and the SystemTotal aggregate.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mbank::account::Account;
use mbank::config::AppConfig;
use mbank::engine::{CashInRequest, CashOutRequest, SendMoneyRequest, TransferEngine};
use mbank::logging::init_logging;
use mbank::money::format_amount;
use mbank::pin::hash_pin;
use mbank::store::MemoryStore;
use mbank::txlog::MemoryTxLog;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn seed_accounts(store: &MemoryStore) -> anyhow::Result<()> {
    let pin_hash = hash_pin("1234").context("hashing demo PIN")?;

    store.insert(Account::new_admin(1, "admin", "admin@mbank.io", "01700000000", &pin_hash));

    let mut alice = Account::new_user(2, "alice", "alice@mbank.io", "01711111111", &pin_hash);
    alice.balance = 4_000;
    store.insert(alice);

    store.insert(Account::new_user(3, "bob", "bob@mbank.io", "01722222222", &pin_hash));

    // Agents register blocked and unapproved; the demo approves ours
    let mut agent = Account::new_agent(4, "carol", "carol@mbank.io", "01733333333", &pin_hash);
    agent.is_blocked = false;
    agent.is_approved = true;
    store.insert(agent);

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _guard = init_logging(&config);

    info!(env, "Starting mbank transfer engine");

    let store = Arc::new(MemoryStore::new());
    seed_accounts(&store)?;
    let log = Arc::new(MemoryTxLog::new());

    let engine = TransferEngine::new(store.clone(), log, config.engine.clone())
        .await
        .context("building transfer engine")?;

    // Agent funds alice with 500.00 of physical cash
    let txn = engine
        .cash_in(&CashInRequest {
            agent_email: "carol@mbank.io".into(),
            user_phone: "01711111111".into(),
            amount: 50_000,
            pin: "1234".into(),
            client_id: None,
        })
        .await?;
    info!(txn_id = %txn.txn_id, amount = %format_amount(txn.amount), "Cash-in done");

    // Alice sends bob 200.00; a 5.00 fee goes to the admin
    let txn = engine
        .send_money(&SendMoneyRequest {
            sender_email: "alice@mbank.io".into(),
            recipient_phone: "01722222222".into(),
            amount: 20_000,
            client_id: None,
        })
        .await?;
    info!(
        txn_id = %txn.txn_id,
        amount = %format_amount(txn.amount),
        fee = %format_amount(txn.fee),
        "Send money done"
    );

    // Alice withdraws 100.00 through the agent; 1.5% fee split
    let txn = engine
        .cash_out(&CashOutRequest {
            user_email: "alice@mbank.io".into(),
            agent_phone: "01733333333".into(),
            amount: 10_000,
            pin: "1234".into(),
            client_id: None,
        })
        .await?;
    info!(
        txn_id = %txn.txn_id,
        amount = %format_amount(txn.amount),
        fee = %format_amount(txn.fee),
        "Cash-out done"
    );

    for record in engine.history("01711111111").await? {
        println!(
            "{}  {:<10}  {} -> {}  amount {}  fee {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind,
            record.sender_phone,
            record.recipient,
            format_amount(record.amount),
            format_amount(record.fee),
        );
    }

    let summary = engine.dashboard().await?;
    println!(
        "users: {}  agents: {}  money in circulation: {}  admin earnings: {}",
        summary.total_users,
        summary.total_agents,
        format_amount(summary.total_money.max(0) as u64),
        format_amount(summary.admin_earnings),
    );

    Ok(())
}
