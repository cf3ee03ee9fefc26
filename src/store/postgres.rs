//! PostgreSQL account store
//!
//! One SQL transaction per apply. Debits are conditional updates
//! (`balance + delta >= 0` inside the UPDATE itself), so the
//! non-negativity precondition and the write are one atomic step and the
//! read-check-write race cannot occur. A dropped transaction rolls back,
//! which makes every early-return error path release the unit of work.

use sqlx::postgres::PgPool;
use sqlx::{Postgres, Row, Transaction};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AccountStore, AdjustField, AdjustTarget, Adjustment, DashboardSummary, StoreError};
use crate::account::{Account, AccountType};
use crate::core_types::{AccountId, ApplyId};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts_tb (
    account_id   BIGINT PRIMARY KEY,
    name         TEXT NOT NULL,
    email        TEXT NOT NULL UNIQUE,
    phone        TEXT NOT NULL UNIQUE,
    account_type SMALLINT NOT NULL,
    balance      BIGINT NOT NULL CHECK (balance >= 0),
    earnings     BIGINT NOT NULL CHECK (earnings >= 0),
    pin_hash     TEXT NOT NULL,
    is_blocked   BOOLEAN NOT NULL DEFAULT FALSE,
    is_approved  BOOLEAN NOT NULL DEFAULT TRUE,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS system_tb (
    key    TEXT PRIMARY KEY,
    amount BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS applies_tb (
    apply_id   BIGINT PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// Key of the SystemTotal row in system_tb
const TOTAL_MONEY_KEY: &str = "total_money";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    /// Insert a new account and grow SystemTotal by its starting funds
    pub async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "INSERT INTO accounts_tb
             (account_id, name, email, phone, account_type, balance, earnings,
              pin_hash, is_blocked, is_approved, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(account.id as i64)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.account_type as i16)
        .bind(account.balance as i64)
        .bind(account.earnings as i64)
        .bind(&account.pin_hash)
        .bind(account.is_blocked)
        .bind(account.is_approved)
        .bind(account.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        upsert_system_total(&mut tx, account.balance as i64 + account.earnings as i64).await?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_one(&self, sql: &str, bind: Option<&str>) -> Result<Option<Account>, StoreError> {
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(account_from_row).transpose()
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.find_one("SELECT * FROM accounts_tb WHERE email = $1", Some(email))
            .await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError> {
        self.find_one("SELECT * FROM accounts_tb WHERE phone = $1", Some(phone))
            .await
    }

    async fn find_admin(&self) -> Result<Option<Account>, StoreError> {
        self.find_one(
            "SELECT * FROM accounts_tb WHERE account_type = 3 LIMIT 1",
            None,
        )
        .await
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT * FROM accounts_tb WHERE account_id = $1")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(account_from_row).transpose()
    }

    async fn apply_atomic(
        &self,
        apply_id: ApplyId,
        adjustments: &[Adjustment],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Idempotency journal: a duplicate apply_id is a no-op success
        let journal = sqlx::query("INSERT INTO applies_tb (apply_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(apply_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        if journal.rows_affected() == 0 {
            return Ok(());
        }

        for adj in adjustments {
            match adj.target {
                AdjustTarget::Account { id, field } => {
                    let column = match field {
                        AdjustField::Balance => "balance",
                        AdjustField::Earnings => "earnings",
                    };
                    // Precondition inside the UPDATE: no row is touched
                    // when the debit would go negative.
                    let sql = format!(
                        "UPDATE accounts_tb SET {col} = {col} + $1
                         WHERE account_id = $2 AND {col} + $1 >= 0",
                        col = column
                    );
                    let updated = sqlx::query(&sql)
                        .bind(adj.delta)
                        .bind(id as i64)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx)?;

                    if updated.rows_affected() == 0 {
                        // Missing row and failed precondition look alike;
                        // one probe distinguishes them. Early return drops
                        // the transaction and rolls everything back.
                        let exists =
                            sqlx::query("SELECT 1 FROM accounts_tb WHERE account_id = $1")
                                .bind(id as i64)
                                .fetch_optional(&mut *tx)
                                .await
                                .map_err(map_sqlx)?;
                        return Err(if exists.is_some() {
                            StoreError::InsufficientFunds(id)
                        } else {
                            StoreError::AccountMissing(id)
                        });
                    }
                }
                AdjustTarget::SystemTotal => {
                    upsert_system_total(&mut tx, adj.delta).await?;
                }
            }
        }

        // Outcome of a failed commit is indeterminate, the caller must
        // re-verify through was_applied.
        tx.commit()
            .await
            .map_err(|e| StoreError::Unknown(e.to_string()))?;
        Ok(())
    }

    async fn was_applied(&self, apply_id: ApplyId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM applies_tb WHERE apply_id = $1")
            .bind(apply_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.is_some())
    }

    async fn system_total(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT amount FROM system_tb WHERE key = $1")
            .bind(TOTAL_MONEY_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(|r| r.get::<i64, _>("amount")).unwrap_or(0))
    }

    async fn dashboard(&self) -> Result<DashboardSummary, StoreError> {
        let counts = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE account_type = 1) AS total_users,
                COUNT(*) FILTER (WHERE account_type = 2) AS total_agents,
                COALESCE(MAX(earnings) FILTER (WHERE account_type = 3), 0) AS admin_earnings
             FROM accounts_tb",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(DashboardSummary {
            total_users: counts.get::<i64, _>("total_users") as u64,
            total_agents: counts.get::<i64, _>("total_agents") as u64,
            total_money: self.system_total().await?,
            admin_earnings: counts.get::<i64, _>("admin_earnings") as u64,
        })
    }
}

async fn upsert_system_total(
    tx: &mut Transaction<'_, Postgres>,
    delta: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO system_tb (key, amount) VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET amount = system_tb.amount + EXCLUDED.amount",
    )
    .bind(TOTAL_MONEY_KEY)
    .bind(delta)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

fn account_from_row(row: sqlx::postgres::PgRow) -> Result<Account, StoreError> {
    let type_id: i16 = row.get("account_type");
    let account_type = AccountType::try_from(type_id).map_err(StoreError::Unavailable)?;
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(Account {
        id: row.get::<i64, _>("account_id") as AccountId,
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        account_type,
        balance: row.get::<i64, _>("balance") as u64,
        earnings: row.get::<i64, _>("earnings") as u64,
        pin_hash: row.get("pin_hash"),
        is_blocked: row.get("is_blocked"),
        is_approved: row.get("is_approved"),
        created_at,
    })
}

/// Serialization failures and deadlocks are retryable conflicts;
/// everything else is an availability problem.
fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e
        && let Some(code) = db.code()
        && (code == "40001" || code == "40P01")
    {
        return StoreError::Conflict;
    }
    StoreError::Unavailable(e.to_string())
}
