use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountKind, Cents, Transaction, TransactionId, TransactionKind, User,
    UserId,
};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying users, accounts and transactions.
///
/// Every multi-statement mutation runs inside a single store transaction, so
/// concurrent requests observe either the full pre-state or the full
/// post-state, never an intermediate one. There are no in-process locks;
/// correctness relies on the store's transactional guarantees plus scoping
/// every write by ownership.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Save a new user to the database.
    ///
    /// In production the identity provider's webhook does this on first
    /// sign-in; the core itself only reads users.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, external_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.external_id)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// Look up a user by the identity provider's external id.
    pub async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, external_id, created_at
            FROM users
            WHERE external_id = ?
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by external id")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account.
    ///
    /// When `clear_other_defaults` is set, the default flag is cleared on the
    /// owner's other accounts in the same store transaction as the insert, so
    /// the at-most-one-default invariant holds at every commit point.
    pub async fn insert_account(&self, account: &Account, clear_other_defaults: bool) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin account insert")?;

        if clear_other_defaults {
            sqlx::query("UPDATE accounts SET is_default = 0 WHERE user_id = ? AND is_default = 1")
                .bind(account.user_id.to_string())
                .execute(&mut *tx)
                .await
                .context("Failed to clear default accounts")?;
        }

        sqlx::query(
            r#"
            INSERT INTO accounts (id, user_id, name, kind, balance_cents, is_default, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.user_id.to_string())
        .bind(&account.name)
        .bind(account.kind.as_str())
        .bind(account.balance_cents)
        .bind(account.is_default)
        .bind(account.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save account")?;

        tx.commit().await.context("Failed to commit account insert")?;
        Ok(())
    }

    /// Get an account by id, scoped to its owner. Returns `None` for unknown
    /// ids and for accounts owned by someone else.
    pub async fn get_account(
        &self,
        account_id: AccountId,
        user_id: UserId,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, kind, balance_cents, is_default, created_at
            FROM accounts
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(account_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List a user's accounts in creation order.
    pub async fn list_accounts(&self, user_id: UserId) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, kind, balance_cents, is_default, created_at
            FROM accounts
            WHERE user_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Clear the default flag on all of `user_id`'s accounts, then set it on
    /// `account_id`, as one atomic unit.
    ///
    /// Returns `false` (after rolling the whole unit back, leaving the
    /// previous default intact) when the target account does not exist or is
    /// not owned by `user_id`. A zero-row update is a failure here, never a
    /// silent success.
    pub async fn promote_default_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin default-account switch")?;

        sqlx::query("UPDATE accounts SET is_default = 0 WHERE user_id = ? AND is_default = 1")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to clear default accounts")?;

        let updated = sqlx::query("UPDATE accounts SET is_default = 1 WHERE id = ? AND user_id = ?")
            .bind(account_id.to_string())
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to set default account")?
            .rows_affected();

        if updated == 0 {
            tx.rollback()
                .await
                .context("Failed to roll back default-account switch")?;
            return Ok(false);
        }

        tx.commit()
            .await
            .context("Failed to commit default-account switch")?;
        Ok(true)
    }

    /// Count a user's accounts with the default flag set. Integrity helper;
    /// the invariant is that this never exceeds one.
    pub async fn count_default_accounts(&self, user_id: UserId) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM accounts WHERE user_id = ? AND is_default = 1",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to count default accounts")?;

        Ok(row.get("count"))
    }

    // ========================
    // Transaction operations
    // ========================

    /// Insert a transaction and post its signed effect to the owning
    /// account's balance, as one atomic unit.
    pub async fn insert_transaction_with_posting(&self, transaction: &Transaction) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction posting")?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, user_id, kind, amount_cents, date, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.account_id.to_string())
        .bind(transaction.user_id.to_string())
        .bind(transaction.kind.as_str())
        .bind(transaction.amount_cents)
        .bind(transaction.date.to_rfc3339())
        .bind(&transaction.description)
        .bind(transaction.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        sqlx::query("UPDATE accounts SET balance_cents = balance_cents + ? WHERE id = ?")
            .bind(transaction.posting_delta())
            .bind(transaction.account_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to post transaction to account balance")?;

        tx.commit()
            .await
            .context("Failed to commit transaction posting")?;
        Ok(())
    }

    /// Fetch the transactions whose id is in `transaction_ids` and whose
    /// owner is `user_id`. Ids owned by other users are simply absent from
    /// the result, not an error.
    pub async fn find_owned_transactions(
        &self,
        transaction_ids: &[TransactionId],
        user_id: UserId,
    ) -> Result<Vec<Transaction>> {
        if transaction_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; transaction_ids.len()].join(", ");
        let query = format!(
            "SELECT id, account_id, user_id, kind, amount_cents, date, description, created_at
             FROM transactions
             WHERE user_id = ? AND id IN ({placeholders})"
        );

        let mut sql_query = sqlx::query(&query).bind(user_id.to_string());
        for id in transaction_ids {
            sql_query = sql_query.bind(id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch owned transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List all transactions for an account, newest first.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, user_id, kind, amount_cents, date, description, created_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Count the transactions recorded against an account.
    pub async fn count_transactions_for_account(&self, account_id: AccountId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE account_id = ?")
            .bind(account_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;

        Ok(row.get("count"))
    }

    /// Delete the caller-owned transactions in `transaction_ids` and apply
    /// the precomputed net reversal delta to each touched account, as one
    /// atomic unit. A fault anywhere rolls back both the deletions and the
    /// balance updates.
    ///
    /// Returns the number of transactions actually deleted.
    pub async fn delete_transactions_with_reversal(
        &self,
        user_id: UserId,
        transaction_ids: &[TransactionId],
        deltas: &HashMap<AccountId, Cents>,
    ) -> Result<u64> {
        if transaction_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin bulk deletion")?;

        let placeholders = vec!["?"; transaction_ids.len()].join(", ");
        let query =
            format!("DELETE FROM transactions WHERE user_id = ? AND id IN ({placeholders})");

        let mut sql_query = sqlx::query(&query).bind(user_id.to_string());
        for id in transaction_ids {
            sql_query = sql_query.bind(id.to_string());
        }

        let deleted = sql_query
            .execute(&mut *tx)
            .await
            .context("Failed to delete transactions")?
            .rows_affected();

        // One balance update per touched account, already netted by the
        // caller. No per-row read-modify-write.
        for (account_id, delta) in deltas {
            sqlx::query("UPDATE accounts SET balance_cents = balance_cents + ? WHERE id = ?")
                .bind(delta)
                .bind(account_id.to_string())
                .execute(&mut *tx)
                .await
                .context("Failed to apply balance reversal")?;
        }

        tx.commit().await.context("Failed to commit bulk deletion")?;
        Ok(deleted)
    }

    // ========================
    // Row mappers
    // ========================

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            external_id: row.get("external_id"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let kind_str: String = row.get("kind");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            name: row.get("name"),
            kind: AccountKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account kind: {}", kind_str))?,
            balance_cents: row.get("balance_cents"),
            is_default: row.get::<i32, _>("is_default") != 0,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let user_id_str: String = row.get("user_id");
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("date");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount_cents: row.get("amount_cents"),
            date: parse_timestamp(&date_str)?,
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}
