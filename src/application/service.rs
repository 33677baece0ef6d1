use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{
    to_major_units, Account, AccountId, AccountKind, Cents, Transaction, TransactionId,
    TransactionKind, User,
};
use crate::storage::Repository;

use super::{
    AppError, IdentityResolver, NoopInvalidator, SessionToken, StaleView, ViewInvalidator,
};

/// Application service providing the account and transaction mutation layer.
/// This is the primary interface for the presentation layer (web handlers,
/// CLI, etc.), which supplies the session token on every call.
pub struct LedgerService<R: IdentityResolver> {
    repo: Repository,
    resolver: R,
    invalidator: Box<dyn ViewInvalidator>,
}

/// An account as handed to callers. Amounts are plain numbers in major
/// units; the internal cents representation never leaks across this
/// boundary.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    pub balance: f64,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            kind: account.kind,
            balance: to_major_units(account.balance_cents),
            is_default: account.is_default,
            created_at: account.created_at,
        }
    }
}

/// A transaction as handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
}

impl From<&Transaction> for TransactionView {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            account_id: transaction.account_id,
            kind: transaction.kind,
            amount: to_major_units(transaction.amount_cents),
            date: transaction.date,
            description: transaction.description.clone(),
        }
    }
}

/// An account together with its full transaction history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct AccountDetail {
    pub account: AccountView,
    pub transactions: Vec<TransactionView>,
    pub transaction_count: i64,
}

/// Parameters for creating an account.
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub initial_balance_cents: Cents,
    pub is_default: bool,
}

/// Parameters for recording a transaction.
pub struct NewTransaction {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount_cents: Cents,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
}

/// Result of a bulk deletion.
#[derive(Debug, Clone)]
pub struct BulkDeleteOutcome {
    /// How many transactions were actually deleted. Ids that were unknown or
    /// owned by another user are simply not counted.
    pub deleted: u64,
    /// Accounts whose balance was adjusted by the reversal.
    pub touched_accounts: Vec<AccountId>,
}

impl<R: IdentityResolver> LedgerService<R> {
    /// Create a new ledger service over the given repository and identity
    /// resolver. View invalidation defaults to a no-op.
    pub fn new(repo: Repository, resolver: R) -> Self {
        Self {
            repo,
            resolver,
            invalidator: Box::new(NoopInvalidator),
        }
    }

    /// Replace the view invalidator, e.g. with one wired to the
    /// presentation layer's cache.
    pub fn with_invalidator(mut self, invalidator: Box<dyn ViewInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Resolve the session token to a user record. Every operation starts
    /// here; failure aborts before any store mutation.
    async fn authenticate(&self, session: &SessionToken) -> Result<User, AppError> {
        let external_id = self
            .resolver
            .resolve_session(session)
            .ok_or(AppError::Unauthorized)?;

        self.repo
            .find_user_by_external_id(&external_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account for the caller.
    ///
    /// The user's first account becomes the default regardless of the flag.
    /// When `is_default` is requested explicitly, the flag is cleared on
    /// every other account inside the same store transaction, so the
    /// one-default-per-user invariant holds at every commit point.
    pub async fn create_account(
        &self,
        session: &SessionToken,
        new: NewAccount,
    ) -> Result<AccountView, AppError> {
        if new.initial_balance_cents < 0 {
            return Err(AppError::InvalidAmount(
                "Opening balance cannot be negative".to_string(),
            ));
        }

        let user = self.authenticate(session).await?;

        let has_accounts = !self.repo.list_accounts(user.id).await?.is_empty();
        let make_default = new.is_default || !has_accounts;

        let account = Account::new(user.id, new.name, new.kind, new.initial_balance_cents)
            .with_default(make_default);
        self.repo.insert_account(&account, make_default).await?;

        tracing::info!(user_id = %user.id, account_id = %account.id, "account created");
        self.invalidator.notify(StaleView::Dashboard);

        Ok(AccountView::from(&account))
    }

    /// List the caller's accounts in creation order.
    pub async fn list_accounts(&self, session: &SessionToken) -> Result<Vec<AccountView>, AppError> {
        let user = self.authenticate(session).await?;
        let accounts = self.repo.list_accounts(user.id).await?;
        Ok(accounts.iter().map(AccountView::from).collect())
    }

    /// Make `account_id` the caller's default account.
    ///
    /// Clears the flag on every other account and sets it on the target as
    /// one atomic unit; at no commit point can a user have two defaults, or
    /// zero while the target exists. A target that does not exist or belongs
    /// to another user rolls the whole unit back and fails with
    /// [AppError::AccountNotFound].
    pub async fn set_default_account(
        &self,
        session: &SessionToken,
        account_id: AccountId,
    ) -> Result<AccountView, AppError> {
        let user = self.authenticate(session).await?;

        let promoted = self.repo.promote_default_account(user.id, account_id).await?;
        if !promoted {
            return Err(AppError::AccountNotFound(account_id.to_string()));
        }

        let account = self
            .repo
            .get_account(account_id, user.id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        tracing::info!(user_id = %user.id, account_id = %account_id, "default account switched");
        self.invalidator.notify(StaleView::Dashboard);

        Ok(AccountView::from(&account))
    }

    /// Fetch an account together with its transactions (newest first) and
    /// transaction count.
    ///
    /// Returns `Ok(None)` when the account does not exist or belongs to
    /// another user; callers map that to a not-found presentation.
    pub async fn get_account_with_transactions(
        &self,
        session: &SessionToken,
        account_id: AccountId,
    ) -> Result<Option<AccountDetail>, AppError> {
        let user = self.authenticate(session).await?;

        let Some(account) = self.repo.get_account(account_id, user.id).await? else {
            return Ok(None);
        };

        let transactions = self.repo.list_transactions_for_account(account_id).await?;
        let transaction_count = self.repo.count_transactions_for_account(account_id).await?;

        Ok(Some(AccountDetail {
            account: AccountView::from(&account),
            transactions: transactions.iter().map(TransactionView::from).collect(),
            transaction_count,
        }))
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a transaction against one of the caller's accounts, posting
    /// its signed effect to the account balance in the same store
    /// transaction as the insert.
    pub async fn record_transaction(
        &self,
        session: &SessionToken,
        new: NewTransaction,
    ) -> Result<TransactionView, AppError> {
        if new.amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Transaction amount must be positive".to_string(),
            ));
        }

        let user = self.authenticate(session).await?;

        // Ownership check doubles as existence check.
        let account = self
            .repo
            .get_account(new.account_id, user.id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(new.account_id.to_string()))?;

        let mut transaction =
            Transaction::new(account.id, user.id, new.kind, new.amount_cents, new.date);
        if let Some(description) = new.description {
            transaction = transaction.with_description(description);
        }

        self.repo.insert_transaction_with_posting(&transaction).await?;

        tracing::info!(
            user_id = %user.id,
            account_id = %account.id,
            transaction_id = %transaction.id,
            kind = %transaction.kind,
            "transaction recorded"
        );
        self.invalidator.notify(StaleView::Dashboard);
        self.invalidator.notify(StaleView::AccountDetail(account.id));

        Ok(TransactionView::from(&transaction))
    }

    /// Delete a set of the caller's transactions and reverse their effect on
    /// the owning accounts' balances.
    ///
    /// Ids that are unknown or owned by another user are silently excluded
    /// from both the deletion and the balance math; the ownership filter is
    /// the sole authorization boundary. The net reversal delta is computed
    /// per distinct account and applied as a single update per account, and
    /// the deletions and balance updates commit together or not at all.
    pub async fn bulk_delete_transactions(
        &self,
        session: &SessionToken,
        transaction_ids: &[TransactionId],
    ) -> Result<BulkDeleteOutcome, AppError> {
        let user = self.authenticate(session).await?;

        if transaction_ids.is_empty() {
            return Ok(BulkDeleteOutcome {
                deleted: 0,
                touched_accounts: Vec::new(),
            });
        }

        let transactions = self
            .repo
            .find_owned_transactions(transaction_ids, user.id)
            .await?;

        let mut deltas: HashMap<AccountId, Cents> = HashMap::new();
        for transaction in &transactions {
            *deltas.entry(transaction.account_id).or_insert(0) += transaction.reversal_delta();
        }

        let deleted = self
            .repo
            .delete_transactions_with_reversal(user.id, transaction_ids, &deltas)
            .await?;

        let touched_accounts: Vec<AccountId> = deltas.into_keys().collect();

        tracing::info!(
            user_id = %user.id,
            deleted,
            accounts = touched_accounts.len(),
            "transactions deleted and balances reconciled"
        );
        self.invalidator.notify(StaleView::Dashboard);
        for account_id in &touched_accounts {
            self.invalidator.notify(StaleView::AccountDetail(*account_id));
        }

        Ok(BulkDeleteOutcome {
            deleted,
            touched_accounts,
        })
    }
}
