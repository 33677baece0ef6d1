use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents, UserId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money leaving the account
    Expense,
    /// Money entering the account
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expense" => Some(TransactionKind::Expense),
            "income" => Some(TransactionKind::Income),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ledger entry against one account.
///
/// The amount is always a non-negative magnitude; the kind carries the sign.
/// `user_id` duplicates the owning account's user so ownership checks never
/// need a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    /// When the transaction occurred in the real world
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    /// When we recorded this transaction in the system
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        user_id: UserId,
        kind: TransactionKind,
        amount_cents: Cents,
        date: DateTime<Utc>,
    ) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            account_id,
            user_id,
            kind,
            amount_cents,
            date,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The signed effect this transaction has on its account's balance when
    /// posted: expenses debit, income credits.
    pub fn posting_delta(&self) -> Cents {
        match self.kind {
            TransactionKind::Expense => -self.amount_cents,
            TransactionKind::Income => self.amount_cents,
        }
    }

    /// The signed effect of undoing this transaction, i.e. the exact negation
    /// of the posting. Applied when the transaction is deleted.
    pub fn reversal_delta(&self) -> Cents {
        -self.posting_delta()
    }
}
