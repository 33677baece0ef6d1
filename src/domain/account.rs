use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Everyday checking account
    Current,
    /// Interest-bearing savings account
    Savings,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Current => "current",
            AccountKind::Savings => "savings",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "current" => Some(AccountKind::Current),
            "savings" => Some(AccountKind::Savings),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial account owned by exactly one user.
///
/// The balance is mutated only by transaction postings and reversals.
/// Per user, at most one account may have `is_default` set; the repository
/// enforces this by clearing the flag on siblings inside the same store
/// transaction that sets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub name: String,
    pub kind: AccountKind,
    pub balance_cents: Cents,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: UserId, name: impl Into<String>, kind: AccountKind, balance_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            kind,
            balance_cents,
            is_default: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}
