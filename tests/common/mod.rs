// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use moneta::application::{
    IdentityResolver, LedgerService, NewAccount, NewTransaction, SessionToken, StaleView,
    ViewInvalidator,
};
use moneta::domain::{AccountKind, Cents, TransactionKind, User};
use moneta::storage::Repository;
use tempfile::TempDir;

/// Session token for the primary test user.
pub const ALICE_TOKEN: &str = "session-alice";
/// Session token for a second user, used for ownership-isolation tests.
pub const BOB_TOKEN: &str = "session-bob";
/// Session that resolves to an identity with no user record behind it.
pub const GHOST_TOKEN: &str = "session-ghost";

/// Identity resolver backed by a fixed token table.
#[derive(Default)]
pub struct StubResolver {
    sessions: HashMap<String, String>,
}

impl StubResolver {
    pub fn with_session(mut self, token: &str, external_id: &str) -> Self {
        self.sessions.insert(token.to_string(), external_id.to_string());
        self
    }
}

impl IdentityResolver for StubResolver {
    fn resolve_session(&self, token: &SessionToken) -> Option<String> {
        self.sessions.get(token.as_str()).cloned()
    }
}

/// Invalidator that records every notification for later assertions.
#[derive(Clone, Default)]
pub struct RecordingInvalidator {
    views: Arc<Mutex<Vec<StaleView>>>,
}

impl RecordingInvalidator {
    pub fn notified(&self) -> Vec<StaleView> {
        self.views.lock().unwrap().clone()
    }
}

impl ViewInvalidator for RecordingInvalidator {
    fn notify(&self, view: StaleView) {
        self.views.lock().unwrap().push(view);
    }
}

/// Helper to create a test service with a temporary database, seeded with
/// users for [ALICE_TOKEN] and [BOB_TOKEN] (but not [GHOST_TOKEN]).
pub async fn test_service() -> Result<(LedgerService<StubResolver>, Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let repo = Repository::init(&db_url).await?;

    repo.save_user(&User::new("clerk-alice")).await?;
    repo.save_user(&User::new("clerk-bob")).await?;

    let resolver = StubResolver::default()
        .with_session(ALICE_TOKEN, "clerk-alice")
        .with_session(BOB_TOKEN, "clerk-bob")
        .with_session(GHOST_TOKEN, "clerk-ghost");

    let service = LedgerService::new(repo.clone(), resolver);
    Ok((service, repo, temp_dir))
}

/// Like [test_service], but with a recording invalidator attached.
pub async fn test_service_with_invalidator() -> Result<(
    LedgerService<StubResolver>,
    Repository,
    RecordingInvalidator,
    TempDir,
)> {
    let (service, repo, temp_dir) = test_service().await?;
    let invalidator = RecordingInvalidator::default();
    let service = service.with_invalidator(Box::new(invalidator.clone()));
    Ok((service, repo, invalidator, temp_dir))
}

pub fn session(token: &str) -> SessionToken {
    SessionToken::new(token)
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub fn new_account(name: &str, initial_balance_cents: Cents) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        kind: AccountKind::Current,
        initial_balance_cents,
        is_default: false,
    }
}

pub fn new_transaction(
    account_id: moneta::domain::AccountId,
    kind: TransactionKind,
    amount_cents: Cents,
    date: &str,
) -> NewTransaction {
    NewTransaction {
        account_id,
        kind,
        amount_cents,
        date: parse_date(date),
        description: None,
    }
}
