use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// A user of the ledger. Users are created as a side effect of the first
/// successful authentication against the external identity provider; this
/// core only ever reads them.
///
/// `external_id` is the opaque key the identity provider knows the user by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            created_at: Utc::now(),
        }
    }
}
