/// The key the external identity provider knows a user by. Opaque to this
/// core; it only ever compares and stores it.
pub type ExternalUserId = String;

/// An opaque session token threaded into every service call by the
/// presentation layer. Never ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Maps a session token to a stable external user identity.
///
/// Implemented by the authentication layer (out of scope here) and injected
/// into [LedgerService](crate::application::LedgerService). A `None` result
/// means the session is invalid or expired and the operation must fail with
/// [AppError::Unauthorized](crate::application::AppError::Unauthorized).
pub trait IdentityResolver: Send + Sync {
    fn resolve_session(&self, token: &SessionToken) -> Option<ExternalUserId>;
}
