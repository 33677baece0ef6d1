use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The session token did not resolve to an identity.
    #[error("Unauthorized: session did not resolve to a user identity")]
    Unauthorized,

    /// The identity resolved, but no user record exists for it.
    #[error("User not found")]
    UserNotFound,

    /// The account does not exist or is not owned by the caller. The two
    /// cases are deliberately indistinguishable.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The store could not complete an operation; any atomic block it
    /// occurred in has been rolled back.
    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
