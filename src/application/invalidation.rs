use crate::domain::AccountId;

/// A materialized view that has gone stale after a successful mutation and
/// must be recomputed on next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleView {
    /// The user's dashboard (account list, totals).
    Dashboard,
    /// The detail view of a single account.
    AccountDetail(AccountId),
}

/// Receives stale-view notifications after successful mutations.
///
/// Fire-and-forget: implementations must not block, and failures here never
/// affect the result reported for the mutation itself.
pub trait ViewInvalidator: Send + Sync {
    fn notify(&self, view: StaleView);
}

/// Discards all notifications. The default when no presentation layer cares.
pub struct NoopInvalidator;

impl ViewInvalidator for NoopInvalidator {
    fn notify(&self, _view: StaleView) {}
}
