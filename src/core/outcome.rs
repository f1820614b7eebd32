//! Result type shared by the synchronizers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote source could not be reached or answered with an error.
    #[error("Transport error: {0:#}")]
    Transport(anyhow::Error),

    /// Reading from or writing to the reference store failed.
    #[error("Store error: {0:#}")]
    Store(anyhow::Error),
}

/// Outcome of a sync pass.
///
/// `Failed` carries whatever was durably committed before the failure, which
/// is empty for the single-commit stages.
#[derive(Debug)]
pub enum SyncOutcome<T> {
    Synced(T),
    NothingToDo,
    Failed { error: SyncError, partial: T },
}

impl<T: Default> SyncOutcome<T> {
    pub fn failed(error: SyncError) -> Self {
        SyncOutcome::Failed {
            error,
            partial: T::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Data produced by the pass, empty when there was nothing to do.
    pub fn into_data(self) -> T {
        match self {
            SyncOutcome::Synced(data) => data,
            SyncOutcome::NothingToDo => T::default(),
            SyncOutcome::Failed { partial, .. } => partial,
        }
    }
}
