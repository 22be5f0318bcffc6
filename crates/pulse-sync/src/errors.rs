//! Error types for sync passes.
//!
//! Upstream failures never surface here: they are recorded in the
//! [`SyncReport`](crate::report::SyncReport) and the pass continues.
//! Store failures and unusable windows abort a pass.

use pulse_store::StoreError;
use thiserror::Error;

/// Errors that abort a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A store read or write failed. The sync cursor was not advanced.
    #[error("store failure while {context}: {source}")]
    Store {
        /// What the pass was doing.
        context: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The lookback window starts before the earliest representable instant.
    #[error("lookback of {days} days is out of range")]
    LookbackOutOfRange {
        /// Requested window length.
        days: u32,
    },

    /// A blocking store task panicked or was cancelled.
    #[error("store task failed while {context}: {source}")]
    Blocking {
        /// What the pass was doing.
        context: String,
        /// Join failure.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl SyncError {
    /// Closure for `map_err` that tags a store error with `context`.
    pub(crate) fn store(context: impl Into<String>) -> impl FnOnce(StoreError) -> Self {
        let context = context.into();
        move |source| Self::Store { context, source }
    }
}

/// Convenience type alias for sync results.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_carries_context() {
        let err = SyncError::store("upserting repository davehague/pulse")(StoreError::Migration {
            message: "boom".into(),
        });
        assert_eq!(
            err.to_string(),
            "store failure while upserting repository davehague/pulse: migration error: boom"
        );
    }

    #[test]
    fn lookback_display() {
        let err = SyncError::LookbackOutOfRange { days: 200_000_000 };
        assert_eq!(err.to_string(), "lookback of 200000000 days is out of range");
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error as _;
        let err = SyncError::store("reading cursor")(StoreError::Migration {
            message: "x".into(),
        });
        assert!(err.source().is_some());
    }
}
