//! Staleness decision for the check-and-update path.

use chrono::{DateTime, Duration, Utc};

/// Result of comparing the freshness basis against the staleness threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing has been mirrored yet.
    NeverSynced,
    /// Data is at least as old as the threshold.
    Stale {
        /// Age of the basis timestamp.
        age: Duration,
    },
    /// Data is younger than the threshold.
    Fresh {
        /// Age of the basis timestamp.
        age: Duration,
    },
}

impl Freshness {
    /// Whether a sync pass should run.
    pub fn needs_sync(self) -> bool {
        !matches!(self, Self::Fresh { .. })
    }

    /// Age of the basis timestamp, if anything was mirrored.
    pub fn age(self) -> Option<Duration> {
        match self {
            Self::NeverSynced => None,
            Self::Stale { age } | Self::Fresh { age } => Some(age),
        }
    }
}

/// Classify `basis` relative to `now`.
///
/// An age exactly equal to `stale_after` counts as stale.
pub fn assess(
    now: DateTime<Utc>,
    basis: Option<DateTime<Utc>>,
    stale_after: Duration,
) -> Freshness {
    let Some(basis) = basis else {
        return Freshness::NeverSynced;
    };
    let age = pulse_core::time::age(now, basis);
    if age >= stale_after {
        Freshness::Stale { age }
    } else {
        Freshness::Fresh { age }
    }
}
