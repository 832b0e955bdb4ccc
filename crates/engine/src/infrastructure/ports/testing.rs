//! Time and dice, injected so tests can pin them.

use chrono::{DateTime, Utc};

/// Wall clock for file names and save timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of die faces.
pub trait RandomPort: Send + Sync {
    /// Roll one die, returning a face in `1..=sides`.
    fn roll_die(&self, sides: u8) -> u8;
}
