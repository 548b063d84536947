//! # Plotgrid Testing
//!
//! Testing utilities for reducers built on `plotgrid-core`.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic timestamps
//! - [`ReducerTest`], a Given-When-Then builder for reducer tests
//! - Effect assertion helpers
//!
//! ## Example
//!
//! ```ignore
//! use plotgrid_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(CanvasReducer::new())
//!     .with_env(test_environment())
//!     .given_state(CanvasState::new(GridBounds::default()).unwrap())
//!     .when_action(CanvasAction::PointerDown { cell: Cell::new(0, 0) })
//!     .then_state(|state| assert!(state.selection.active))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use plotgrid_core::environment::Clock;


pub use reducer_test::{assertions, ReducerTest};

/// Deterministic stand-ins for environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Clock frozen at one instant
    ///
    /// Reservation attempts stamped with it compare equal across runs.
    ///
    /// # Example
    ///
    /// ```
    /// use plotgrid_testing::mocks::FixedClock;
    /// use plotgrid_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Clock frozen at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock frozen at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

pub use mocks::{test_clock, FixedClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_clock_is_new_year_2025() {
        assert_eq!(test_clock().now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
