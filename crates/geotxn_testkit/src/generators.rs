//! Property-based test generators using proptest.

use geotxn_core::FanOut;
use proptest::prelude::*;

/// Strategy for generating state key names.
pub fn key_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating authorization tokens.
pub fn token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{2,6}-[0-9]{1,4}").expect("Invalid regex")
}

/// Strategy for generating fan-out operations.
pub fn fan_out_strategy() -> impl Strategy<Value = FanOut> {
    prop_oneof![
        Just(FanOut::Commit),
        Just(FanOut::Rollback),
        Just(FanOut::AddAuthorization),
    ]
}

/// Strategy for generating failure plans for up to `max_states` states.
///
/// Entry `i` says whether state `i` fails.
pub fn failure_plan_strategy(max_states: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..=max_states)
}

/// Case counts for property tests.
///
/// `default` suits the integration suite; `quick` keeps unit-level
/// generator checks fast.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
