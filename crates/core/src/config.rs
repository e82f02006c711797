//! Environment overrides for policy configuration.
//!
//! Policies are plain structs with defaults; `from_env()` constructors layer
//! `STEWARD_*` variables on top using these helpers.

use core::str::FromStr;

/// Parse `key` from the environment, falling back to `default` when unset.
///
/// A value that fails to parse is logged and ignored.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    error = %e,
                    "ignoring unparsable config override"
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Comma-separated list from the environment, or `default` when unset.
pub fn env_list_or(key: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_keys_use_the_default() {
        assert_eq!(env_or("STEWARD_TEST_SURELY_UNSET_KEY", 42usize), 42);
        assert_eq!(
            env_list_or("STEWARD_TEST_SURELY_UNSET_LIST", vec!["a".into()]),
            vec!["a".to_string()]
        );
    }
}
