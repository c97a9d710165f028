//! Helpers for reading typed settings from a key/value source.
//!
//! Loaders across the workspace take an [`EnvLookup`] instead of calling
//! `std::env::var` directly, so tests can hand them a fixed map. Blank values
//! are treated the same as unset ones.

use std::str::FromStr;

/// Resolves a setting name to its raw value, if any.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Error raised when a setting is missing or cannot be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key} has invalid value '{value}': expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Fetch a setting, trimming whitespace and dropping empty values.
pub fn optional(lookup: EnvLookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fetch a setting that has no default.
pub fn required(lookup: EnvLookup<'_>, key: &'static str) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or(ConfigError::Missing { key })
}

/// Fetch a string setting, falling back to `default`.
pub fn string_or(lookup: EnvLookup<'_>, key: &str, default: &str) -> String {
    optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse a setting with [`FromStr`], falling back to `default` when unset.
pub fn parse_or<T: FromStr>(
    lookup: EnvLookup<'_>,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match optional(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected,
        }),
    }
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn flag_or(lookup: EnvLookup<'_>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = optional(lookup, key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a boolean",
        }),
    }
}
