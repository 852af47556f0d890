use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads `name` from the environment and parses it. Missing values silently fall back to `default`; values that do
/// not parse are logged and also fall back to `default`.
pub fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

/// Reads a number of whole seconds from the environment variable `name`.
pub fn env_seconds_or_default(name: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or_default(name, default.as_secs()))
}

/// Reads an optional, non-empty string from the environment.
pub fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
