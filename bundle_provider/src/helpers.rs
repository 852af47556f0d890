use std::{fmt::Display, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

const COUNTRY_CODE: &str = "233";

/// Provider status strings that mean the bundle has been delivered.
pub const SUCCESS_STATUSES: [&str; 6] =
    ["delivered", "completed", "success", "fulfilled", "resolved", "delivered_callback"];
/// Provider status strings that mean the order will never be delivered.
pub const FAILURE_STATUSES: [&str; 6] = ["failed", "error", "cancelled", "rejected", "failed_callback", "refunded"];

/// The provider's free-text order status, collapsed onto the three states we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Processing,
    Completed,
    Failed,
}

impl ProviderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProviderStatus::Processing)
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderStatus::Processing => write!(f, "processing"),
            ProviderStatus::Completed => write!(f, "completed"),
            ProviderStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Maps a raw provider status onto [`ProviderStatus`]. Anything unrecognised, including no status at all, is
/// `Processing`.
pub fn map_provider_status(status: Option<&str>) -> ProviderStatus {
    let status = match status {
        Some(s) => s.trim().to_lowercase(),
        None => return ProviderStatus::Processing,
    };
    if SUCCESS_STATUSES.contains(&status.as_str()) {
        ProviderStatus::Completed
    } else if FAILURE_STATUSES.contains(&status.as_str()) {
        ProviderStatus::Failed
    } else {
        ProviderStatus::Processing
    }
}

/// Normalises a Ghanaian phone number to the 10-digit national format (`0XXXXXXXXX`).
///
/// Accepted inputs are `233XXXXXXXXX` (12 digits, optionally with a leading `+`) and `0XXXXXXXXX` (10 digits).
/// Spaces and dashes are ignored. Anything else is rejected with [`ProviderError::InvalidPhone`].
pub fn normalize_phone(phone: &str) -> Result<String, ProviderError> {
    let trimmed = phone.trim();
    let compact = trimmed.strip_prefix('+').unwrap_or(trimmed).replace([' ', '-'], "");
    if compact.is_empty() || !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(ProviderError::InvalidPhone(phone.to_string()));
    }
    match compact.len() {
        12 if compact.starts_with(COUNTRY_CODE) => Ok(format!("0{}", &compact[COUNTRY_CODE.len()..])),
        10 if compact.starts_with('0') => Ok(compact),
        _ => Err(ProviderError::InvalidPhone(phone.to_string())),
    }
}

/// Like [`normalize_phone`], but yields `None` instead of an error. Used when comparing phone-like values found in
/// provider responses.
pub fn try_normalize_phone(phone: &str) -> Option<String> {
    normalize_phone(phone).ok()
}

fn volume_regex() -> &'static Regex {
    static VOLUME: OnceLock<Regex> = OnceLock::new();
    VOLUME.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(GB|MB)").unwrap()
    })
}

/// Parses a bundle size such as `"1GB"`, `"1.5 gb"` or `"500MB"` into gigabytes. MB are converted by dividing by
/// 1000.
///
/// If no unit is present, all the digits in the string are taken as a whole number of gigabytes. Strings without
/// digits, or that resolve to a non-positive volume, are rejected.
pub fn parse_data_volume(amount: &str) -> Result<f64, ProviderError> {
    let volume = match volume_regex().captures(amount) {
        Some(caps) => {
            let n = caps[1].parse::<f64>().map_err(|e| ProviderError::InvalidVolume(format!("{amount}: {e}")))?;
            if caps[2].eq_ignore_ascii_case("MB") {
                n / 1000.0
            } else {
                n
            }
        },
        None => {
            let digits = amount.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
            if digits.is_empty() {
                return Err(ProviderError::InvalidVolume(amount.to_string()));
            }
            digits.parse::<u64>().map_err(|e| ProviderError::InvalidVolume(format!("{amount}: {e}")))? as f64
        },
    };
    if !volume.is_finite() || volume <= 0.0 {
        return Err(ProviderError::InvalidVolume(amount.to_string()));
    }
    Ok(volume)
}

fn uuid_regex() -> &'static Regex {
    static UUID: OnceLock<Regex> = OnceLock::new();
    UUID.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

/// True if `s` has the canonical 8-4-4-4-12 hex UUID shape.
pub fn is_uuid(s: &str) -> bool {
    uuid_regex().is_match(s.trim())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn national_numbers_pass_through() {
        assert_eq!(normalize_phone("0244000000").unwrap(), "0244000000");
        assert_eq!(normalize_phone(" 024 400 0000 ").unwrap(), "0244000000");
    }

    #[test]
    fn international_numbers_are_converted() {
        assert_eq!(normalize_phone("233244000000").unwrap(), "0244000000");
        assert_eq!(normalize_phone("+233244000000").unwrap(), "0244000000");
        assert_eq!(normalize_phone("233-24-400-0000").unwrap(), "0244000000");
    }

    #[test]
    fn phone_normalization_is_idempotent() {
        for p in ["0244000000", "233201234567", "0559876543", "233501112223"] {
            let once = normalize_phone(p).unwrap();
            assert_eq!(normalize_phone(&once).unwrap(), once);
        }
    }

    #[test]
    fn bad_phone_numbers() {
        for p in ["", "244000000", "02440000001", "2332440000001", "1234567890", "0244O00000", "+0244000000x"] {
            assert!(matches!(normalize_phone(p), Err(ProviderError::InvalidPhone(_))), "{p} should be rejected");
        }
    }

    #[test]
    fn volumes_with_units() {
        assert_eq!(parse_data_volume("1GB").unwrap(), 1.0);
        assert_eq!(parse_data_volume("2.5 gb").unwrap(), 2.5);
        assert_eq!(parse_data_volume("500MB").unwrap(), 0.5);
        assert_eq!(parse_data_volume("bundle 750mb").unwrap(), 0.75);
    }

    #[test]
    fn volumes_without_units() {
        assert_eq!(parse_data_volume("10").unwrap(), 10.0);
        assert_eq!(parse_data_volume("size-3").unwrap(), 3.0);
    }

    #[test]
    fn invalid_volumes() {
        assert!(matches!(parse_data_volume("unlimited"), Err(ProviderError::InvalidVolume(_))));
        assert!(matches!(parse_data_volume("0GB"), Err(ProviderError::InvalidVolume(_))));
        assert!(matches!(parse_data_volume("000"), Err(ProviderError::InvalidVolume(_))));
        assert!(matches!(parse_data_volume(""), Err(ProviderError::InvalidVolume(_))));
    }

    #[test]
    fn status_vocabulary() {
        for s in SUCCESS_STATUSES {
            assert_eq!(map_provider_status(Some(s)), ProviderStatus::Completed);
        }
        for s in FAILURE_STATUSES {
            assert_eq!(map_provider_status(Some(s)), ProviderStatus::Failed);
        }
        assert_eq!(map_provider_status(Some(" Delivered ")), ProviderStatus::Completed);
        assert_eq!(map_provider_status(Some("REFUNDED")), ProviderStatus::Failed);
        assert_eq!(map_provider_status(Some("pending")), ProviderStatus::Processing);
        assert_eq!(map_provider_status(Some("")), ProviderStatus::Processing);
        assert_eq!(map_provider_status(None), ProviderStatus::Processing);
    }

    #[test]
    fn uuid_shapes() {
        assert!(is_uuid("3f2b8c1e-9d4a-4e6b-8f0a-1c2d3e4f5a6b"));
        assert!(is_uuid("3F2B8C1E-9D4A-4E6B-8F0A-1C2D3E4F5A6B"));
        assert!(!is_uuid("3f2b8c1e9d4a4e6b8f0a1c2d3e4f5a6b"));
        assert!(!is_uuid("ORD-12345"));
    }
}
