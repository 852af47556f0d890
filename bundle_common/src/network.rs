use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// The mobile networks that data bundles can be purchased for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Mtn,
    /// Formerly Vodafone Ghana
    Telecel,
    AirtelTigo,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown network: {0}")]
pub struct NetworkConversionError(String);

impl Network {
    pub const ALL: [Network; 3] = [Network::Mtn, Network::Telecel, Network::AirtelTigo];

    /// The path segment the provider uses for this network in `POST /order/{slug}`.
    pub fn slug(&self) -> &'static str {
        match self {
            Network::Mtn => "mtn",
            Network::Telecel => "telecel",
            Network::AirtelTigo => "airteltigo",
        }
    }

    /// Every spelling of this network's name that has been seen in the provider's `isp` field. All entries are
    /// lowercase.
    pub fn isp_aliases(&self) -> &'static [&'static str] {
        match self {
            Network::Mtn => &["mtn", "mtn ghana", "mtn gh", "mtngh", "scancom"],
            Network::Telecel => &["telecel", "telecel ghana", "vodafone", "vodafone ghana", "voda"],
            Network::AirtelTigo => {
                &["airteltigo", "airtel tigo", "airtel-tigo", "airtel_tigo", "at", "at ghana", "airtel", "tigo"]
            },
        }
    }

    /// True if `isp` (compared case-insensitively, ignoring surrounding whitespace) names this network.
    pub fn matches_isp(&self, isp: &str) -> bool {
        let isp = isp.trim().to_lowercase();
        self.isp_aliases().iter().any(|alias| *alias == isp)
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mtn => write!(f, "MTN"),
            Network::Telecel => write!(f, "TELECEL"),
            Network::AirtelTigo => write!(f, "AIRTELTIGO"),
        }
    }
}

impl FromStr for Network {
    type Err = NetworkConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .iter()
            .copied()
            .find(|n| n.to_string().eq_ignore_ascii_case(s.trim()) || n.matches_isp(s))
            .ok_or_else(|| NetworkConversionError(s.to_string()))
    }
}
