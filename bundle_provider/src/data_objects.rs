use bundle_common::Network;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::helpers::ProviderStatus;

/// An entry in the provider's offer catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Free-text network name, e.g. "MTN" or "Vodafone"
    pub isp: String,
    #[serde(rename = "type")]
    pub offer_type: String,
    #[serde(rename = "offerSlug")]
    pub offer_slug: String,
    /// Advertised bundle sizes in GB. The provider does not keep this list accurate, so it is advisory only.
    #[serde(default)]
    pub volumes: Vec<f64>,
}

impl Offer {
    pub fn new<S: Into<String>>(isp: S, offer_type: S, offer_slug: S) -> Self {
        Self { isp: isp.into(), offer_type: offer_type.into(), offer_slug: offer_slug.into(), volumes: vec![] }
    }

    pub fn with_volumes(mut self, volumes: Vec<f64>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn is_data_offer(&self) -> bool {
        self.offer_type.to_lowercase().contains("data")
    }

    /// Builds an offer from a catalog entry. Entries without an `offerSlug` are unusable and yield `None`.
    ///
    /// Volumes may be given as numbers, numeric strings ("2", "2GB"), or objects with a `volume`/`size` field.
    pub fn from_value(value: &Value) -> Option<Self> {
        let offer_slug = value["offerSlug"].as_str().or_else(|| value["offer_slug"].as_str())?.trim().to_string();
        if offer_slug.is_empty() {
            return None;
        }
        let isp = value["isp"].as_str().or_else(|| value["network"].as_str()).unwrap_or_default().to_string();
        let offer_type = value["type"].as_str().unwrap_or_default().to_string();
        let volumes = value["volumes"]
            .as_array()
            .map(|vols| vols.iter().filter_map(volume_from_value).collect())
            .unwrap_or_default();
        Some(Self { isp, offer_type, offer_slug, volumes })
    }
}

fn volume_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => crate::helpers::parse_data_volume(s).ok(),
        Value::Object(_) => volume_from_value(&value["volume"]).or_else(|| volume_from_value(&value["size"])),
        _ => None,
    }
}

/// Everything needed to place a bundle order with the provider.
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub network: Network,
    /// The bundle size as sold, e.g. "1GB" or "500MB"
    pub data_amount: String,
    pub recipient_phone: String,
    /// Our own reference for the order. The provider echoes it back and it doubles as the fallback identifier.
    pub reference: String,
}

impl PlaceOrderRequest {
    pub fn new<S: Into<String>>(network: Network, data_amount: S, recipient_phone: S, reference: S) -> Self {
        Self {
            network,
            data_amount: data_amount.into(),
            recipient_phone: recipient_phone.into(),
            reference: reference.into(),
        }
    }
}

/// The JSON body for `POST /order/{network}`.
///
/// The callback URL is sent under all three spellings the provider has been seen to honour.
#[derive(Debug, Clone, Serialize)]
pub struct NewProviderOrder {
    #[serde(rename = "type")]
    pub order_type: String,
    pub volume: Value,
    pub phone: String,
    #[serde(rename = "offerSlug")]
    pub offer_slug: String,
    pub reference: String,
    #[serde(rename = "webhookUrl")]
    pub webhook_url: String,
    pub callback_url: String,
    #[serde(rename = "callbackURL")]
    pub callback_url_alt: String,
}

/// Whether the provider took the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    Accepted,
    /// Timeouts, transport errors and 5xx responses. The provider may or may not have seen the order.
    Unreachable(String),
    /// The provider answered and explicitly refused the order.
    Rejected(String),
}

/// The result of [`crate::ProviderApi::place_order`].
#[derive(Debug, Clone)]
pub struct OrderPlacement {
    pub outcome: PlacementOutcome,
    pub status: ProviderStatus,
    /// The provider's raw status string, if it sent one
    pub provider_status: Option<String>,
    /// The raw response body (or `Null` if there was none)
    pub raw: Value,
    /// Best-effort provider order id. Set for every accepted placement, falling back to our own reference.
    pub provider_order_id: Option<String>,
    pub provider_reference: Option<String>,
    pub offer_slug: String,
    pub volume_gb: f64,
}

impl OrderPlacement {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, PlacementOutcome::Accepted)
    }
}

/// The result of [`crate::ProviderApi::check_order_status`].
#[derive(Debug, Clone)]
pub struct OrderStatusReport {
    pub status: ProviderStatus,
    pub provider_status: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBalance {
    pub balance: f64,
    pub currency: String,
}
