use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    StatusCode,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    config::ProviderConfig,
    data_objects::{
        NewProviderOrder,
        Offer,
        OrderPlacement,
        OrderStatusReport,
        PlaceOrderRequest,
        PlacementOutcome,
        ProviderBalance,
    },
    helpers::{map_provider_status, normalize_phone, parse_data_volume, ProviderStatus},
    identifier::extract_provider_order_id,
    offers::{OfferCache, OfferResolver},
    ProviderError,
};

const API_KEY_HEADER: &str = "X-API-Key";

/// Client for the data bundle provider's REST API.
///
/// Cloning is cheap; clones share the HTTP connection pool and the offer cache.
#[derive(Clone)]
pub struct ProviderApi {
    config: ProviderConfig,
    client: Arc<Client>,
    offers: Arc<OfferCache>,
    resolver: OfferResolver,
}

impl ProviderApi {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Initialization(e.to_string()))?;
        let offers = Arc::new(OfferCache::new(config.offer_cache_ttl));
        let resolver = OfferResolver::new(config.fallback_offers.clone());
        Ok(Self { config, client: Arc::new(client), offers, resolver })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_ref()
            .filter(|k| !k.is_blank())
            .map(|k| k.reveal().as_str())
            .ok_or(ProviderError::MissingApiKey)
    }

    /// Sends a request to the provider and returns the parsed JSON body of a 2xx response.
    ///
    /// Transport failures and timeouts become [`ProviderError::Unavailable`]; non-2xx responses become
    /// [`ProviderError::QueryError`].
    pub async fn rest_query<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<Value, ProviderError> {
        let api_key = self.api_key()?;
        let url = self.url(path);
        trace!("📡️ Sending {method} {url}");
        let mut req = self.client.request(method, url).header(API_KEY_HEADER, api_key);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Unavailable(format!("Request to {path} timed out"))
            } else {
                ProviderError::Unavailable(e.to_string())
            }
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        if status.is_success() {
            trace!("📡️ {path} responded with {status}");
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| ProviderError::JsonError(format!("{e}. Body: {text}")))
        } else {
            Err(ProviderError::QueryError { status: status.as_u16(), message: text })
        }
    }

    /// Places a data bundle order with the provider.
    ///
    /// Bad input (phone number, data amount), a missing API key, and having no usable offer are errors. Everything
    /// that goes wrong once the request is on the wire is reported through [`OrderPlacement::outcome`] instead, so
    /// that the caller can decide whether to retry.
    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderPlacement, ProviderError> {
        let phone = normalize_phone(&request.recipient_phone)?;
        let volume_gb = parse_data_volume(&request.data_amount)?;
        self.api_key()?;
        let offers = match self.fetch_offers().await {
            Ok(offers) => Some(offers),
            Err(e) => {
                warn!("📡️ Offer catalog unavailable ({e}). Relying on fallback offers for {}", request.network);
                None
            },
        };
        let resolved = self.resolver.resolve(request.network, volume_gb, offers.as_ref().map(|o| o.as_slice()))?;
        let callback_url = self.config.callback_url();
        let body = NewProviderOrder {
            order_type: "data".to_string(),
            volume: volume_json(volume_gb),
            phone: phone.clone(),
            offer_slug: resolved.offer_slug.clone(),
            reference: request.reference.clone(),
            webhook_url: callback_url.clone(),
            callback_url: callback_url.clone(),
            callback_url_alt: callback_url,
        };
        let path = format!("/order/{}", request.network.slug());
        debug!(
            "📡️ Placing order {} for {volume_gb}GB on {} to {phone} using offer {}",
            request.reference, request.network, resolved.offer_slug
        );
        let mut placement = OrderPlacement {
            outcome: PlacementOutcome::Accepted,
            status: ProviderStatus::Processing,
            provider_status: None,
            raw: Value::Null,
            provider_order_id: None,
            provider_reference: None,
            offer_slug: resolved.offer_slug,
            volume_gb,
        };
        match self.rest_query(Method::POST, &path, Some(body)).await {
            Ok(raw) => {
                if raw["success"] == Value::Bool(false) {
                    let message = envelope_message(&raw).unwrap_or_else(|| "success: false".to_string());
                    warn!("📡️ Provider rejected order {}: {message}", request.reference);
                    placement.outcome = PlacementOutcome::Rejected(message);
                } else {
                    let provider_status = find_status(&raw);
                    placement.status = map_provider_status(provider_status.as_deref());
                    placement.provider_status = provider_status;
                    placement.provider_order_id =
                        Some(extract_provider_order_id(&raw, &request.reference, Some(phone.as_str())));
                    placement.provider_reference = find_reference(&raw);
                    info!(
                        "📡️ Order {} accepted by provider as {}. Status: {}",
                        request.reference,
                        placement.provider_order_id.as_deref().unwrap_or_default(),
                        placement.status
                    );
                }
                placement.raw = raw;
            },
            Err(ProviderError::QueryError { status, message }) if is_rejection(status) => {
                warn!("📡️ Provider refused order {} with {status}: {message}", request.reference);
                placement.raw = serde_json::from_str(&message).unwrap_or(Value::String(message.clone()));
                placement.outcome = PlacementOutcome::Rejected(format!("HTTP {status}. {message}"));
            },
            Err(e) => {
                warn!("📡️ Could not reach the provider for order {}: {e}", request.reference);
                placement.outcome = PlacementOutcome::Unreachable(e.to_string());
            },
        }
        Ok(placement)
    }

    /// Queries the provider for the current state of an order, by provider order id or by reference.
    pub async fn check_order_status(&self, id_or_reference: &str) -> Result<OrderStatusReport, ProviderError> {
        let path = format!("/order/status/{id_or_reference}");
        let raw = self.rest_query::<()>(Method::GET, &path, None).await.map_err(|e| match e {
            e @ ProviderError::MissingApiKey => e,
            e => ProviderError::Unavailable(e.to_string()),
        })?;
        if raw["success"] != Value::Bool(true) {
            let message = envelope_message(&raw).unwrap_or_else(|| "response not marked as successful".to_string());
            return Err(ProviderError::Unavailable(format!("Status check for {id_or_reference} failed: {message}")));
        }
        let provider_status = find_status(&raw);
        let status = map_provider_status(provider_status.as_deref());
        debug!("📡️ Order {id_or_reference} has provider status {provider_status:?} ({status})");
        Ok(OrderStatusReport { status, provider_status, raw })
    }

    /// Fetches the account balance held with the provider. Missing fields default to a zero balance in the base
    /// currency.
    pub async fn check_balance(&self) -> Result<ProviderBalance, ProviderError> {
        let raw = self.rest_query::<()>(Method::GET, "/balance", None).await?;
        let data = if raw["data"].is_object() { &raw["data"] } else { &raw };
        let balance = match &data["balance"] {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
            _ => 0.0,
        };
        let currency = data["currency"].as_str().unwrap_or(self.config.base_currency.as_str()).to_string();
        Ok(ProviderBalance { balance, currency })
    }

    /// Returns the provider's offer catalog, from cache if it is fresh. See [`OfferCache::get_or_refresh`] for the
    /// failure behaviour.
    pub async fn fetch_offers(&self) -> Result<Arc<Vec<Offer>>, ProviderError> {
        self.offers.get_or_refresh(|| self.fetch_offer_catalog()).await
    }

    async fn fetch_offer_catalog(&self) -> Result<Vec<Offer>, ProviderError> {
        let raw = self.rest_query::<()>(Method::GET, "/offers", None).await.map_err(|e| match e {
            e @ ProviderError::MissingApiKey => e,
            e => ProviderError::Unavailable(e.to_string()),
        })?;
        if raw["success"] != Value::Bool(true) {
            let message = envelope_message(&raw).unwrap_or_else(|| "response not marked as successful".to_string());
            return Err(ProviderError::Unavailable(format!("Offer catalog request failed: {message}")));
        }
        let entries = [&raw["data"], &raw["data"]["offers"], &raw["offers"]]
            .into_iter()
            .find_map(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let offers = entries.iter().filter_map(Offer::from_value).collect::<Vec<Offer>>();
        debug!("🏷️ Provider returned {} catalog entries, {} usable offers", entries.len(), offers.len());
        Ok(offers)
    }
}

/// 4xx responses (other than timeouts and rate limiting) mean the provider looked at the order and said no.
fn is_rejection(status: u16) -> bool {
    StatusCode::from_u16(status)
        .map(|s| s.is_client_error() && s != StatusCode::REQUEST_TIMEOUT && s != StatusCode::TOO_MANY_REQUESTS)
        .unwrap_or(false)
}

fn volume_json(volume_gb: f64) -> Value {
    if volume_gb.fract() == 0.0 && volume_gb <= u32::MAX as f64 {
        json!(volume_gb as u64)
    } else {
        json!(volume_gb)
    }
}

fn envelope_message(raw: &Value) -> Option<String> {
    [&raw["message"], &raw["error"], &raw["data"]["message"]]
        .into_iter()
        .find_map(|v| v.as_str())
        .map(|s| s.to_string())
}

/// The provider puts the order status in one of several places. The top-level `status` belongs to the envelope and is
/// never read.
fn find_status(raw: &Value) -> Option<String> {
    [
        &raw["data"]["status"],
        &raw["data"]["orderStatus"],
        &raw["data"]["order"]["status"],
        &raw["data"]["items"][0]["status"],
        &raw["orderStatus"],
        &raw["items"][0]["status"],
    ]
    .into_iter()
    .find_map(|v| v.as_str())
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

fn find_reference(raw: &Value) -> Option<String> {
    [&raw["data"]["reference"], &raw["data"]["order"]["reference"], &raw["reference"]]
        .into_iter()
        .find_map(|v| v.as_str())
        .map(|s| s.to_string())
}
