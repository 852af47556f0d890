use std::{collections::HashMap, time::Duration};

use bundle_common::{
    helpers::{env_non_empty, env_or_default, env_seconds_or_default},
    Network,
    Secret,
};
use log::*;

use crate::offers::default_fallback_offers;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.databundlehub.com/api/v1";
/// Used whenever no usable public callback base URL has been configured.
pub const PRODUCTION_CALLBACK_BASE: &str = "https://api.bundlestore.app/api";
pub const DEFAULT_CALLBACK_PATH: &str = "/webhooks/provider";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_OFFER_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_BASE_CURRENCY: &str = "GHS";

const LOOPBACK_MARKERS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base path of the provider's REST API, without a trailing slash
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub request_timeout: Duration,
    /// Public URL of this backend. First choice for building the callback URL.
    pub backend_url: Option<String>,
    /// Public URL of the storefront. The API is assumed to be served under `/api` on the same origin.
    pub frontend_url: Option<String>,
    pub callback_path: String,
    pub offer_cache_ttl: Duration,
    pub base_currency: String,
    pub fallback_offers: HashMap<Network, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backend_url: None,
            frontend_url: None,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            offer_cache_ttl: DEFAULT_OFFER_CACHE_TTL,
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            fallback_offers: default_fallback_offers(),
        }
    }
}

impl ProviderConfig {
    pub fn new<S: Into<String>>(base_url: S, api_key: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: Some(Secret::new(api_key.into())),
            ..Default::default()
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = env_non_empty("BUNDLE_PROVIDER_URL").unwrap_or_else(|| {
            warn!("🪛️ BUNDLE_PROVIDER_URL not set, using {DEFAULT_PROVIDER_URL} as default");
            DEFAULT_PROVIDER_URL.to_string()
        });
        let api_key = env_non_empty("BUNDLE_PROVIDER_API_KEY").map(Secret::new);
        if api_key.is_none() {
            warn!("🪛️ BUNDLE_PROVIDER_API_KEY not set. No orders can be placed until it is configured.");
        }
        let fallback_offers = Network::ALL
            .into_iter()
            .filter_map(|network| {
                let var = format!("BUNDLE_FALLBACK_OFFER_{network}");
                let default = default_fallback_offers().remove(&network);
                match env_non_empty(&var) {
                    Some(s) if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) => {
                        info!("🪛️ Fallback offer for {network} is disabled");
                        None
                    },
                    Some(s) => Some((network, s)),
                    None => default.map(|s| (network, s)),
                }
            })
            .collect();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: env_seconds_or_default("BUNDLE_PROVIDER_TIMEOUT", DEFAULT_REQUEST_TIMEOUT),
            backend_url: env_non_empty("BUNDLE_BACKEND_URL"),
            frontend_url: env_non_empty("BUNDLE_FRONTEND_URL"),
            callback_path: env_or_default("BUNDLE_CALLBACK_PATH", DEFAULT_CALLBACK_PATH.to_string()),
            offer_cache_ttl: env_seconds_or_default("BUNDLE_OFFER_CACHE_TTL", DEFAULT_OFFER_CACHE_TTL),
            base_currency: env_or_default("BUNDLE_BASE_CURRENCY", DEFAULT_BASE_CURRENCY.to_string()),
            fallback_offers,
        }
    }

    /// The URL the provider should call back when an order changes state.
    ///
    /// The base is the backend URL if set, otherwise `<frontend>/api`, otherwise [`PRODUCTION_CALLBACK_BASE`]. A base
    /// pointing at a loopback address is useless to the provider and is replaced by the production base.
    pub fn callback_url(&self) -> String {
        let configured = self
            .backend_url
            .clone()
            .or_else(|| self.frontend_url.as_ref().map(|f| format!("{}/api", f.trim_end_matches('/'))));
        let base = match configured {
            Some(url) if is_public_url(&url) => url,
            Some(url) => {
                debug!("📡️ Callback base {url} is not reachable from the internet. Using {PRODUCTION_CALLBACK_BASE}");
                PRODUCTION_CALLBACK_BASE.to_string()
            },
            None => PRODUCTION_CALLBACK_BASE.to_string(),
        };
        let path = self.callback_path.trim_start_matches('/');
        format!("{}/{path}", base.trim_end_matches('/'))
    }
}

fn is_public_url(url: &str) -> bool {
    let url = url.to_lowercase();
    !LOOPBACK_MARKERS.iter().any(|m| url.contains(m))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn callback_prefers_backend_url() {
        let config = ProviderConfig {
            backend_url: Some("https://api.example.com/".into()),
            frontend_url: Some("https://shop.example.com".into()),
            ..Default::default()
        };
        assert_eq!(config.callback_url(), "https://api.example.com/webhooks/provider");
    }

    #[test]
    fn callback_derived_from_frontend_url() {
        let config = ProviderConfig { frontend_url: Some("https://shop.example.com/".into()), ..Default::default() };
        assert_eq!(config.callback_url(), "https://shop.example.com/api/webhooks/provider");
    }

    #[test]
    fn loopback_callbacks_are_replaced() {
        for url in ["http://localhost:3000", "http://127.0.0.1:8460", "http://LOCALHOST"] {
            let config = ProviderConfig { backend_url: Some(url.into()), ..Default::default() };
            assert_eq!(config.callback_url(), "https://api.bundlestore.app/api/webhooks/provider");
        }
        let config = ProviderConfig { frontend_url: Some("http://localhost:5173".into()), ..Default::default() };
        assert_eq!(config.callback_url(), "https://api.bundlestore.app/api/webhooks/provider");
    }

    #[test]
    fn callback_without_configuration() {
        assert_eq!(ProviderConfig::default().callback_url(), "https://api.bundlestore.app/api/webhooks/provider");
    }
}
