//! Client for the data bundle provider's REST API.
//!
//! Besides the HTTP client itself ([`ProviderApi`]) this crate holds the pieces that make sense of what the provider
//! sends back: phone and volume normalisation, status mapping, offer selection and order id discovery.
mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;
mod identifier;
mod offers;

pub use api::ProviderApi;
pub use config::{
    ProviderConfig,
    DEFAULT_BASE_CURRENCY,
    DEFAULT_CALLBACK_PATH,
    DEFAULT_OFFER_CACHE_TTL,
    DEFAULT_PROVIDER_URL,
    DEFAULT_REQUEST_TIMEOUT,
    PRODUCTION_CALLBACK_BASE,
};
pub use data_objects::{
    NewProviderOrder,
    Offer,
    OrderPlacement,
    OrderStatusReport,
    PlaceOrderRequest,
    PlacementOutcome,
    ProviderBalance,
};
pub use error::ProviderError;
pub use helpers::{map_provider_status, normalize_phone, parse_data_volume, ProviderStatus};
pub use identifier::{extract_provider_order_id, find_provider_order_id};
pub use offers::{default_fallback_offers, OfferCache, OfferResolver, OfferSource, ResolvedOffer, VOLUME_TOLERANCE};
