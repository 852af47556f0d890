//! Offer catalog caching and offer selection.
//!
//! The provider's `/offers` endpoint is slow and flaky, and the catalog rarely changes, so it is cached for a fixed
//! TTL. [`OfferCache::get_or_refresh`] serves a stale catalog rather than failing when a refresh does not succeed.
//!
//! [`OfferResolver`] picks the offer slug to order against. When the catalog has nothing for a network, a fixed
//! per-network fallback slug is used instead.
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use bundle_common::Network;
use log::*;
use tokio::{sync::RwLock, time::Instant};

use crate::{data_objects::Offer, ProviderError};

/// Volumes closer than this (in GB) are considered equal when checking an offer's advertised sizes.
pub const VOLUME_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone)]
struct CachedOffers {
    offers: Arc<Vec<Offer>>,
    fetched_at: Instant,
}

/// An owned, TTL-bound snapshot of the provider's offer catalog.
///
/// Snapshots are immutable and replaced wholesale, so concurrent refreshes simply race and the last one wins.
#[derive(Debug)]
pub struct OfferCache {
    ttl: Duration,
    entry: RwLock<Option<CachedOffers>>,
}

impl OfferCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: RwLock::new(None) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached catalog, if it is younger than the TTL.
    pub async fn fresh(&self) -> Option<Arc<Vec<Offer>>> {
        let entry = self.entry.read().await;
        entry.as_ref().filter(|c| c.fetched_at.elapsed() < self.ttl).map(|c| Arc::clone(&c.offers))
    }

    /// The cached catalog regardless of age, provided it is not empty.
    pub async fn stale(&self) -> Option<Arc<Vec<Offer>>> {
        let entry = self.entry.read().await;
        entry.as_ref().filter(|c| !c.offers.is_empty()).map(|c| Arc::clone(&c.offers))
    }

    pub async fn replace(&self, offers: Vec<Offer>) -> Arc<Vec<Offer>> {
        let offers = Arc::new(offers);
        let mut entry = self.entry.write().await;
        *entry = Some(CachedOffers { offers: Arc::clone(&offers), fetched_at: Instant::now() });
        offers
    }

    pub async fn clear(&self) {
        *self.entry.write().await = None;
    }

    /// Serves the cached catalog if it is fresh. Otherwise calls `refresh` and caches the result.
    ///
    /// If the refresh fails and a non-empty stale catalog exists, the stale catalog is returned and the error is only
    /// logged. With nothing cached, the refresh error is returned.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<Vec<Offer>>, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Offer>, ProviderError>>,
    {
        if let Some(offers) = self.fresh().await {
            trace!("🏷️ Serving {} offers from cache", offers.len());
            return Ok(offers);
        }
        match refresh().await {
            Ok(offers) => {
                debug!("🏷️ Offer catalog refreshed. {} offers cached", offers.len());
                Ok(self.replace(offers).await)
            },
            Err(e) => match self.stale().await {
                Some(offers) => {
                    warn!("🏷️ Could not refresh the offer catalog ({e}). Serving {} stale offers", offers.len());
                    Ok(offers)
                },
                None => {
                    error!("🏷️ Could not fetch the offer catalog and there is no cached copy. {e}");
                    Err(e)
                },
            },
        }
    }
}

/// Where a resolved offer slug came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSource {
    Catalog,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOffer {
    pub offer_slug: String,
    pub source: OfferSource,
}

/// Matches a network and bundle size to a provider offer slug.
#[derive(Debug, Clone)]
pub struct OfferResolver {
    fallbacks: HashMap<Network, String>,
}

impl Default for OfferResolver {
    fn default() -> Self {
        Self::new(default_fallback_offers())
    }
}

/// The slugs that have worked historically for each network.
pub fn default_fallback_offers() -> HashMap<Network, String> {
    [
        (Network::Mtn, "mtn_data_bundle"),
        (Network::Telecel, "telecel_data_bundle"),
        (Network::AirtelTigo, "airteltigo_data_bundle"),
    ]
    .into_iter()
    .map(|(n, s)| (n, s.to_string()))
    .collect()
}

impl OfferResolver {
    pub fn new(fallbacks: HashMap<Network, String>) -> Self {
        Self { fallbacks }
    }

    pub fn fallback_for(&self, network: Network) -> Option<&str> {
        self.fallbacks.get(&network).map(String::as_str)
    }

    /// Returns the first data offer whose `isp` is one of the network's known names.
    pub fn find_offer<'a>(&self, network: Network, offers: &'a [Offer]) -> Option<&'a Offer> {
        offers.iter().find(|o| o.is_data_offer() && network.matches_isp(&o.isp))
    }

    /// Picks the offer slug for `network`.
    ///
    /// `offers` is `None` when the catalog could not be loaded at all. A catalog match whose advertised volumes do not
    /// include `volume_gb` is still used; the mismatch is only logged.
    pub fn resolve(
        &self,
        network: Network,
        volume_gb: f64,
        offers: Option<&[Offer]>,
    ) -> Result<ResolvedOffer, ProviderError> {
        if let Some(offer) = offers.and_then(|offers| self.find_offer(network, offers)) {
            let advertised =
                offer.volumes.is_empty() || offer.volumes.iter().any(|v| (v - volume_gb).abs() < VOLUME_TOLERANCE);
            if !advertised {
                warn!(
                    "🏷️ Offer {} for {network} does not advertise a {volume_gb}GB bundle ({:?}). Submitting anyway.",
                    offer.offer_slug, offer.volumes
                );
            }
            return Ok(ResolvedOffer { offer_slug: offer.offer_slug.clone(), source: OfferSource::Catalog });
        }
        match self.fallback_for(network) {
            Some(slug) => {
                info!("🏷️ No catalog offer for {network}. Using fallback offer {slug}");
                Ok(ResolvedOffer { offer_slug: slug.to_string(), source: OfferSource::Fallback })
            },
            None => Err(ProviderError::NoOfferAvailable(network.to_string())),
        }
    }
}
