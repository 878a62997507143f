// Offer Enrichment Fetchers: per-offer lookups cached by offer identity

use crate::api::FlightApi;
use crate::config::RetryConfig;
use crate::error::{ApiError, FlowError};
use crate::models::{BaggageOption, BrandTier, FareRules, FlightOffer, MealOption, OfferKey};
use crate::retry::retry_lookup;
use crate::session::Session;
use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentCategory {
    FareRules,
    Meals,
    Baggage,
    BrandedFares,
}

impl fmt::Display for EnrichmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnrichmentCategory::FareRules => "Fare rules",
            EnrichmentCategory::Meals => "Meals",
            EnrichmentCategory::Baggage => "Baggage",
            EnrichmentCategory::BrandedFares => "Branded fares",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub entries: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub failure_count: usize,
}

struct CategoryCache<T> {
    entries: DashMap<OfferKey, Arc<T>>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    failure_count: AtomicUsize,
}

impl<T> CategoryCache<T> {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
            failure_count: AtomicUsize::new(0),
        }
    }

    // Clones the Arc out so no shard lock outlives this call
    fn get(&self, key: &OfferKey) -> Option<Arc<T>> {
        let hit = self.entries.get(key).map(|entry| Arc::clone(entry.value()));
        match hit {
            Some(_) => self.hit_count.fetch_add(1, Ordering::SeqCst),
            None => self.miss_count.fetch_add(1, Ordering::SeqCst),
        };
        hit
    }

    fn insert(&self, key: OfferKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.insert(key, Arc::clone(&value));
        value
    }

    fn invalidate_search(&self, search_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.search_id != search_id);
        before.saturating_sub(self.entries.len())
    }

    fn stats(&self) -> EnrichmentStats {
        EnrichmentStats {
            entries: self.entries.len(),
            hit_count: self.hit_count.load(Ordering::SeqCst),
            miss_count: self.miss_count.load(Ordering::SeqCst),
            failure_count: self.failure_count.load(Ordering::SeqCst),
        }
    }
}

// Outcome of expanding one offer. Each panel succeeds or fails on its own.
#[derive(Debug, Clone)]
pub struct OfferPanels {
    pub fare_rules: Result<Arc<FareRules>, FlowError>,
    pub meals: Result<Arc<Vec<MealOption>>, FlowError>,
    pub baggage: Result<Arc<Vec<BaggageOption>>, FlowError>,
    pub branded_fares: Result<Arc<Vec<BrandTier>>, FlowError>,
}

pub struct OfferEnrichment {
    api: Arc<dyn FlightApi>,
    session: Arc<Session>,
    retry: RetryConfig,
    fare_rules: CategoryCache<FareRules>,
    meals: CategoryCache<Vec<MealOption>>,
    baggage: CategoryCache<Vec<BaggageOption>>,
    branded_fares: CategoryCache<Vec<BrandTier>>,
}

impl OfferEnrichment {
    pub fn new(api: Arc<dyn FlightApi>, session: Arc<Session>, retry: RetryConfig) -> Self {
        Self {
            api,
            session,
            retry,
            fare_rules: CategoryCache::new(),
            meals: CategoryCache::new(),
            baggage: CategoryCache::new(),
            branded_fares: CategoryCache::new(),
        }
    }

    pub async fn fare_rules(&self, offer: &FlightOffer) -> Result<Arc<FareRules>, FlowError> {
        let (api, session) = (&self.api, &self.session);
        self.cached(&self.fare_rules, EnrichmentCategory::FareRules, offer, move || {
            api.fare_rules(session, offer)
        })
        .await
    }

    pub async fn meals(&self, offer: &FlightOffer) -> Result<Arc<Vec<MealOption>>, FlowError> {
        let (api, session) = (&self.api, &self.session);
        self.cached(&self.meals, EnrichmentCategory::Meals, offer, move || {
            api.meals(session, offer)
        })
        .await
    }

    pub async fn baggage(&self, offer: &FlightOffer) -> Result<Arc<Vec<BaggageOption>>, FlowError> {
        let (api, session) = (&self.api, &self.session);
        self.cached(&self.baggage, EnrichmentCategory::Baggage, offer, move || {
            api.baggage(session, offer)
        })
        .await
    }

    // Inline tiers on the offer win; the network is only used when there are none.
    pub async fn branded_fares(&self, offer: &FlightOffer) -> Result<Arc<Vec<BrandTier>>, FlowError> {
        if let Some(inline) = offer.inline_brands() {
            debug!(offer = %offer.key, tiers = inline.len(), "using inline branded fares");
            return Ok(Arc::new(inline.to_vec()));
        }
        let (api, session) = (&self.api, &self.session);
        self.cached(&self.branded_fares, EnrichmentCategory::BrandedFares, offer, move || {
            api.branded_fares(session, offer)
        })
        .await
    }

    pub async fn expand(&self, offer: &FlightOffer) -> OfferPanels {
        let (fare_rules, meals, baggage, branded_fares) = futures::join!(
            self.fare_rules(offer),
            self.meals(offer),
            self.baggage(offer),
            self.branded_fares(offer)
        );
        OfferPanels {
            fare_rules,
            meals,
            baggage,
            branded_fares,
        }
    }

    // Drops every cached entry that belongs to `search_id`.
    pub fn invalidate_search(&self, search_id: &str) -> usize {
        let removed = self.fare_rules.invalidate_search(search_id)
            + self.meals.invalidate_search(search_id)
            + self.baggage.invalidate_search(search_id)
            + self.branded_fares.invalidate_search(search_id);
        debug!(search_id, removed, "enrichment cache invalidated");
        removed
    }

    pub fn stats(&self, category: EnrichmentCategory) -> EnrichmentStats {
        match category {
            EnrichmentCategory::FareRules => self.fare_rules.stats(),
            EnrichmentCategory::Meals => self.meals.stats(),
            EnrichmentCategory::Baggage => self.baggage.stats(),
            EnrichmentCategory::BrandedFares => self.branded_fares.stats(),
        }
    }

    async fn cached<T, F, Fut>(
        &self,
        cache: &CategoryCache<T>,
        category: EnrichmentCategory,
        offer: &FlightOffer,
        fetch: F,
    ) -> Result<Arc<T>, FlowError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(hit) = cache.get(&offer.key) {
            return Ok(hit);
        }

        let operation = category.to_string();
        match retry_lookup(&self.retry, &operation, fetch).await {
            Ok(value) => Ok(cache.insert(offer.key.clone(), value)),
            Err(error) => {
                // Failures are not cached; the next expand tries again
                cache.failure_count.fetch_add(1, Ordering::SeqCst);
                warn!(offer = %offer.key, category = %category, error = %error, "enrichment lookup failed");
                Err(FlowError::enrichment(category, error))
            }
        }
    }
}
