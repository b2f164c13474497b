use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::demo::{demo_events, DEMO_SOURCE};
use crate::error::OddsError;
use crate::models::{Bookmaker, Event, OddsResponse, Sport};
use crate::retry::RetryPolicy;
use crate::utils::merge::merge_event_lists;

pub const QUOTE_SOURCE_NAME: &str = "The Odds API";
pub const SCRAPE_SOURCE_NAME: &str = "Sportsbet Scraper";

/// How far ahead `next_update` is stamped on every response.
const NEXT_UPDATE_INTERVAL_MINS: i64 = 2;

/// Capability of the paid quote API source.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_all_sports(&self) -> Result<Vec<Event>>;
    async fn fetch_odds(&self, sport_code: &str) -> Result<Vec<Event>>;
    fn available_bookmakers(&self) -> Vec<Bookmaker>;
    fn rate_limit_remaining(&self) -> Option<u32>;
}

/// Capability of the scraped source.
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    async fn scrape_all_sports(&self) -> Result<Vec<Event>>;
    async fn scrape_sport(&self, sport: Sport) -> Result<Vec<Event>>;
    fn bookmaker(&self) -> Bookmaker;
}

/// A registered upstream source. Priority fixes merge order: lower
/// numbers form the base list that later sources merge into.
#[derive(Debug, Clone, Serialize)]
pub struct DataSource {
    pub name: String,
    pub enabled: bool,
    pub priority: u32,
    pub bookmakers: Vec<String>,
}

/// Per-source diagnostic from `test_sources`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceTestResult {
    pub name: String,
    pub success: bool,
    pub event_count: usize,
    pub error: Option<String>,
}

struct CachedResponse {
    response: OddsResponse,
    inserted: DateTime<Utc>,
}

/// Combines the quote API and the scraper into one per-event,
/// per-market, per-outcome view with best-price flags recomputed across
/// sources. Providers are called sequentially in priority order, so the
/// merge is deterministic and dropping the request future cancels any
/// not-yet-started provider call.
pub struct OddsAggregator<Q: QuoteProvider, S: ScrapeProvider, C: Clock> {
    quote: Q,
    scraper: S,
    clock: C,
    retry: RetryPolicy,
    sources: Mutex<Vec<DataSource>>,
    cache: Mutex<HashMap<String, CachedResponse>>,
    cache_ttl: Duration,
}

impl<Q: QuoteProvider, S: ScrapeProvider, C: Clock> OddsAggregator<Q, S, C> {
    pub fn new(quote: Q, scraper: S, clock: C) -> Self {
        let sources = vec![
            DataSource {
                name: QUOTE_SOURCE_NAME.to_string(),
                enabled: true,
                priority: 1,
                bookmakers: vec![
                    "draftkings".to_string(),
                    "fanduel".to_string(),
                    "betmgm".to_string(),
                    "caesars".to_string(),
                    "bet365".to_string(),
                ],
            },
            DataSource {
                name: SCRAPE_SOURCE_NAME.to_string(),
                enabled: true,
                priority: 2,
                bookmakers: vec!["sportsbet".to_string()],
            },
        ];

        Self {
            quote,
            scraper,
            clock,
            retry: RetryPolicy::default(),
            sources: Mutex::new(sources),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::seconds(60),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Fetch every enabled source, merge in priority order, and fall
    /// back to demo events when nothing usable came back. The caller
    /// always receives renderable data; `sources` distinguishes live
    /// data from the demo substitute.
    pub async fn get_all_odds(&self) -> OddsResponse {
        if let Some(cached) = self.cached_response("all") {
            debug!("returning cached aggregate response");
            return cached;
        }

        let (mut events, mut sources, mut errors) = self.fetch_and_merge(None).await;

        if events.is_empty() {
            info!("no events from any source, substituting demo data");
            events = demo_events(self.clock.now());
            sources = vec![DEMO_SOURCE.to_string()];
            errors.push("no live data available, showing demo events".to_string());
        }

        let response = self.build_response(events, sources, errors);
        self.store_response("all", &response);
        response
    }

    /// Scoped variant of `get_all_odds`. A sport without a provider
    /// mapping is a hard failure, and the scoped path never substitutes
    /// demo data: there is no sensible placeholder for an arbitrary
    /// sport key.
    pub async fn get_odds_by_sport(&self, sport_key: &str) -> Result<OddsResponse, OddsError> {
        let sport = Sport::from_key(sport_key)
            .ok_or_else(|| OddsError::UnsupportedSport(sport_key.to_string()))?;

        let cache_key = format!("sport:{}", sport.key());
        if let Some(cached) = self.cached_response(&cache_key) {
            debug!("returning cached response for {}", sport.key());
            return Ok(cached);
        }

        let (events, sources, errors) = self.fetch_and_merge(Some(sport)).await;
        let response = self.build_response(events, sources, errors);
        self.store_response(&cache_key, &response);
        Ok(response)
    }

    /// Reference bookmakers across every source.
    pub fn get_all_bookmakers(&self) -> Vec<Bookmaker> {
        let mut bookmakers = self.quote.available_bookmakers();
        bookmakers.push(self.scraper.bookmaker());
        bookmakers
    }

    pub fn get_data_sources(&self) -> Vec<DataSource> {
        self.sources.lock().unwrap().clone()
    }

    pub fn enable_source(&self, name: &str) {
        self.set_source_enabled(name, true);
    }

    pub fn disable_source(&self, name: &str) {
        self.set_source_enabled(name, false);
    }

    /// Call each source's base fetch independently and report raw
    /// counts. Diagnostic only: no retry, no merge, no cache.
    pub async fn test_sources(&self) -> Vec<SourceTestResult> {
        let mut results = Vec::new();

        results.push(match self.quote.fetch_all_sports().await {
            Ok(events) => SourceTestResult {
                name: QUOTE_SOURCE_NAME.to_string(),
                success: true,
                event_count: events.len(),
                error: None,
            },
            Err(error) => SourceTestResult {
                name: QUOTE_SOURCE_NAME.to_string(),
                success: false,
                event_count: 0,
                error: Some(format!("{:#}", error)),
            },
        });

        results.push(match self.scraper.scrape_sport(Sport::Afl).await {
            Ok(events) => SourceTestResult {
                name: SCRAPE_SOURCE_NAME.to_string(),
                success: true,
                event_count: events.len(),
                error: None,
            },
            Err(error) => SourceTestResult {
                name: SCRAPE_SOURCE_NAME.to_string(),
                success: false,
                event_count: 0,
                error: Some(format!("{:#}", error)),
            },
        });

        results
    }

    /// Query enabled providers sequentially in priority order and merge
    /// left-to-right. A failing provider contributes nothing and its
    /// failure is recorded; the others still contribute.
    async fn fetch_and_merge(
        &self,
        sport: Option<Sport>,
    ) -> (Vec<Event>, Vec<String>, Vec<String>) {
        let mut events: Vec<Event> = Vec::new();
        let mut sources = Vec::new();
        let mut errors = Vec::new();

        if self.is_source_enabled(QUOTE_SOURCE_NAME) {
            let fetched = self
                .retry
                .run(QUOTE_SOURCE_NAME, || match sport {
                    Some(sport) => self.quote.fetch_odds(sport.odds_api_code()),
                    None => self.quote.fetch_all_sports(),
                })
                .await;

            match fetched {
                Ok(fetched) if !fetched.is_empty() => {
                    info!("quote provider contributed {} events", fetched.len());
                    events.extend(fetched);
                    sources.push(QUOTE_SOURCE_NAME.to_string());
                }
                Ok(_) => debug!("quote provider returned no events"),
                Err(error) => {
                    warn!("quote provider failed: {:#}", error);
                    errors.push(format!("{} failed.", QUOTE_SOURCE_NAME));
                }
            }
        }

        if self.is_source_enabled(SCRAPE_SOURCE_NAME) {
            let fetched = self
                .retry
                .run(SCRAPE_SOURCE_NAME, || match sport {
                    Some(sport) => self.scraper.scrape_sport(sport),
                    None => self.scraper.scrape_all_sports(),
                })
                .await;

            match fetched {
                Ok(fetched) if !fetched.is_empty() => {
                    info!("scrape provider contributed {} events", fetched.len());
                    events = merge_event_lists(events, fetched);
                    sources.push("Sportsbet".to_string());
                }
                Ok(_) => debug!("scrape provider returned no events"),
                Err(error) => {
                    warn!("scrape provider failed: {:#}", error);
                    errors.push("Sportsbet scraper failed.".to_string());
                }
            }
        }

        (events, sources, errors)
    }

    fn build_response(
        &self,
        data: Vec<Event>,
        sources: Vec<String>,
        errors: Vec<String>,
    ) -> OddsResponse {
        let now = self.clock.now();
        OddsResponse {
            data,
            sources,
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join(" "))
            },
            last_updated: now,
            next_update: now + Duration::minutes(NEXT_UPDATE_INTERVAL_MINS),
            rate_limit_remaining: self.quote.rate_limit_remaining(),
        }
    }

    fn is_source_enabled(&self, name: &str) -> bool {
        self.sources
            .lock()
            .unwrap()
            .iter()
            .find(|source| source.name == name)
            .map(|source| source.enabled)
            .unwrap_or(false)
    }

    fn set_source_enabled(&self, name: &str, enabled: bool) {
        let mut sources = self.sources.lock().unwrap();
        if let Some(source) = sources.iter_mut().find(|source| source.name == name) {
            source.enabled = enabled;
        }
    }

    fn cached_response(&self, key: &str) -> Option<OddsResponse> {
        let cache = self.cache.lock().unwrap();
        let entry = cache.get(key)?;
        if self.clock.now() - entry.inserted < self.cache_ttl {
            Some(entry.response.clone())
        } else {
            None
        }
    }

    fn store_response(&self, key: &str, response: &OddsResponse) {
        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            key.to_string(),
            CachedResponse {
                response: response.clone(),
                inserted: self.clock.now(),
            },
        );
    }
}
