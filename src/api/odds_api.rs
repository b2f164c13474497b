use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::aggregator::QuoteProvider;
use crate::error::OddsError;
use crate::models::{Bookmaker, Event, Market, MarketType, OddsData, Outcome, Sport};
use crate::utils::best_price::mark_best_odds;
use crate::utils::matching::normalize_name;
use crate::utils::odds::decimal_to_american;

pub const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";

/// Sport codes fetched by `fetch_all_sports`, in priority order.
const ALL_SPORTS_CODES: [&str; 3] = [
    "americanfootball_nfl",
    "basketball_nba",
    "icehockey_nhl",
];

impl Sport {
    /// Quote API sport code for a caller-facing sport key.
    pub fn odds_api_code(&self) -> &'static str {
        match self {
            Sport::Afl => "aussierules_afl",
            Sport::Nrl => "rugbyleague_nrl",
            Sport::Nba => "basketball_nba",
            Sport::Nfl => "americanfootball_nfl",
            Sport::Soccer => "soccer_epl",
        }
    }
}

/// Quote API event record.
#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    id: String,
    sport_key: String,
    sport_title: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<RawBookmaker>,
}

/// Per-bookmaker price block within an event record.
#[derive(Debug, Clone, Deserialize)]
struct RawBookmaker {
    key: String,
    #[allow(dead_code)]
    title: String,
    markets: Vec<RawMarket>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMarket {
    key: String,
    outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSport {
    key: String,
}

/// Explicit configuration for the quote client; no ambient globals.
#[derive(Debug, Clone)]
pub struct OddsApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub min_request_interval: Duration,
    pub cache_ttl: Duration,
}

impl OddsApiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            min_request_interval: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

struct CacheEntry {
    events: Vec<RawEvent>,
    inserted: Instant,
}

/// Client for the paid quote API ("The Odds API" shape): throttled,
/// cached, and owning the transformation into the unified event model.
pub struct OddsApiClient {
    config: OddsApiConfig,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, CacheEntry>>,
    next_request_at: Mutex<Instant>,
    rate_limit_remaining: Mutex<Option<u32>>,
}

impl OddsApiClient {
    pub fn new(config: OddsApiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            cache: Mutex::new(HashMap::new()),
            next_request_at: Mutex::new(Instant::now()),
            rate_limit_remaining: Mutex::new(None),
        }
    }

    /// Fetch and transform odds for one provider sport code.
    pub async fn fetch_odds(&self, sport_code: &str) -> Result<Vec<Event>> {
        let raw_events = self.fetch_raw_events(sport_code).await?;
        Ok(transform_events(raw_events))
    }

    /// Fetch the fixed priority list of sports sequentially. A failing
    /// sport is logged and skipped; the call only fails when every sport
    /// does.
    pub async fn fetch_all_sports(&self) -> Result<Vec<Event>> {
        let mut all_events = Vec::new();
        let mut failures = 0;

        for sport_code in ALL_SPORTS_CODES {
            match self.fetch_odds(sport_code).await {
                Ok(mut events) => {
                    info!("fetched {} events for {}", events.len(), sport_code);
                    all_events.append(&mut events);
                }
                Err(error) => {
                    warn!("failed to fetch {}: {:#}", sport_code, error);
                    failures += 1;
                }
            }
        }

        if all_events.is_empty() && failures == ALL_SPORTS_CODES.len() {
            anyhow::bail!("every sport fetch failed");
        }
        Ok(all_events)
    }

    /// List upstream sport codes that have a unified label mapping.
    pub async fn list_sports(&self) -> Result<Vec<String>> {
        self.throttle().await;

        let url = format!("{}/sports", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.config.api_key.as_str())])
            .send()
            .await
            .context("Failed to fetch sports from the quote API")?;

        if !response.status().is_success() {
            return Err(OddsError::Provider {
                provider: "The Odds API".to_string(),
                message: format!("status {}", response.status()),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .context("Failed to read quote API sports response")?;
        let sports: Vec<RawSport> =
            serde_json::from_str(&body).map_err(|error| OddsError::Parse(error.to_string()))?;

        Ok(sports
            .into_iter()
            .map(|sport| sport.key)
            .filter(|key| sport_label(key).is_some())
            .collect())
    }

    /// Requests remaining on the quote API plan, as last reported by the
    /// `x-requests-remaining` response header.
    pub fn rate_limit_remaining(&self) -> Option<u32> {
        *self.rate_limit_remaining.lock().unwrap()
    }

    async fn fetch_raw_events(&self, sport_code: &str) -> Result<Vec<RawEvent>> {
        if let Some(events) = self.cached(sport_code) {
            debug!("cache hit for {}", sport_code);
            return Ok(events);
        }

        self.throttle().await;

        let url = format!("{}/sports/{}/odds", self.config.base_url, sport_code);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.config.api_key.as_str()),
                ("regions", "us"),
                ("markets", "h2h,spreads,totals"),
                ("oddsFormat", "decimal"),
                ("dateFormat", "iso"),
            ])
            .send()
            .await
            .context("Failed to fetch odds from the quote API")?;

        if let Some(remaining) = response
            .headers()
            .get("x-requests-remaining")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
        {
            *self.rate_limit_remaining.lock().unwrap() = Some(remaining as u32);
        }

        if !response.status().is_success() {
            return Err(OddsError::Provider {
                provider: "The Odds API".to_string(),
                message: format!("status {}", response.status()),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .context("Failed to read quote API response body")?;
        let events = parse_events_body(&body)?;

        self.store(sport_code, events.clone());
        Ok(events)
    }

    /// Reserve the next request slot under the lock, then sleep outside
    /// it. Overlapping callers each get their own slot, so the minimum
    /// interval holds even under concurrency.
    async fn throttle(&self) {
        let wait = {
            let mut next = self.next_request_at.lock().unwrap();
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.config.min_request_interval;
            slot.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            debug!("throttling quote API request for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn cached(&self, sport_code: &str) -> Option<Vec<RawEvent>> {
        let cache = self.cache.lock().unwrap();
        let entry = cache.get(sport_code)?;
        if entry.inserted.elapsed() < self.config.cache_ttl {
            Some(entry.events.clone())
        } else {
            None
        }
    }

    fn store(&self, sport_code: &str, events: Vec<RawEvent>) {
        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            sport_code.to_string(),
            CacheEntry {
                events,
                inserted: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl QuoteProvider for OddsApiClient {
    async fn fetch_all_sports(&self) -> Result<Vec<Event>> {
        OddsApiClient::fetch_all_sports(self).await
    }

    async fn fetch_odds(&self, sport_code: &str) -> Result<Vec<Event>> {
        OddsApiClient::fetch_odds(self, sport_code).await
    }

    fn available_bookmakers(&self) -> Vec<Bookmaker> {
        available_bookmakers()
    }

    fn rate_limit_remaining(&self) -> Option<u32> {
        OddsApiClient::rate_limit_remaining(self)
    }
}

/// Parse a response body into raw events. A body that is not a JSON
/// array at all (an HTML error page, a quota message) is a `Parse`
/// failure; individual records inside a valid array that do not match
/// the schema are skipped instead.
fn parse_events_body(body: &str) -> Result<Vec<RawEvent>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|error| OddsError::Parse(error.to_string()))?;
    Ok(parse_raw_events(values))
}

/// Parse a batch of raw event values, skipping records that do not match
/// the schema. One bad record must not abort the whole batch.
fn parse_raw_events(values: Vec<serde_json::Value>) -> Vec<RawEvent> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawEvent>(value) {
            Ok(event) => Some(event),
            Err(error) => {
                warn!("skipping malformed event record: {}", error);
                None
            }
        })
        .collect()
}

fn transform_events(raw_events: Vec<RawEvent>) -> Vec<Event> {
    raw_events.into_iter().map(transform_event).collect()
}

/// Regroup one raw event from per-bookmaker markets into per-market
/// outcomes with a combined price list, converting prices and computing
/// the initial best flag.
fn transform_event(raw: RawEvent) -> Event {
    // market key -> (outcome label -> prices), insertion ordered
    let mut grouped: Vec<(String, Vec<(String, Vec<OddsData>)>)> = Vec::new();

    for bookmaker in &raw.bookmakers {
        let Some(book) = bookmaker_for_key(&bookmaker.key) else {
            // Unknown bookmaker codes are dropped silently.
            continue;
        };

        for market in &bookmaker.markets {
            if market_info(&market.key).is_none() {
                // Unknown market types are dropped.
                continue;
            }

            let market_index = match grouped.iter().position(|(key, _)| key == &market.key) {
                Some(index) => index,
                None => {
                    grouped.push((market.key.clone(), Vec::new()));
                    grouped.len() - 1
                }
            };
            let outcomes = &mut grouped[market_index].1;

            for outcome in &market.outcomes {
                let odds = match decimal_to_american(outcome.price) {
                    Ok(odds) => odds,
                    Err(error) => {
                        warn!("dropping price for '{}': {}", outcome.name, error);
                        continue;
                    }
                };

                let label = outcome_label(&market.key, outcome);
                let outcome_index = match outcomes.iter().position(|(name, _)| name == &label) {
                    Some(index) => index,
                    None => {
                        outcomes.push((label.clone(), Vec::new()));
                        outcomes.len() - 1
                    }
                };
                outcomes[outcome_index].1.push(OddsData {
                    bookmaker: book.id.clone(),
                    odds,
                    is_best: false,
                });
            }
        }
    }

    let markets = grouped
        .into_iter()
        .filter_map(|(market_key, outcomes)| {
            // A market whose every price failed conversion has nothing
            // to offer; drop it rather than emit an empty shell.
            if outcomes.is_empty() {
                return None;
            }
            let (market_type, name) = market_info(&market_key)?;
            let outcomes = outcomes
                .into_iter()
                .map(|(label, odds)| Outcome {
                    id: format!("{}_{}", market_key, normalize_name(&label)),
                    name: label,
                    odds: mark_best_odds(odds),
                })
                .collect();
            Some(Market {
                id: market_key,
                market_type,
                name: name.to_string(),
                outcomes,
            })
        })
        .collect();

    Event {
        id: raw.id,
        sport: sport_label(&raw.sport_key)
            .map(str::to_string)
            .unwrap_or_else(|| raw.sport_title.clone()),
        league: raw.sport_title,
        home_team: raw.home_team,
        away_team: raw.away_team,
        event_time: raw.commence_time,
        markets,
    }
}

/// Spread and total outcomes carry their line in the display name
/// (e.g., "Chiefs -2.5"), so different lines stay distinct outcomes.
fn outcome_label(market_key: &str, outcome: &RawOutcome) -> String {
    match outcome.point {
        Some(point) if market_key != "h2h" => format!("{} {:+}", outcome.name, point),
        _ => outcome.name.clone(),
    }
}

/// Unified sport label for a provider sport code. Unknown codes fall
/// back to the provider's own title at the call site.
fn sport_label(sport_key: &str) -> Option<&'static str> {
    match sport_key {
        "americanfootball_nfl" => Some("NFL"),
        "basketball_nba" => Some("NBA"),
        "icehockey_nhl" => Some("NHL"),
        "baseball_mlb" => Some("MLB"),
        "soccer_epl" => Some("EPL"),
        "soccer_uefa_champs_league" => Some("Champions League"),
        "aussierules_afl" => Some("AFL"),
        "rugbyleague_nrl" => Some("NRL"),
        "tennis_atp" => Some("ATP Tennis"),
        "mma_mixed_martial_arts" => Some("MMA"),
        _ => None,
    }
}

fn market_info(market_key: &str) -> Option<(MarketType, &'static str)> {
    match market_key {
        "h2h" => Some((MarketType::Moneyline, "Moneyline")),
        "spreads" => Some((MarketType::Spread, "Point Spread")),
        "totals" => Some((MarketType::Total, "Over/Under")),
        _ => None,
    }
}

fn bookmaker_for_key(key: &str) -> Option<Bookmaker> {
    let (id, name, logo) = match key {
        "draftkings" => ("draftkings", "DraftKings", "🏆"),
        "fanduel" => ("fanduel", "FanDuel", "🎯"),
        "betmgm" => ("betmgm", "BetMGM", "🦁"),
        "caesars" => ("caesars", "Caesars", "👑"),
        "pointsbet_us" => ("pointsbet", "PointsBet", "📊"),
        "barstool" => ("barstool", "Barstool", "🍺"),
        "betrivers" => ("betrivers", "BetRivers", "🌊"),
        "unibet_us" => ("unibet", "Unibet", "🎲"),
        "williamhill_us" => ("williamhill", "William Hill", "🏛️"),
        "bet365" => ("bet365", "Bet365", "🎰"),
        _ => return None,
    };
    Some(Bookmaker::new(id, name, logo))
}

/// The quote API's full reference bookmaker set.
pub fn available_bookmakers() -> Vec<Bookmaker> {
    [
        "draftkings",
        "fanduel",
        "betmgm",
        "caesars",
        "pointsbet_us",
        "barstool",
        "betrivers",
        "unibet_us",
        "williamhill_us",
        "bet365",
    ]
    .iter()
    .filter_map(|key| bookmaker_for_key(key))
    .collect()
}
