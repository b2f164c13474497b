pub mod aggregator;
pub mod api;
pub mod clock;
pub mod demo;
pub mod error;
pub mod models;
pub mod retry;
pub mod scrapers;
pub mod utils;

pub use aggregator::*;
pub use api::*;
pub use clock::*;
pub use demo::*;
pub use error::*;
pub use models::*;
pub use retry::*;
pub use scrapers::*;
pub use utils::*;

use api::odds_api::{OddsApiClient, OddsApiConfig};
use clock::SystemClock;
use scrapers::sportsbet::{HttpPageFetcher, SportsbetScraper};
use tracing::warn;

/// The aggregator wired to the live providers.
pub type LiveAggregator =
    OddsAggregator<OddsApiClient, SportsbetScraper<HttpPageFetcher>, SystemClock>;

/// Build an aggregator from the environment. Reads `ODDS_API_KEY` from
/// the environment or a `.env` file; when it is missing the quote
/// source is disabled rather than failing, so the scraper and demo
/// paths still work without credentials.
pub fn build_aggregator() -> LiveAggregator {
    dotenv::dotenv().ok();

    let (api_key, have_key) = match std::env::var("ODDS_API_KEY") {
        Ok(key) if !key.is_empty() => (key, true),
        _ => (String::new(), false),
    };

    let mut config = OddsApiConfig::new(api_key);
    if let Ok(base_url) = std::env::var("ODDS_API_BASE_URL") {
        if !base_url.is_empty() {
            config.base_url = base_url;
        }
    }

    let quote = OddsApiClient::new(config);
    let scraper = SportsbetScraper::new(HttpPageFetcher::new());
    let aggregator = OddsAggregator::new(quote, scraper, SystemClock);

    if !have_key {
        warn!("ODDS_API_KEY not set, disabling the quote API source");
        aggregator.disable_source(QUOTE_SOURCE_NAME);
    }

    aggregator
}
