use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sportsbook whose prices appear in the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub id: String,
    pub name: String,
    pub logo: String,
}

impl Bookmaker {
    pub fn new(id: &str, name: &str, logo: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            logo: logo.to_string(),
        }
    }
}

/// One bookmaker's price for an outcome, in American odds format
/// (e.g., -110, +150). `is_best` is derived and recomputed after every
/// merge, never trusted from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsData {
    pub bookmaker: String,
    pub odds: i32,
    #[serde(default)]
    pub is_best: bool,
}

/// One possible resolution of a market (a team winning, a line covering),
/// with prices from every contributing bookmaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub name: String,
    pub odds: Vec<OddsData>,
}

/// The kind of betting market an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Moneyline,
    Spread,
    Total,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub market_type: MarketType,
    pub name: String,
    pub outcomes: Vec<Outcome>,
}

/// A single scheduled fixture with its markets.
///
/// Ids are provider-specific and never compared across providers; match
/// identity is (sport, home_team, away_team) after name normalization,
/// side order not trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub sport: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub event_time: DateTime<Utc>,
    pub markets: Vec<Market>,
}

/// Envelope returned by every aggregator operation. `data` is always
/// populated (demo events in degraded mode); `sources` tells the caller
/// which providers actually contributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsResponse {
    pub data: Vec<Event>,
    pub sources: Vec<String>,
    pub error: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
    pub rate_limit_remaining: Option<u32>,
}

/// Caller-facing sport keys with a mapping entry for each provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Afl,
    Nrl,
    Nba,
    Nfl,
    Soccer,
}

impl Sport {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "afl" => Some(Sport::Afl),
            "nrl" => Some(Sport::Nrl),
            "nba" => Some(Sport::Nba),
            "nfl" => Some(Sport::Nfl),
            "soccer" => Some(Sport::Soccer),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Sport::Afl => "afl",
            Sport::Nrl => "nrl",
            Sport::Nba => "nba",
            Sport::Nfl => "nfl",
            Sport::Soccer => "soccer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_keys_round_trip() {
        for sport in [Sport::Afl, Sport::Nrl, Sport::Nba, Sport::Nfl, Sport::Soccer] {
            assert_eq!(Sport::from_key(sport.key()), Some(sport));
        }
        assert_eq!(Sport::from_key("NFL"), Some(Sport::Nfl));
        assert_eq!(Sport::from_key("curling"), None);
    }

    #[test]
    fn market_type_serializes_lowercase() {
        let json = serde_json::to_string(&MarketType::Moneyline).unwrap();
        assert_eq!(json, "\"moneyline\"");
    }
}
