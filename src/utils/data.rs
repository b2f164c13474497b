use crate::models::Event;
use anyhow::{Context, Result};

/// Save an aggregated event snapshot to a JSON cache file.
pub fn save_events_to_cache(events: &[Event], cache_file: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(events).context("Failed to serialize events")?;
    std::fs::write(cache_file, json).context("Failed to write cache file")?;
    Ok(())
}

/// Load a previously saved event snapshot from a JSON cache file.
pub fn load_events_from_cache(cache_file: &str) -> Result<Vec<Event>> {
    let json = std::fs::read_to_string(cache_file).context("Failed to read cache file")?;
    let events: Vec<Event> =
        serde_json::from_str(&json).context("Failed to deserialize events")?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Market, MarketType, OddsData, Outcome};
    use chrono::Utc;

    #[test]
    fn snapshot_round_trips_through_disk() {
        let events = vec![Event {
            id: "evt_1".to_string(),
            sport: "NFL".to_string(),
            league: "NFL".to_string(),
            home_team: "Chiefs".to_string(),
            away_team: "Bills".to_string(),
            event_time: Utc::now(),
            markets: vec![Market {
                id: "h2h".to_string(),
                market_type: MarketType::Moneyline,
                name: "Moneyline".to_string(),
                outcomes: vec![Outcome {
                    id: "home".to_string(),
                    name: "Chiefs".to_string(),
                    odds: vec![OddsData {
                        bookmaker: "draftkings".to_string(),
                        odds: -110,
                        is_best: true,
                    }],
                }],
            }],
        }];

        let path = std::env::temp_dir().join("odds_aggregator_snapshot_test.json");
        let path = path.to_str().unwrap();
        save_events_to_cache(&events, path).unwrap();
        let loaded = load_events_from_cache(path).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "evt_1");
        assert_eq!(loaded[0].markets[0].outcomes[0].odds[0].odds, -110);
        assert!(loaded[0].markets[0].outcomes[0].odds[0].is_best);
    }
}
