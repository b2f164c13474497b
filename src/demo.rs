use chrono::{DateTime, Duration, Utc};

use crate::models::{Event, Market, MarketType, OddsData, Outcome};

/// Static demonstration events substituted when every provider fails or
/// returns nothing, so the caller always has something renderable.
/// Responses built from these carry the sentinel "Demo Data" source.
pub fn demo_events(now: DateTime<Utc>) -> Vec<Event> {
    vec![Event {
        id: "demo_combined_1".to_string(),
        sport: "AFL".to_string(),
        league: "Australian Football League".to_string(),
        home_team: "Richmond Tigers".to_string(),
        away_team: "Collingwood Magpies".to_string(),
        event_time: now + Duration::hours(2),
        markets: vec![Market {
            id: "demo_h2h".to_string(),
            market_type: MarketType::Moneyline,
            name: "Head to Head".to_string(),
            outcomes: vec![
                Outcome {
                    id: "richmond".to_string(),
                    name: "Richmond Tigers".to_string(),
                    odds: vec![
                        OddsData {
                            bookmaker: "sportsbet".to_string(),
                            odds: -115,
                            is_best: true,
                        },
                        OddsData {
                            bookmaker: "bet365".to_string(),
                            odds: -120,
                            is_best: false,
                        },
                    ],
                },
                Outcome {
                    id: "collingwood".to_string(),
                    name: "Collingwood Magpies".to_string(),
                    odds: vec![
                        OddsData {
                            bookmaker: "sportsbet".to_string(),
                            odds: -105,
                            is_best: false,
                        },
                        OddsData {
                            bookmaker: "bet365".to_string(),
                            odds: -100,
                            is_best: true,
                        },
                    ],
                },
            ],
        }],
    }]
}

/// Name reported in `sources` when demo events were substituted.
pub const DEMO_SOURCE: &str = "Demo Data";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::best_price::mark_best_odds;

    #[test]
    fn demo_best_flags_agree_with_the_selector() {
        let events = demo_events(Utc::now());
        assert!(!events.is_empty());
        for event in events {
            for market in event.markets {
                for outcome in market.outcomes {
                    let recomputed = mark_best_odds(outcome.odds.clone());
                    assert_eq!(outcome.odds, recomputed);
                }
            }
        }
    }
}
