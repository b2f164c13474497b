use crate::models::{Event, Market, OddsData};
use crate::utils::best_price::mark_best_odds;
use crate::utils::matching::{events_match, markets_match, outcome_names_match};

/// Merge a later provider's events into an accumulated list.
///
/// The accumulated list is always the base: its event ids and home/away
/// labels survive, and incoming events either fold into a matching base
/// event or are appended as-is. Merge order is therefore priority order,
/// independent of fetch timing.
pub fn merge_event_lists(base: Vec<Event>, incoming: Vec<Event>) -> Vec<Event> {
    let mut merged = base;
    for event in incoming {
        if let Some(existing) = merged.iter_mut().find(|e| events_match(e, &event)) {
            merge_event(existing, event);
        } else {
            merged.push(event);
        }
    }
    merged
}

fn merge_event(base: &mut Event, incoming: Event) {
    for market in incoming.markets {
        if let Some(existing) = base.markets.iter_mut().find(|m| markets_match(m, &market)) {
            merge_market(existing, market);
        } else {
            base.markets.push(market);
        }
    }
}

fn merge_market(base: &mut Market, incoming: Market) {
    for outcome in incoming.outcomes {
        if let Some(existing) = base
            .outcomes
            .iter_mut()
            .find(|o| outcome_names_match(&o.name, &outcome.name))
        {
            existing.odds.extend(outcome.odds);
        } else {
            base.outcomes.push(outcome);
        }
    }

    // Price lists changed, so dedup and recompute the best flag for
    // every outcome in this market.
    for outcome in &mut base.outcomes {
        let odds = std::mem::take(&mut outcome.odds);
        outcome.odds = mark_best_odds(dedup_by_bookmaker(odds));
    }
}

/// Keep one price per bookmaker, preferring the most recently merged
/// value. Without this, merging the same provider twice (e.g., after a
/// retry) would double-count its prices and skew best-price selection.
fn dedup_by_bookmaker(odds: Vec<OddsData>) -> Vec<OddsData> {
    let mut deduped: Vec<OddsData> = Vec::with_capacity(odds.len());
    for odd in odds {
        if let Some(existing) = deduped.iter_mut().find(|o| o.bookmaker == odd.bookmaker) {
            *existing = odd;
        } else {
            deduped.push(odd);
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketType, Outcome};
    use chrono::Utc;

    fn price(bookmaker: &str, odds: i32) -> OddsData {
        OddsData {
            bookmaker: bookmaker.to_string(),
            odds,
            is_best: false,
        }
    }

    fn moneyline_event(
        id: &str,
        sport: &str,
        home: &str,
        away: &str,
        home_odds: Vec<OddsData>,
        away_odds: Vec<OddsData>,
    ) -> Event {
        Event {
            id: id.to_string(),
            sport: sport.to_string(),
            league: sport.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            event_time: Utc::now(),
            markets: vec![Market {
                id: format!("{}_h2h", id),
                market_type: MarketType::Moneyline,
                name: "Moneyline".to_string(),
                outcomes: vec![
                    Outcome {
                        id: format!("{}_home", id),
                        name: home.to_string(),
                        odds: mark_best_odds(home_odds),
                    },
                    Outcome {
                        id: format!("{}_away", id),
                        name: away.to_string(),
                        odds: mark_best_odds(away_odds),
                    },
                ],
            }],
        }
    }

    #[test]
    fn same_fixture_from_two_providers_merges_into_one_event() {
        let base = vec![moneyline_event(
            "api_1",
            "NFL",
            "Kansas City Chiefs",
            "Buffalo Bills",
            vec![price("draftkings", -110), price("fanduel", -105)],
            vec![price("draftkings", -110), price("fanduel", -115)],
        )];
        // Same fixture, home/away swapped by the second provider.
        let incoming = vec![moneyline_event(
            "scrape_1",
            "nfl",
            "Buffalo Bills",
            "Kansas City Chiefs",
            vec![price("sportsbet", -108)],
            vec![price("sportsbet", 105)],
        )];

        let merged = merge_event_lists(base, incoming);
        assert_eq!(merged.len(), 1);
        // Base event's id and side labels survive.
        assert_eq!(merged[0].id, "api_1");
        assert_eq!(merged[0].home_team, "Kansas City Chiefs");

        let market = &merged[0].markets[0];
        assert_eq!(market.outcomes.len(), 2);
        for outcome in &market.outcomes {
            assert_eq!(outcome.odds.len(), 3);
            assert_eq!(outcome.odds.iter().filter(|o| o.is_best).count(), 1);
        }

        // Chiefs outcome gained sportsbet's +105 (matched by name, not
        // side), which beats both negative prices.
        let chiefs = market
            .outcomes
            .iter()
            .find(|o| o.name == "Kansas City Chiefs")
            .unwrap();
        let best = chiefs.odds.iter().find(|o| o.is_best).unwrap();
        assert_eq!(best.bookmaker, "sportsbet");
        assert_eq!(best.odds, 105);

        let bills = market
            .outcomes
            .iter()
            .find(|o| o.name == "Buffalo Bills")
            .unwrap();
        let best = bills.odds.iter().find(|o| o.is_best).unwrap();
        assert_eq!(best.bookmaker, "sportsbet");
        assert_eq!(best.odds, -108);
    }

    #[test]
    fn merging_a_list_with_itself_is_idempotent() {
        let events = vec![moneyline_event(
            "api_1",
            "NBA",
            "Lakers",
            "Celtics",
            vec![price("draftkings", -120), price("fanduel", -118)],
            vec![price("draftkings", 100), price("fanduel", -102)],
        )];

        let merged = merge_event_lists(events.clone(), events.clone());
        assert_eq!(merged.len(), 1);
        for outcome in &merged[0].markets[0].outcomes {
            // Bookmaker-level dedup keeps price lists from growing.
            assert_eq!(outcome.odds.len(), 2);
            assert_eq!(outcome.odds.iter().filter(|o| o.is_best).count(), 1);
        }
    }

    #[test]
    fn dedup_keeps_the_most_recent_price_per_bookmaker() {
        let deduped = dedup_by_bookmaker(vec![
            price("draftkings", -120),
            price("fanduel", -105),
            price("draftkings", -110),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].bookmaker, "draftkings");
        assert_eq!(deduped[0].odds, -110);
        assert_eq!(deduped[1].bookmaker, "fanduel");
    }

    #[test]
    fn unmatched_events_and_markets_are_appended() {
        let base = vec![moneyline_event(
            "api_1",
            "NFL",
            "Chiefs",
            "Bills",
            vec![price("draftkings", -110)],
            vec![price("draftkings", -110)],
        )];
        let mut other = moneyline_event(
            "scrape_1",
            "NFL",
            "Chiefs",
            "Bills",
            vec![price("sportsbet", -105)],
            vec![price("sportsbet", -115)],
        );
        other.markets.push(Market {
            id: "scrape_1_total".to_string(),
            market_type: MarketType::Total,
            name: "Over/Under".to_string(),
            outcomes: vec![Outcome {
                id: "over".to_string(),
                name: "Over 47.5".to_string(),
                odds: mark_best_odds(vec![price("sportsbet", -110)]),
            }],
        });
        let unrelated = moneyline_event(
            "scrape_2",
            "NFL",
            "Ravens",
            "Bengals",
            vec![price("sportsbet", -130)],
            vec![price("sportsbet", 110)],
        );

        let merged = merge_event_lists(base, vec![other, unrelated]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].markets.len(), 2);
        assert_eq!(merged[1].id, "scrape_2");
    }
}
