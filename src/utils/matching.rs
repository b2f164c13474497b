use crate::models::{Event, Market};

/// Normalize a name for cross-provider comparison: lowercase, ASCII
/// letters and digits only. No fuzzy matching beyond this; a missed merge
/// (duplicate event) is preferred over a wrong merge.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Whether two events describe the same fixture.
///
/// Sports must match and the team pair must match in either orientation,
/// since providers disagree on home/away assignment. The merged event
/// keeps the base provider's labels.
pub fn events_match(a: &Event, b: &Event) -> bool {
    if normalize_name(&a.sport) != normalize_name(&b.sport) {
        return false;
    }

    let a_home = normalize_name(&a.home_team);
    let a_away = normalize_name(&a.away_team);
    let b_home = normalize_name(&b.home_team);
    let b_away = normalize_name(&b.away_team);

    (a_home == b_home && a_away == b_away) || (a_home == b_away && a_away == b_home)
}

/// Markets align if their type or their display name matches; providers
/// are inconsistent about one or the other.
pub fn markets_match(a: &Market, b: &Market) -> bool {
    a.market_type == b.market_type || a.name == b.name
}

/// Outcome names must be exactly equal after normalization. No swapped
/// order logic here: outcome order is already anchored to the event's
/// sides via upstream naming.
pub fn outcome_names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketType;
    use chrono::Utc;

    fn event(sport: &str, home: &str, away: &str) -> Event {
        Event {
            id: format!("{}_{}_{}", sport, home, away),
            sport: sport.to_string(),
            league: sport.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            event_time: Utc::now(),
            markets: Vec::new(),
        }
    }

    fn market(market_type: MarketType, name: &str) -> Market {
        Market {
            id: name.to_string(),
            market_type,
            name: name.to_string(),
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn normalize_strips_everything_but_ascii_alphanumerics() {
        assert_eq!(normalize_name("Kansas City Chiefs"), "kansascitychiefs");
        assert_eq!(normalize_name("St. Kilda!"), "stkilda");
        assert_eq!(normalize_name("Team -2.5"), "team25");
    }

    #[test]
    fn matches_despite_case_and_swapped_sides() {
        let a = event("NFL", "Chiefs", "Bills");
        let b = event("nfl", "bills", "chiefs");
        assert!(events_match(&a, &b));
    }

    #[test]
    fn different_teams_do_not_match() {
        let a = event("NFL", "Chiefs", "Bills");
        let b = event("NFL", "Chiefs", "Ravens");
        assert!(!events_match(&a, &b));
    }

    #[test]
    fn same_teams_different_sport_do_not_match() {
        let a = event("NFL", "Chiefs", "Bills");
        let b = event("NBA", "Chiefs", "Bills");
        assert!(!events_match(&a, &b));
    }

    #[test]
    fn markets_match_on_type_or_name() {
        let a = market(MarketType::Moneyline, "Moneyline");
        let b = market(MarketType::Moneyline, "Head to Head");
        assert!(markets_match(&a, &b));

        let c = market(MarketType::Spread, "Head to Head");
        assert!(markets_match(&b, &c));

        let d = market(MarketType::Total, "Over/Under");
        assert!(!markets_match(&a, &d));
    }

    #[test]
    fn outcome_names_need_exact_normalized_equality() {
        assert!(outcome_names_match("Kansas City Chiefs", "kansas city chiefs"));
        assert!(!outcome_names_match("Kansas City Chiefs", "Buffalo Bills"));
    }
}
