use crate::models::OddsData;

/// Flag the single most favorable price in a list, clearing the flag on
/// every other entry. Empty input is returned unchanged.
///
/// The comparison is not a plain numeric max: the sign changes the
/// meaning of the number. Ties keep the first occurrence, so the result
/// is deterministic for a given input order.
pub fn mark_best_odds(odds: Vec<OddsData>) -> Vec<OddsData> {
    if odds.is_empty() {
        return odds;
    }

    let mut best_index = 0;
    for (index, odd) in odds.iter().enumerate().skip(1) {
        if beats(odd.odds, odds[best_index].odds) {
            best_index = index;
        }
    }

    odds.into_iter()
        .enumerate()
        .map(|(index, mut odd)| {
            odd.is_best = index == best_index;
            odd
        })
        .collect()
}

/// Whether `candidate` is strictly better than `current` under American
/// odds semantics:
/// - both positive: bigger payout wins;
/// - both negative: less stake required wins (closer to zero);
/// - mixed sign: positive wins regardless of magnitude.
fn beats(candidate: i32, current: i32) -> bool {
    match (candidate > 0, current > 0) {
        (true, true) | (false, false) => candidate > current,
        (true, false) => true,
        (false, true) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(bookmaker: &str, odds: i32) -> OddsData {
        OddsData {
            bookmaker: bookmaker.to_string(),
            odds,
            is_best: false,
        }
    }

    fn best_bookmaker(odds: &[OddsData]) -> &str {
        &odds.iter().find(|o| o.is_best).unwrap().bookmaker
    }

    #[test]
    fn all_negative_picks_closest_to_zero() {
        let marked = mark_best_odds(vec![
            price("a", -110),
            price("b", -105),
            price("c", -115),
        ]);
        assert_eq!(best_bookmaker(&marked), "b");
        assert_eq!(marked.iter().filter(|o| o.is_best).count(), 1);
    }

    #[test]
    fn all_positive_picks_largest() {
        let marked = mark_best_odds(vec![price("a", 120), price("b", 118)]);
        assert_eq!(best_bookmaker(&marked), "a");
    }

    #[test]
    fn positive_beats_negative_regardless_of_position() {
        let marked = mark_best_odds(vec![price("a", -110), price("b", 120)]);
        assert_eq!(best_bookmaker(&marked), "b");

        let marked = mark_best_odds(vec![price("a", 120), price("b", -110)]);
        assert_eq!(best_bookmaker(&marked), "a");
    }

    #[test]
    fn empty_input_returned_unchanged() {
        assert!(mark_best_odds(Vec::new()).is_empty());
    }

    #[test]
    fn ties_keep_first_occurrence() {
        let marked = mark_best_odds(vec![price("first", -110), price("second", -110)]);
        assert_eq!(best_bookmaker(&marked), "first");
    }

    #[test]
    fn stale_flags_are_cleared() {
        let mut stale = vec![price("a", -120), price("b", -105)];
        stale[0].is_best = true;
        let marked = mark_best_odds(stale);
        assert_eq!(best_bookmaker(&marked), "b");
        assert!(!marked[0].is_best);
    }
}
