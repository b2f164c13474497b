use crate::error::OddsError;

/// Convert a decimal price into American odds.
///
/// Decimal 2.0 and above maps to positive odds (profit per 100 staked);
/// below 2.0 maps to negative odds (stake required per 100 profit).
/// Decimal prices at or below 1.0 are malformed upstream records and are
/// rejected so callers can drop them before they skew a price list.
pub fn decimal_to_american(decimal: f64) -> Result<i32, OddsError> {
    if decimal <= 1.0 || !decimal.is_finite() {
        return Err(OddsError::BadPrice(decimal));
    }

    let american = if decimal >= 2.0 {
        (decimal - 1.0) * 100.0
    } else {
        -100.0 / (decimal - 1.0)
    };

    Ok(american.round() as i32)
}

/// Convert American odds to implied probability.
/// Positive odds (+150) mean you win $150 on a $100 bet.
/// Negative odds (-150) mean you need to bet $150 to win $100.
pub fn american_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let abs_odds = odds.abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_even_money_boundary() {
        assert_eq!(decimal_to_american(2.0).unwrap(), 100);
    }

    #[test]
    fn converts_favorites() {
        assert_eq!(decimal_to_american(1.91).unwrap(), -110);
        assert_eq!(decimal_to_american(1.50).unwrap(), -200);
    }

    #[test]
    fn converts_underdogs() {
        assert_eq!(decimal_to_american(2.50).unwrap(), 150);
        assert_eq!(decimal_to_american(3.0).unwrap(), 200);
    }

    #[test]
    fn rejects_degenerate_prices() {
        assert!(decimal_to_american(1.0).is_err());
        assert!(decimal_to_american(0.0).is_err());
        assert!(decimal_to_american(-2.5).is_err());
        assert!(decimal_to_american(f64::NAN).is_err());
    }

    #[test]
    fn implied_probability_matches_known_values() {
        assert!((american_to_probability(150) - 0.4).abs() < 0.01);
        assert!((american_to_probability(-150) - 0.6).abs() < 0.01);
        assert!((american_to_probability(100) - 0.5).abs() < 0.01);
    }
}
