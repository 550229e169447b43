//! Forecast-driven offer rules.
//!
//! One three-band table serves both domains: a low band (projected activity
//! below `low_cutoff`), a middle band, and a high band at or above
//! `high_cutoff`. The middle and high bands split on forecast volatility,
//! measured as the coefficient of variation against `cv_threshold`. An
//! undefined coefficient (zero or negative point estimate) counts as
//! volatile, since a forecast the model cannot pin down is the opposite of a
//! stable one.
//!
//! A band action of `None` means no offer for entities landing there.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::offer::OfferDecision;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OfferTable {
    /// Projected totals strictly below this land in the low band.
    pub low_cutoff: f64,
    /// Projected totals at or above this land in the high band.
    pub high_cutoff: f64,
    /// Coefficient-of-variation boundary between stable and volatile.
    pub cv_threshold: f64,
    pub low_band: Option<String>,
    pub mid_volatile: Option<String>,
    pub mid_stable: Option<String>,
    pub high_volatile: Option<String>,
    pub high_stable: Option<String>,
}

impl OfferTable {
    pub fn customer_default() -> Self {
        Self {
            low_cutoff: 5.0,
            high_cutoff: 10.0,
            cv_threshold: 1.0,
            low_band: Some("Win-back Offer".to_string()),
            mid_volatile: Some("Moderate Discount".to_string()),
            mid_stable: Some("Loyalty Discount".to_string()),
            high_volatile: Some("Exclusive Product Teaser".to_string()),
            high_stable: None,
        }
    }

    pub fn product_default() -> Self {
        Self {
            low_cutoff: 10.0,
            high_cutoff: 18.0,
            cv_threshold: 1.0,
            low_band: Some("Heavy Discount".to_string()),
            mid_volatile: Some("Moderate Discount".to_string()),
            mid_stable: Some("Light Discount".to_string()),
            high_volatile: Some("Scarcity Messaging".to_string()),
            high_stable: None,
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.low_cutoff.is_finite() && self.high_cutoff.is_finite()) {
            return Err(ConfigError::Validation(format!("{name}: cutoffs must be finite")));
        }
        if self.low_cutoff >= self.high_cutoff {
            return Err(ConfigError::Validation(format!(
                "{name}: low_cutoff must be strictly below high_cutoff"
            )));
        }
        if !self.cv_threshold.is_finite() || self.cv_threshold <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "{name}: cv_threshold must be a positive finite number"
            )));
        }
        Ok(())
    }

    /// Map one entity's projected total and forecast volatility to an offer.
    pub fn decide(&self, entity_id: i64, projected: f64, cv: Option<f64>) -> OfferDecision {
        let volatile = cv.map_or(true, |value| value > self.cv_threshold);
        let volatility = match cv {
            Some(value) if value > self.cv_threshold => format!("volatile forecast (cv {value:.2})"),
            Some(value) => format!("stable forecast (cv {value:.2})"),
            None => "undefined volatility".to_string(),
        };

        let (action, band) = if projected < self.low_cutoff {
            (self.low_band.clone(), format!("projected {projected:.2} below {}", self.low_cutoff))
        } else if projected < self.high_cutoff {
            let action = if volatile { self.mid_volatile.clone() } else { self.mid_stable.clone() };
            (action, format!("projected {projected:.2} in middle band, {volatility}"))
        } else {
            let action = if volatile { self.high_volatile.clone() } else { self.high_stable.clone() };
            (action, format!("projected {projected:.2} at or above {}, {volatility}", self.high_cutoff))
        };

        OfferDecision { entity_id, action, reason: band }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_low_band_is_win_back() {
        let table = OfferTable::customer_default();
        let decision = table.decide(1, 4.99, Some(0.5));
        assert_eq!(decision.action.as_deref(), Some("Win-back Offer"));
    }

    #[test]
    fn customer_middle_band_splits_on_volatility() {
        let table = OfferTable::customer_default();
        assert_eq!(
            table.decide(1, 7.0, Some(1.5)).action.as_deref(),
            Some("Moderate Discount")
        );
        assert_eq!(
            table.decide(1, 7.0, Some(0.4)).action.as_deref(),
            Some("Loyalty Discount")
        );
    }

    #[test]
    fn customer_high_stable_gets_no_offer() {
        let table = OfferTable::customer_default();
        let decision = table.decide(1, 12.0, Some(0.3));
        assert!(decision.is_no_offer());
        assert_eq!(table.decide(1, 12.0, Some(2.0)).action.as_deref(), Some("Exclusive Product Teaser"));
    }

    #[test]
    fn band_edges_are_inclusive_on_the_upper_cutoff() {
        let table = OfferTable::product_default();
        assert_eq!(table.decide(1, 9.99, Some(0.5)).action.as_deref(), Some("Heavy Discount"));
        assert_eq!(table.decide(1, 10.0, Some(0.5)).action.as_deref(), Some("Light Discount"));
        assert_eq!(table.decide(1, 17.99, Some(2.0)).action.as_deref(), Some("Moderate Discount"));
        assert_eq!(table.decide(1, 18.0, Some(2.0)).action.as_deref(), Some("Scarcity Messaging"));
    }

    #[test]
    fn undefined_cv_takes_the_volatile_branch() {
        let table = OfferTable::product_default();
        let decision = table.decide(1, 12.0, None);
        assert_eq!(decision.action.as_deref(), Some("Moderate Discount"));
        assert!(decision.reason.contains("undefined volatility"));
    }

    #[test]
    fn cv_exactly_at_threshold_is_stable() {
        let table = OfferTable::customer_default();
        assert_eq!(table.decide(1, 7.0, Some(1.0)).action.as_deref(), Some("Loyalty Discount"));
    }

    #[test]
    fn validation_rejects_inverted_cutoffs() {
        let mut table = OfferTable::customer_default();
        table.low_cutoff = 20.0;
        assert!(table.validate("offers.customer").is_err());
    }

    #[test]
    fn defaults_validate() {
        OfferTable::customer_default().validate("customer").expect("customer table");
        OfferTable::product_default().validate("product").expect("product table");
    }
}
