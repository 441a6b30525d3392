//! Commission calculation - the platform's cut of every release.
//!
//! Pure and deterministic: the same amount and premium flag always produce the
//! same [`CommissionRecord`].

use crate::{
    config::MarketplaceConfig,
    errors::{Error, Result},
};
use serde::Serialize;

/// Rounds to two decimal places, halves away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The split of one transaction between platform and payee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRecord {
    /// Gross amount the split was computed from
    pub amount: f64,
    /// Rate that was applied
    pub commission_rate: f64,
    /// Platform fee, `round2(amount * rate)`
    pub commission: f64,
    /// Payee share, `round2(amount - commission)`
    pub net_amount: f64,
}

/// Computes commission at one of two configured rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionCalculator {
    standard_rate: f64,
    premium_rate: f64,
}

impl CommissionCalculator {
    /// Builds a calculator, rejecting rates outside `[0, 1)` or a premium rate
    /// that is not strictly below the standard one.
    pub fn new(standard_rate: f64, premium_rate: f64) -> Result<Self> {
        let in_range = |rate: f64| rate.is_finite() && (0.0..1.0).contains(&rate);
        if !in_range(standard_rate) || !in_range(premium_rate) || premium_rate >= standard_rate {
            return Err(Error::Config {
                message: format!(
                    "Invalid commission rates: standard {standard_rate}, premium {premium_rate}"
                ),
            });
        }
        Ok(Self {
            standard_rate,
            premium_rate,
        })
    }

    /// Builds a calculator from the marketplace configuration.
    pub fn from_config(config: &MarketplaceConfig) -> Result<Self> {
        Self::new(
            config.standard_commission_rate,
            config.premium_commission_rate,
        )
    }

    /// The rate applied for the given premium flag.
    #[must_use]
    pub const fn rate_for(&self, is_premium: bool) -> f64 {
        if is_premium {
            self.premium_rate
        } else {
            self.standard_rate
        }
    }

    /// Splits `amount` into platform commission and net payout.
    ///
    /// The commission is rounded from the raw product first; the net amount is
    /// then the rounded difference between the gross amount and that rounded
    /// commission.
    #[must_use]
    pub fn calculate(&self, amount: f64, is_premium: bool) -> CommissionRecord {
        let commission_rate = self.rate_for(is_premium);
        let commission = round2(amount * commission_rate);
        let net_amount = round2(amount - commission);
        CommissionRecord {
            amount,
            commission_rate,
            commission,
            net_amount,
        }
    }
}

/// Total commission earned across the given records.
#[must_use]
pub fn platform_earnings(records: &[CommissionRecord]) -> f64 {
    round2(records.iter().map(|r| r.commission).sum())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn calculator() -> CommissionCalculator {
        CommissionCalculator::new(0.15, 0.10).unwrap()
    }

    #[test]
    fn test_standard_rate_split() {
        let record = calculator().calculate(1000.0, false);
        assert_eq!(record.commission_rate, 0.15);
        assert_eq!(record.commission, 150.0);
        assert_eq!(record.net_amount, 850.0);
    }

    #[test]
    fn test_premium_commission_is_lower() {
        let calc = calculator();
        let premium = calc.calculate(100.0, true);
        let standard = calc.calculate(100.0, false);
        assert!(premium.commission < standard.commission);
        assert_eq!(premium.commission, 10.0);
        assert_eq!(premium.net_amount, 90.0);
    }

    #[test]
    fn test_rounding_commission_then_net() {
        // 333.33 * 0.15 = 49.9995 -> 50.00; net = 283.33
        let record = calculator().calculate(333.33, false);
        assert_eq!(record.commission, 50.0);
        assert_eq!(record.net_amount, 283.33);
    }

    #[test]
    fn test_split_sums_to_rounded_amount() {
        let calc = calculator();
        for amount in [0.01, 1.0, 99.99, 123.45, 500.0, 777.77, 1234.56, 98_765.43] {
            for premium in [false, true] {
                let r = calc.calculate(amount, premium);
                assert!((r.commission + r.net_amount - round2(amount)).abs() < 0.005);
                assert_eq!(r.commission, round2(amount * calc.rate_for(premium)));
            }
        }
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(CommissionCalculator::new(0.10, 0.10).is_err());
        assert!(CommissionCalculator::new(0.10, 0.15).is_err());
        assert!(CommissionCalculator::new(1.0, 0.10).is_err());
        assert!(CommissionCalculator::new(0.15, -0.01).is_err());
        assert!(CommissionCalculator::new(f64::NAN, 0.10).is_err());
    }

    #[test]
    fn test_platform_earnings_sums_commissions() {
        let calc = calculator();
        let records = [
            calc.calculate(1000.0, false),
            calc.calculate(500.0, true),
            calc.calculate(333.33, false),
        ];
        assert_eq!(platform_earnings(&records), 250.0);
        assert_eq!(platform_earnings(&[]), 0.0);
    }
}
