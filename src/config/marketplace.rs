//! Marketplace configuration loading.
//!
//! Commission rates, the minimum gig budget and the other business constants
//! are read once at startup: first from an optional TOML file, then overridden
//! by environment variables, then validated. The resulting
//! [`MarketplaceConfig`] is immutable and handed to the core managers.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Whose premium membership earns the discounted commission rate on a
/// milestone release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumSource {
    /// The paying client's premium flag
    #[default]
    Client,
    /// The receiving worker's premium flag
    Worker,
}

impl std::str::FromStr for PremiumSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "worker" | "student" => Ok(Self::Worker),
            other => Err(Error::Config {
                message: format!("Unknown premium discount source '{other}'"),
            }),
        }
    }
}

/// Business constants for the marketplace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Commission taken from releases when no premium discount applies
    pub standard_commission_rate: f64,
    /// Discounted commission rate, strictly below the standard rate
    pub premium_commission_rate: f64,
    /// Smallest budget a gig may be created with
    pub minimum_gig_budget: f64,
    /// Currency code stamped on new gigs
    pub currency: String,
    /// Featuring duration used when the client does not give one
    pub default_feature_days: u32,
    /// Whose premium flag selects the discounted rate
    pub premium_discount_source: PremiumSource,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            standard_commission_rate: 0.15,
            premium_commission_rate: 0.10,
            minimum_gig_budget: 500.0,
            currency: "INR".to_string(),
            default_feature_days: 7,
            premium_discount_source: PremiumSource::Client,
        }
    }
}

impl MarketplaceConfig {
    /// Checks the invariants every other module relies on.
    pub fn validate(&self) -> Result<()> {
        let rate_ok = |rate: f64| rate.is_finite() && (0.0..1.0).contains(&rate);
        if !rate_ok(self.standard_commission_rate) || !rate_ok(self.premium_commission_rate) {
            return Err(Error::Config {
                message: "Commission rates must be within [0, 1)".to_string(),
            });
        }
        if self.premium_commission_rate >= self.standard_commission_rate {
            return Err(Error::Config {
                message: format!(
                    "Premium commission rate ({}) must be lower than the standard rate ({})",
                    self.premium_commission_rate, self.standard_commission_rate
                ),
            });
        }
        if !self.minimum_gig_budget.is_finite() || self.minimum_gig_budget <= 0.0 {
            return Err(Error::Config {
                message: "Minimum gig budget must be positive".to_string(),
            });
        }
        if self.default_feature_days == 0 {
            return Err(Error::Config {
                message: "Default feature duration must be at least one day".to_string(),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Config {
                message: "Currency code cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Applies overrides looked up by variable name.
    ///
    /// `lookup` is normally `std::env::var(..).ok()`; tests pass a map.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("STANDARD_COMMISSION_RATE") {
            self.standard_commission_rate = parse_number("STANDARD_COMMISSION_RATE", &raw)?;
        }
        if let Some(raw) = lookup("PREMIUM_COMMISSION_RATE") {
            self.premium_commission_rate = parse_number("PREMIUM_COMMISSION_RATE", &raw)?;
        }
        if let Some(raw) = lookup("MINIMUM_GIG_BUDGET") {
            self.minimum_gig_budget = parse_number("MINIMUM_GIG_BUDGET", &raw)?;
        }
        if let Some(raw) = lookup("PREMIUM_DISCOUNT_SOURCE") {
            self.premium_discount_source = raw.parse()?;
        }
        Ok(self)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|e| Error::Config {
        message: format!("{name} must be a number, got '{raw}': {e}"),
    })
}

/// Loads marketplace configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MarketplaceConfig> {
    let path_ref = path.as_ref();
    debug!("Loading marketplace configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the process configuration: the file named by `MARKETPLACE_CONFIG`
/// (default `config.toml`, skipped if absent), then environment overrides,
/// then validation.
pub fn load_app_configuration() -> Result<MarketplaceConfig> {
    let path = std::env::var("MARKETPLACE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let base = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!("No configuration file at {}, using defaults", path);
        MarketplaceConfig::default()
    };

    let config = base.with_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    info!(
        standard_rate = config.standard_commission_rate,
        premium_rate = config.premium_commission_rate,
        minimum_budget = config.minimum_gig_budget,
        "Marketplace configuration loaded"
    );
    Ok(config)
}
