/// Database configuration and connection management
pub mod database;

/// Commission rates, budget floor and other marketplace constants
pub mod marketplace;

pub use marketplace::{MarketplaceConfig, PremiumSource, load_app_configuration};
