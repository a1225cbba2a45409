//! Shared types, config, and error definitions for frost-signal.

pub mod config;
pub mod error;
pub mod rules;
pub mod sources;
pub mod types;

pub use config::AppConfig;
pub use error::{body_excerpt, Error};
pub use rules::MarketRules;
pub use sources::{PriceHistorySource, WeatherSource};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
