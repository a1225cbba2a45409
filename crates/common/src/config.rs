//! Application configuration types.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Grove location used for weather lookups.
    #[serde(default)]
    pub location: LocationConfig,

    /// Futures symbol and RSI parameters.
    #[serde(default)]
    pub market: MarketConfig,

    /// Timing parameters (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Frost tracker thresholds not covered by the rule table.
    #[serde(default)]
    pub frost: FrostConfig,

    /// Starting values for the manually held controls.
    #[serde(default)]
    pub controls: ControlsConfig,

    /// Where persisted state and the event journal live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Path to the market rules document.
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Futures symbol (e.g., "OJ=F" for FCOJ).
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Trailing window of daily closes to request.
    #[serde(default = "default_history_days")]
    pub history_days: u32,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Live-data sync interval.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Frost tracker tick interval.
    #[serde(default = "default_frost_tick")]
    pub frost_tick_secs: u64,

    /// Age after which synced data is flagged stale.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrostConfig {
    /// Tracking resets once the temperature rises above this (°F).
    #[serde(default = "default_reset_temp")]
    pub reset_temp_f: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Inventory in millions of gallons.
    #[serde(default = "default_inventory")]
    pub inventory_millions: f64,
    #[serde(default)]
    pub is_la_nina: bool,
    #[serde(default)]
    pub is_hurricane_active: bool,
    #[serde(default)]
    pub hurricane_center_far_from_polk: bool,
    #[serde(default)]
    pub brazil_rainfall_index: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_rules_path() -> String {
    "market_rules.toml".into()
}
fn default_symbol() -> String {
    "OJ=F".into()
}
fn default_history_days() -> u32 {
    30
}
fn default_rsi_period() -> usize {
    14
}
fn default_sync_interval() -> u64 {
    600
}
fn default_frost_tick() -> u64 {
    1
}
fn default_stale_after() -> u64 {
    30 * 60
}
fn default_reset_temp() -> f64 {
    32.0
}
fn default_inventory() -> f64 {
    50.0
}
fn default_state_dir() -> String {
    ".frost-signal".into()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Polk County, FL".into(),
            lat: 27.95,
            lon: -81.70,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            history_days: default_history_days(),
            rsi_period: default_rsi_period(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            frost_tick_secs: default_frost_tick(),
            stale_after_secs: default_stale_after(),
        }
    }
}

impl Default for FrostConfig {
    fn default() -> Self {
        Self {
            reset_temp_f: default_reset_temp(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            inventory_millions: default_inventory(),
            is_la_nina: false,
            is_hurricane_active: false,
            hurricane_center_far_from_polk: false,
            brazil_rainfall_index: 0.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            location: LocationConfig::default(),
            market: MarketConfig::default(),
            timing: TimingConfig::default(),
            frost: FrostConfig::default(),
            controls: ControlsConfig::default(),
            storage: StorageConfig::default(),
            rules_path: default_rules_path(),
        }
    }
}
