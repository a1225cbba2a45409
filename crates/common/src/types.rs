//! Domain types shared across frost-signal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::InventoryBand;

// ── Signal Inputs ─────────────────────────────────────────────────────

/// Caller-supplied market context. The engine never fetches these itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub is_la_nina: bool,
    pub is_hurricane_active: bool,
    /// Storm center is more than 100 miles from Polk County.
    pub hurricane_center_far_from_polk: bool,
    /// SPI-3 precipitation index for the Brazilian growing belt.
    pub brazil_rainfall_index: f64,
    /// 1..=12
    pub current_month: u32,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            is_la_nina: false,
            is_hurricane_active: false,
            hurricane_center_far_from_polk: false,
            brazil_rainfall_index: 0.0,
            current_month: 1,
        }
    }
}

/// Everything the evaluator looks at for a single recompute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInput {
    pub current_temp_f: f64,
    pub hours_below_28: f64,
    /// Millions of gallons.
    pub current_inventory: f64,
    pub market_context: MarketContext,
    pub rsi_value: f64,
}

// ── Signal Output ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    #[serde(rename = "STRONG LONG (Brazil Drought)")]
    StrongLongBrazilDrought,
    #[serde(rename = "TAKE PROFIT / SELL")]
    TakeProfitSell,
    #[serde(rename = "SELL/SHORT (False Alarm)")]
    SellShortFalseAlarm,
    #[serde(rename = "Double Position")]
    DoublePosition,
    #[serde(rename = "Increase Position")]
    IncreasePosition,
    #[serde(rename = "Reduce Position")]
    ReducePosition,
    #[serde(rename = "Hold Position")]
    HoldPosition,
    #[serde(rename = "Monitor")]
    Monitor,
}

impl RecommendedAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendedAction::StrongLongBrazilDrought => "STRONG LONG (Brazil Drought)",
            RecommendedAction::TakeProfitSell => "TAKE PROFIT / SELL",
            RecommendedAction::SellShortFalseAlarm => "SELL/SHORT (False Alarm)",
            RecommendedAction::DoublePosition => "Double Position",
            RecommendedAction::IncreasePosition => "Increase Position",
            RecommendedAction::ReducePosition => "Reduce Position",
            RecommendedAction::HoldPosition => "Hold Position",
            RecommendedAction::Monitor => "Monitor",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule in the priority chain produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRule {
    BrazilDrought,
    RsiTakeProfit,
    HurricaneFalseAlarm,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrostRegime {
    None,
    PreFrostVolatility,
    RealFrost,
}

/// Auditable explanation of how a win probability was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub rule: SignalRule,
    pub headline: String,
    pub base_rate: f64,
    /// Set only on the baseline path.
    pub frost_regime: Option<FrostRegime>,
    pub inventory_band: Option<InventoryBand>,
    pub inventory_multiplier: Option<f64>,
    pub la_nina_factor: Option<f64>,
    /// True when the 0.95 ceiling clipped the raw product.
    pub capped: bool,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFlags {
    pub is_hurricane_false_alarm: bool,
    pub is_la_nina_active: bool,
    pub is_brazil_drought: bool,
    pub is_rsi_overbought: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub win_probability: f64,
    pub recommended_action: RecommendedAction,
    pub insight: Insight,
    pub flags: SignalFlags,
}

// ── External Data ─────────────────────────────────────────────────────

/// Weather condition label derived from a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Showers,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    pub fn from_wmo_code(code: i64) -> Self {
        match code {
            0 => WeatherCondition::Clear,
            1..=3 => WeatherCondition::PartlyCloudy,
            45 | 48 => WeatherCondition::Fog,
            51..=57 => WeatherCondition::Drizzle,
            61..=67 => WeatherCondition::Rain,
            71..=77 | 85 | 86 => WeatherCondition::Snow,
            80..=82 => WeatherCondition::Showers,
            95..=99 => WeatherCondition::Thunderstorm,
            _ => WeatherCondition::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::PartlyCloudy => "Partly Cloudy",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Showers => "Showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Unknown => "Unknown",
        }
    }
}

/// Current conditions at the monitored grove, already in imperial units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature_f: f64,
    pub humidity_pct: f64,
    pub wind_mph: f64,
    pub weather_code: i64,
    pub condition: WeatherCondition,
    /// At or below 32°F.
    pub is_freezing: bool,
    /// At or below 36°F.
    pub frost_warning: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Daily closes for a futures symbol, oldest first, nulls already removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub closes: Vec<f64>,
    pub fetched_at: DateTime<Utc>,
}
