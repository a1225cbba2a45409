//! Market rule table.
//!
//! Loaded once at startup from `market_rules.toml` (or built-in defaults) and
//! never mutated afterwards. The document layout is:
//!
//! ```toml
//! [frost_rule]
//! critical_temp_f = 28.0
//! min_duration_hours = 4.0
//!
//! [inventory_multipliers]
//! under_35m = 2.0
//! 35_45m = 1.5
//! over_55m = 0.7
//!
//! [win_rates]
//! real_frost = 0.76
//! # ...
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Inventory below this (millions of gallons) is critically low.
pub const INVENTORY_CRITICAL_M: f64 = 35.0;
/// Upper bound of the "low" inventory band.
pub const INVENTORY_LOW_M: f64 = 45.0;
/// Inventory above this is a glut.
pub const INVENTORY_GLUT_M: f64 = 55.0;

/// Immutable rule table consumed by the signal evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRules {
    #[serde(default)]
    pub frost_rule: FrostRule,
    #[serde(default)]
    pub inventory_multipliers: InventoryMultipliers,
    #[serde(default)]
    pub win_rates: WinRates,
    #[serde(default)]
    pub amplifiers: Amplifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrostRule {
    /// Temperature at or below which fruit damage begins (°F).
    #[serde(default = "default_critical_temp")]
    pub critical_temp_f: f64,
    /// Hours below the critical temperature before a frost counts as "real".
    #[serde(default = "default_min_duration")]
    pub min_duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMultipliers {
    #[serde(default = "default_under_35m")]
    pub under_35m: f64,
    #[serde(rename = "35_45m", default = "default_35_45m")]
    pub between_35_45m: f64,
    #[serde(default = "default_over_55m")]
    pub over_55m: f64,
}

/// Base win rates per regime. Illustrative constants, not fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRates {
    #[serde(default = "default_real_frost")]
    pub real_frost: f64,
    #[serde(default = "default_pre_frost")]
    pub pre_frost_volatility: f64,
    #[serde(default = "default_hurricane_false_alarm")]
    pub hurricane_false_alarm: f64,
    #[serde(default = "default_brazil_drought")]
    pub brazil_drought: f64,
    #[serde(default = "default_rsi_take_profit")]
    pub rsi_take_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amplifiers {
    #[serde(default = "default_la_nina")]
    pub la_nina: f64,
}

/// Which inventory band a reading falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryBand {
    Critical,
    Low,
    Neutral,
    Glut,
}

impl InventoryBand {
    pub fn label(self) -> &'static str {
        match self {
            InventoryBand::Critical => "<35M",
            InventoryBand::Low => "35-45M",
            InventoryBand::Neutral => "45-55M",
            InventoryBand::Glut => ">55M",
        }
    }
}

fn default_critical_temp() -> f64 {
    28.0
}
fn default_min_duration() -> f64 {
    4.0
}
fn default_under_35m() -> f64 {
    2.0
}
fn default_35_45m() -> f64 {
    1.5
}
fn default_over_55m() -> f64 {
    0.7
}
fn default_real_frost() -> f64 {
    0.76
}
fn default_pre_frost() -> f64 {
    0.62
}
fn default_hurricane_false_alarm() -> f64 {
    0.71
}
fn default_brazil_drought() -> f64 {
    0.68
}
fn default_rsi_take_profit() -> f64 {
    0.65
}
fn default_la_nina() -> f64 {
    1.4
}

impl Default for FrostRule {
    fn default() -> Self {
        Self {
            critical_temp_f: default_critical_temp(),
            min_duration_hours: default_min_duration(),
        }
    }
}

impl Default for InventoryMultipliers {
    fn default() -> Self {
        Self {
            under_35m: default_under_35m(),
            between_35_45m: default_35_45m(),
            over_55m: default_over_55m(),
        }
    }
}

impl Default for WinRates {
    fn default() -> Self {
        Self {
            real_frost: default_real_frost(),
            pre_frost_volatility: default_pre_frost(),
            hurricane_false_alarm: default_hurricane_false_alarm(),
            brazil_drought: default_brazil_drought(),
            rsi_take_profit: default_rsi_take_profit(),
        }
    }
}

impl Default for Amplifiers {
    fn default() -> Self {
        Self {
            la_nina: default_la_nina(),
        }
    }
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            frost_rule: FrostRule::default(),
            inventory_multipliers: InventoryMultipliers::default(),
            win_rates: WinRates::default(),
            amplifiers: Amplifiers::default(),
        }
    }
}

impl MarketRules {
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let rules: MarketRules = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("Failed to parse market rules: {}", e)))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load rules from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let mut issues: Vec<String> = Vec::new();

        if !self.frost_rule.critical_temp_f.is_finite() {
            issues.push("frost_rule.critical_temp_f must be finite".into());
        }
        if self.frost_rule.min_duration_hours.is_nan() || self.frost_rule.min_duration_hours <= 0.0 {
            issues.push("frost_rule.min_duration_hours must be > 0".into());
        }

        let multipliers = [
            ("inventory_multipliers.under_35m", self.inventory_multipliers.under_35m),
            ("inventory_multipliers.35_45m", self.inventory_multipliers.between_35_45m),
            ("inventory_multipliers.over_55m", self.inventory_multipliers.over_55m),
            ("amplifiers.la_nina", self.amplifiers.la_nina),
        ];
        for (name, value) in multipliers {
            if !value.is_finite() || value <= 0.0 {
                issues.push(format!("{name} must be > 0"));
            }
        }

        let rates = [
            ("win_rates.real_frost", self.win_rates.real_frost),
            ("win_rates.pre_frost_volatility", self.win_rates.pre_frost_volatility),
            ("win_rates.hurricane_false_alarm", self.win_rates.hurricane_false_alarm),
            ("win_rates.brazil_drought", self.win_rates.brazil_drought),
            ("win_rates.rsi_take_profit", self.win_rates.rsi_take_profit),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                issues.push(format!("{name} must be in [0,1]"));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Invalid market rules:\n - {}",
                issues.join("\n - ")
            )))
        }
    }

    pub fn inventory_band(&self, inventory_millions: f64) -> InventoryBand {
        if inventory_millions < INVENTORY_CRITICAL_M {
            InventoryBand::Critical
        } else if inventory_millions <= INVENTORY_LOW_M {
            InventoryBand::Low
        } else if inventory_millions > INVENTORY_GLUT_M {
            InventoryBand::Glut
        } else {
            InventoryBand::Neutral
        }
    }

    pub fn inventory_multiplier(&self, band: InventoryBand) -> f64 {
        match band {
            InventoryBand::Critical => self.inventory_multipliers.under_35m,
            InventoryBand::Low => self.inventory_multipliers.between_35_45m,
            InventoryBand::Neutral => 1.0,
            InventoryBand::Glut => self.inventory_multipliers.over_55m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let raw = r#"
            [frost_rule]
            critical_temp_f = 27.0
            min_duration_hours = 3.5

            [inventory_multipliers]
            under_35m = 2.5
            35_45m = 1.25
            over_55m = 0.6

            [win_rates]
            real_frost = 0.8
            pre_frost_volatility = 0.6
            hurricane_false_alarm = 0.7
            brazil_drought = 0.66
            rsi_take_profit = 0.64
        "#;

        let rules = MarketRules::from_toml_str(raw).expect("rules should parse");
        assert_eq!(rules.frost_rule.critical_temp_f, 27.0);
        assert_eq!(rules.inventory_multipliers.between_35_45m, 1.25);
        assert_eq!(rules.win_rates.real_frost, 0.8);
        // Missing section falls back to defaults.
        assert_eq!(rules.amplifiers.la_nina, 1.4);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let rules = MarketRules::from_toml_str("").expect("empty doc should parse");
        assert_eq!(rules, MarketRules::default());
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let raw = r#"
            [inventory_multipliers]
            under_35m = 0.0

            [win_rates]
            real_frost = 1.5
        "#;

        let err = MarketRules::from_toml_str(raw).unwrap_err().to_string();
        assert!(err.contains("under_35m"), "{err}");
        assert!(err.contains("real_frost"), "{err}");
    }

    #[test]
    fn test_inventory_bands() {
        let rules = MarketRules::default();
        assert_eq!(rules.inventory_band(30.0), InventoryBand::Critical);
        assert_eq!(rules.inventory_band(35.0), InventoryBand::Low);
        assert_eq!(rules.inventory_band(45.0), InventoryBand::Low);
        assert_eq!(rules.inventory_band(50.0), InventoryBand::Neutral);
        assert_eq!(rules.inventory_band(55.0), InventoryBand::Neutral);
        assert_eq!(rules.inventory_band(55.1), InventoryBand::Glut);

        assert_eq!(rules.inventory_multiplier(InventoryBand::Critical), 2.0);
        assert_eq!(rules.inventory_multiplier(InventoryBand::Neutral), 1.0);
        assert_eq!(rules.inventory_multiplier(InventoryBand::Glut), 0.7);
    }
}
