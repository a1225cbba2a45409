//! Configuration loader. Layers config.toml, .env and environment overrides.

use std::path::Path;

use common::{AppConfig, Error, MarketRules};

fn parse_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number")))?;
    if !parsed.is_finite() {
        return Err(Error::Config(format!("{env_name} must be finite")));
    }
    Ok(parsed)
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if !(-90.0..=90.0).contains(&config.location.lat) {
        issues.push("location.lat must be in [-90,90]".into());
    }
    if !(-180.0..=180.0).contains(&config.location.lon) {
        issues.push("location.lon must be in [-180,180]".into());
    }

    if config.market.symbol.trim().is_empty() {
        issues.push("market.symbol must not be empty".into());
    }
    if config.market.rsi_period == 0 {
        issues.push("market.rsi_period must be > 0".into());
    }
    // Weekends and holidays thin the window; ask for twice the RSI lookback.
    if (config.market.history_days as usize) < config.market.rsi_period * 2 {
        issues.push("market.history_days must be >= 2 * market.rsi_period".into());
    }

    if config.timing.sync_interval_secs == 0 {
        issues.push("timing.sync_interval_secs must be > 0".into());
    }
    if config.timing.frost_tick_secs == 0 {
        issues.push("timing.frost_tick_secs must be > 0".into());
    }
    if config.timing.stale_after_secs == 0 {
        issues.push("timing.stale_after_secs must be > 0".into());
    }

    if !config.frost.reset_temp_f.is_finite() {
        issues.push("frost.reset_temp_f must be finite".into());
    }
    if config.controls.inventory_millions < 0.0 {
        issues.push("controls.inventory_millions must be >= 0".into());
    }
    if config.storage.state_dir.trim().is_empty() {
        issues.push("storage.state_dir must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from environment and optional config file.
pub fn load_config(path: &Path) -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, then config.toml if it exists.
    let mut config = AppConfig::default();
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    }

    // 3. Override with environment variables (highest priority).
    if let Ok(dir) = std::env::var("FROST_STATE_DIR") {
        config.storage.state_dir = dir;
    }
    if let Ok(symbol) = std::env::var("FROST_SYMBOL") {
        config.market.symbol = symbol.trim().to_string();
    }
    if let Ok(raw) = std::env::var("FROST_LAT") {
        config.location.lat = parse_f64(&raw, "FROST_LAT")?;
    }
    if let Ok(raw) = std::env::var("FROST_LON") {
        config.location.lon = parse_f64(&raw, "FROST_LON")?;
    }
    if let Ok(raw) = std::env::var("FROST_INVENTORY_M") {
        config.controls.inventory_millions = parse_f64(&raw, "FROST_INVENTORY_M")?;
    }
    if let Ok(raw) = std::env::var("FROST_LA_NINA") {
        config.controls.is_la_nina = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("FROST_HURRICANE_ACTIVE") {
        config.controls.is_hurricane_active = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("FROST_HURRICANE_FAR") {
        config.controls.hurricane_center_far_from_polk = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("FROST_BRAZIL_SPI") {
        config.controls.brazil_rainfall_index = parse_f64(&raw, "FROST_BRAZIL_SPI")?;
    }
    if let Ok(raw) = std::env::var("FROST_SYNC_INTERVAL_SECS") {
        config.timing.sync_interval_secs = parse_positive_u64(&raw, "FROST_SYNC_INTERVAL_SECS")?;
    }
    if let Ok(path) = std::env::var("FROST_RULES_PATH") {
        config.rules_path = path;
    }

    // 4. Validate.
    validate_config(&config)?;

    Ok(config)
}

/// Load the market rule table named by the config.
pub fn load_rules(config: &AppConfig) -> Result<MarketRules, Error> {
    let rules = MarketRules::load(Path::new(&config.rules_path))?;
    if config.frost.reset_temp_f < rules.frost_rule.critical_temp_f {
        return Err(Error::Config(format!(
            "frost.reset_temp_f ({}) must be >= frost_rule.critical_temp_f ({})",
            config.frost.reset_temp_f, rules.frost_rule.critical_temp_f
        )));
    }
    Ok(rules)
}
