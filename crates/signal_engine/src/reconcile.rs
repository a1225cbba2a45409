//! Live-data reconciler.
//!
//! Owns the current parameter set. Live syncs may only overwrite the
//! temperature and RSI; inventory and the hurricane / La Niña / Brazil
//! controls stay under manual control. Every mutation goes through
//! `&mut self` on this one owner, so a sync is fully applied before the next
//! recompute sees the parameters.

use chrono::{DateTime, Datelike, Duration, Utc};
use common::config::ControlsConfig;
use common::{
    Error, MarketContext, PriceHistorySource, SignalInput, WeatherReading, WeatherSource,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::rsi::{compute_rsi, NEUTRAL_RSI};
use crate::store::{StateStore, LAST_RSI_KEY, LAST_SYNC_KEY};

/// Current inputs: manual controls plus the latest live values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    pub current_inventory: f64,
    pub is_la_nina: bool,
    pub is_hurricane_active: bool,
    pub hurricane_center_far_from_polk: bool,
    pub brazil_rainfall_index: f64,

    /// `None` until a temperature has been obtained.
    pub current_temp_f: Option<f64>,
    pub rsi_value: f64,
    pub hours_below_28: f64,
}

impl SignalParams {
    pub fn from_controls(controls: &ControlsConfig) -> Self {
        Self {
            current_inventory: controls.inventory_millions,
            is_la_nina: controls.is_la_nina,
            is_hurricane_active: controls.is_hurricane_active,
            hurricane_center_far_from_polk: controls.hurricane_center_far_from_polk,
            brazil_rainfall_index: controls.brazil_rainfall_index,
            current_temp_f: None,
            rsi_value: NEUTRAL_RSI,
            hours_below_28: 0.0,
        }
    }

    /// Evaluator input for `month`, or `None` while the temperature is unknown.
    pub fn to_input(&self, month: u32) -> Option<SignalInput> {
        let temp = self.current_temp_f?;
        Some(SignalInput {
            current_temp_f: temp,
            hours_below_28: self.hours_below_28,
            current_inventory: self.current_inventory,
            market_context: MarketContext {
                is_la_nina: self.is_la_nina,
                is_hurricane_active: self.is_hurricane_active,
                hurricane_center_far_from_polk: self.hurricane_center_far_from_polk,
                brazil_rainfall_index: self.brazil_rainfall_index,
                current_month: month,
            },
            rsi_value: self.rsi_value,
        })
    }
}

/// Live values from one fetch; `None` fields leave the current value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveSnapshot {
    pub temperature_f: Option<f64>,
    pub rsi: Option<f64>,
}

/// Merge live values into `current`. Manual controls are never touched.
pub fn reconcile(current: &SignalParams, snapshot: &LiveSnapshot) -> SignalParams {
    let mut merged = current.clone();
    if let Some(temp) = snapshot.temperature_f {
        merged.current_temp_f = Some(temp);
    }
    if let Some(rsi) = snapshot.rsi {
        merged.rsi_value = rsi;
    }
    merged
}

/// Raw results of one fan-out fetch.
#[derive(Debug)]
pub struct LiveFetch {
    pub weather: Result<WeatherReading, Error>,
    pub rsi: Result<f64, Error>,
}

/// Fetch weather and price history concurrently. Each leg fails on its own.
pub async fn fetch_live<W, P>(weather: &W, prices: &P, rsi_period: usize) -> LiveFetch
where
    W: WeatherSource,
    P: PriceHistorySource,
{
    let (weather, history) = tokio::join!(weather.current_conditions(), prices.daily_closes());
    let rsi = history.and_then(|h| {
        debug!("{}: {} closes", h.symbol, h.closes.len());
        compute_rsi(&h.closes, rsi_period)
    });
    LiveFetch { weather, rsi }
}

/// Persisted record of the last successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub temperature_f: f64,
    pub weather: Option<WeatherReading>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No live data has ever been obtained.
    Unavailable,
    Fresh,
    Stale { age_secs: i64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub weather: Option<WeatherReading>,
    /// Annotations from the most recent sync attempt.
    pub errors: Vec<String>,
}

impl SyncStatus {
    pub fn freshness(&self, now: DateTime<Utc>, stale_after: Duration) -> Freshness {
        match self.last_sync {
            None => Freshness::Unavailable,
            Some(at) => {
                let age = now - at;
                if age > stale_after {
                    Freshness::Stale {
                        age_secs: age.num_seconds(),
                    }
                } else {
                    Freshness::Fresh
                }
            }
        }
    }
}

/// Outcome of applying one sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub temperature_updated: bool,
    pub rsi_updated: bool,
    pub errors: Vec<String>,
}

/// Single owner of the parameter set and sync status.
pub struct Reconciler<S: StateStore> {
    params: SignalParams,
    status: SyncStatus,
    store: S,
}

impl<S: StateStore> Reconciler<S> {
    /// Start from the configured controls plus any persisted last-known values.
    pub fn load(store: S, controls: &ControlsConfig) -> Result<Self, Error> {
        let mut params = SignalParams::from_controls(controls);
        let mut status = SyncStatus::default();

        if let Some(record) = store.get::<SyncRecord>(LAST_SYNC_KEY)? {
            params.current_temp_f = Some(record.temperature_f);
            status.last_sync = Some(record.synced_at);
            status.weather = record.weather;
        }
        if let Some(rsi) = store.get::<f64>(LAST_RSI_KEY)? {
            params.rsi_value = rsi;
        }

        Ok(Self {
            params,
            status,
            store,
        })
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn input(&self, now: DateTime<Utc>) -> Option<SignalInput> {
        self.params.to_input(now.month())
    }

    /// Apply a fetch. Failures keep the last-known value and are annotated.
    pub fn apply(&mut self, fetch: LiveFetch, now: DateTime<Utc>) -> SyncReport {
        let mut errors = Vec::new();
        let mut snapshot = LiveSnapshot::default();
        let mut reading = None;

        match fetch.weather {
            Ok(w) => {
                snapshot.temperature_f = Some(w.temperature_f);
                reading = Some(w);
            }
            Err(e) => {
                warn!("Weather sync failed, keeping last-known temperature: {}", e);
                errors.push(format!("weather: {e}"));
            }
        }

        match fetch.rsi {
            Ok(rsi) => snapshot.rsi = Some(rsi),
            Err(e @ Error::InsufficientData { .. }) => {
                warn!("RSI unavailable ({}), using neutral {}", e, NEUTRAL_RSI);
                snapshot.rsi = Some(NEUTRAL_RSI);
                errors.push(format!("rsi: {e}"));
            }
            Err(e) => {
                warn!(
                    "Price history sync failed, keeping RSI {}: {}",
                    self.params.rsi_value, e
                );
                errors.push(format!("rsi: {e}"));
            }
        }

        self.params = reconcile(&self.params, &snapshot);

        if let Some(temp) = snapshot.temperature_f {
            self.status.last_sync = Some(now);
            self.status.weather = reading.clone();
            let record = SyncRecord {
                temperature_f: temp,
                weather: reading,
                synced_at: now,
            };
            if let Err(e) = self.store.set(LAST_SYNC_KEY, &record) {
                warn!("Failed to persist last sync: {}", e);
            }
        }
        if let Some(rsi) = snapshot.rsi {
            if let Err(e) = self.store.set(LAST_RSI_KEY, &rsi) {
                warn!("Failed to persist last RSI: {}", e);
            }
        }
        self.status.errors = errors.clone();

        info!(
            "Sync applied: temp={:?}°F rsi={} errors={}",
            self.params.current_temp_f,
            self.params.rsi_value,
            errors.len()
        );

        SyncReport {
            temperature_updated: snapshot.temperature_f.is_some(),
            rsi_updated: snapshot.rsi.is_some(),
            errors,
        }
    }

    pub fn set_frost_hours(&mut self, hours: f64) {
        self.params.hours_below_28 = hours.max(0.0);
    }

    pub fn set_inventory(&mut self, millions: f64) {
        self.params.current_inventory = millions;
    }

    pub fn set_la_nina(&mut self, active: bool) {
        self.params.is_la_nina = active;
    }

    pub fn set_hurricane(&mut self, active: bool, far_from_polk: bool) {
        self.params.is_hurricane_active = active;
        self.params.hurricane_center_far_from_polk = far_from_polk;
    }

    pub fn set_brazil_rainfall_index(&mut self, spi: f64) {
        self.params.brazil_rainfall_index = spi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use common::{PriceHistory, WeatherCondition};

    struct FakeWeather(Option<f64>);
    struct FakePrices(Option<Vec<f64>>);

    impl WeatherSource for FakeWeather {
        async fn current_conditions(&self) -> Result<WeatherReading, Error> {
            match self.0 {
                Some(t) => Ok(reading(t)),
                None => Err(Error::Weather("connection refused".into())),
            }
        }
    }

    impl PriceHistorySource for FakePrices {
        async fn daily_closes(&self) -> Result<PriceHistory, Error> {
            match &self.0 {
                Some(closes) => Ok(PriceHistory {
                    symbol: "OJ=F".into(),
                    closes: closes.clone(),
                    fetched_at: t0(),
                }),
                None => Err(Error::PriceHistory("timeout".into())),
            }
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-14T12:00:00Z")
            .expect("valid t0")
            .with_timezone(&Utc)
    }

    fn reading(temp_f: f64) -> WeatherReading {
        WeatherReading {
            temperature_f: temp_f,
            humidity_pct: 80.0,
            wind_mph: 3.0,
            weather_code: 0,
            condition: WeatherCondition::Clear,
            is_freezing: temp_f <= 32.0,
            frost_warning: temp_f <= 36.0,
            fetched_at: t0(),
        }
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 300.0 + i as f64).collect()
    }

    fn manual_controls() -> ControlsConfig {
        ControlsConfig {
            inventory_millions: 30.0,
            is_hurricane_active: true,
            ..ControlsConfig::default()
        }
    }

    #[test]
    fn test_reconcile_only_touches_live_fields() {
        let current = SignalParams::from_controls(&manual_controls());
        let merged = reconcile(
            &current,
            &LiveSnapshot {
                temperature_f: Some(26.5),
                rsi: Some(61.0),
            },
        );

        assert_eq!(merged.current_temp_f, Some(26.5));
        assert_eq!(merged.rsi_value, 61.0);
        assert_eq!(merged.current_inventory, 30.0);
        assert!(merged.is_hurricane_active);
        assert_eq!(merged.is_la_nina, current.is_la_nina);
    }

    #[tokio::test]
    async fn test_sync_leaves_manual_controls_unchanged() {
        let mut rec = Reconciler::load(MemoryStore::new(), &manual_controls()).unwrap();
        let fetch = fetch_live(&FakeWeather(Some(41.0)), &FakePrices(Some(rising(20))), 14).await;
        let report = rec.apply(fetch, t0());

        assert!(report.temperature_updated);
        assert!(report.errors.is_empty());
        assert_eq!(rec.params().current_temp_f, Some(41.0));
        assert_eq!(rec.params().rsi_value, 100.0);
        assert_eq!(rec.params().current_inventory, 30.0);
        assert!(rec.params().is_hurricane_active);
    }

    #[tokio::test]
    async fn test_rsi_failure_keeps_previous_value() {
        let store = MemoryStore::new();
        store.set(LAST_RSI_KEY, &64.0_f64).unwrap();
        let mut rec = Reconciler::load(store, &manual_controls()).unwrap();

        let fetch = fetch_live(&FakeWeather(Some(50.0)), &FakePrices(None), 14).await;
        let report = rec.apply(fetch, t0());

        assert!(report.temperature_updated);
        assert!(!report.rsi_updated);
        assert_eq!(rec.params().rsi_value, 64.0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("rsi:"));
        assert_eq!(rec.status().last_sync, Some(t0()));
    }

    #[tokio::test]
    async fn test_short_history_falls_back_to_neutral() {
        let mut rec = Reconciler::load(MemoryStore::new(), &manual_controls()).unwrap();
        rec.apply(
            fetch_live(&FakeWeather(Some(50.0)), &FakePrices(Some(rising(20))), 14).await,
            t0(),
        );
        assert_eq!(rec.params().rsi_value, 100.0);

        let report = rec.apply(
            fetch_live(&FakeWeather(Some(50.0)), &FakePrices(Some(rising(5))), 14).await,
            t0(),
        );
        assert!(report.rsi_updated);
        assert_eq!(rec.params().rsi_value, NEUTRAL_RSI);
    }

    #[tokio::test]
    async fn test_weather_failure_is_unavailable_until_first_success() {
        let mut rec = Reconciler::load(MemoryStore::new(), &manual_controls()).unwrap();
        let report = rec.apply(
            fetch_live(&FakeWeather(None), &FakePrices(Some(rising(20))), 14).await,
            t0(),
        );

        assert!(!report.temperature_updated);
        assert!(rec.input(t0()).is_none());
        assert_eq!(
            rec.status().freshness(t0(), Duration::minutes(30)),
            Freshness::Unavailable
        );
    }

    #[test]
    fn test_freshness_goes_stale_after_thirty_minutes() {
        let status = SyncStatus {
            last_sync: Some(t0()),
            ..SyncStatus::default()
        };
        let window = Duration::minutes(30);

        assert_eq!(status.freshness(t0() + Duration::minutes(30), window), Freshness::Fresh);
        assert_eq!(
            status.freshness(t0() + Duration::minutes(31), window),
            Freshness::Stale { age_secs: 1860 }
        );
    }

    #[test]
    fn test_load_restores_last_known_values() {
        let store = MemoryStore::new();
        let record = SyncRecord {
            temperature_f: 27.0,
            weather: Some(reading(27.0)),
            synced_at: t0(),
        };
        store.set(LAST_SYNC_KEY, &record).unwrap();
        store.set(LAST_RSI_KEY, &72.0_f64).unwrap();

        let rec = Reconciler::load(store, &ControlsConfig::default()).unwrap();
        let input = rec.input(t0()).expect("temperature restored");

        assert_eq!(input.current_temp_f, 27.0);
        assert_eq!(input.rsi_value, 72.0);
        assert_eq!(input.market_context.current_month, 1);
        assert_eq!(rec.status().last_sync, Some(t0()));
    }

    #[test]
    fn test_manual_setters() {
        let mut rec = Reconciler::load(MemoryStore::new(), &ControlsConfig::default()).unwrap();
        rec.set_inventory(33.0);
        rec.set_la_nina(true);
        rec.set_hurricane(true, true);
        rec.set_brazil_rainfall_index(-1.8);
        rec.set_frost_hours(-2.0);

        let p = rec.params();
        assert_eq!(p.current_inventory, 33.0);
        assert!(p.is_la_nina && p.is_hurricane_active && p.hurricane_center_far_from_polk);
        assert_eq!(p.brazil_rainfall_index, -1.8);
        assert_eq!(p.hours_below_28, 0.0);
    }
}
