//! Application wiring: clients, stores, tracker and evaluator on one thread.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use common::{AppConfig, MarketRules, PriceHistorySource, SignalResult, WeatherSource};
use price_client::YahooChartClient;
use signal_engine::frost::FrostEvent;
use signal_engine::store::LAST_SNAPSHOT_KEY;
use signal_engine::{
    fetch_live, FileStore, Freshness, FrostMonitor, FrostThresholds, Reconciler,
    SignalEvaluator, Snapshot, StateStore, SyncReport,
};
use weather_client::OpenMeteoClient;

use crate::journal::{EventJournal, JournalEvent, ResetReason};

pub fn frost_thresholds(config: &AppConfig, rules: &MarketRules) -> FrostThresholds {
    FrostThresholds {
        critical_temp_f: rules.frost_rule.critical_temp_f,
        reset_temp_f: config.frost.reset_temp_f,
        alert_after_hours: rules.frost_rule.min_duration_hours,
    }
}

pub fn open_store(config: &AppConfig) -> Result<FileStore> {
    FileStore::open(&config.storage.state_dir)
        .with_context(|| format!("opening state dir {}", config.storage.state_dir))
}

pub fn open_journal(config: &AppConfig) -> Result<EventJournal> {
    EventJournal::open(Path::new(&config.storage.state_dir)).context("opening event journal")
}

pub struct App<W = OpenMeteoClient, P = YahooChartClient> {
    config: AppConfig,
    evaluator: SignalEvaluator,
    reconciler: Reconciler<FileStore>,
    frost: FrostMonitor<FileStore>,
    store: FileStore,
    journal: EventJournal,
    weather: W,
    prices: P,
    last_result: Option<SignalResult>,
    reported_unavailable: bool,
}

impl App {
    pub fn new(config: AppConfig, rules: MarketRules) -> Result<Self> {
        let weather = OpenMeteoClient::new(config.location.clone());
        let prices = YahooChartClient::new(&config.market);
        Self::with_sources(config, rules, weather, prices)
    }

    /// Live loop until Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }
}

impl<W: WeatherSource, P: PriceHistorySource> App<W, P> {
    pub fn with_sources(
        config: AppConfig,
        rules: MarketRules,
        weather: W,
        prices: P,
    ) -> Result<Self> {
        let store = open_store(&config)?;
        let journal = open_journal(&config)?;
        let now = Utc::now();

        let frost = FrostMonitor::load(store.clone(), frost_thresholds(&config, &rules), now)
            .context("loading frost tracker")?;
        let mut reconciler =
            Reconciler::load(store.clone(), &config.controls).context("loading last sync")?;
        reconciler.set_frost_hours(frost.hours());

        Ok(Self {
            weather,
            prices,
            evaluator: SignalEvaluator::new(rules),
            config,
            reconciler,
            frost,
            store,
            journal,
            last_result: None,
            reported_unavailable: false,
        })
    }

    /// Long-running loop: frost clock, periodic sync, recompute on change.
    ///
    /// `shutdown` is polled across iterations, so a signal that arrives while
    /// a sync is in flight is seen as soon as that sync returns.
    pub async fn run_until<F, T>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = T>,
    {
        self.journal.record(
            Utc::now(),
            JournalEvent::Start {
                location: self.config.location.name.clone(),
                symbol: self.config.market.symbol.clone(),
                sync_interval_secs: self.config.timing.sync_interval_secs,
            },
        );
        info!("Event journal: {}", self.journal.dir().display());

        let mut sync_interval =
            tokio::time::interval(Duration::from_secs(self.config.timing.sync_interval_secs));
        sync_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frost_interval =
            tokio::time::interval(Duration::from_secs(self.config.timing.frost_tick_secs));
        frost_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = sync_interval.tick() => {
                    self.sync().await;
                    self.recompute();
                }
                _ = frost_interval.tick() => {
                    self.frost_tick();
                    self.recompute();
                }
                _ = &mut shutdown => {
                    info!("Shutting down");
                    self.journal.record(Utc::now(), JournalEvent::Stop);
                    return Ok(());
                }
            }
        }
    }

    /// Fetch weather and RSI in parallel and merge into the parameter set.
    pub async fn sync(&mut self) -> SyncReport {
        let fetch = fetch_live(&self.weather, &self.prices, self.config.market.rsi_period).await;
        let now = Utc::now();
        let report = self.reconciler.apply(fetch, now);

        self.journal.record(
            now,
            JournalEvent::Sync {
                temperature_f: self.reconciler.params().current_temp_f,
                rsi: self.reconciler.params().rsi_value,
                temperature_updated: report.temperature_updated,
                rsi_updated: report.rsi_updated,
                errors: report.errors.clone(),
            },
        );

        if let Freshness::Stale { age_secs } = self.freshness() {
            warn!("Live data is stale ({}s since last successful sync)", age_secs);
        }
        report
    }

    /// Advance the frost tracker with the last-known temperature.
    pub fn frost_tick(&mut self) {
        let Some(temp) = self.reconciler.params().current_temp_f else {
            return;
        };
        let now = Utc::now();
        match self.frost.tick(temp, now) {
            Ok(FrostEvent::CriticalExposure) => self.journal.record(
                now,
                JournalEvent::FrostAlert {
                    hours: self.frost.hours(),
                    temperature_f: temp,
                },
            ),
            Ok(FrostEvent::Reset) => self.journal.record(
                now,
                JournalEvent::FrostReset {
                    reason: ResetReason::Warmed,
                    temperature_f: Some(temp),
                },
            ),
            Ok(_) => {}
            Err(e) => warn!("Failed to persist frost tracker: {}", e),
        }
        self.reconciler.set_frost_hours(self.frost.hours());
    }

    /// Re-evaluate; logs and caches a snapshot only when the result changes.
    pub fn recompute(&mut self) -> Option<SignalResult> {
        let now = Utc::now();
        let Some(input) = self.reconciler.input(now) else {
            if !self.reported_unavailable {
                warn!("Signal unavailable: no live temperature has been obtained yet");
                self.reported_unavailable = true;
            }
            return None;
        };

        let result = self.evaluator.evaluate(&input);
        if self.last_result.as_ref() == Some(&result) {
            return Some(result);
        }

        info!(
            "SIGNAL: {} p={:.2} ({})",
            result.recommended_action, result.win_probability, result.insight.headline
        );
        self.journal.record(
            now,
            JournalEvent::Evaluation {
                input,
                result: result.clone(),
            },
        );

        let snapshot = Snapshot {
            generated_at: now,
            location: self.config.location.name.clone(),
            symbol: self.config.market.symbol.clone(),
            input,
            result: result.clone(),
            last_sync: self.reconciler.status().last_sync,
            stale: matches!(self.freshness(), Freshness::Stale { .. }),
            critical_temp_f: self.frost.tracker().thresholds().critical_temp_f,
            rsi_period: self.config.market.rsi_period,
        };
        if let Err(e) = self.store.set(LAST_SNAPSHOT_KEY, &snapshot) {
            warn!("Failed to cache snapshot: {}", e);
        }

        self.last_result = Some(result.clone());
        Some(result)
    }

    pub fn freshness(&self) -> Freshness {
        let stale_after = chrono::Duration::seconds(self.config.timing.stale_after_secs as i64);
        self.reconciler.status().freshness(Utc::now(), stale_after)
    }

    /// Human-readable status block for one-shot commands.
    pub fn status_report(&self) -> String {
        let params = self.reconciler.params();
        let status = self.reconciler.status();
        let mut lines = Vec::new();

        match self.freshness() {
            Freshness::Unavailable => lines.push("Live data: unavailable".to_string()),
            Freshness::Fresh => lines.push("Live data: fresh".to_string()),
            Freshness::Stale { age_secs } => {
                lines.push(format!("Live data: STALE ({} min old)", age_secs / 60))
            }
        }
        match (&status.weather, params.current_temp_f) {
            (Some(w), _) => lines.push(format!(
                "Weather: {:.1}°F {} humidity={:.0}% wind={:.1}mph freezing={} frost_warning={}",
                w.temperature_f,
                w.condition.label(),
                w.humidity_pct,
                w.wind_mph,
                w.is_freezing,
                w.frost_warning
            )),
            (None, Some(t)) => lines.push(format!("Weather: {:.1}°F", t)),
            (None, None) => lines.push("Weather: unavailable".to_string()),
        }
        lines.push(format!("RSI: {:.0}", params.rsi_value));
        lines.push(format!(
            "Frost exposure: {:.2}h (tracking={})",
            self.frost.hours(),
            self.frost.tracker().is_tracking()
        ));
        for err in &status.errors {
            lines.push(format!("Error: {}", err));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use common::{Error, PriceHistory, WeatherCondition, WeatherReading};
    use tokio::sync::oneshot;

    /// Fires the shutdown signal from inside the weather leg, then keeps the
    /// sync busy a little longer.
    struct InterruptedWeather {
        stop: Mutex<Option<oneshot::Sender<()>>>,
    }

    impl WeatherSource for InterruptedWeather {
        async fn current_conditions(&self) -> common::Result<WeatherReading> {
            if let Some(tx) = self.stop.lock().unwrap().take() {
                let _ = tx.send(());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(WeatherReading {
                temperature_f: 40.0,
                humidity_pct: 70.0,
                wind_mph: 4.0,
                weather_code: 0,
                condition: WeatherCondition::Clear,
                is_freezing: false,
                frost_warning: false,
                fetched_at: Utc::now(),
            })
        }
    }

    struct NoPrices;

    impl PriceHistorySource for NoPrices {
        async fn daily_closes(&self) -> common::Result<PriceHistory> {
            Err(Error::PriceHistory("offline".into()))
        }
    }

    fn journal_kinds(dir: &Path) -> Vec<String> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
            .iter()
            .flat_map(|f| {
                std::fs::read_to_string(f)
                    .unwrap()
                    .lines()
                    .map(|l| {
                        let v: serde_json::Value = serde_json::from_str(l).unwrap();
                        v["kind"].as_str().unwrap().to_string()
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_shutdown_during_sync_stops_loop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.state_dir = temp_dir.path().to_string_lossy().into_owned();

        let (tx, rx) = oneshot::channel();
        let weather = InterruptedWeather {
            stop: Mutex::new(Some(tx)),
        };
        let mut app =
            App::with_sources(config, MarketRules::default(), weather, NoPrices).unwrap();

        tokio::time::timeout(Duration::from_secs(5), app.run_until(rx))
            .await
            .expect("loop should stop after a shutdown sent mid-sync")
            .unwrap();

        // The in-flight sync still completed before the loop exited.
        assert_eq!(app.reconciler.params().current_temp_f, Some(40.0));

        let kinds = journal_kinds(app.journal.dir());
        assert_eq!(kinds.first().map(String::as_str), Some("start"));
        assert_eq!(kinds.last().map(String::as_str), Some("stop"));
        assert!(kinds.iter().any(|k| k == "sync"));
        assert!(kinds.iter().any(|k| k == "evaluation"));
    }
}
