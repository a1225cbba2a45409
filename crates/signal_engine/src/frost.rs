//! Frost exposure tracker.
//!
//! Counts continuous seconds at or below the critical temperature. State is
//! persisted after every change so wall-clock time spent offline is added
//! back on the next start.
//!
//! ```text
//!            temp <= critical
//!   Idle ─────────────────────────▶ Tracking ──┐ tick: += now - last
//!    ▲                                 │  ◀────┘
//!    └──── temp > reset / manual ──────┘
//! ```
//!
//! Temperatures between the critical and reset thresholds keep an active
//! episode running. The critical-exposure alert fires once per episode.

use chrono::{DateTime, Duration, Utc};
use common::Error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{StateStore, FROST_TRACKER_KEY};

/// Persisted tracker state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrostTrackerState {
    pub accumulated_seconds: u64,
    /// Meaningful whenever `is_tracking` is true.
    pub last_update_time: Option<DateTime<Utc>>,
    pub is_tracking: bool,
    #[serde(default)]
    pub alert_shown: bool,
}

impl FrostTrackerState {
    pub fn hours(&self) -> f64 {
        self.accumulated_seconds as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrostThresholds {
    /// At or below this the tracker starts (°F).
    pub critical_temp_f: f64,
    /// Above this an active episode ends (°F).
    pub reset_temp_f: f64,
    /// Exposure that triggers the critical alert.
    pub alert_after_hours: f64,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrostEvent {
    Idle,
    Started,
    Tracking,
    /// Crossed the alert threshold on this tick; tracking continues.
    CriticalExposure,
    Reset,
}

/// The state machine itself, free of I/O.
#[derive(Debug, Clone)]
pub struct FrostTracker {
    state: FrostTrackerState,
    thresholds: FrostThresholds,
}

impl FrostTracker {
    pub fn new(thresholds: FrostThresholds) -> Self {
        Self {
            state: FrostTrackerState::default(),
            thresholds,
        }
    }

    /// Rebuild from persisted state. An episode that was active when the
    /// process stopped is credited with the offline time immediately.
    pub fn restore(state: FrostTrackerState, thresholds: FrostThresholds, now: DateTime<Utc>) -> Self {
        let mut tracker = Self { state, thresholds };
        if tracker.state.is_tracking {
            match tracker.state.last_update_time {
                Some(_) => {
                    let offline = tracker.accumulate(now);
                    info!(
                        "Frost tracker resumed: +{}s offline, total {:.2}h",
                        offline,
                        tracker.state.hours()
                    );
                }
                None => {
                    warn!("Frost tracker was tracking without a timestamp; restarting clock");
                    tracker.state.last_update_time = Some(now);
                }
            }
        }
        tracker
    }

    pub fn state(&self) -> &FrostTrackerState {
        &self.state
    }

    pub fn thresholds(&self) -> &FrostThresholds {
        &self.thresholds
    }

    pub fn hours(&self) -> f64 {
        self.state.hours()
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking
    }

    /// Advance the clock with the latest temperature reading.
    pub fn tick(&mut self, temp_f: f64, now: DateTime<Utc>) -> FrostEvent {
        if self.state.is_tracking {
            if temp_f > self.thresholds.reset_temp_f {
                self.clear();
                return FrostEvent::Reset;
            }
            self.accumulate(now);
            return self.check_alert().unwrap_or(FrostEvent::Tracking);
        }

        if temp_f <= self.thresholds.critical_temp_f {
            self.state.is_tracking = true;
            self.state.last_update_time = Some(now);
            return self.check_alert().unwrap_or(FrostEvent::Started);
        }

        FrostEvent::Idle
    }

    /// Operator reset: back to Idle with nothing accumulated.
    pub fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.state = FrostTrackerState::default();
    }

    /// Credits whole elapsed seconds. The clock only advances by what was
    /// credited, so sub-second remainders carry into the next tick.
    fn accumulate(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(last) = self.state.last_update_time else {
            self.state.last_update_time = Some(now);
            return 0;
        };
        if now < last {
            warn!(
                "Clock moved backwards by {}ms; re-anchoring frost clock",
                (last - now).num_milliseconds()
            );
            self.state.last_update_time = Some(now);
            return 0;
        }
        let elapsed = (now - last).num_seconds();
        self.state.accumulated_seconds =
            self.state.accumulated_seconds.saturating_add(elapsed as u64);
        self.state.last_update_time = Some(last + Duration::seconds(elapsed));
        elapsed as u64
    }

    fn check_alert(&mut self) -> Option<FrostEvent> {
        if !self.state.alert_shown && self.state.hours() >= self.thresholds.alert_after_hours {
            self.state.alert_shown = true;
            return Some(FrostEvent::CriticalExposure);
        }
        None
    }
}

/// Tracker bound to a store; persists after every state change.
pub struct FrostMonitor<S: StateStore> {
    tracker: FrostTracker,
    store: S,
}

impl<S: StateStore> FrostMonitor<S> {
    pub fn load(store: S, thresholds: FrostThresholds, now: DateTime<Utc>) -> Result<Self, Error> {
        let state: FrostTrackerState = store.get(FROST_TRACKER_KEY)?.unwrap_or_default();
        let tracker = FrostTracker::restore(state, thresholds, now);
        let monitor = Self { tracker, store };
        if monitor.tracker.is_tracking() {
            monitor.persist()?;
        }
        Ok(monitor)
    }

    pub fn tracker(&self) -> &FrostTracker {
        &self.tracker
    }

    pub fn hours(&self) -> f64 {
        self.tracker.hours()
    }

    pub fn tick(&mut self, temp_f: f64, now: DateTime<Utc>) -> Result<FrostEvent, Error> {
        let event = self.tracker.tick(temp_f, now);
        match event {
            FrostEvent::Idle => {}
            FrostEvent::Started => info!("Frost tracking started at {:.1}°F", temp_f),
            FrostEvent::Reset => info!("Frost tracking reset: {:.1}°F above reset threshold", temp_f),
            FrostEvent::CriticalExposure => warn!(
                "CRITICAL FROST EXPOSURE: {:.2}h at or below {:.0}°F",
                self.tracker.hours(),
                self.tracker.thresholds().critical_temp_f
            ),
            FrostEvent::Tracking => {}
        }
        if event != FrostEvent::Idle {
            self.persist()?;
        }
        Ok(event)
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        info!(
            "Frost tracker manually reset after {:.2}h",
            self.tracker.hours()
        );
        self.tracker.reset();
        self.persist()
    }

    fn persist(&self) -> Result<(), Error> {
        self.store.set(FROST_TRACKER_KEY, self.tracker.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn thresholds() -> FrostThresholds {
        FrostThresholds {
            critical_temp_f: 28.0,
            reset_temp_f: 32.0,
            alert_after_hours: 4.0,
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-14T02:00:00Z")
            .expect("valid t0")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_alert_fires_once_at_four_hours() {
        let mut tracker = FrostTracker::new(thresholds());
        assert_eq!(tracker.tick(20.0, t0()), FrostEvent::Started);

        let mut alerts = Vec::new();
        for s in 1..=14_400 + 600 {
            let event = tracker.tick(20.0, t0() + Duration::seconds(s));
            if event == FrostEvent::CriticalExposure {
                alerts.push(s);
            }
        }

        assert_eq!(alerts, vec![14_400]);
        assert_eq!(tracker.state().accumulated_seconds, 15_000);
        assert!(tracker.state().alert_shown);
    }

    #[test]
    fn test_jittered_ticks_keep_wall_clock_time() {
        let mut tracker = FrostTracker::new(thresholds());
        tracker.tick(20.0, t0());

        let mut alerts = Vec::new();
        for k in 1..=14_400i64 {
            // Interval wakeups land a millisecond or two late.
            let jitter = Duration::milliseconds(1 + k % 2);
            let event = tracker.tick(20.0, t0() + Duration::seconds(k) + jitter);
            if event == FrostEvent::CriticalExposure {
                alerts.push(k);
            }
        }

        assert_eq!(tracker.state().accumulated_seconds, 14_400);
        assert_eq!(alerts, vec![14_400]);
    }

    #[test]
    fn test_subsecond_gaps_carry_over() {
        let mut tracker = FrostTracker::new(thresholds());
        tracker.tick(20.0, t0());
        tracker.tick(20.0, t0() + Duration::milliseconds(999));
        assert_eq!(tracker.state().accumulated_seconds, 0);
        tracker.tick(20.0, t0() + Duration::milliseconds(1_998));
        assert_eq!(tracker.state().accumulated_seconds, 1);
        assert_eq!(
            tracker.state().last_update_time,
            Some(t0() + Duration::seconds(1))
        );
    }

    #[test]
    fn test_alert_rearms_after_reset() {
        let mut tracker = FrostTracker::new(thresholds());
        tracker.tick(20.0, t0());
        assert_eq!(
            tracker.tick(20.0, t0() + Duration::hours(4)),
            FrostEvent::CriticalExposure
        );
        assert_eq!(
            tracker.tick(33.0, t0() + Duration::hours(4) + Duration::seconds(1)),
            FrostEvent::Reset
        );
        assert_eq!(tracker.state(), &FrostTrackerState::default());

        let restart = t0() + Duration::hours(5);
        tracker.tick(25.0, restart);
        assert_eq!(
            tracker.tick(25.0, restart + Duration::hours(4)),
            FrostEvent::CriticalExposure
        );
    }

    #[test]
    fn test_hysteresis_band_keeps_episode() {
        let mut tracker = FrostTracker::new(thresholds());
        tracker.tick(27.0, t0());
        // Warming blip to 30°F does not end the episode.
        assert_eq!(
            tracker.tick(30.0, t0() + Duration::seconds(60)),
            FrostEvent::Tracking
        );
        assert_eq!(
            tracker.tick(32.0, t0() + Duration::seconds(120)),
            FrostEvent::Tracking
        );
        assert_eq!(tracker.state().accumulated_seconds, 120);
        assert!(tracker.is_tracking());
    }

    #[test]
    fn test_band_does_not_start_episode() {
        let mut tracker = FrostTracker::new(thresholds());
        assert_eq!(tracker.tick(30.0, t0()), FrostEvent::Idle);
        assert_eq!(tracker.tick(28.0, t0()), FrostEvent::Started);
    }

    #[test]
    fn test_restore_credits_offline_time() {
        let now = t0() + Duration::hours(2);
        let state = FrostTrackerState {
            accumulated_seconds: 1_000,
            last_update_time: Some(now - Duration::seconds(600)),
            is_tracking: true,
            alert_shown: false,
        };

        let tracker = FrostTracker::restore(state, thresholds(), now);
        assert_eq!(tracker.state().accumulated_seconds, 1_600);
        assert_eq!(tracker.state().last_update_time, Some(now));
    }

    #[test]
    fn test_restore_idle_is_frozen() {
        let state = FrostTrackerState {
            accumulated_seconds: 500,
            last_update_time: Some(t0()),
            is_tracking: false,
            alert_shown: false,
        };
        let tracker = FrostTracker::restore(state.clone(), thresholds(), t0() + Duration::hours(1));
        assert_eq!(tracker.state(), &state);
    }

    #[test]
    fn test_manual_reset_regardless_of_temperature() {
        let mut tracker = FrostTracker::new(thresholds());
        tracker.tick(20.0, t0());
        tracker.tick(20.0, t0() + Duration::hours(5));
        assert!(tracker.state().alert_shown);

        tracker.reset();
        assert!(!tracker.is_tracking());
        assert_eq!(tracker.state().accumulated_seconds, 0);
        assert!(!tracker.state().alert_shown);
    }

    #[test]
    fn test_monitor_persists_and_reloads() {
        let store = MemoryStore::new();
        let mut monitor = FrostMonitor::load(store.clone(), thresholds(), t0()).unwrap();
        monitor.tick(22.0, t0()).unwrap();
        monitor.tick(22.0, t0() + Duration::seconds(30)).unwrap();

        let saved: FrostTrackerState = store.get(FROST_TRACKER_KEY).unwrap().unwrap();
        assert_eq!(saved.accumulated_seconds, 30);
        assert!(saved.is_tracking);

        // Process restarts 600 seconds later.
        let later = t0() + Duration::seconds(630);
        let reloaded = FrostMonitor::load(store.clone(), thresholds(), later).unwrap();
        assert_eq!(reloaded.tracker().state().accumulated_seconds, 630);

        let saved: FrostTrackerState = store.get(FROST_TRACKER_KEY).unwrap().unwrap();
        assert_eq!(saved.last_update_time, Some(later));
    }

    #[test]
    fn test_monitor_reset_persists() {
        let store = MemoryStore::new();
        let mut monitor = FrostMonitor::load(store.clone(), thresholds(), t0()).unwrap();
        monitor.tick(20.0, t0()).unwrap();
        monitor.tick(20.0, t0() + Duration::hours(1)).unwrap();
        monitor.reset().unwrap();

        let saved: FrostTrackerState = store.get(FROST_TRACKER_KEY).unwrap().unwrap();
        assert_eq!(saved, FrostTrackerState::default());
    }
}
