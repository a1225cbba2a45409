//! Market signal decision engine.
//!
//! RSI, the rule-driven signal evaluator, the frost exposure tracker, the
//! live-data reconciler, persistence and the trade blueprint memo.

pub mod blueprint;
pub mod evaluator;
pub mod frost;
pub mod reconcile;
pub mod rsi;
pub mod store;

pub use blueprint::{render_blueprint, Snapshot};
pub use evaluator::SignalEvaluator;
pub use frost::{FrostEvent, FrostMonitor, FrostThresholds, FrostTracker, FrostTrackerState};
pub use reconcile::{fetch_live, Freshness, LiveFetch, Reconciler, SignalParams, SyncReport};
pub use rsi::{compute_rsi, DEFAULT_RSI_PERIOD, NEUTRAL_RSI};
pub use store::{FileStore, MemoryStore, StateStore};
