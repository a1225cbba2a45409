//! Trade blueprint memo.
//!
//! Renders a cached evaluation snapshot as a plain-text memo for the desk.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use common::{SignalInput, SignalResult};
use serde::{Deserialize, Serialize};

/// Evaluation snapshot cached for display; never authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub location: String,
    pub symbol: String,
    pub input: SignalInput,
    pub result: SignalResult,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stale: bool,
    /// Frost threshold the exposure hours were counted against (°F).
    #[serde(default = "default_critical_temp")]
    pub critical_temp_f: f64,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
}

fn default_critical_temp() -> f64 {
    28.0
}

fn default_rsi_period() -> usize {
    crate::rsi::DEFAULT_RSI_PERIOD
}

pub fn render_blueprint(snapshot: &Snapshot) -> String {
    let input = &snapshot.input;
    let ctx = &input.market_context;
    let result = &snapshot.result;
    let mut out = String::new();

    let _ = writeln!(out, "TRADE BLUEPRINT: {} ({})", snapshot.symbol, snapshot.location);
    let _ = writeln!(
        out,
        "Generated: {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    out.push('\n');

    out.push_str("MARKET CONDITIONS\n");
    let _ = writeln!(out, "  Temperature:       {:.1}°F", input.current_temp_f);
    let _ = writeln!(
        out,
        "  {:<19}{:.1}",
        format!("Hours <= {:.0}°F:", snapshot.critical_temp_f),
        input.hours_below_28
    );
    let _ = writeln!(out, "  Inventory:         {:.1}M gal", input.current_inventory);
    let _ = writeln!(
        out,
        "  {:<19}{:.0}",
        format!("RSI ({}):", snapshot.rsi_period),
        input.rsi_value
    );
    let _ = writeln!(out, "  La Niña:           {}", yes_no(ctx.is_la_nina));
    let _ = writeln!(
        out,
        "  Hurricane:         {}{}",
        yes_no(ctx.is_hurricane_active),
        if ctx.is_hurricane_active && ctx.hurricane_center_far_from_polk {
            " (center >100 mi from Polk)"
        } else {
            ""
        }
    );
    let _ = writeln!(
        out,
        "  Brazil SPI-3:      {:.2} (month {})",
        ctx.brazil_rainfall_index, ctx.current_month
    );
    out.push('\n');

    out.push_str("SIGNAL\n");
    let _ = writeln!(out, "  Action:            {}", result.recommended_action);
    let _ = writeln!(
        out,
        "  Win probability:   {:.0}%",
        result.win_probability * 100.0
    );
    let _ = writeln!(out, "  Rule:              {}", result.insight.headline);
    out.push('\n');

    out.push_str("RATIONALE\n");
    for line in &result.insight.evidence {
        let _ = writeln!(out, "  - {}", line);
    }
    out.push('\n');

    out.push_str("RISK NOTES\n");
    let mut notes = 0;
    if snapshot.stale {
        let since = snapshot
            .last_sync
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".into());
        let _ = writeln!(out, "  - Live data is stale (last sync {})", since);
        notes += 1;
    }
    if result.insight.capped {
        let _ = writeln!(out, "  - Probability capped at 95%; raw signal was stronger");
        notes += 1;
    }
    if notes == 0 {
        out.push_str("  - None\n");
    }
    out.push_str("\nAdvisory only. Win rates are illustrative, not validated forecasts.\n");

    out
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}
