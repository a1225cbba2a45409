//! Signal evaluator.
//!
//! Turns a `SignalInput` into a win probability, a recommended action and an
//! auditable `Insight`. Overrides are checked in a fixed priority order and
//! each one fully replaces everything after it:
//!
//! 1. Brazil drought
//! 2. RSI take-profit
//! 3. Hurricane false alarm
//! 4. Baseline frost regime × inventory multiplier (× La Niña amplifier)
//!
//! Evaluation is pure: no I/O, no hidden state.

use common::rules::InventoryBand;
use common::{
    FrostRegime, Insight, MarketRules, RecommendedAction, SignalFlags, SignalInput, SignalResult,
    SignalRule,
};

use crate::rsi::RSI_OVERBOUGHT;

/// Months (inclusive) of the Brazilian rainy-season window.
const BRAZIL_WINDOW_MONTHS: [u32; 3] = [8, 9, 10];
/// SPI-3 below this is treated as drought.
const BRAZIL_DROUGHT_SPI: f64 = -1.5;
/// Take-profit only once cold stress has clearly passed.
const TAKE_PROFIT_MIN_TEMP_F: f64 = 35.0;
/// Baseline rate when no frost regime applies.
const NEUTRAL_BASE_RATE: f64 = 0.5;
/// Never present a near-certain signal.
pub const MAX_WIN_PROBABILITY: f64 = 0.95;

/// Rule-table driven evaluator.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    rules: MarketRules,
}

impl SignalEvaluator {
    pub fn new(rules: MarketRules) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, input: &SignalInput) -> SignalResult {
        let ctx = &input.market_context;
        let flags = SignalFlags {
            is_hurricane_false_alarm: ctx.is_hurricane_active
                && ctx.hurricane_center_far_from_polk,
            is_la_nina_active: ctx.is_la_nina,
            is_brazil_drought: BRAZIL_WINDOW_MONTHS.contains(&ctx.current_month)
                && ctx.brazil_rainfall_index < BRAZIL_DROUGHT_SPI,
            is_rsi_overbought: input.rsi_value > RSI_OVERBOUGHT,
        };
        let rates = &self.rules.win_rates;

        // 1. Brazil drought.
        if flags.is_brazil_drought {
            return override_result(
                SignalRule::BrazilDrought,
                rates.brazil_drought,
                RecommendedAction::StrongLongBrazilDrought,
                "Brazil drought override",
                vec![
                    format!(
                        "month {} is inside the Brazil rainy-season window (Aug-Oct)",
                        ctx.current_month
                    ),
                    format!(
                        "SPI-3 {:.2} < {:.1} drought threshold",
                        ctx.brazil_rainfall_index, BRAZIL_DROUGHT_SPI
                    ),
                    format!("brazil_drought base rate {:.2}", rates.brazil_drought),
                ],
                flags,
            );
        }

        // 2. RSI take-profit.
        if flags.is_rsi_overbought && input.current_temp_f > TAKE_PROFIT_MIN_TEMP_F {
            return override_result(
                SignalRule::RsiTakeProfit,
                rates.rsi_take_profit,
                RecommendedAction::TakeProfitSell,
                "RSI take-profit override",
                vec![
                    format!("RSI {:.0} > {:.0} (overbought)", input.rsi_value, RSI_OVERBOUGHT),
                    format!(
                        "temperature {:.1}°F > {:.0}°F, cold stress resolved",
                        input.current_temp_f, TAKE_PROFIT_MIN_TEMP_F
                    ),
                    format!("rsi_take_profit base rate {:.2}", rates.rsi_take_profit),
                ],
                flags,
            );
        }

        // 3. Hurricane false alarm.
        if flags.is_hurricane_false_alarm {
            return override_result(
                SignalRule::HurricaneFalseAlarm,
                rates.hurricane_false_alarm,
                RecommendedAction::SellShortFalseAlarm,
                "Hurricane false-alarm override",
                vec![
                    "hurricane active but center >100 mi from Polk County".to_string(),
                    format!(
                        "hurricane_false_alarm base rate {:.2}",
                        rates.hurricane_false_alarm
                    ),
                ],
                flags,
            );
        }

        // 4. Baseline.
        self.evaluate_baseline(input, flags)
    }

    fn evaluate_baseline(&self, input: &SignalInput, flags: SignalFlags) -> SignalResult {
        let frost = &self.rules.frost_rule;
        let below_critical = input.current_temp_f < frost.critical_temp_f;
        let sustained = input.hours_below_28 >= frost.min_duration_hours;

        let mut evidence = Vec::new();

        let (regime, base_rate) = if below_critical && sustained {
            evidence.push(format!(
                "real frost: {:.1}°F < {:.0}°F for {:.1}h (>= {:.0}h)",
                input.current_temp_f,
                frost.critical_temp_f,
                input.hours_below_28,
                frost.min_duration_hours
            ));
            (FrostRegime::RealFrost, self.rules.win_rates.real_frost)
        } else if below_critical {
            evidence.push(format!(
                "pre-frost volatility: {:.1}°F < {:.0}°F for only {:.1}h",
                input.current_temp_f, frost.critical_temp_f, input.hours_below_28
            ));
            (
                FrostRegime::PreFrostVolatility,
                self.rules.win_rates.pre_frost_volatility,
            )
        } else {
            evidence.push(format!(
                "no frost regime: {:.1}°F >= {:.0}°F",
                input.current_temp_f, frost.critical_temp_f
            ));
            (FrostRegime::None, NEUTRAL_BASE_RATE)
        };
        evidence.push(format!("base rate {:.2}", base_rate));

        let band = self.rules.inventory_band(input.current_inventory);
        let multiplier = self.rules.inventory_multiplier(band);
        evidence.push(format!(
            "inventory {:.1}M in band {} → multiplier {:.2}",
            input.current_inventory,
            band.label(),
            multiplier
        ));

        let mut raw = base_rate * multiplier;

        let la_nina_factor = if flags.is_la_nina_active {
            let factor = self.rules.amplifiers.la_nina;
            raw *= factor;
            evidence.push(format!("La Niña amplifier ×{:.2}", factor));
            Some(factor)
        } else {
            None
        };

        let capped = raw > MAX_WIN_PROBABILITY;
        if capped {
            evidence.push(format!(
                "raw probability {:.3} capped at {:.2}",
                raw, MAX_WIN_PROBABILITY
            ));
        }
        let win_probability = round2(raw.min(MAX_WIN_PROBABILITY));

        let action = baseline_action(band, below_critical, sustained);
        evidence.push(format!("action {} from inventory/frost state", action));

        SignalResult {
            win_probability,
            recommended_action: action,
            insight: Insight {
                rule: SignalRule::Baseline,
                headline: format!("Baseline frost/inventory evaluation ({})", regime_label(regime)),
                base_rate,
                frost_regime: Some(regime),
                inventory_band: Some(band),
                inventory_multiplier: Some(multiplier),
                la_nina_factor,
                capped,
                evidence,
            },
            flags,
        }
    }
}

/// Inventory rules first, then frost rules; first match wins.
fn baseline_action(band: InventoryBand, below_critical: bool, sustained: bool) -> RecommendedAction {
    match band {
        InventoryBand::Critical => RecommendedAction::DoublePosition,
        InventoryBand::Low if below_critical => RecommendedAction::IncreasePosition,
        InventoryBand::Glut => RecommendedAction::ReducePosition,
        _ if below_critical && sustained => RecommendedAction::HoldPosition,
        _ => RecommendedAction::Monitor,
    }
}

fn override_result(
    rule: SignalRule,
    base_rate: f64,
    action: RecommendedAction,
    headline: &str,
    evidence: Vec<String>,
    flags: SignalFlags,
) -> SignalResult {
    SignalResult {
        win_probability: round2(base_rate.min(MAX_WIN_PROBABILITY)),
        recommended_action: action,
        insight: Insight {
            rule,
            headline: headline.to_string(),
            base_rate,
            frost_regime: None,
            inventory_band: None,
            inventory_multiplier: None,
            la_nina_factor: None,
            capped: false,
            evidence,
        },
        flags,
    }
}

fn regime_label(regime: FrostRegime) -> &'static str {
    match regime {
        FrostRegime::None => "no frost",
        FrostRegime::PreFrostVolatility => "pre-frost volatility",
        FrostRegime::RealFrost => "real frost",
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
