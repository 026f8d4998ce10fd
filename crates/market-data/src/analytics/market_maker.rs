//! Market-maker bias simulation
//!
//! Intraday traded volume per strike is not available from the provider, so
//! it is approximated as `open_interest * uniform(min, max)` independently for
//! each side of each strike in focus. Running the simulation twice on the same
//! chain can therefore give different predictions. Pass a seeded RNG for
//! reproducible output.

use rand::Rng;
use std::collections::BTreeSet;

use super::AnalyticsParams;
use crate::types::{ChainSnapshot, MarketMakerAssessment, OptionType, Prediction};

/// Simulate near-close volume around spot and the wall strikes and infer the
/// market maker's likely lean.
///
/// Heavy call volume means the market maker is presumed short calls and
/// motivated to push price down (bearish); heavy put volume is the mirror
/// case. Anything within `bias_ratio` of balance is neutral.
pub fn simulate_market_maker_bias<R: Rng + ?Sized>(
    spot: f64,
    snapshot: &ChainSnapshot,
    wall_strikes: &[f64],
    params: &AnalyticsParams,
    rng: &mut R,
) -> MarketMakerAssessment {
    let strikes_in_focus = focus_strikes(spot, snapshot, wall_strikes);

    let mut call_volume = 0.0_f64;
    let mut put_volume = 0.0_f64;

    for &strike in &strikes_in_focus {
        let strike = strike as f64;
        if let Some(oi) = snapshot.open_interest_at(OptionType::Call, strike) {
            call_volume += oi as f64 * draw_fraction(params, rng);
        }
        if let Some(oi) = snapshot.open_interest_at(OptionType::Put, strike) {
            put_volume += oi as f64 * draw_fraction(params, rng);
        }
    }

    let simulated_call_volume = call_volume as u64;
    let simulated_put_volume = put_volume as u64;

    let (prediction, rationale) = if call_volume > put_volume * params.bias_ratio {
        (
            Prediction::Bearish,
            format!(
                "Simulated CALL volume (~{}) clearly exceeds PUT volume (~{}). \
                 The market maker may try to push price down.",
                simulated_call_volume, simulated_put_volume
            ),
        )
    } else if put_volume > call_volume * params.bias_ratio {
        (
            Prediction::Bullish,
            format!(
                "Simulated PUT volume (~{}) clearly exceeds CALL volume (~{}). \
                 The market maker may try to push price up.",
                simulated_put_volume, simulated_call_volume
            ),
        )
    } else {
        (
            Prediction::Neutral,
            "CALL and PUT volumes are roughly balanced.".to_string(),
        )
    };

    MarketMakerAssessment {
        prediction,
        rationale,
        strikes_in_focus,
        simulated_call_volume,
        simulated_put_volume,
    }
}

/// Spot and wall strikes rounded to integers, kept only when listed on either
/// side of the chain, ascending.
///
/// Rounding is half-to-even, so 100.5 focuses on 100.
pub fn focus_strikes(spot: f64, snapshot: &ChainSnapshot, wall_strikes: &[f64]) -> Vec<i64> {
    let candidates: BTreeSet<i64> = std::iter::once(spot)
        .chain(wall_strikes.iter().copied())
        .filter(|s| s.is_finite())
        .map(|s| s.round_ties_even() as i64)
        .collect();

    candidates
        .into_iter()
        .filter(|&s| {
            let strike = s as f64;
            snapshot.open_interest_at(OptionType::Call, strike).is_some()
                || snapshot.open_interest_at(OptionType::Put, strike).is_some()
        })
        .collect()
}

fn draw_fraction<R: Rng + ?Sized>(params: &AnalyticsParams, rng: &mut R) -> f64 {
    if params.volume_fraction_min < params.volume_fraction_max {
        rng.random_range(params.volume_fraction_min..params.volume_fraction_max)
    } else {
        params.volume_fraction_min
    }
}
