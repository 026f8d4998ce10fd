//! Option-chain analytics
//!
//! Pure functions over a [`ChainSnapshot`]: max pain, open-interest walls,
//! trade ideas, the market-maker bias simulation and the gamma-flip
//! placeholder. Nothing here performs I/O or returns an error; degenerate
//! chains produce empty or neutral results.
//!
//! [`AnalyticsEngine`] bundles the tunable thresholds with a random source and
//! composes the individual computations into an [`AnalysisResult`].

pub mod ideas;
pub mod market_maker;
pub mod max_pain;
pub mod walls;

use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{AnalysisResult, ChainSnapshot};

pub use ideas::generate_trade_ideas;
pub use market_maker::simulate_market_maker_bias;
pub use max_pain::compute_max_pain;
pub use walls::rank_oi_walls;

/// Tunable thresholds for the analytics engine
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsParams {
    /// Number of OI walls to report
    pub top_walls: usize,
    /// Spot vs max pain distance (percent) above which a magnet idea fires
    pub max_pain_deviation_pct: f64,
    /// Spot vs wall distance (percent) below which a wall idea fires
    pub wall_proximity_pct: f64,
    /// One side's simulated volume must exceed the other's by this factor
    pub bias_ratio: f64,
    /// Lower bound of the simulated volume / OI fraction
    pub volume_fraction_min: f64,
    /// Upper bound (exclusive) of the simulated volume / OI fraction
    pub volume_fraction_max: f64,
    /// Multiplier applied to spot for the gamma-flip placeholder
    pub gamma_flip_factor: f64,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            top_walls: 5,
            max_pain_deviation_pct: 2.0,
            wall_proximity_pct: 3.0,
            bias_ratio: 1.2,
            volume_fraction_min: 0.1,
            volume_fraction_max: 0.5,
            gamma_flip_factor: 0.98,
        }
    }
}

/// Combined call + put open interest per strike, ascending by strike.
///
/// A strike listed on only one side contributes zero for the other.
pub fn combined_open_interest(snapshot: &ChainSnapshot) -> BTreeMap<OrderedFloat<f64>, u64> {
    let mut index = BTreeMap::new();
    for row in snapshot.calls.iter().chain(snapshot.puts.iter()) {
        *index.entry(OrderedFloat(row.strike)).or_insert(0) += row.open_interest;
    }
    index
}

/// Gamma-flip level estimate.
///
/// This is a fixed fraction of spot rounded to cents, not a dealer gamma
/// exposure calculation.
pub fn gamma_flip_estimate(spot: f64, factor: f64) -> f64 {
    (spot * factor * 100.0).round() / 100.0
}

/// Runs the full analysis for one chain snapshot
pub struct AnalyticsEngine {
    params: AnalyticsParams,
    rng: Mutex<StdRng>,
}

impl AnalyticsEngine {
    /// Engine with an OS-seeded random source
    pub fn new(params: AnalyticsParams) -> Self {
        Self {
            params,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Engine whose volume simulation is reproducible
    pub fn with_seed(params: AnalyticsParams, seed: u64) -> Self {
        Self {
            params,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Analyze a snapshot using the engine's own random source
    pub fn analyze(&self, snapshot: &ChainSnapshot) -> AnalysisResult {
        let mut rng = self.rng.lock();
        self.analyze_with_rng(snapshot, &mut *rng)
    }

    /// Analyze a snapshot with a caller-supplied random source
    pub fn analyze_with_rng<R: Rng + ?Sized>(
        &self,
        snapshot: &ChainSnapshot,
        rng: &mut R,
    ) -> AnalysisResult {
        let spot = snapshot.spot_price;
        let max_pain = compute_max_pain(snapshot);
        let top_walls = rank_oi_walls(snapshot, self.params.top_walls);
        let strikes = walls::wall_strikes(&top_walls);

        let trade_ideas = generate_trade_ideas(spot, max_pain.strike, &strikes, &self.params);
        let mm_strategy = simulate_market_maker_bias(spot, snapshot, &strikes, &self.params, rng);

        debug!(
            ticker = %snapshot.ticker,
            expiration = %snapshot.expiration_date,
            max_pain = max_pain.strike,
            walls = top_walls.len(),
            ideas = trade_ideas.len(),
            prediction = ?mm_strategy.prediction,
            "Chain analyzed"
        );

        AnalysisResult {
            ticker: snapshot.ticker.clone(),
            expiration: snapshot.expiration_date.clone(),
            spot_price: spot,
            max_pain: max_pain.strike,
            max_pain_value: (!max_pain.is_empty()).then_some(max_pain.total_value),
            top_walls,
            trade_ideas,
            gamma_flip: gamma_flip_estimate(spot, self.params.gamma_flip_factor),
            mm_strategy,
        }
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(AnalyticsParams::default())
    }
}
