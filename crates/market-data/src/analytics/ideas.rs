//! Trade idea generation from max pain and wall proximity

use super::AnalyticsParams;
use crate::types::{Direction, TradeIdea};

pub const MAX_PAIN_MAGNET: &str = "Max Pain magnet";
pub const RESISTANCE_WALL: &str = "Resistance wall";
pub const SUPPORT_WALL: &str = "Support wall";

/// Derive trade ideas from spot, max pain and the ranked wall strikes.
///
/// The max pain idea (if any) comes first, followed by one idea per wall that
/// sits within the proximity band, in the order the walls were supplied.
/// Returns nothing when spot or max pain is zero.
pub fn generate_trade_ideas(
    spot: f64,
    max_pain: f64,
    wall_strikes: &[f64],
    params: &AnalyticsParams,
) -> Vec<TradeIdea> {
    let mut ideas = Vec::new();
    if spot <= 0.0 || max_pain == 0.0 {
        return ideas;
    }

    let deviation = distance_pct(spot, max_pain);
    if deviation > params.max_pain_deviation_pct {
        if spot > max_pain {
            ideas.push(TradeIdea {
                direction: Direction::Bearish,
                strategy: MAX_PAIN_MAGNET.to_string(),
                rationale: format!(
                    "Spot (${:.2}) is {:.2}% above max pain (${:.2}).",
                    spot, deviation, max_pain
                ),
                action: format!("Consider PUTS with a strike near ${:.2}.", max_pain),
            });
        } else {
            ideas.push(TradeIdea {
                direction: Direction::Bullish,
                strategy: MAX_PAIN_MAGNET.to_string(),
                rationale: format!(
                    "Spot (${:.2}) is {:.2}% below max pain (${:.2}).",
                    spot, deviation, max_pain
                ),
                action: format!("Consider CALLS with a strike near ${:.2}.", max_pain),
            });
        }
    }

    for &strike in wall_strikes {
        if distance_pct(spot, strike) >= params.wall_proximity_pct {
            continue;
        }

        if spot < strike {
            ideas.push(TradeIdea {
                direction: Direction::Bearish,
                strategy: RESISTANCE_WALL.to_string(),
                rationale: format!(
                    "Spot (${:.2}) is approaching a large OI wall at ${:.2} from below.",
                    spot, strike
                ),
                action: "This level may act as resistance. Consider PUTS if price is rejected."
                    .to_string(),
            });
        } else if spot > strike {
            ideas.push(TradeIdea {
                direction: Direction::Bullish,
                strategy: SUPPORT_WALL.to_string(),
                rationale: format!(
                    "Spot (${:.2}) is approaching a large OI wall at ${:.2} from above.",
                    spot, strike
                ),
                action: "This level may act as support. Consider CALLS if price bounces."
                    .to_string(),
            });
        }
    }

    ideas
}

/// Absolute distance between `spot` and `level`, as a percent of spot
fn distance_pct(spot: f64, level: f64) -> f64 {
    (spot - level).abs() / spot * 100.0
}
