//! Max pain calculation
//!
//! For a candidate settlement strike `S`, the aggregate payout owed to option
//! buyers is
//!
//! ```text
//! calls: Σ (S - K) * OI   for call strikes K < S
//! puts:  Σ (K - S) * OI   for put strikes  K > S
//! ```
//!
//! Max pain is the candidate that minimizes this sum. Candidates are the
//! strikes of the combined call + put index, visited in ascending order.

use super::combined_open_interest;
use crate::types::{ChainSnapshot, MaxPain, OptionRow};

/// Compute the max pain strike for a chain.
///
/// Ties keep the lowest strike because the comparison is strict. A chain with
/// no strikes yields [`MaxPain::EMPTY`] instead of an error.
pub fn compute_max_pain(snapshot: &ChainSnapshot) -> MaxPain {
    let mut best = MaxPain::EMPTY;

    for strike in combined_open_interest(snapshot).keys() {
        let total_value = total_payout(snapshot, strike.into_inner());
        if total_value < best.total_value {
            best = MaxPain {
                strike: strike.into_inner(),
                total_value,
            };
        }
    }

    best
}

/// Aggregate call + put payout if the underlying settles at `settle`
pub fn total_payout(snapshot: &ChainSnapshot, settle: f64) -> f64 {
    call_payout(&snapshot.calls, settle) + put_payout(&snapshot.puts, settle)
}

fn call_payout(calls: &[OptionRow], settle: f64) -> f64 {
    calls
        .iter()
        .filter(|row| row.strike < settle)
        .map(|row| (settle - row.strike) * row.open_interest as f64)
        .sum()
}

fn put_payout(puts: &[OptionRow], settle: f64) -> f64 {
    puts.iter()
        .filter(|row| row.strike > settle)
        .map(|row| (row.strike - settle) * row.open_interest as f64)
        .sum()
}
