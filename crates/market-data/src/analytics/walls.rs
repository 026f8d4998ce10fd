//! Open-interest wall ranking

use super::combined_open_interest;
use crate::types::{ChainSnapshot, OIWall};

/// Rank strikes by combined call + put open interest.
///
/// Returns at most `top_n` walls, highest OI first. The sort is stable over
/// the ascending strike index, so equal OI keeps the lower strike first.
pub fn rank_oi_walls(snapshot: &ChainSnapshot, top_n: usize) -> Vec<OIWall> {
    let mut walls: Vec<OIWall> = combined_open_interest(snapshot)
        .into_iter()
        .map(|(strike, combined_open_interest)| OIWall {
            strike: strike.into_inner(),
            combined_open_interest,
        })
        .collect();

    walls.sort_by(|a, b| b.combined_open_interest.cmp(&a.combined_open_interest));
    walls.truncate(top_n);
    walls
}

/// Strikes of ranked walls, preserving rank order
pub fn wall_strikes(walls: &[OIWall]) -> Vec<f64> {
    walls.iter().map(|w| w.strike).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OptionRow;

    fn chain(calls: &[(f64, u64)], puts: &[(f64, u64)]) -> ChainSnapshot {
        ChainSnapshot::new(
            "TEST",
            "2024-03-15",
            100.0,
            calls.iter().map(|&(k, oi)| OptionRow::new(k, oi)).collect(),
            puts.iter().map(|&(k, oi)| OptionRow::new(k, oi)).collect(),
        )
    }

    #[test]
    fn test_missing_side_counts_as_zero() {
        let snapshot = chain(&[(100.0, 40), (105.0, 10)], &[(95.0, 30), (100.0, 5)]);
        let walls = rank_oi_walls(&snapshot, 5);

        assert_eq!(
            walls,
            vec![
                OIWall { strike: 100.0, combined_open_interest: 45 },
                OIWall { strike: 95.0, combined_open_interest: 30 },
                OIWall { strike: 105.0, combined_open_interest: 10 },
            ]
        );
    }

    #[test]
    fn test_top_n_truncates() {
        let calls: Vec<(f64, u64)> = (0..10).map(|i| (90.0 + i as f64, 10 + i as u64)).collect();
        let snapshot = chain(&calls, &[]);
        let walls = rank_oi_walls(&snapshot, 5);

        assert_eq!(walls.len(), 5);
        assert!(walls
            .windows(2)
            .all(|w| w[0].combined_open_interest >= w[1].combined_open_interest));
        assert_eq!(walls[0].strike, 99.0);
    }

    #[test]
    fn test_ties_break_by_ascending_strike() {
        let snapshot = chain(&[(110.0, 50), (90.0, 50), (100.0, 50)], &[]);
        let walls = rank_oi_walls(&snapshot, 3);

        assert_eq!(wall_strikes(&walls), vec![90.0, 100.0, 110.0]);
    }

    #[test]
    fn test_deterministic() {
        let snapshot = chain(
            &[(95.0, 7), (100.0, 7), (105.0, 12)],
            &[(95.0, 5), (100.0, 5), (90.0, 12)],
        );

        let first = rank_oi_walls(&snapshot, 5);
        for _ in 0..10 {
            assert_eq!(rank_oi_walls(&snapshot, 5), first);
        }
    }

    #[test]
    fn test_empty_chain_has_no_walls() {
        let snapshot = chain(&[], &[]);
        assert!(rank_oi_walls(&snapshot, 5).is_empty());
    }
}
