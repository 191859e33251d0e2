use crate::aggregate::Kpi;
use crate::types::{GroupStats, Ranking, RankingEntity};
use std::cmp::Ordering;

/// Entities with this many deliveries or fewer are too noisy to rank.
pub const MIN_RANKING_DELIVERIES: usize = 10;

/// Length of the top and flop lists.
pub const RANKING_SIZE: usize = 3;

/// Top and flop entities for `kpi`.
///
/// The sort is stable, so entities with equal values keep their input order.
/// `flop` lists the worst entity first.
pub fn rank(entities: &[GroupStats], kpi: Kpi, higher_is_better: bool) -> Ranking {
    let mut eligible: Vec<RankingEntity> = entities
        .iter()
        .filter(|e| e.stats.total_deliveries > MIN_RANKING_DELIVERIES)
        .filter_map(|e| {
            kpi.value(&e.stats).map(|value| RankingEntity {
                name: e.name.clone(),
                value,
                total_deliveries: e.stats.total_deliveries,
            })
        })
        .collect();

    eligible.sort_by(|a, b| {
        let ord = a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal);
        if higher_is_better {
            ord.reverse()
        } else {
            ord
        }
    });

    let top = eligible.iter().take(RANKING_SIZE).cloned().collect();
    let flop = eligible.iter().rev().take(RANKING_SIZE).cloned().collect();
    Ranking { top, flop }
}
