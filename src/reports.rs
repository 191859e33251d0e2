use crate::aggregate::{aggregate, overall_stats, partition, GroupKey, Kpi};
use crate::config::Objectives;
use crate::ranking::rank;
use crate::sentiment::{top_comments, Polarity};
use crate::types::{
    AggregatedStats, DepotSummaryRow, Delivery, GroupStats, KpiRankings, KpiValue, RankingFamily,
    RankingRow, Report, Section,
};
use crate::util::{format_number, format_optional};
use tracing::debug;

/// Number of comment exemplars kept per section and polarity.
pub const COMMENT_EXEMPLARS: usize = 3;

pub const GLOBAL_SECTION: &str = "Global";

/// One section over all records plus one per depot, busiest depot first.
pub fn build_report(records: &[Delivery], objectives: &Objectives) -> Report {
    let global = build_section(GLOBAL_SECTION, records, objectives);

    let mut depots: Vec<Section> = partition(records, GroupKey::Depot)
        .into_iter()
        .map(|(depot, depot_records)| build_section(&depot, &depot_records, objectives))
        .collect();
    // Stable: depots with equal volume keep first-appearance order.
    depots.sort_by(|a, b| b.stats.total_deliveries.cmp(&a.stats.total_deliveries));

    debug!(depots = depots.len(), deliveries = global.stats.total_deliveries, "built report");
    Report { global, depots }
}

pub fn build_section(name: &str, records: &[Delivery], objectives: &Objectives) -> Section {
    let stats = overall_stats(records);
    let kpis = Kpi::ALL
        .iter()
        .map(|&kpi| kpi_value(kpi, &stats, objectives))
        .collect();

    let drivers = aggregate(records, GroupKey::Driver);
    let carriers = aggregate(records, GroupKey::Carrier);

    Section {
        name: name.to_string(),
        stats,
        kpis,
        kpi_rankings: KpiRankings {
            drivers: ranking_family(&drivers),
            carriers: ranking_family(&carriers),
        },
        top_comments: top_comments(records, Polarity::Positive, COMMENT_EXEMPLARS),
        flop_comments: top_comments(records, Polarity::Negative, COMMENT_EXEMPLARS),
    }
}

fn ranking_family(groups: &[GroupStats]) -> RankingFamily {
    RankingFamily {
        rating: rank(groups, Kpi::AverageRating, true),
        sentiment: rank(groups, Kpi::AverageSentiment, true),
        punctuality: rank(groups, Kpi::PunctualityRate, true),
        success_rate: rank(groups, Kpi::SuccessRate, true),
    }
}

/// Polarity-aware comparison of a KPI with its objective.
pub fn meets_objective(value: f64, objective: f64, higher_is_better: bool) -> bool {
    if higher_is_better {
        value >= objective
    } else {
        value <= objective
    }
}

pub fn kpi_value(kpi: Kpi, stats: &AggregatedStats, objectives: &Objectives) -> KpiValue {
    let value = kpi.value(stats);
    let objective = objectives.target(kpi);
    let higher_is_better = kpi.higher_is_better();
    KpiValue {
        kpi,
        value,
        objective,
        higher_is_better,
        meets_objective: value.map(|v| meets_objective(v, objective, higher_is_better)),
    }
}

/// One display row per depot, in report order.
pub fn depot_summary_rows(report: &Report) -> Vec<DepotSummaryRow> {
    report
        .depots
        .iter()
        .map(|section| {
            let s = &section.stats;
            DepotSummaryRow {
                depot: section.name.clone(),
                deliveries: s.total_deliveries,
                success_rate: format_number(s.success_rate, 2),
                punctuality_rate: format_number(s.punctuality_rate, 2),
                average_rating: format_optional(s.average_rating, 2),
                average_sentiment: format_optional(Kpi::AverageSentiment.value(s), 2),
                forced_on_site_rate: format_number(s.forced_on_site_rate, 2),
                web_completion_rate: format_number(s.web_completion_rate, 2),
            }
        })
        .collect()
}

/// Every top and flop entry of every section, flattened for CSV export.
pub fn ranking_rows(report: &Report) -> Vec<RankingRow> {
    let mut rows = Vec::new();
    for section in std::iter::once(&report.global).chain(report.depots.iter()) {
        let families = [
            ("driver", &section.kpi_rankings.drivers),
            ("carrier", &section.kpi_rankings.carriers),
        ];
        for (entity_kind, family) in families {
            let rankings = [
                (Kpi::AverageRating, &family.rating),
                (Kpi::AverageSentiment, &family.sentiment),
                (Kpi::PunctualityRate, &family.punctuality),
                (Kpi::SuccessRate, &family.success_rate),
            ];
            for (kpi, ranking) in rankings {
                for (list, entries) in [("top", &ranking.top), ("flop", &ranking.flop)] {
                    for (idx, e) in entries.iter().enumerate() {
                        rows.push(RankingRow {
                            scope: section.name.clone(),
                            entity_kind: entity_kind.to_string(),
                            kpi: kpi.label().to_string(),
                            list: list.to_string(),
                            rank: idx + 1,
                            name: e.name.clone(),
                            value: kpi.format(e.value),
                            deliveries: e.total_deliveries,
                        });
                    }
                }
            }
        }
    }
    rows
}
