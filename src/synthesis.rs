//! Strengths and weaknesses of each report section against the objectives,
//! plus a short templated conclusion for the whole network.

use crate::aggregate::Kpi;
use crate::config::Objectives;
use crate::reports::meets_objective;
use crate::types::{
    Classification, DepotSynthesis, OverallStatus, Report, Section, Synthesis, SynthesisPoint,
    SynthesisPoints,
};

/// Deviations within this share of the objective are reported as neutral.
pub const SIGNIFICANCE_RATIO: f64 = 0.05;

/// More strengths (or weaknesses) than this trigger a conclusion sentence.
pub const CONCLUSION_TRIGGER: usize = 2;

pub fn classify(value: f64, objective: f64, higher_is_better: bool) -> Classification {
    let significant = (value - objective).abs() > SIGNIFICANCE_RATIO * objective.abs();
    match (meets_objective(value, objective, higher_is_better), significant) {
        (true, true) => Classification::Strength,
        (false, true) => Classification::Weakness,
        _ => Classification::Neutral,
    }
}

/// Score above 1 is positive, below -1 negative, anything else mixed.
pub fn overall_status(score: i32) -> OverallStatus {
    if score > 1 {
        OverallStatus::Positive
    } else if score < -1 {
        OverallStatus::Negative
    } else {
        OverallStatus::Mixed
    }
}

fn sentence(kpi: Kpi, value: f64, objective: f64, class: Classification) -> String {
    let label = kpi.label();
    let value = kpi.format(value);
    let target = kpi.format(objective);
    match (class, kpi.higher_is_better()) {
        (Classification::Strength, true) => {
            format!("{label} de {value}, au-dessus de l'objectif de {target}.")
        }
        (Classification::Strength, false) => {
            format!("{label} de {value}, sous le seuil maximal de {target}.")
        }
        (Classification::Weakness, true) => {
            format!("{label} de {value}, en dessous de l'objectif de {target}.")
        }
        (Classification::Weakness, false) => {
            format!("{label} de {value}, au-dessus du seuil maximal de {target}.")
        }
        (Classification::Neutral, _) => format!("{label} de {value}, proche de l'objectif de {target}."),
    }
}

fn evaluate(section: &Section, objectives: &Objectives) -> Vec<SynthesisPoint> {
    let mut points: Vec<SynthesisPoint> = Kpi::ALL
        .iter()
        .filter_map(|&kpi| {
            let value = kpi.value(&section.stats)?;
            let objective = objectives.target(kpi);
            let classification = classify(value, objective, kpi.higher_is_better());
            Some(SynthesisPoint {
                kpi: Some(kpi),
                classification,
                text: sentence(kpi, value, objective, classification),
            })
        })
        .collect();

    // The failure rate is the complement of the success rate: once the
    // success rate carries a signal, the failure rate is not surfaced again.
    let success_signal = points
        .iter()
        .any(|p| p.kpi == Some(Kpi::SuccessRate) && p.classification != Classification::Neutral);
    if success_signal {
        for p in points.iter_mut().filter(|p| p.kpi == Some(Kpi::FailureRate)) {
            p.classification = Classification::Neutral;
        }
    }
    points
}

fn top_performer(section: &Section) -> Option<String> {
    let rankings = &section.kpi_rankings;
    if let Some(best) = rankings.drivers.rating.top.first() {
        return Some(format!(
            "Meilleur livreur : {} avec une note moyenne de {} sur {} livraisons.",
            best.name,
            Kpi::AverageRating.format(best.value),
            best.total_deliveries
        ));
    }
    rankings.carriers.rating.top.first().map(|best| {
        format!(
            "Meilleur transporteur : {} avec une note moyenne de {} sur {} livraisons.",
            best.name,
            Kpi::AverageRating.format(best.value),
            best.total_deliveries
        )
    })
}

pub fn synthesize_section(section: &Section, objectives: &Objectives) -> SynthesisPoints {
    let mut points = evaluate(section, objectives);
    let count = |class: Classification| points.iter().filter(|p| p.classification == class).count();
    let score = count(Classification::Strength) as i32 - count(Classification::Weakness) as i32;

    // Recognition only: the performer sentence does not move the score.
    if let Some(text) = top_performer(section) {
        points.push(SynthesisPoint {
            kpi: None,
            classification: Classification::Strength,
            text,
        });
    }

    let collect = |class: Classification| -> Vec<String> {
        points
            .iter()
            .filter(|p| p.classification == class)
            .map(|p| p.text.clone())
            .collect()
    };
    SynthesisPoints {
        strengths: collect(Classification::Strength),
        weaknesses: collect(Classification::Weakness),
        score,
        overall_status: overall_status(score),
        points,
    }
}

fn kpi_count(points: &SynthesisPoints, class: Classification) -> usize {
    points
        .points
        .iter()
        .filter(|p| p.kpi.is_some() && p.classification == class)
        .count()
}

pub fn conclusion(global: &SynthesisPoints, depots: &[DepotSynthesis]) -> String {
    let mut sentences = Vec::new();

    let strengths = kpi_count(global, Classification::Strength);
    if strengths > CONCLUSION_TRIGGER {
        sentences.push(format!(
            "Le réseau atteint ses objectifs sur {} indicateurs clés.",
            strengths
        ));
    }
    let weaknesses = kpi_count(global, Classification::Weakness);
    if weaknesses > CONCLUSION_TRIGGER {
        sentences.push(format!(
            "{} indicateurs restent en deçà des objectifs et nécessitent un plan d'action.",
            weaknesses
        ));
    }
    let struggling: Vec<&str> = depots
        .iter()
        .filter(|d| d.synthesis.overall_status == OverallStatus::Negative)
        .map(|d| d.depot.as_str())
        .collect();
    if !struggling.is_empty() {
        sentences.push(format!(
            "Dépôts nécessitant une attention particulière : {}.",
            struggling.join(", ")
        ));
    }

    if sentences.is_empty() {
        "Les performances sont globalement mitigées, sans tendance marquée.".to_string()
    } else {
        sentences.join(" ")
    }
}

pub fn synthesize(report: &Report, objectives: &Objectives) -> Synthesis {
    let global = synthesize_section(&report.global, objectives);
    let depots: Vec<DepotSynthesis> = report
        .depots
        .iter()
        .map(|section| DepotSynthesis {
            depot: section.name.clone(),
            synthesis: synthesize_section(section, objectives),
        })
        .collect();
    let conclusion = conclusion(&global, &depots);
    Synthesis {
        global,
        depots,
        conclusion,
    }
}

/// Plain-text rendering of a synthesis, used for console previews.
pub fn render_text(synthesis: &Synthesis) -> String {
    let mut out = Vec::new();
    let mut scope = |title: &str, points: &SynthesisPoints| {
        out.push(format!("{} [{:?}, score {}]", title, points.overall_status, points.score));
        for s in &points.strengths {
            out.push(format!("  + {}", s));
        }
        for w in &points.weaknesses {
            out.push(format!("  - {}", w));
        }
    };
    scope("Global", &synthesis.global);
    for depot in &synthesis.depots {
        scope(&depot.depot, &depot.synthesis);
    }
    out.push(String::new());
    out.push(synthesis.conclusion.clone());
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::build_section;
    use crate::types::{AggregatedStats, KpiRankings, RankingEntity};

    fn section(name: &str, stats: AggregatedStats) -> Section {
        Section {
            name: name.to_string(),
            stats,
            kpis: Vec::new(),
            kpi_rankings: KpiRankings::default(),
            top_comments: Vec::new(),
            flop_comments: Vec::new(),
        }
    }

    fn on_target() -> AggregatedStats {
        let o = Objectives::default();
        AggregatedStats {
            total_deliveries: 100,
            success_rate: o.success_rate,
            failure_rate: o.failure_rate,
            average_rating: Some(o.average_rating),
            rated_deliveries: 10,
            punctuality_rate: o.punctuality_rate,
            forced_on_site_rate: o.forced_on_site_rate,
            forced_no_contact_rate: o.forced_no_contact_rate,
            web_completion_rate: o.web_completion_rate,
            average_sentiment: o.average_sentiment,
            sentiment_samples: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(3.0, 4.5, true), Classification::Weakness);
        assert_eq!(classify(4.4, 4.5, true), Classification::Neutral);
        assert_eq!(classify(4.8, 4.5, true), Classification::Strength);
        assert_eq!(classify(2.0, 5.0, false), Classification::Strength);
        assert_eq!(classify(8.0, 5.0, false), Classification::Weakness);
        assert_eq!(classify(5.2, 5.0, false), Classification::Neutral);
    }

    #[test]
    fn test_low_rating_is_one_weakness() {
        let mut stats = on_target();
        stats.average_rating = Some(3.0);
        let points = synthesize_section(&section("Global", stats), &Objectives::default());
        assert_eq!(points.weaknesses.len(), 1);
        assert!(points.weaknesses[0].starts_with("Note moyenne de 3.00/5"));
        assert!(points.strengths.is_empty());
        assert_eq!(points.score, -1);
        assert_eq!(points.overall_status, OverallStatus::Mixed);
    }

    #[test]
    fn test_failure_rate_not_double_counted() {
        let mut stats = on_target();
        stats.success_rate = 80.0;
        stats.failure_rate = 20.0;
        let points = synthesize_section(&section("Global", stats), &Objectives::default());
        assert_eq!(points.weaknesses.len(), 1);
        assert!(points.weaknesses[0].starts_with("Taux de réussite"));
        let failure = points
            .points
            .iter()
            .find(|p| p.kpi == Some(Kpi::FailureRate))
            .unwrap();
        assert_eq!(failure.classification, Classification::Neutral);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(overall_status(2), OverallStatus::Positive);
        assert_eq!(overall_status(1), OverallStatus::Mixed);
        assert_eq!(overall_status(-1), OverallStatus::Mixed);
        assert_eq!(overall_status(-2), OverallStatus::Negative);
    }

    #[test]
    fn test_top_performer_does_not_move_score() {
        let mut s = section("Global", on_target());
        s.kpi_rankings.carriers.rating.top.push(RankingEntity {
            name: "EXPRESS 33".into(),
            value: 4.6,
            total_deliveries: 40,
        });
        let points = synthesize_section(&s, &Objectives::default());
        assert_eq!(points.score, 0);
        assert_eq!(points.strengths.len(), 1);
        assert!(points.strengths[0].contains("EXPRESS 33"));
    }

    #[test]
    fn test_conclusion_names_negative_depots() {
        let mut bad = on_target();
        bad.average_rating = Some(2.0);
        bad.punctuality_rate = 50.0;
        bad.average_sentiment = 3.0;
        let objectives = Objectives::default();
        let report = Report {
            global: section("Global", on_target()),
            depots: vec![
                section("Dépôt Lyon", bad.clone()),
                section("Dépôt Paris", on_target()),
                section("Dépôt Lille", bad),
            ],
        };
        let synthesis = synthesize(&report, &objectives);
        assert_eq!(synthesis.depots[0].synthesis.overall_status, OverallStatus::Negative);
        assert_eq!(synthesis.depots[1].synthesis.overall_status, OverallStatus::Mixed);
        assert_eq!(
            synthesis.conclusion,
            "Dépôts nécessitant une attention particulière : Dépôt Lyon, Dépôt Lille."
        );
    }

    #[test]
    fn test_conclusion_counts_strengths() {
        let mut great = on_target();
        great.average_rating = Some(4.9);
        great.punctuality_rate = 99.0;
        great.average_sentiment = 9.0;
        let report = Report { global: section("Global", great), depots: Vec::new() };
        let synthesis = synthesize(&report, &Objectives::default());
        assert_eq!(synthesis.global.overall_status, OverallStatus::Positive);
        assert_eq!(synthesis.conclusion, "Le réseau atteint ses objectifs sur 3 indicateurs clés.");
    }

    #[test]
    fn test_empty_section_is_neutral() {
        let objectives = Objectives::default();
        let empty = build_section("Global", &[], &objectives);
        let report = Report { global: empty, depots: Vec::new() };
        let synthesis = synthesize(&report, &objectives);
        assert!(synthesis.global.strengths.is_empty());
        assert!(synthesis.global.weaknesses.is_empty());
        assert_eq!(synthesis.global.overall_status, OverallStatus::Mixed);
        assert_eq!(
            synthesis.conclusion,
            "Les performances sont globalement mitigées, sans tendance marquée."
        );
        assert!(render_text(&synthesis).contains("Global [Mixed, score 0]"));
    }
}
