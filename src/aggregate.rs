use crate::lookup::UNKNOWN_GROUP;
use crate::sentiment;
use crate::types::{AggregatedStats, CompletionChannel, Delivery, DeliveryStatus, GroupStats};
use crate::util::percent;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Deliveries within this many seconds of the promise count as on time.
pub const PUNCTUALITY_WINDOW_SECS: i64 = 900;

/// Comments must be longer than this (in characters) to feed the average sentiment.
pub const MIN_SENTIMENT_COMMENT_CHARS: usize = 5;

/// Label used for failed deliveries without a reason.
pub const MISSING_REASON: &str = "Non renseigné";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Depot,
    Carrier,
    Driver,
    Warehouse,
}

impl GroupKey {
    pub fn key_of<'a>(&self, d: &'a Delivery) -> &'a str {
        let key = match self {
            GroupKey::Depot => d.depot.as_str(),
            GroupKey::Carrier => d.carrier.as_str(),
            GroupKey::Driver => d.driver.as_str(),
            GroupKey::Warehouse => d.warehouse.as_str(),
        };
        if key.trim().is_empty() {
            UNKNOWN_GROUP
        } else {
            key
        }
    }
}

/// The KPIs the ranking and synthesis steps know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Kpi {
    SuccessRate,
    AverageRating,
    AverageSentiment,
    PunctualityRate,
    FailureRate,
    ForcedOnSiteRate,
    ForcedNoContactRate,
    WebCompletionRate,
}

impl Kpi {
    pub const ALL: [Kpi; 8] = [
        Kpi::SuccessRate,
        Kpi::AverageRating,
        Kpi::AverageSentiment,
        Kpi::PunctualityRate,
        Kpi::FailureRate,
        Kpi::ForcedOnSiteRate,
        Kpi::ForcedNoContactRate,
        Kpi::WebCompletionRate,
    ];

    /// Value of this KPI, `None` when the group has no data backing it.
    pub fn value(self, stats: &AggregatedStats) -> Option<f64> {
        if stats.total_deliveries == 0 {
            return None;
        }
        match self {
            Kpi::SuccessRate => Some(stats.success_rate),
            Kpi::AverageRating => stats.average_rating,
            Kpi::AverageSentiment => (stats.sentiment_samples > 0).then_some(stats.average_sentiment),
            Kpi::PunctualityRate => Some(stats.punctuality_rate),
            Kpi::FailureRate => Some(stats.failure_rate),
            Kpi::ForcedOnSiteRate => Some(stats.forced_on_site_rate),
            Kpi::ForcedNoContactRate => Some(stats.forced_no_contact_rate),
            Kpi::WebCompletionRate => Some(stats.web_completion_rate),
        }
    }

    pub fn higher_is_better(self) -> bool {
        matches!(
            self,
            Kpi::SuccessRate | Kpi::AverageRating | Kpi::AverageSentiment | Kpi::PunctualityRate
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Kpi::SuccessRate => "Taux de réussite",
            Kpi::AverageRating => "Note moyenne",
            Kpi::AverageSentiment => "Sentiment moyen",
            Kpi::PunctualityRate => "Taux de ponctualité",
            Kpi::FailureRate => "Taux d'échec",
            Kpi::ForcedOnSiteRate => "Taux de forçage sur place",
            Kpi::ForcedNoContactRate => "Taux de sans contact forcé",
            Kpi::WebCompletionRate => "Taux de clôture web",
        }
    }

    /// Render a value with the unit consumers expect: `%`, `/5` or `/10`.
    pub fn format(self, value: f64) -> String {
        match self {
            Kpi::AverageRating => format!("{:.2}/5", value),
            Kpi::AverageSentiment => format!("{:.1}/10", value),
            _ => format!("{:.1} %", value),
        }
    }
}

/// Running sums for one group; `finish` turns them into rates.
#[derive(Debug, Clone, Default)]
struct StatsAccumulator {
    total: usize,
    delivered: usize,
    not_delivered: usize,
    partially_delivered: usize,
    on_time: usize,
    rating_sum: u32,
    rated: usize,
    forced_on_site: usize,
    forced_no_contact: usize,
    web: usize,
    sentiment_sum: f64,
    sentiment_samples: usize,
    failure_reasons: BTreeMap<String, usize>,
}

impl StatsAccumulator {
    fn add(&mut self, d: &Delivery) {
        if !d.status.is_closed() {
            return;
        }
        self.total += 1;
        match d.status {
            DeliveryStatus::Delivered => self.delivered += 1,
            DeliveryStatus::NotDelivered => {
                self.not_delivered += 1;
                let reason = d
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| MISSING_REASON.to_string());
                *self.failure_reasons.entry(reason).or_default() += 1;
            }
            DeliveryStatus::PartiallyDelivered => self.partially_delivered += 1,
            DeliveryStatus::Pending => {}
        }
        if (-PUNCTUALITY_WINDOW_SECS..=PUNCTUALITY_WINDOW_SECS).contains(&d.delay) {
            self.on_time += 1;
        }
        if let Some(r) = d.rating {
            self.rating_sum += u32::from(r);
            self.rated += 1;
        }
        if d.forced_on_site {
            self.forced_on_site += 1;
        }
        if d.forced_no_contact {
            self.forced_no_contact += 1;
        }
        if d.completed_via == CompletionChannel::Web {
            self.web += 1;
        }
        if let Some(comment) = d.comment.as_deref() {
            if comment.trim().chars().count() > MIN_SENTIMENT_COMMENT_CHARS {
                self.sentiment_sum += sentiment::score(comment, d.rating).score;
                self.sentiment_samples += 1;
            }
        }
    }

    fn finish(self) -> AggregatedStats {
        if self.total == 0 {
            return AggregatedStats::default();
        }
        let failure_rate = percent(self.not_delivered, self.total);
        AggregatedStats {
            total_deliveries: self.total,
            delivered: self.delivered,
            not_delivered: self.not_delivered,
            partially_delivered: self.partially_delivered,
            success_rate: 100.0 - failure_rate,
            failure_rate,
            average_rating: (self.rated > 0).then(|| self.rating_sum as f64 / self.rated as f64),
            rated_deliveries: self.rated,
            punctuality_rate: percent(self.on_time, self.total),
            rating_rate: percent(self.rated, self.total),
            forced_on_site_rate: percent(self.forced_on_site, self.total),
            forced_no_contact_rate: percent(self.forced_no_contact, self.total),
            web_completion_rate: percent(self.web, self.total),
            average_sentiment: if self.sentiment_samples > 0 {
                self.sentiment_sum / self.sentiment_samples as f64
            } else {
                0.0
            },
            sentiment_samples: self.sentiment_samples,
            failure_reasons: self.failure_reasons,
        }
    }
}

/// KPIs over every closed delivery of `records`.
pub fn overall_stats(records: &[Delivery]) -> AggregatedStats {
    records
        .iter()
        .fold(StatsAccumulator::default(), |mut acc, d| {
            acc.add(d);
            acc
        })
        .finish()
}

/// KPIs per group, groups listed in order of first appearance.
///
/// Only closed deliveries are grouped, so the group totals add up to
/// `overall_stats(records).total_deliveries`.
pub fn aggregate(records: &[Delivery], key: GroupKey) -> Vec<GroupStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, StatsAccumulator)> = Vec::new();
    for d in records.iter().filter(|d| d.status.is_closed()) {
        let name = key.key_of(d);
        let slot = *index.entry(name).or_insert_with(|| {
            groups.push((name, StatsAccumulator::default()));
            groups.len() - 1
        });
        groups[slot].1.add(d);
    }
    groups
        .into_iter()
        .map(|(name, acc)| GroupStats {
            name: name.to_string(),
            stats: acc.finish(),
        })
        .collect()
}

/// Split `records` by `key`, keeping first-appearance order of the groups
/// and input order within each group. Pending deliveries are kept.
pub fn partition(records: &[Delivery], key: GroupKey) -> Vec<(String, Vec<Delivery>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut parts: Vec<(String, Vec<Delivery>)> = Vec::new();
    for d in records {
        let name = key.key_of(d);
        let slot = *index.entry(name).or_insert_with(|| {
            parts.push((name.to_string(), Vec::new()));
            parts.len() - 1
        });
        parts[slot].1.push(d.clone());
    }
    parts
}
