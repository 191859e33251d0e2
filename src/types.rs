use crate::aggregate::Kpi;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::Tabled;

/// One untyped cell as handed over by the spreadsheet importer.
///
/// `Text` is listed before `Date` so that JSON strings stay text; `Date`
/// only shows up when an importer already recognised a native date cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    /// Trimmed textual form of the cell, `None` when there is nothing to read.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            CellValue::Empty => return None,
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// A loosely-typed input row keyed by source column name.
pub type RawRow = BTreeMap<String, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Delivered,
    NotDelivered,
    PartiallyDelivered,
    Pending,
}

impl DeliveryStatus {
    /// Delivered, NotDelivered and PartiallyDelivered are resolved; Pending is still in flight.
    pub fn is_closed(self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionChannel {
    Web,
    Mobile,
}

/// Carrier inferred from driver names ending with one of `suffixes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierRule {
    pub name: String,
    pub suffixes: Vec<String>,
}

/// Canonical delivery record, produced once by the normalizer and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// `yyyy-mm-dd` when the source value parsed, the raw text otherwise.
    pub date: String,
    pub status: DeliveryStatus,
    pub failure_reason: Option<String>,
    pub task_id: String,
    pub tour_id: String,
    pub sequence: u32,
    /// Seconds relative to the promised window, negative when early.
    pub delay: i64,
    pub comment: Option<String>,
    pub rating: Option<u8>,
    pub forced_no_contact: bool,
    pub forced_on_site: bool,
    pub completed_via: CompletionChannel,
    pub warehouse: String,
    /// Display name `"<driver> (<depot>)"`, used as the driver grouping key.
    pub driver: String,
    pub depot: String,
    pub carrier: String,
}

/// KPIs over the closed deliveries of one group.
///
/// Rates are percentages (0-100), `average_rating` is on /5 and
/// `average_sentiment` on /10.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStats {
    pub total_deliveries: usize,
    pub delivered: usize,
    pub not_delivered: usize,
    pub partially_delivered: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub average_rating: Option<f64>,
    pub rated_deliveries: usize,
    pub punctuality_rate: f64,
    pub rating_rate: f64,
    pub forced_on_site_rate: f64,
    pub forced_no_contact_rate: f64,
    pub web_completion_rate: f64,
    pub average_sentiment: f64,
    pub sentiment_samples: usize,
    pub failure_reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub name: String,
    pub stats: AggregatedStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntity {
    pub name: String,
    pub value: f64,
    pub total_deliveries: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    pub top: Vec<RankingEntity>,
    pub flop: Vec<RankingEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingFamily {
    pub rating: Ranking,
    pub sentiment: Ranking,
    pub punctuality: Ranking,
    pub success_rate: Ranking,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiRankings {
    pub drivers: RankingFamily,
    pub carriers: RankingFamily,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentExemplar {
    pub comment: String,
    pub score: f64,
    pub rating: Option<u8>,
    pub driver: String,
    pub depot: String,
    pub date: String,
}

/// A KPI value next to the objective it is judged against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiValue {
    pub kpi: Kpi,
    pub value: Option<f64>,
    pub objective: f64,
    pub higher_is_better: bool,
    pub meets_objective: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    pub stats: AggregatedStats,
    pub kpis: Vec<KpiValue>,
    pub kpi_rankings: KpiRankings,
    pub top_comments: Vec<CommentExemplar>,
    pub flop_comments: Vec<CommentExemplar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub global: Section,
    pub depots: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Strength,
    Weakness,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Positive,
    Negative,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisPoint {
    pub kpi: Option<Kpi>,
    pub classification: Classification,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisPoints {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub points: Vec<SynthesisPoint>,
    pub score: i32,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepotSynthesis {
    pub depot: String,
    #[serde(flatten)]
    pub synthesis: SynthesisPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub global: SynthesisPoints,
    pub depots: Vec<DepotSynthesis>,
    pub conclusion: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DepotSummaryRow {
    #[serde(rename = "Depot")]
    #[tabled(rename = "Depot")]
    pub depot: String,
    #[serde(rename = "Deliveries")]
    #[tabled(rename = "Deliveries")]
    pub deliveries: usize,
    #[serde(rename = "SuccessRate")]
    #[tabled(rename = "SuccessRate")]
    pub success_rate: String,
    #[serde(rename = "PunctualityRate")]
    #[tabled(rename = "PunctualityRate")]
    pub punctuality_rate: String,
    #[serde(rename = "AvgRating")]
    #[tabled(rename = "AvgRating")]
    pub average_rating: String,
    #[serde(rename = "AvgSentiment")]
    #[tabled(rename = "AvgSentiment")]
    pub average_sentiment: String,
    #[serde(rename = "ForcedOnSiteRate")]
    #[tabled(rename = "ForcedOnSiteRate")]
    pub forced_on_site_rate: String,
    #[serde(rename = "WebCompletionRate")]
    #[tabled(rename = "WebCompletionRate")]
    pub web_completion_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Scope")]
    #[tabled(rename = "Scope")]
    pub scope: String,
    #[serde(rename = "Entity")]
    #[tabled(rename = "Entity")]
    pub entity_kind: String,
    #[serde(rename = "Kpi")]
    #[tabled(rename = "Kpi")]
    pub kpi: String,
    #[serde(rename = "List")]
    #[tabled(rename = "List")]
    pub list: String,
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Deliveries")]
    #[tabled(rename = "Deliveries")]
    pub deliveries: usize,
}
