use crate::lookup::{
    carrier_for_driver, default_carrier_rules, depot_for_warehouse, header_alias,
    status_for_label, Field, UNKNOWN_CARRIER, UNKNOWN_DEPOT, UNKNOWN_DRIVER,
};
use crate::types::{CarrierRule, CellValue, CompletionChannel, Delivery, DeliveryStatus, RawRow};
use crate::util::{parse_day_month_year, parse_f64_safe, serial_to_date};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

/// Counts of fields that were degraded to their default while normalizing.
/// No row is ever rejected; these numbers only describe data quality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub unparsed_dates: usize,
    pub unknown_statuses: usize,
    pub invalid_ratings: usize,
    pub unresolved_depots: usize,
    pub unresolved_carriers: usize,
}

/// Resolution tables for depots and carriers.
#[derive(Debug, Clone)]
pub struct Lookups {
    pub carriers: Vec<CarrierRule>,
    /// Extra warehouse to depot entries, consulted before the static table.
    pub warehouses: HashMap<String, String>,
}

impl Default for Lookups {
    fn default() -> Self {
        Lookups {
            carriers: default_carrier_rules(),
            warehouses: HashMap::new(),
        }
    }
}

pub fn normalize_rows(rows: &[RawRow], lookups: &Lookups) -> (Vec<Delivery>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let deliveries: Vec<Delivery> = rows
        .iter()
        .map(|row| normalize_row(row, lookups, &mut report))
        .collect();
    info!(
        rows = report.total_rows,
        unparsed_dates = report.unparsed_dates,
        unknown_statuses = report.unknown_statuses,
        invalid_ratings = report.invalid_ratings,
        unresolved_depots = report.unresolved_depots,
        unresolved_carriers = report.unresolved_carriers,
        "normalized delivery rows"
    );
    (deliveries, report)
}

/// Map one raw row onto a `Delivery`. Never fails: a bad cell degrades its
/// own field to the documented default and the row is kept.
pub fn normalize_row(row: &RawRow, lookups: &Lookups, report: &mut NormalizeReport) -> Delivery {
    report.total_rows += 1;
    let fields = map_fields(row);
    let text = |f: Field| fields.get(&f).and_then(|c| c.as_text());

    let date = match fields.get(&Field::Date) {
        Some(cell) => match coerce_date(cell) {
            Ok(d) => d.format("%Y-%m-%d").to_string(),
            Err(raw) => {
                debug!(value = %raw, "unparsed delivery date");
                report.unparsed_dates += 1;
                raw
            }
        },
        None => {
            report.unparsed_dates += 1;
            String::new()
        }
    };

    let status = match text(Field::Status) {
        Some(label) => status_for_label(&label).unwrap_or_else(|| {
            debug!(label = %label, "unknown status label, defaulting to pending");
            report.unknown_statuses += 1;
            DeliveryStatus::Pending
        }),
        None => {
            report.unknown_statuses += 1;
            DeliveryStatus::Pending
        }
    };

    let failure_reason = match status {
        DeliveryStatus::NotDelivered => text(Field::FailureReason),
        _ => None,
    };

    let rating = fields.get(&Field::Rating).and_then(|cell| {
        let rating = coerce_rating(cell);
        if rating.is_none() && cell.as_text().is_some() {
            debug!(value = ?cell, "rating outside 1..=5 dropped");
            report.invalid_ratings += 1;
        }
        rating
    });

    let warehouse = text(Field::Warehouse).unwrap_or_default();
    let depot = depot_for_warehouse(&warehouse, &lookups.warehouses).unwrap_or_else(|| {
        report.unresolved_depots += 1;
        UNKNOWN_DEPOT.to_string()
    });

    let raw_driver = text(Field::Driver).unwrap_or_default();
    let carrier = carrier_for_driver(&raw_driver, &lookups.carriers);
    if carrier == UNKNOWN_CARRIER {
        report.unresolved_carriers += 1;
    }
    let driver = if raw_driver.is_empty() {
        format!("{} ({})", UNKNOWN_DRIVER, depot)
    } else {
        format!("{} ({})", raw_driver, depot)
    };

    Delivery {
        date,
        status,
        failure_reason,
        task_id: text(Field::TaskId).unwrap_or_default(),
        tour_id: text(Field::TourId).unwrap_or_default(),
        sequence: fields.get(&Field::Sequence).map(|c| coerce_sequence(c)).unwrap_or(0),
        delay: fields.get(&Field::Delay).map(|c| coerce_delay(c)).unwrap_or(0),
        comment: text(Field::Comment),
        rating,
        forced_no_contact: fields.get(&Field::ForcedNoContact).is_some_and(|c| coerce_bool(c)),
        forced_on_site: fields.get(&Field::ForcedOnSite).is_some_and(|c| coerce_bool(c)),
        completed_via: fields
            .get(&Field::CompletedVia)
            .map(|c| coerce_channel(c))
            .unwrap_or(CompletionChannel::Mobile),
        warehouse,
        driver,
        depot,
        carrier,
    }
}

// When several aliases of one field are non-empty, the one listed first in
// `HEADERS` wins, whatever the column order of the row.
fn map_fields(row: &RawRow) -> HashMap<Field, &CellValue> {
    let mut fields: HashMap<Field, (usize, &CellValue)> = HashMap::new();
    for (header, cell) in row {
        let Some((field, priority)) = header_alias(header) else { continue };
        if matches!(cell, CellValue::Empty) {
            continue;
        }
        match fields.get(&field) {
            Some((kept, _)) if *kept <= priority => {}
            _ => {
                fields.insert(field, (priority, cell));
            }
        }
    }
    fields
        .into_iter()
        .map(|(field, (_, cell))| (field, cell))
        .collect()
}

/// Native dates, serial day numbers and `dd/mm/yyyy` strings are accepted;
/// anything else comes back as `Err` holding the raw text.
fn coerce_date(cell: &CellValue) -> Result<NaiveDate, String> {
    let raw = cell.as_text().unwrap_or_default();
    let parsed = match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => serial_to_date(*n),
        CellValue::Text(s) => parse_day_month_year(s.trim())
            .or_else(|| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .or_else(|| parse_f64_safe(Some(s)).and_then(serial_to_date)),
        CellValue::Bool(_) | CellValue::Empty => None,
    };
    parsed.ok_or(raw)
}

fn cell_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

fn coerce_sequence(cell: &CellValue) -> u32 {
    match cell_number(cell) {
        Some(n) if n >= 0.0 && n <= u32::MAX as f64 => n.trunc() as u32,
        _ => 0,
    }
}

fn coerce_delay(cell: &CellValue) -> i64 {
    cell_number(cell).map(|n| n.round() as i64).unwrap_or(0)
}

fn coerce_rating(cell: &CellValue) -> Option<u8> {
    let n = cell_number(cell)?.round();
    if (1.0..=5.0).contains(&n) {
        Some(n as u8)
    } else {
        None
    }
}

fn coerce_bool(cell: &CellValue) -> bool {
    match cell {
        CellValue::Bool(b) => *b,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Text(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "oui" | "o" | "vrai" | "true" | "yes" | "y" | "x" | "1"
        ),
        CellValue::Date(_) | CellValue::Empty => false,
    }
}

fn coerce_channel(cell: &CellValue) -> CompletionChannel {
    match cell.as_text() {
        Some(s) if s.to_lowercase().contains("web") => CompletionChannel::Web,
        _ => CompletionChannel::Mobile,
    }
}

/// Keep deliveries whose normalized date falls inside `[from, to]`.
///
/// Records whose date did not parse are dropped as soon as a bound is given.
pub fn filter_by_date_range(
    records: &[Delivery],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<Delivery> {
    if from.is_none() && to.is_none() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|d| {
            let Ok(date) = NaiveDate::parse_from_str(&d.date, "%Y-%m-%d") else {
                return false;
            };
            from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn normalize(r: &RawRow) -> (Delivery, NormalizeReport) {
        let mut report = NormalizeReport::default();
        let d = normalize_row(r, &Lookups::default(), &mut report);
        (d, report)
    }

    #[test]
    fn test_full_row() {
        let r = row(&[
            ("Date", text("05/03/2024")),
            ("Statut", text("Non livré")),
            ("Raison de non livraison", text("Client absent")),
            ("ID Tâche", text("T-1")),
            ("ID Tournée", CellValue::Number(42.0)),
            ("Séquence", CellValue::Number(7.0)),
            ("Retard (s)", CellValue::Number(-120.4)),
            ("Commentaire client", text("  Livreur aimable ")),
            ("Note", CellValue::Number(4.0)),
            ("Sans contact forcé", text("Oui")),
            ("Forcé sur place", CellValue::Bool(false)),
            ("Réalisée via", text("Web")),
            ("Entrepôt", text(" Lyon Corbas ")),
            ("Livreur", text("Paul Durand E33")),
            ("Colonne en plus", text("ignored")),
        ]);
        let (d, report) = normalize(&r);
        assert_eq!(d.date, "2024-03-05");
        assert_eq!(d.status, DeliveryStatus::NotDelivered);
        assert_eq!(d.failure_reason.as_deref(), Some("Client absent"));
        assert_eq!(d.task_id, "T-1");
        assert_eq!(d.tour_id, "42");
        assert_eq!(d.sequence, 7);
        assert_eq!(d.delay, -120);
        assert_eq!(d.comment.as_deref(), Some("Livreur aimable"));
        assert_eq!(d.rating, Some(4));
        assert!(d.forced_no_contact);
        assert!(!d.forced_on_site);
        assert_eq!(d.completed_via, CompletionChannel::Web);
        assert_eq!(d.warehouse, "Lyon Corbas");
        assert_eq!(d.depot, "Dépôt Lyon");
        assert_eq!(d.carrier, "EXPRESS 33");
        assert_eq!(d.driver, "Paul Durand E33 (Dépôt Lyon)");
        assert_eq!(report, NormalizeReport { total_rows: 1, ..Default::default() });
    }

    #[test]
    fn test_empty_row_degrades_every_field() {
        let (d, report) = normalize(&RawRow::new());
        assert_eq!(d.date, "");
        assert_eq!(d.status, DeliveryStatus::Pending);
        assert_eq!(d.sequence, 0);
        assert_eq!(d.delay, 0);
        assert_eq!(d.rating, None);
        assert_eq!(d.completed_via, CompletionChannel::Mobile);
        assert_eq!(d.depot, UNKNOWN_DEPOT);
        assert_eq!(d.carrier, UNKNOWN_CARRIER);
        assert_eq!(d.driver, "Livreur Inconnu (Dépôt Inconnu)");
        assert_eq!(report.unparsed_dates, 1);
        assert_eq!(report.unknown_statuses, 1);
        assert_eq!(report.unresolved_depots, 1);
        assert_eq!(report.unresolved_carriers, 1);
    }

    #[test]
    fn test_date_coercions() {
        let native = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let cases = [
            (CellValue::Date(native), "2024-02-29"),
            (CellValue::Number(45292.0), "2024-01-01"),
            (text("45292"), "2024-01-01"),
            (text("01/01/2024 09:15"), "2024-01-01"),
            (text("2024-01-01"), "2024-01-01"),
            (text("demain"), "demain"),
        ];
        for (cell, expected) in cases {
            let (d, _) = normalize(&row(&[("Date", cell)]));
            assert_eq!(d.date, expected);
        }
    }

    #[test]
    fn test_malformed_cells_use_defaults() {
        let r = row(&[
            ("Statut", text("Livré ?")),
            ("Séquence", text("abc")),
            ("Retard (s)", text("n/a")),
            ("Note", CellValue::Number(9.0)),
            ("Raison de non livraison", text("Client absent")),
        ]);
        let (d, report) = normalize(&r);
        assert_eq!(d.status, DeliveryStatus::Pending);
        assert_eq!(d.failure_reason, None);
        assert_eq!(d.sequence, 0);
        assert_eq!(d.delay, 0);
        assert_eq!(d.rating, None);
        assert_eq!(report.unknown_statuses, 1);
        assert_eq!(report.invalid_ratings, 1);
    }

    #[test]
    fn test_negative_sequence_defaults_to_zero() {
        let (d, _) = normalize(&row(&[("Séquence", CellValue::Number(-3.0))]));
        assert_eq!(d.sequence, 0);
    }

    #[test]
    fn test_preferred_alias_wins_over_column_order() {
        // "Chauffeur" and "Commentaire" sort before the preferred aliases.
        let r = row(&[
            ("Chauffeur", text("Yann")),
            ("Livreur", text("Ali")),
            ("Commentaire", text("autre")),
            ("Commentaire client", text("Livreur aimable")),
        ]);
        let (d, _) = normalize(&r);
        assert!(d.driver.starts_with("Ali ("), "{}", d.driver);
        assert_eq!(d.comment.as_deref(), Some("Livreur aimable"));

        let r = row(&[("Chauffeur", text("Yann")), ("Livreur", CellValue::Empty)]);
        let (d, _) = normalize(&r);
        assert!(d.driver.starts_with("Yann ("), "{}", d.driver);
    }

    #[test]
    fn test_configured_lookups() {
        let mut lookups = Lookups::default();
        lookups.warehouses.insert("Quimper".into(), "Dépôt Bretagne".into());
        lookups.carriers = vec![CarrierRule { name: "BREIZH".into(), suffixes: vec!["BZH".into()] }];
        let r = row(&[("Hub", text("Quimper")), ("Chauffeur", text("Yann bzh"))]);
        let mut report = NormalizeReport::default();
        let d = normalize_row(&r, &lookups, &mut report);
        assert_eq!(d.depot, "Dépôt Bretagne");
        assert_eq!(d.carrier, "BREIZH");
        assert_eq!(d.driver, "Yann bzh (Dépôt Bretagne)");
    }

    #[test]
    fn test_filter_by_date_range() {
        let rows: Vec<RawRow> = ["01/03/2024", "15/03/2024", "31/03/2024", "???"]
            .iter()
            .map(|s| row(&[("Date", text(s))]))
            .collect();
        let (records, _) = normalize_rows(&rows, &Lookups::default());
        let from = NaiveDate::from_ymd_opt(2024, 3, 10);
        let to = NaiveDate::from_ymd_opt(2024, 3, 31);
        let kept = filter_by_date_range(&records, from, to);
        let dates: Vec<&str> = kept.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-15", "2024-03-31"]);
        assert_eq!(filter_by_date_range(&records, None, None).len(), 4);
    }
}
