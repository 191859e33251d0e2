//! Static lookup tables used by the normalizer: source headers, status
//! labels, warehouse to depot mapping and the default carrier rules.

use crate::types::{CarrierRule, DeliveryStatus};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const UNKNOWN_DEPOT: &str = "Dépôt Inconnu";
pub const UNKNOWN_CARRIER: &str = "Inconnu";
pub const UNKNOWN_DRIVER: &str = "Livreur Inconnu";
pub const UNKNOWN_GROUP: &str = "Inconnu";

/// Canonical delivery fields a source column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Status,
    FailureReason,
    TaskId,
    TourId,
    Sequence,
    Delay,
    Comment,
    Rating,
    ForcedNoContact,
    ForcedOnSite,
    CompletedVia,
    Warehouse,
    Driver,
}

/// Known source column names. Columns missing from this table are ignored.
pub static HEADERS: &[(&str, Field)] = &[
    ("Date", Field::Date),
    ("Date de livraison", Field::Date),
    ("date", Field::Date),
    ("Statut", Field::Status),
    ("Statut de la tâche", Field::Status),
    ("status", Field::Status),
    ("Raison de non livraison", Field::FailureReason),
    ("Motif d'échec", Field::FailureReason),
    ("failureReason", Field::FailureReason),
    ("ID Tâche", Field::TaskId),
    ("Tâche", Field::TaskId),
    ("taskId", Field::TaskId),
    ("ID Tournée", Field::TourId),
    ("Tournée", Field::TourId),
    ("tourId", Field::TourId),
    ("Séquence", Field::Sequence),
    ("Ordre de passage", Field::Sequence),
    ("sequence", Field::Sequence),
    ("Retard (s)", Field::Delay),
    ("Écart (s)", Field::Delay),
    ("delay", Field::Delay),
    ("Commentaire client", Field::Comment),
    ("Commentaire", Field::Comment),
    ("comment", Field::Comment),
    ("Note", Field::Rating),
    ("Note client", Field::Rating),
    ("rating", Field::Rating),
    ("Sans contact forcé", Field::ForcedNoContact),
    ("forcedNoContact", Field::ForcedNoContact),
    ("Forcé sur place", Field::ForcedOnSite),
    ("forcedOnSite", Field::ForcedOnSite),
    ("Réalisée via", Field::CompletedVia),
    ("Canal", Field::CompletedVia),
    ("completedVia", Field::CompletedVia),
    ("Entrepôt", Field::Warehouse),
    ("Hub", Field::Warehouse),
    ("warehouse", Field::Warehouse),
    ("Livreur", Field::Driver),
    ("Chauffeur", Field::Driver),
    ("driver", Field::Driver),
];

/// Exact status labels of the delivery export.
pub static STATUS_LABELS: &[(&str, DeliveryStatus)] = &[
    ("Livré", DeliveryStatus::Delivered),
    ("Non livré", DeliveryStatus::NotDelivered),
    ("Partiellement livré", DeliveryStatus::PartiallyDelivered),
    ("En attente", DeliveryStatus::Pending),
];

/// Warehouse name to depot. Many warehouses roll up into one depot.
pub static WAREHOUSE_DEPOTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // Ile-de-France
    m.insert("Paris Nord", "Dépôt Paris");
    m.insert("Gennevilliers", "Dépôt Paris");
    m.insert("Wissous", "Dépôt Paris");
    m.insert("Bonneuil", "Dépôt Paris");

    // Rhone-Alpes
    m.insert("Lyon Corbas", "Dépôt Lyon");
    m.insert("Saint-Priest", "Dépôt Lyon");
    m.insert("Grenoble Sassenage", "Dépôt Lyon");

    // South
    m.insert("Marseille Vitrolles", "Dépôt Marseille");
    m.insert("Nice Saint-Laurent", "Dépôt Marseille");
    m.insert("Toulouse Fenouillet", "Dépôt Toulouse");
    m.insert("Bordeaux Mérignac", "Dépôt Bordeaux");

    // North and West
    m.insert("Lille Lesquin", "Dépôt Lille");
    m.insert("Nantes Carquefou", "Dépôt Nantes");
    m.insert("Rennes Chantepie", "Dépôt Nantes");

    m
});

/// Source column name to canonical field.
pub fn field_for_header(header: &str) -> Option<Field> {
    header_alias(header).map(|(field, _)| field)
}

/// Field of a header plus its position in `HEADERS`. Earlier aliases are preferred.
pub fn header_alias(header: &str) -> Option<(Field, usize)> {
    let header = header.trim();
    HEADERS
        .iter()
        .enumerate()
        .find(|(_, (name, _))| *name == header)
        .map(|(idx, (_, field))| (*field, idx))
}

/// Exact label match; anything else is `None` and left to the caller's default.
pub fn status_for_label(label: &str) -> Option<DeliveryStatus> {
    STATUS_LABELS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, status)| *status)
}

/// Resolve a warehouse to its depot, consulting `extra` before the static table.
pub fn depot_for_warehouse(warehouse: &str, extra: &HashMap<String, String>) -> Option<String> {
    let warehouse = warehouse.trim();
    extra
        .get(warehouse)
        .cloned()
        .or_else(|| WAREHOUSE_DEPOTS.get(warehouse).map(|d| d.to_string()))
}

/// Carrier suffix rules used when no configuration overrides them.
pub fn default_carrier_rules() -> Vec<CarrierRule> {
    let rule = |name: &str, suffixes: &[&str]| CarrierRule {
        name: name.to_string(),
        suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        rule("TRANSPORTS MARTIN", &["TMARTIN", "- TM"]),
        rule("EXPRESS 33", &["E33", "EXP33"]),
        rule("COLIS RAPIDE", &["CRAPIDE", "- CR"]),
        rule("LOGIWAY", &["LOGIWAY", "LGW"]),
    ]
}

/// Infer the carrier from the raw driver name.
///
/// Rules apply in order: the `ID LOG` suffix, the `STT` prefix for
/// subcontractors, then the first rule whose suffix matches.
pub fn carrier_for_driver(driver: &str, rules: &[CarrierRule]) -> String {
    let name = driver.trim().to_uppercase();
    if name.is_empty() {
        return UNKNOWN_CARRIER.to_string();
    }
    if name.ends_with("ID LOG") {
        return "ID LOGISTICS".to_string();
    }
    if name.starts_with("STT") {
        return "Sous traitants".to_string();
    }
    rules
        .iter()
        .find(|rule| {
            rule.suffixes
                .iter()
                .any(|suffix| !suffix.is_empty() && name.ends_with(&suffix.trim().to_uppercase()))
        })
        .map(|rule| rule.name.clone())
        .unwrap_or_else(|| UNKNOWN_CARRIER.to_string())
}
