use crate::aggregate::Kpi;
use crate::normalize::Lookups;
use crate::types::CarrierRule;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Targets the KPIs are judged against. Rates are percentages, the rating
/// is on /5 and the sentiment on /10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Objectives {
    pub average_rating: f64,
    pub punctuality_rate: f64,
    /// Maximum acceptable share of failed deliveries.
    pub failure_rate: f64,
    pub success_rate: f64,
    pub forced_on_site_rate: f64,
    pub forced_no_contact_rate: f64,
    pub web_completion_rate: f64,
    pub average_sentiment: f64,
}

impl Default for Objectives {
    fn default() -> Self {
        Objectives {
            average_rating: 4.5,
            punctuality_rate: 90.0,
            failure_rate: 5.0,
            success_rate: 95.0,
            forced_on_site_rate: 5.0,
            forced_no_contact_rate: 5.0,
            web_completion_rate: 10.0,
            average_sentiment: 7.0,
        }
    }
}

impl Objectives {
    pub fn target(&self, kpi: Kpi) -> f64 {
        match kpi {
            Kpi::SuccessRate => self.success_rate,
            Kpi::AverageRating => self.average_rating,
            Kpi::AverageSentiment => self.average_sentiment,
            Kpi::PunctualityRate => self.punctuality_rate,
            Kpi::FailureRate => self.failure_rate,
            Kpi::ForcedOnSiteRate => self.forced_on_site_rate,
            Kpi::ForcedNoContactRate => self.forced_no_contact_rate,
            Kpi::WebCompletionRate => self.web_completion_rate,
        }
    }
}

/// Contents of the optional JSON settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub objectives: Objectives,
    /// Replaces the built-in carrier rules when present.
    pub carriers: Option<Vec<CarrierRule>>,
    /// Extends the built-in warehouse to depot table.
    pub warehouses: HashMap<String, String>,
}

impl Settings {
    /// Read settings from `path`, or fall back to the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn lookups(&self) -> Lookups {
        let mut lookups = Lookups::default();
        if let Some(carriers) = &self.carriers {
            lookups.carriers = carriers.clone();
        }
        lookups.warehouses = self.warehouses.clone();
        lookups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_objectives_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "objectives": { "averageRating": 4.0, "failureRate": 3 } }"#)
                .unwrap();
        assert_eq!(settings.objectives.average_rating, 4.0);
        assert_eq!(settings.objectives.failure_rate, 3.0);
        assert_eq!(settings.objectives.punctuality_rate, 90.0);
        assert!(settings.carriers.is_none());
    }

    #[test]
    fn test_lookups_from_settings() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "carriers": [{ "name": "BREIZH", "suffixes": ["BZH"] }],
                "warehouses": { "Quimper": "Dépôt Bretagne" }
            }"#,
        )
        .unwrap();
        let lookups = settings.lookups();
        assert_eq!(lookups.carriers.len(), 1);
        assert_eq!(lookups.warehouses.get("Quimper").map(String::as_str), Some("Dépôt Bretagne"));
    }

    #[test]
    fn test_target_covers_every_kpi() {
        let objectives = Objectives::default();
        for kpi in Kpi::ALL {
            assert!(objectives.target(kpi) > 0.0);
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/settings.json"))).is_err());
        assert_eq!(Settings::load(None).unwrap().objectives, Objectives::default());
    }
}
