use std::{fs::read_to_string, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};

use crate::utils::USER_AGENT;

/// Settings for the geocoding run. Every field has a default, so a config
/// file only needs the keys it changes.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocoderConfig {
    pub nominatim_url: String,
    pub photon_url: String,
    /// Passed to Nominatim as `countrycodes`; empty disables the bias.
    pub country_codes: String,
    pub photon_osm_tag: Option<String>,
    /// Minimum spacing between the starts of two provider requests.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub min_interval: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub timeout: Duration,
    pub user_agent: String,
    /// Contact address sent to Nominatim, as its usage policy asks.
    pub email: Option<String>,
    pub report_every: u64,
    pub columns: ColumnNames,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            photon_url: "https://photon.komoot.io".to_string(),
            country_codes: "au".to_string(),
            photon_osm_tag: Some("place".to_string()),
            min_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            user_agent: USER_AGENT.to_string(),
            email: None,
            report_every: 10,
            columns: ColumnNames::default(),
        }
    }
}

impl GeocoderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

/// Header names of the address-bearing input columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    /// Rows with this column blank are skipped. Ignored when the input has
    /// no such column.
    pub organisation_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            street: "Organisation: Billing Street".to_string(),
            city: "Organisation: Billing City".to_string(),
            state: "Organisation: Billing State/Province".to_string(),
            postcode: "Organisation: Billing Zip/Postal Code".to_string(),
            organisation_id: "Organisation: Organisation ID".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "min_interval: 1.5\nemail: ops@example.com\ncolumns:\n  street: Street"
        )
        .unwrap();

        let config = GeocoderConfig::load(file.path()).unwrap();
        assert_eq!(config.min_interval, Duration::from_millis(1500));
        assert_eq!(config.email.as_deref(), Some("ops@example.com"));
        assert_eq!(config.columns.street, "Street");
        assert_eq!(config.columns.city, "Organisation: Billing City");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.country_codes, "au");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_intervall: 2").unwrap();
        assert!(GeocoderConfig::load(file.path()).is_err());
    }
}
