//! Splits the enriched CSV into the Items, DetailedItems, Sectors,
//! Organisations and Capabilities tables.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fs,
    io::Write,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use tracing::{debug, info};

use self::tables::{Capability, DetailedItem, Item, Organisation, Sector, SourceRow};

mod export;
mod tables;

#[derive(Debug, clap::Args)]
pub struct NormalizeArgs {
    /// Enriched CSV file written by `geocode`
    pub input: PathBuf,

    /// Output SQL file
    #[arg(short, long, default_value = "database_inserts.sql")]
    pub sql: PathBuf,

    /// Output directory for the per-table CSV files
    #[arg(short, long, default_value = "normalized_csv")]
    pub csv_dir: PathBuf,

    /// Only generate the SQL file
    #[arg(long, conflicts_with = "csv_only")]
    pub sql_only: bool,

    /// Only generate the CSV files
    #[arg(long)]
    pub csv_only: bool,
}

pub fn main(args: NormalizeArgs) -> Result<()> {
    let normalizer = Normalizer::from_path(&args.input)?;

    if !args.csv_only {
        info!("Writing SQL INSERT statements to {}", args.sql.display());
        normalizer.write_sql(&args.sql)?;
    }
    if !args.sql_only {
        info!("Writing CSV files to {}", args.csv_dir.display());
        fs::create_dir_all(&args.csv_dir)
            .with_context(|| format!("Failed to create {}", args.csv_dir.display()))?;
        normalizer.write_csv(&args.csv_dir)?;
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct Normalizer {
    pub items: BTreeMap<String, Item>,
    pub detailed_items: BTreeMap<String, DetailedItem>,
    pub sectors: BTreeMap<String, Sector>,
    pub organisations: BTreeMap<String, Organisation>,
    pub capabilities: Vec<Capability>,
    // grouped rows leave these blank after the first row of a group
    current_detailed_item: Option<String>,
    current_sector: Option<String>,
}

impl Normalizer {
    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Processing {}...", path.display());
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut normalizer = Self::default();
        for (i, row) in reader.deserialize::<SourceRow>().enumerate() {
            // line numbers as a spreadsheet shows them
            let line = i + 2;
            normalizer.push(row.with_context(|| format!("Failed to read line {line}"))?);
            if line % 100 == 0 {
                debug!("Processed {line} rows...");
            }
        }

        info!(
            "Found {} items, {} detailed items, {} sectors, {} organisations, {} capabilities",
            normalizer.items.len(),
            normalizer.detailed_items.len(),
            normalizer.sectors.len(),
            normalizer.organisations.len(),
            normalizer.capabilities.len()
        );
        Ok(normalizer)
    }

    pub fn push(&mut self, row: SourceRow) {
        let Some(organisation_id) = text(&row.organisation_id).map(str::to_uppercase) else {
            return;
        };

        let item_id = text(&row.item_id);
        if let (Some(id), Some(name)) = (item_id, text(&row.item_name)) {
            self.items.insert(
                id.to_string(),
                Item {
                    item_id: id.to_string(),
                    item_name: name.to_string(),
                },
            );
        }

        if let Some(id) = text(&row.detailed_item_id).filter(|x| *x != "Subtotal") {
            self.current_detailed_item = Some(id.to_string());
            if let Some(name) = text(&row.detailed_item_name) {
                self.detailed_items.insert(
                    id.to_string(),
                    DetailedItem {
                        detailed_item_id: id.to_string(),
                        detailed_item_name: name.to_string(),
                        item_id: item_id.map(String::from),
                    },
                );
            }
        }

        if let Some(id) = text(&row.sector_mapping_id) {
            self.current_sector = Some(id.to_string());
        }
        if let (Some(id), Some(name)) = (&self.current_sector, text(&row.sector_name)) {
            self.sectors.insert(
                id.clone(),
                Sector {
                    sector_mapping_id: id.clone(),
                    sector_name: name.to_string(),
                },
            );
        }

        let organisation = Organisation {
            organisation_id: organisation_id.clone(),
            organisation_name: owned(&row.organisation_name),
            billing_street: owned(&row.billing_street),
            billing_city: owned(&row.billing_city),
            billing_state_province: owned(&row.billing_state_province),
            billing_zip_postal_code: owned(&row.billing_zip_postal_code),
            formatted_address: owned(&row.formatted_address),
            latitude: coordinate(&row.latitude),
            longitude: coordinate(&row.longitude),
        };
        match self.organisations.entry(organisation_id.clone()) {
            Entry::Vacant(x) => {
                x.insert(organisation);
            }
            Entry::Occupied(mut x) => x.get_mut().merge(organisation),
        }

        if let Some(capability) = text(&row.organisation_capability) {
            self.capabilities.push(Capability {
                organisation_capability: capability.to_string(),
                organisation_id,
                item_id: item_id.map(String::from),
                detailed_item_id: self.current_detailed_item.clone(),
                capability_type: owned(&row.capability_type),
                validation_date: validation_date(&row.validation_date),
                sector_mapping_id: self.current_sector.clone(),
            });
        }
    }

    pub fn write_sql(&self, path: &Path) -> Result<()> {
        let mut out = export::sql_file(path)?;
        writeln!(out, "-- SQL INSERT statements for ICN Database")?;
        writeln!(out)?;
        export::write_inserts(&mut out, self.items.values())?;
        export::write_inserts(&mut out, self.detailed_items.values())?;
        export::write_inserts(&mut out, self.sectors.values())?;
        export::write_inserts(&mut out, self.organisations.values())?;
        export::write_inserts(&mut out, &self.capabilities)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, dir: &Path) -> Result<()> {
        export::write_table(&dir.join("items.csv"), self.items.values())?;
        export::write_table(&dir.join("detailed_items.csv"), self.detailed_items.values())?;
        export::write_table(&dir.join("sectors.csv"), self.sectors.values())?;
        export::write_table(&dir.join("organisations.csv"), self.organisations.values())?;
        export::write_table(&dir.join("capabilities.csv"), &self.capabilities)?;
        Ok(())
    }
}

fn text(raw: &str) -> Option<&str> {
    Some(raw.trim()).filter(|x| !x.is_empty())
}

fn owned(raw: &str) -> Option<String> {
    text(raw).map(String::from)
}

fn coordinate(raw: &str) -> Option<f64> {
    text(raw)?.parse().ok().filter(|x: &f64| x.is_finite())
}

/// `dd/mm/yyyy` becomes `yyyy-mm-dd`; values without a slash pass through
/// untouched and invalid slash dates are dropped.
fn validation_date(raw: &str) -> Option<String> {
    let raw = text(raw)?;
    if !raw.contains('/') {
        return Some(raw.to_string());
    }

    // plain digits only, four-digit year
    let digits = |x: &str, len: RangeInclusive<usize>| {
        len.contains(&x.len()) && x.bytes().all(|b| b.is_ascii_digit())
    };
    let (day, month, year) = raw.split('/').collect_tuple()?;
    if !(digits(day, 1..=2) && digits(month, 1..=2) && digits(year, 4..=4)) {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .ok()
        .filter(|x| x.year() > 0)
        .map(|x| x.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const HEADER: &str = "\u{feff}Detailed Item ID  ↓,Detailed Item Name,Item ID,Item Name,Sector Mapping ID,Sector Name,Organisation: Organisation ID,Organisation: Organisation Name,Organisation: Billing Street,Organisation: Billing City,Organisation: Billing State/Province,Organisation: Billing Zip/Postal Code,Organisation Capability,Capability Type,Validation Date,Formatted_Address,Latitude,Longitude,Geocoding_Service,Geocoding_Status";

    fn normalize(rows: &[&str]) -> Normalizer {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.csv");
        let mut body = format!("{HEADER}\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(&path, body).unwrap();
        Normalizer::from_path(&path).unwrap()
    }

    fn sample() -> Normalizer {
        normalize(&[
            "DI1,Hydraulic valves,I1,Valves,S1,Defence,org1,Acme,885 Mountain Highway,Bayswater,VIC,3153,CAP1,Manufacturer,15/03/2023,\"885 Mountain Highway, Bayswater, VIC, 3153\",-37.8377841,145.2801042,nominatim,success",
            ",,I1,Valves,,,ORG1,,,,,,CAP2,Supplier,2023-04-01,,,,,skipped",
            ",,I1,Valves,S2,Mining,ORG2,Beta,1 Hay St,Perth,WA,6000,CAP3,,31/02/2023,,,,,failed",
            "Subtotal,,,,,,,,,,,,,,,,,,,skipped",
            "DI2,Pumps,I2,Pumping,S1,Defence,,No Org,,,,,CAP4,,,,,,,skipped",
        ])
    }

    #[test]
    fn builds_lookup_tables() {
        let n = sample();
        assert_eq!(n.items.keys().collect::<Vec<_>>(), vec!["I1"]);
        assert_eq!(
            n.detailed_items["DI1"],
            DetailedItem {
                detailed_item_id: "DI1".to_string(),
                detailed_item_name: "Hydraulic valves".to_string(),
                item_id: Some("I1".to_string()),
            }
        );
        assert!(!n.detailed_items.contains_key("DI2"));
        assert_eq!(n.sectors.keys().collect::<Vec<_>>(), vec!["S1", "S2"]);
    }

    #[test]
    fn organisation_ids_are_case_folded_and_merged() {
        let n = sample();
        assert_eq!(n.organisations.len(), 2);
        let acme = &n.organisations["ORG1"];
        assert_eq!(acme.organisation_name.as_deref(), Some("Acme"));
        assert_eq!(acme.latitude, Some(-37.8377841));
        assert_eq!(
            acme.formatted_address.as_deref(),
            Some("885 Mountain Highway, Bayswater, VIC, 3153")
        );
        assert_eq!(n.organisations["ORG2"].latitude, None);
    }

    #[test]
    fn capabilities_carry_grouped_ids_forward() {
        let n = sample();
        let got: Vec<_> = n
            .capabilities
            .iter()
            .map(|x| {
                (
                    x.organisation_capability.as_str(),
                    x.organisation_id.as_str(),
                    x.detailed_item_id.as_deref(),
                    x.sector_mapping_id.as_deref(),
                    x.validation_date.as_deref(),
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("CAP1", "ORG1", Some("DI1"), Some("S1"), Some("2023-03-15")),
                ("CAP2", "ORG1", Some("DI1"), Some("S1"), Some("2023-04-01")),
                ("CAP3", "ORG2", Some("DI1"), Some("S2"), None),
            ]
        );
    }

    #[test]
    fn writes_sql_and_csv() {
        let n = sample();
        let dir = tempfile::tempdir().unwrap();
        let sql = dir.path().join("inserts.sql");
        n.write_sql(&sql).unwrap();
        n.write_csv(dir.path()).unwrap();

        let sql = fs::read_to_string(sql).unwrap();
        assert!(sql.starts_with("-- SQL INSERT statements for ICN Database\n\n-- Items table inserts\n"));
        assert!(sql.contains(
            "INSERT INTO Sectors (sectorMappingId, sectorName) VALUES ('S2', 'Mining');"
        ));
        assert!(sql.contains("VALUES ('CAP3', 'ORG2', 'I1', 'DI1', NULL, NULL, 'S2');"));

        let orgs = fs::read_to_string(dir.path().join("organisations.csv")).unwrap();
        let mut lines = orgs.lines();
        assert_eq!(
            lines.next(),
            Some("organisationId,organisationName,billingStreet,billingCity,billingStateProvince,billingZipPostalCode,formattedAddress,latitude,longitude")
        );
        assert_eq!(
            lines.next(),
            Some("ORG1,Acme,885 Mountain Highway,Bayswater,VIC,3153,\"885 Mountain Highway, Bayswater, VIC, 3153\",-37.8377841,145.2801042")
        );
        for name in ["items", "detailed_items", "sectors", "capabilities"] {
            assert!(dir.path().join(format!("{name}.csv")).exists());
        }
    }

    #[rstest]
    #[case("15/03/2023", Some("2023-03-15"))]
    #[case("1/2/2024", Some("2024-02-01"))]
    #[case("29/02/2024", Some("2024-02-29"))]
    #[case("29/02/2023", None)]
    #[case("31/13/2023", None)]
    #[case("15/03/23", None)]
    #[case("15/03/+2023", None)]
    #[case("15 / 03 / 2023", None)]
    #[case("01/01/0000", None)]
    #[case("soon/ish", None)]
    #[case("2023-04-01", Some("2023-04-01"))]
    #[case("  ", None)]
    fn validation_dates(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(validation_date(raw).as_deref(), expected);
    }

    #[rstest]
    #[case("-37.8377841", Some(-37.8377841))]
    #[case(" 145.28 ", Some(145.28))]
    #[case("", None)]
    #[case("NaN", None)]
    #[case("north", None)]
    fn coordinates(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(coordinate(raw), expected);
    }
}
