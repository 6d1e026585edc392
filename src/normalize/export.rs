use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;

use super::tables::Table;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    Text(Option<&'a str>),
    Number(Option<f64>),
}

impl<'a> Value<'a> {
    pub fn text(x: &'a str) -> Self {
        Self::Text(Some(x))
    }

    pub fn opt(x: &'a Option<String>) -> Self {
        Self::Text(x.as_deref())
    }

    /// SQL literal: quoted text with `'` doubled, bare numbers, `NULL` for
    /// missing or empty values.
    pub fn sql(&self) -> String {
        match self {
            Self::Text(Some(x)) if !x.is_empty() => format!("'{}'", x.replace('\'', "''")),
            Self::Number(Some(x)) => x.to_string(),
            _ => "NULL".to_string(),
        }
    }

    pub fn field(&self) -> String {
        match self {
            Self::Text(Some(x)) => x.to_string(),
            Self::Number(Some(x)) => x.to_string(),
            _ => String::new(),
        }
    }
}

pub fn insert<T: Table>(row: &T) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        T::NAME,
        T::COLUMNS.join(", "),
        row.values().iter().map(Value::sql).join(", ")
    )
}

pub fn write_inserts<'a, T: Table + 'a>(
    out: &mut impl Write,
    rows: impl IntoIterator<Item = &'a T>,
) -> io::Result<()> {
    writeln!(out, "-- {} table inserts", T::NAME)?;
    for row in rows {
        writeln!(out, "{}", insert(row))?;
    }
    writeln!(out)
}

pub fn sql_file(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Writes one table as CSV, header included even when there are no rows.
pub fn write_table<'a, T: Table + 'a>(path: &Path, rows: impl IntoIterator<Item = &'a T>) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.write_record(row.values().iter().map(Value::field))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::tables::{Item, Organisation};

    #[test]
    fn sql_literals() {
        assert_eq!(Value::text("O'Brien Engineering").sql(), "'O''Brien Engineering'");
        assert_eq!(Value::text("").sql(), "NULL");
        assert_eq!(Value::Text(None).sql(), "NULL");
        assert_eq!(Value::Number(Some(-37.8377841)).sql(), "-37.8377841");
        assert_eq!(Value::Number(None).sql(), "NULL");
    }

    #[test]
    fn organisation_insert() {
        let org = Organisation {
            organisation_id: "ORG1".to_string(),
            organisation_name: Some("Acme's".to_string()),
            billing_street: None,
            billing_city: Some("Bayswater".to_string()),
            billing_state_province: Some("VIC".to_string()),
            billing_zip_postal_code: Some("3153".to_string()),
            formatted_address: None,
            latitude: Some(-37.8377841),
            longitude: Some(145.2801042),
        };
        assert_eq!(
            insert(&org),
            "INSERT INTO Organisations (organisationId, organisationName, billingStreet, billingCity, billingStateProvince, billingZipPostalCode, formattedAddress, latitude, longitude) \
             VALUES ('ORG1', 'Acme''s', NULL, 'Bayswater', 'VIC', '3153', NULL, -37.8377841, 145.2801042);"
        );
    }

    #[test]
    fn insert_block_has_heading_and_blank_line() {
        let items = [Item {
            item_id: "I1".to_string(),
            item_name: "Valves".to_string(),
        }];
        let mut out = Vec::new();
        write_inserts(&mut out, &items).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "-- Items table inserts\nINSERT INTO Items (itemId, itemName) VALUES ('I1', 'Valves');\n\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        write_table::<Item>(&path, []).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "itemId,itemName\n");
    }
}
