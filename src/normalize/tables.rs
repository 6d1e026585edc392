use serde::Deserialize;

use super::export::Value;

/// One row of the enriched CSV, by header name. Columns the file lacks read
/// as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SourceRow {
    #[serde(rename = "Organisation: Organisation ID")]
    pub organisation_id: String,
    #[serde(rename = "Organisation: Organisation Name")]
    pub organisation_name: String,
    #[serde(rename = "Organisation: Billing Street")]
    pub billing_street: String,
    #[serde(rename = "Organisation: Billing City")]
    pub billing_city: String,
    #[serde(rename = "Organisation: Billing State/Province")]
    pub billing_state_province: String,
    #[serde(rename = "Organisation: Billing Zip/Postal Code")]
    pub billing_zip_postal_code: String,
    #[serde(rename = "Formatted_Address")]
    pub formatted_address: String,
    #[serde(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    pub longitude: String,
    #[serde(rename = "Item ID")]
    pub item_id: String,
    #[serde(rename = "Item Name")]
    pub item_name: String,
    // exported with a BOM and a down arrow
    #[serde(rename = "Detailed Item ID  ↓", alias = "\u{feff}Detailed Item ID  ↓")]
    pub detailed_item_id: String,
    #[serde(rename = "Detailed Item Name")]
    pub detailed_item_name: String,
    #[serde(rename = "Sector Mapping ID")]
    pub sector_mapping_id: String,
    #[serde(rename = "Sector Name")]
    pub sector_name: String,
    #[serde(rename = "Organisation Capability")]
    pub organisation_capability: String,
    #[serde(rename = "Capability Type")]
    pub capability_type: String,
    #[serde(rename = "Validation Date")]
    pub validation_date: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub item_id: String,
    pub item_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetailedItem {
    pub detailed_item_id: String,
    pub detailed_item_name: String,
    pub item_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub sector_mapping_id: String,
    pub sector_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Organisation {
    pub organisation_id: String,
    pub organisation_name: Option<String>,
    pub billing_street: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state_province: Option<String>,
    pub billing_zip_postal_code: Option<String>,
    pub formatted_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Organisation {
    /// Fills fields this organisation is still missing from a later row.
    pub fn merge(&mut self, other: Self) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.organisation_name, other.organisation_name);
        fill(&mut self.billing_street, other.billing_street);
        fill(&mut self.billing_city, other.billing_city);
        fill(&mut self.billing_state_province, other.billing_state_province);
        fill(&mut self.billing_zip_postal_code, other.billing_zip_postal_code);
        fill(&mut self.formatted_address, other.formatted_address);
        fill(&mut self.latitude, other.latitude);
        fill(&mut self.longitude, other.longitude);
    }
}

/// Links an organisation to an item, a detailed item and a sector.
#[derive(Clone, Debug, PartialEq)]
pub struct Capability {
    pub organisation_capability: String,
    pub organisation_id: String,
    pub item_id: Option<String>,
    pub detailed_item_id: Option<String>,
    pub capability_type: Option<String>,
    pub validation_date: Option<String>,
    pub sector_mapping_id: Option<String>,
}

/// A normalized table: its name, column order and per-row values.
pub trait Table {
    const NAME: &'static str;
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Value<'_>>;
}

impl Table for Item {
    const NAME: &'static str = "Items";
    const COLUMNS: &'static [&'static str] = &["itemId", "itemName"];

    fn values(&self) -> Vec<Value<'_>> {
        vec![Value::text(&self.item_id), Value::text(&self.item_name)]
    }
}

impl Table for DetailedItem {
    const NAME: &'static str = "DetailedItems";
    const COLUMNS: &'static [&'static str] = &["detailedItemId", "detailedItemName", "itemId"];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::text(&self.detailed_item_id),
            Value::text(&self.detailed_item_name),
            Value::opt(&self.item_id),
        ]
    }
}

impl Table for Sector {
    const NAME: &'static str = "Sectors";
    const COLUMNS: &'static [&'static str] = &["sectorMappingId", "sectorName"];

    fn values(&self) -> Vec<Value<'_>> {
        vec![Value::text(&self.sector_mapping_id), Value::text(&self.sector_name)]
    }
}

impl Table for Organisation {
    const NAME: &'static str = "Organisations";
    const COLUMNS: &'static [&'static str] = &[
        "organisationId",
        "organisationName",
        "billingStreet",
        "billingCity",
        "billingStateProvince",
        "billingZipPostalCode",
        "formattedAddress",
        "latitude",
        "longitude",
    ];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::text(&self.organisation_id),
            Value::opt(&self.organisation_name),
            Value::opt(&self.billing_street),
            Value::opt(&self.billing_city),
            Value::opt(&self.billing_state_province),
            Value::opt(&self.billing_zip_postal_code),
            Value::opt(&self.formatted_address),
            Value::Number(self.latitude),
            Value::Number(self.longitude),
        ]
    }
}

impl Table for Capability {
    const NAME: &'static str = "Capabilities";
    const COLUMNS: &'static [&'static str] = &[
        "organisationCapability",
        "organisationId",
        "itemId",
        "detailedItemId",
        "capabilityType",
        "validationDate",
        "sectorMappingId",
    ];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::text(&self.organisation_capability),
            Value::text(&self.organisation_id),
            Value::opt(&self.item_id),
            Value::opt(&self.detailed_item_id),
            Value::opt(&self.capability_type),
            Value::opt(&self.validation_date),
            Value::opt(&self.sector_mapping_id),
        ]
    }
}
