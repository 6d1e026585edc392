use core::fmt;

use geo::Point;

/// Columns appended to every input row, in output order.
pub const DERIVED_COLUMNS: [&str; 5] = [
    "Formatted_Address",
    "Latitude",
    "Longitude",
    "Geocoding_Service",
    "Geocoding_Status",
];

/// One data row of the input file, identified by its zero-based index
/// (the header is not counted).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressRecord {
    pub index: u64,
    pub fields: Vec<String>,
}

impl AddressRecord {
    pub fn get(&self, column: usize) -> &str {
        self.fields.get(column).map_or("", String::as_str)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Service {
    Nominatim,
    Photon,
}

impl Service {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Nominatim => "nominatim",
            Self::Photon => "photon",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Success,
    Failed,
    EmptyAddress,
    Skipped,
}

impl Status {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::EmptyAddress => "empty_address",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// A provider's top-ranked match. `point` is WGS84 with x = longitude and
/// y = latitude, exactly as the provider returned them.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub point: Point,
    pub label: Option<String>,
}

impl Candidate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            point: Point::new(longitude, latitude),
            label: None,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.point.y()
    }

    pub fn longitude(&self) -> f64 {
        self.point.x()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub point: Option<Point>,
    pub service: Option<Service>,
    pub status: Status,
}

impl GeocodeResult {
    pub fn success(address: &str, service: Service, candidate: Candidate) -> Self {
        Self {
            formatted_address: address.to_string(),
            point: Some(candidate.point),
            service: Some(service),
            status: Status::Success,
        }
    }

    pub fn failed(address: &str) -> Self {
        Self {
            formatted_address: address.to_string(),
            point: None,
            service: None,
            status: Status::Failed,
        }
    }

    pub fn empty_address() -> Self {
        Self::blank(Status::EmptyAddress)
    }

    pub fn skipped() -> Self {
        Self::blank(Status::Skipped)
    }

    fn blank(status: Status) -> Self {
        Self {
            formatted_address: String::new(),
            point: None,
            service: None,
            status,
        }
    }

    /// Values for [`DERIVED_COLUMNS`]. Coordinates are printed unrounded.
    pub fn columns(&self) -> [String; 5] {
        let (lat, lon) = match self.point {
            Some(p) => (p.y().to_string(), p.x().to_string()),
            None => (String::new(), String::new()),
        };
        [
            self.formatted_address.clone(),
            lat,
            lon,
            self.service.map(|x| x.to_string()).unwrap_or_default(),
            self.status.to_string(),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct EnrichedRecord {
    pub record: AddressRecord,
    pub result: GeocodeResult,
}

impl EnrichedRecord {
    /// The output row: input fields padded or cut to `width`, then the
    /// derived columns.
    pub fn to_row(&self, width: usize) -> Vec<String> {
        let mut row = self.record.fields.clone();
        row.resize(width, String::new());
        row.extend(self.result.columns());
        row
    }
}
