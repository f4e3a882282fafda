//! Address list import from CSV.
//!
//! The address sheets exported by the field teams carry the dwelling count in
//! column 5 (`NB_LOGEMENTS`) and the full postal address in column 6. The
//! first row is a header. Rows without an address are skipped; everything else
//! is kept as text for the geocoder.

use std::io::Read;

use log::{debug, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{AddressedPoint, GeoPoint, Result};

/// Column layout of the address CSV
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ImportConfig {
    /// Zero-based column holding the unit (dwelling) count. Default: 5
    pub unit_count_column: u32,
    /// Zero-based column holding the full address. Default: 6
    pub address_column: u32,
    /// Skip the first row. Default: true
    pub has_header: bool,
    /// Field separator. Default: `,`
    pub delimiter: u8,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            unit_count_column: 5,
            address_column: 6,
            has_header: true,
            delimiter: b',',
        }
    }
}

/// One usable row of the address sheet, before geocoding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AddressRow {
    /// 1-based line number in the source file
    pub line: u32,
    pub address_label: String,
    pub unit_count: String,
}

impl AddressRow {
    /// Attach the geocoded coordinate.
    pub fn resolve(&self, point: GeoPoint) -> AddressedPoint {
        AddressedPoint::new(
            point.latitude,
            point.longitude,
            self.address_label.clone(),
            self.unit_count.clone(),
        )
    }
}

/// Read the address rows from CSV text.
///
/// Blank lines are ignored, fields are trimmed and rows may have any number
/// of columns. A missing unit count becomes an empty string.
///
/// # Errors
///
/// [`GeoError::Csv`](crate::GeoError::Csv) if the input is not readable CSV
/// (e.g. invalid UTF-8 or an unterminated quote).
///
/// # Example
/// ```
/// use track_planner::{ImportConfig, parse_address_rows};
///
/// let csv = "ID,A,B,C,D,NB_LOGEMENTS,ADRESSE\n\
///            1,,,,,12,\"3 Rue de la Paix, 75002 Paris\"\n";
/// let rows = parse_address_rows(csv.as_bytes(), &ImportConfig::default()).unwrap();
///
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].address_label, "3 Rue de la Paix, 75002 Paris");
/// assert_eq!(rows[0].unit_count, "12");
/// ```
pub fn parse_address_rows<R: Read>(reader: R, config: &ImportConfig) -> Result<Vec<AddressRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(config.has_header)
        .delimiter(config.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as u32);

        let address = record.get(config.address_column as usize).unwrap_or("");
        if address.is_empty() {
            skipped += 1;
            continue;
        }

        let unit_count = record.get(config.unit_count_column as usize).unwrap_or("");
        rows.push(AddressRow {
            line,
            address_label: address.to_string(),
            unit_count: unit_count.to_string(),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} CSV rows without an address", skipped);
    }
    debug!("Imported {} address rows", rows.len());

    Ok(rows)
}
