//! # Track Planner
//!
//! Geometry core for the GPS tracking app: recorded path distances, map
//! viewports, pin de-overlap and address route ordering.
//!
//! This library provides:
//! - Map region computation (bounding center + padded span)
//! - Marker spreading for pins sharing a coordinate
//! - Nearest-neighbor visiting order for geocoded address lists
//! - Haversine distance of recorded tracks and a recording session
//! - CSV address import and (optionally) a rate-limited geocoding client
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch distances with rayon
//! - **`http`** - Enable the HTTP geocoding client
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use track_planner::{AddressedPoint, RegionConfig, compute_region, order_addresses};
//!
//! let stops = vec![
//!     AddressedPoint::new(0.0, 0.0, "1 Main St", "4"),
//!     AddressedPoint::new(0.0, 3.0, "3 Main St", "2"),
//!     AddressedPoint::new(0.0, 1.0, "2 Main St", "1"),
//! ];
//!
//! let tour = order_addresses(&stops).unwrap();
//! let labels: Vec<&str> = tour.iter().map(|s| s.address.address_label.as_str()).collect();
//! assert_eq!(labels, ["1 Main St", "2 Main St", "3 Main St"]);
//!
//! let region = compute_region(&tour, &RegionConfig::default()).unwrap();
//! assert!((region.longitude_span - 3.05).abs() < 1e-9);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{GeoError, Result};

pub mod geo_utils;
pub use geo_utils::{haversine_distance, path_distance};

pub mod region;
pub use region::{compute_region, RegionConfig};

pub mod markers;
pub use markers::{spread_markers, SpreadConfig};

pub mod routing;
pub use routing::{
    order_addresses, order_addresses_with, tour_length, GreedyNearest, IndexedNearest,
    TourStrategy,
};

pub mod recording;
pub use recording::{
    track_distances, RecordedTrack, RecorderConfig, RecordingState, TrackRecorder,
};

pub mod import;
pub use import::{parse_address_rows, AddressRow, ImportConfig};

// HTTP module for address geocoding
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{resolve_outcomes, GeocodeOutcome, Geocoder, GeocoderConfig};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrackPlannerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use track_planner::GeoPoint;
/// let point = GeoPoint::new(48.8566, 2.3522); // Paris
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Anything that sits at a single coordinate.
///
/// Lets the region, marker and distance routines run directly over
/// addresses, tour stops and recorded fixes without copying them into
/// plain points first.
pub trait Positioned {
    fn position(&self) -> GeoPoint;

    /// Move the value to a new coordinate, keeping everything else.
    fn set_position(&mut self, to: GeoPoint);
}

impl Positioned for GeoPoint {
    fn position(&self) -> GeoPoint {
        *self
    }

    fn set_position(&mut self, to: GeoPoint) {
        *self = to;
    }
}

/// A geocoded address from the imported list.
///
/// `unit_count` is carried as the raw text of the CSV cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AddressedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub address_label: String,
    pub unit_count: String,
}

impl AddressedPoint {
    pub fn new(
        latitude: f64,
        longitude: f64,
        address_label: impl Into<String>,
        unit_count: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            address_label: address_label.into(),
            unit_count: unit_count.into(),
        }
    }
}

impl Positioned for AddressedPoint {
    fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    fn set_position(&mut self, to: GeoPoint) {
        self.latitude = to.latitude;
        self.longitude = to.longitude;
    }
}

/// An address with its 1-based position in a tour.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OrderedAddressedPoint {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub address: AddressedPoint,
    pub visit_order: u32,
}

impl Positioned for OrderedAddressedPoint {
    fn position(&self) -> GeoPoint {
        self.address.position()
    }

    fn set_position(&mut self, to: GeoPoint) {
        self.address.set_position(to);
    }
}

/// A single location reading from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimestampedFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in meters, when the receiver reports one
    pub altitude: Option<f64>,
    /// Capture time (Unix epoch milliseconds)
    #[cfg_attr(feature = "serde", serde(rename = "timestamp"))]
    pub captured_at: i64,
}

impl TimestampedFix {
    pub fn new(latitude: f64, longitude: f64, altitude: Option<f64>, captured_at: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            captured_at,
        }
    }
}

impl Positioned for TimestampedFix {
    fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    fn set_position(&mut self, to: GeoPoint) {
        self.latitude = to.latitude;
        self.longitude = to.longitude;
    }
}

/// Bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Map viewport: a center and the latitude/longitude extent to frame.
///
/// Serialized with the field names map widgets expect
/// (`latitude`, `longitude`, `latitudeDelta`, `longitudeDelta`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    #[cfg_attr(feature = "serde", serde(rename = "latitude"))]
    pub center_latitude: f64,
    #[cfg_attr(feature = "serde", serde(rename = "longitude"))]
    pub center_longitude: f64,
    #[cfg_attr(feature = "serde", serde(rename = "latitudeDelta"))]
    pub latitude_span: f64,
    #[cfg_attr(feature = "serde", serde(rename = "longitudeDelta"))]
    pub longitude_span: f64,
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info, warn};

    /// Compute the map region framing all points.
    #[uniffi::export]
    pub fn ffi_compute_region(
        points: Vec<GeoPoint>,
        config: RegionConfig,
    ) -> std::result::Result<Region, GeoError> {
        init_logging();
        debug!("[TrackPlannerRust] compute_region called with {} points", points.len());
        compute_region(&points, &config)
    }

    /// Compute the map region from a flat `[lat1, lng1, lat2, lng2, ...]` buffer.
    #[uniffi::export]
    pub fn ffi_compute_region_flat(
        coords: Vec<f64>,
        config: RegionConfig,
    ) -> std::result::Result<Region, GeoError> {
        init_logging();
        let points = points_from_flat(&coords)?;
        compute_region(&points, &config)
    }

    /// Nudge pins that share a coordinate apart.
    #[uniffi::export]
    pub fn ffi_spread_markers(
        addresses: Vec<OrderedAddressedPoint>,
        config: SpreadConfig,
    ) -> std::result::Result<Vec<OrderedAddressedPoint>, GeoError> {
        init_logging();
        debug!("[TrackPlannerRust] spread_markers called with {} pins", addresses.len());
        spread_markers(&addresses, &config)
    }

    /// Spread a flat `[lat1, lng1, ...]` buffer, returning the same layout.
    #[uniffi::export]
    pub fn ffi_spread_markers_flat(
        coords: Vec<f64>,
        config: SpreadConfig,
    ) -> std::result::Result<Vec<f64>, GeoError> {
        init_logging();
        let points = points_from_flat(&coords)?;
        let spread = spread_markers(&points, &config)?;
        Ok(spread
            .iter()
            .flat_map(|p| [p.latitude, p.longitude])
            .collect())
    }

    /// Order geocoded addresses into a nearest-neighbor tour.
    ///
    /// Lists above a few hundred stops are served from the R-tree strategy.
    #[uniffi::export]
    pub fn ffi_order_addresses(
        addresses: Vec<AddressedPoint>,
    ) -> std::result::Result<Vec<OrderedAddressedPoint>, GeoError> {
        init_logging();
        info!("[TrackPlannerRust] order_addresses called with {} addresses", addresses.len());

        let start = std::time::Instant::now();
        let tour = if addresses.len() > INDEXED_TOUR_THRESHOLD {
            order_addresses_with(&addresses, &IndexedNearest)?
        } else {
            order_addresses(&addresses)?
        };
        info!("[TrackPlannerRust] Ordered {} stops in {:?}", tour.len(), start.elapsed());

        Ok(tour)
    }

    /// Total haversine length of a recorded path in meters.
    #[uniffi::export]
    pub fn ffi_path_distance(path: Vec<TimestampedFix>) -> std::result::Result<f64, GeoError> {
        init_logging();
        path_distance(&path)
    }

    /// Distances for many recorded tracks at once (history screen).
    #[uniffi::export]
    pub fn ffi_track_distances(
        tracks: Vec<RecordedTrack>,
    ) -> std::result::Result<Vec<f64>, GeoError> {
        init_logging();
        info!("[TrackPlannerRust] track_distances called for {} tracks", tracks.len());
        track_distances(&tracks)
    }

    /// Parse the address CSV picked by the user.
    #[uniffi::export]
    pub fn ffi_parse_address_csv(
        content: String,
        config: ImportConfig,
    ) -> std::result::Result<Vec<AddressRow>, GeoError> {
        init_logging();
        parse_address_rows(content.as_bytes(), &config)
    }

    /// Geocode imported rows; failures take the default fallback coordinate.
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn ffi_geocode_addresses(
        api_key: String,
        rows: Vec<AddressRow>,
    ) -> std::result::Result<Vec<AddressedPoint>, GeoError> {
        init_logging();
        crate::http::geocode_rows_sync(GeocoderConfig::with_api_key(api_key), rows)
    }

    #[uniffi::export]
    pub fn default_region_config() -> RegionConfig {
        RegionConfig::default()
    }

    #[uniffi::export]
    pub fn default_spread_config() -> SpreadConfig {
        SpreadConfig::default()
    }

    #[uniffi::export]
    pub fn default_import_config() -> ImportConfig {
        ImportConfig::default()
    }

    const INDEXED_TOUR_THRESHOLD: usize = 200;

    /// Unpack `[lat1, lng1, lat2, lng2, ...]`. An odd-length buffer is an
    /// unpaired trailing latitude and is rejected.
    pub(super) fn points_from_flat(coords: &[f64]) -> Result<Vec<GeoPoint>> {
        if coords.len() % 2 != 0 {
            let index = coords.len() / 2;
            warn!(
                "[TrackPlannerRust] Flat coordinate buffer has odd length {}",
                coords.len()
            );
            return Err(GeoError::InvalidCoordinate {
                index: index as u32,
                latitude: coords[coords.len() - 1],
                longitude: f64::NAN,
            });
        }

        Ok(coords
            .chunks_exact(2)
            .map(|chunk| GeoPoint::new(chunk[0], chunk[1]))
            .collect())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(48.8566, 2.3522).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_set_position_keeps_payload() {
        let mut stop = OrderedAddressedPoint {
            address: AddressedPoint::new(1.0, 2.0, "12 Rue de Rivoli", "8"),
            visit_order: 3,
        };
        stop.set_position(GeoPoint::new(1.5, 2.5));
        assert_eq!(stop.position(), GeoPoint::new(1.5, 2.5));
        assert_eq!(stop.address.address_label, "12 Rue de Rivoli");
        assert_eq!(stop.address.unit_count, "8");
        assert_eq!(stop.visit_order, 3);

        let mut fix = TimestampedFix::new(1.0, 2.0, Some(35.0), 1_700_000_000_000);
        fix.set_position(GeoPoint::new(3.0, 4.0));
        assert_eq!(fix.altitude, Some(35.0));
        assert_eq!(fix.captured_at, 1_700_000_000_000);
    }

    #[cfg(feature = "ffi")]
    #[test]
    fn test_flat_buffer_odd_length_rejected() {
        let points = ffi::points_from_flat(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(points, vec![GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)]);

        let result = ffi::points_from_flat(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(GeoError::InvalidCoordinate { index: 1, latitude, .. }) if latitude == 3.0
        ));
    }

    #[test]
    fn test_bounds_center() {
        let bounds = Bounds {
            min_lat: 10.0,
            max_lat: 20.0,
            min_lng: -4.0,
            max_lng: 2.0,
        };
        assert_eq!(bounds.center(), GeoPoint::new(15.0, -1.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_region_serializes_with_map_field_names() {
        let region = Region {
            center_latitude: 48.0,
            center_longitude: 2.0,
            latitude_span: 0.05,
            longitude_span: 0.06,
        };
        let json = serde_json::to_value(region).unwrap();
        assert_eq!(json["latitude"], 48.0);
        assert_eq!(json["longitudeDelta"], 0.06);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_ordered_address_flattens() {
        let stop = OrderedAddressedPoint {
            address: AddressedPoint::new(1.0, 2.0, "5 Quai Voltaire", "3"),
            visit_order: 1,
        };
        let json = serde_json::to_value(&stop).unwrap();
        assert_eq!(json["addressLabel"], "5 Quai Voltaire");
        assert_eq!(json["unitCount"], "3");
        assert_eq!(json["visitOrder"], 1);
    }
}
