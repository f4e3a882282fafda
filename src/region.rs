//! Map viewport computation.
//!
//! Frames a point set with a region centered on the middle of its bounding
//! box. A fixed padding is added to each span so that a single point (or a
//! cluster of identical points) still yields a viewport with non-zero area.

use log::debug;

use crate::geo_utils::compute_bounds;
use crate::{GeoPoint, Positioned, Region, Result};

/// Configuration for region computation
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RegionConfig {
    /// Degrees added to both spans (default: 0.05)
    pub padding_degrees: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            padding_degrees: 0.05,
        }
    }
}

/// Compute the region framing every point.
///
/// The center is the midpoint of the min/max latitude and longitude; each
/// span is `(max - min) + padding`.
///
/// # Errors
///
/// [`GeoError::EmptyInput`](crate::GeoError::EmptyInput) when `points` is
/// empty, [`GeoError::InvalidCoordinate`](crate::GeoError::InvalidCoordinate)
/// on NaN or out-of-range input.
///
/// # Example
/// ```
/// use track_planner::{GeoPoint, RegionConfig, compute_region};
///
/// let points = vec![GeoPoint::new(48.80, 2.30), GeoPoint::new(48.90, 2.40)];
/// let region = compute_region(&points, &RegionConfig::default()).unwrap();
///
/// assert!((region.center_latitude - 48.85).abs() < 1e-9);
/// assert!((region.latitude_span - 0.15).abs() < 1e-9);
/// ```
pub fn compute_region<T: Positioned>(points: &[T], config: &RegionConfig) -> Result<Region> {
    let bounds = compute_bounds(points)?;
    let center = bounds.center();

    let region = Region {
        center_latitude: center.latitude,
        center_longitude: center.longitude,
        latitude_span: (bounds.max_lat - bounds.min_lat) + config.padding_degrees,
        longitude_span: (bounds.max_lng - bounds.min_lng) + config.padding_degrees,
    };

    debug!(
        "Region for {} points: center ({:.5}, {:.5}) span {:.4}x{:.4}",
        points.len(),
        region.center_latitude,
        region.center_longitude,
        region.latitude_span,
        region.longitude_span
    );

    Ok(region)
}

impl Region {
    /// Fixed-span region centered on one point ("center on my position").
    pub fn around(point: GeoPoint, span_degrees: f64) -> Self {
        Self {
            center_latitude: point.latitude,
            center_longitude: point.longitude,
            latitude_span: span_degrees,
            longitude_span: span_degrees,
        }
    }

    /// Center of the region.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_latitude, self.center_longitude)
    }

    /// Whether the point falls inside the framed area (edges included).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (point.latitude - self.center_latitude).abs() <= self.latitude_span / 2.0
            && (point.longitude - self.center_longitude).abs() <= self.longitude_span / 2.0
    }
}
