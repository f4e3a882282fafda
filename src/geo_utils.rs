//! # Geographic Utilities
//!
//! Distance, bounds and validation helpers shared by the planner routines.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`path_distance`] | Total length of a recorded path in meters |
//! | [`compute_bounds`] | Bounding box of a point set |
//! | [`squared_planar_distance`] | Cheap degree-space distance for nearest-neighbor ranking |
//! | [`validate_points`] | Reject NaN / out-of-range coordinates |
//!
//! ## Example
//!
//! ```rust
//! use track_planner::{TimestampedFix, geo_utils};
//!
//! let path = vec![
//!     TimestampedFix::new(48.8566, 2.3522, None, 0),
//!     TimestampedFix::new(48.8566, 2.3532, None, 1_000),
//! ];
//!
//! let meters = geo_utils::path_distance(&path).unwrap();
//! assert!((meters - 73.2).abs() < 0.7);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a spherical Earth of radius
//! [`EARTH_RADIUS_METERS`]. Nearest-neighbor ranking uses squared distance in
//! raw degrees instead, which is only meaningful over small extents away
//! from the poles and the antimeridian.

use geo::{BoundingRect, MultiPoint, Point};

use crate::{Bounds, GeoError, GeoPoint, Positioned, Result};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two points in meters.
///
/// # Example
///
/// ```rust
/// use track_planner::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_500.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let d_phi = (p2.latitude - p1.latitude).to_radians();
    let d_lambda = (p2.longitude - p1.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Sum of haversine distances between consecutive points.
///
/// Empty and single-point paths are 0. Fails on the first invalid
/// coordinate without returning a partial sum.
pub fn path_distance<T: Positioned>(points: &[T]) -> Result<f64> {
    validate_points(points)?;

    if points.len() < 2 {
        return Ok(0.0);
    }

    Ok(points
        .windows(2)
        .map(|w| haversine_distance(&w[0].position(), &w[1].position()))
        .sum())
}

/// Squared Euclidean distance in degree space, `Δlat² + Δlng²`.
///
/// Preserves nearest-neighbor ordering without a square root. Not a
/// geographic distance.
#[inline]
pub fn squared_planar_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = b.latitude - a.latitude;
    let d_lng = b.longitude - a.longitude;
    d_lat * d_lat + d_lng * d_lng
}

// =============================================================================
// Bounds and Validation
// =============================================================================

/// Bounding box enclosing every point.
///
/// # Errors
///
/// [`GeoError::EmptyInput`] for an empty slice, [`GeoError::InvalidCoordinate`]
/// if any point is invalid.
pub fn compute_bounds<T: Positioned>(points: &[T]) -> Result<Bounds> {
    validate_points(points)?;

    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| {
            let pos = p.position();
            Point::new(pos.longitude, pos.latitude)
        })
        .collect();

    let rect = multi.bounding_rect().ok_or(GeoError::EmptyInput)?;

    Ok(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Check every coordinate, reporting the first bad one by index.
pub fn validate_points<T: Positioned>(points: &[T]) -> Result<()> {
    for (index, p) in points.iter().enumerate() {
        let pos = p.position();
        if !pos.is_valid() {
            return Err(GeoError::InvalidCoordinate {
                index: index as u32,
                latitude: pos.latitude,
                longitude: pos.longitude,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
