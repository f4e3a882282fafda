//! Pin de-overlap for the address map.
//!
//! Several imported rows often geocode to the same building, which stacks
//! their pins on one spot. [`spread_markers`] keeps the first pin of each
//! coordinate in place and walks every later duplicate diagonally away from
//! it so each one stays tappable.

use std::collections::HashMap;

use crate::geo_utils::validate_points;
use crate::{GeoPoint, Positioned, Result};

/// Configuration for marker spreading
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SpreadConfig {
    /// Decimal places used to decide that two pins coincide.
    /// Default: 5 (~1.1m)
    pub precision: u32,
    /// Offset added to both latitude and longitude per duplicate, in degrees.
    /// Default: 0.0001 (~11m)
    pub step_degrees: f64,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            precision: 5,
            step_degrees: 0.0001,
        }
    }
}

/// Return the points with duplicates nudged apart.
///
/// Output has the same length and order as the input. The n-th repeat of a
/// rounded coordinate (counting from 0 for the first occurrence) is moved by
/// `n * step_degrees` on both axes. Occurrence counts live only for the
/// duration of the call.
///
/// Pins at the edge of the coordinate range step the other way, so the
/// result always passes [`GeoPoint::is_valid`]: a duplicate at latitude 90
/// moves south, one at longitude 180 moves west.
///
/// # Example
/// ```
/// use track_planner::{GeoPoint, SpreadConfig, spread_markers};
///
/// let pins = vec![GeoPoint::new(48.85, 2.35), GeoPoint::new(48.85, 2.35)];
/// let spread = spread_markers(&pins, &SpreadConfig::default()).unwrap();
///
/// assert_eq!(spread[0], pins[0]);
/// assert!((spread[1].latitude - 48.8501).abs() < 1e-9);
/// ```
pub fn spread_markers<T: Positioned + Clone>(
    points: &[T],
    config: &SpreadConfig,
) -> Result<Vec<T>> {
    validate_points(points)?;

    let mut seen: HashMap<String, u32> = HashMap::with_capacity(points.len());
    let mut moved = 0usize;

    let spread = points
        .iter()
        .map(|item| {
            let pos = item.position();
            let occurrence = seen.entry(coordinate_key(&pos, config.precision)).or_insert(0);
            let n = *occurrence;
            *occurrence += 1;

            let mut out = item.clone();
            if n > 0 {
                let offset = n as f64 * config.step_degrees;
                out.set_position(GeoPoint::new(
                    step_within(pos.latitude, offset, 90.0),
                    step_within(pos.longitude, offset, 180.0),
                ));
                moved += 1;
            }
            out
        })
        .collect();

    if moved > 0 {
        log::debug!("Spread {} of {} markers sharing a coordinate", moved, points.len());
    }

    Ok(spread)
}

/// Move `value` by `offset`, reversing direction past `limit`.
fn step_within(value: f64, offset: f64, limit: f64) -> f64 {
    if value + offset > limit {
        value - offset
    } else {
        value + offset
    }
}

/// Rounded "lat,lng" text used to detect coinciding pins.
fn coordinate_key(point: &GeoPoint, precision: u32) -> String {
    let precision = precision as usize;
    // `+ 0.0` turns -0.0 into 0.0 so both share a key
    let (lat, lng) = (point.latitude + 0.0, point.longitude + 0.0);
    format!("{:.*},{:.*}", precision, lat, precision, lng)
}
