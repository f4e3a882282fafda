//! # Address Route Ordering
//!
//! Builds a visiting order ("tour") over geocoded addresses using the greedy
//! nearest-neighbor heuristic.
//!
//! ## Algorithm
//! 1. Lists of 0 or 1 addresses are returned as-is, numbered from 1
//! 2. The tour starts at the first input address
//! 3. Repeatedly append the closest unvisited address to the last one added
//! 4. Ties go to the address that came first in the input
//!
//! "Closest" is squared Euclidean distance in raw degrees
//! ([`squared_planar_distance`]). That ranking is only sound for the small,
//! city-scale lists this is used for; it is wrong near the poles and across
//! the antimeridian, and the tour is not globally optimal.
//!
//! The selection rule is pluggable through [`TourStrategy`]. [`GreedyNearest`]
//! is the O(N²) scan; [`IndexedNearest`] answers the same queries from an
//! R-tree and yields the identical tour for larger lists.

use std::time::Instant;

use log::{debug, info};
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::geo_utils::{path_distance, squared_planar_distance, validate_points};
use crate::{AddressedPoint, GeoPoint, OrderedAddressedPoint, Result};

/// Strategy for choosing the visiting order of a point list.
///
/// Implementations receive at least two valid points and must return a
/// permutation of `0..points.len()` that starts with `0`.
pub trait TourStrategy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Indices into `points` in visiting order.
    fn visit_order(&self, points: &[GeoPoint]) -> Vec<usize>;
}

/// Linear-scan nearest neighbor.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyNearest;

impl TourStrategy for GreedyNearest {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn visit_order(&self, points: &[GeoPoint]) -> Vec<usize> {
        let mut remaining: Vec<usize> = (1..points.len()).collect();
        let mut tour = Vec::with_capacity(points.len());
        tour.push(0);

        while !remaining.is_empty() {
            let last = points[tour[tour.len() - 1]];

            let mut nearest_pos = 0;
            let mut nearest_distance = f64::INFINITY;
            for (pos, &idx) in remaining.iter().enumerate() {
                let distance = squared_planar_distance(&last, &points[idx]);
                // Strict comparison: the earliest pool entry wins ties
                if distance < nearest_distance {
                    nearest_distance = distance;
                    nearest_pos = pos;
                }
            }

            // Vec::remove keeps the pool in input order
            tour.push(remaining.remove(nearest_pos));
        }

        tour
    }
}

/// R-tree backed nearest neighbor.
///
/// Same selection rule as [`GreedyNearest`], including the tie-break, but
/// each step is a tree query instead of a full scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedNearest;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

impl TourStrategy for IndexedNearest {
    fn name(&self) -> &'static str {
        "rtree"
    }

    fn visit_order(&self, points: &[GeoPoint]) -> Vec<usize> {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, p)| GeomWithData::new([p.longitude, p.latitude], i))
            .collect();
        let mut tree = RTree::bulk_load(entries);

        let mut tour = Vec::with_capacity(points.len());
        tour.push(0);
        let mut current = points[0];

        while let Some(next) = nearest_lowest_index(&tree, &current) {
            tree.remove(&next);
            tour.push(next.data);
            current = points[next.data];
        }

        tour
    }
}

/// Nearest entry to `from`; among equally near entries the lowest input index.
fn nearest_lowest_index(tree: &RTree<IndexedPoint>, from: &GeoPoint) -> Option<IndexedPoint> {
    let query = [from.longitude, from.latitude];
    let mut candidates = tree.nearest_neighbor_iter_with_distance_2(&query);

    let (first, best) = candidates.next()?;
    let mut chosen = first;
    for (candidate, distance) in candidates {
        if distance > best {
            break;
        }
        if candidate.data < chosen.data {
            chosen = candidate;
        }
    }

    Some(chosen.clone())
}

/// Order addresses with the default [`GreedyNearest`] strategy.
///
/// # Example
/// ```
/// use track_planner::{AddressedPoint, order_addresses};
///
/// let stops = vec![
///     AddressedPoint::new(0.0, 0.0, "A", "1"),
///     AddressedPoint::new(0.0, 3.0, "B", "1"),
///     AddressedPoint::new(0.0, 1.0, "C", "1"),
/// ];
/// let tour = order_addresses(&stops).unwrap();
///
/// let labels: Vec<_> = tour.iter().map(|s| s.address.address_label.clone()).collect();
/// assert_eq!(labels, ["A", "C", "B"]);
/// assert_eq!(tour[2].visit_order, 3);
/// ```
pub fn order_addresses(addresses: &[AddressedPoint]) -> Result<Vec<OrderedAddressedPoint>> {
    order_addresses_with(addresses, &GreedyNearest)
}

/// Order addresses with a caller-chosen strategy.
///
/// Every input address appears exactly once in the output, with
/// `visit_order` running 1..=N.
pub fn order_addresses_with<S: TourStrategy + ?Sized>(
    addresses: &[AddressedPoint],
    strategy: &S,
) -> Result<Vec<OrderedAddressedPoint>> {
    validate_points(addresses)?;

    if addresses.len() < 2 {
        return Ok(number_stops(addresses.iter().cloned()));
    }

    let start = Instant::now();
    let points: Vec<GeoPoint> = addresses
        .iter()
        .map(|a| GeoPoint::new(a.latitude, a.longitude))
        .collect();

    let order = strategy.visit_order(&points);
    debug_assert_eq!(order.len(), addresses.len());

    let tour = number_stops(order.into_iter().map(|i| addresses[i].clone()));

    info!(
        "Ordered {} addresses with {} strategy in {:?}",
        tour.len(),
        strategy.name(),
        start.elapsed()
    );

    Ok(tour)
}

/// Haversine length of a tour in meters, first stop to last.
pub fn tour_length(tour: &[OrderedAddressedPoint]) -> Result<f64> {
    let meters = path_distance(tour)?;
    debug!("Tour of {} stops is {:.0}m", tour.len(), meters);
    Ok(meters)
}

fn number_stops(stops: impl Iterator<Item = AddressedPoint>) -> Vec<OrderedAddressedPoint> {
    stops
        .enumerate()
        .map(|(i, address)| OrderedAddressedPoint {
            address,
            visit_order: i as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoError;

    fn stop(lat: f64, lng: f64, label: &str) -> AddressedPoint {
        AddressedPoint::new(lat, lng, label, "1")
    }

    fn labels(tour: &[OrderedAddressedPoint]) -> Vec<String> {
        tour.iter().map(|s| s.address.address_label.clone()).collect()
    }

    /// Deterministic pseudo-random city-sized point cloud.
    fn scattered_stops(n: usize) -> Vec<AddressedPoint> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..n)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let lat = 48.80 + (state % 10_000) as f64 * 0.00001;
                let lng = 2.30 + ((state >> 20) % 10_000) as f64 * 0.00001;
                stop(lat, lng, &format!("stop-{i}"))
            })
            .collect()
    }

    #[test]
    fn test_closest_first_from_origin() {
        let stops = vec![stop(0.0, 0.0, "a"), stop(0.0, 3.0, "b"), stop(0.0, 1.0, "c")];
        let tour = order_addresses(&stops).unwrap();

        assert_eq!(labels(&tour), ["a", "c", "b"]);
        assert_eq!(tour[0].address.longitude, 0.0);
        assert_eq!(tour[1].address.longitude, 1.0);
        assert_eq!(tour[2].address.longitude, 3.0);
        assert_eq!(
            tour.iter().map(|s| s.visit_order).collect::<Vec<_>>(),
            [1, 2, 3]
        );
    }

    #[test]
    fn test_empty_and_single() {
        assert!(order_addresses(&[]).unwrap().is_empty());

        let single = vec![stop(45.0, 5.0, "only")];
        let tour = order_addresses(&single).unwrap();
        assert_eq!(tour.len(), 1);
        assert_eq!(tour[0].address, single[0]);
        assert_eq!(tour[0].visit_order, 1);
    }

    #[test]
    fn test_always_starts_at_first_row() {
        // The first row is far from everything else but still leads
        let stops = vec![stop(10.0, 10.0, "far"), stop(0.0, 0.0, "x"), stop(0.0, 0.1, "y")];
        let tour = order_addresses(&stops).unwrap();
        assert_eq!(labels(&tour), ["far", "y", "x"]);
    }

    #[test]
    fn test_ties_go_to_earliest_row() {
        let stops = vec![
            stop(0.0, 0.0, "start"),
            stop(0.0, 1.0, "east"),
            stop(0.0, -1.0, "west"),
            stop(1.0, 0.0, "north"),
        ];
        let tour = order_addresses(&stops).unwrap();
        // east, west and north are all 1 away from start: east is first.
        // From east: north is 2 away, west 4; north wins.
        assert_eq!(labels(&tour), ["start", "east", "north", "west"]);
    }

    #[test]
    fn test_duplicate_coordinates_kept() {
        let stops = vec![stop(1.0, 1.0, "a"), stop(1.0, 1.0, "b"), stop(1.0, 1.0, "c")];
        let tour = order_addresses(&stops).unwrap();
        assert_eq!(labels(&tour), ["a", "b", "c"]);
    }

    #[test]
    fn test_output_is_permutation() {
        let stops = scattered_stops(60);
        let tour = order_addresses(&stops).unwrap();

        assert_eq!(tour.len(), stops.len());
        let mut seen: Vec<String> = labels(&tour);
        seen.sort();
        let mut expected: Vec<String> = stops.iter().map(|s| s.address_label.clone()).collect();
        expected.sort();
        assert_eq!(seen, expected);

        for (i, s) in tour.iter().enumerate() {
            assert_eq!(s.visit_order as usize, i + 1);
        }
    }

    #[test]
    fn test_indexed_matches_greedy() {
        for n in [2, 3, 17, 150] {
            let stops = scattered_stops(n);
            let greedy = order_addresses_with(&stops, &GreedyNearest).unwrap();
            let indexed = order_addresses_with(&stops, &IndexedNearest).unwrap();
            assert_eq!(greedy, indexed, "tours differ for n={n}");
        }
    }

    #[test]
    fn test_indexed_matches_greedy_on_ties() {
        let stops = vec![
            stop(0.0, 0.0, "start"),
            stop(0.0, 1.0, "east"),
            stop(0.0, -1.0, "west"),
            stop(1.0, 0.0, "north"),
            stop(0.0, 1.0, "east-again"),
        ];
        let greedy = order_addresses_with(&stops, &GreedyNearest).unwrap();
        let indexed = order_addresses_with(&stops, &IndexedNearest).unwrap();
        assert_eq!(labels(&greedy), labels(&indexed));
    }

    #[test]
    fn test_strategy_trait_object() {
        let strategy: Box<dyn TourStrategy> = Box::new(IndexedNearest);
        let stops = vec![stop(0.0, 0.0, "a"), stop(0.0, 3.0, "b"), stop(0.0, 1.0, "c")];
        let tour = order_addresses_with(&stops, strategy.as_ref()).unwrap();
        assert_eq!(labels(&tour), ["a", "c", "b"]);
    }

    #[test]
    fn test_rejects_invalid_coordinate() {
        let stops = vec![stop(0.0, 0.0, "a"), stop(f64::NAN, 0.0, "bad")];
        let result = order_addresses(&stops);
        assert!(matches!(result, Err(GeoError::InvalidCoordinate { index: 1, .. })));
    }

    #[test]
    fn test_tour_length() {
        let stops = vec![stop(0.0, 0.0, "a"), stop(0.0, 2.0, "b"), stop(0.0, 1.0, "c")];
        let tour = order_addresses(&stops).unwrap();
        let meters = tour_length(&tour).unwrap();
        let two_degrees = crate::geo_utils::EARTH_RADIUS_METERS * 2.0_f64.to_radians();
        assert!((meters - two_degrees).abs() < 1e-6);
    }
}
