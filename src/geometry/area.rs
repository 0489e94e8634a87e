//! Planar surface area of small plots.
//!
//! Vertices are projected onto a local equirectangular plane anchored at the
//! first vertex, using one longitude scale derived from the mean latitude of
//! the ring, and the shoelace formula is applied to the projected ring. The
//! approximation holds for plots spanning a few kilometres at most.

use crate::geometry::{Coordinate, MIN_POLYGON_POINTS};

/// Metres covered by one degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Square degrees to hectares factor used by stores written before schema v2.
const LEGACY_HECTARES_PER_SQUARE_DEGREE: f64 = 12_390.0;

/// Surface area of the closed ring in hectares, rounded to 4 decimals.
///
/// Rings with fewer than 3 vertices have no surface and yield `0.0`. The
/// input is assumed to be validated already.
pub fn compute_area_hectares(coordinates: &[Coordinate]) -> f64 {
    if coordinates.len() < MIN_POLYGON_POINTS {
        return 0.0;
    }

    let center_lat =
        coordinates.iter().map(|c| c.lat).sum::<f64>() / coordinates.len() as f64;
    let meters_per_deg_lat = METERS_PER_DEGREE;
    let meters_per_deg_lng = METERS_PER_DEGREE * center_lat.to_radians().cos();

    let origin = coordinates[0];
    let projected: Vec<(f64, f64)> = coordinates
        .iter()
        .map(|c| {
            (
                (c.lng - origin.lng) * meters_per_deg_lng,
                (c.lat - origin.lat) * meters_per_deg_lat,
            )
        })
        .collect();

    let area_sq_m = shoelace(&projected);

    round_to_4_decimals(area_sq_m / SQUARE_METERS_PER_HECTARE)
}

/// Value stored on a plot: `None` until the ring has at least 3 vertices.
pub fn surface_area_for(coordinates: &[Coordinate]) -> Option<f64> {
    if coordinates.len() < MIN_POLYGON_POINTS {
        None
    } else {
        Some(compute_area_hectares(coordinates))
    }
}

/// Historical area: shoelace straight on degrees, scaled by a fixed factor.
///
/// Only used to explain differences when upgrading v1 stores.
pub fn legacy_degree_area_hectares(coordinates: &[Coordinate]) -> f64 {
    if coordinates.len() < MIN_POLYGON_POINTS {
        return 0.0;
    }

    let points: Vec<(f64, f64)> = coordinates.iter().map(|c| (c.lng, c.lat)).collect();

    round_to_4_decimals(shoelace(&points) * LEGACY_HECTARES_PER_SQUARE_DEGREE)
}

/// Unsigned shoelace area of a closed ring of `(x, y)` points.
fn shoelace(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    let twice_signed_area: f64 = (0..n)
        .map(|i| {
            let (x_i, y_i) = points[i];
            let (x_next, y_next) = points[(i + 1) % n];
            x_i * y_next - x_next * y_i
        })
        .sum();

    0.5 * twice_signed_area.abs()
}

fn round_to_4_decimals(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect()
    }

    fn sample_polygons() -> Vec<Vec<Coordinate>> {
        vec![
            ring(&[(0.0, 0.0), (0.0, 0.0009), (0.0009, 0.0009), (0.0009, 0.0)]),
            ring(&[(10.0, 10.0), (10.0, 10.001), (10.001, 10.0)]),
            ring(&[
                (48.8566, 2.3522),
                (48.8572, 2.3541),
                (48.8561, 2.3556),
                (48.8549, 2.3538),
                (48.8553, 2.3519),
            ]),
            ring(&[(-33.87, 151.21), (-33.869, 151.213), (-33.872, 151.214)]),
            ring(&[(64.1, -21.9), (64.1, -21.89), (64.105, -21.89), (64.105, -21.9)]),
        ]
    }

    #[test]
    fn test_fewer_than_three_points_is_zero() {
        assert_eq!(compute_area_hectares(&[]), 0.0);
        assert_eq!(compute_area_hectares(&ring(&[(1.0, 1.0)])), 0.0);
        assert_eq!(compute_area_hectares(&ring(&[(1.0, 1.0), (2.0, 2.0)])), 0.0);
    }

    #[test]
    fn test_hundred_meter_square_at_equator_is_one_hectare() {
        let square = ring(&[(0.0, 0.0), (0.0, 0.0009), (0.0009, 0.0009), (0.0009, 0.0)]);
        let area = compute_area_hectares(&square);
        assert!((area - 1.0).abs() < 0.01, "expected about 1 ha, got {}", area);
        assert_eq!(area, 1.0038);
    }

    #[test]
    fn test_small_triangle_matches_projected_shoelace() {
        let triangle = ring(&[(10.0, 10.0), (10.0, 10.001), (10.001, 10.0)]);

        let center_lat: f64 = (10.0 + 10.0 + 10.001) / 3.0;
        let width = (10.001 - 10.0) * (METERS_PER_DEGREE * center_lat.to_radians().cos());
        let height = (10.001 - 10.0) * METERS_PER_DEGREE;
        let expected = (0.5 * (width * height) / 10_000.0 * 10_000.0).round() / 10_000.0;

        assert_eq!(compute_area_hectares(&triangle), expected);
        assert_eq!(compute_area_hectares(&triangle), 0.6102);
    }

    #[test]
    fn test_area_is_never_negative() {
        for polygon in sample_polygons() {
            assert!(compute_area_hectares(&polygon) >= 0.0);
        }
    }

    #[test]
    fn test_reversal_keeps_area() {
        for polygon in sample_polygons() {
            let mut reversed = polygon.clone();
            reversed.reverse();
            assert!(
                (compute_area_hectares(&polygon) - compute_area_hectares(&reversed)).abs()
                    <= 1e-4 + 1e-12
            );
        }
    }

    #[test]
    fn test_rotation_keeps_area() {
        for polygon in sample_polygons() {
            let expected = compute_area_hectares(&polygon);
            for shift in 1..polygon.len() {
                let mut rotated = polygon.clone();
                rotated.rotate_left(shift);
                let area = compute_area_hectares(&rotated);
                assert!(
                    (area - expected).abs() <= 1e-4 + 1e-12,
                    "shift {} gave {} instead of {}",
                    shift,
                    area,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_reordering_changes_shape_and_area() {
        let square = ring(&[(0.0, 0.0), (0.0, 0.0009), (0.0009, 0.0009), (0.0009, 0.0)]);
        let bowtie = ring(&[(0.0, 0.0), (0.0009, 0.0009), (0.0, 0.0009), (0.0009, 0.0)]);
        assert_ne!(compute_area_hectares(&square), compute_area_hectares(&bowtie));
    }

    #[test]
    fn test_repeated_calls_are_bit_identical() {
        for polygon in sample_polygons() {
            let first = compute_area_hectares(&polygon);
            let second = compute_area_hectares(&polygon);
            assert_eq!(first.to_bits(), second.to_bits());
        }
    }

    #[test]
    fn test_surface_area_for_short_ring_is_absent() {
        assert_eq!(surface_area_for(&ring(&[(1.0, 1.0), (2.0, 2.0)])), None);
        assert_eq!(
            surface_area_for(&ring(&[(10.0, 10.0), (10.0, 10.001), (10.001, 10.0)])),
            Some(0.6102)
        );
    }

    #[test]
    fn test_legacy_degree_area() {
        // 0.5 * 0.001 * 0.001 square degrees * 12390
        let triangle = ring(&[(10.0, 10.0), (10.0, 10.001), (10.001, 10.0)]);
        assert_eq!(legacy_degree_area_hectares(&triangle), 0.0062);
        assert_eq!(legacy_degree_area_hectares(&ring(&[(0.0, 0.0)])), 0.0);
    }
}
