use thiserror::Error;

use crate::geometry::Coordinate;

#[derive(Debug, Error, PartialEq)]
#[error("Plot has no coordinates")]
pub struct EmptyInputError;

/// Arithmetic mean of the vertices. Not the area-weighted centroid.
pub fn centroid(coordinates: &[Coordinate]) -> Result<Coordinate, EmptyInputError> {
    if coordinates.is_empty() {
        return Err(EmptyInputError);
    }

    let count = coordinates.len() as f64;
    let lat_sum: f64 = coordinates.iter().map(|c| c.lat).sum();
    let lng_sum: f64 = coordinates.iter().map(|c| c.lng).sum();

    Ok(Coordinate::new(lat_sum / count, lng_sum / count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_of_square() {
        let square = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 10.0),
            Coordinate::new(10.0, 10.0),
            Coordinate::new(10.0, 0.0),
        ];
        assert_eq!(centroid(&square), Ok(Coordinate::new(5.0, 5.0)));
    }

    #[test]
    fn test_centroid_is_vertex_mean_not_area_weighted() {
        // Extra vertex on one edge shifts the mean but not the shape
        let square = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 5.0),
            Coordinate::new(0.0, 10.0),
            Coordinate::new(10.0, 10.0),
            Coordinate::new(10.0, 0.0),
        ];
        assert_eq!(centroid(&square), Ok(Coordinate::new(4.0, 5.0)));
    }

    #[test]
    fn test_centroid_of_single_point() {
        let point = [Coordinate::new(-12.5, 44.0)];
        assert_eq!(centroid(&point), Ok(Coordinate::new(-12.5, 44.0)));
    }

    #[test]
    fn test_centroid_of_empty_input() {
        assert_eq!(centroid(&[]), Err(EmptyInputError));
    }
}
