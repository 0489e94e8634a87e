use serde_json::Value;
use thiserror::Error;

use crate::geometry::{Coordinate, MIN_POLYGON_POINTS};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Coordinates must be a list.")]
    NotASequence,

    #[error("A polygon must have at least 3 points (got {0}).")]
    TooFewPoints(usize),

    #[error("Coordinate at index {index} must be a [lat, lng] pair.")]
    NotAPair { index: usize },

    #[error("Coordinate at index {index} must contain numeric values.")]
    NotNumeric { index: usize },

    #[error("Latitude at index {index} must be between -90 and 90 (got {value}).")]
    LatitudeOutOfRange { index: usize, value: f64 },

    #[error("Longitude at index {index} must be between -180 and 180 (got {value}).")]
    LongitudeOutOfRange { index: usize, value: f64 },
}

impl ValidationError {
    /// Position of the offending coordinate, when the failure is about one
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::NotASequence | ValidationError::TooFewPoints(_) => None,
            ValidationError::NotAPair { index }
            | ValidationError::NotNumeric { index }
            | ValidationError::LatitudeOutOfRange { index, .. }
            | ValidationError::LongitudeOutOfRange { index, .. } => Some(*index),
        }
    }
}

/// Checks raw input and returns the ring it describes, in the same order.
///
/// Any JSON number counts as numeric. The first failing check wins.
pub fn validate(raw: &Value) -> Result<Vec<Coordinate>, ValidationError> {
    let points = raw.as_array().ok_or(ValidationError::NotASequence)?;

    if points.len() < MIN_POLYGON_POINTS {
        return Err(ValidationError::TooFewPoints(points.len()));
    }

    points
        .iter()
        .enumerate()
        .map(|(index, point)| validate_point(index, point))
        .collect()
}

fn validate_point(index: usize, point: &Value) -> Result<Coordinate, ValidationError> {
    let pair = match point.as_array() {
        Some(pair) if pair.len() == 2 => pair,
        _ => return Err(ValidationError::NotAPair { index }),
    };

    let (Some(lat), Some(lng)) = (pair[0].as_f64(), pair[1].as_f64()) else {
        return Err(ValidationError::NotNumeric { index });
    };

    if !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::LatitudeOutOfRange { index, value: lat });
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::LongitudeOutOfRange { index, value: lng });
    }

    Ok(Coordinate::new(lat, lng))
}
