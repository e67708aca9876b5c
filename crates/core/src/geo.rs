//! GPS coordinates attached to a contribution.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting values outside the WGS84 ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::Validation(format!(
                "Latitude {latitude} is out of range (-90..90)"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::Validation(format!(
                "Longitude {longitude} is out of range (-180..180)"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Pair up optional stored columns; a half-present pair counts as absent.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Self::new(latitude, longitude).ok(),
            _ => None,
        }
    }
}
