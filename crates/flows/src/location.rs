//! Sources of the contributor's GPS position.
//!
//! Location is optional metadata: a provider failure never blocks the
//! wizard, it is only logged by the session.

use async_trait::async_trait;

use ivd_core::geo::Coordinates;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Something that can report where the device currently is.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position reported by the client device (e.g. the browser geolocation
/// API), already resolved to a reading or a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedLocation(Result<Coordinates, LocationError>);

impl ReportedLocation {
    pub fn position(coordinates: Coordinates) -> Self {
        Self(Ok(coordinates))
    }

    pub fn failed(error: LocationError) -> Self {
        Self(Err(error))
    }

    /// Interpret a raw client report: both coordinates in range, or the
    /// client's own error text.
    pub fn from_report(
        latitude: Option<f64>,
        longitude: Option<f64>,
        error: Option<String>,
    ) -> Self {
        match (latitude, longitude, error) {
            (_, _, Some(message)) if message.to_lowercase().contains("denied") => {
                Self::failed(LocationError::PermissionDenied)
            }
            (_, _, Some(message)) => Self::failed(LocationError::Unavailable(message)),
            (Some(lat), Some(lng), None) => match Coordinates::new(lat, lng) {
                Ok(coordinates) => Self::position(coordinates),
                Err(e) => Self::failed(LocationError::Unavailable(e.to_string())),
            },
            _ => Self::failed(LocationError::Unavailable(
                "no position reported".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LocationProvider for ReportedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.0.clone()
    }
}
