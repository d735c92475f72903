//! Geolocation observation reported at clock-in/clock-out.
//!
//! # Responsibility
//! - Validate coordinate ranges at the boundary, before any engine logic.
//! - Normalize the observation timestamp to UTC, defaulting to the
//!   processing instant when the caller omits it.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed geolocation input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoValidationError {
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl Display for GeoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude must be between -90 and 90, got {value}")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude must be between -180 and 180, got {value}")
            }
        }
    }
}

impl Error for GeoValidationError {}

/// A timestamped location report. Ephemeral, never persisted as an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoObservation {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

impl GeoObservation {
    /// Builds a validated observation.
    ///
    /// `observed_at` falls back to `Utc::now()` when absent; a caller-supplied
    /// timestamp is assumed already normalized to UTC by the transport layer.
    pub fn new(
        latitude: f64,
        longitude: f64,
        observed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, GeoValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoValidationError::LongitudeOutOfRange(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
            // Millisecond precision, matching the storage resolution.
            observed_at: observed_at.unwrap_or_else(|| Utc::now().trunc_subsecs(3)),
        })
    }
}
