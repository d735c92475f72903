//! Geofence compliance classification for clock-in locations.
//!
//! # Responsibility
//! - Classify the distance between reference and observed coordinates into
//!   none/warning/error tiers.
//! - Produce the diagnostic note persisted on the visit and the caller-facing
//!   warning message.
//!
//! # Invariants
//! - Pure function of its inputs; no clock or storage access.
//! - A distance exactly at a threshold does not trigger that tier.
//! - Correct only when `max_warning_m < max_error_m`; that config invariant
//!   is enforced by `ServiceConfig::validate`, not here.

use crate::util::distance_meters;
use serde::{Deserialize, Serialize};

/// Flag tag recorded on the visit when the warning threshold is exceeded.
pub const FLAG_LOCATION_WARNING: &str = "LOCATION_WARNING";
/// Flag tag for distances beyond the error threshold.
pub const FLAG_LOCATION_ERROR: &str = "LOCATION_ERROR";

/// How far an observed location deviates from the reference location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTier {
    /// Within the warning radius.
    None,
    /// Beyond the warning radius but within the error radius.
    Warning,
    /// Beyond the error radius; the clock-in must be rejected.
    Error,
}

/// Outcome of one classification. Ephemeral, computed per clock-in.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceResult {
    pub tier: ComplianceTier,
    /// Computed haversine distance in meters.
    pub distance_m: f64,
    /// Flag tag to record on the visit, absent for tier `None`.
    pub flag: Option<&'static str>,
    /// Diagnostic note naming the distance and the breached threshold.
    pub notes: Option<String>,
    /// User-facing warning, absent for tier `None`.
    pub warning_message: Option<String>,
}

/// Classifies an observed clock-in location against the visit's reference
/// location and the configured thresholds (meters).
pub fn evaluate_location(
    reference_lat: f64,
    reference_lng: f64,
    observed_lat: f64,
    observed_lng: f64,
    max_warning_m: f64,
    max_error_m: f64,
) -> ComplianceResult {
    let distance_m = distance_meters(reference_lat, reference_lng, observed_lat, observed_lng);
    let warning_message = format!("You are {distance_m:.0}m away from the scheduled location");

    if distance_m > max_error_m {
        return ComplianceResult {
            tier: ComplianceTier::Error,
            distance_m,
            flag: Some(FLAG_LOCATION_ERROR),
            notes: Some(format!(
                "Distance from scheduled location: {distance_m:.0}m (exceeds {max_error_m:.0}m limit)"
            )),
            warning_message: Some(warning_message),
        };
    }

    if distance_m > max_warning_m {
        return ComplianceResult {
            tier: ComplianceTier::Warning,
            distance_m,
            flag: Some(FLAG_LOCATION_WARNING),
            notes: Some(format!(
                "Distance from scheduled location: {distance_m:.0}m (warning threshold)"
            )),
            warning_message: Some(warning_message),
        };
    }

    ComplianceResult {
        tier: ComplianceTier::None,
        distance_m,
        flag: None,
        notes: None,
        warning_message: None,
    }
}
