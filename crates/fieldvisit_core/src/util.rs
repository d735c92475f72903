//! Geodesic and display-formatting helpers.
//!
//! # Responsibility
//! - Compute great-circle distance between two coordinates.
//! - Render durations, shift windows and dates for caller-facing payloads.
//!
//! # Invariants
//! - `distance_meters` follows the haversine formula exactly; compliance
//!   thresholds are tuned against it.

use chrono::{DateTime, Duration, Utc};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (haversine) distance between two coordinates, in meters.
///
/// Symmetric in its arguments; zero for identical points.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin()
            * (d_lng / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * 1000.0
}

/// Renders a duration as `"{h}h {m}m"` when hours >= 1, else `"{m}m"`.
///
/// Callers are expected to pass positive durations (the session engine has
/// already enforced the minimum visit duration); non-positive input
/// saturates to `"0m"`.
pub fn format_duration(duration: Duration) -> String {
    if duration <= Duration::zero() {
        return "0m".to_string();
    }

    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Renders a shift window as `"HH:MM - HH:MM"`.
pub fn format_shift_window(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}

/// Renders a shift date as e.g. `"Wed, 15 Jan 2025"`.
pub fn format_shift_date(start: DateTime<Utc>) -> String {
    start.format("%a, %d %b %Y").to_string()
}

/// Renders a clock timestamp as `"HH:MM:SS"` for the detail view.
pub fn format_clock_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Best-effort human-readable description of a coordinate pair.
///
/// Stand-in for an external reverse-geocoding lookup; display only, never
/// used for compliance decisions.
pub fn describe_location(latitude: f64, longitude: f64) -> String {
    format!("Location details: {latitude:.2} - {longitude:.2}")
}
