//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `fieldvisit_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use fieldvisit_core::ServiceConfig;

fn main() {
    let config = ServiceConfig::default();
    println!("fieldvisit_core version={}", fieldvisit_core::core_version());
    println!(
        "fieldvisit_core default_thresholds warning_m={} error_m={} early_s={} late_s={} min_visit_s={}",
        config.max_distance_warning_m,
        config.max_distance_error_m,
        config.max_early_clock_in_secs,
        config.max_late_clock_in_secs,
        config.min_visit_duration_secs
    );
}
