//! Recency threshold below which files and torrents are not judged.

use chrono::{DateTime, Duration, Utc};

/// Whether `reference` is too recent to judge.
///
/// A non-positive `grace_hours` disables the window for every reference,
/// present or not. Otherwise a missing reference (a torrent that has not
/// completed) is within grace, and so is a reference in the future.
pub fn within_grace(reference: Option<DateTime<Utc>>, now: DateTime<Utc>, grace_hours: i64) -> bool {
    if grace_hours <= 0 {
        return false;
    }

    let Some(reference) = reference else {
        return true;
    };

    let elapsed = now.signed_duration_since(reference);
    if elapsed < Duration::zero() {
        return true;
    }

    // Saturate absurd configurations instead of overflowing.
    match Duration::try_hours(grace_hours) {
        Some(window) => elapsed < window,
        None => true,
    }
}
