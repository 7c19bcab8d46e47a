//! Conversions between external progress (`0..=1`) and media time.
//!
//! The denominator is the frame buffer's duration once it is published and the media element's
//! native duration before that. Both agree at the boundaries: progress `0` maps to `0` and `1` maps
//! to the full duration.

use crate::foundation::core::clamp_unit;
use crate::frames::BufferTimeline;

pub fn effective_duration(timeline: BufferTimeline, native_duration: f64) -> f64 {
    timeline.duration().unwrap_or(native_duration)
}

/// Target time for `progress`, clamped into `[0, duration]`. Yields NaN while the duration is
/// unknown.
pub fn to_target_time(progress: f64, timeline: BufferTimeline, native_duration: f64) -> f64 {
    clamp_unit(progress) * effective_duration(timeline, native_duration)
}

/// Inverse of [`to_target_time`]. Reports `0` while the duration is unknown or zero.
pub fn to_progress(time: f64, timeline: BufferTimeline, native_duration: f64) -> f64 {
    let duration = effective_duration(timeline, native_duration);
    if !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    clamp_unit(time / duration)
}

/// Scroll progress of a container: `-top / (height - viewport_height)`.
///
/// Not clamped; overscroll yields values outside `[0, 1]`. A container no taller than the viewport
/// reports `0` before it reaches the top edge and `1` after.
pub fn scroll_progress(top: f64, height: f64, viewport_height: f64) -> f64 {
    let span = height - viewport_height;
    if span <= 0.0 {
        return if top < 0.0 { 1.0 } else { 0.0 };
    }
    -top / span
}

#[cfg(test)]
#[path = "../../tests/unit/playback/progress.rs"]
mod tests;
