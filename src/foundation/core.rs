pub use kurbo::Size;

/// 0-based index into a decoded frame sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub usize);

/// Opaque token identifying one requested animation frame.
///
/// A new token is issued every time the controller schedules a tick; cancelling a transition drops
/// the token so a late callback carrying the old one is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnimationHandle(pub(crate) u64);

impl AnimationHandle {
    /// Raw token value, for logging.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Clamp a media time into `[0, duration]`.
///
/// NaN times stay NaN so callers can detect degenerate targets. A duration that is not a finite,
/// non-negative number only bounds the time from below.
pub fn clamp_time(t: f64, duration: f64) -> f64 {
    if t.is_nan() {
        return t;
    }
    let t = if t < 0.0 { 0.0 } else { t };
    if duration.is_finite() && duration >= 0.0 && t > duration {
        duration
    } else {
        t
    }
}

/// Clamp an external progress value into `[0, 1]`. NaN maps to `0`.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
