#![forbid(unsafe_code)]
//! Scroll-linked video scrubbing.
//!
//! A [`ScrollyVideo`] maps a progress value in `[0, 1]` onto a video's timeline. When the decode
//! pipeline succeeds, transitions paint pre-decoded frames from a [`FrameBuffer`]; otherwise they
//! drive the host's native media element by seeking or by adjusting its playback rate.

/// Log at `info` when `$verbose` is set, `debug` otherwise.
macro_rules! diag {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod animation;
pub mod config;
pub mod container;
pub mod decode;
pub mod foundation;
pub mod frames;
pub mod instance;
pub mod playback;

pub use animation::ease::Ease;
pub use config::{DecodeOptions, ScrollyOptions};
pub use decode::{DecodeBackend, FileBackend};
pub use foundation::core::FrameIndex;
pub use foundation::error::{ScrollyError, ScrollyResult};
pub use frames::{BufferTimeline, DecodedFrame, FrameBuffer};
pub use instance::{HostBindings, NativeReason, PipelineState, Readiness, ScrollyVideo};
pub use playback::{
    CaptureSurface, MediaElement, MediaEvent, PaintSurface, ProgressSource, ScrollGeometry,
    ScrollTracker, SetProgressOptions, SimulatedMedia, TickOutcome, TransitionController,
    TransitionMode,
};
