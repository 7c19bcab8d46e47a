//! Progress-driven playback: mapping, collaborator seams, and the transition controller.

pub mod controller;
pub mod progress;
pub mod scroll;
pub mod simulated;
pub mod state;
pub mod surface;

pub use controller::{
    ControllerOptions, FinishReason, SetProgressOptions, TickOutcome, TransitionController,
};
pub use progress::{effective_duration, scroll_progress, to_progress, to_target_time};
pub use scroll::{ProgressListener, ProgressSource, ScrollGeometry, ScrollTracker, SubscriptionId};
pub use simulated::SimulatedMedia;
pub use state::{ActiveTransition, ControllerState, PlaybackState, TransitionMode};
pub use surface::{CaptureSurface, MediaElement, MediaEvent, PaintSurface, cover_rect, cover_size};
