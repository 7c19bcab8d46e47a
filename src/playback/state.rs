use crate::animation::ease::Ease;
use crate::foundation::core::AnimationHandle;

/// Strategy used by one tick to move the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// The media element plays forward at an adjusted rate; the controller follows its clock.
    Native,
    /// The controller writes the media element's position directly.
    Scrub,
    /// The controller indexes the decoded frame buffer.
    Buffered,
}

/// Externally visible controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// A transition is scheduled. `None` until its first tick has chosen a mode.
    Transitioning(Option<TransitionMode>),
}

/// Bookkeeping for the transition in flight.
#[derive(Clone, Debug)]
pub struct ActiveTransition {
    /// Token of the next requested animation frame.
    pub handle: AnimationHandle,
    pub start_time: f64,
    /// Set by the first tick.
    pub start_timestamp: Option<f64>,
    /// Snap on the next tick.
    pub jump: bool,
    pub speed: f64,
    pub easing: Option<Ease>,
    /// Mode chosen by the latest tick.
    pub mode: Option<TransitionMode>,
}

/// Time state owned by the transition controller.
///
/// `transition.is_some()` is the single "transitioning" flag, and it always carries the scheduled
/// handle.
#[derive(Clone, Debug)]
pub struct PlaybackState {
    pub current_time: f64,
    pub target_time: f64,
    pub reverse_capable: bool,
    pub(crate) transition: Option<ActiveTransition>,
}

impl PlaybackState {
    pub fn new(reverse_capable: bool) -> Self {
        Self {
            current_time: 0.0,
            target_time: 0.0,
            reverse_capable,
            transition: None,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn animation_handle(&self) -> Option<AnimationHandle> {
        self.transition.as_ref().map(|t| t.handle)
    }

    pub fn transition(&self) -> Option<&ActiveTransition> {
        self.transition.as_ref()
    }

    pub fn controller_state(&self) -> ControllerState {
        match &self.transition {
            None => ControllerState::Idle,
            Some(t) => ControllerState::Transitioning(t.mode),
        }
    }
}
