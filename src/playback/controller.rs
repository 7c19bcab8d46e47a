use std::sync::Arc;

use crate::animation::ease::Ease;
use crate::foundation::core::{AnimationHandle, clamp_time};
use crate::foundation::error::ScrollyError;
use crate::frames::FrameBuffer;
use crate::playback::progress::{effective_duration, to_progress, to_target_time};
use crate::playback::state::{ActiveTransition, ControllerState, PlaybackState, TransitionMode};
use crate::playback::surface::{MediaElement, PaintSurface, cover_rect};

/// Step divisor when indexing decoded frames.
const BUFFERED_DIVISOR: f64 = 256.0;
/// Step divisor when seeking the native clock by hand.
const SCRUB_DIVISOR: f64 = 64.0;
const MAX_PLAYBACK_RATE: f64 = 16.0;
/// Floor for the arrival threshold; synthetic steps only approach the target asymptotically.
const MIN_FRAME_THRESHOLD: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerOptions {
    pub transition_speed: f64,
    pub frame_threshold: f64,
    /// The host can drive the native clock with forward playback.
    pub reverse_capable: bool,
    /// Log diagnostics at `info`.
    pub verbose: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            transition_speed: 8.0,
            frame_threshold: 0.1,
            reverse_capable: true,
            verbose: false,
        }
    }
}

/// Per-call overrides for [`TransitionController::set_progress`].
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SetProgressOptions {
    /// Snap to the target on the first tick.
    pub jump: bool,
    pub transition_speed: Option<f64>,
    pub easing: Option<Ease>,
}

impl SetProgressOptions {
    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// Within the frame threshold of the target.
    Reached,
    /// Moved past the target in the direction of travel.
    Overshot,
    /// The target is not a number.
    Degenerate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No animation frame was requested.
    Idle,
    /// Time moved and another frame is requested.
    Advanced(TransitionMode),
    /// The transition ended on this tick.
    Finished(FinishReason),
}

/// Drives the current time toward a target, one animation frame at a time.
///
/// The host calls [`TransitionController::on_animation_frame`] once per display refresh. A tick
/// only does work while a frame has been requested, and each tick re-selects its
/// [`TransitionMode`] so a buffer that becomes ready mid-transition takes over on the next frame.
pub struct TransitionController<M, P> {
    media: M,
    painter: P,
    frames: Arc<FrameBuffer>,
    state: PlaybackState,
    options: ControllerOptions,
    next_handle: u64,
    on_change: Option<Box<dyn FnMut(f64)>>,
}

impl<M: MediaElement, P: PaintSurface> TransitionController<M, P> {
    pub fn new(media: M, painter: P, frames: Arc<FrameBuffer>, options: ControllerOptions) -> Self {
        Self {
            media,
            painter,
            frames,
            state: PlaybackState::new(options.reverse_capable),
            options,
            next_handle: 0,
            on_change: None,
        }
    }

    /// Called with the outward progress whenever a tick moves the current time.
    pub fn set_on_change(&mut self, f: impl FnMut(f64) + 'static) {
        self.on_change = Some(Box::new(f));
    }

    pub(crate) fn set_on_change_boxed(&mut self, f: Option<Box<dyn FnMut(f64)>>) {
        self.on_change = f;
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }

    pub fn painter_mut(&mut self) -> &mut P {
        &mut self.painter
    }

    pub fn frames(&self) -> &Arc<FrameBuffer> {
        &self.frames
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.state
    }

    pub fn controller_state(&self) -> ControllerState {
        self.state.controller_state()
    }

    pub fn current_time(&self) -> f64 {
        self.state.current_time
    }

    pub fn target_time(&self) -> f64 {
        self.state.target_time
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    /// Duration the progress range maps onto right now.
    pub fn duration(&self) -> f64 {
        effective_duration(self.frames.timeline(), self.media.duration())
    }

    pub fn current_progress(&self) -> f64 {
        to_progress(
            self.state.current_time,
            self.frames.timeline(),
            self.media.duration(),
        )
    }

    /// Move toward `progress` (clamped into `[0, 1]`).
    ///
    /// Returns `true` when a new transition was scheduled. Without `jump`, targets within the frame
    /// threshold and repeats of the target already in flight are no-ops.
    pub fn set_progress(&mut self, progress: f64, opts: SetProgressOptions) -> bool {
        let target = to_target_time(progress, self.frames.timeline(), self.media.duration());
        let unchanged = same_time(target, self.state.target_time);
        self.state.target_time = target;

        if !opts.jump && (self.state.current_time - target).abs() < self.threshold() {
            return false;
        }
        if !opts.jump && unchanged && self.state.is_transitioning() {
            return false;
        }

        self.cancel();
        if !self.frames.is_ready() {
            self.media.play();
        }
        let handle = self.request_frame();
        diag!(
            self.options.verbose,
            progress,
            target,
            current = self.state.current_time,
            jump = opts.jump,
            "transition scheduled"
        );
        self.state.transition = Some(ActiveTransition {
            handle,
            start_time: self.state.current_time,
            start_timestamp: None,
            jump: opts.jump,
            speed: opts.transition_speed.unwrap_or(self.options.transition_speed),
            easing: opts.easing,
            mode: None,
        });
        true
    }

    /// Drop the pending animation frame. The current time stays where the last tick left it.
    pub fn cancel(&mut self) {
        if let Some(t) = self.state.transition.take() {
            tracing::trace!(handle = t.handle.id(), "transition cancelled");
        }
    }

    fn threshold(&self) -> f64 {
        self.options.frame_threshold.max(MIN_FRAME_THRESHOLD)
    }

    fn request_frame(&mut self) -> AnimationHandle {
        self.next_handle += 1;
        AnimationHandle(self.next_handle)
    }

    fn finish(&mut self, reason: FinishReason) -> TickOutcome {
        self.media.pause();
        self.state.transition = None;
        match reason {
            FinishReason::Degenerate => {
                let error = ScrollyError::degenerate(format!(
                    "target time is not a number (duration {})",
                    self.duration()
                ));
                tracing::warn!(
                    error = %error,
                    current = self.state.current_time,
                    "transition stopped"
                );
            }
            _ => diag!(
                self.options.verbose,
                ?reason,
                current = self.state.current_time,
                target = self.state.target_time,
                "transition finished"
            ),
        }
        TickOutcome::Finished(reason)
    }

    /// Run one animation frame at `now_ms` (host monotonic milliseconds).
    pub fn on_animation_frame(&mut self, now_ms: f64) -> TickOutcome {
        let Some(mut active) = self.state.transition.take() else {
            return TickOutcome::Idle;
        };
        let start_timestamp = *active.start_timestamp.get_or_insert(now_ms);
        let current = self.state.current_time;
        let target = self.state.target_time;

        if target.is_nan() {
            return self.finish(FinishReason::Degenerate);
        }
        let diff = target - current;
        if diff.abs() < self.threshold() {
            return self.finish(FinishReason::Reached);
        }
        let forward = target >= active.start_time;
        if (forward && current > target) || (!forward && current < target) {
            return self.finish(FinishReason::Overshot);
        }

        let target = clamp_time(target, self.duration());
        self.state.target_time = target;

        let mode = if self.frames.is_ready() {
            TransitionMode::Buffered
        } else if active.jump || target < current || !self.state.reverse_capable {
            TransitionMode::Scrub
        } else {
            TransitionMode::Native
        };
        let mut start_timestamp = start_timestamp;
        if active.mode.is_some_and(|m| m != mode) {
            // Re-anchor so an eased curve continues from where the previous strategy left off.
            active.start_time = current;
            active.start_timestamp = Some(now_ms);
            start_timestamp = now_ms;
            diag!(self.options.verbose, ?mode, current, "transition mode changed");
        }
        active.mode = Some(mode);

        let eased = active.easing.and_then(|ease| {
            let distance = (target - active.start_time).abs();
            let progress = (now_ms - start_timestamp) / (distance * 1000.0);
            progress.is_finite().then(|| {
                let step = ease.apply(progress) * distance * active.speed;
                if target >= active.start_time {
                    active.start_time + step
                } else {
                    active.start_time - step
                }
            })
        });
        let stepped =
            |divisor: f64| current + (target - current) / (divisor / active.speed);

        let next = match mode {
            TransitionMode::Buffered => {
                if !self.media.is_paused() {
                    self.media.pause();
                }
                let next = if active.jump {
                    target
                } else {
                    toward(current, eased.unwrap_or_else(|| stepped(BUFFERED_DIVISOR)), target)
                };
                self.paint_at(next);
                next
            }
            TransitionMode::Scrub => {
                self.media.pause();
                let next = if active.jump {
                    target
                } else {
                    toward(current, eased.unwrap_or_else(|| stepped(SCRUB_DIVISOR)), target)
                };
                self.media.set_current_time(next);
                next
            }
            TransitionMode::Native => {
                let rate = (4.0 * diff)
                    .min(active.speed.min(MAX_PLAYBACK_RATE))
                    .max(1.0);
                self.media.set_playback_rate(rate);
                self.media.play();
                tracing::trace!(rate, "native playback rate");
                self.media.current_time()
            }
        };

        active.jump = false;
        active.handle = self.request_frame();
        self.state.transition = Some(active);

        if next != current {
            self.state.current_time = next;
            let progress = self.current_progress();
            if let Some(f) = self.on_change.as_mut() {
                f(progress);
            }
        }
        TickOutcome::Advanced(mode)
    }

    /// Paint the buffered frame for the current time. Returns `false` when nothing was painted.
    pub fn repaint(&mut self) -> bool {
        self.paint_at(self.state.current_time)
    }

    fn paint_at(&mut self, t: f64) -> bool {
        let Some(frame) = self.frames.frame_at_time(t) else {
            return false;
        };
        let dest = cover_rect(self.painter.viewport(), frame.size());
        tracing::trace!(t, width = frame.width(), height = frame.height(), "paint frame");
        self.painter.paint(&frame, dest);
        true
    }

    /// Reset the native element after the decode pipeline gave up on it, keeping its position.
    pub(crate) fn reload_media(&mut self) {
        self.media.load();
        self.media.set_current_time(self.state.current_time);
    }

    /// Stop everything and give up the frames.
    pub fn teardown(&mut self) {
        self.cancel();
        self.media.pause();
        self.frames.release();
    }
}

/// Clamp `proposed` so it never passes `target` when moving from `current`.
fn toward(current: f64, proposed: f64, target: f64) -> f64 {
    if target >= current {
        proposed.min(target)
    } else {
        proposed.max(target)
    }
}

fn same_time(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
