use kurbo::{Rect, Size};

use crate::frames::DecodedFrame;

/// Notifications from a [`MediaElement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaEvent {
    /// Duration and dimensions are known.
    LoadedMetadata,
    /// More of the source has been buffered.
    Progress,
}

/// A native media player with its own clock.
///
/// Audio is never played; implementations should stay muted.
pub trait MediaElement {
    /// (Re)load the source. Resets the position to `0` and pauses.
    fn load(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, t: f64);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// Duration in seconds, NaN until metadata is loaded.
    fn duration(&self) -> f64;
    fn poll_event(&mut self) -> Option<MediaEvent>;

    /// Called once per animation frame before the controller reads the clock.
    fn sync_clock(&mut self, _now_ms: f64) {}
}

/// Consumer of decoded frames.
pub trait PaintSurface {
    /// Size of the container the frame is fitted into.
    fn viewport(&self) -> Size;
    /// Draw `frame` scaled into `dest` (container coordinates, may extend past the viewport).
    fn paint(&mut self, frame: &DecodedFrame, dest: Rect);
}

/// Scale `frame` so it covers `container`, preserving aspect ratio.
///
/// The axis whose ratio is larger fills the container exactly; the other one overflows.
pub fn cover_size(container: Size, frame: Size) -> Size {
    if frame.width <= 0.0 || frame.height <= 0.0 || container.height <= 0.0 {
        return container;
    }
    let frame_aspect = frame.width / frame.height;
    if container.width / container.height > frame_aspect {
        Size::new(container.width, container.width / frame_aspect)
    } else {
        Size::new(container.height * frame_aspect, container.height)
    }
}

/// [`cover_size`] centered in the container.
pub fn cover_rect(container: Size, frame: Size) -> Rect {
    let size = cover_size(container, frame);
    Rect::from_center_size(container.to_rect().center(), size)
}

/// Paint surface that keeps the most recent frame. Used headless.
#[derive(Clone, Debug)]
pub struct CaptureSurface {
    viewport: Size,
    last: Option<(DecodedFrame, Rect)>,
    paints: usize,
}

impl CaptureSurface {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            last: None,
            paints: 0,
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn last(&self) -> Option<&(DecodedFrame, Rect)> {
        self.last.as_ref()
    }

    pub fn take_last(&mut self) -> Option<(DecodedFrame, Rect)> {
        self.last.take()
    }

    pub fn paint_count(&self) -> usize {
        self.paints
    }
}

impl PaintSurface for CaptureSurface {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn paint(&mut self, frame: &DecodedFrame, dest: Rect) {
        self.paints += 1;
        self.last = Some((frame.clone(), dest));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/surface.rs"]
mod tests;
