use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

use crate::playback::progress::scroll_progress;

/// Receives raw (unclamped) progress values.
pub type ProgressListener = Sender<f64>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// External progress signal an instance subscribes to.
pub trait ProgressSource: Send {
    fn subscribe(&mut self, listener: ProgressListener) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
    /// Latest value, unclamped.
    fn current(&self) -> f64;
}

/// Scroll geometry of the element wrapping the video container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollGeometry {
    /// Distance from the viewport top to the element's top edge.
    pub top: f64,
    pub height: f64,
    pub viewport_height: f64,
}

impl ScrollGeometry {
    pub fn progress(&self) -> f64 {
        scroll_progress(self.top, self.height, self.viewport_height)
    }
}

#[derive(Default)]
struct TrackerInner {
    geometry: ScrollGeometry,
    listeners: Vec<(SubscriptionId, ProgressListener)>,
    next_id: u64,
}

/// [`ProgressSource`] fed with scroll geometry by the host.
///
/// Clones share state: the host keeps one clone to report scroll positions while the instance owns
/// another.
#[derive(Clone, Default)]
pub struct ScrollTracker {
    inner: Arc<Mutex<TrackerInner>>,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record new geometry and notify every listener with the resulting progress.
    pub fn update(&self, geometry: ScrollGeometry) -> f64 {
        let mut inner = self.lock();
        inner.geometry = geometry;
        let progress = geometry.progress();
        inner
            .listeners
            .retain(|(_, listener)| listener.send(progress).is_ok());
        progress
    }

    /// Convenience for [`ScrollTracker::update`] when only the scroll offset changed.
    pub fn scroll_to(&self, top: f64) -> f64 {
        let geometry = ScrollGeometry {
            top,
            ..self.lock().geometry
        };
        self.update(geometry)
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl ProgressSource for ScrollTracker {
    fn subscribe(&mut self, listener: ProgressListener) -> SubscriptionId {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.lock().listeners.retain(|(sid, _)| *sid != id);
    }

    fn current(&self) -> f64 {
        self.lock().geometry.progress()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scroll.rs"]
mod tests;
