use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::core::FrameIndex;

/// One decoded picture as straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    image: image::RgbaImage,
    /// Presentation timestamp reported by the decoder, if any.
    pub timestamp_us: Option<i64>,
}

impl DecodedFrame {
    pub fn new(image: image::RgbaImage) -> Self {
        Self {
            image,
            timestamp_us: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp_us: i64) -> Self {
        self.timestamp_us = Some(timestamp_us);
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> kurbo::Size {
        kurbo::Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    pub fn image(&self) -> &image::RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> image::RgbaImage {
        self.image
    }
}

/// Snapshot of the buffer's published state, as read by the progress mapper.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BufferTimeline {
    pub frame_count: usize,
    /// `0.0` until the buffer is published.
    pub frame_rate: f64,
}

impl BufferTimeline {
    pub fn is_ready(&self) -> bool {
        self.frame_rate > 0.0 && self.frame_count > 0
    }

    /// Duration covered by the frames, when ready.
    pub fn duration(&self) -> Option<f64> {
        self.is_ready()
            .then(|| self.frame_count as f64 / self.frame_rate)
    }

    /// `floor(t * frame_rate)` clamped to the valid index range.
    pub fn index_for(&self, t: f64) -> Option<FrameIndex> {
        if !self.is_ready() {
            return None;
        }
        let last = self.frame_count - 1;
        let raw = (t * self.frame_rate).floor();
        let idx = if raw.is_nan() || raw <= 0.0 {
            0
        } else if raw >= last as f64 {
            last
        } else {
            raw as usize
        };
        Some(FrameIndex(idx))
    }
}

#[derive(Default)]
struct Inner {
    frames: Vec<Arc<DecodedFrame>>,
    frame_rate: f64,
    discarded: bool,
}

/// Append-only frame sequence with a derived frame rate.
///
/// The decode worker is the only writer. Until [`FrameBuffer::publish`] succeeds the buffer reports
/// itself as not ready and readers see no frames, so a failed decode never exposes a partial
/// sequence.
#[derive(Default)]
pub struct FrameBuffer {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("FrameBuffer")
            .field("frames", &inner.frames.len())
            .field("frame_rate", &inner.frame_rate)
            .field("discarded", &inner.discarded)
            .finish()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a frame. Ignored once the buffer has been published or discarded.
    pub fn push(&self, frame: DecodedFrame) {
        let mut inner = self.write();
        if inner.frame_rate > 0.0 || inner.discarded {
            tracing::trace!("frame push after buffer was sealed, dropped");
            return;
        }
        inner.frames.push(Arc::new(frame));
    }

    /// Frames accumulated so far, published or not.
    pub fn pending_len(&self) -> usize {
        self.read().frames.len()
    }

    /// Seal the buffer and derive `frame_rate = frames / media_duration`.
    ///
    /// Returns the frame rate, or `None` (and leaves the buffer empty) when there are no frames or
    /// the duration is not a positive finite number.
    pub fn publish(&self, media_duration: f64) -> Option<f64> {
        let mut inner = self.write();
        if inner.discarded {
            return None;
        }
        if inner.frame_rate > 0.0 {
            return Some(inner.frame_rate);
        }
        if inner.frames.is_empty() || !media_duration.is_finite() || media_duration <= 0.0 {
            inner.frames = Vec::new();
            inner.discarded = true;
            return None;
        }
        inner.frame_rate = inner.frames.len() as f64 / media_duration;
        Some(inner.frame_rate)
    }

    /// Drop every frame and refuse further writes. Used when decoding fails.
    pub fn discard(&self) {
        let mut inner = self.write();
        inner.frames = Vec::new();
        inner.frame_rate = 0.0;
        inner.discarded = true;
    }

    /// Release all frames at teardown.
    pub fn release(&self) {
        self.discard();
    }

    pub fn is_ready(&self) -> bool {
        self.timeline().is_ready()
    }

    pub fn timeline(&self) -> BufferTimeline {
        let inner = self.read();
        if inner.frame_rate > 0.0 {
            BufferTimeline {
                frame_count: inner.frames.len(),
                frame_rate: inner.frame_rate,
            }
        } else {
            BufferTimeline::default()
        }
    }

    /// Number of published frames (`0` until ready).
    pub fn len(&self) -> usize {
        self.timeline().frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frame_index_for(&self, t: f64) -> Option<FrameIndex> {
        self.timeline().index_for(t)
    }

    pub fn frame(&self, idx: FrameIndex) -> Option<Arc<DecodedFrame>> {
        let inner = self.read();
        if inner.frame_rate <= 0.0 {
            return None;
        }
        inner.frames.get(idx.0).cloned()
    }

    pub fn frame_at_time(&self, t: f64) -> Option<Arc<DecodedFrame>> {
        let inner = self.read();
        let timeline = BufferTimeline {
            frame_count: inner.frames.len(),
            frame_rate: inner.frame_rate,
        };
        let idx = timeline.index_for(t)?;
        inner.frames.get(idx.0).cloned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frames/buffer.rs"]
mod tests;
