//! Decoded frame storage shared between the decode worker and the playback side.

pub mod buffer;

pub use buffer::{BufferTimeline, DecodedFrame, FrameBuffer};
