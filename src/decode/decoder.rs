use std::sync::mpsc;

use crate::container::{AvcDecoderConfig, CodecReady, Sample};
use crate::foundation::error::ScrollyResult;

/// Everything a decoder needs before the first chunk.
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    pub codec: String,
    /// Serialized `avcC` record.
    pub description: Vec<u8>,
    pub avc: AvcDecoderConfig,
    pub coded_width: u32,
    pub coded_height: u32,
}

impl DecoderConfig {
    pub fn from_ready(ready: &CodecReady) -> Self {
        Self {
            codec: ready.codec.clone(),
            description: ready.description.clone(),
            avc: ready.config.clone(),
            coded_width: ready.coded_width,
            coded_height: ready.coded_height,
        }
    }
}

/// One compressed access unit, submitted in decode order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedChunk {
    pub is_keyframe: bool,
    pub timestamp_us: i64,
    pub duration_us: i64,
    /// Length-prefixed NAL units as stored in the container.
    pub data: Vec<u8>,
}

impl From<Sample> for EncodedChunk {
    fn from(s: Sample) -> Self {
        Self {
            is_keyframe: s.is_keyframe,
            timestamp_us: s.timestamp_us,
            duration_us: s.duration_us,
            data: s.data,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Interleaved R, G, B, A.
    Rgba8,
    /// Interleaved B, G, R, A.
    Bgra8,
    /// Planar Y, U, V with 2x2 chroma subsampling.
    I420,
}

/// Decoder-native output picture. Converted and dropped as soon as it arrives.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub timestamp_us: Option<i64>,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub enum DecoderEvent {
    Frame(RawFrame),
    Error(String),
}

/// Sending half of the decoder's output channel.
///
/// Decoders may emit from any thread. Dropping every clone signals that no more output will come.
#[derive(Clone, Debug)]
pub struct DecoderOutput {
    tx: mpsc::Sender<DecoderEvent>,
}

impl DecoderOutput {
    pub fn channel() -> (Self, mpsc::Receiver<DecoderEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// Emit a frame. Returns `false` once the session has stopped listening.
    pub fn frame(&self, frame: RawFrame) -> bool {
        self.tx.send(DecoderEvent::Frame(frame)).is_ok()
    }

    /// Report a fatal decode error.
    pub fn error(&self, msg: impl Into<String>) -> bool {
        self.tx.send(DecoderEvent::Error(msg.into())).is_ok()
    }
}

/// Stateful video decoder fed in decode order.
///
/// Output is asynchronous: frames for a chunk may arrive on the [`DecoderOutput`] before or after
/// [`VideoDecoder::decode`] returns, and there is no completion signal beyond silence.
pub trait VideoDecoder: Send {
    fn configure(&mut self, config: &DecoderConfig, output: DecoderOutput) -> ScrollyResult<()>;
    fn decode(&mut self, chunk: EncodedChunk) -> ScrollyResult<()>;
    /// Ask the decoder to emit everything it still holds.
    fn flush(&mut self) -> ScrollyResult<()>;
    /// Release decoder resources. Must be safe to call more than once.
    fn close(&mut self);
}
