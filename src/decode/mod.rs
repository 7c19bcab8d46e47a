//! Frame decode pipeline: byte source → demuxer → decoder → [`crate::frames::DecodedFrame`].

pub mod backend;
pub mod convert;
pub mod decoder;
#[cfg(feature = "media-ffmpeg")]
pub mod ffmpeg;
pub mod session;
pub mod source;

pub use backend::{DecodeBackend, FileBackend};
pub use decoder::{
    DecoderConfig, DecoderEvent, DecoderOutput, EncodedChunk, PixelFormat, RawFrame, VideoDecoder,
};
pub use session::{DecodeSession, DecodeSummary};
pub use source::{ByteSource, MemorySource, ReaderSource};
