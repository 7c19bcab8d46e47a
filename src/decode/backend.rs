use std::path::{Path, PathBuf};

use crate::config::DecodeOptions;
use crate::decode::decoder::VideoDecoder;
use crate::decode::source::{ByteSource, ReaderSource};
use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Resolves a source locator into bytes and supplies a decoder for them.
///
/// Both methods run on the decode worker thread.
pub trait DecodeBackend: Send {
    fn open(&self, src: &str, options: &DecodeOptions) -> ScrollyResult<Box<dyn ByteSource>>;
    fn create_decoder(&self) -> ScrollyResult<Box<dyn VideoDecoder>>;
}

/// Reads local files. Relative locators resolve against `root` when set.
#[derive(Clone, Debug, Default)]
pub struct FileBackend {
    root: Option<PathBuf>,
}

impl FileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn resolve(&self, src: &str) -> PathBuf {
        let path = Path::new(src.strip_prefix("file://").unwrap_or(src));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DecodeBackend for FileBackend {
    fn open(&self, src: &str, options: &DecodeOptions) -> ScrollyResult<Box<dyn ByteSource>> {
        let path = self.resolve(src);
        tracing::debug!(path = %path.display(), "opening decode source");
        Ok(Box::new(ReaderSource::open(&path, options.read_chunk_bytes)?))
    }

    fn create_decoder(&self) -> ScrollyResult<Box<dyn VideoDecoder>> {
        create_system_decoder()
    }
}

#[cfg(feature = "media-ffmpeg")]
fn create_system_decoder() -> ScrollyResult<Box<dyn VideoDecoder>> {
    if !crate::decode::ffmpeg::is_ffmpeg_on_path() {
        return Err(ScrollyError::decoder(
            "ffmpeg is required for frame decoding, but was not found on PATH",
        ));
    }
    Ok(Box::new(crate::decode::ffmpeg::FfmpegDecoder::new()))
}

#[cfg(not(feature = "media-ffmpeg"))]
fn create_system_decoder() -> ScrollyResult<Box<dyn VideoDecoder>> {
    Err(ScrollyError::decoder(
        "frame decoding requires the 'media-ffmpeg' feature",
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/decode/backend.rs"]
mod tests;
