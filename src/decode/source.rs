use std::io::Read;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::ScrollyResult;

/// Streaming byte supplier. The total length need not be known up front.
pub trait ByteSource {
    /// Next buffer in file order, or `None` at end of stream.
    fn next_chunk(&mut self) -> ScrollyResult<Option<Vec<u8>>>;

    /// Total length, when the source knows it.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

/// Reads fixed-size chunks from any [`Read`].
pub struct ReaderSource<R> {
    reader: R,
    chunk_bytes: usize,
    len_hint: Option<u64>,
    done: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, chunk_bytes: usize) -> Self {
        Self {
            reader,
            chunk_bytes: chunk_bytes.max(1),
            len_hint: None,
            done: false,
        }
    }
}

impl ReaderSource<std::fs::File> {
    /// Open a local file.
    pub fn open(path: &Path, chunk_bytes: usize) -> ScrollyResult<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        let len_hint = file.metadata().ok().map(|m| m.len());
        let mut source = Self::new(file, chunk_bytes);
        source.len_hint = len_hint;
        Ok(source)
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> ScrollyResult<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.chunk_bytes];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    fn len_hint(&self) -> Option<u64> {
        self.len_hint
    }
}

/// In-memory bytes handed out in chunks.
#[derive(Clone, Debug)]
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    chunk_bytes: usize,
}

impl MemorySource {
    pub fn new(data: Vec<u8>, chunk_bytes: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

impl ByteSource for MemorySource {
    fn next_chunk(&mut self) -> ScrollyResult<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_bytes).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/source.rs"]
mod tests;
