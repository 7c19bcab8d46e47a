use crate::container::avcc::AvcDecoderConfig;
use crate::container::boxes::{self, SampleRef};
use crate::container::bytes::{BoxHeader, FourCc};
use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Track metadata handed to the sink once the movie header has been parsed.
#[derive(Clone, Debug)]
pub struct CodecReady {
    pub track_id: u32,
    /// RFC 6381 codec string, e.g. `avc1.64001f`.
    pub codec: String,
    pub config: AvcDecoderConfig,
    /// `config` serialized as the decoder description blob.
    pub description: Vec<u8>,
    pub coded_width: u32,
    pub coded_height: u32,
    pub timescale: u32,
    pub duration_secs: f64,
    pub sample_count: usize,
}

/// One compressed access unit in decode order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub is_keyframe: bool,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    pub duration_us: i64,
    pub data: Vec<u8>,
}

/// Receiver of demux output.
pub trait DemuxSink {
    /// Called exactly once, before any sample.
    fn on_codec_ready(&mut self, ready: &CodecReady) -> ScrollyResult<()>;
    /// Called for every sample of the selected track, in decode order.
    fn on_sample(&mut self, sample: Sample) -> ScrollyResult<()>;
}

struct Extraction {
    ready: CodecReady,
    samples: Vec<SampleRef>,
    /// `low_water[i]` = smallest file offset needed by samples `i..`.
    low_water: Vec<u64>,
    next: usize,
}

/// Incremental MP4 demuxer.
///
/// Feed it with [`Demuxer::append`] as bytes arrive and call [`Demuxer::flush`] at end of stream.
/// Before the `moov` box is seen every byte is retained (an `mdat` in front of `moov` may hold
/// samples); afterwards bytes below the lowest offset still needed are released.
#[derive(Default)]
pub struct Demuxer {
    buf: Vec<u8>,
    buf_start: u64,
    next_box: u64,
    open_ended_moov: Option<(u64, u64)>,
    scan_done: bool,
    extraction: Option<Extraction>,
    failed: bool,
}

impl Demuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track metadata, once the movie header has been parsed.
    pub fn codec_ready(&self) -> Option<&CodecReady> {
        self.extraction.as_ref().map(|e| &e.ready)
    }

    /// Samples emitted so far.
    pub fn samples_emitted(&self) -> usize {
        self.extraction.as_ref().map_or(0, |e| e.next)
    }

    /// Bytes currently held.
    pub fn buffered_bytes(&self) -> usize {
        self.buf.len()
    }

    fn buf_end(&self) -> u64 {
        self.buf_start + self.buf.len() as u64
    }

    /// Append bytes that start at `file_start` in the source.
    ///
    /// Buffers must arrive in file order. Bytes overlapping data already appended are ignored; a
    /// gap is an error.
    pub fn append(
        &mut self,
        file_start: u64,
        bytes: &[u8],
        sink: &mut dyn DemuxSink,
    ) -> ScrollyResult<()> {
        if self.failed {
            return Err(ScrollyError::demux("demuxer already failed"));
        }
        let res = self.append_inner(file_start, bytes, sink);
        if res.is_err() {
            self.failed = true;
        }
        res
    }

    fn append_inner(
        &mut self,
        file_start: u64,
        bytes: &[u8],
        sink: &mut dyn DemuxSink,
    ) -> ScrollyResult<()> {
        let end = self.buf_end();
        if file_start > end {
            return Err(ScrollyError::demux(format!(
                "gap in byte stream: expected offset {end}, got {file_start}"
            )));
        }
        let overlap = (end - file_start) as usize;
        if overlap >= bytes.len() {
            return Ok(());
        }
        self.buf.extend_from_slice(&bytes[overlap..]);

        self.scan(sink)?;
        self.extract(sink)?;
        self.release();
        Ok(())
    }

    /// Signal end of stream.
    pub fn flush(&mut self, sink: &mut dyn DemuxSink) -> ScrollyResult<()> {
        if self.failed {
            return Err(ScrollyError::demux("demuxer already failed"));
        }
        let res = self.flush_inner(sink);
        if res.is_err() {
            self.failed = true;
        }
        res
    }

    fn flush_inner(&mut self, sink: &mut dyn DemuxSink) -> ScrollyResult<()> {
        if self.extraction.is_none() {
            match self.open_ended_moov {
                Some((start, header_len)) => {
                    let from = (start + header_len - self.buf_start) as usize;
                    let payload = self.buf.get(from..).unwrap_or_default().to_vec();
                    self.start_extraction(&payload, sink)?;
                }
                None => {
                    return Err(ScrollyError::unsupported(
                        "stream ended without a movie header (moov)",
                    ));
                }
            }
        }
        self.extract(sink)?;

        if let Some(ex) = &self.extraction
            && ex.next < ex.samples.len()
        {
            return Err(ScrollyError::demux(format!(
                "stream truncated: {} of {} samples missing",
                ex.samples.len() - ex.next,
                ex.samples.len()
            )));
        }
        self.buf = Vec::new();
        Ok(())
    }

    /// Walk top-level boxes until `moov` has been parsed.
    fn scan(&mut self, sink: &mut dyn DemuxSink) -> ScrollyResult<()> {
        while self.extraction.is_none() && !self.scan_done {
            let rel = (self.next_box - self.buf_start) as usize;
            if rel >= self.buf.len() {
                return Ok(());
            }
            let Some(header) = BoxHeader::parse(&self.buf[rel..])? else {
                return Ok(());
            };
            let Some(size) = header.size else {
                tracing::trace!(fourcc = %header.fourcc, offset = self.next_box, "open-ended box");
                if header.fourcc == FourCc::MOOV {
                    self.open_ended_moov = Some((self.next_box, header.header_len));
                }
                self.scan_done = true;
                return Ok(());
            };

            if header.fourcc == FourCc::MOOV {
                let end = rel as u64 + size;
                if end > self.buf.len() as u64 {
                    return Ok(());
                }
                let payload =
                    self.buf[rel + header.header_len as usize..end as usize].to_vec();
                self.start_extraction(&payload, sink)?;
            } else {
                tracing::trace!(fourcc = %header.fourcc, size, offset = self.next_box, "skip box");
            }
            self.next_box += size;
        }
        Ok(())
    }

    fn start_extraction(&mut self, moov: &[u8], sink: &mut dyn DemuxSink) -> ScrollyResult<()> {
        let movie = boxes::parse_moov(moov)?;
        let track = movie
            .tracks
            .iter()
            .find(|t| t.handler == Some(FourCc::VIDE))
            .ok_or_else(|| ScrollyError::unsupported("no video track in movie"))?;
        let entry = track.visual_entry()?;
        if entry.fourcc != FourCc::AVC1 && entry.fourcc != FourCc::AVC3 {
            return Err(ScrollyError::unsupported(format!(
                "video codec '{}' is not supported",
                entry.fourcc
            )));
        }
        let config = entry.avcc.ok_or_else(|| {
            ScrollyError::unsupported(format!("'{}' sample entry has no avcC box", entry.fourcc))
        })?;
        if track.timescale == 0 {
            return Err(ScrollyError::demux("video track timescale is zero"));
        }

        let samples = track.tables.expand()?;
        if samples.is_empty() {
            return Err(ScrollyError::unsupported("video track has no samples"));
        }

        let mut duration_secs = track.duration_secs();
        if duration_secs <= 0.0 {
            let ticks: u64 = samples.iter().map(|s| u64::from(s.duration)).sum();
            duration_secs = ticks as f64 / f64::from(track.timescale);
        }
        if duration_secs <= 0.0 {
            duration_secs = movie.duration_secs();
        }

        let mut low_water = vec![u64::MAX; samples.len()];
        let mut low = u64::MAX;
        for (i, s) in samples.iter().enumerate().rev() {
            low = low.min(s.offset);
            low_water[i] = low;
        }

        let ready = CodecReady {
            track_id: track.track_id,
            codec: config.codec_string(entry.fourcc),
            description: config.to_bytes()?,
            config,
            coded_width: u32::from(entry.width),
            coded_height: u32::from(entry.height),
            timescale: track.timescale,
            duration_secs,
            sample_count: samples.len(),
        };
        tracing::debug!(
            codec = %ready.codec,
            width = ready.coded_width,
            height = ready.coded_height,
            samples = ready.sample_count,
            duration_secs = ready.duration_secs,
            "video track ready"
        );
        sink.on_codec_ready(&ready)?;

        self.extraction = Some(Extraction {
            ready,
            samples,
            low_water,
            next: 0,
        });
        Ok(())
    }

    /// Emit every sample whose bytes are fully buffered, stopping at the first one that is not.
    fn extract(&mut self, sink: &mut dyn DemuxSink) -> ScrollyResult<()> {
        let Some(ex) = self.extraction.as_mut() else {
            return Ok(());
        };
        let buf_end = self.buf_start + self.buf.len() as u64;
        while let Some(s) = ex.samples.get(ex.next) {
            if s.offset < self.buf_start {
                return Err(ScrollyError::demux(format!(
                    "sample {} at offset {} was already released",
                    ex.next, s.offset
                )));
            }
            let end = s.offset + u64::from(s.size);
            if end > buf_end {
                break;
            }
            let from = (s.offset - self.buf_start) as usize;
            let data = self.buf[from..from + s.size as usize].to_vec();
            let timescale = ex.ready.timescale;
            sink.on_sample(Sample {
                is_keyframe: s.is_sync,
                timestamp_us: ticks_to_us(s.cts, timescale),
                duration_us: ticks_to_us(i64::from(s.duration), timescale),
                data,
            })?;
            ex.next += 1;
        }
        Ok(())
    }

    fn release(&mut self) {
        let Some(ex) = &self.extraction else {
            return;
        };
        let low = ex
            .low_water
            .get(ex.next)
            .copied()
            .unwrap_or_else(|| self.buf_end());
        if low > self.buf_start {
            let n = ((low - self.buf_start) as usize).min(self.buf.len());
            self.buf.drain(..n);
            self.buf_start += n as u64;
        }
    }
}

fn ticks_to_us(ticks: i64, timescale: u32) -> i64 {
    if timescale == 0 {
        return 0;
    }
    (i128::from(ticks) * 1_000_000 / i128::from(timescale)) as i64
}

#[cfg(test)]
#[path = "../../tests/unit/container/demuxer.rs"]
mod tests;
