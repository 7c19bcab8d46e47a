use crate::container::avcc::AvcDecoderConfig;
use crate::container::bytes::{ByteReader, FourCc, children};
use crate::foundation::error::{ScrollyError, ScrollyResult};

#[derive(Clone, Debug, Default)]
pub(crate) struct MovieBox {
    pub(crate) timescale: u32,
    pub(crate) duration: u64,
    pub(crate) tracks: Vec<TrackBox>,
}

impl MovieBox {
    pub(crate) fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / f64::from(self.timescale)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct TrackBox {
    pub(crate) track_id: u32,
    pub(crate) handler: Option<FourCc>,
    pub(crate) timescale: u32,
    pub(crate) duration: u64,
    /// First `stsd` entry: fourcc and body (after the 8-byte entry header).
    pub(crate) sample_entry: Option<(FourCc, Vec<u8>)>,
    pub(crate) tables: SampleTables,
}

/// Fields of a visual sample entry that scrubbing cares about.
#[derive(Clone, Debug)]
pub(crate) struct VisualEntry {
    pub(crate) fourcc: FourCc,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) avcc: Option<AvcDecoderConfig>,
}

impl TrackBox {
    pub(crate) fn visual_entry(&self) -> ScrollyResult<VisualEntry> {
        let (fourcc, body) = self
            .sample_entry
            .as_ref()
            .ok_or_else(|| ScrollyError::unsupported("video track has no sample description"))?;

        let mut r = ByteReader::new(body);
        r.skip(6, "sample entry reserved")?;
        r.skip(2, "data_reference_index")?;
        r.skip(16, "visual sample entry pre_defined")?;
        let width = r.u16("visual sample entry width")?;
        let height = r.u16("visual sample entry height")?;
        // resolution, reserved, frame_count, compressorname, depth, pre_defined
        r.skip(50, "visual sample entry tail")?;

        let mut avcc = None;
        for child in children(r.rest()) {
            let (kind, payload) = child?;
            if kind == FourCc::AVCC {
                avcc = Some(AvcDecoderConfig::parse(payload)?);
            }
        }

        Ok(VisualEntry {
            fourcc: *fourcc,
            width,
            height,
            avcc,
        })
    }

    pub(crate) fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / f64::from(self.timescale)
        }
    }
}

/// Raw sample table boxes of one track.
#[derive(Clone, Debug, Default)]
pub(crate) struct SampleTables {
    pub(crate) stts: Vec<(u32, u32)>,
    pub(crate) ctts: Vec<(u32, i64)>,
    pub(crate) stss: Option<Vec<u32>>,
    pub(crate) stsc: Vec<(u32, u32)>,
    pub(crate) sample_size: u32,
    pub(crate) sample_count: u32,
    pub(crate) sizes: Vec<u32>,
    pub(crate) chunk_offsets: Vec<u64>,
}

/// One sample located in the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SampleRef {
    pub(crate) offset: u64,
    pub(crate) size: u32,
    pub(crate) dts: u64,
    pub(crate) cts: i64,
    pub(crate) duration: u32,
    pub(crate) is_sync: bool,
}

/// Upper bound on samples per track, roughly 19 hours at 60 fps.
const MAX_SAMPLES: usize = 1 << 22;

impl SampleTables {
    /// Number of samples the chunk tables can place, saturating.
    fn locatable(&self, chunk_count: u64) -> u64 {
        self.stsc
            .iter()
            .enumerate()
            .map(|(run_idx, &(first_chunk, per_chunk))| {
                let first = u64::from(first_chunk).max(1);
                let last = match self.stsc.get(run_idx + 1) {
                    Some(&(next_first, _)) => u64::from(next_first).saturating_sub(1),
                    None => chunk_count,
                }
                .min(chunk_count);
                (last + 1)
                    .saturating_sub(first)
                    .saturating_mul(u64::from(per_chunk))
            })
            .fold(0u64, u64::saturating_add)
    }

    /// Expand the run-length tables into one entry per sample, in decode order.
    pub(crate) fn expand(&self) -> ScrollyResult<Vec<SampleRef>> {
        let count = self.sample_count as usize;
        if self.sample_size == 0 && self.sizes.len() != count {
            return Err(ScrollyError::demux(format!(
                "stsz lists {} sizes for {count} samples",
                self.sizes.len()
            )));
        }
        let size_of = |i: usize| {
            if self.sample_size != 0 {
                self.sample_size
            } else {
                self.sizes[i]
            }
        };

        if count > MAX_SAMPLES {
            return Err(ScrollyError::demux(format!(
                "stsz declares {count} samples, more than the supported {MAX_SAMPLES}"
            )));
        }
        let chunk_count = self.chunk_offsets.len() as u64;
        let located = self.locatable(chunk_count);
        if located < count as u64 {
            return Err(ScrollyError::demux(format!(
                "chunk tables locate {located} of {count} samples"
            )));
        }

        let mut out = Vec::with_capacity(count);

        // stsc: runs of chunks sharing a samples-per-chunk value.
        'runs: for (run_idx, &(first_chunk, per_chunk)) in self.stsc.iter().enumerate() {
            if first_chunk == 0 {
                return Err(ScrollyError::demux("stsc first_chunk must be 1-based"));
            }
            let last_chunk = match self.stsc.get(run_idx + 1) {
                Some(&(next_first, _)) => u64::from(next_first).saturating_sub(1),
                None => chunk_count,
            };
            for chunk in u64::from(first_chunk)..=last_chunk.min(chunk_count) {
                let mut offset = self.chunk_offsets[(chunk - 1) as usize];
                for _ in 0..per_chunk {
                    if out.len() == count {
                        break 'runs;
                    }
                    let size = size_of(out.len());
                    out.push(SampleRef {
                        offset,
                        size,
                        dts: 0,
                        cts: 0,
                        duration: 0,
                        is_sync: true,
                    });
                    offset = offset.saturating_add(u64::from(size));
                }
            }
        }
        if out.len() != count {
            return Err(ScrollyError::demux(format!(
                "chunk tables locate {} of {count} samples",
                out.len()
            )));
        }

        let mut i = 0usize;
        let mut dts = 0u64;
        for &(n, delta) in &self.stts {
            let n = (n as usize).min(count - i);
            for s in &mut out[i..i + n] {
                s.dts = dts;
                s.duration = delta;
                dts = dts.saturating_add(u64::from(delta));
            }
            i += n;
            if i == count {
                break;
            }
        }
        for s in &mut out[i..] {
            s.dts = dts;
        }

        let mut i = 0usize;
        for &(n, off) in &self.ctts {
            let n = (n as usize).min(count - i);
            for s in &mut out[i..i + n] {
                s.cts = off;
            }
            i += n;
            if i == count {
                break;
            }
        }
        for s in &mut out {
            s.cts = s.cts.saturating_add(s.dts as i64);
        }

        if let Some(sync) = &self.stss {
            for s in &mut out {
                s.is_sync = false;
            }
            for &n in sync {
                if let Some(s) = (n as usize).checked_sub(1).and_then(|i| out.get_mut(i)) {
                    s.is_sync = true;
                }
            }
        }

        Ok(out)
    }
}

pub(crate) fn parse_moov(payload: &[u8]) -> ScrollyResult<MovieBox> {
    let mut movie = MovieBox::default();
    for child in children(payload) {
        let (kind, body) = child?;
        match kind {
            FourCc::MVHD => {
                let mut r = ByteReader::new(body);
                let (version, _) = r.full_box("mvhd")?;
                if version == 1 {
                    r.skip(16, "mvhd times")?;
                    movie.timescale = r.u32("mvhd timescale")?;
                    movie.duration = r.u64("mvhd duration")?;
                } else {
                    r.skip(8, "mvhd times")?;
                    movie.timescale = r.u32("mvhd timescale")?;
                    movie.duration = u64::from(r.u32("mvhd duration")?);
                }
            }
            FourCc::TRAK => movie.tracks.push(parse_trak(body)?),
            _ => {}
        }
    }
    Ok(movie)
}

fn parse_trak(payload: &[u8]) -> ScrollyResult<TrackBox> {
    let mut track = TrackBox::default();
    for child in children(payload) {
        let (kind, body) = child?;
        match kind {
            FourCc::TKHD => {
                let mut r = ByteReader::new(body);
                let (version, _) = r.full_box("tkhd")?;
                r.skip(if version == 1 { 16 } else { 8 }, "tkhd times")?;
                track.track_id = r.u32("tkhd track_ID")?;
            }
            FourCc::MDIA => parse_mdia(body, &mut track)?,
            _ => {}
        }
    }
    Ok(track)
}

fn parse_mdia(payload: &[u8], track: &mut TrackBox) -> ScrollyResult<()> {
    for child in children(payload) {
        let (kind, body) = child?;
        match kind {
            FourCc::MDHD => {
                let mut r = ByteReader::new(body);
                let (version, _) = r.full_box("mdhd")?;
                if version == 1 {
                    r.skip(16, "mdhd times")?;
                    track.timescale = r.u32("mdhd timescale")?;
                    track.duration = r.u64("mdhd duration")?;
                } else {
                    r.skip(8, "mdhd times")?;
                    track.timescale = r.u32("mdhd timescale")?;
                    track.duration = u64::from(r.u32("mdhd duration")?);
                }
            }
            FourCc::HDLR => {
                let mut r = ByteReader::new(body);
                r.full_box("hdlr")?;
                r.skip(4, "hdlr pre_defined")?;
                track.handler = Some(r.fourcc("hdlr handler_type")?);
            }
            FourCc::MINF => {
                for child in children(body) {
                    let (kind, body) = child?;
                    if kind == FourCc::STBL {
                        parse_stbl(body, track)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_stbl(payload: &[u8], track: &mut TrackBox) -> ScrollyResult<()> {
    let t = &mut track.tables;
    for child in children(payload) {
        let (kind, body) = child?;
        let mut r = ByteReader::new(body);
        match kind {
            FourCc::STSD => {
                r.full_box("stsd")?;
                let entries = r.u32("stsd entry_count")?;
                if entries > 0
                    && let Some(first) = children(r.rest()).next()
                {
                    let (fourcc, entry) = first?;
                    track.sample_entry = Some((fourcc, entry.to_vec()));
                }
            }
            FourCc::STTS => {
                r.full_box("stts")?;
                let n = r.u32("stts entry_count")?;
                t.stts = (0..n)
                    .map(|_| -> ScrollyResult<(u32, u32)> {
                        Ok((r.u32("stts sample_count")?, r.u32("stts sample_delta")?))
                    })
                    .collect::<ScrollyResult<_>>()?;
            }
            FourCc::CTTS => {
                let (version, _) = r.full_box("ctts")?;
                let n = r.u32("ctts entry_count")?;
                t.ctts = (0..n)
                    .map(|_| -> ScrollyResult<(u32, i64)> {
                        let count = r.u32("ctts sample_count")?;
                        let off = if version == 1 {
                            i64::from(r.i32("ctts sample_offset")?)
                        } else {
                            i64::from(r.u32("ctts sample_offset")?)
                        };
                        Ok((count, off))
                    })
                    .collect::<ScrollyResult<_>>()?;
            }
            FourCc::STSS => {
                r.full_box("stss")?;
                let n = r.u32("stss entry_count")?;
                t.stss = Some(
                    (0..n)
                        .map(|_| r.u32("stss sample_number"))
                        .collect::<ScrollyResult<_>>()?,
                );
            }
            FourCc::STSC => {
                r.full_box("stsc")?;
                let n = r.u32("stsc entry_count")?;
                t.stsc = (0..n)
                    .map(|_| -> ScrollyResult<(u32, u32)> {
                        let first = r.u32("stsc first_chunk")?;
                        let per = r.u32("stsc samples_per_chunk")?;
                        r.skip(4, "stsc sample_description_index")?;
                        Ok((first, per))
                    })
                    .collect::<ScrollyResult<_>>()?;
            }
            FourCc::STSZ => {
                r.full_box("stsz")?;
                t.sample_size = r.u32("stsz sample_size")?;
                t.sample_count = r.u32("stsz sample_count")?;
                if t.sample_size == 0 {
                    t.sizes = (0..t.sample_count)
                        .map(|_| r.u32("stsz entry_size"))
                        .collect::<ScrollyResult<_>>()?;
                }
            }
            FourCc::STZ2 => {
                return Err(ScrollyError::unsupported(
                    "compact sample sizes (stz2) are not supported",
                ));
            }
            FourCc::STCO => {
                r.full_box("stco")?;
                let n = r.u32("stco entry_count")?;
                t.chunk_offsets = (0..n)
                    .map(|_| r.u32("stco chunk_offset").map(u64::from))
                    .collect::<ScrollyResult<_>>()?;
            }
            FourCc::CO64 => {
                r.full_box("co64")?;
                let n = r.u32("co64 entry_count")?;
                t.chunk_offsets = (0..n)
                    .map(|_| r.u64("co64 chunk_offset"))
                    .collect::<ScrollyResult<_>>()?;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/container/boxes.rs"]
mod tests;
