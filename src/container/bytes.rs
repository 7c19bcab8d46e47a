use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Four-character box or codec code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const FTYP: FourCc = FourCc(*b"ftyp");
    pub const MOOV: FourCc = FourCc(*b"moov");
    pub const MDAT: FourCc = FourCc(*b"mdat");
    pub const MVHD: FourCc = FourCc(*b"mvhd");
    pub const TRAK: FourCc = FourCc(*b"trak");
    pub const TKHD: FourCc = FourCc(*b"tkhd");
    pub const MDIA: FourCc = FourCc(*b"mdia");
    pub const MDHD: FourCc = FourCc(*b"mdhd");
    pub const HDLR: FourCc = FourCc(*b"hdlr");
    pub const MINF: FourCc = FourCc(*b"minf");
    pub const STBL: FourCc = FourCc(*b"stbl");
    pub const STSD: FourCc = FourCc(*b"stsd");
    pub const STTS: FourCc = FourCc(*b"stts");
    pub const CTTS: FourCc = FourCc(*b"ctts");
    pub const STSS: FourCc = FourCc(*b"stss");
    pub const STSC: FourCc = FourCc(*b"stsc");
    pub const STSZ: FourCc = FourCc(*b"stsz");
    pub const STZ2: FourCc = FourCc(*b"stz2");
    pub const STCO: FourCc = FourCc(*b"stco");
    pub const CO64: FourCc = FourCc(*b"co64");
    pub const AVC1: FourCc = FourCc(*b"avc1");
    pub const AVC3: FourCc = FourCc(*b"avc3");
    pub const AVCC: FourCc = FourCc(*b"avcC");
    pub const VIDE: FourCc = FourCc(*b"vide");

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect()
    }
}

impl std::fmt::Display for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str_lossy())
    }
}

impl std::fmt::Debug for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FourCc({})", self.as_str_lossy())
    }
}

/// Parsed box header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxHeader {
    pub fourcc: FourCc,
    /// 8, or 16 when a 64-bit `largesize` follows the type.
    pub header_len: u64,
    /// Total box size including the header. `None` means the box extends to the end of the file.
    pub size: Option<u64>,
}

impl BoxHeader {
    /// Parse a header from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold the complete header.
    pub fn parse(buf: &[u8]) -> ScrollyResult<Option<Self>> {
        if buf.len() < 8 {
            return Ok(None);
        }
        let size32 = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let fourcc = FourCc([buf[4], buf[5], buf[6], buf[7]]);
        match size32 {
            0 => Ok(Some(Self {
                fourcc,
                header_len: 8,
                size: None,
            })),
            1 => {
                if buf.len() < 16 {
                    return Ok(None);
                }
                let mut large = [0u8; 8];
                large.copy_from_slice(&buf[8..16]);
                let size = u64::from_be_bytes(large);
                if size < 16 {
                    return Err(ScrollyError::demux(format!(
                        "box '{fourcc}' declares largesize {size} smaller than its header"
                    )));
                }
                Ok(Some(Self {
                    fourcc,
                    header_len: 16,
                    size: Some(size),
                }))
            }
            n if n < 8 => Err(ScrollyError::demux(format!(
                "box '{fourcc}' declares size {n} smaller than its header"
            ))),
            n => Ok(Some(Self {
                fourcc,
                header_len: 8,
                size: Some(u64::from(n)),
            })),
        }
    }
}

/// Iterate the child boxes of a fully buffered parent payload.
pub(crate) fn children(payload: &[u8]) -> ChildBoxes<'_> {
    ChildBoxes { rest: payload }
}

pub(crate) struct ChildBoxes<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for ChildBoxes<'a> {
    type Item = ScrollyResult<(FourCc, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let header = match BoxHeader::parse(self.rest) {
            Ok(Some(h)) => h,
            Ok(None) => {
                self.rest = &[];
                return Some(Err(ScrollyError::demux("truncated child box header")));
            }
            Err(e) => {
                self.rest = &[];
                return Some(Err(e));
            }
        };
        let total = match header.size {
            Some(s) => s,
            None => self.rest.len() as u64,
        };
        if total > self.rest.len() as u64 {
            let fourcc = header.fourcc;
            self.rest = &[];
            return Some(Err(ScrollyError::demux(format!(
                "child box '{fourcc}' overruns its parent"
            ))));
        }
        let (this, rest) = self.rest.split_at(total as usize);
        self.rest = rest;
        Some(Ok((header.fourcc, &this[header.header_len as usize..])))
    }
}

/// Bounds-checked big-endian cursor over a box payload.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn bytes(&mut self, n: usize, what: &str) -> ScrollyResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ScrollyError::demux(format!(
                "unexpected end of data reading {what} ({n} bytes wanted, {} left)",
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn skip(&mut self, n: usize, what: &str) -> ScrollyResult<()> {
        self.bytes(n, what).map(|_| ())
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub(crate) fn u8(&mut self, what: &str) -> ScrollyResult<u8> {
        Ok(self.bytes(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> ScrollyResult<u16> {
        let b = self.bytes(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &str) -> ScrollyResult<u32> {
        let b = self.bytes(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32(&mut self, what: &str) -> ScrollyResult<i32> {
        let b = self.bytes(4, what)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self, what: &str) -> ScrollyResult<u64> {
        let b = self.bytes(8, what)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(u64::from_be_bytes(a))
    }

    pub(crate) fn fourcc(&mut self, what: &str) -> ScrollyResult<FourCc> {
        let b = self.bytes(4, what)?;
        Ok(FourCc([b[0], b[1], b[2], b[3]]))
    }

    /// Read the `(version, flags)` prefix of a full box.
    pub(crate) fn full_box(&mut self, what: &str) -> ScrollyResult<(u8, u32)> {
        let v = self.u32(what)?;
        Ok(((v >> 24) as u8, v & 0x00ff_ffff))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/container/bytes.rs"]
mod tests;
