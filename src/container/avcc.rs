use crate::container::bytes::{ByteReader, FourCc};
use crate::foundation::error::{ScrollyError, ScrollyResult};

const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// AVC decoder configuration record (the payload of an `avcC` box).
///
/// Built once from container metadata and handed to the decoder as its `description`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvcDecoderConfig {
    pub configuration_version: u8,
    pub profile_indication: u8,
    pub profile_compatibility: u8,
    pub level_indication: u8,
    /// NAL unit length prefix size in bytes, minus one (0, 1 or 3).
    pub length_size_minus_one: u8,
    /// Sequence parameter set NAL units, without length prefixes.
    pub sps: Vec<Vec<u8>>,
    /// Picture parameter set NAL units, without length prefixes.
    pub pps: Vec<Vec<u8>>,
}

impl AvcDecoderConfig {
    /// Parse an `avcC` payload.
    ///
    /// Trailing bytes (the high-profile chroma/bit-depth extension) are ignored.
    pub fn parse(bytes: &[u8]) -> ScrollyResult<Self> {
        let mut r = ByteReader::new(bytes);
        let configuration_version = r.u8("avcC configurationVersion")?;
        let profile_indication = r.u8("avcC AVCProfileIndication")?;
        let profile_compatibility = r.u8("avcC profile_compatibility")?;
        let level_indication = r.u8("avcC AVCLevelIndication")?;
        let length_size_minus_one = r.u8("avcC lengthSizeMinusOne")? & 0b0000_0011;
        let num_sps = r.u8("avcC numOfSequenceParameterSets")? & 0b0001_1111;
        let mut sps = Vec::with_capacity(num_sps as usize);
        for _ in 0..num_sps {
            let len = r.u16("avcC SPS length")? as usize;
            sps.push(r.bytes(len, "avcC SPS")?.to_vec());
        }
        let num_pps = r.u8("avcC numOfPictureParameterSets")?;
        let mut pps = Vec::with_capacity(num_pps as usize);
        for _ in 0..num_pps {
            let len = r.u16("avcC PPS length")? as usize;
            pps.push(r.bytes(len, "avcC PPS")?.to_vec());
        }
        Ok(Self {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    /// Size of [`Self::to_bytes`] output.
    pub fn encoded_len(&self) -> usize {
        7 + self.sps.iter().map(|n| 2 + n.len()).sum::<usize>()
            + self.pps.iter().map(|n| 2 + n.len()).sum::<usize>()
    }

    /// Serialize into the decoder description blob.
    ///
    /// Layout: version, profile, compatibility, level, `0b111111xx | lengthSizeMinusOne`,
    /// `0b111xxxxx | numSPS`, SPS entries (`u16` BE length + NAL), numPPS, PPS entries.
    pub fn to_bytes(&self) -> ScrollyResult<Vec<u8>> {
        if self.length_size_minus_one > 3 {
            return Err(ScrollyError::unsupported(format!(
                "avcC lengthSizeMinusOne {} out of range",
                self.length_size_minus_one
            )));
        }
        if self.sps.len() > 31 {
            return Err(ScrollyError::unsupported(format!(
                "avcC carries {} SPS units (max 31)",
                self.sps.len()
            )));
        }
        let num_pps = u8::try_from(self.pps.len()).map_err(|_| {
            ScrollyError::unsupported(format!(
                "avcC carries {} PPS units (max 255)",
                self.pps.len()
            ))
        })?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.configuration_version);
        out.push(self.profile_indication);
        out.push(self.profile_compatibility);
        out.push(self.level_indication);
        out.push(self.length_size_minus_one | 0b1111_1100);
        out.push(self.sps.len() as u8 | 0b1110_0000);
        for nal in &self.sps {
            push_len_prefixed(&mut out, nal, "SPS")?;
        }
        out.push(num_pps);
        for nal in &self.pps {
            push_len_prefixed(&mut out, nal, "PPS")?;
        }
        Ok(out)
    }

    /// NAL length prefix size used by samples of this track.
    pub fn nal_length_size(&self) -> usize {
        usize::from(self.length_size_minus_one) + 1
    }

    /// RFC 6381 codec string, e.g. `avc1.42c01e`.
    pub fn codec_string(&self, fourcc: FourCc) -> String {
        format!(
            "{}.{:02x}{:02x}{:02x}",
            fourcc, self.profile_indication, self.profile_compatibility, self.level_indication
        )
    }
}

fn push_len_prefixed(out: &mut Vec<u8>, nal: &[u8], what: &str) -> ScrollyResult<()> {
    let len = u16::try_from(nal.len()).map_err(|_| {
        ScrollyError::unsupported(format!("{what} NAL unit of {} bytes is too long", nal.len()))
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(nal);
    Ok(())
}

/// Rewrite a length-prefixed AVC sample into Annex-B start-code form, appending to `out`.
///
/// Keyframes are prefixed with the record's SPS and PPS so a stream decoder can start at any sync
/// sample.
pub fn avcc_to_annex_b(
    sample: &[u8],
    config: &AvcDecoderConfig,
    keyframe: bool,
    out: &mut Vec<u8>,
) -> ScrollyResult<()> {
    if keyframe {
        for nal in config.sps.iter().chain(config.pps.iter()) {
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(nal);
        }
    }

    let n = config.nal_length_size();
    let mut r = ByteReader::new(sample);
    while r.remaining() > 0 {
        let prefix = r.bytes(n, "NAL length prefix")?;
        let len = prefix
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        let nal = r.bytes(len, "NAL unit")?;
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nal);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/container/avcc.rs"]
mod tests;
