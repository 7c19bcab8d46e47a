//! ISO-BMFF (MP4) container parsing.
//!
//! Only what scrubbing needs: the first video track's codec configuration and its samples in decode
//! order. Bytes may arrive in streaming order without a known total length.

pub mod avcc;
pub(crate) mod boxes;
pub mod bytes;
pub mod demuxer;

pub use avcc::{AvcDecoderConfig, avcc_to_annex_b};
pub use bytes::{BoxHeader, FourCc};
pub use demuxer::{CodecReady, DemuxSink, Demuxer, Sample};
