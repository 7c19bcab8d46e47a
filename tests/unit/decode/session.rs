use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::*;
use crate::decode::decoder::{EncodedChunk, PixelFormat, RawFrame};
use crate::decode::source::MemorySource;

#[path = "../../support/mp4.rs"]
mod mp4;

#[derive(Default)]
struct Log {
    config: Option<DecoderConfig>,
    chunks: Vec<EncodedChunk>,
    flushed: bool,
    closed: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Emit {
    /// One frame per chunk, synchronously.
    PerChunk,
    /// Everything at flush, from another thread after a short delay.
    OnFlushDelayed,
    /// Nothing, and the output handle is dropped at flush.
    DropAtFlush,
    /// Nothing at all.
    Silent,
}

struct Scripted {
    log: Arc<Mutex<Log>>,
    output: Option<DecoderOutput>,
    emit: Emit,
    fail_at: Option<usize>,
}

impl Scripted {
    fn new(emit: Emit) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        (
            Self {
                log: Arc::clone(&log),
                output: None,
                emit,
                fail_at: None,
            },
            log,
        )
    }

    fn frame(ts: i64) -> RawFrame {
        RawFrame {
            width: 4,
            height: 2,
            format: PixelFormat::Rgba8,
            timestamp_us: Some(ts),
            data: vec![200; 4 * 2 * 4],
        }
    }
}

impl VideoDecoder for Scripted {
    fn configure(&mut self, config: &DecoderConfig, output: DecoderOutput) -> ScrollyResult<()> {
        self.log.lock().unwrap().config = Some(config.clone());
        self.output = Some(output);
        Ok(())
    }

    fn decode(&mut self, chunk: EncodedChunk) -> ScrollyResult<()> {
        let n = {
            let mut log = self.log.lock().unwrap();
            log.chunks.push(chunk.clone());
            log.chunks.len() - 1
        };
        let output = self.output.as_ref().unwrap();
        if self.fail_at == Some(n) {
            output.error("bitstream corrupt");
            return Ok(());
        }
        if self.emit == Emit::PerChunk {
            output.frame(Self::frame(chunk.timestamp_us));
        }
        Ok(())
    }

    fn flush(&mut self) -> ScrollyResult<()> {
        let mut log = self.log.lock().unwrap();
        log.flushed = true;
        match self.emit {
            Emit::OnFlushDelayed => {
                let output = self.output.clone().unwrap();
                let timestamps: Vec<i64> = log.chunks.iter().map(|c| c.timestamp_us).collect();
                std::thread::spawn(move || {
                    for ts in timestamps {
                        std::thread::sleep(Duration::from_millis(2));
                        output.frame(Scripted::frame(ts));
                    }
                });
            }
            Emit::DropAtFlush => self.output = None,
            Emit::PerChunk | Emit::Silent => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
        self.output = None;
    }
}

fn options(quiet_ms: u64) -> DecodeOptions {
    DecodeOptions {
        quiet_interval_ms: quiet_ms,
        read_chunk_bytes: 97,
    }
}

fn run(
    decoder: Scripted,
    file: Vec<u8>,
    quiet_ms: u64,
) -> (ScrollyResult<DecodeSummary>, Vec<DecodedFrame>) {
    let mut frames = Vec::new();
    let mut source = MemorySource::new(file, 97);
    let res = DecodeSession::new(Box::new(decoder), options(quiet_ms))
        .run(&mut source, &mut |f| frames.push(f));
    (res, frames)
}

#[test]
fn every_sample_is_fed_in_decode_order() {
    let clip = mp4::Mp4Clip::default();
    let (decoder, log) = Scripted::new(Emit::PerChunk);
    let (res, frames) = run(decoder, mp4::build(&clip), 20);
    let summary = res.unwrap();

    assert_eq!(summary.codec, "avc1.42c01e");
    assert_eq!(summary.samples, 10);
    assert_eq!(summary.frames, 10);
    assert!((summary.media_duration - 10.0 / 30.0).abs() < 1e-9);
    assert_eq!(frames.len(), 10);
    assert_eq!(frames[3].timestamp_us, Some(100_000));

    let log = log.lock().unwrap();
    let config = log.config.as_ref().unwrap();
    assert_eq!((config.coded_width, config.coded_height), (64, 48));
    assert_eq!(config.description, mp4::avcc_payload());
    let keys: Vec<bool> = log.chunks.iter().map(|c| c.is_keyframe).collect();
    let expected: Vec<bool> = clip.samples.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, expected);
    assert_eq!(log.chunks[7].data, clip.samples[7].1);
    assert!(log.flushed);
    assert!(log.closed);
}

#[test]
fn decoder_error_aborts_the_session() {
    let (mut decoder, log) = Scripted::new(Emit::PerChunk);
    decoder.fail_at = Some(4);
    let (res, frames) = run(decoder, mp4::build(&mp4::Mp4Clip::default()), 20);

    assert!(matches!(res, Err(ScrollyError::DecoderFault(_))));
    assert_eq!(frames.len(), 4);
    assert!(log.lock().unwrap().closed);
}

#[test]
fn audio_only_source_never_configures_the_decoder() {
    let clip = mp4::Mp4Clip {
        handler: *b"soun",
        ..Default::default()
    };
    let (decoder, log) = Scripted::new(Emit::PerChunk);
    let (res, frames) = run(decoder, mp4::build(&clip), 20);

    assert!(matches!(res, Err(ScrollyError::UnsupportedContainer(_))));
    assert!(frames.is_empty());
    let log = log.lock().unwrap();
    assert!(log.config.is_none());
    assert!(log.chunks.is_empty());
}

#[test]
fn late_output_is_collected_until_the_decoder_goes_quiet() {
    let (decoder, _log) = Scripted::new(Emit::OnFlushDelayed);
    let (res, frames) = run(decoder, mp4::build(&mp4::Mp4Clip::default()), 250);
    assert_eq!(res.unwrap().frames, 10);
    assert_eq!(frames.len(), 10);
}

#[test]
fn silent_decoder_completes_with_no_frames() {
    let (decoder, _log) = Scripted::new(Emit::Silent);
    let (res, frames) = run(decoder, mp4::build(&mp4::Mp4Clip::default()), 20);
    let summary = res.unwrap();
    assert_eq!(summary.samples, 10);
    assert_eq!(summary.frames, 0);
    assert!(frames.is_empty());
}

#[test]
fn dropped_output_ends_the_wait_early() {
    let (decoder, _log) = Scripted::new(Emit::DropAtFlush);
    let started = Instant::now();
    let (res, _) = run(decoder, mp4::build(&mp4::Mp4Clip::default()), 10_000);
    res.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancellation_stops_the_session() {
    let (decoder, log) = Scripted::new(Emit::PerChunk);
    let session = DecodeSession::new(Box::new(decoder), options(20));
    session.cancel_flag().store(true, Ordering::Release);

    let mut source = MemorySource::new(mp4::build(&mp4::Mp4Clip::default()), 97);
    let res = session.run(&mut source, &mut |_| {});
    assert!(matches!(res, Err(ScrollyError::Cancelled)));
    assert!(log.lock().unwrap().closed);
}
