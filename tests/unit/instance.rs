use std::time::Duration;

use super::*;
use crate::decode::{ByteSource, VideoDecoder};
use crate::frames::DecodedFrame;
use crate::playback::{CaptureSurface, SimulatedMedia};

struct Panicking;

impl DecodeBackend for Panicking {
    fn open(&self, _src: &str, _options: &DecodeOptions) -> ScrollyResult<Box<dyn ByteSource>> {
        panic!("backend exploded");
    }

    fn create_decoder(&self) -> ScrollyResult<Box<dyn VideoDecoder>> {
        Err(ScrollyError::decoder("unreachable"))
    }
}

struct NoDecoder;

impl DecodeBackend for NoDecoder {
    fn open(&self, _src: &str, options: &DecodeOptions) -> ScrollyResult<Box<dyn ByteSource>> {
        Ok(Box::new(crate::decode::MemorySource::new(
            vec![0; 16],
            options.read_chunk_bytes,
        )))
    }

    fn create_decoder(&self) -> ScrollyResult<Box<dyn VideoDecoder>> {
        Err(ScrollyError::decoder("no decoder available"))
    }
}

fn frame() -> DecodedFrame {
    DecodedFrame::new(image::RgbaImage::new(2, 2))
}

fn instance(host: HostBindings) -> ScrollyVideo<SimulatedMedia, CaptureSurface> {
    ScrollyVideo::new(
        ScrollyOptions::new("clip.mp4"),
        SimulatedMedia::new(3.0),
        CaptureSurface::new(kurbo::Size::new(10.0, 10.0)),
        host,
    )
    .unwrap()
}

#[test]
fn invalid_options_are_rejected_before_anything_starts() {
    let mut options = ScrollyOptions::new("");
    options.transition_speed = 0.0;
    let err = ScrollyVideo::new(
        options,
        SimulatedMedia::new(1.0),
        CaptureSurface::new(kurbo::Size::new(1.0, 1.0)),
        HostBindings::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ScrollyError::Configuration(_)));
}

#[test]
fn host_bindings_default_to_reverse_capable() {
    let host = HostBindings::default();
    assert!(host.reverse_capable);
    assert!(host.progress_source.is_none());
    assert!(host.decode_backend.is_none());
    assert!(!HostBindings::new().reverse_capable(false).reverse_capable);
}

#[test]
fn missing_backend_means_native_only() {
    let v = instance(HostBindings::new());
    assert_eq!(v.pipeline_state(), PipelineState::NativeOnly);
    assert!(matches!(v.deferred_ready, Some(NativeReason::Disabled)));
    assert_eq!(v.media().load_count(), 1);
}

#[test]
fn worker_panic_is_reported_as_decoder_fault() {
    let mut v = instance(HostBindings::new().decode_backend(Panicking));
    assert_eq!(
        v.wait_for_decode(Duration::from_secs(10)),
        PipelineState::NativeOnly
    );
    assert!(v.worker.is_none());
    assert!(v.frames().is_empty());
}

#[test]
fn decoder_creation_failure_discards_frames() {
    let frames = FrameBuffer::shared();
    frames.push(frame());
    let cancel = Arc::new(AtomicBool::new(false));

    let outcome = run_decode(
        "clip.mp4",
        &DecodeOptions::default(),
        &NoDecoder,
        &frames,
        cancel,
    );
    match outcome {
        DecodeOutcome::Failed(e) => assert!(e.is_decode_path()),
        _ => panic!("expected failure"),
    }
    assert_eq!(frames.pending_len(), 0);
}

#[test]
fn pending_outcome_does_not_block_poll() {
    let mut options = ScrollyOptions::new("clip.mp4");
    options.decode.quiet_interval_ms = 5_000;
    let mut v = ScrollyVideo::new(
        options,
        SimulatedMedia::new(3.0),
        CaptureSurface::new(kurbo::Size::new(10.0, 10.0)),
        HostBindings::new().decode_backend(NoDecoder),
    )
    .unwrap();
    // The decoder fails immediately, but polling before it lands just keeps ticking.
    let _ = v.poll(0.0);
    assert_eq!(
        v.wait_for_decode(Duration::from_secs(10)),
        PipelineState::NativeOnly
    );
    assert_eq!(v.media().load_count(), 2);
}

#[test]
fn destroy_cancels_the_worker() {
    let mut v = instance(HostBindings::new().decode_backend(NoDecoder));
    let cancel = v.worker.as_ref().map(|w| Arc::clone(&w.cancel));
    v.destroy();
    assert!(v.worker.is_none());
    if let Some(cancel) = cancel {
        assert!(cancel.load(Ordering::Acquire));
    }
}
