use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};

use crate::config::DecodeOptions;
use crate::container::{CodecReady, DemuxSink, Demuxer, Sample};
use crate::decode::convert::to_decoded;
use crate::decode::decoder::{DecoderConfig, DecoderEvent, DecoderOutput, VideoDecoder};
use crate::decode::source::ByteSource;
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::frames::DecodedFrame;

/// Result of a completed decode session.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeSummary {
    pub codec: String,
    /// Samples submitted to the decoder.
    pub samples: usize,
    /// Frames delivered to the callback.
    pub frames: usize,
    /// Track duration in seconds, as declared by the container.
    pub media_duration: f64,
}

/// One pass of source bytes through demuxer and decoder.
///
/// Completion is heuristic: after end of stream and a decoder flush, the session waits until the
/// decoder has been silent for [`DecodeOptions::quiet_interval`], or until every output handle has
/// been dropped.
pub struct DecodeSession {
    decoder: Box<dyn VideoDecoder>,
    options: DecodeOptions,
    cancel: Arc<AtomicBool>,
}

impl DecodeSession {
    pub fn new(decoder: Box<dyn VideoDecoder>, options: DecodeOptions) -> Self {
        Self {
            decoder,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an external cancellation flag. Setting it aborts the session with
    /// [`ScrollyError::Cancelled`] at the next check.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run to completion, calling `on_frame` for every decoded frame in output order.
    ///
    /// On error the frames already delivered must be discarded by the caller.
    pub fn run(
        mut self,
        source: &mut dyn ByteSource,
        on_frame: &mut dyn FnMut(DecodedFrame),
    ) -> ScrollyResult<DecodeSummary> {
        let res = self.drive(source, on_frame);
        self.decoder.close();
        match &res {
            Ok(summary) => tracing::debug!(
                codec = %summary.codec,
                samples = summary.samples,
                frames = summary.frames,
                "decode session finished"
            ),
            Err(e) => tracing::debug!(error = %e, "decode session aborted"),
        }
        res
    }

    fn drive(
        &mut self,
        source: &mut dyn ByteSource,
        on_frame: &mut dyn FnMut(DecodedFrame),
    ) -> ScrollyResult<DecodeSummary> {
        let (output, events) = DecoderOutput::channel();
        let mut feeder = Feeder {
            decoder: &mut *self.decoder,
            output: Some(output),
            ready: None,
            submitted: 0,
        };
        let mut demuxer = Demuxer::new();
        let mut frames = 0usize;
        let mut offset = 0u64;

        while let Some(chunk) = source.next_chunk()? {
            check_cancelled(&self.cancel)?;
            demuxer.append(offset, &chunk, &mut feeder)?;
            offset += chunk.len() as u64;
            while drain_one(events.try_recv(), &mut frames, on_frame)? {}
        }
        demuxer.flush(&mut feeder)?;
        tracing::trace!(bytes = offset, samples = feeder.submitted, "source exhausted");

        let ready = feeder
            .ready
            .take()
            .ok_or_else(|| ScrollyError::unsupported("no video track was configured"))?;
        let submitted = feeder.submitted;
        // The session keeps no sender, so a decoder that drops its output ends the wait early.
        drop(feeder.output.take());
        feeder.decoder.flush()?;

        wait_quiet(
            &events,
            self.options.quiet_interval(),
            &self.cancel,
            &mut frames,
            on_frame,
        )?;

        Ok(DecodeSummary {
            codec: ready.codec,
            samples: submitted,
            frames,
            media_duration: ready.duration_secs,
        })
    }
}

struct Feeder<'a> {
    decoder: &'a mut dyn VideoDecoder,
    output: Option<DecoderOutput>,
    ready: Option<CodecReady>,
    submitted: usize,
}

impl DemuxSink for Feeder<'_> {
    fn on_codec_ready(&mut self, ready: &CodecReady) -> ScrollyResult<()> {
        let output = self
            .output
            .take()
            .ok_or_else(|| ScrollyError::demux("codec configuration seen twice"))?;
        self.decoder
            .configure(&DecoderConfig::from_ready(ready), output)?;
        self.ready = Some(ready.clone());
        Ok(())
    }

    fn on_sample(&mut self, sample: Sample) -> ScrollyResult<()> {
        self.decoder.decode(sample.into())?;
        self.submitted += 1;
        Ok(())
    }
}

fn check_cancelled(cancel: &AtomicBool) -> ScrollyResult<()> {
    if cancel.load(Ordering::Acquire) {
        Err(ScrollyError::Cancelled)
    } else {
        Ok(())
    }
}

/// Handle one polled event. Returns `Ok(false)` when nothing was pending.
fn drain_one(
    polled: Result<DecoderEvent, TryRecvError>,
    frames: &mut usize,
    on_frame: &mut dyn FnMut(DecodedFrame),
) -> ScrollyResult<bool> {
    match polled {
        Ok(event) => {
            handle_event(event, frames, on_frame)?;
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

fn handle_event(
    event: DecoderEvent,
    frames: &mut usize,
    on_frame: &mut dyn FnMut(DecodedFrame),
) -> ScrollyResult<()> {
    match event {
        DecoderEvent::Frame(raw) => {
            let frame = to_decoded(raw)?;
            on_frame(frame);
            *frames += 1;
            Ok(())
        }
        DecoderEvent::Error(msg) => Err(ScrollyError::decoder(msg)),
    }
}

fn wait_quiet(
    events: &Receiver<DecoderEvent>,
    quiet: std::time::Duration,
    cancel: &AtomicBool,
    frames: &mut usize,
    on_frame: &mut dyn FnMut(DecodedFrame),
) -> ScrollyResult<()> {
    loop {
        check_cancelled(cancel)?;
        match events.recv_timeout(quiet) {
            Ok(event) => handle_event(event, frames, on_frame)?,
            Err(RecvTimeoutError::Timeout) => {
                tracing::trace!(frames = *frames, "decoder quiet, assuming drained");
                return Ok(());
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/session.rs"]
mod tests;
