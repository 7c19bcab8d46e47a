use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::{DecodeOptions, ScrollyOptions};
use crate::decode::{DecodeBackend, DecodeSession, DecodeSummary};
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::frames::FrameBuffer;
use crate::playback::{
    ControllerOptions, MediaElement, MediaEvent, PaintSurface, ProgressSource, SetProgressOptions,
    SubscriptionId, TickOutcome, TransitionController,
};

/// Why an instance is running on the native timeline only.
#[derive(Debug)]
pub enum NativeReason {
    /// The decode pipeline is switched off or no backend was supplied.
    Disabled,
    /// Decoding finished without producing frames.
    NoFrames,
    Failed(ScrollyError),
}

/// Reported once through `on_ready`.
#[derive(Debug)]
pub enum Readiness {
    Buffered { frame_count: usize, frame_rate: f64 },
    NativeOnly(NativeReason),
}

/// Where the decode pipeline stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Buffered,
    NativeOnly,
}

/// Collaborators and callbacks supplied by the host.
pub struct HostBindings {
    /// Forward native playback can be used to chase a target.
    pub reverse_capable: bool,
    pub progress_source: Option<Box<dyn ProgressSource>>,
    pub decode_backend: Option<Box<dyn DecodeBackend>>,
    pub on_ready: Option<Box<dyn FnMut(&Readiness)>>,
    pub on_change: Option<Box<dyn FnMut(f64)>>,
}

impl Default for HostBindings {
    fn default() -> Self {
        Self {
            reverse_capable: true,
            progress_source: None,
            decode_backend: None,
            on_ready: None,
            on_change: None,
        }
    }
}

impl HostBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reverse_capable(mut self, capable: bool) -> Self {
        self.reverse_capable = capable;
        self
    }

    pub fn progress_source(mut self, source: impl ProgressSource + 'static) -> Self {
        self.progress_source = Some(Box::new(source));
        self
    }

    pub fn decode_backend(mut self, backend: impl DecodeBackend + 'static) -> Self {
        self.decode_backend = Some(Box::new(backend));
        self
    }

    pub fn on_ready(mut self, f: impl FnMut(&Readiness) + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    pub fn on_change(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }
}

enum DecodeOutcome {
    Ready(DecodeSummary, usize, f64),
    Empty(DecodeSummary),
    Failed(ScrollyError),
}

struct DecodeWorker {
    cancel: Arc<AtomicBool>,
    outcome: Receiver<DecodeOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    fn spawn(
        src: String,
        options: DecodeOptions,
        backend: Box<dyn DecodeBackend>,
        frames: Arc<FrameBuffer>,
    ) -> ScrollyResult<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, outcome) = mpsc::channel();
        let flag = Arc::clone(&cancel);
        let thread = std::thread::Builder::new()
            .name("scrolly-decode".to_string())
            .spawn(move || {
                let outcome = run_decode(&src, &options, backend.as_ref(), &frames, flag);
                // The instance may already be gone.
                let _ = tx.send(outcome);
            })
            .map_err(|e| ScrollyError::decoder(format!("failed to spawn decode worker: {e}")))?;
        Ok(Self {
            cancel,
            outcome,
            thread: Some(thread),
        })
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("decode worker panicked");
        }
    }
}

fn decode_into(
    src: &str,
    options: &DecodeOptions,
    backend: &dyn DecodeBackend,
    frames: &FrameBuffer,
    cancel: Arc<AtomicBool>,
) -> ScrollyResult<DecodeSummary> {
    let mut source = backend.open(src, options)?;
    let decoder = backend.create_decoder()?;
    DecodeSession::new(decoder, options.clone())
        .with_cancel_flag(cancel)
        .run(source.as_mut(), &mut |frame| frames.push(frame))
}

fn run_decode(
    src: &str,
    options: &DecodeOptions,
    backend: &dyn DecodeBackend,
    frames: &FrameBuffer,
    cancel: Arc<AtomicBool>,
) -> DecodeOutcome {
    match decode_into(src, options, backend, frames, cancel) {
        Ok(summary) => match frames.publish(summary.media_duration) {
            Some(rate) => DecodeOutcome::Ready(summary, frames.len(), rate),
            None => DecodeOutcome::Empty(summary),
        },
        Err(e) => {
            frames.discard();
            DecodeOutcome::Failed(e)
        }
    }
}

/// A scroll-scrubbed video.
///
/// Single-threaded apart from the decode worker: the host calls [`ScrollyVideo::poll`] once per
/// animation frame, which applies pending media events, progress updates, and the decode result,
/// then runs one controller tick.
pub struct ScrollyVideo<M: MediaElement, P: PaintSurface> {
    options: ScrollyOptions,
    controller: TransitionController<M, P>,
    frames: Arc<FrameBuffer>,
    progress_source: Option<Box<dyn ProgressSource>>,
    subscription: Option<SubscriptionId>,
    progress_rx: Option<Receiver<f64>>,
    worker: Option<DecodeWorker>,
    pipeline: PipelineState,
    deferred_ready: Option<NativeReason>,
    on_ready: Option<Box<dyn FnMut(&Readiness)>>,
    metadata_loaded: bool,
    destroyed: bool,
}

impl<M: MediaElement, P: PaintSurface> ScrollyVideo<M, P> {
    /// Validate `options`, start loading `media`, and start the decode pipeline.
    ///
    /// Only configuration problems are returned as errors. Everything on the decode path is
    /// reported through `on_ready` as [`Readiness::NativeOnly`].
    pub fn new(
        options: ScrollyOptions,
        media: M,
        painter: P,
        host: HostBindings,
    ) -> ScrollyResult<Self> {
        options.validate()?;
        let verbose = options.debug;
        let HostBindings {
            reverse_capable,
            progress_source,
            decode_backend,
            on_ready,
            on_change,
        } = host;

        let frames = FrameBuffer::shared();
        let mut controller = TransitionController::new(
            media,
            painter,
            Arc::clone(&frames),
            ControllerOptions {
                transition_speed: options.transition_speed,
                frame_threshold: options.frame_threshold,
                reverse_capable,
                verbose,
            },
        );
        controller.set_on_change_boxed(on_change);
        controller.media_mut().pause();
        controller.media_mut().load();

        let mut video = Self {
            options,
            controller,
            frames,
            progress_source,
            subscription: None,
            progress_rx: None,
            worker: None,
            pipeline: PipelineState::Pending,
            deferred_ready: None,
            on_ready,
            metadata_loaded: false,
            destroyed: false,
        };

        if video.options.track_scroll
            && let Some(source) = video.progress_source.as_mut()
        {
            let (tx, rx) = mpsc::channel();
            video.subscription = Some(source.subscribe(tx));
            video.progress_rx = Some(rx);
        }

        match (video.options.use_decode_pipeline, decode_backend) {
            (true, Some(backend)) => {
                match DecodeWorker::spawn(
                    video.options.src.clone(),
                    video.options.decode.clone(),
                    backend,
                    Arc::clone(&video.frames),
                ) {
                    Ok(worker) => video.worker = Some(worker),
                    Err(e) => video.fall_back(e),
                }
            }
            _ => {
                video.pipeline = PipelineState::NativeOnly;
                video.deferred_ready = Some(NativeReason::Disabled);
            }
        }

        diag!(
            verbose,
            src = %video.options.src,
            track_scroll = video.options.track_scroll,
            decode = video.worker.is_some(),
            reverse_capable,
            "scrolly instance created"
        );
        Ok(video)
    }

    pub fn options(&self) -> &ScrollyOptions {
        &self.options
    }

    pub fn controller(&self) -> &TransitionController<M, P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TransitionController<M, P> {
        &mut self.controller
    }

    pub fn media(&self) -> &M {
        self.controller.media()
    }

    pub fn media_mut(&mut self) -> &mut M {
        self.controller.media_mut()
    }

    pub fn painter(&self) -> &P {
        self.controller.painter()
    }

    pub fn painter_mut(&mut self) -> &mut P {
        self.controller.painter_mut()
    }

    pub fn frames(&self) -> &Arc<FrameBuffer> {
        &self.frames
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn current_time(&self) -> f64 {
        self.controller.current_time()
    }

    pub fn current_progress(&self) -> f64 {
        self.controller.current_progress()
    }

    /// Process pending events and run one animation frame at `now_ms`.
    pub fn poll(&mut self, now_ms: f64) -> TickOutcome {
        if self.destroyed {
            return TickOutcome::Idle;
        }
        self.controller.media_mut().sync_clock(now_ms);
        self.drain_media_events();
        self.drain_progress();
        if let Some(outcome) = self.take_outcome(None) {
            self.apply_outcome(outcome);
        }
        self.controller.on_animation_frame(now_ms)
    }

    /// Block until the decode pipeline settles or `timeout` passes. Returns the resulting state.
    pub fn wait_for_decode(&mut self, timeout: Duration) -> PipelineState {
        if let Some(outcome) = self.take_outcome(Some(timeout)) {
            self.apply_outcome(outcome);
        }
        self.pipeline
    }

    pub fn set_progress(&mut self, progress: f64, opts: SetProgressOptions) -> bool {
        if self.destroyed {
            return false;
        }
        self.controller.set_progress(progress, opts)
    }

    /// Apply a progress value from the scroll position.
    pub fn set_scroll_progress(&mut self, progress: f64) -> bool {
        if self.options.debug {
            tracing::info!(progress, "scrolled");
        }
        self.set_progress(progress, SetProgressOptions::default())
    }

    /// Repaint after the container changed size.
    pub fn resize(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        diag!(self.options.debug, "resizing");
        self.controller.repaint()
    }

    /// Tear down: cancel the transition, unsubscribe, stop decoding, release frames. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        diag!(self.options.debug, "destroying scrolly instance");

        if let (Some(source), Some(id)) = (self.progress_source.as_mut(), self.subscription.take())
        {
            source.unsubscribe(id);
        }
        self.progress_rx = None;
        if let Some(worker) = self.worker.take() {
            // The worker notices at its next check; its frames land in a released buffer.
            worker.cancel.store(true, Ordering::Release);
        }
        self.controller.teardown();
    }

    fn drain_media_events(&mut self) {
        while let Some(event) = self.controller.media_mut().poll_event() {
            match event {
                MediaEvent::LoadedMetadata if !self.metadata_loaded => {
                    self.metadata_loaded = true;
                    let progress = match (&self.progress_source, self.options.track_scroll) {
                        (Some(source), true) => source.current(),
                        _ => self.options.initial_progress.unwrap_or(0.0),
                    };
                    diag!(
                        self.options.debug,
                        duration = self.controller.media().duration(),
                        progress,
                        "media metadata loaded"
                    );
                    self.controller
                        .set_progress(progress, SetProgressOptions::jump());
                    if let Some(reason) = self.deferred_ready.take() {
                        self.notify_ready(Readiness::NativeOnly(reason));
                    }
                }
                MediaEvent::LoadedMetadata => {
                    // Reloaded after a decode failure: keep the position.
                    let t = self.controller.current_time();
                    self.controller.media_mut().set_current_time(t);
                }
                MediaEvent::Progress => {
                    self.controller.repaint();
                }
            }
        }
    }

    fn drain_progress(&mut self) {
        let Some(rx) = &self.progress_rx else {
            return;
        };
        let Some(latest) = rx.try_iter().last() else {
            return;
        };
        if self.metadata_loaded {
            self.set_scroll_progress(latest);
        }
    }

    fn take_outcome(&mut self, block: Option<Duration>) -> Option<DecodeOutcome> {
        let worker = self.worker.as_mut()?;
        let received = match block {
            None => match worker.outcome.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => None,
            },
            Some(timeout) => match worker.outcome.recv_timeout(timeout) {
                Ok(outcome) => Some(outcome),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };
        worker.join();
        self.worker = None;
        Some(received.unwrap_or_else(|| {
            self.frames.discard();
            DecodeOutcome::Failed(ScrollyError::decoder(
                "decode worker exited without a result",
            ))
        }))
    }

    fn apply_outcome(&mut self, outcome: DecodeOutcome) {
        match outcome {
            DecodeOutcome::Ready(summary, frame_count, frame_rate) => {
                self.pipeline = PipelineState::Buffered;
                self.controller.media_mut().pause();
                self.controller.repaint();
                diag!(
                    self.options.debug,
                    codec = %summary.codec,
                    frames = frame_count,
                    frame_rate,
                    "decoded frames ready"
                );
                self.notify_ready(Readiness::Buffered {
                    frame_count,
                    frame_rate,
                });
            }
            DecodeOutcome::Empty(summary) => {
                tracing::warn!(
                    samples = summary.samples,
                    "decoder produced no frames, using native playback"
                );
                self.pipeline = PipelineState::NativeOnly;
                self.notify_ready(Readiness::NativeOnly(NativeReason::NoFrames));
            }
            DecodeOutcome::Failed(e) => self.fall_back(e),
        }
    }

    fn fall_back(&mut self, error: ScrollyError) {
        if error.is_decode_path() {
            tracing::warn!(error = %error, "decode pipeline failed, using native playback");
        } else {
            tracing::error!(
                error = %error,
                "decode worker failed unexpectedly, using native playback"
            );
        }
        self.pipeline = PipelineState::NativeOnly;
        self.frames.discard();
        self.controller.reload_media();
        self.notify_ready(Readiness::NativeOnly(NativeReason::Failed(error)));
    }

    fn notify_ready(&mut self, readiness: Readiness) {
        if let Some(f) = self.on_ready.as_mut() {
            f(&readiness);
        }
    }
}

impl<M: MediaElement, P: PaintSurface> Drop for ScrollyVideo<M, P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "../tests/unit/instance.rs"]
mod tests;
