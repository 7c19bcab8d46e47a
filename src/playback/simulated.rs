use std::collections::VecDeque;

use crate::playback::surface::{MediaElement, MediaEvent};

/// Headless media element with a wall-clock driven timeline.
///
/// While playing, [`MediaElement::sync_clock`] advances the position by `rate * elapsed`; playback
/// pauses at the end. Metadata becomes available on the first [`MediaElement::load`].
#[derive(Clone, Debug)]
pub struct SimulatedMedia {
    duration: f64,
    metadata_loaded: bool,
    current_time: f64,
    playback_rate: f64,
    paused: bool,
    last_clock_ms: Option<f64>,
    events: VecDeque<MediaEvent>,
    loads: usize,
    seeks: usize,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            metadata_loaded: false,
            current_time: 0.0,
            playback_rate: 1.0,
            paused: true,
            last_clock_ms: None,
            events: VecDeque::new(),
            loads: 0,
            seeks: 0,
        }
    }

    /// Advance the timeline by `dt` seconds of wall time.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || !self.metadata_loaded || dt <= 0.0 {
            return;
        }
        self.current_time += self.playback_rate * dt;
        if self.current_time >= self.duration {
            self.current_time = self.duration;
            self.paused = true;
        } else if self.current_time <= 0.0 {
            self.current_time = 0.0;
            self.paused = true;
        }
    }

    /// Queue a buffering notification.
    pub fn emit_progress(&mut self) {
        self.events.push_back(MediaEvent::Progress);
    }

    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Number of direct writes to the clock.
    pub fn seek_count(&self) -> usize {
        self.seeks
    }
}

impl MediaElement for SimulatedMedia {
    fn load(&mut self) {
        self.loads += 1;
        self.metadata_loaded = true;
        self.current_time = 0.0;
        self.playback_rate = 1.0;
        self.paused = true;
        self.events.push_back(MediaEvent::LoadedMetadata);
    }

    fn play(&mut self) {
        if self.metadata_loaded {
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, t: f64) {
        if !t.is_finite() {
            return;
        }
        self.seeks += 1;
        self.current_time = t.clamp(0.0, self.duration.max(0.0));
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if rate.is_finite() {
            self.playback_rate = rate;
        }
    }

    fn duration(&self) -> f64 {
        if self.metadata_loaded {
            self.duration
        } else {
            f64::NAN
        }
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.pop_front()
    }

    fn sync_clock(&mut self, now_ms: f64) {
        if let Some(last) = self.last_clock_ms {
            self.advance((now_ms - last) / 1000.0);
        }
        self.last_clock_ms = Some(now_ms);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/simulated.rs"]
mod tests;
