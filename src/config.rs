use std::time::Duration;

use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Construction options for a [`crate::ScrollyVideo`] instance.
///
/// Deserializable from JSON; every field except `src` has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollyOptions {
    /// Source locator handed to the media element and the decode backend.
    pub src: String,
    /// Multiplier applied to every transition step.
    #[serde(default = "default_transition_speed")]
    pub transition_speed: f64,
    /// Distance in seconds below which a transition counts as arrived.
    #[serde(default = "default_frame_threshold")]
    pub frame_threshold: f64,
    /// Run the frame decode pipeline. When `false` playback always follows the native timeline.
    #[serde(default = "default_true", alias = "use_web_codecs")]
    pub use_decode_pipeline: bool,
    /// Subscribe to the host's progress source at construction.
    #[serde(default = "default_true")]
    pub track_scroll: bool,
    /// Progress applied once metadata is loaded when scroll tracking is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_progress: Option<f64>,
    /// Emit diagnostic lines at `info` level. No behavioral effect.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub decode: DecodeOptions,
}

/// Tuning for the decode session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecodeOptions {
    /// Decoding counts as finished after this long without new decoder output.
    #[serde(default = "default_quiet_interval_ms")]
    pub quiet_interval_ms: u64,
    /// Size of each read from the byte source.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

fn default_transition_speed() -> f64 {
    8.0
}

fn default_frame_threshold() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_quiet_interval_ms() -> u64 {
    500
}

fn default_read_chunk_bytes() -> usize {
    64 * 1024
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            quiet_interval_ms: default_quiet_interval_ms(),
            read_chunk_bytes: default_read_chunk_bytes(),
        }
    }
}

impl DecodeOptions {
    pub fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.quiet_interval_ms)
    }
}

impl ScrollyOptions {
    /// Options for `src` with every other field at its default.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            transition_speed: default_transition_speed(),
            frame_threshold: default_frame_threshold(),
            use_decode_pipeline: true,
            track_scroll: true,
            initial_progress: None,
            debug: false,
            decode: DecodeOptions::default(),
        }
    }

    /// Parse options from a JSON document and validate them.
    pub fn from_json(json: &str) -> ScrollyResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| ScrollyError::configuration(format!("invalid options json: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> ScrollyResult<()> {
        if self.src.trim().is_empty() {
            return Err(ScrollyError::configuration("src must be non-empty"));
        }
        if !self.transition_speed.is_finite() || self.transition_speed <= 0.0 {
            return Err(ScrollyError::configuration(format!(
                "transition_speed must be a positive finite number, got {}",
                self.transition_speed
            )));
        }
        if !self.frame_threshold.is_finite() || self.frame_threshold <= 0.0 {
            return Err(ScrollyError::configuration(format!(
                "frame_threshold must be a positive finite number, got {}",
                self.frame_threshold
            )));
        }
        if let Some(p) = self.initial_progress
            && !p.is_finite()
        {
            return Err(ScrollyError::configuration(
                "initial_progress must be finite",
            ));
        }
        if self.decode.read_chunk_bytes == 0 {
            return Err(ScrollyError::configuration(
                "decode.read_chunk_bytes must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
