pub type ScrollyResult<T> = Result<T, ScrollyError>;

/// Decode-path errors are absorbed by the instance and downgrade playback to the native timeline.
#[derive(thiserror::Error, Debug)]
pub enum ScrollyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported container: {0}")]
    UnsupportedContainer(String),

    #[error("demux error: {0}")]
    Demux(String),

    #[error("decoder fault: {0}")]
    DecoderFault(String),

    #[error("numeric degenerate: {0}")]
    NumericDegenerate(String),

    #[error("decode cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrollyError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedContainer(msg.into())
    }

    pub fn demux(msg: impl Into<String>) -> Self {
        Self::Demux(msg.into())
    }

    pub fn decoder(msg: impl Into<String>) -> Self {
        Self::DecoderFault(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::NumericDegenerate(msg.into())
    }

    /// `true` for failures that belong to the decode pipeline and therefore only downgrade the
    /// instance to native playback.
    pub fn is_decode_path(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedContainer(_)
                | Self::Demux(_)
                | Self::DecoderFault(_)
                | Self::Cancelled
                | Self::Io(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
