use qrscan_image::ImageError;
use std::fmt;
use std::time::Duration;

/// Failure reported by a decode engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The worker thread could not be started.
    Spawn(String),
    /// The worker is gone, either disposed or crashed.
    Closed,
    /// The engine failed while decoding. The worker has shut down.
    Engine(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Spawn(msg) => write!(f, "failed to start decode worker: {msg}"),
            ChannelError::Closed => write!(f, "decode worker closed"),
            ChannelError::Engine(msg) => write!(f, "decode engine failed: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<EngineError> for ChannelError {
    fn from(err: EngineError) -> Self {
        ChannelError::Engine(err.message)
    }
}

/// Fatal error of a scan loop. The loop has stopped and must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    EngineFailure(ChannelError),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::EngineFailure(err) => write!(f, "scan loop stopped: {err}"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::EngineFailure(err) => Some(err),
        }
    }
}

impl From<ChannelError> for ScanError {
    fn from(err: ChannelError) -> Self {
        ScanError::EngineFailure(err)
    }
}

/// Outcome of a failed one-shot decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No result within the deadline.
    Timeout(Duration),
    /// The engine found no code in the image.
    NotFound,
    UnsupportedInput(String),
    LoadError(String),
    Engine(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Timeout(after) => write!(f, "scanner timeout after {after:?}"),
            DecodeError::NotFound => write!(f, "no QR code found"),
            DecodeError::UnsupportedInput(msg) => write!(f, "unsupported image source: {msg}"),
            DecodeError::LoadError(msg) => write!(f, "image load error: {msg}"),
            DecodeError::Engine(msg) => write!(f, "decode engine error: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<ImageError> for DecodeError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(msg) => DecodeError::UnsupportedInput(msg),
            other => DecodeError::LoadError(other.to_string()),
        }
    }
}

impl From<ChannelError> for DecodeError {
    fn from(err: ChannelError) -> Self {
        DecodeError::Engine(err.to_string())
    }
}
