use std::fmt;

#[derive(Debug)]
pub enum VideoError {
    /// The source is paused, ended, or has nothing bound. Recoverable.
    Unavailable(String),
    /// Every capture candidate failed to open.
    CaptureStart(String),
    Device(String),
    Stream(String),
}

impl fmt::Display for VideoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoError::Unavailable(msg) => write!(f, "source unavailable: {msg}"),
            VideoError::CaptureStart(msg) => write!(f, "couldn't start camera: {msg}"),
            VideoError::Device(msg) => write!(f, "device error: {msg}"),
            VideoError::Stream(msg) => write!(f, "stream error: {msg}"),
        }
    }
}

impl std::error::Error for VideoError {}

impl From<std::io::Error> for VideoError {
    fn from(err: std::io::Error) -> Self {
        VideoError::Device(err.to_string())
    }
}

impl From<qrscan_image::ImageError> for VideoError {
    fn from(err: qrscan_image::ImageError) -> Self {
        VideoError::Stream(err.to_string())
    }
}
