use std::fmt;
use std::time::Duration;

/// Grace period between switching the camera off and releasing it.
pub const DEFAULT_TEARDOWN_DELAY: Duration = Duration::from_millis(3000);

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Away from the user (rear camera on phones).
    Environment,
    /// Towards the user.
    User,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// One capability candidate tried while opening a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub facing_mode: Option<FacingMode>,
    pub min_width: Option<usize>,
}

impl CaptureRequest {
    pub fn any() -> Self {
        Self {
            facing_mode: None,
            min_width: None,
        }
    }

    pub fn environment() -> Self {
        Self {
            facing_mode: Some(FacingMode::Environment),
            min_width: None,
        }
    }

    pub fn user() -> Self {
        Self {
            facing_mode: Some(FacingMode::User),
            min_width: None,
        }
    }

    /// Require at least `width` pixels horizontally.
    pub fn with_min_width(mut self, width: usize) -> Self {
        self.min_width = Some(width);
        self
    }
}

impl fmt::Display for CaptureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.facing_mode {
            Some(mode) => write!(f, "facing {mode}")?,
            None => write!(f, "any camera")?,
        }
        if let Some(width) = self.min_width {
            write!(f, ", min width {width}")?;
        }
        Ok(())
    }
}

/// Configuration for camera power management.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    candidates: Vec<CaptureRequest>,
    teardown_delay: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            candidates: vec![
                CaptureRequest::environment().with_min_width(1024),
                CaptureRequest::environment().with_min_width(768),
                CaptureRequest::environment(),
            ],
            teardown_delay: DEFAULT_TEARDOWN_DELAY,
        }
    }
}

impl CameraConfig {
    /// Replace the capture candidates. They are tried in order, so put the
    /// most demanding first.
    pub fn with_candidates(mut self, candidates: Vec<CaptureRequest>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Set how long a switched-off camera stays open before it is released.
    pub fn with_teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay = delay;
        self
    }

    pub fn candidates(&self) -> &[CaptureRequest] {
        &self.candidates
    }

    pub fn teardown_delay(&self) -> Duration {
        self.teardown_delay
    }
}
