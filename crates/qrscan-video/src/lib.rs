//! Live video input for the qrscan workspace.
//!
//! A [`CaptureDevice`] opens [`CaptureStream`]s. A [`CameraController`] walks
//! an ordered list of capability candidates to open one, wraps it in a
//! [`CameraSession`], and releases it again after a grace period once the
//! camera is switched off. The scan loop never touches the device directly;
//! it samples center crops from a [`FrameSource`] that the controller binds
//! sessions to.

pub mod camera;
pub mod config;
pub mod convert;
pub mod device;
pub mod error;
pub mod session;
pub mod source;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use camera::CameraController;
pub use config::{CameraConfig, CaptureRequest, DEFAULT_TEARDOWN_DELAY, FacingMode};
pub use convert::yuyv_to_bitmap;
pub use device::{CaptureDevice, CaptureStream};
pub use error::VideoError;
pub use session::CameraSession;
pub use source::{CropGeometry, Frame, FrameSource, Playback, crop_side_for};

#[cfg(feature = "v4l2")]
pub use v4l2::{V4l2Device, V4l2Stream};
