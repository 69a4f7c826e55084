use crate::{CaptureRequest, VideoError};
use qrscan_base::Vec2;
use qrscan_image::Bitmap;

/// A camera backend that can open capture streams.
#[allow(async_fn_in_trait)]
pub trait CaptureDevice {
    /// Try to open a stream satisfying `request`.
    ///
    /// Returns an error if the device cannot honour the request; the caller
    /// then moves on to its next candidate.
    async fn open(&mut self, request: &CaptureRequest) -> Result<Box<dyn CaptureStream>, VideoError>;
}

/// A running capture stream.
pub trait CaptureStream: Send {
    /// Native frame size. Zero until the first frame is known.
    fn dimensions(&self) -> Vec2<usize>;

    /// The most recent frame, as RGBA8.
    fn current_frame(&mut self) -> Option<&Bitmap>;

    /// True once the stream has stopped delivering frames on its own.
    fn is_ended(&self) -> bool {
        false
    }

    /// Stop the stream and release the hardware.
    fn stop(&mut self);
}
