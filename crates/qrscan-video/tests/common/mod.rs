#![allow(dead_code)]

use qrscan_base::Vec2;
use qrscan_image::Bitmap;
use qrscan_video::{CaptureDevice, CaptureRequest, CaptureStream, VideoError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Pixel (x, y) is `[x / 4, y / 4, 0, 255]`.
pub fn gradient(width: usize, height: usize) -> Bitmap {
    Bitmap::from_fn(Vec2::new(width, height), |x, y| [(x / 4) as u8, (y / 4) as u8, 0, 255])
}

/// Observes a mock stream from the outside.
#[derive(Clone, Default)]
pub struct StreamTally {
    stops: Arc<AtomicUsize>,
    ended: Arc<AtomicBool>,
}

impl StreamTally {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn end(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

pub struct MockStream {
    pub dimensions: Vec2<usize>,
    pub frame: Option<Bitmap>,
    tally: StreamTally,
}

impl MockStream {
    pub fn new(frame: Bitmap) -> (Self, StreamTally) {
        let tally = StreamTally::default();
        let stream = Self {
            dimensions: frame.size,
            frame: Some(frame),
            tally: tally.clone(),
        };
        (stream, tally)
    }

    pub fn boxed(frame: Bitmap) -> (Box<dyn CaptureStream>, StreamTally) {
        let (stream, tally) = Self::new(frame);
        (Box::new(stream), tally)
    }
}

impl CaptureStream for MockStream {
    fn dimensions(&self) -> Vec2<usize> {
        self.dimensions
    }

    fn current_frame(&mut self) -> Option<&Bitmap> {
        self.frame.as_ref()
    }

    fn is_ended(&self) -> bool {
        self.tally.ended.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.tally.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A camera that only honours requests up to `max_width`.
#[derive(Clone)]
pub struct MockDevice {
    max_width: Option<usize>,
    frame_size: Vec2<usize>,
    pub opens: Arc<Mutex<Vec<CaptureRequest>>>,
    pub tallies: Arc<Mutex<Vec<StreamTally>>>,
}

impl MockDevice {
    pub fn accepting(max_width: usize) -> Self {
        Self {
            max_width: Some(max_width),
            frame_size: Vec2::new(640, 480),
            opens: Arc::new(Mutex::new(Vec::new())),
            tallies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            max_width: None,
            ..Self::accepting(0)
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn total_stops(&self) -> usize {
        self.tallies.lock().unwrap().iter().map(|p| p.stops()).sum()
    }
}

impl CaptureDevice for MockDevice {
    async fn open(&mut self, request: &CaptureRequest) -> Result<Box<dyn CaptureStream>, VideoError> {
        self.opens.lock().unwrap().push(request.clone());
        let max_width = self
            .max_width
            .ok_or_else(|| VideoError::Device("no camera".to_string()))?;
        if request.min_width.is_some_and(|w| w > max_width) {
            return Err(VideoError::Device(format!("width {max_width} too small")));
        }
        let (stream, tally) = MockStream::boxed(gradient(self.frame_size.x, self.frame_size.y));
        self.tallies.lock().unwrap().push(tally);
        Ok(stream)
    }
}
