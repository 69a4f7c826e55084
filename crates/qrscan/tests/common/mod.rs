#![allow(dead_code)]

use qrscan::{DecodeEngine, EngineError};
use qrscan_base::Vec2;
use qrscan_image::{Bitmap, GrayscaleWeights};
use qrscan_video::{CameraSession, CaptureRequest, CaptureStream, FrameSource};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Alpha value that marks payload pixels in [`marked_bitmap`].
const MARK_ALPHA: u8 = 254;

/// White bitmap whose first pixels carry `text` in their red channel.
pub fn marked_bitmap(width: usize, height: usize, text: &str) -> Bitmap {
    let bytes = text.as_bytes();
    Bitmap::from_fn(Vec2::new(width, height), |x, y| {
        let index = y * width + x;
        match bytes.get(index) {
            Some(&byte) => [byte, 0, 0, MARK_ALPHA],
            None => [255, 255, 255, 255],
        }
    })
}

pub fn blank_bitmap(width: usize, height: usize) -> Bitmap {
    Bitmap::filled(Vec2::new(width, height), [255, 255, 255])
}

/// Shared counters between a test, its engine and its stream.
#[derive(Clone, Default)]
pub struct Tally {
    pub calls: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
    pub samples: Arc<AtomicUsize>,
    pub overlaps: Arc<AtomicUsize>,
    pub weight_updates: Arc<AtomicUsize>,
    pub last_weights: Arc<Mutex<Option<GrayscaleWeights>>>,
    pub last_size: Arc<Mutex<Option<Vec2<usize>>>>,
    pub dropped: Arc<AtomicBool>,
}

impl Tally {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn weight_updates(&self) -> usize {
        self.weight_updates.load(Ordering::SeqCst)
    }

    pub fn last_weights(&self) -> Option<GrayscaleWeights> {
        *self.last_weights.lock().unwrap()
    }

    pub fn last_size(&self) -> Option<Vec2<usize>> {
        *self.last_size.lock().unwrap()
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    NotFound,
    /// `code-1`, `code-2`, ...
    Counter,
    /// Text stored by [`marked_bitmap`].
    Marker,
    /// Decimal value of the first byte.
    FirstByte,
    /// Not found until call `n`, which fails.
    FailOn(usize),
    Panic,
    /// Never returns.
    Hang,
}

pub struct MockEngine {
    behavior: Behavior,
    delay: Duration,
    tally: Tally,
}

impl MockEngine {
    pub fn new(behavior: Behavior) -> (Self, Tally) {
        let tally = Tally::default();
        (Self::with_tally(behavior, tally.clone()), tally)
    }

    pub fn with_tally(behavior: Behavior, tally: Tally) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            tally,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl DecodeEngine for MockEngine {
    type Payload = String;

    fn decode(&mut self, pixels: &[u8], size: Vec2<usize>) -> Result<Option<String>, EngineError> {
        let call = self.tally.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.tally.last_size.lock().unwrap() = Some(size);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let result = match self.behavior {
            Behavior::NotFound => Ok(None),
            Behavior::Counter => Ok(Some(format!("code-{call}"))),
            Behavior::Marker => {
                let text: String = pixels
                    .chunks_exact(4)
                    .take_while(|px| px[3] == MARK_ALPHA)
                    .map(|px| px[0] as char)
                    .collect();
                Ok(if text.is_empty() { None } else { Some(text) })
            }
            Behavior::FirstByte => Ok(pixels.first().map(|b| b.to_string())),
            Behavior::FailOn(n) if call >= n => Err(EngineError::new(format!("engine broke on call {call}"))),
            Behavior::FailOn(_) => Ok(None),
            Behavior::Panic => panic!("engine panicked"),
            Behavior::Hang => loop {
                std::thread::park();
            },
        };

        self.tally.finished.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn set_grayscale_weights(&mut self, weights: GrayscaleWeights) {
        self.tally.weight_updates.fetch_add(1, Ordering::SeqCst);
        *self.tally.last_weights.lock().unwrap() = Some(weights);
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.tally.dropped.store(true, Ordering::SeqCst);
    }
}

/// Stream that counts samples and flags any sample taken while a decode is
/// still running.
pub struct CountingStream {
    frame: Bitmap,
    tally: Tally,
}

impl CaptureStream for CountingStream {
    fn dimensions(&self) -> Vec2<usize> {
        self.frame.size
    }

    fn current_frame(&mut self) -> Option<&Bitmap> {
        let previous = self.tally.samples.fetch_add(1, Ordering::SeqCst);
        if previous != self.tally.finished.load(Ordering::SeqCst) {
            self.tally.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        Some(&self.frame)
    }

    fn stop(&mut self) {}
}

/// A source bound to a counting stream, paused.
pub fn counting_source(tally: &Tally) -> FrameSource {
    let stream = CountingStream {
        frame: blank_bitmap(96, 64),
        tally: tally.clone(),
    };
    let source = FrameSource::new();
    source.bind(CameraSession::new(CaptureRequest::any(), Box::new(stream)));
    source
}

/// Poll `condition` every few milliseconds for up to two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Device whose streams are counting streams sharing `tally`.
pub struct CountingDevice {
    pub tally: Tally,
    pub opens: usize,
}

impl qrscan_video::CaptureDevice for CountingDevice {
    async fn open(
        &mut self,
        _request: &CaptureRequest,
    ) -> Result<Box<dyn CaptureStream>, qrscan_video::VideoError> {
        self.opens += 1;
        Ok(Box::new(CountingStream {
            frame: blank_bitmap(96, 64),
            tally: self.tally.clone(),
        }))
    }
}
