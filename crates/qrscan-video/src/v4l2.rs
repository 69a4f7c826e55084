use crate::convert::yuyv_to_bitmap;
use crate::{CaptureDevice, CaptureRequest, CaptureStream, VideoError};
use qrscan_base::Vec2;
use qrscan_image::Bitmap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream as _;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

const BUFFER_COUNT: u32 = 4;
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

/// V4L2 capture device, e.g. `/dev/video0`.
///
/// V4L2 has no notion of facing mode, so only the width requirement of a
/// request is checked.
#[derive(Debug, Clone)]
pub struct V4l2Device {
    path: PathBuf,
}

impl V4l2Device {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureDevice for V4l2Device {
    async fn open(&mut self, request: &CaptureRequest) -> Result<Box<dyn CaptureStream>, VideoError> {
        if let Some(mode) = request.facing_mode {
            log::debug!("{} ignores facing mode {}", self.path.display(), mode);
        }
        let stream = V4l2Stream::start(self.path.clone(), request.min_width).await?;
        Ok(Box::new(stream))
    }
}

struct Shared {
    latest: Mutex<Option<Bitmap>>,
    stop: AtomicBool,
    ended: AtomicBool,
}

/// A running V4L2 stream. Frames are captured on a dedicated thread; only
/// the most recent one is kept.
pub struct V4l2Stream {
    size: Vec2<usize>,
    shared: Arc<Shared>,
    frame: Option<Bitmap>,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for V4l2Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4l2Stream")
            .field("size", &self.size)
            .field("ended", &self.shared.ended.load(Ordering::Acquire))
            .field("thread_handle", &self.thread_handle.is_some())
            .finish()
    }
}

impl V4l2Stream {
    async fn start(path: PathBuf, min_width: Option<usize>) -> Result<Self, VideoError> {
        let shared = Arc::new(Shared {
            latest: Mutex::new(None),
            stop: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        });
        let (init_tx, init_rx) = oneshot::channel();

        let thread_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            let (device, format) = match open_device(&path, min_width) {
                Ok(opened) => opened,
                Err(e) => {
                    let _ = init_tx.send(Err(e));
                    return;
                }
            };
            let size = Vec2::new(format.width as usize, format.height as usize);
            let _ = init_tx.send(Ok(size));

            if let Err(e) = capture_loop(&device, format, &thread_shared) {
                log::error!("capture thread for {} failed: {}", path.display(), e);
            }
            thread_shared.ended.store(true, Ordering::Release);
        });

        let size = match init_rx.await {
            Ok(Ok(size)) => size,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(VideoError::Device("capture thread exited during setup".to_string()));
            }
        };

        log::info!("v4l2 stream started at {}", size);
        Ok(Self {
            size,
            shared,
            frame: None,
            thread_handle: Some(handle),
        })
    }
}

fn open_device(path: &Path, min_width: Option<usize>) -> Result<(Device, Format), VideoError> {
    let device = Device::with_path(path)?;

    let width = min_width.map(|w| w as u32).unwrap_or(DEFAULT_WIDTH).max(DEFAULT_WIDTH);
    let requested = Format::new(width, DEFAULT_HEIGHT, FourCC::new(b"YUYV"));
    let format = Capture::set_format(&device, &requested)?;

    if format.fourcc != FourCC::new(b"YUYV") && format.fourcc != FourCC::new(b"MJPG") {
        return Err(VideoError::Device(format!(
            "unsupported pixel format {}",
            format.fourcc
        )));
    }
    if let Some(min_width) = min_width {
        if (format.width as usize) < min_width {
            return Err(VideoError::Device(format!(
                "device offers width {}, need at least {}",
                format.width, min_width
            )));
        }
    }
    Ok((device, format))
}

fn capture_loop(device: &Device, format: Format, shared: &Shared) -> Result<(), VideoError> {
    let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)?;
    let size = Vec2::new(format.width as usize, format.height as usize);
    let mjpeg = format.fourcc == FourCC::new(b"MJPG");

    while !shared.stop.load(Ordering::Acquire) {
        let (data, _metadata) = stream.next()?;
        let bitmap = if mjpeg {
            qrscan_image::decode_bitmap_blocking(data)?
        } else {
            yuyv_to_bitmap(data, size)
                .ok_or_else(|| VideoError::Stream(format!("short YUYV frame ({} bytes)", data.len())))?
        };
        *shared.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(bitmap);
    }
    Ok(())
}

impl CaptureStream for V4l2Stream {
    fn dimensions(&self) -> Vec2<usize> {
        self.size
    }

    fn current_frame(&mut self) -> Option<&Bitmap> {
        let latest = self
            .shared
            .latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if latest.is_some() {
            self.frame = latest;
        }
        self.frame.as_ref()
    }

    fn is_ended(&self) -> bool {
        self.shared.ended.load(Ordering::Acquire)
    }

    fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        self.frame = None;
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}
