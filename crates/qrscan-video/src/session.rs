use crate::{CaptureRequest, CaptureStream};
use qrscan_base::Vec2;
use qrscan_image::Bitmap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// An open capture stream together with the request that opened it.
///
/// Clones share the same stream. Stopping any clone stops the stream for all
/// of them.
#[derive(Clone)]
pub struct CameraSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: u64,
    request: CaptureRequest,
    stream: Mutex<Box<dyn CaptureStream>>,
    stopped: AtomicBool,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("id", &self.inner.id)
            .field("request", &self.inner.request)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl CameraSession {
    pub fn new(request: CaptureRequest, stream: Box<dyn CaptureStream>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                request,
                stream: Mutex::new(stream),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The capability candidate this session was opened with.
    pub fn request(&self) -> &CaptureRequest {
        &self.inner.request
    }

    pub fn dimensions(&self) -> Vec2<usize> {
        self.inner
            .stream
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .dimensions()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    pub fn is_ended(&self) -> bool {
        self.inner
            .stream
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_ended()
    }

    /// Stopped sessions and ended streams can no longer produce frames.
    pub fn is_live(&self) -> bool {
        !self.is_stopped() && !self.is_ended()
    }

    /// Run `f` on the current frame, if the session has one.
    pub fn with_frame<R>(&self, f: impl FnOnce(&Bitmap) -> R) -> Option<R> {
        if self.is_stopped() {
            return None;
        }
        let mut stream = self.inner.stream.lock().unwrap_or_else(|e| e.into_inner());
        stream.current_frame().map(f)
    }

    /// Stop the underlying stream. Returns false if it was already stopped.
    pub fn stop(&self) -> bool {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner
            .stream
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stop();
        log::info!("camera session {} stopped", self.inner.id);
        true
    }
}
