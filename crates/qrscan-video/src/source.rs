use crate::{CameraSession, VideoError};
use qrscan_base::{Rect, Vec2};
use qrscan_image::sample_square;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Playback state of a frame source. `Playing` is the play signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Paused,
    Playing,
    Ended,
}

/// Where a frame was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    /// Native size of the source frame.
    pub source: Vec2<usize>,
    /// Square region that was sampled.
    pub crop: Rect<usize>,
}

/// One sampled, cropped and scaled RGBA8 square.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Vec<u8>,
    /// Side length of the square in pixels.
    pub size: usize,
    pub geometry: CropGeometry,
}

impl Frame {
    pub fn dimensions(&self) -> Vec2<usize> {
        Vec2::new(self.size, self.size)
    }
}

/// Side of the central crop for a source of `dimensions`: two thirds of the
/// smaller side, rounded.
pub fn crop_side_for(dimensions: Vec2<usize>) -> usize {
    (dimensions.min_element() as f64 * 2.0 / 3.0).round() as usize
}

struct SourceState {
    session: Option<CameraSession>,
    crop_side: Option<usize>,
}

/// Live video feed as seen by the scanner.
///
/// Reads frames from whatever [`CameraSession`] is currently bound; it never
/// owns the camera. Clones share state.
#[derive(Clone)]
pub struct FrameSource {
    state: Arc<Mutex<SourceState>>,
    playback: Arc<watch::Sender<Playback>>,
}

impl Default for FrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("FrameSource")
            .field("session", &state.session)
            .field("crop_side", &state.crop_side)
            .field("playback", &*self.playback.borrow())
            .finish()
    }
}

impl FrameSource {
    pub fn new() -> Self {
        let (playback, _) = watch::channel(Playback::Paused);
        Self {
            state: Arc::new(Mutex::new(SourceState {
                session: None,
                crop_side: None,
            })),
            playback: Arc::new(playback),
        }
    }

    /// Attach a session and recompute the crop for its dimensions.
    pub fn bind(&self, session: CameraSession) {
        log::debug!("binding camera session {}", session.id());
        self.state.lock().unwrap_or_else(|e| e.into_inner()).session = Some(session);
        self.update_source_rect();
    }

    /// Detach the bound session, if it is the one with `session_id`.
    pub fn unbind(&self, session_id: u64) -> Option<CameraSession> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.session.as_ref().map(|s| s.id()) != Some(session_id) {
            return None;
        }
        log::debug!("unbinding camera session {}", session_id);
        state.session.take()
    }

    pub fn session(&self) -> Option<CameraSession> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).session.clone()
    }

    /// Native size of the bound stream, zero when nothing is bound.
    pub fn current_dimensions(&self) -> Vec2<usize> {
        self.session()
            .map(|session| session.dimensions())
            .unwrap_or_default()
    }

    /// Recompute the crop from the current dimensions.
    ///
    /// Call on resize or orientation changes. A sample already in progress
    /// keeps the geometry it started with.
    pub fn update_source_rect(&self) {
        let dimensions = self.current_dimensions();
        if dimensions.is_empty() {
            return;
        }
        let side = crop_side_for(dimensions);
        self.state.lock().unwrap_or_else(|e| e.into_inner()).crop_side = Some(side);
        log::debug!("crop side {} for {} source", side, dimensions);
    }

    /// Current crop side, if it has been computed.
    pub fn crop_side(&self) -> Option<usize> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).crop_side
    }

    pub fn playback(&self) -> Playback {
        *self.playback.borrow()
    }

    /// Subscribe to play/pause/end changes.
    pub fn subscribe(&self) -> watch::Receiver<Playback> {
        self.playback.subscribe()
    }

    /// Start delivering frames. Returns false if no live session is bound.
    pub fn play(&self) -> bool {
        let live = self.session().is_some_and(|session| session.is_live());
        if !live {
            log::warn!("play requested without a live camera session");
            return false;
        }
        self.set_playback(Playback::Playing);
        true
    }

    pub fn pause(&self) {
        self.set_playback(Playback::Paused);
    }

    pub fn end(&self) {
        self.set_playback(Playback::Ended);
    }

    fn set_playback(&self, playback: Playback) {
        self.playback.send_if_modified(|current| {
            if *current == playback {
                return false;
            }
            *current = playback;
            true
        });
    }

    /// Sample the central crop of the current frame into an
    /// `out_size`×`out_size` RGBA8 square, reusing `buffer`'s allocation.
    ///
    /// Returns `VideoError::Unavailable` when the source is paused, ended,
    /// unbound, or has no frame yet.
    pub fn sample_center_crop(&self, out_size: usize, buffer: Vec<u8>) -> Result<Frame, VideoError> {
        match self.playback() {
            Playback::Playing => {}
            Playback::Paused => return Err(VideoError::Unavailable("source is paused".to_string())),
            Playback::Ended => return Err(VideoError::Unavailable("source has ended".to_string())),
        }

        let (session, crop_side) = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            (state.session.clone(), state.crop_side)
        };
        let session =
            session.ok_or_else(|| VideoError::Unavailable("no camera session bound".to_string()))?;

        if session.is_ended() {
            self.end();
            return Err(VideoError::Unavailable("source has ended".to_string()));
        }

        session
            .with_frame(|bitmap| {
                let side = crop_side.unwrap_or_else(|| crop_side_for(bitmap.size));
                // stale geometry is clamped by centered_square
                let crop = Rect::centered_square(bitmap.size, side);
                Frame {
                    pixels: sample_square(bitmap, crop, out_size, buffer),
                    size: out_size,
                    geometry: CropGeometry {
                        source: bitmap.size,
                        crop,
                    },
                }
            })
            .ok_or_else(|| VideoError::Unavailable("no frame available".to_string()))
    }
}
