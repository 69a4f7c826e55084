use crate::{CameraConfig, CameraSession, CaptureDevice, FrameSource, VideoError};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

// Session slot shared with the teardown task. The generation is bumped on
// every cancel so a teardown that lost the race leaves the session alone.
#[derive(Default)]
struct SessionSlot {
    session: Option<CameraSession>,
    generation: u64,
}

/// Powers a capture device on and off on behalf of a [`FrameSource`].
///
/// Switching off pauses the source at once but keeps the camera open for the
/// configured grace period, so a quick off/on toggle reuses the session
/// instead of re-acquiring the hardware.
pub struct CameraController<D: CaptureDevice> {
    device: D,
    source: FrameSource,
    config: CameraConfig,
    slot: Arc<Mutex<SessionSlot>>,
    teardown: Option<JoinHandle<()>>,
    active: bool,
}

impl<D: CaptureDevice> CameraController<D> {
    pub fn new(device: D, source: FrameSource, config: CameraConfig) -> Self {
        Self {
            device,
            source,
            config,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
            teardown: None,
            active: false,
        }
    }

    /// Switch the camera on or off.
    ///
    /// # Errors
    ///
    /// Returns `VideoError::CaptureStart` when switching on and no capture
    /// candidate could be opened. There is no automatic retry.
    pub async fn set_active(&mut self, active: bool) -> Result<(), VideoError> {
        if active {
            self.activate().await
        } else {
            self.deactivate();
            Ok(())
        }
    }

    async fn activate(&mut self) -> Result<(), VideoError> {
        self.cancel_teardown();
        self.active = true;

        if let Some(session) = self.live_session() {
            if self.source.session().map(|s| s.id()) != Some(session.id()) {
                self.source.bind(session.clone());
            }
            log::debug!("reusing camera session {}", session.id());
            self.source.play();
            return Ok(());
        }

        let result = self.open_session().await;
        if result.is_err() {
            self.active = false;
        }
        result
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.source.pause();
        self.schedule_teardown();
    }

    async fn open_session(&mut self) -> Result<(), VideoError> {
        let candidates = self.config.candidates().to_vec();
        for request in &candidates {
            log::info!("opening camera ({})", request);
            match self.device.open(request).await {
                Ok(stream) => {
                    let session = CameraSession::new(request.clone(), stream);
                    log::info!("camera session {} opened ({})", session.id(), request);
                    self.slot.lock().unwrap_or_else(|e| e.into_inner()).session =
                        Some(session.clone());
                    self.source.bind(session);
                    self.source.play();
                    return Ok(());
                }
                Err(error) => {
                    log::warn!("camera candidate ({}) failed: {}", request, error);
                }
            }
        }
        log::error!("couldn't start camera: all {} candidates failed", candidates.len());
        Err(VideoError::CaptureStart(format!(
            "all {} capture candidates failed",
            candidates.len()
        )))
    }

    // Current session if it can still deliver frames; a dead one is dropped.
    fn live_session(&self) -> Option<CameraSession> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.session.as_ref()?.is_live() {
            return slot.session.clone();
        }
        let session = slot.session.take()?;
        log::debug!("discarding dead camera session {}", session.id());
        self.source.unbind(session.id());
        session.stop();
        None
    }

    fn schedule_teardown(&mut self) {
        self.cancel_teardown();

        let generation = {
            let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if slot.session.is_none() {
                return;
            }
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let source = self.source.clone();
        let delay = self.config.teardown_delay();
        log::debug!("camera teardown scheduled in {:?}", delay);

        self.teardown = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let session = {
                let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
                if slot.generation != generation {
                    return;
                }
                slot.session.take()
            };
            if let Some(session) = session {
                source.unbind(session.id());
                session.stop();
                log::info!("camera released after {:?} off", delay);
            }
        }));
    }

    /// Cancel a pending teardown. Returns true if one was pending.
    pub fn cancel_teardown(&mut self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).generation += 1;
        match self.teardown.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                log::debug!("cancelled pending camera teardown");
                true
            }
            _ => false,
        }
    }

    pub fn has_pending_teardown(&self) -> bool {
        self.teardown.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The open session, including one that is waiting for teardown.
    pub fn session(&self) -> Option<CameraSession> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).session.clone()
    }

    pub fn source(&self) -> &FrameSource {
        &self.source
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl<D: CaptureDevice> Drop for CameraController<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.teardown.take() {
            handle.abort();
        }
        let session = self.slot.lock().unwrap_or_else(|e| e.into_inner()).session.take();
        if let Some(session) = session {
            self.source.pause();
            self.source.unbind(session.id());
            session.stop();
        }
    }
}
