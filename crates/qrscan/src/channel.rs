use crate::{ChannelError, DecodeEngine, DecodeResult, WorkerRequest, WorkerResponse};
use qrscan_base::{Epoch, Vec2};
use qrscan_image::GrayscaleWeights;
use qrscan_video::Frame;
use std::thread;
use tokio::sync::mpsc;

/// Pixels handed to the decode worker. Moving the buffer in is the transfer;
/// it comes back in [`Decoded`].
#[derive(Debug)]
pub struct DecodeRequest {
    pub pixels: Vec<u8>,
    pub size: Vec2<usize>,
}

impl DecodeRequest {
    pub fn new(pixels: Vec<u8>, size: Vec2<usize>) -> Self {
        Self { pixels, size }
    }
}

impl From<Frame> for DecodeRequest {
    fn from(frame: Frame) -> Self {
        let size = frame.dimensions();
        Self {
            pixels: frame.pixels,
            size,
        }
    }
}

/// A settled round-trip plus the buffer that was sent.
#[derive(Debug)]
pub struct Decoded<T> {
    pub result: DecodeResult<T>,
    pub pixels: Vec<u8>,
}

/// Request/response channel to a decode engine running on its own thread.
///
/// At most one decode is in flight: [`submit`](DecodeChannel::submit) borrows
/// the channel mutably for the whole round-trip. A response that arrives for a
/// submit that was cancelled is discarded by the next one.
pub struct DecodeChannel<T> {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    responses: mpsc::UnboundedReceiver<WorkerResponse<T>>,
    epoch: Epoch,
    failure: Option<ChannelError>,
}

impl<T> std::fmt::Debug for DecodeChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeChannel")
            .field("epoch", &self.epoch.current())
            .field("closed", &self.requests.is_closed())
            .field("failure", &self.failure)
            .finish()
    }
}

/// Sends configuration to a [`DecodeChannel`]'s worker without borrowing the
/// channel. Does not keep the worker alive.
#[derive(Debug, Clone)]
pub struct ChannelControl {
    requests: mpsc::WeakUnboundedSender<WorkerRequest>,
}

impl ChannelControl {
    /// Fire-and-forget. Fails only if the worker is gone.
    pub fn set_grayscale_weights(&self, weights: GrayscaleWeights) -> Result<(), ChannelError> {
        let requests = self.requests.upgrade().ok_or(ChannelError::Closed)?;
        requests
            .send(WorkerRequest::SetGrayscaleWeights(weights))
            .map_err(|_| ChannelError::Closed)
    }
}

impl<T: Send + 'static> DecodeChannel<T> {
    /// Start `engine` on a dedicated worker thread.
    pub fn spawn<E>(engine: E) -> Result<Self, ChannelError>
    where
        E: DecodeEngine<Payload = T>,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let epoch = Epoch::new();

        let worker_epoch = epoch.clone();
        thread::Builder::new()
            .name("qrscan-decode".to_string())
            .spawn(move || run_worker(engine, request_rx, response_tx, worker_epoch))
            .map_err(|e| ChannelError::Spawn(e.to_string()))?;

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            epoch,
            failure: None,
        })
    }

    /// Send one frame and wait for its result.
    ///
    /// # Errors
    ///
    /// `ChannelError::Engine` if the engine failed on this request,
    /// `ChannelError::Closed` if the worker is gone. Either way the channel is
    /// unusable afterwards.
    pub async fn submit(&mut self, request: DecodeRequest) -> Result<Decoded<T>, ChannelError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let id = self.epoch.advance();
        while let Ok(stale) = self.responses.try_recv() {
            log::debug!("discarding stale decode response {}", stale.id());
        }

        let DecodeRequest { pixels, size } = request;
        self.requests
            .send(WorkerRequest::Decode { id, pixels, size })
            .map_err(|_| self.fail(ChannelError::Closed))?;

        loop {
            let response = match self.responses.recv().await {
                Some(response) => response,
                None => return Err(self.fail(ChannelError::Closed)),
            };
            if response.id() != id {
                log::debug!("discarding stale decode response {}", response.id());
                continue;
            }
            return match response {
                WorkerResponse::Result { payload, pixels, .. } => Ok(Decoded {
                    result: DecodeResult::from(payload),
                    pixels,
                }),
                WorkerResponse::Failed { reason, .. } => Err(self.fail(ChannelError::Engine(reason))),
            };
        }
    }

    fn fail(&mut self, error: ChannelError) -> ChannelError {
        log::error!("decode channel failed: {}", error);
        self.failure = Some(error.clone());
        error
    }

    /// Fire-and-forget; applies to later requests.
    pub fn set_grayscale_weights(&self, weights: GrayscaleWeights) -> Result<(), ChannelError> {
        self.requests
            .send(WorkerRequest::SetGrayscaleWeights(weights))
            .map_err(|_| ChannelError::Closed)
    }

    pub fn control(&self) -> ChannelControl {
        ChannelControl {
            requests: self.requests.downgrade(),
        }
    }

    /// True once the worker has exited or the channel has failed.
    pub fn is_closed(&self) -> bool {
        self.failure.is_some() || self.requests.is_closed()
    }

    /// Shut the worker down. A request still being decoded finishes and its
    /// response is dropped.
    pub fn dispose(self) {
        // invalidate whatever is in flight
        self.epoch.advance();
        log::debug!("disposing decode channel");
    }
}

fn run_worker<E: DecodeEngine>(
    mut engine: E,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    responses: mpsc::UnboundedSender<WorkerResponse<E::Payload>>,
    epoch: Epoch,
) {
    log::debug!("decode worker started");
    while let Some(request) = requests.blocking_recv() {
        match request {
            WorkerRequest::SetGrayscaleWeights(weights) => {
                log::debug!("decode worker weights set to {:?}", weights);
                engine.set_grayscale_weights(weights);
            }
            WorkerRequest::Decode { id, pixels, size } => {
                if epoch.is_superseded(id) {
                    log::debug!("skipping superseded decode request {}", id);
                    continue;
                }
                let response = match engine.decode(&pixels, size) {
                    Ok(payload) => WorkerResponse::Result { id, payload, pixels },
                    Err(e) => {
                        log::error!("decode engine failed: {}", e);
                        let _ = responses.send(WorkerResponse::Failed {
                            id,
                            reason: e.to_string(),
                        });
                        break;
                    }
                };
                if responses.send(response).is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("decode worker stopped");
}
