use crate::{
    ChannelControl, ChannelError, DecodeChannel, DecodeEngine, DecodeResult, Decoded, ScanError,
};
use qrscan_image::GrayscaleWeights;
use qrscan_video::{FrameSource, Playback};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Side of the square frame handed to the engine.
pub const DEFAULT_OUT_SIZE: usize = 400;
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

// Bounds on the tick period; tokio intervals reject a zero period.
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);
const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Between round-trips, waiting for the next frame tick.
    Idle,
    WaitingForDecode,
    /// No frames are being sampled. Left on the next play signal.
    Stopped,
}

#[derive(Clone, Debug)]
pub struct ScanConfig {
    out_size: usize,
    frame_rate: f64,
    weights: GrayscaleWeights,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            out_size: DEFAULT_OUT_SIZE,
            frame_rate: DEFAULT_FRAME_RATE,
            weights: GrayscaleWeights::default(),
        }
    }
}

impl ScanConfig {
    pub fn with_out_size(mut self, out_size: usize) -> Self {
        self.out_size = out_size;
        self
    }

    /// Upper bound on samples per second. Non-positive rates are ignored, and
    /// the resulting tick period is kept between 1 ms and one hour.
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        if frame_rate.is_finite() && frame_rate > 0.0 {
            self.frame_rate = frame_rate;
        }
        self
    }

    pub fn with_grayscale_weights(mut self, weights: GrayscaleWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn out_size(&self) -> usize {
        self.out_size
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn weights(&self) -> GrayscaleWeights {
        self.weights
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.frame_rate)
            .map_or(MAX_FRAME_INTERVAL, |interval| {
                interval.clamp(MIN_FRAME_INTERVAL, MAX_FRAME_INTERVAL)
            })
    }
}

type DecodeCallback<T> = Box<dyn FnMut(T) + Send>;
type ErrorCallback = Box<dyn FnMut(ScanError) + Send>;
type StateCallback = Box<dyn FnMut(ScanState) + Send>;

/// Callbacks of a [`ScanLoop`]. They run on the loop's task.
pub struct ScanEvents<T> {
    on_decode: DecodeCallback<T>,
    on_error: Option<ErrorCallback>,
    on_state: Option<StateCallback>,
}

impl<T> ScanEvents<T> {
    /// `on_decode` is called once per successful decode, never for frames
    /// without a code.
    pub fn new(on_decode: impl FnMut(T) + Send + 'static) -> Self {
        Self {
            on_decode: Box::new(on_decode),
            on_error: None,
            on_state: None,
        }
    }

    /// Called at most once, when the engine fails and the loop stops for good.
    pub fn with_error(mut self, on_error: impl FnMut(ScanError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Called on every state transition, in order.
    pub fn with_state_change(mut self, on_state: impl FnMut(ScanState) + Send + 'static) -> Self {
        self.on_state = Some(Box::new(on_state));
        self
    }
}

/// Continuously samples a [`FrameSource`] and decodes the frames.
///
/// The loop runs on its own tokio task. Exactly one frame is in flight at a
/// time: the next frame is sampled only after the previous decode settled, and
/// no sooner than the next frame tick. Pausing or ending the source moves the
/// loop to `Stopped`; playing it again resumes. An engine failure stops the
/// loop permanently.
pub struct ScanLoop {
    state: watch::Receiver<ScanState>,
    control: ChannelControl,
    weights: GrayscaleWeights,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ScanLoop {
    /// Start scanning `source` with `engine`. Must be called within a tokio
    /// runtime.
    pub fn spawn<E: DecodeEngine>(
        source: FrameSource,
        engine: E,
        config: ScanConfig,
        events: ScanEvents<E::Payload>,
    ) -> Result<Self, ChannelError> {
        let channel = DecodeChannel::spawn(engine)?;
        channel.set_grayscale_weights(config.weights())?;
        let control = channel.control();
        let weights = config.weights();

        let (state_tx, state_rx) = watch::channel(ScanState::Stopped);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let runner = Runner {
            channel,
            source,
            config,
            events,
            state: state_tx,
        };
        let task = tokio::spawn(runner.run(shutdown_rx));

        Ok(Self {
            state: state_rx,
            control,
            weights,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ScanState> {
        self.state.clone()
    }

    pub fn grayscale_weights(&self) -> GrayscaleWeights {
        self.weights
    }

    /// Change the luminance weights. They are only sent to the engine when
    /// they differ from the current ones.
    pub fn set_grayscale_weights(&mut self, weights: GrayscaleWeights) -> Result<(), ChannelError> {
        if weights == self.weights {
            return Ok(());
        }
        self.control.set_grayscale_weights(weights)?;
        self.weights = weights;
        Ok(())
    }

    /// True once the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Stop the loop and dispose of the decode channel.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

struct Runner<T> {
    channel: DecodeChannel<T>,
    source: FrameSource,
    config: ScanConfig,
    events: ScanEvents<T>,
    state: watch::Sender<ScanState>,
}

impl<T: Send + 'static> Runner<T> {
    fn set_state(&mut self, state: ScanState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            log::debug!("scan loop {:?} -> {:?}", *current, state);
            *current = state;
            true
        });
        if changed {
            if let Some(on_state) = self.events.on_state.as_mut() {
                on_state(state);
            }
        }
    }

    fn is_stopped(&self) -> bool {
        *self.state.borrow() == ScanState::Stopped
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut playback = self.source.subscribe();
        let mut ticker = tokio::time::interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buffer = Vec::new();

        loop {
            if self.is_stopped() {
                let was_playing = *playback.borrow_and_update() == Playback::Playing;
                tokio::select! {
                    _ = &mut shutdown => break,
                    signal = playback.wait_for(|p| *p == Playback::Playing) => {
                        if signal.is_err() {
                            break;
                        }
                    }
                }
                if !was_playing {
                    // fresh play signal: sample right away
                    self.set_state(ScanState::Idle);
                    ticker.reset_immediately();
                }
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let frame = match self
                .source
                .sample_center_crop(self.config.out_size(), std::mem::take(&mut buffer))
            {
                Ok(frame) => {
                    // already playing when the loop started, or the first
                    // frame arrived late
                    if self.is_stopped() {
                        self.set_state(ScanState::Idle);
                    }
                    frame
                }
                Err(e) => {
                    if !self.is_stopped() {
                        log::debug!("scan loop stopping: {}", e);
                        self.set_state(ScanState::Stopped);
                    }
                    continue;
                }
            };

            self.set_state(ScanState::WaitingForDecode);
            let decoded = tokio::select! {
                _ = &mut shutdown => break,
                decoded = self.channel.submit(frame.into()) => decoded,
            };

            match decoded {
                Ok(Decoded { result, pixels }) => {
                    buffer = pixels;
                    self.set_state(ScanState::Idle);
                    if let DecodeResult::Found(payload) = result {
                        (self.events.on_decode)(payload);
                    }
                }
                Err(e) => {
                    log::error!("scan loop stopped: {}", e);
                    self.set_state(ScanState::Stopped);
                    if let Some(on_error) = self.events.on_error.as_mut() {
                        on_error(ScanError::from(e));
                    }
                    break;
                }
            }
        }

        self.set_state(ScanState::Stopped);
        self.channel.dispose();
        log::debug!("scan loop finished");
    }
}
