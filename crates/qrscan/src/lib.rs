//! Continuous and one-shot QR scanning.
//!
//! A [`ScanLoop`] pulls center crops from a live
//! [`FrameSource`](qrscan_video::FrameSource) and pushes them through a
//! [`DecodeChannel`] to a [`DecodeEngine`] running on its own thread, one
//! frame at a time. A [`OneShotDecoder`] does a single round-trip for a
//! still image. [`QrEngine`] is the stock engine, built on `rqrr`.

pub mod channel;
pub mod engine;
pub mod error;
pub mod oneshot;
pub mod qr;
pub mod scan_loop;

pub use channel::{ChannelControl, DecodeChannel, DecodeRequest, Decoded};
pub use engine::{DecodeEngine, DecodeResult, WorkerRequest, WorkerResponse};
pub use error::{ChannelError, DecodeError, EngineError, ScanError};
pub use oneshot::{DEFAULT_ONE_SHOT_TIMEOUT, OneShotConfig, OneShotDecoder};
pub use qr::QrEngine;
pub use scan_loop::{DEFAULT_FRAME_RATE, DEFAULT_OUT_SIZE, ScanConfig, ScanEvents, ScanLoop, ScanState};
