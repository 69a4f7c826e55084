use crate::EngineError;
use qrscan_base::Vec2;
use qrscan_image::GrayscaleWeights;

/// A pixel decoder that runs on the isolated decode worker.
///
/// `decode` receives an RGBA8 buffer of `size` pixels and returns the payload
/// it found, or `None`. Returning an error shuts the
/// worker down.
pub trait DecodeEngine: Send + 'static {
    type Payload: Send + 'static;

    fn decode(&mut self, pixels: &[u8], size: Vec2<usize>) -> Result<Option<Self::Payload>, EngineError>;

    fn set_grayscale_weights(&mut self, weights: GrayscaleWeights);
}

/// Message sent to the decode worker.
#[derive(Debug)]
pub enum WorkerRequest {
    Decode {
        id: u64,
        pixels: Vec<u8>,
        size: Vec2<usize>,
    },
    /// Applies to every later request. Has no response.
    SetGrayscaleWeights(GrayscaleWeights),
}

/// Message sent back by the decode worker. `pixels` returns the request's
/// buffer so it can be sampled into again.
#[derive(Debug)]
pub enum WorkerResponse<T> {
    Result {
        id: u64,
        payload: Option<T>,
        pixels: Vec<u8>,
    },
    Failed {
        id: u64,
        reason: String,
    },
}

impl<T> WorkerResponse<T> {
    pub fn id(&self) -> u64 {
        match self {
            WorkerResponse::Result { id, .. } | WorkerResponse::Failed { id, .. } => *id,
        }
    }
}

/// Result of one decode round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult<T> {
    Found(T),
    NotFound,
}

impl<T> DecodeResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, DecodeResult::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            DecodeResult::Found(payload) => Some(payload),
            DecodeResult::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for DecodeResult<T> {
    fn from(payload: Option<T>) -> Self {
        match payload {
            Some(payload) => DecodeResult::Found(payload),
            None => DecodeResult::NotFound,
        }
    }
}
