use crate::{DecodeEngine, EngineError};
use qrscan_base::Vec2;
use qrscan_image::{GrayscaleWeights, RGBA_CHANNELS, to_luma};
use rqrr::PreparedImage;

/// QR code engine backed by `rqrr`. Yields the text content of the first
/// grid that decodes.
#[derive(Debug, Clone, Default)]
pub struct QrEngine {
    weights: GrayscaleWeights,
}

impl QrEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> GrayscaleWeights {
        self.weights
    }
}

impl DecodeEngine for QrEngine {
    type Payload = String;

    fn decode(&mut self, pixels: &[u8], size: Vec2<usize>) -> Result<Option<String>, EngineError> {
        let expected = size.area() * RGBA_CHANNELS;
        if pixels.len() != expected {
            return Err(EngineError::new(format!(
                "expected {expected} bytes for a {size} frame, got {}",
                pixels.len()
            )));
        }
        if size.is_empty() {
            return Ok(None);
        }

        let luma = to_luma(pixels, self.weights);
        let width = size.x;
        let mut image = PreparedImage::prepare_from_greyscale(size.x, size.y, |x, y| luma[y * width + x]);
        let content = image
            .detect_grids()
            .iter()
            .find_map(|grid| grid.decode().ok())
            .map(|(_, content)| content);
        Ok(content)
    }

    fn set_grayscale_weights(&mut self, weights: GrayscaleWeights) {
        self.weights = weights;
    }
}
