use crate::RGBA_CHANNELS;

/// Coefficients used to turn RGB pixels into luminance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrayscaleWeights {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Default for GrayscaleWeights {
    // 8-bit fixed-point approximation of BT.601 luma
    fn default() -> Self {
        Self {
            red: 77.0 / 256.0,
            green: 150.0 / 256.0,
            blue: 29.0 / 256.0,
        }
    }
}

impl GrayscaleWeights {
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    pub fn luma(&self, r: u8, g: u8, b: u8) -> u8 {
        let value = self.red * r as f32 + self.green * g as f32 + self.blue * b as f32;
        value.round().clamp(0.0, 255.0) as u8
    }
}

/// Convert RGBA8 pixels to one luminance byte per pixel. Alpha is ignored.
pub fn to_luma(rgba: &[u8], weights: GrayscaleWeights) -> Vec<u8> {
    rgba.chunks_exact(RGBA_CHANNELS)
        .map(|px| weights.luma(px[0], px[1], px[2]))
        .collect()
}
