use crate::ImageError;
use qrscan_base::Vec2;

/// Bytes per RGBA8 pixel.
pub const RGBA_CHANNELS: usize = 4;

/// A realized RGBA8 image, rows top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub size: Vec2<usize>,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("size", &self.size)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Bitmap {
    pub fn new(size: Vec2<usize>, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = size.area() * RGBA_CHANNELS;
        if data.len() != expected {
            return Err(ImageError::Decode(format!(
                "expected {expected} bytes for a {size} RGBA bitmap, got {}",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// Opaque bitmap filled with one color.
    pub fn filled(size: Vec2<usize>, rgb: [u8; 3]) -> Self {
        let pixel = [rgb[0], rgb[1], rgb[2], 255];
        Self {
            size,
            data: pixel.repeat(size.area()),
        }
    }

    pub fn from_fn(size: Vec2<usize>, mut f: impl FnMut(usize, usize) -> [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(size.area() * RGBA_CHANNELS);
        for y in 0..size.y {
            for x in 0..size.x {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { size, data }
    }

    pub fn width(&self) -> usize {
        self.size.x
    }

    pub fn height(&self) -> usize {
        self.size.y
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let offset = (y * self.size.x + x) * RGBA_CHANNELS;
        &self.data[offset..offset + RGBA_CHANNELS]
    }
}

impl From<crates_image::DynamicImage> for Bitmap {
    fn from(image: crates_image::DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            size: Vec2::new(width as usize, height as usize),
            data: rgba.into_raw(),
        }
    }
}
