use qrscan_base::Vec2;
use qrscan_image::{Bitmap, RGBA_CHANNELS};

#[inline]
fn yuv_to_rgba(y: f32, u: f32, v: f32) -> [u8; 4] {
    let r = (y + 1.402 * (v - 128.0)).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * (u - 128.0) - 0.714 * (v - 128.0)).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * (u - 128.0)).clamp(0.0, 255.0) as u8;
    [r, g, b, 255]
}

/// Convert packed YUYV 4:2:2 (`[Y0, U, Y1, V, ...]`) to an opaque RGBA8
/// bitmap using BT.601 coefficients.
///
/// Returns `None` if `data` is shorter than `width * height * 2` bytes or the
/// width is odd.
pub fn yuyv_to_bitmap(data: &[u8], size: Vec2<usize>) -> Option<Bitmap> {
    if size.x % 2 != 0 {
        return None;
    }
    let pixel_count = size.area();
    let expected_len = pixel_count * 2;
    if data.len() < expected_len {
        return None;
    }

    let mut rgba = Vec::with_capacity(pixel_count * RGBA_CHANNELS);
    for chunk in data[..expected_len].chunks_exact(4) {
        let u = chunk[1] as f32;
        let v = chunk[3] as f32;
        rgba.extend_from_slice(&yuv_to_rgba(chunk[0] as f32, u, v));
        rgba.extend_from_slice(&yuv_to_rgba(chunk[2] as f32, u, v));
    }

    Bitmap::new(size, rgba).ok()
}
