use crate::{Bitmap, RGBA_CHANNELS};
use qrscan_base::{Rect, Vec2};

/// Copy `crop` out of `source` into a square RGBA8 buffer of `out_size` pixels
/// per side, scaling with nearest-neighbour lookup (no smoothing, so module
/// edges stay sharp).
///
/// `buffer` is cleared and reused; its allocation survives when it is already
/// large enough. `crop` must lie inside the source.
pub fn sample_square(source: &Bitmap, crop: Rect<usize>, out_size: usize, buffer: Vec<u8>) -> Vec<u8> {
    debug_assert!(Rect::new(Vec2::zero(), source.size).contains_rect(crop));

    let mut out = buffer;
    out.clear();
    out.resize(out_size * out_size * RGBA_CHANNELS, 0);
    if crop.size.is_empty() {
        return out;
    }

    let row_stride = source.size.x * RGBA_CHANNELS;
    for oy in 0..out_size {
        let sy = crop.origin.y + oy * crop.size.y / out_size;
        let row = &source.data[sy * row_stride..(sy + 1) * row_stride];
        let dst_row = &mut out[oy * out_size * RGBA_CHANNELS..(oy + 1) * out_size * RGBA_CHANNELS];
        for ox in 0..out_size {
            let sx = crop.origin.x + ox * crop.size.x / out_size;
            let src = &row[sx * RGBA_CHANNELS..(sx + 1) * RGBA_CHANNELS];
            dst_row[ox * RGBA_CHANNELS..(ox + 1) * RGBA_CHANNELS].copy_from_slice(src);
        }
    }
    out
}
