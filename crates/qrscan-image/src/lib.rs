//! Still-image handling for the qrscan workspace.
//!
//! Provides the RGBA8 [`Bitmap`] every other crate passes around, luminance
//! conversion, nearest-neighbour crop sampling, and loading of still images
//! from the representations a caller may hold (pixels, pending handles,
//! encoded blobs, paths and URLs). Encoded formats are decoded with the
//! `image` crate.

pub mod bitmap;
pub mod error;
pub mod grayscale;
pub mod sample;
pub mod source;

pub use bitmap::{Bitmap, RGBA_CHANNELS};
pub use error::ImageError;
pub use grayscale::{GrayscaleWeights, to_luma};
pub use sample::sample_square;
pub use source::{Blob, BlobStore, BlobUrl, ImageHandle, ImageLoader, ImageSource};

/// Decodes an encoded image on the calling thread.
///
/// Meant for code that already runs off the async runtime, such as capture
/// worker threads. Async callers use [`decode_bitmap`].
pub fn decode_bitmap_blocking(data: &[u8]) -> Result<Bitmap, ImageError> {
    let image = crates_image::load_from_memory(data)?;
    Ok(Bitmap::from(image))
}

/// Like [`decode_bitmap_blocking`], but a recognised image MIME type picks
/// the decoder instead of sniffing the bytes.
pub fn decode_bitmap_typed_blocking(data: &[u8], mime: Option<&str>) -> Result<Bitmap, ImageError> {
    let format = mime.and_then(crates_image::ImageFormat::from_mime_type);
    match format {
        Some(format) => {
            let image = crates_image::load_from_memory_with_format(data, format)?;
            Ok(Bitmap::from(image))
        }
        None => {
            if let Some(mime) = mime {
                log::debug!("no decoder for {}, detecting format", mime);
            }
            decode_bitmap_blocking(data)
        }
    }
}

/// Decodes an encoded image (PNG, JPEG, GIF, BMP, TIFF, WebP) into an RGBA8
/// bitmap.
///
/// The format is auto-detected. The CPU-bound decoding work runs on tokio's
/// blocking thread pool.
///
/// # Errors
///
/// Returns `ImageError::Decode` if the data is invalid or the format is unsupported.
pub async fn decode_bitmap(data: &[u8]) -> Result<Bitmap, ImageError> {
    decode_bitmap_typed(data, None).await
}

/// Async [`decode_bitmap_typed_blocking`].
pub async fn decode_bitmap_typed(data: &[u8], mime: Option<&str>) -> Result<Bitmap, ImageError> {
    let owned = data.to_vec();
    let mime = mime.map(str::to_string);
    tokio::task::spawn_blocking(move || decode_bitmap_typed_blocking(&owned, mime.as_deref()))
        .await
        .map_err(|e| ImageError::Decode(e.to_string()))?
}

/// Encodes a bitmap as PNG bytes.
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, ImageError> {
    use crates_image::ImageEncoder;

    let mut buffer = Vec::new();
    crates_image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(
            &bitmap.data,
            bitmap.size.x as u32,
            bitmap.size.y as u32,
            crates_image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer)
}
