use std::io::Cursor;

use image::ImageFormat;

use crate::persist::PersistError;
use crate::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image write failed: {0}")]
    Write(#[from] PersistError),
}

/// Decode any supported picture format and re-encode it as PNG.
pub fn encode_png(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let mut encoded = Cursor::new(Vec::new());
    decoded.write_to(&mut encoded, ImageFormat::Png)?;
    Ok(encoded.into_inner())
}
