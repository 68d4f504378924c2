//! PNG decoding and atomic PNG export

use crate::io::configuration::TEMP_SUFFIX;
use crate::io::error::{Result, SeamweaveError, WithPath};
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Decode an image file as 8-bit RGB
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| SeamweaveError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Decode an encoded image held in memory as 8-bit RGB
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Encode an image as PNG bytes
///
/// # Errors
///
/// Returns an error if encoding fails
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|source| SeamweaveError::ImageExport {
            path: PathBuf::from("<memory>"),
            source,
        })?;
    Ok(buffer.into_inner())
}

/// Path of the temporary sibling used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write bytes through a temporary file and rename into place
///
/// Readers never observe a partially written file.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the write
/// or rename fails
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_path(parent, "create_dir_all")?;
    }
    let temp = temp_path(path);
    std::fs::write(&temp, bytes).with_path(&temp, "write")?;
    std::fs::rename(&temp, path).with_path(path, "rename")
}

/// Save an image as PNG using an atomic write
///
/// # Errors
///
/// Returns an error if encoding or writing fails
pub fn save_png_atomic(img: &RgbImage, path: &Path) -> Result<()> {
    let bytes = encode_png(img).map_err(|err| match err {
        SeamweaveError::ImageExport { source, .. } => SeamweaveError::ImageExport {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    write_atomic(path, &bytes)
}

/// Resize to the exact target size with Lanczos resampling
///
/// Returns the input unchanged when it already has the target size.
pub fn conform_size(img: RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        img
    } else {
        image::imageops::resize(&img, width, height, FilterType::Lanczos3)
    }
}
