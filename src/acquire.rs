// Image acquisition: clipboard and file sources, plus the small encoding
// helpers needed to hand images to the flashcard service.

use crate::error::{AcquisitionError, RenderError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};
use log::{debug, info, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Extensions offered by the file dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

/// Where the source image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Clipboard,
    File,
}

impl ImageSource {
    pub fn label(&self) -> &'static str {
        match self {
            ImageSource::Clipboard => "Paste from clipboard",
            ImageSource::File => "Load from file",
        }
    }
}

/// Obtain an image from the chosen source. Cancelling the file dialog or an
/// empty clipboard both yield `AcquisitionError::NoImage`.
pub fn acquire(source: ImageSource) -> Result<RgbaImage, AcquisitionError> {
    match source {
        ImageSource::Clipboard => from_clipboard(),
        ImageSource::File => {
            let path = pick_image_file().ok_or(AcquisitionError::NoImage)?;
            load_file(&path)
        }
    }
}

/// Read an image from the platform clipboard. Falls back to decoding the
/// clipboard text as raw image bytes when no image is on the clipboard.
pub fn from_clipboard() -> Result<RgbaImage, AcquisitionError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| AcquisitionError::Clipboard(e.to_string()))?;

    match clipboard.get_image() {
        Ok(data) => {
            let (width, height) = (data.width as u32, data.height as u32);
            if let Some(img) = RgbaImage::from_raw(width, height, data.bytes.into_owned()) {
                debug!("clipboard image {width}x{height}");
                return Ok(img);
            }
            warn!("clipboard image buffer does not match {width}x{height}");
        }
        Err(e) => debug!("no image on clipboard: {e}"),
    }

    let text = clipboard.get_text().map_err(|_| AcquisitionError::NoImage)?;
    if text.is_empty() {
        return Err(AcquisitionError::NoImage);
    }
    decode_bytes(text.as_bytes()).map_err(|e| {
        debug!("clipboard text is not an image: {e}");
        AcquisitionError::NoImage
    })
}

/// Show a native open dialog filtered to raster formats.
pub fn pick_image_file() -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Select Image File")
        .add_filter("Image files", IMAGE_EXTENSIONS);
    if let Some(dir) = dirs::picture_dir() {
        dialog = dialog.set_directory(dir);
    }
    dialog.pick_file()
}

pub fn load_file(path: &Path) -> Result<RgbaImage, AcquisitionError> {
    let img = image::open(path)?.to_rgba8();
    info!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage, AcquisitionError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// PNG-encode an image and return it as standard base64, the form the media
/// store expects.
pub fn encode_png_base64(img: &RgbaImage) -> Result<String, RenderError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(STANDARD.encode(buf))
}

/// Write the image to a temporary PNG that outlives this call and return its
/// path. Removing the file is up to the caller.
pub fn save_temp_png(img: &RgbaImage) -> Result<PathBuf, AcquisitionError> {
    let file = tempfile::Builder::new()
        .prefix("stripe-cards-")
        .suffix(".png")
        .tempfile()?;
    img.save_with_format(file.path(), ImageFormat::Png)?;
    let (_, path) = file.keep().map_err(|e| AcquisitionError::Io(e.error))?;
    Ok(path)
}

/// Write a fresh preview and delete the one it replaces, so at most one
/// preview file exists per session.
pub fn replace_preview(
    previous: Option<&Path>,
    img: &RgbaImage,
) -> Result<PathBuf, AcquisitionError> {
    remove_preview(previous);
    save_temp_png(img)
}

pub fn remove_preview(previous: Option<&Path>) {
    if let Some(path) = previous {
        if let Err(e) = std::fs::remove_file(path) {
            debug!("could not remove preview {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, y| Rgba([x as u8 * 30, y as u8 * 60, 7, 255]))
    }

    #[test]
    fn base64_payload_decodes_back_to_same_pixels() {
        let img = sample();
        let payload = encode_png_base64(&img).unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        assert_eq!(decode_bytes(&bytes).unwrap(), img);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        assert!(matches!(
            decode_bytes(b"definitely not an image"),
            Err(AcquisitionError::Decode(_))
        ));
    }

    #[test]
    fn temp_png_is_written_and_readable() {
        let img = sample();
        let path = save_temp_png(&img).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(load_file(&path).unwrap(), img);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn replacing_preview_removes_the_old_file() {
        let img = sample();
        let first = replace_preview(None, &img).unwrap();
        let second = replace_preview(Some(&first), &img).unwrap();

        assert!(!first.exists());
        assert!(second.exists());
        remove_preview(Some(&second));
        assert!(!second.exists());
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not really a png").unwrap();

        assert!(matches!(load_file(&path), Err(AcquisitionError::Decode(_))));
    }

    #[test]
    fn loading_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file(&dir.path().join("missing.png")).is_err());
    }
}
