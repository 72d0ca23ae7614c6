use std::thread;

use crossbeam_channel::{bounded, Receiver};
use image::imageops::flip_vertical_in_place;
use image::ImageFormat;
use thiserror::Error;

use crate::source::ImportedFile;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("`{name}` is not an image (type {media_type})")]
    NotAnImage { name: String, media_type: String },
    #[error("failed to decode `{name}`: {message}")]
    Decode { name: String, message: String },
    #[error("image decode worker exited before returning a result")]
    WorkerGone,
}

/// Tightly packed RGBA8 pixels, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// The 1x1 opaque white placeholder.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![255, 255, 255, 255],
        }
    }

}

impl Default for TextureImage {
    fn default() -> Self {
        Self::white()
    }
}

/// The single sampler input. Images are replaced wholesale.
#[derive(Debug, Default)]
pub struct TextureSlot {
    image: TextureImage,
    source: Option<String>,
}

impl TextureSlot {
    pub fn image(&self) -> &TextureImage {
        &self.image
    }

    /// Name of the file the current image came from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn replace(&mut self, image: TextureImage, source: impl Into<String>) {
        self.image = image;
        self.source = Some(source.into());
    }
}

/// A decode running on a worker thread.
#[derive(Debug)]
pub struct DecodeFuture {
    name: String,
    receiver: Receiver<Result<TextureImage, TextureError>>,
}

impl DecodeFuture {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the worker finishes.
    pub fn wait(self) -> Result<TextureImage, TextureError> {
        self.receiver
            .recv()
            .unwrap_or(Err(TextureError::WorkerGone))
    }
}

/// Starts decoding an imported image off the calling thread.
///
/// Files whose declared media type is not `image/*` are rejected up front.
pub fn load_from_file(file: ImportedFile) -> Result<DecodeFuture, TextureError> {
    let media_type = file.media_type.clone().unwrap_or_default();
    if !media_type.starts_with("image/") {
        return Err(TextureError::NotAnImage {
            name: file.name,
            media_type: if media_type.is_empty() {
                "unknown".to_string()
            } else {
                media_type
            },
        });
    }

    let (sender, receiver) = bounded(1);
    let name = file.name.clone();
    thread::spawn(move || {
        let result = decode(&file.name, &media_type, &file.bytes);
        let _ = sender.send(result);
    });

    Ok(DecodeFuture { name, receiver })
}

/// Decodes with the format implied by the media type, falling back to
/// content sniffing.
pub fn decode(name: &str, media_type: &str, bytes: &[u8]) -> Result<TextureImage, TextureError> {
    let fast = ImageFormat::from_mime_type(media_type)
        .and_then(|format| image::load_from_memory_with_format(bytes, format).ok());
    let decoded = match fast {
        Some(decoded) => decoded,
        None => image::load_from_memory(bytes).map_err(|err| TextureError::Decode {
            name: name.to_string(),
            message: err.to_string(),
        })?,
    };

    let mut rgba = decoded.to_rgba8();
    // Texture coordinate (0, 0) addresses the bottom-left texel.
    flip_vertical_in_place(&mut rgba);
    let (width, height) = rgba.dimensions();
    tracing::debug!(name, width, height, "decoded texture");
    Ok(TextureImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        // Top row red, bottom row blue.
        let image = ImageBuffer::from_fn(2, 2, |_, y| {
            if y == 0 {
                Rgba([255u8, 0, 0, 255])
            } else {
                Rgba([0u8, 0, 255, 255])
            }
        });
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn rejects_non_images() {
        let file = ImportedFile::new("notes.txt", b"hello".to_vec());
        assert!(matches!(
            load_from_file(file),
            Err(TextureError::NotAnImage { .. })
        ));
    }

    #[test]
    fn decodes_on_a_worker_and_flips_rows() {
        let file = ImportedFile::new("tex.png", png_bytes());
        let image = load_from_file(file).expect("image").wait().expect("decoded");
        assert_eq!((image.width, image.height), (2, 2));
        // First stored row is the bottom of the picture.
        assert_eq!(&image.pixels[..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn wrong_media_type_falls_back_to_sniffing() {
        let image = decode("tex.jpg", "image/jpeg", &png_bytes()).expect("sniffed");
        assert_eq!(image.width, 2);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let file = ImportedFile::new("broken.png", vec![1, 2, 3]);
        assert!(matches!(
            load_from_file(file).expect("spawned").wait(),
            Err(TextureError::Decode { .. })
        ));
    }

    #[test]
    fn slot_defaults_to_white() {
        let slot = TextureSlot::default();
        assert_eq!(slot.image(), &TextureImage::white());
        assert!(slot.source().is_none());
    }
}
