//! Uniform description of pixel data handed to the renderer.
//!
//! Every source carries a [`TextureId`] minted when it is created. The
//! renderer re-uploads a texture slot only when the id changes, so code that
//! edits pixels must mint a fresh source instead of mutating one in place.

use std::borrow::Cow;
use std::sync::Arc;

use image::imageops::flip_vertical_in_place;
use image::{DynamicImage, RgbaImage};

use crate::id::{IdAllocator, TextureId};

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("texture dimensions must be non-zero (got {width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Tightly packed RGBA8 rows, top row first unless flipped.
#[derive(Debug, Clone)]
pub struct RawPixels {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl RawPixels {
    fn new(width: u32, height: u32, data: Vec<u8>, flip_rows: bool) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        let data = if flip_rows {
            let mut buffer = RgbaImage::from_raw(width, height, data).ok_or(
                TextureError::SizeMismatch {
                    width,
                    height,
                    expected,
                    actual: 0,
                },
            )?;
            flip_vertical_in_place(&mut buffer);
            buffer.into_raw()
        } else {
            data
        };
        Ok(Self {
            width,
            height,
            data: data.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum TexturePixels {
    /// Bytes already clamped to `0..=255` by the producer.
    ClampedBytes(RawPixels),
    Bytes(RawPixels),
    Bitmap(Arc<RgbaImage>),
    ImageData(RawPixels),
    /// A decoded image in any pixel layout; converted on upload.
    Image(Arc<DynamicImage>),
}

#[derive(Debug, Clone)]
pub struct TextureSource {
    id: TextureId,
    pixels: TexturePixels,
}

impl TextureSource {
    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn pixels(&self) -> &TexturePixels {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match &self.pixels {
            TexturePixels::ClampedBytes(raw)
            | TexturePixels::Bytes(raw)
            | TexturePixels::ImageData(raw) => (raw.width, raw.height),
            TexturePixels::Bitmap(bitmap) => bitmap.dimensions(),
            TexturePixels::Image(image) => (image.width(), image.height()),
        }
    }

    /// Packed RGBA8 rows ready for upload. Only `Image` sources in a
    /// non-RGBA8 layout allocate.
    pub fn to_rgba(&self) -> Cow<'_, [u8]> {
        match &self.pixels {
            TexturePixels::ClampedBytes(raw)
            | TexturePixels::Bytes(raw)
            | TexturePixels::ImageData(raw) => Cow::Borrowed(&raw.data[..]),
            TexturePixels::Bitmap(bitmap) => Cow::Borrowed(bitmap.as_raw()),
            TexturePixels::Image(image) => match image.as_ref() {
                DynamicImage::ImageRgba8(rgba) => Cow::Borrowed(rgba.as_raw()),
                other => Cow::Owned(other.to_rgba8().into_raw()),
            },
        }
    }
}

/// Mints texture sources with ids from an owned allocator.
#[derive(Debug, Default)]
pub struct TextureSourceFactory {
    ids: IdAllocator,
}

impl TextureSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self { ids }
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.ids
    }

    fn stamp(&self, pixels: TexturePixels) -> TextureSource {
        let source = TextureSource {
            id: TextureId(self.ids.allocate()),
            pixels,
        };
        let (width, height) = source.dimensions();
        tracing::trace!(id = %source.id, width, height, "created texture source");
        source
    }

    pub fn create_clamped_source(
        &self,
        width: u32,
        height: u32,
        data: Vec<u8>,
        flip_rows: bool,
    ) -> Result<TextureSource, TextureError> {
        let raw = RawPixels::new(width, height, data, flip_rows)?;
        Ok(self.stamp(TexturePixels::ClampedBytes(raw)))
    }

    pub fn create_raw_source(
        &self,
        width: u32,
        height: u32,
        data: Vec<u8>,
        flip_rows: bool,
    ) -> Result<TextureSource, TextureError> {
        let raw = RawPixels::new(width, height, data, flip_rows)?;
        Ok(self.stamp(TexturePixels::Bytes(raw)))
    }

    pub fn create_image_data_source(
        &self,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<TextureSource, TextureError> {
        let raw = RawPixels::new(width, height, data, false)?;
        Ok(self.stamp(TexturePixels::ImageData(raw)))
    }

    pub fn create_bitmap_source(&self, bitmap: RgbaImage) -> TextureSource {
        self.stamp(TexturePixels::Bitmap(Arc::new(bitmap)))
    }

    pub fn create_image_source(&self, image: DynamicImage) -> TextureSource {
        self.stamp(TexturePixels::Image(Arc::new(image)))
    }
}
