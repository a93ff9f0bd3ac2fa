//! Captured frame and screen-region entities.
//!
//! A [`Frame`] is owned by whoever captured it and is read-only downstream.
//! The pixel buffer lives behind an `Arc`, so cloning a frame to hand it to the
//! locator and the decision producer never copies pixels.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, Rgba};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building or encoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The raw buffer length does not match `width × height × channels`.
    #[error("buffer of {actual} bytes does not fit a {width}x{height}x{channels} frame")]
    BufferSize {
        width: u32,
        height: u32,
        channels: u8,
        actual: usize,
    },

    /// Only 1 (gray), 3 (RGB) and 4 (RGBA) channel frames are supported.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),

    /// A frame with zero width or height cannot be located or encoded.
    #[error("frame has no pixels")]
    Empty,

    /// The image codec failed.
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Width and height of a coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels (or destination units) covered by this extent.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A rectangular region inside a [`Frame`], in frame pixels.
///
/// Regions are recomputed for every frame; they are never cached across
/// frames because the capture framing can change at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenRegion {
    /// X coordinate of the top-left corner.
    pub offset_x: u32,
    /// Y coordinate of the top-left corner.
    pub offset_y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ScreenRegion {
    pub fn new(offset_x: u32, offset_y: u32, width: u32, height: u32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    /// The region covering an entire frame of the given extent.
    pub fn full(extent: Extent) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    /// Returns the rightmost X coordinate (exclusive).
    pub fn right(&self) -> u32 {
        self.offset_x + self.width
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> u32 {
        self.offset_y + self.height
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn area(&self) -> u64 {
        self.extent().area()
    }

    /// Returns `true` if the region lies entirely within `bounds`.
    pub fn fits_within(&self, bounds: Extent) -> bool {
        self.right() <= bounds.width && self.bottom() <= bounds.height
    }
}

/// Still-image container used to hand frames to the decision producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Png,
    Jpeg,
}

impl ImageEncoding {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            ImageEncoding::Png => ImageFormat::Png,
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// A frame serialized as PNG or JPEG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub encoding: ImageEncoding,
    pub extent: Extent,
}

impl EncodedFrame {
    pub fn mime_type(&self) -> &'static str {
        self.encoding.mime_type()
    }
}

/// An immutable captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<DynamicImage>,
}

impl Frame {
    /// Wraps a decoded image.  Exotic pixel formats are converted to RGB8.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Empty`] for a zero-sized image.
    pub fn from_image(image: DynamicImage) -> Result<Self, FrameError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FrameError::Empty);
        }
        let image = match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
                image
            }
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Ok(Self {
            image: Arc::new(image),
        })
    }

    /// Builds a frame from a tightly packed, row-major, 8-bit buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if `channels` is not 1, 3 or 4, or if the buffer
    /// length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, FrameError> {
        let actual = data.len();
        let size_error = || FrameError::BufferSize {
            width,
            height,
            channels,
            actual,
        };
        let image = match channels {
            1 => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(size_error)?,
            3 => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(size_error)?,
            4 => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(size_error)?,
            other => return Err(FrameError::UnsupportedChannels(other)),
        };
        Self::from_image(image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width(), self.height())
    }

    /// Raw pixel bytes, row-major, `channels` bytes per pixel.
    pub fn data(&self) -> &[u8] {
        self.image.as_bytes()
    }

    pub fn to_gray(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// Returns a new frame holding only `region`, clipped to this frame.
    pub fn crop(&self, region: &ScreenRegion) -> Frame {
        let x = region.offset_x.min(self.width().saturating_sub(1));
        let y = region.offset_y.min(self.height().saturating_sub(1));
        let width = region.width.min(self.width() - x).max(1);
        let height = region.height.min(self.height() - y).max(1);
        Frame {
            image: Arc::new(self.image.crop_imm(x, y, width, height)),
        }
    }

    /// Serializes the frame for the decision producer.
    ///
    /// JPEG has no alpha channel, so RGBA frames are flattened to RGB first.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Encode`] if the codec fails.
    pub fn encode(&self, encoding: ImageEncoding) -> Result<EncodedFrame, FrameError> {
        let mut bytes = Vec::new();
        match encoding {
            ImageEncoding::Png => self
                .image
                .write_to(&mut Cursor::new(&mut bytes), encoding.format())?,
            ImageEncoding::Jpeg => DynamicImage::ImageRgb8(self.image.to_rgb8())
                .write_to(&mut Cursor::new(&mut bytes), encoding.format())?,
        }
        Ok(EncodedFrame {
            bytes,
            encoding,
            extent: self.extent(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
