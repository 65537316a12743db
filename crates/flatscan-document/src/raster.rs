// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned RGBA8 raster buffers, plus decoding/encoding through the `image` crate.

use std::path::Path;

use flatscan_core::Pixel;
use flatscan_core::error::{FlatscanError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, info, instrument};

/// Bytes per RGBA8 pixel.
pub const CHANNELS: usize = 4;

/// Largest raster the warp will allocate: 16384 x 16384 pixels (1 GiB).
pub const MAX_PIXELS: u64 = 1 << 28;

/// Byte length of a `width` x `height` RGBA8 buffer, or `None` on `usize` overflow.
fn byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

/// Byte length of an output buffer the warp may allocate.
///
/// Fails with `InvalidDimensions` when the size overflows `usize` or the
/// pixel count exceeds [`MAX_PIXELS`].
pub fn buffer_len(width: u32, height: u32) -> Result<usize> {
    let pixels = width as u64 * height as u64;
    match byte_len(width, height) {
        Some(len) if pixels <= MAX_PIXELS => Ok(len),
        _ => Err(FlatscanError::InvalidDimensions { width, height }),
    }
}

/// A fixed-size, row-major RGBA8 image with its origin at the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Allocate a raster with every byte zeroed (transparent black).
    ///
    /// # Panics
    ///
    /// Panics if `width * height * 4` overflows `usize`, like
    /// `image::ImageBuffer::new`.
    pub fn new(width: u32, height: u32) -> Self {
        let len = byte_len(width, height).expect("raster byte length overflows usize");
        Self {
            width,
            height,
            data: vec![0; len],
        }
    }

    /// Allocate a raster with every pixel set to `pixel`.
    ///
    /// # Panics
    ///
    /// Panics if `width * height * 4` overflows `usize`.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let len = byte_len(width, height).expect("raster byte length overflows usize");
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / CHANNELS {
            data.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing RGBA8 buffer. The length must be `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let Some(expected) = byte_len(width, height) else {
            return Err(FlatscanError::InvalidDimensions { width, height });
        };
        if data.len() != expected {
            return Err(FlatscanError::ImageError(format!(
                "raster buffer for {width}x{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Load an image from a file path, converting it to RGBA8.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            FlatscanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self::from(img))
    }

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            FlatscanError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self::from(img))
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes in one row.
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the raster.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        let offset = y as usize * self.stride() + x as usize * CHANNELS;
        let mut px = [0u8; CHANNELS];
        px.copy_from_slice(&self.data[offset..offset + CHANNELS]);
        px
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        (x < self.width && y < self.height).then(|| self.pixel(x, y))
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the raster.
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        let offset = y as usize * self.stride() + x as usize * CHANNELS;
        self.data[offset..offset + CHANNELS].copy_from_slice(&pixel);
    }

    /// Iterate over every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|c| [c[0], c[1], c[2], c[3]])
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    // -- Conversion -----------------------------------------------------------

    /// Convert into an `image::RgbaImage` without copying.
    pub fn into_rgba_image(self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data)
            .expect("RasterImage buffer length is width * height * 4")
    }

    /// Copy into an `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> RgbaImage {
        self.clone().into_rgba_image()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.into_rgba_image())
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the raster as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.to_rgba_image()
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| FlatscanError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode the raster as JPEG bytes with the given quality (1-100).
    /// JPEG has no alpha channel, so alpha is dropped.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = DynamicImage::ImageRgba8(self.to_rgba_image()).to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder).map_err(|err| {
            FlatscanError::ImageError(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }

    /// Write the raster to a file. The format is inferred from the extension.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dynamic = DynamicImage::ImageRgba8(self.to_rgba_image());
        let saved = match ImageFormat::from_path(path) {
            Ok(ImageFormat::Jpeg) => dynamic.to_rgb8().save(path),
            _ => dynamic.save(path),
        };
        saved.map_err(|err| {
            FlatscanError::ImageError(format!(
                "failed to save image to {}: {}",
                path.display(),
                err
            ))
        })?;
        info!(width = self.width, height = self.height, "Image saved");
        Ok(())
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(img: DynamicImage) -> Self {
        Self::from(img.into_rgba8())
    }
}

impl From<&DynamicImage> for RasterImage {
    fn from(img: &DynamicImage) -> Self {
        Self::from(img.to_rgba8())
    }
}
