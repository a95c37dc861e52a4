//! Frames and everything drawn onto them.
//!
//! [`Image`] owns RGBA pixel data, [`Rect`] describes regions of it, and the `draw_*` functions
//! return guards that render a shape when they go out of scope.

mod draw;
mod jpeg;
mod rect;

#[cfg(test)]
mod tests;

use std::{fmt, fs, path::Path};

use anyhow::{bail, Context};
use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};
use image::{Rgba, RgbaImage};

use crate::resolution::Resolution;

pub use draw::*;
pub use rect::*;

/// An RGBA frame with 8 bits per channel.
#[derive(Clone)]
pub struct Image {
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Reads a `.png`, `.jpg` or `.jpeg` file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let is_jpeg = match ext.as_deref() {
            Some("jpg" | "jpeg") => true,
            Some("png") => false,
            _ => bail!("'{}' is neither a PNG nor a JPEG file", path.display()),
        };

        let data = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
        if is_jpeg {
            return Self::decode_jpeg(&data);
        }
        let png = image::load_from_memory_with_format(&data, image::ImageFormat::Png)?;
        Ok(Self {
            buf: png.to_rgba8(),
        })
    }

    /// Decodes a JPEG or a Motion JPEG frame, using the backend picked by
    /// `HANDSIGN_JPEG_BACKEND`.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        jpeg::decode_jpeg(data)
    }

    /// A `width x height` image with every pixel set to [`Color::NONE`].
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: RgbaImage::new(width, height),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// The whole image as a [`Rect`] at the origin.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Returns the pixel at `(x, y)`. Panics when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf.get_pixel(x, y).0)
    }

    /// Overwrites the pixel at `(x, y)`. Panics when out of bounds.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf.put_pixel(x, y, Rgba(color.0));
    }

    /// Mirrors the image along its vertical axis.
    pub fn flip_horizontal_in_place(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    /// Samples the area covered by `rect` into a new image of the given resolution.
    ///
    /// `rect` may lie partially or fully outside of `self`; pixels outside of the image are opaque
    /// black. Nearest neighbor sampling is used.
    pub fn sample_rect(&self, rect: Rect, res: Resolution) -> Image {
        let mut out = Image::new(res.width(), res.height());
        out.clear(Color::BLACK);
        if res.is_empty() {
            return out;
        }

        let step_x = rect.width() / res.width() as f32;
        let step_y = rect.height() / res.height() as f32;
        for dest_y in 0..res.height() {
            let src_y = (rect.y() + (dest_y as f32 + 0.5) * step_y).floor();
            if src_y < 0.0 || src_y >= self.height() as f32 {
                continue;
            }
            for dest_x in 0..res.width() {
                let src_x = (rect.x() + (dest_x as f32 + 0.5) * step_x).floor();
                if src_x < 0.0 || src_x >= self.width() as f32 {
                    continue;
                }

                let pixel = self.get(src_x as u32, src_y as u32);
                out.set(dest_x, dest_y, pixel);
            }
        }

        out
    }

    /// Converts the image to `0RGB` pixels, as expected by window framebuffers.
    pub fn to_rgb_u32(&self) -> Vec<u32> {
        self.buf
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
            })
            .collect()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({})", self.resolution())
    }
}

/// A non-premultiplied sRGB color with alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    /// Transparent black, the color of a fresh [`Image`].
    pub const NONE: Self = Self([0; 4]);
    pub const BLACK: Self = Self::from_rgb8(0, 0, 0);
    pub const WHITE: Self = Self::from_rgb8(255, 255, 255);
    pub const RED: Self = Self::from_rgb8(255, 0, 0);
    pub const GREEN: Self = Self::from_rgb8(0, 255, 0);
    pub const BLUE: Self = Self::from_rgb8(0, 0, 255);
    pub const YELLOW: Self = Self::from_rgb8(255, 255, 0);
    pub const MAGENTA: Self = Self::from_rgb8(255, 0, 255);
    pub const CYAN: Self = Self::from_rgb8(0, 255, 255);

    /// An opaque color.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// The red, green and blue channels, without alpha.
    #[inline]
    pub fn rgb(&self) -> [u8; 3] {
        let [r, g, b, _] = self.0;
        [r, g, b]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "rgba({r}, {g}, {b}, {a})")
    }
}

impl PixelColor for Color {
    type Raw = RawU32;
}
