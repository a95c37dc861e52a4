//! Frame and network input sizes.

use std::fmt;

use crate::image::Rect;

/// Size of a frame, window, or network input, in pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// `1280x720`, the capture size requested when none is configured.
    pub const RES_720P: Self = Self::new(1280, 720);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count, used to rank webcam formats by size.
    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if there is not a single pixel to look at.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The [`Rect`] from `(0, 0)` to `(width, height)`.
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_resolutions() {
        assert!(Resolution::new(0, 480).is_empty());
        assert!(Resolution::new(640, 0).is_empty());
        assert!(!Resolution::new(1, 1).is_empty());
        assert_eq!(Resolution::new(0, 480).num_pixels(), 0);
    }

    #[test]
    fn formatting_and_rect() {
        assert_eq!(Resolution::RES_720P.to_string(), "1280x720");
        assert_eq!(format!("{:?}", Resolution::new(3, 2)), "3x2");
        assert_eq!(
            Resolution::new(640, 480).rect(),
            Rect::from_top_left(0.0, 0.0, 640.0, 480.0)
        );
    }
}
