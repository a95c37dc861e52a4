//! Common functionality for object detection.
//!
//! The functionality defined in this module (and submodules) is shared between the detection
//! network decoding and the hand tracker.

pub mod nms;
pub mod ssd;

use crate::image::Rect;

/// A detected object.
///
/// A [`Detection`] consists of a [`Rect`] enclosing the detected object, a confidence value, and a
/// (possibly empty) set of located keypoints.
///
/// Per convention, the confidence value lies between 0.0 and 1.0, which can be achieved by passing
/// the raw network output through a sigmoid. The confidence value is used as the weight when
/// performing non-maximum suppression with [`nms::SuppressionMode::Average`], so it has to have
/// the expected range when making use of that.
#[derive(Debug, Clone)]
pub struct Detection {
    confidence: f32,
    rect: Rect,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self {
            confidence,
            rect,
            keypoints: Vec::new(),
        }
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Maps the rect and keypoints of `self` from one coordinate system to another.
    ///
    /// `f` is applied to the rectangle's center and to every keypoint, the rectangle's size is
    /// multiplied by `scale`.
    pub(crate) fn map_coords(&mut self, scale: [f32; 2], f: impl Fn(f32, f32) -> (f32, f32)) {
        let (cx, cy) = self.rect.center();
        let (cx, cy) = f(cx, cy);
        self.rect = Rect::from_center(
            cx,
            cy,
            self.rect.width() * scale[0],
            self.rect.height() * scale[1],
        );
        for kp in &mut self.keypoints {
            let (x, y) = f(kp.x, kp.y);
            kp.x = x;
            kp.y = y;
        }
    }
}

/// A 2D keypoint produced as part of a [`Detection`].
///
/// The meaning of a keypoint depends on the specific detector and on its index in the keypoint
/// list. The palm detector uses them to place the hand's region of interest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_coords() {
        let mut det = Detection::with_keypoints(
            0.9,
            Rect::from_center(0.5, 0.5, 0.25, 0.5),
            vec![Keypoint::new(0.0, 1.0)],
        );
        det.map_coords([100.0, 200.0], |x, y| (x * 100.0, y * 200.0 + 10.0));

        assert_eq!(det.bounding_rect(), Rect::from_center(50.0, 110.0, 25.0, 100.0));
        assert_eq!(det.keypoints(), &[Keypoint::new(0.0, 210.0)]);
        assert_eq!(det.confidence(), 0.9);
    }
}
