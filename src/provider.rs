//! The interface between landmark estimation and gesture recognition.
//!
//! A [`LandmarkProvider`] turns a camera frame into zero or more [`NormalizedHand`]s. The bundled
//! implementation is [`crate::hand::tracking::HandTracker`]; tests substitute scripted providers.

use serde::Deserialize;

use crate::image::Image;

/// Number of landmarks estimated per hand.
pub const NUM_LANDMARKS: usize = 21;

/// How a provider treats consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Frames are treated as a video stream: hands are tracked from one frame to the next, and the
    /// palm detector only runs when fewer than the maximum number of hands are tracked.
    #[default]
    Video,
    /// Every frame is an unrelated image and runs full palm detection.
    Static,
}

/// Settings shared by all landmark providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOptions {
    pub mode: RunMode,
    /// Maximum number of hands to report per frame.
    pub max_hands: usize,
    /// Minimum palm detection confidence for a new hand to be picked up.
    pub min_detection_confidence: f32,
    /// Minimum landmark presence score for a hand to be reported and kept tracked.
    pub min_tracking_confidence: f32,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Video,
            max_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Whether a hand is a left or a right hand, as seen in the frame passed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// The 21 landmarks of one hand, with coordinates normalized to the frame size.
///
/// `(0.0, 0.0)` is the top left corner of the frame and `(1.0, 1.0)` the bottom right one. Points
/// may lie slightly outside of that range when a hand extends past the frame border. Landmark `i`
/// has the MediaPipe hand landmark identifier `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHand {
    points: [[f32; 2]; NUM_LANDMARKS],
    handedness: Option<Handedness>,
}

impl NormalizedHand {
    pub fn new(points: [[f32; 2]; NUM_LANDMARKS]) -> Self {
        Self {
            points,
            handedness: None,
        }
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }

    #[inline]
    pub fn points(&self) -> &[[f32; 2]; NUM_LANDMARKS] {
        &self.points
    }

    #[inline]
    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }
}

/// A source of hand landmarks.
pub trait LandmarkProvider {
    /// Estimates the landmarks of all hands visible in `frame`.
    ///
    /// Returning an empty list is not an error; it means that no hand is visible.
    fn detect(&mut self, frame: &Image) -> anyhow::Result<Vec<NormalizedHand>>;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for &mut P {
    fn detect(&mut self, frame: &Image) -> anyhow::Result<Vec<NormalizedHand>> {
        (**self).detect(frame)
    }
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn detect(&mut self, frame: &Image) -> anyhow::Result<Vec<NormalizedHand>> {
        (**self).detect(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = ProviderOptions::default();
        assert_eq!(opts.mode, RunMode::Video);
        assert_eq!(opts.max_hands, 2);
        assert_eq!(opts.min_detection_confidence, 0.5);
        assert_eq!(opts.min_tracking_confidence, 0.5);
    }

    #[test]
    fn boxed_provider_forwards() {
        struct Fixed;
        impl LandmarkProvider for Fixed {
            fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<NormalizedHand>> {
                Ok(vec![NormalizedHand::new([[0.5, 0.5]; NUM_LANDMARKS])])
            }
        }

        let mut provider: Box<dyn LandmarkProvider> = Box::new(Fixed);
        let hands = provider.detect(&Image::new(1, 1)).unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness(), None);
    }
}
