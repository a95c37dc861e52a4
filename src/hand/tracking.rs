//! Hand tracking across frames.
//!
//! In [`RunMode::Video`], the landmarks estimated for a hand in one frame determine where the
//! landmark network looks in the next frame, and the (much slower) palm detector only runs while
//! fewer than the maximum number of hands are tracked. A hand is lost once the landmark network's
//! presence score drops below the tracking confidence. In [`RunMode::Static`], every frame starts
//! from palm detection.

use std::{mem, path::Path};

use crate::{
    detection::Detection,
    image::{Image, Rect},
    provider::{LandmarkProvider, NormalizedHand, ProviderOptions, RunMode},
    timer::Timer,
};

use super::{
    detection::{hand_roi, PalmDetector},
    landmark::{LandmarkResult, Landmarker, DEFAULT_ROI_PADDING},
};

/// Finds palms in a full frame.
pub trait Detector {
    /// Returns palm detections in `image` coordinates, most confident first.
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Detection>>;
}

impl Detector for PalmDetector {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Detection>> {
        PalmDetector::detect(self, image)
    }
}

/// Estimates hand landmarks inside a region of interest.
pub trait Estimator {
    fn estimate(&mut self, image: &Image, roi: Rect) -> anyhow::Result<LandmarkResult>;
}

impl Estimator for Landmarker {
    fn estimate(&mut self, image: &Image, roi: Rect) -> anyhow::Result<LandmarkResult> {
        Landmarker::estimate(self, image, roi)
    }
}

/// Tracks up to [`ProviderOptions::max_hands`] hands over a sequence of frames.
pub struct HandTracker<D = PalmDetector, L = Landmarker> {
    detector: D,
    landmarker: L,
    options: ProviderOptions,
    hands: Vec<TrackedHand>,
    next_hand_id: HandId,
    iou_thresh: f32,
}

impl HandTracker {
    /// Loads the palm detection and hand landmark networks from ONNX files.
    pub fn load(
        palm_model: &Path,
        landmark_model: &Path,
        options: ProviderOptions,
    ) -> anyhow::Result<Self> {
        let detector = PalmDetector::load(palm_model, options.min_detection_confidence)?;
        let landmarker = Landmarker::load(landmark_model)?;
        log::debug!(
            "loaded palm detector ({}) and landmarker ({})",
            detector.input_resolution(),
            landmarker.input_resolution(),
        );
        Ok(Self::new(detector, landmarker, options))
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        self.detector.timers().chain(self.landmarker.timers())
    }
}

impl<D: Detector, L: Estimator> HandTracker<D, L> {
    /// The default intersection-over-union threshold at which two hand regions are considered to
    /// cover the same hand.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    pub fn new(detector: D, landmarker: L, options: ProviderOptions) -> Self {
        Self {
            detector,
            landmarker,
            options,
            hands: Vec::new(),
            next_hand_id: HandId(0),
            iou_thresh: Self::DEFAULT_IOU_THRESH,
        }
    }

    /// Sets the intersection-over-union threshold at which two tracking regions are considered to
    /// overlap.
    ///
    /// Palm detection also finds hands that are already tracked; this threshold ensures that each
    /// hand is only tracked once.
    pub fn set_iou_thresh(&mut self, thresh: f32) {
        self.iou_thresh = thresh;
    }

    /// Returns the number of hands that will be carried over into the next frame.
    pub fn tracked_hands(&self) -> usize {
        self.hands.len()
    }

    /// Estimates the landmarks of all hands in `image` and updates the tracking state.
    pub fn track(&mut self, image: &Image) -> anyhow::Result<Vec<(HandId, LandmarkResult)>> {
        if self.options.mode == RunMode::Static {
            self.hands.clear();
        }

        let mut results = Vec::new();
        let mut kept: Vec<TrackedHand> = Vec::with_capacity(self.hands.len());
        let mut pending = mem::take(&mut self.hands).into_iter();
        while let Some(mut hand) = pending.next() {
            let lm = match self.landmarker.estimate(image, hand.roi) {
                Ok(lm) => lm,
                Err(e) => {
                    // Keep every hand, so that the next frame can resume tracking.
                    kept.push(hand);
                    kept.extend(pending);
                    self.hands = kept;
                    return Err(e);
                }
            };
            let Some(roi) = self.next_roi(&lm) else {
                log::trace!("tracking lost for {:?} (presence {:.2})", hand.id, lm.presence());
                continue;
            };
            // Two regions can drift onto the same hand.
            if overlaps(&kept, roi, self.iou_thresh) {
                log::trace!("{:?} overlaps another tracked hand, dropping it", hand.id);
                continue;
            }

            hand.roi = roi;
            results.push((hand.id, lm));
            kept.push(hand);
        }
        self.hands = kept;

        if self.hands.len() < self.options.max_hands {
            for det in self.detector.detect(image)? {
                if self.hands.len() >= self.options.max_hands {
                    break;
                }

                let palm_roi = hand_roi(&det);
                if overlaps(&self.hands, palm_roi, self.iou_thresh) {
                    continue;
                }

                let lm = self.landmarker.estimate(image, palm_roi)?;
                let Some(roi) = self.next_roi(&lm) else {
                    log::trace!(
                        "discarding palm detection (confidence {:.2}, presence {:.2})",
                        det.confidence(),
                        lm.presence(),
                    );
                    continue;
                };
                if overlaps(&self.hands, roi, self.iou_thresh) {
                    continue;
                }

                let id = self.next_hand_id;
                self.next_hand_id.0 += 1;
                log::trace!("tracking new hand {:?} (palm confidence {:.2})", id, det.confidence());
                results.push((id, lm));
                self.hands.push(TrackedHand { id, roi });
            }
        }

        if self.options.mode == RunMode::Static {
            self.hands.clear();
        }

        Ok(results)
    }

    /// Returns the region to track `lm` in next, or `None` if the hand is not present.
    fn next_roi(&self, lm: &LandmarkResult) -> Option<Rect> {
        if lm.presence() < self.options.min_tracking_confidence {
            return None;
        }
        lm.tracking_roi(DEFAULT_ROI_PADDING)
    }
}

fn overlaps(hands: &[TrackedHand], roi: Rect, iou_thresh: f32) -> bool {
    hands.iter().any(|hand| hand.roi.iou(&roi) >= iou_thresh)
}

impl<D: Detector, L: Estimator> LandmarkProvider for HandTracker<D, L> {
    fn detect(&mut self, frame: &Image) -> anyhow::Result<Vec<NormalizedHand>> {
        if frame.resolution().is_empty() {
            return Ok(Vec::new());
        }

        let (w, h) = (frame.width() as f32, frame.height() as f32);
        let hands = self
            .track(frame)?
            .into_iter()
            .map(|(_, lm)| {
                let points = lm.positions().map(|[x, y]| [x / w, y / h]);
                NormalizedHand::new(points).with_handedness(lm.handedness())
            })
            .collect();
        Ok(hands)
    }
}

struct TrackedHand {
    id: HandId,
    roi: Rect,
}

/// ID of a tracked hand.
///
/// The assigned [`HandId`]s are unique per [`HandTracker`] assigning them. They are reused between
/// frames for as long as the hand is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandId(u64);

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crate::{detection::Keypoint, provider::NUM_LANDMARKS};

    use super::*;

    /// Returns one palm at a fixed position on every call.
    struct FixedPalm {
        calls: usize,
        rect: Rect,
    }

    impl Detector for FixedPalm {
        fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<Detection>> {
            self.calls += 1;
            let (cx, cy) = self.rect.center();
            let keypoints = vec![Keypoint::new(cx, cy); 7];
            Ok(vec![Detection::with_keypoints(0.9, self.rect, keypoints)])
        }
    }

    /// Places a hand in the middle of the region it is given, with scripted presence scores.
    struct ScriptedLandmarks {
        presence: VecDeque<f32>,
        fail_next: bool,
    }

    impl Estimator for ScriptedLandmarks {
        fn estimate(&mut self, _: &Image, roi: Rect) -> anyhow::Result<LandmarkResult> {
            if std::mem::take(&mut self.fail_next) {
                anyhow::bail!("inference failed");
            }
            let presence = self.presence.pop_front().unwrap_or(1.0);
            let (cx, cy) = roi.center();
            let mut positions = [[cx, cy]; NUM_LANDMARKS];
            positions[0] = [cx - 10.0, cy - 10.0];
            positions[1] = [cx + 10.0, cy + 10.0];
            Ok(LandmarkResult::new(positions, presence, 0.0))
        }
    }

    fn tracker(mode: RunMode, presence: &[f32]) -> HandTracker<FixedPalm, ScriptedLandmarks> {
        HandTracker::new(
            FixedPalm {
                calls: 0,
                rect: Rect::from_center(50.0, 50.0, 20.0, 20.0),
            },
            ScriptedLandmarks {
                presence: presence.iter().copied().collect(),
                fail_next: false,
            },
            ProviderOptions {
                mode,
                max_hands: 1,
                ..ProviderOptions::default()
            },
        )
    }

    #[test]
    fn video_mode_reuses_roi() {
        let image = Image::new(100, 100);
        let mut tracker = tracker(RunMode::Video, &[]);

        let first = tracker.track(&image).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(tracker.detector.calls, 1);
        assert_eq!(tracker.tracked_hands(), 1);

        let second = tracker.track(&image).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, first[0].0);
        assert_eq!(tracker.detector.calls, 1, "detector must not run while tracking");
    }

    #[test]
    fn lost_hand_triggers_redetection() {
        let image = Image::new(100, 100);
        // Frame 1: detected. Frame 2: tracked hand lost, the new detection is found again.
        let mut tracker = tracker(RunMode::Video, &[0.9, 0.1, 0.9]);

        let first = tracker.track(&image).unwrap();
        let second = tracker.track(&image).unwrap();
        assert_eq!(tracker.detector.calls, 2);
        assert_eq!(second.len(), 1);
        assert_ne!(second[0].0, first[0].0);
    }

    #[test]
    fn low_presence_detection_is_discarded() {
        let image = Image::new(100, 100);
        let mut tracker = tracker(RunMode::Video, &[0.2]);

        assert!(tracker.track(&image).unwrap().is_empty());
        assert_eq!(tracker.tracked_hands(), 0);
    }

    #[test]
    fn failed_estimation_keeps_tracked_hands() {
        let image = Image::new(100, 100);
        let mut tracker = tracker(RunMode::Video, &[]);
        let first = tracker.track(&image).unwrap();

        tracker.landmarker.fail_next = true;
        assert!(tracker.track(&image).is_err());
        assert_eq!(tracker.tracked_hands(), 1);

        let next = tracker.track(&image).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].0, first[0].0);
        assert_eq!(tracker.detector.calls, 1);
    }

    #[test]
    fn static_mode_detects_every_frame() {
        let image = Image::new(100, 100);
        let mut tracker = tracker(RunMode::Static, &[]);

        for _ in 0..3 {
            assert_eq!(tracker.track(&image).unwrap().len(), 1);
            assert_eq!(tracker.tracked_hands(), 0);
        }
        assert_eq!(tracker.detector.calls, 3);
    }

    #[test]
    fn provider_output_is_normalized() {
        let image = Image::new(200, 100);
        let mut tracker = tracker(RunMode::Video, &[]);

        let hands = tracker.detect(&image).unwrap();
        assert_eq!(hands.len(), 1);
        for &[x, y] in hands[0].points() {
            assert!((0.0..=1.0).contains(&x), "{x}");
            assert!((0.0..=1.0).contains(&y), "{y}");
        }
        assert!(tracker.detect(&Image::new(0, 0)).unwrap().is_empty());
    }
}
