//! Non-Maximum Suppression and Averaging.
//!
//! Single-Shot MultiBox Detectors (SSD) like the palm detector produce duplicate detections for
//! individual objects. Non-Maximum Suppression (NMS) filters these duplicates out, leaving only a
//! single detection with high confidence for each object.
//!
//! Two variants are implemented, selected with [`SuppressionMode`]: classic Non-Maximum
//! Suppression that removes any less confident detections ([`SuppressionMode::Remove`]), and
//! Non-Maximum Averaging ([`SuppressionMode::Average`]) which instead computes a weighted average
//! of overlapping detections. The latter reduces jitter between frames and is used by default.

use crate::{image::Rect, num::TotalF32};

use super::{Detection, Keypoint};

/// A non-maximum suppression algorithm.
pub struct NonMaxSuppression {
    seed_thresh: f32,
    iou_thresh: f32,
    avg_buf: Vec<Detection>,
    out_buf: Vec<Detection>,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a new non-maximum suppressor.
    ///
    /// The returned suppression algorithm will use [`SuppressionMode::Average`] and a default IOU
    /// threshold.
    ///
    /// # Parameters
    ///
    /// - `seed_thresh`: required detection confidence to "seed" an NMS round with a detection.
    pub fn new(seed_thresh: f32) -> Self {
        Self {
            seed_thresh,
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            avg_buf: Vec::new(),
            out_buf: Vec::new(),
            mode: SuppressionMode::Average,
        }
    }

    /// Sets the intersection-over-union threshold to consider two detections as overlapping.
    ///
    /// By default, [`Self::DEFAULT_IOU_THRESH`] is used.
    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    /// Sets the suppression mode.
    pub fn set_mode(&mut self, mode: SuppressionMode) {
        self.mode = mode;
    }

    /// Suppresses overlapping detections in `detections`, yielding the remaining ones with the
    /// highest confidence first.
    ///
    /// `detections` is left in an unspecified state afterwards.
    pub fn process(
        &mut self,
        detections: &mut Vec<Detection>,
    ) -> impl Iterator<Item = Detection> + '_ {
        self.out_buf.clear();

        // Sort by ascending confidence, process highest confidence first by starting at the back.
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence));

        while let Some(seed) = detections.pop() {
            if seed.confidence < self.seed_thresh {
                // no more significant detections left
                break;
            }

            let seed_rect = seed.bounding_rect();
            match self.mode {
                SuppressionMode::Remove => {
                    detections.retain(|other| seed_rect.iou(&other.bounding_rect()) < self.iou_thresh);
                    self.out_buf.push(seed);
                }
                SuppressionMode::Average => {
                    self.avg_buf.clear();
                    let avg_buf = &mut self.avg_buf;
                    let iou_thresh = self.iou_thresh;
                    detections.retain(|other| {
                        if seed_rect.iou(&other.bounding_rect()) >= iou_thresh {
                            avg_buf.push(other.clone());
                            false
                        } else {
                            true
                        }
                    });
                    avg_buf.push(seed);

                    self.out_buf.push(weighted_average(avg_buf));
                }
            }
        }

        self.avg_buf.clear();
        self.out_buf.drain(..)
    }
}

/// Computes the confidence-weighted average of `dets`.
///
/// The last element of `dets` is the seed detection; its confidence is used for the result.
fn weighted_average(dets: &[Detection]) -> Detection {
    let seed = &dets[dets.len() - 1];
    let mut keypoints = vec![Keypoint::new(0.0, 0.0); seed.keypoints.len()];
    let (mut cx, mut cy, mut w, mut h) = (0.0, 0.0, 0.0, 0.0);
    let mut divisor = 0.0;

    for det in dets {
        let factor = det.confidence;
        divisor += factor;
        debug_assert_eq!(det.keypoints.len(), keypoints.len());
        for (acc, kp) in keypoints.iter_mut().zip(&det.keypoints) {
            acc.x += kp.x * factor;
            acc.y += kp.y * factor;
        }
        let rect = det.bounding_rect();
        let (x, y) = rect.center();
        cx += x * factor;
        cy += y * factor;
        w += rect.width() * factor;
        h += rect.height() * factor;
    }

    for kp in &mut keypoints {
        kp.x /= divisor;
        kp.y /= divisor;
    }

    Detection::with_keypoints(
        seed.confidence,
        Rect::from_center(cx / divisor, cy / divisor, w / divisor, h / divisor),
        keypoints,
    )
}

/// Describes how [`NonMaxSuppression`] should deal with overlapping detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionMode {
    /// Remove overlapping detections, only retain the detection with highest confidence score.
    Remove,

    /// Compute a confidence-weighted average of overlapping detections.
    Average,
}
