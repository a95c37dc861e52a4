//! Palm detection.

use std::path::Path;

use anyhow::bail;
use nalgebra::{Point2, Vector2};
use once_cell::sync::Lazy;

use crate::{
    detection::{
        nms::NonMaxSuppression,
        ssd::{Anchor, Anchors, FeatureMap},
        Detection, Keypoint,
    },
    image::{Image, Rect},
    nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs},
    num::sigmoid,
    resolution::Resolution,
    timer::Timer,
};

/// A keypoint of a palm [`Detection`], in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

const NUM_KEYPOINTS: usize = 7;
const BOX_PARAMS: usize = 4 + NUM_KEYPOINTS * 2;

/// Scale from the palm box to a region that contains the whole hand.
const HAND_ROI_SCALE: f32 = 2.6;
/// Shift of the hand region towards the fingers, relative to the palm box height.
const HAND_ROI_SHIFT: f32 = 0.5;

static ANCHORS: Lazy<Anchors> =
    Lazy::new(|| Anchors::new(&[FeatureMap::new(24, 2), FeatureMap::new(12, 6)]));

/// Runs the palm detection network and decodes its output.
pub struct PalmDetector {
    cnn: Cnn,
    nms: NonMaxSuppression,
    raw_detections: Vec<Detection>,
    min_confidence: f32,
    t_infer: Timer,
    t_nms: Timer,
}

impl PalmDetector {
    /// Loads the palm detection network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P, min_confidence: f32) -> anyhow::Result<Self> {
        let nn = NeuralNetwork::from_path(path)?.load()?;
        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self {
            cnn,
            nms: NonMaxSuppression::new(min_confidence),
            raw_detections: Vec::new(),
            min_confidence,
            t_infer: Timer::new("palm infer"),
            t_nms: Timer::new("palm NMS"),
        })
    }

    /// Returns the expected input resolution of the internal neural network.
    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer, &self.t_nms].into_iter()
    }

    /// Detects palms in `image`.
    ///
    /// The returned detections are in `image` coordinates, sorted by descending confidence.
    pub fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Detection>> {
        // Letterbox the frame into the square network input.
        let roi = image.rect().make_square();
        let input_res = self.cnn.input_resolution();

        let outputs = self.t_infer.time(|| self.cnn.estimate(image, roi))?;
        log::trace!("palm detection outputs: {:?}", outputs);

        self.raw_detections.clear();
        extract_outputs(
            input_res,
            &outputs,
            self.min_confidence,
            &mut self.raw_detections,
        )?;

        let scale_x = roi.width() / input_res.width() as f32;
        let scale_y = roi.height() / input_res.height() as f32;
        let raw = &mut self.raw_detections;
        let nms = &mut self.nms;
        let detections = self.t_nms.time(|| {
            nms.process(raw)
                .map(|mut det| {
                    det.map_coords([scale_x, scale_y], |x, y| {
                        (roi.x() + x * scale_x, roi.y() + y * scale_y)
                    });
                    det
                })
                .collect::<Vec<_>>()
        });

        Ok(detections)
    }
}

fn extract_outputs(
    input_res: Resolution,
    outputs: &Outputs,
    thresh: f32,
    detections: &mut Vec<Detection>,
) -> anyhow::Result<()> {
    if outputs.len() < 2 {
        bail!("palm detection network produced {} outputs, expected 2", outputs.len());
    }

    let num_anchors = ANCHORS.len();
    let boxes = &outputs[0];
    let confidences = &outputs[1];
    if boxes.shape() != [1, num_anchors, BOX_PARAMS] || confidences.shape() != [1, num_anchors, 1]
    {
        bail!(
            "unexpected palm detection output shapes {:?} and {:?}",
            boxes.shape(),
            confidences.shape(),
        );
    }

    let boxes = boxes.as_slice::<f32>()?;
    let confidences = confidences.as_slice::<f32>()?;
    for (index, &raw_conf) in confidences.iter().enumerate() {
        let conf = sigmoid(raw_conf);
        if conf < thresh {
            continue;
        }

        let box_params = &boxes[index * BOX_PARAMS..][..BOX_PARAMS];
        detections.push(extract_detection(
            &ANCHORS[index],
            input_res,
            box_params,
            conf,
        ));
    }

    Ok(())
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: &[f32],
    confidence: f32,
) -> Detection {
    let anchor_x = anchor.x * input_res.width() as f32;
    let anchor_y = anchor.y * input_res.height() as f32;

    let xc = box_params[0] + anchor_x;
    let yc = box_params[1] + anchor_y;
    let w = box_params[2];
    let h = box_params[3];
    let keypoints = box_params[4..]
        .chunks_exact(2)
        .map(|xy| Keypoint::new(xy[0] + anchor_x, xy[1] + anchor_y))
        .collect();

    Detection::with_keypoints(confidence, Rect::from_center(xc, yc, w, h), keypoints)
}

/// Computes the region of interest for the hand landmark network from a palm detection.
///
/// The palm box is shifted towards the fingers (along the wrist to middle finger direction),
/// enlarged to cover the whole hand, and made square.
pub fn hand_roi(palm: &Detection) -> Rect {
    let rect = palm.bounding_rect();
    let keypoint = |kp: PalmKeypoint| {
        palm.keypoints()
            .get(kp as usize)
            .map(|kp| Point2::new(kp.x(), kp.y()))
    };

    let direction = match (
        keypoint(PalmKeypoint::Wrist),
        keypoint(PalmKeypoint::MiddleFingerMcp),
    ) {
        (Some(wrist), Some(finger)) => (finger - wrist)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector2::zeros),
        _ => Vector2::zeros(),
    };

    let shift = direction * rect.height() * HAND_ROI_SHIFT;
    rect.move_by(shift.x, shift.y)
        .scale(HAND_ROI_SCALE)
        .make_square()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn decode_box_relative_to_anchor() {
        let mut params = [0.0; BOX_PARAMS];
        params[0] = 2.0;
        params[1] = -4.0;
        params[2] = 30.0;
        params[3] = 40.0;
        params[4] = 1.0;
        params[5] = 1.0;

        let anchor = &ANCHORS[0];
        let det = extract_detection(anchor, Resolution::new(192, 192), &params, 0.9);
        let (cx, cy) = det.bounding_rect().center();
        assert_relative_eq!(cx, 4.0 + 2.0);
        assert_relative_eq!(cy, 4.0 - 4.0);
        assert_eq!(det.bounding_rect().width(), 30.0);
        assert_eq!(det.bounding_rect().height(), 40.0);
        assert_eq!(det.keypoints().len(), NUM_KEYPOINTS);
        assert_eq!(det.keypoints()[0], Keypoint::new(5.0, 5.0));
        assert_eq!(det.confidence(), 0.9);
    }

    #[test]
    fn hand_roi_shifts_towards_fingers() {
        let mut keypoints = vec![Keypoint::new(0.0, 0.0); NUM_KEYPOINTS];
        keypoints[PalmKeypoint::Wrist as usize] = Keypoint::new(100.0, 120.0);
        keypoints[PalmKeypoint::MiddleFingerMcp as usize] = Keypoint::new(100.0, 80.0);
        let palm = Detection::with_keypoints(
            1.0,
            Rect::from_center(100.0, 100.0, 40.0, 50.0),
            keypoints,
        );

        let roi = hand_roi(&palm);
        let (cx, cy) = roi.center();
        assert_relative_eq!(cx, 100.0);
        assert_relative_eq!(cy, 75.0);
        assert_relative_eq!(roi.width(), 130.0);
        assert_relative_eq!(roi.height(), 130.0);
    }

    #[test]
    fn hand_roi_without_keypoints() {
        let palm = Detection::new(1.0, Rect::from_center(10.0, 10.0, 10.0, 10.0));
        let roi = hand_roi(&palm);
        assert_eq!(roi.center(), (10.0, 10.0));
        assert_relative_eq!(roi.width(), 26.0);
    }
}
