//! Hand landmark prediction.

use std::path::Path;

use anyhow::bail;

use crate::{
    image::{Image, Rect},
    nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs},
    provider::{Handedness, NUM_LANDMARKS},
    resolution::Resolution,
    timer::Timer,
};

/// Relative margin added to each side of the landmark bounding box when deriving the next frame's
/// region of interest.
pub const DEFAULT_ROI_PADDING: f32 = 0.3;

/// Landmarks estimated by a [`Landmarker`], in the coordinates of the full input image.
#[derive(Debug, Clone)]
pub struct LandmarkResult {
    positions: [[f32; 2]; NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl LandmarkResult {
    /// Creates a landmark result from image-space positions and raw network scores.
    pub fn new(positions: [[f32; 2]; NUM_LANDMARKS], presence: f32, raw_handedness: f32) -> Self {
        Self {
            positions,
            presence,
            raw_handedness,
        }
    }

    /// Returns the 2D landmark positions.
    pub fn positions(&self) -> &[[f32; 2]; NUM_LANDMARKS] {
        &self.positions
    }

    /// Returns a landmark's position.
    pub fn position(&self, idx: LandmarkIdx) -> [f32; 2] {
        self.positions[idx as usize]
    }

    /// Returns the network's confidence that a hand is actually present in the region.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the hand in the image.
    ///
    /// This assumes that the frame is passed in as it appears on screen, and the returned value
    /// should only be relied on when the presence is over some threshold.
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }

    /// Computes the region of interest to use for this hand in the next frame.
    pub fn tracking_roi(&self, padding: f32) -> Option<Rect> {
        Rect::bounding(self.positions.iter().copied())
            .map(|rect| rect.grow_rel(padding).make_square())
    }
}

/// Estimates hand landmarks inside a region of interest.
pub struct Landmarker {
    cnn: Cnn,
    t_infer: Timer,
}

impl Landmarker {
    /// Loads the hand landmark network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        // Outputs: screen landmarks, presence, handedness. The metric landmarks are not needed.
        let nn = NeuralNetwork::from_path(path)?
            .with_output_selection([0, 1, 2])
            .load()?;
        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self {
            cnn,
            t_infer: Timer::new("landmark infer"),
        })
    }

    /// Returns the expected input resolution of the internal neural network.
    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer].into_iter()
    }

    /// Estimates the landmarks of the hand inside `roi`.
    ///
    /// `roi` is in `image` coordinates and may extend past the image borders.
    pub fn estimate(&mut self, image: &Image, roi: Rect) -> anyhow::Result<LandmarkResult> {
        let outputs = self.t_infer.time(|| self.cnn.estimate(image, roi))?;
        extract(&outputs, self.cnn.input_resolution(), roi)
    }
}

fn extract(
    outputs: &Outputs,
    input_res: Resolution,
    roi: Rect,
) -> anyhow::Result<LandmarkResult> {
    if outputs.len() < 3 {
        bail!("hand landmark network produced {} outputs, expected 3", outputs.len());
    }

    let screen_landmarks = outputs[0].as_slice::<f32>()?;
    let presence = outputs[1].as_slice::<f32>()?;
    let handedness = outputs[2].as_slice::<f32>()?;
    if screen_landmarks.len() != NUM_LANDMARKS * 3 || presence.len() != 1 || handedness.len() != 1
    {
        bail!(
            "unexpected hand landmark output shapes {:?}, {:?}, {:?}",
            outputs[0].shape(),
            outputs[1].shape(),
            outputs[2].shape(),
        );
    }

    Ok(LandmarkResult::new(
        to_image_coords(screen_landmarks, input_res, roi),
        presence[0],
        handedness[0],
    ))
}

/// Maps `[x, y, z]` triples in network input pixels back to the coordinate system `roi` lives in.
///
/// `xyz` must hold exactly one triple per landmark.
fn to_image_coords(xyz: &[f32], input_res: Resolution, roi: Rect) -> [[f32; 2]; NUM_LANDMARKS] {
    let scale_x = roi.width() / input_res.width() as f32;
    let scale_y = roi.height() / input_res.height() as f32;
    std::array::from_fn(|i| {
        let (x, y) = (xyz[i * 3], xyz[i * 3 + 1]);
        [roi.x() + x * scale_x, roi.y() + y * scale_y]
    })
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Pairs of landmarks connected by the hand skeleton.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Surround the palm:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};
