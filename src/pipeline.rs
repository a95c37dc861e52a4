//! Per-frame processing: frame acquisition and landmark analysis.

use std::{iter, path::PathBuf, vec};

use crate::{
    config::CameraConfig,
    gesture::{classify, finger_states, FingerState, Gesture, Hand, Measurement},
    image::Image,
    provider::{Handedness, LandmarkProvider},
    timer::Timer,
    webcam::{Webcam, WebcamOptions},
};

/// A hand found in a frame, in pixel coordinates.
#[derive(Debug, Clone)]
pub struct DetectedHand {
    pub hand: Hand,
    pub handedness: Option<Handedness>,
}

/// Everything derived from one frame.
///
/// The finger state, gesture and measurement belong to the classified hand and are `None` when
/// that hand was not found in the frame.
#[derive(Debug, Clone, Default)]
pub struct FrameAnalysis {
    pub hands: Vec<DetectedHand>,
    /// Index into `hands` of the hand that was classified.
    pub hand_index: usize,
    pub finger_state: Option<FingerState>,
    pub gesture: Option<Gesture>,
    /// Thumb tip to index finger tip.
    pub measurement: Option<Measurement>,
}

impl FrameAnalysis {
    /// Returns the hand whose gesture was recognized.
    pub fn classified_hand(&self) -> Option<&Hand> {
        self.hands.get(self.hand_index).map(|h| &h.hand)
    }

    /// Returns the number of landmarks of the classified hand (0 if there is none).
    pub fn landmark_count(&self) -> usize {
        self.classified_hand().map_or(0, |hand| hand.landmarks().len())
    }
}

/// Runs `provider` on `frame` and recognizes the gesture of the hand at position `hand_index`.
///
/// Not finding any hand is not an error.
pub fn analyze_frame<P: LandmarkProvider + ?Sized>(
    provider: &mut P,
    frame: &Image,
    hand_index: usize,
) -> anyhow::Result<FrameAnalysis> {
    let res = frame.resolution();
    let hands: Vec<_> = provider
        .detect(frame)?
        .iter()
        .map(|hand| DetectedHand {
            hand: Hand::from_normalized(hand, res),
            handedness: hand.handedness(),
        })
        .collect();

    let mut analysis = FrameAnalysis {
        hands,
        hand_index,
        ..FrameAnalysis::default()
    };
    let Some(hand) = analysis.classified_hand() else {
        return Ok(analysis);
    };

    let finger_state = finger_states(hand.landmarks());
    let gesture = finger_state.as_ref().map(classify);
    let measurement = hand.pinch();
    analysis.finger_state = finger_state;
    analysis.gesture = gesture;
    analysis.measurement = Some(measurement);
    Ok(analysis)
}

/// A stream of frames to analyze.
pub enum FrameSource {
    Webcam {
        webcam: Webcam,
        mirror: bool,
    },
    /// Still images, each yielded once. Images are not mirrored.
    Images {
        paths: vec::IntoIter<PathBuf>,
        t_load: Timer,
    },
}

impl FrameSource {
    /// Opens the webcam described by `config`, or the list of still images if it names any.
    pub fn open(config: &CameraConfig) -> anyhow::Result<Self> {
        if let Some(images) = &config.images {
            log::info!("reading {} still image(s)", images.len());
            return Ok(Self::images(images.clone()));
        }

        let mut options = WebcamOptions::default().resolution(config.resolution());
        if let Some(name) = &config.name {
            options = options.name(name);
        }
        if let Some(fps) = config.fps {
            options = options.fps(fps);
        }
        Ok(Self::Webcam {
            webcam: Webcam::open(options)?,
            mirror: config.mirror,
        })
    }

    pub fn images(paths: Vec<PathBuf>) -> Self {
        Self::Images {
            paths: paths.into_iter(),
            t_load: Timer::new("load"),
        }
    }

    /// Returns whether this source yields unrelated still images rather than a video stream.
    pub fn is_still(&self) -> bool {
        matches!(self, Self::Images { .. })
    }

    /// Returns the next frame, or `None` when the source is exhausted.
    ///
    /// A webcam read failure ends the stream. Still images that fail to load are skipped.
    pub fn next_frame(&mut self) -> Option<Image> {
        match self {
            Self::Webcam { webcam, mirror } => match webcam.read() {
                Ok(mut image) => {
                    if *mirror {
                        image.flip_horizontal_in_place();
                    }
                    Some(image)
                }
                Err(e) => {
                    log::warn!("failed to read webcam frame: {e:#}");
                    None
                }
            },
            Self::Images { paths, t_load } => {
                for path in paths.by_ref() {
                    match t_load.time(|| Image::load(&path)) {
                        Ok(image) => {
                            log::debug!("loaded '{}' ({})", path.display(), image.resolution());
                            return Some(image);
                        }
                        Err(e) => log::error!("skipping '{}': {e:#}", path.display()),
                    }
                }
                None
            }
        }
    }

    pub fn timers(&self) -> Box<dyn Iterator<Item = &Timer> + '_> {
        match self {
            Self::Webcam { webcam, .. } => Box::new(webcam.timers()),
            Self::Images { t_load, .. } => Box::new(iter::once(t_load)),
        }
    }
}

impl Iterator for FrameSource {
    type Item = Image;

    fn next(&mut self) -> Option<Image> {
        self.next_frame()
    }
}
