//! Gesture recognition from hand landmarks.
//!
//! Everything in here is a pure function of one frame's landmarks:
//!
//! - [`finger_states`] decides for each finger whether it is extended,
//! - [`classify`] maps the resulting [`FingerState`] to a [`Gesture`],
//! - [`measure`] computes the pixel distance and midpoint between two landmarks.

use std::{error::Error, fmt, ops::Index};

use itertools::Itertools;

use crate::{
    provider::{NormalizedHand, NUM_LANDMARKS},
    resolution::Resolution,
};

/// A hand landmark in pixel coordinates.
///
/// `id` is the MediaPipe hand landmark identifier (`0..=20`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Landmark {
    pub id: u8,
    pub x: u32,
    pub y: u32,
}

impl Landmark {
    pub fn new(id: u8, x: u32, y: u32) -> Self {
        Self { id, x, y }
    }
}

/// The 21 landmarks of one hand in pixel coordinates, ordered by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    landmarks: [Landmark; NUM_LANDMARKS],
}

impl Hand {
    /// Converts normalized landmarks to the pixel grid of a frame of size `res`.
    ///
    /// Coordinates are truncated and clamped to the frame, so every landmark lies on a valid
    /// pixel (for non-empty frames).
    ///
    /// Clamping happens before classification. A finger whose tip and reference joint both lie
    /// beyond the same frame edge ends up with equal coordinates and is therefore counted as
    /// down, even if the unclamped tip was further out than the joint.
    pub fn from_normalized(hand: &NormalizedHand, res: Resolution) -> Self {
        let to_pixel = |v: f32, size: u32| -> u32 {
            let max = size.saturating_sub(1);
            // `as` saturates: NaN and negative values become 0.
            ((v * size as f32) as u32).min(max)
        };

        let mut id = 0;
        let landmarks = hand.points().map(|[x, y]| {
            let lm = Landmark::new(id, to_pixel(x, res.width()), to_pixel(y, res.height()));
            id += 1;
            lm
        });
        Self { landmarks }
    }

    #[inline]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Computes which fingers of this hand are extended.
    pub fn finger_states(&self) -> FingerState {
        extended_fingers(&self.landmarks)
    }

    /// Classifies the gesture this hand is making.
    pub fn gesture(&self) -> Gesture {
        classify(&self.finger_states())
    }

    /// Measures the distance between the thumb tip and the index finger tip.
    pub fn pinch(&self) -> Measurement {
        measure(self[Finger::Thumb.tip()], self[Finger::Index.tip()])
    }
}

impl Index<usize> for Hand {
    type Output = Landmark;

    fn index(&self, id: usize) -> &Landmark {
        &self.landmarks[id]
    }
}

impl TryFrom<Vec<Landmark>> for Hand {
    type Error = HandError;

    fn try_from(landmarks: Vec<Landmark>) -> Result<Self, HandError> {
        let landmarks: [Landmark; NUM_LANDMARKS] = landmarks
            .try_into()
            .map_err(|v: Vec<Landmark>| HandError::LandmarkCount(v.len()))?;

        for (index, lm) in landmarks.iter().enumerate() {
            if usize::from(lm.id) != index {
                return Err(HandError::OutOfOrder { index, id: lm.id });
            }
        }

        Ok(Self { landmarks })
    }
}

/// Error returned when a list of landmarks does not form a [`Hand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandError {
    /// The list does not contain exactly 21 landmarks.
    LandmarkCount(usize),
    /// The landmark at `index` has identifier `id`.
    OutOfOrder { index: usize, id: u8 },
}

impl fmt::Display for HandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandError::LandmarkCount(n) => {
                write!(f, "a hand has {NUM_LANDMARKS} landmarks, got {n}")
            }
            HandError::OutOfOrder { index, id } => {
                write!(f, "landmark at position {index} has identifier {id}")
            }
        }
    }
}

impl Error for HandError {}

/// The five fingers, in the order used by [`FingerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Landmark identifier of the finger's tip.
    pub const fn tip(self) -> usize {
        match self {
            Finger::Thumb => 4,
            Finger::Index => 8,
            Finger::Middle => 12,
            Finger::Ring => 16,
            Finger::Pinky => 20,
        }
    }

    /// Landmark identifier of the joint the tip is compared against.
    ///
    /// This is the IP joint for the thumb and the PIP joint for the other fingers.
    pub const fn reference(self) -> usize {
        match self {
            Finger::Thumb => self.tip() - 1,
            _ => self.tip() - 2,
        }
    }
}

/// Which fingers are extended; `true` means up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FingerState([bool; 5]);

impl FingerState {
    pub const fn new(fingers: [bool; 5]) -> Self {
        Self(fingers)
    }

    #[inline]
    pub fn is_up(&self, finger: Finger) -> bool {
        self.0[finger as usize]
    }

    /// Returns the number of extended fingers.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|up| **up).count()
    }

}

impl From<[bool; 5]> for FingerState {
    fn from(fingers: [bool; 5]) -> Self {
        Self(fingers)
    }
}

/// Formats as `[1, 0, 0, 0, 0]`.
impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().map(|up| u8::from(*up)).join(", "))
    }
}

/// Computes the [`FingerState`] of a landmark list ordered by identifier.
///
/// Returns `None` when there is no hand, ie. the list is empty. A list that is too short to
/// contain every fingertip is treated the same way.
///
/// The thumb counts as up when its tip lies to the right of its IP joint (as seen in the mirrored
/// frame), the other fingers when their tip lies above their PIP joint.
pub fn finger_states(landmarks: &[Landmark]) -> Option<FingerState> {
    let landmarks: &[Landmark; NUM_LANDMARKS] = landmarks.get(..NUM_LANDMARKS)?.try_into().ok()?;
    Some(extended_fingers(landmarks))
}

fn extended_fingers(lm: &[Landmark; NUM_LANDMARKS]) -> FingerState {
    FingerState(Finger::ALL.map(|finger| {
        let tip = lm[finger.tip()];
        let reference = lm[finger.reference()];
        match finger {
            Finger::Thumb => tip.x > reference.x,
            _ => tip.y < reference.y,
        }
    }))
}

/// A recognized hand gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Fist,
    OpenHand,
    ThumbsUp,
    PeaceSign,
    ThreeFingers,
    Pointing,
    Unknown,
}

impl Gesture {
    pub const ALL: [Gesture; 7] = [
        Gesture::Fist,
        Gesture::OpenHand,
        Gesture::ThumbsUp,
        Gesture::PeaceSign,
        Gesture::ThreeFingers,
        Gesture::Pointing,
        Gesture::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Fist => "Fist",
            Gesture::OpenHand => "Open Hand",
            Gesture::ThumbsUp => "Thumbs Up",
            Gesture::PeaceSign => "Peace Sign",
            Gesture::ThreeFingers => "Three Fingers",
            Gesture::Pointing => "Pointing",
            Gesture::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Rule {
    gesture: Gesture,
    matches: fn(&FingerState, usize) -> bool,
}

/// Classification rules, evaluated in order. The first match wins.
const RULES: &[Rule] = {
    use Finger::*;
    &[
        Rule {
            gesture: Gesture::Fist,
            matches: |_, total| total == 0,
        },
        Rule {
            gesture: Gesture::OpenHand,
            matches: |_, total| total == 5,
        },
        Rule {
            gesture: Gesture::ThumbsUp,
            matches: |s, total| total == 1 && s.is_up(Thumb),
        },
        Rule {
            gesture: Gesture::PeaceSign,
            matches: |s, total| total == 2 && s.is_up(Index) && s.is_up(Middle),
        },
        Rule {
            gesture: Gesture::ThreeFingers,
            matches: |s, total| total == 3 && s.is_up(Index) && s.is_up(Middle) && s.is_up(Ring),
        },
        Rule {
            gesture: Gesture::Pointing,
            matches: |s, total| total == 1 && s.is_up(Index),
        },
    ]
};

/// Maps a [`FingerState`] to a [`Gesture`].
///
/// Every state maps to exactly one gesture; states not covered by a rule are
/// [`Gesture::Unknown`].
pub fn classify(state: &FingerState) -> Gesture {
    let total = state.count();
    RULES
        .iter()
        .find(|rule| (rule.matches)(state, total))
        .map_or(Gesture::Unknown, |rule| rule.gesture)
}

/// Distance between two landmarks, with everything needed to visualize it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub from: (u32, u32),
    pub to: (u32, u32),
    /// Midpoint, truncated to whole pixels.
    pub midpoint: (u32, u32),
    /// Euclidean distance in pixels.
    pub distance: f32,
}

/// Measures the Euclidean pixel distance between two landmarks.
pub fn measure(a: Landmark, b: Landmark) -> Measurement {
    let dx = f64::from(b.x) - f64::from(a.x);
    let dy = f64::from(b.y) - f64::from(a.y);
    // Average in u64 so large coordinates cannot overflow.
    let mid = |p: u32, q: u32| ((u64::from(p) + u64::from(q)) / 2) as u32;
    Measurement {
        from: (a.x, a.y),
        to: (b.x, b.y),
        midpoint: (mid(a.x, b.x), mid(a.y, b.y)),
        distance: dx.hypot(dy) as f32,
    }
}
