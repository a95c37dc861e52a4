//! Draws the results of [`analyze_frame`](crate::pipeline::analyze_frame) onto the frame.

use crate::{
    config::DisplayConfig,
    gesture::{Finger, Hand, Measurement},
    hand::landmark::CONNECTIVITY,
    image::{draw_circle, draw_line, draw_marker, draw_text, Color, Image},
    pipeline::FrameAnalysis,
    provider::Handedness,
};

const TEXT_X: i32 = 50;
const INFO_COLOR: Color = Color::GREEN;
const STATS_COLOR: Color = Color::BLUE;
const CONNECTION_COLOR: Color = Color::from_rgb8(224, 224, 224);
const LANDMARK_COLOR: Color = Color::RED;
const MEASUREMENT_COLOR: Color = Color::MAGENTA;
const MIDPOINT_COLOR: Color = Color::RED;

/// Which parts of the overlay to draw.
#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions {
    pub skeleton: bool,
    pub fingertips: bool,
    pub handedness: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            skeleton: true,
            fingertips: false,
            handedness: false,
        }
    }
}

impl From<&DisplayConfig> for OverlayOptions {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            skeleton: config.draw_skeleton,
            fingertips: config.draw_fingertips,
            handedness: config.draw_handedness,
        }
    }
}

/// Draws hand skeletons, the recognized gesture, the thumb to index finger distance, and frame
/// statistics onto `image`.
pub fn draw_overlay(image: &mut Image, analysis: &FrameAnalysis, fps: f32, opts: OverlayOptions) {
    for detected in &analysis.hands {
        if opts.skeleton {
            draw_skeleton(image, &detected.hand);
        }
        if opts.handedness {
            if let Some(handedness) = detected.handedness {
                draw_handedness(image, &detected.hand, handedness);
            }
        }
    }

    if let Some(hand) = analysis.classified_hand() {
        if opts.fingertips {
            for finger in Finger::ALL {
                let lm = hand[finger.tip()];
                draw_circle(image, lm.x as i32, lm.y as i32, 10)
                    .color(MEASUREMENT_COLOR)
                    .filled();
            }
        }
    }

    if let (Some(gesture), Some(state)) = (analysis.gesture, analysis.finger_state) {
        draw_row(image, 50, &format!("Gesture: {gesture}"), INFO_COLOR);
        draw_row(image, 100, &format!("Fingers: {}", state.count()), INFO_COLOR);
    }
    if let Some(m) = &analysis.measurement {
        draw_measurement(image, m);
        // Truncated, not rounded.
        let text = format!("Distance: {}px", m.distance as u32);
        draw_row(image, 150, &text, INFO_COLOR);
    }

    draw_row(image, 200, &format!("FPS: {}", fps as u32), STATS_COLOR);
    let text = format!("Landmarks: {}", analysis.landmark_count());
    draw_row(image, 250, &text, STATS_COLOR);
}

/// Draws a line of text whose bottom left corner is at `(50, y)`.
fn draw_row(image: &mut Image, y: i32, text: &str, color: Color) {
    draw_text(image, TEXT_X, y, text)
        .align_left()
        .align_bottom()
        .color(color);
}

fn draw_skeleton(image: &mut Image, hand: &Hand) {
    for (a, b) in CONNECTIVITY {
        let (a, b) = (hand[*a as usize], hand[*b as usize]);
        draw_line(image, a.x as i32, a.y as i32, b.x as i32, b.y as i32)
            .color(CONNECTION_COLOR)
            .stroke_width(2);
    }
    for lm in hand.landmarks() {
        draw_marker(image, lm.x as i32, lm.y as i32).color(LANDMARK_COLOR);
    }
}

fn draw_handedness(image: &mut Image, hand: &Hand, handedness: Handedness) {
    let text = match handedness {
        Handedness::Left => "Left",
        Handedness::Right => "Right",
    };
    let wrist = hand[0];
    draw_text(image, wrist.x as i32, wrist.y as i32 + 20, text).color(Color::YELLOW);
}

/// Connects both endpoints with a line and marks them, with the midpoint in a different color.
fn draw_measurement(image: &mut Image, m: &Measurement) {
    let (x1, y1) = (m.from.0 as i32, m.from.1 as i32);
    let (x2, y2) = (m.to.0 as i32, m.to.1 as i32);
    draw_line(image, x1, y1, x2, y2)
        .color(MEASUREMENT_COLOR)
        .stroke_width(3);
    for (x, y) in [(x1, y1), (x2, y2)] {
        draw_circle(image, x, y, 15).color(MEASUREMENT_COLOR).filled();
    }
    let (cx, cy) = m.midpoint;
    draw_circle(image, cx as i32, cy as i32, 15)
        .color(MIDPOINT_COLOR)
        .filled();
}

#[cfg(test)]
mod tests {
    use crate::{
        gesture::{measure, Landmark},
        pipeline::analyze_frame,
        provider::{LandmarkProvider, NormalizedHand, NUM_LANDMARKS},
    };

    use super::*;

    struct OneHand;

    impl LandmarkProvider for OneHand {
        fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<NormalizedHand>> {
            let mut points = [[0.5, 0.5]; NUM_LANDMARKS];
            points[4] = [0.3, 0.7];
            points[8] = [0.7, 0.7];
            Ok(vec![NormalizedHand::new(points)])
        }
    }

    #[test]
    fn measurement_colors() {
        let mut image = Image::new(100, 100);
        image.clear(Color::BLACK);
        let m = measure(Landmark::new(4, 20, 50), Landmark::new(8, 80, 50));
        draw_measurement(&mut image, &m);

        assert_eq!(image.get(20, 50), MEASUREMENT_COLOR);
        assert_eq!(image.get(80, 50), MEASUREMENT_COLOR);
        assert_eq!(image.get(50, 50), MIDPOINT_COLOR);
        assert_eq!(image.get(50, 10), Color::BLACK);
    }

    #[test]
    fn overlay_without_hands_only_draws_stats() {
        let mut image = Image::new(400, 300);
        image.clear(Color::BLACK);
        draw_overlay(&mut image, &FrameAnalysis::default(), 30.0, OverlayOptions::default());

        let mut has_stats = false;
        for y in 0..300 {
            for x in 0..400 {
                let pixel = image.get(x, y);
                assert_ne!(pixel, INFO_COLOR, "gesture text drawn without a hand");
                has_stats |= pixel == STATS_COLOR;
            }
        }
        assert!(has_stats);
    }

    #[test]
    fn overlay_with_hand() {
        let mut image = Image::new(400, 300);
        image.clear(Color::BLACK);
        let analysis = analyze_frame(&mut OneHand, &image, 0).unwrap();
        draw_overlay(&mut image, &analysis, 0.0, OverlayOptions::default());

        let m = analysis.measurement.unwrap();
        assert_eq!(image.get(m.from.0, m.from.1), MEASUREMENT_COLOR);
        assert_eq!(image.get(m.midpoint.0, m.midpoint.1), MIDPOINT_COLOR);
        assert!((0..300).any(|y| (0..400).any(|x| image.get(x, y) == INFO_COLOR)));
    }
}
