use std::{collections::VecDeque, env, fs, path::PathBuf};

use handsign::{
    gesture::{Finger, Gesture},
    image::{Color, Image},
    overlay::{draw_overlay, OverlayOptions},
    pipeline::{analyze_frame, FrameSource},
    provider::{LandmarkProvider, NormalizedHand, NUM_LANDMARKS},
};

/// Hands out a prepared list of hands per frame.
struct ScriptedProvider {
    frames: VecDeque<Vec<NormalizedHand>>,
    calls: usize,
}

impl ScriptedProvider {
    fn new(frames: impl IntoIterator<Item = Vec<NormalizedHand>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            calls: 0,
        }
    }
}

impl LandmarkProvider for ScriptedProvider {
    fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<NormalizedHand>> {
        self.calls += 1;
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

/// Builds an upright hand with the given fingers extended.
fn hand(up: [bool; 5]) -> NormalizedHand {
    let mut points = [[0.5, 0.6]; NUM_LANDMARKS];
    for (finger, up) in Finger::ALL.into_iter().zip(up) {
        let tip = &mut points[finger.tip()];
        match finger {
            Finger::Thumb => tip[0] = if up { 0.6 } else { 0.4 },
            _ => tip[1] = if up { 0.3 } else { 0.7 },
        }
    }
    NormalizedHand::new(points)
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("handsign-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_frame(dir: &PathBuf, name: &str) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(160, 120, image::Rgba([10, 20, 30, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn gestures_over_a_frame_sequence() {
    let dir = temp_dir("sequence");
    let paths: Vec<_> = (0..4)
        .map(|i| write_frame(&dir, &format!("frame{i}.png")))
        .collect();

    let mut provider = ScriptedProvider::new([
        vec![hand([false; 5])],
        vec![hand([true; 5])],
        vec![],
        vec![hand([false, true, true, false, false]), hand([true; 5])],
    ]);

    let mut gestures = Vec::new();
    for frame in FrameSource::images(paths) {
        assert_eq!(frame.width(), 160);
        let analysis = analyze_frame(&mut provider, &frame, 0).unwrap();
        gestures.push(analysis.gesture);
    }

    assert_eq!(provider.calls, 4);
    assert_eq!(
        gestures,
        [
            Some(Gesture::Fist),
            Some(Gesture::OpenHand),
            None,
            Some(Gesture::PeaceSign),
        ]
    );

    fs::remove_dir_all(dir).ok();
}

#[test]
fn unreadable_images_are_skipped() {
    let dir = temp_dir("skip");
    let good = write_frame(&dir, "good.png");
    let source = FrameSource::images(vec![
        dir.join("missing.png"),
        dir.join("unsupported.bmp"),
        good,
    ]);
    assert!(source.is_still());
    assert_eq!(source.count(), 1);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn second_hand_can_be_classified() {
    let mut provider = ScriptedProvider::new([vec![
        hand([false; 5]),
        hand([false, true, false, false, false]),
    ]]);
    let frame = Image::new(200, 200);
    let analysis = analyze_frame(&mut provider, &frame, 1).unwrap();

    assert_eq!(analysis.hands.len(), 2);
    assert_eq!(analysis.gesture, Some(Gesture::Pointing));
    assert_eq!(analysis.landmark_count(), NUM_LANDMARKS);
}

#[test]
fn annotated_frame() {
    let mut provider = ScriptedProvider::new([vec![hand([true; 5])]]);
    let mut frame = Image::new(640, 480);
    frame.clear(Color::BLACK);

    let analysis = analyze_frame(&mut provider, &frame, 0).unwrap();
    let m = analysis.measurement.unwrap();
    // Thumb tip at (0.6, 0.6), index tip at (0.5, 0.3).
    assert_eq!(m.from, (384, 288));
    assert_eq!(m.to, (320, 144));
    assert_eq!(m.midpoint, (352, 216));
    assert!((m.distance - 157.58).abs() < 0.01, "{}", m.distance);

    draw_overlay(&mut frame, &analysis, 30.0, OverlayOptions::default());
    assert_eq!(frame.get(m.from.0, m.from.1), Color::MAGENTA);
    assert_eq!(frame.get(m.midpoint.0, m.midpoint.1), Color::RED);
}
