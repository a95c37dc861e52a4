use std::{process, thread, time::Duration};

use anyhow::Context;
use handsign::{
    config::Config,
    gui::Window,
    hand::tracking::HandTracker,
    overlay::{draw_overlay, OverlayOptions},
    pipeline::{analyze_frame, FrameAnalysis, FrameSource},
    timer::{FpsCounter, Timer},
};

const LEGEND: &[&str] = &[
    "Gestures detected:",
    "- Open hand: All fingers up",
    "- Fist: No fingers up",
    "- Peace: Index and middle finger up",
    "- Thumbs up: Only thumb up",
];

fn main() -> anyhow::Result<()> {
    handsign::init_logger!();

    let config = Config::from_args_or_env()?;

    let mut source = match FrameSource::open(&config.camera) {
        Ok(source) => source,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: Could not open camera");
            process::exit(1);
        }
    };

    let p = &config.provider;
    let mut tracker = HandTracker::load(&p.palm_model, &p.landmark_model, config.provider_options())
        .context("failed to load the hand tracking models")?;

    println!("Hand Tracking System Started!");
    println!("Camera window should appear shortly...");
    println!("Press 'q' to quit");
    for line in LEGEND {
        println!("{line}");
    }

    let mut window = Window::new(config.display.title.clone());
    let overlay = OverlayOptions::from(&config.display);
    let hand_index = config.display.hand_index;
    let mut fps = FpsCounter::new("handsign");
    let mut t_analyze = Timer::new("analyze");
    let mut t_draw = Timer::new("draw");
    let mut last_still = None;

    while window.keep_running() {
        let Some(mut frame) = source.next_frame() else {
            log::debug!("frame source exhausted");
            break;
        };

        let analysis = match t_analyze.time(|| analyze_frame(&mut tracker, &frame, hand_index)) {
            Ok(analysis) => analysis,
            Err(e) => {
                log::error!("hand landmark estimation failed: {e:#}");
                FrameAnalysis::default()
            }
        };
        if source.is_still() {
            log::info!(
                "{} hand(s), gesture: {}",
                analysis.hands.len(),
                analysis.gesture.map_or("-".to_string(), |g| g.to_string()),
            );
        }

        let rate = fps.tick_with(
            source
                .timers()
                .chain(tracker.timers())
                .chain([&t_analyze, &t_draw]),
        );
        t_draw.time(|| draw_overlay(&mut frame, &analysis, rate, overlay));
        window.show(&frame)?;

        if source.is_still() {
            last_still = Some(frame);
        }
    }

    // Still images are gone in an instant; keep the last one on screen until the user quits.
    if let Some(frame) = last_still {
        while window.keep_running() {
            window.show(&frame)?;
            thread::sleep(Duration::from_millis(16));
        }
    }

    println!("Hand tracking system stopped.");
    Ok(())
}
