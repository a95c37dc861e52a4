//! Hand tracking and gesture recognition.
//!
//! Frames are pulled from a webcam, hand landmarks are estimated by a pair of MediaPipe networks
//! (palm detection and hand landmarks), and a small set of geometric rules turns the landmarks of
//! one hand into a [`gesture::Gesture`].
//!
//! The gesture rules in [`gesture`] only depend on landmark positions. Anything that implements
//! [`provider::LandmarkProvider`] can feed them, which is how the tests drive the pipeline without
//! any model files.
//!
//! # Environment Variables
//!
//! * `HANDSIGN_CONFIG`: path to a TOML configuration file (see [`config::Config`]). The first
//!   command line argument takes precedence.
//! * `HANDSIGN_JPEG_BACKEND`: selects the JPEG decoder used for webcam frames. Allowed values are
//!   `zune-jpeg` (the default) and `jpeg-decoder`.
//! * `HANDSIGN_WEBCAM_NAME`: forces the device to use for [`webcam::Webcam`]s opened without an
//!   explicit device name.

use log::LevelFilter;

pub mod config;
pub mod detection;
pub mod gesture;
pub mod gui;
pub mod hand;
pub mod image;
pub mod nn;
pub mod overlay;
pub mod pipeline;
pub mod provider;
pub mod resolution;
pub mod timer;
pub mod webcam;

mod num;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
