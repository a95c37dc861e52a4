//! Detection and landmark estimation of human hands.
//!
//! Uses the MediaPipe palm detection and hand landmark networks, converted to ONNX. The tracker in
//! [`tracking`] combines both into a [`crate::provider::LandmarkProvider`].

pub mod detection;
pub mod landmark;
pub mod tracking;
