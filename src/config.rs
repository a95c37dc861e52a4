//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid configuration:
//!
//! ```toml
//! [camera]
//! width = 1280
//! height = 720
//! mirror = true
//!
//! [provider]
//! mode = "video"
//! max_hands = 2
//! palm_model = "models/palm_detection.onnx"
//!
//! [display]
//! hand_index = 0
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use crate::{
    provider::{ProviderOptions, RunMode},
    resolution::Resolution,
};

const ENV_VAR_CONFIG: &str = "HANDSIGN_CONFIG";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where frames come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    /// Card name of the V4L2 device to open. The first supported device is used if unset.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub fps: Option<u32>,
    /// Flip webcam frames horizontally, so the window acts like a mirror.
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    /// Still images to process instead of opening a webcam.
    #[serde(default)]
    pub images: Option<Vec<PathBuf>>,
}

/// Landmark provider settings and model locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default = "default_max_hands")]
    pub max_hands: usize,
    #[serde(default = "default_confidence")]
    pub min_detection_confidence: f32,
    #[serde(default = "default_confidence")]
    pub min_tracking_confidence: f32,
    #[serde(default = "default_palm_model")]
    pub palm_model: PathBuf,
    #[serde(default = "default_landmark_model")]
    pub landmark_model: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Index of the detected hand whose gesture is recognized.
    #[serde(default)]
    pub hand_index: usize,
    #[serde(default = "default_true")]
    pub draw_skeleton: bool,
    /// Draw markers on the five fingertips of the recognized hand.
    #[serde(default)]
    pub draw_fingertips: bool,
    /// Label each hand as left or right.
    #[serde(default)]
    pub draw_handedness: bool,
}

fn default_width() -> u32 {
    Resolution::RES_720P.width()
}

fn default_height() -> u32 {
    Resolution::RES_720P.height()
}

fn default_mirror() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_max_hands() -> usize {
    2
}

fn default_confidence() -> f32 {
    0.5
}

fn default_palm_model() -> PathBuf {
    PathBuf::from("models/palm_detection.onnx")
}

fn default_landmark_model() -> PathBuf {
    PathBuf::from("models/hand_landmark.onnx")
}

fn default_title() -> String {
    "AI Hand Tracking - Albert Baiden-Amissah".to_string()
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: None,
            width: default_width(),
            height: default_height(),
            fps: None,
            mirror: default_mirror(),
            images: None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            max_hands: default_max_hands(),
            min_detection_confidence: default_confidence(),
            min_tracking_confidence: default_confidence(),
            palm_model: default_palm_model(),
            landmark_model: default_landmark_model(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            hand_index: 0,
            draw_skeleton: default_true(),
            draw_fingertips: false,
            draw_handedness: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file named by the first command line argument or the
    /// `HANDSIGN_CONFIG` environment variable, falling back to the defaults if neither is given.
    pub fn from_args_or_env() -> anyhow::Result<Self> {
        let path = env::args_os()
            .nth(1)
            .or_else(|| env::var_os(ENV_VAR_CONFIG))
            .map(PathBuf::from);
        match path {
            Some(path) => {
                log::debug!("loading configuration from '{}'", path.display());
                Self::load(path)
            }
            None => {
                log::debug!("no configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let p = &self.provider;
        for (name, value) in [
            ("min_detection_confidence", p.min_detection_confidence),
            ("min_tracking_confidence", p.min_tracking_confidence),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&value),
                "`provider.{name}` must be between 0 and 1, got {value}"
            );
        }
        anyhow::ensure!(p.max_hands > 0, "`provider.max_hands` must be at least 1");
        anyhow::ensure!(
            self.camera.width > 0 && self.camera.height > 0,
            "camera resolution must not be empty"
        );
        Ok(())
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            mode: self.provider.mode,
            max_hands: self.provider.max_hands,
            min_detection_confidence: self.provider.min_detection_confidence,
            min_tracking_confidence: self.provider.min_tracking_confidence,
        }
    }
}

impl CameraConfig {
    /// The resolution to request from the webcam. It might not be honored.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.camera.resolution(), Resolution::RES_720P);
        assert!(config.camera.mirror);
        assert!(config.camera.images.is_none());
        assert_eq!(config.provider_options(), ProviderOptions::default());
        assert_eq!(config.display.hand_index, 0);
        assert!(config.display.draw_skeleton);
        assert!(!config.display.draw_fingertips);
    }

    #[test]
    fn partial_sections() {
        let config = Config::parse(
            r#"
            [camera]
            name = "HD Webcam"
            mirror = false

            [provider]
            mode = "static"
            max_hands = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.name.as_deref(), Some("HD Webcam"));
        assert!(!config.camera.mirror);
        assert_eq!(config.camera.width, 1280);

        let opts = config.provider_options();
        assert_eq!(opts.mode, RunMode::Static);
        assert_eq!(opts.max_hands, 1);
        assert_eq!(opts.min_tracking_confidence, 0.5);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::parse("[provider]\nmin_detection_confidence = 1.5").is_err());
        assert!(Config::parse("[provider]\nmax_hands = 0").is_err());
        assert!(Config::parse("[provider]\nmode = \"burst\"").is_err());
        assert!(Config::parse("[camera]\nwidht = 640").is_err());
    }

    #[test]
    fn missing_file() {
        let err = Config::load("/nonexistent/handsign.toml").unwrap_err();
        assert!(err.to_string().contains("handsign.toml"), "{err}");
    }
}
