//! # Client Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) is a valid configuration.
//!
//! ```toml
//! server_url = "wss://example.com"
//! player_name = "Alice"
//! frame_rate = 60
//!
//! [viewport]
//! width = 1920.0
//! height = 1080.0
//!
//! [camera]
//! min_zoom = 0.3
//! smoothing = 0.05
//! ```

use std::path::Path;

use serde::Deserialize;
use slither_shared::DEFAULT_SERVER_URL;

use crate::error::{ConfigError, ConfigResult};

/// Canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Half width.
    #[inline]
    #[must_use]
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    /// Half height.
    #[inline]
    #[must_use]
    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Camera tuning.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Zoom never drops below this.
    pub min_zoom: f64,
    /// Fraction of the distance to the target zoom covered per frame.
    pub smoothing: f64,
    /// Zoom before the first frame.
    pub initial_zoom: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            smoothing: 0.05,
            initial_zoom: 1.0,
        }
    }
}

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Game server endpoint.
    pub server_url: String,
    /// Display name sent in JOIN (truncated on the wire).
    pub player_name: String,
    /// Rendered frames per second; one INPUT frame goes out per frame.
    pub frame_rate: u32,
    /// Canvas size.
    pub viewport: Viewport,
    /// Camera tuning.
    pub camera: CameraConfig,
    /// Outbound frames that may queue before new ones are dropped.
    pub outbound_queue: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            player_name: "Guest".to_string(),
            frame_rate: 60,
            viewport: Viewport::default(),
            camera: CameraConfig::default(),
            outbound_queue: 64,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`ClientConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be positive".into()));
        }
        let Viewport { width, height } = self.viewport;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport must be positive, got {width}x{height}"
            )));
        }
        if !(self.camera.min_zoom > 0.0 && self.camera.min_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "camera.min_zoom must be positive, got {}",
                self.camera.min_zoom
            )));
        }
        if !(self.camera.smoothing > 0.0 && self.camera.smoothing <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.smoothing must be in (0, 1], got {}",
                self.camera.smoothing
            )));
        }
        if !(self.camera.initial_zoom > 0.0 && self.camera.initial_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "camera.initial_zoom must be positive, got {}",
                self.camera.initial_zoom
            )));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Invalid("outbound_queue must be positive".into()));
        }
        Ok(())
    }
}
