//! Application configuration loaded from JSON.
//!
//! Every field has a default, so an empty object (or no file at all) gives
//! the stock 1024x768 "Playground" window with a camera three units back
//! from the origin.

use crate::camera::Camera;
use crate::error::GlError;
use crate::params::SceneParams;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    /// MSAA samples; 0 disables multisampling.
    pub samples: u8,
    pub resizable: bool,
    pub debug_context: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "Playground".to_string(),
            vsync: true,
            samples: 4,
            resizable: false,
            debug_context: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub move_speed: f32,
    /// Degrees per pixel of mouse motion.
    pub mouse_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            move_speed: 2.5,
            mouse_sensitivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    /// RGBA, each channel in `[0, 1]`.
    pub clear_color: [f32; 4],
    /// Stop after this many frames. `None` runs until the window closes.
    pub frame_limit: Option<u64>,
    pub assets_dir: PathBuf,
    /// glTF file for the model scene, relative to `assets_dir` unless
    /// absolute.
    pub model_path: Option<PathBuf>,
    pub scene_params: SceneParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            clear_color: [0.0, 0.0, 0.4, 0.0],
            frame_limit: None,
            assets_dir: PathBuf::from("assets"),
            model_path: None,
            scene_params: SceneParams::default(),
        }
    }
}

impl AppConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Io`] if the file cannot be read and
    /// [`GlError::Config`] if it does not parse or validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GlError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GlError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_json_str(&text)
            .map_err(|e| GlError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Config`] on malformed JSON, unknown keys or a
    /// value that fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, GlError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`GlError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), GlError> {
        let w = &self.window;
        if w.width == 0 || w.height == 0 {
            return Err(GlError::Config(format!(
                "window size must be non-zero, got {}x{}",
                w.width, w.height
            )));
        }
        let c = &self.camera;
        if !(c.fov_degrees > 0.0 && c.fov_degrees < 180.0) {
            return Err(GlError::Config(format!(
                "camera.fov_degrees must be in (0, 180), got {}",
                c.fov_degrees
            )));
        }
        if !(c.near > 0.0 && c.near < c.far) {
            return Err(GlError::Config(format!(
                "camera needs 0 < near < far, got near {} far {}",
                c.near, c.far
            )));
        }
        if !(c.move_speed.is_finite() && c.move_speed >= 0.0) {
            return Err(GlError::Config(format!(
                "camera.move_speed must be a non-negative number, got {}",
                c.move_speed
            )));
        }
        if !(c.mouse_sensitivity.is_finite() && c.mouse_sensitivity > 0.0) {
            return Err(GlError::Config(format!(
                "camera.mouse_sensitivity must be positive, got {}",
                c.mouse_sensitivity
            )));
        }
        if self.clear_color.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(GlError::Config(format!(
                "clear_color channels must be in [0, 1], got {:?}",
                self.clear_color
            )));
        }
        if self.frame_limit == Some(0) {
            return Err(GlError::Config("frame_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn clear_color(&self) -> Vec4 {
        Vec4::from_array(self.clear_color)
    }

    /// Window width over height.
    pub fn aspect(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }

    /// A camera at the configured position looking down -Z.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] if the projection parameters
    /// are unusable.
    pub fn camera(&self, aspect: f32) -> Result<Camera, GlError> {
        let c = &self.camera;
        Camera::new(
            Vec3::from_array(c.position),
            c.fov_degrees,
            aspect,
            c.near,
            c.far,
        )
    }

    /// `name` resolved against `assets_dir`.
    pub fn asset(&self, name: impl AsRef<Path>) -> PathBuf {
        self.assets_dir.join(name)
    }

    pub fn model_file(&self) -> Option<PathBuf> {
        self.model_path.as_ref().map(|p| self.asset(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_gives_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!((config.window.width, config.window.height), (1024, 768));
        assert_eq!(config.window.title, "Playground");
        assert_eq!(config.window.samples, 4);
        assert!(!config.window.resizable);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config =
            AppConfig::from_json_str(r#"{"window": {"width": 800}, "frame_limit": 10}"#).unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 768);
        assert_eq!(config.frame_limit, Some(10));
    }

    #[test]
    fn unknown_key_is_config_error() {
        let err = AppConfig::from_json_str(r#"{"windw": {}}"#).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, GlError::Config(_)));
        assert!(msg.contains("windw"), "should name the key: {msg}");
    }

    #[test]
    fn validate_rejects_bad_projection() {
        for json in [
            r#"{"camera": {"fov_degrees": 0}}"#,
            r#"{"camera": {"fov_degrees": 180}}"#,
            r#"{"camera": {"near": 0}}"#,
            r#"{"camera": {"near": 10, "far": 5}}"#,
        ] {
            let err = AppConfig::from_json_str(json).unwrap_err();
            assert!(err.to_string().contains("camera"), "{json}: {err}");
        }
    }

    #[test]
    fn validate_rejects_zero_window_and_frame_limit() {
        assert!(AppConfig::from_json_str(r#"{"window": {"height": 0}}"#).is_err());
        assert!(AppConfig::from_json_str(r#"{"frame_limit": 0}"#).is_err());
    }

    #[test]
    fn load_reads_file_and_names_it_on_error() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(good, r#"{{"clear_color": [0.1, 0.2, 0.3, 1.0]}}"#).unwrap();
        let config = AppConfig::load(good.path()).unwrap();
        assert_eq!(config.clear_color(), Vec4::new(0.1, 0.2, 0.3, 1.0));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let msg = AppConfig::load(bad.path()).unwrap_err().to_string();
        let name = bad.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(msg.contains(&name), "should name the file: {msg}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load("/nonexistent/learngl.json").unwrap_err();
        assert!(matches!(err, GlError::Io { .. }));
    }

    #[test]
    fn scene_params_pass_through() {
        let config = AppConfig::from_json_str(r#"{"scene_params": {"cubes": 4}}"#).unwrap();
        assert_eq!(config.scene_params.u32("cubes", 10), 4);
    }

    #[test]
    fn camera_and_assets_resolve() {
        let config = AppConfig::from_json_str(
            r#"{"assets_dir": "res", "model_path": "backpack/backpack.gltf"}"#,
        )
        .unwrap();
        let camera = config.camera(config.aspect()).unwrap();
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(
            config.model_file(),
            Some(PathBuf::from("res/backpack/backpack.gltf"))
        );
    }
}
