use std::f32::consts::FRAC_PI_4;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/matcap_plane.json";
pub const CONFIG_PATH_ENV: &str = "MATCAP_PLANE_CONFIG";
/// Keeps vertex and index counts well inside `u32`.
pub const MAX_SEGMENTS_PER_AXIS: f32 = 4096.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// 演示程序配置，所有字段都有默认值，配置文件只需写出要覆盖的部分。
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub surface: SurfaceConfig,
    pub shading: ShadingConfig,
    pub matcaps: MatcapConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub msaa_samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: f32,
    pub height: f32,
    /// 每个世界单位的分段数
    pub resolution: u32,
    pub noise_seed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub amplitude: f32,
    pub light_distance: f32,
    pub light_theta: f32,
    pub light_phi: f32,
    pub use_light: bool,
    pub rim_power: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcapConfig {
    /// Paths relative to the asset directory, in picker order.
    pub textures: Vec<String>,
    pub default_index: usize,
    pub preview_padding: f32,
    pub thumbnail_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub log_filter: String,
    pub frame_time: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Matcap Plane".to_string(),
            width: 1280.0,
            height: 720.0,
            msaa_samples: 4,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 5.0,
            height: 4.0,
            resolution: 12,
            noise_seed: 12345,
        }
    }
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            light_distance: 3.0,
            light_theta: FRAC_PI_4,
            light_phi: FRAC_PI_4,
            use_light: true,
            rim_power: 0.15,
        }
    }
}

impl Default for MatcapConfig {
    fn default() -> Self {
        Self {
            textures: (1..=7).map(|i| format!("matcaps/{i}.png")).collect(),
            default_index: 5,
            preview_padding: 3.0,
            thumbnail_size: 96,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_filter: "wgpu=error,naga=warn".to_string(),
            frame_time: false,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            surface: SurfaceConfig::default(),
            shading: ShadingConfig::default(),
            matcaps: MatcapConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DemoConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 读取配置：文件不存在时静默使用默认值；读取或校验失败时使用默认值并返回错误，由调用方记录。
    pub fn load_with_fallback(path: impl AsRef<Path>) -> (Self, Option<ConfigError>) {
        let path = path.as_ref();
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Config path from `MATCAP_PLANE_CONFIG`, or the default location.
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.surface.resolution == 0 {
            return Err(ConfigError::Invalid("surface.resolution must be at least 1".into()));
        }
        if !(self.surface.width > 0.0 && self.surface.height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "surface size must be positive, got {}x{}",
                self.surface.width, self.surface.height
            )));
        }
        let segments_x = self.surface.width * self.surface.resolution as f32;
        let segments_y = self.surface.height * self.surface.resolution as f32;
        if segments_x.round() > MAX_SEGMENTS_PER_AXIS || segments_y.round() > MAX_SEGMENTS_PER_AXIS {
            return Err(ConfigError::Invalid(format!(
                "surface has {}x{} segments, at most {} per axis",
                segments_x.round(),
                segments_y.round(),
                MAX_SEGMENTS_PER_AXIS
            )));
        }
        if !(self.window.width > 0.0 && self.window.height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.matcaps.textures.is_empty() {
            return Err(ConfigError::Invalid("matcaps.textures must not be empty".into()));
        }
        Ok(())
    }

    pub fn msaa(&self) -> Msaa {
        match self.window.msaa_samples {
            1 => Msaa::Off,
            2 => Msaa::Sample2,
            8 => Msaa::Sample8,
            _ => Msaa::Sample4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DemoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matcaps.textures.len(), 7);
        assert_eq!(config.matcaps.textures[0], "matcaps/1.png");
        assert_eq!(config.matcaps.default_index, 5);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: DemoConfig =
            serde_json::from_str(r#"{ "shading": { "amplitude": 0.5 } }"#).unwrap();
        assert_eq!(config.shading.amplitude, 0.5);
        assert_eq!(config.shading.light_distance, 3.0);
        assert_eq!(config.surface, SurfaceConfig::default());
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut config = DemoConfig::default();
        config.surface.resolution = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn segment_count_is_bounded() {
        let mut config = DemoConfig::default();
        config.surface.resolution = 819;
        assert!(config.validate().is_ok(), "5 x 819 = 4095 segments");
        config.surface.resolution = 820;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.surface.resolution = u32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_texture_list_is_rejected() {
        let mut config = DemoConfig::default();
        config.matcaps.textures.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_silently_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (config, error) = DemoConfig::load_with_fallback(dir.path().join("absent.json"));
        assert_eq!(config, DemoConfig::default());
        assert!(error.is_none());
    }

    #[test]
    fn msaa_falls_back_to_four_samples() {
        let mut config = DemoConfig::default();
        config.window.msaa_samples = 3;
        assert_eq!(config.msaa(), Msaa::Sample4);
        config.window.msaa_samples = 1;
        assert_eq!(config.msaa(), Msaa::Off);
    }
}
