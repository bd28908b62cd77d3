use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const UI_STRINGS_PATH: &str = "ui_strings.json";

/// UI字符串配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiStrings {
    pub controls: ControlStrings,
    pub matcaps: MatcapStrings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlStrings {
    pub window_title: String,
    pub amplitude: String,
    pub light_section: String,
    pub distance: String,
    pub longitude: String,
    pub latitude: String,
    pub use_light: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcapStrings {
    pub title: String,
    pub loading: String,
    pub failed: String,
    pub empty: String,
}

impl Default for UiStrings {
    fn default() -> Self {
        Self {
            controls: ControlStrings::default(),
            matcaps: MatcapStrings::default(),
        }
    }
}

impl Default for ControlStrings {
    fn default() -> Self {
        Self {
            window_title: "Controls".to_string(),
            amplitude: "noise amplitude".to_string(),
            light_section: "Light Position".to_string(),
            distance: "Distance".to_string(),
            longitude: "Longitude".to_string(),
            latitude: "Latitude".to_string(),
            use_light: "Use light or Camera".to_string(),
        }
    }
}

impl Default for MatcapStrings {
    fn default() -> Self {
        Self {
            title: "Matcaps".to_string(),
            loading: "Loading matcaps...".to_string(),
            failed: "failed to load".to_string(),
            empty: "No matcap could be loaded".to_string(),
        }
    }
}

/// UI字符串管理器资源
#[derive(Resource, Debug, Clone, Default)]
pub struct UiStringManager {
    pub strings: UiStrings,
}

impl UiStringManager {
    pub fn new() -> Self {
        let path = Path::new(UI_STRINGS_PATH);
        if !path.exists() {
            return Self::default();
        }
        let strings = Self::load_strings(path).unwrap_or_else(|e| {
            warn!("Failed to load UI strings: {}, using defaults", e);
            UiStrings::default()
        });
        Self { strings }
    }

    pub fn load_strings(path: &Path) -> Result<UiStrings, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overrides_only_given_labels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ui_strings.json");
        std::fs::write(&path, r#"{ "controls": { "amplitude": "振幅" } }"#).expect("write");

        let strings = UiStringManager::load_strings(&path).expect("load");
        assert_eq!(strings.controls.amplitude, "振幅");
        assert_eq!(strings.controls.distance, "Distance");
        assert_eq!(strings.matcaps, MatcapStrings::default());
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ui_strings.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            UiStringManager::load_strings(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
