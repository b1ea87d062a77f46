use crate::scene::{default_sections, LightRig, Section};
use std::path::{Path, PathBuf};

/// The remote demo model shown when no asset location is configured.
pub const DEFAULT_MODEL_URL: &str = "https://threejs.org/examples/models/gltf/LittlestTokyo.glb";

pub const CONFIG_ENV: &str = "HOUSE_VIEW_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "House View".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Where the model comes from and how it is placed in the world.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub location: String,
    pub scale: f32,
    pub position: [f32; 3],
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_MODEL_URL.to_string(),
            scale: 0.1,
            position: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 100.0],
            target: [0.0, 0.0, 0.0],
            damping_factor: 0.05,
            min_distance: 0.0,
            max_distance: f32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Straight-alpha clear colour; the default is fully transparent.
    pub clear_color: [f32; 4],
    pub max_pixel_ratio: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            max_pixel_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub tooltip_offset_px: f32,
    pub show_hint: bool,
    pub hint: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tooltip_offset_px: 12.0,
            show_hint: true,
            hint: "Drag to rotate · Scroll to zoom · Click a part to open a section".to_string(),
        }
    }
}

/// Everything the viewer reads at startup. Every field has a default, so a
/// partial JSON file only overrides what it names.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub asset: AssetConfig,
    pub camera: CameraConfig,
    pub lights: LightRig,
    pub render: RenderConfig,
    pub overlay: OverlayConfig,
    pub sections: Vec<Section>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            asset: AssetConfig::default(),
            camera: CameraConfig::default(),
            lights: LightRig::default(),
            render: RenderConfig::default(),
            overlay: OverlayConfig::default(),
            sections: default_sections(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let config = Self::load(path)?;
                log::info!("Loaded viewer config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}

/// First CLI argument wins, then the environment variable.
pub fn config_path_from(args: &[String], env_value: Option<String>) -> Option<PathBuf> {
    args.get(1)
        .cloned()
        .or(env_value)
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}
