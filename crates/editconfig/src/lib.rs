//! Editor configuration loaded from `editor.toml`.
//!
//! ```toml
//! version = 1
//!
//! [history]
//! limit = 10
//!
//! [animation]
//! duration = "300ms"
//! curve = "ease-in-out"
//!
//! [render]
//! device_pixel_ratio = 2.0
//! backend = "auto"
//! power = "low"
//!
//! [export]
//! format = "jpeg"
//! jpeg_quality = 90
//! ```
//!
//! Every table is optional; missing values fall back to [`EditorConfig::default`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use renderer::{BackendPreference, ExportFormat, GpuPowerPreference, RendererOptions};
use scheduler::EasingCurve;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_FILE_NAME: &str = "editor.toml";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_ANIMATION: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EditorConfig {
    pub version: u32,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept, current one included.
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AnimationConfig {
    #[serde(
        default = "default_animation_duration",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub duration: Duration,
    #[serde(default)]
    pub curve: EasingCurve,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration: default_animation_duration(),
            curve: EasingCurve::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub device_pixel_ratio: f32,
    pub backend: BackendPreference,
    pub power: GpuPowerPreference,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            backend: BackendPreference::Auto,
            power: GpuPowerPreference::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub jpeg_quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let options = RendererOptions::default();
        Self {
            format: options.export_format,
            jpeg_quality: options.jpeg_quality,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: 1,
            history: HistoryConfig::default(),
            animation: AnimationConfig::default(),
            render: RenderConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

fn default_animation_duration() -> Duration {
    Duration::from_millis(300)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("duration {v} is out of range: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl EditorConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EditorConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded editor config");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no editor config found; using defaults");
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            backend: self.render.backend,
            power: self.render.power,
            export_format: self.export.format,
            jpeg_quality: self.export.jpeg_quality,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.history.limit == 0 {
            return Err(ConfigError::Invalid(
                "history.limit must be at least 1".into(),
            ));
        }

        if self.animation.duration > MAX_ANIMATION {
            return Err(ConfigError::Invalid(format!(
                "animation.duration must be at most {}",
                humantime::format_duration(MAX_ANIMATION)
            )));
        }

        let dpr = self.render.device_pixel_ratio;
        if !dpr.is_finite() || dpr <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "render.device_pixel_ratio must be > 0 (got {dpr})"
            )));
        }

        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "export.jpeg_quality must be within 1-100 (got {})",
                self.export.jpeg_quality
            )));
        }

        Ok(())
    }
}
