use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::BlockSize;

/// Which block-read primitive workers use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    /// Read in-process with a block-sized buffer
    #[default]
    Native,
    /// Spawn `dd` with the block size and discard its output
    Dd,
}

/// How the final summary is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON summary object
    Json,
}

/// Raw, unvalidated settings as merged from every configuration layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "text_or_bytes")]
    pub block_size: String,
    pub jobs: usize,
    pub skip_errors: bool,
    pub reader: ReaderKind,
    pub format: OutputFormat,
    /// How long cancellation waits for running workers before abandoning them
    pub teardown_grace_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_size: "1M".to_string(),
            jobs: 1,
            skip_errors: false,
            reader: ReaderKind::Native,
            format: OutputFormat::Text,
            teardown_grace_ms: 5000,
        }
    }
}

/// Accept `block_size = "64K"` as well as a bare byte count such as `4096`
///
/// Env values and TOML integers both arrive as numbers for the plain-digit form.
fn text_or_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Bytes(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Bytes(bytes) => bytes.to_string(),
    })
}

/// Values given explicitly on the command line; `None` leaves lower layers alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_errors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader: Option<ReaderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

/// Validated configuration, immutable for the run's duration
#[derive(Debug, Clone)]
pub struct Configuration {
    pub block_size: BlockSize,
    pub jobs: NonZeroUsize,
    pub skip_errors: bool,
    pub reader: ReaderKind,
    pub format: OutputFormat,
    pub teardown_grace: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            block_size: BlockSize::default(),
            jobs: NonZeroUsize::MIN,
            skip_errors: false,
            reader: ReaderKind::Native,
            format: OutputFormat::Text,
            teardown_grace: Duration::from_millis(5000),
        }
    }
}

impl Configuration {
    /// Merge defaults, config files, `FILEWARM_*` env vars and CLI overrides, then validate
    pub fn load(custom_config: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let figment = Self::figment(custom_config)?.merge(Serialized::defaults(overrides));
        let settings: Settings = figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))?;
        Self::try_from(settings)
    }

    fn figment(custom_config: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(custom_path) = custom_config {
            // An explicit file must exist; the implicit ones are optional
            if !custom_path.is_file() {
                return Err(ConfigError::MissingFile {
                    path: custom_path.to_path_buf(),
                });
            }
            figment = merge_file(figment, custom_path);
        } else {
            figment = merge_file(figment, &Self::user_config_path());
            figment = merge_file(figment, Path::new("filewarm.toml"));
        }

        Ok(figment.merge(Env::prefixed("FILEWARM_")))
    }

    fn user_config_path() -> PathBuf {
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config/filewarm/config.toml"),
            Err(_) => PathBuf::from("~/.config/filewarm/config.toml"),
        }
    }
}

/// Pick the provider from the file extension, defaulting to TOML
fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

impl TryFrom<Settings> for Configuration {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let block_size = settings.block_size.parse::<BlockSize>()?;
        let jobs = NonZeroUsize::new(settings.jobs).ok_or(ConfigError::InvalidJobCount {
            count: settings.jobs,
        })?;

        Ok(Self {
            block_size,
            jobs,
            skip_errors: settings.skip_errors,
            reader: settings.reader,
            format: settings.format,
            teardown_grace: Duration::from_millis(settings.teardown_grace_ms),
        })
    }
}
