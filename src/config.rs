//! Runtime settings.
//!
//! Defaults, then an optional TOML file named by `DEALER_PRINT_CONFIG`, then
//! `DEALER_PRINT_*` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::capture::CaptureEngine;
use crate::images::ImagePolicy;

pub const CONFIG_ENV: &str = "DEALER_PRINT_CONFIG";
const ENV_PREFIX: &str = "DEALER_PRINT_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value `{value}` for {key}")]
    Env { key: String, value: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bind: SocketAddr,
    pub settle_ms: u64,
    pub image_timeout_ms: u64,
    pub capture_scale: f32,
    /// TTF/OTF used for measurement and glyph rasterization
    pub font_path: Option<PathBuf>,
    pub download_dir: PathBuf,
    pub log_filter: String,
    /// Directories the HTTP service may read logo files from
    pub image_roots: Vec<PathBuf>,
    /// Hosts the HTTP service may fetch logo URLs from
    pub image_hosts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: SocketAddr::from(([127, 0, 0, 1], 3001)),
            settle_ms: 300,
            image_timeout_ms: 15_000,
            capture_scale: 2.0,
            font_path: None,
            download_dir: PathBuf::from("downloads"),
            log_filter: "info".to_string(),
            image_roots: Vec::new(),
            image_hosts: Vec::new(),
        }
    }
}

impl Settings {
    /// Load from the process environment.
    pub fn load() -> Result<Settings, ConfigError> {
        let mut settings = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Settings::from_file(Path::new(&path))?,
            None => Settings::default(),
        };
        settings.apply_env(std::env::vars())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Settings::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Settings, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DEALER_PRINT_*` overrides. Unrelated variables are ignored.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let bad = || ConfigError::Env { key: key.clone(), value: value.clone() };
            match field {
                "BIND" => self.bind = value.parse().map_err(|_| bad())?,
                "SETTLE_MS" => self.settle_ms = value.parse().map_err(|_| bad())?,
                "IMAGE_TIMEOUT_MS" => self.image_timeout_ms = value.parse().map_err(|_| bad())?,
                "CAPTURE_SCALE" => {
                    self.capture_scale = value
                        .parse()
                        .ok()
                        .filter(|s: &f32| s.is_finite() && *s > 0.0)
                        .ok_or_else(bad)?
                }
                "FONT_PATH" => self.font_path = Some(PathBuf::from(&value)).filter(|p| !p.as_os_str().is_empty()),
                "DOWNLOAD_DIR" => self.download_dir = PathBuf::from(&value),
                "LOG_FILTER" => self.log_filter = value.clone(),
                "IMAGE_ROOTS" => self.image_roots = split_list(&value).map(PathBuf::from).collect(),
                "IMAGE_HOSTS" => self.image_hosts = split_list(&value).map(str::to_string).collect(),
                // DEALER_PRINT_CONFIG names the file itself
                "CONFIG" => {}
                _ => tracing::warn!(key = %key, "ignoring unknown setting"),
            }
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    /// Image sources a request-supplied record may reference.
    pub fn image_policy(&self) -> ImagePolicy {
        ImagePolicy::Restricted { roots: self.image_roots.clone(), hosts: self.image_hosts.clone() }
    }

    /// A capture engine using the built-in rasterizer and these timings.
    pub fn capture_engine(&self) -> CaptureEngine {
        CaptureEngine::default()
            .with_settle(self.settle())
            .with_image_timeout(self.image_timeout())
            .with_scale(self.capture_scale)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
