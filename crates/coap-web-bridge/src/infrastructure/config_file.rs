//! Optional TOML configuration file for the bridge.
//!
//! Every setting the command line accepts can also come from a file passed
//! with `--config` (or `BRIDGE_CONFIG`).  Precedence, highest first:
//!
//! 1. command-line flag / environment variable
//! 2. value in this file
//! 3. built-in default
//!
//! ```toml
//! [http]
//! bind = "127.0.0.1"
//! port = 8080
//! public_dir = "./public"
//!
//! [device]
//! host = "192.168.4.1"
//! port = 5683
//! path = "/led"
//! timeout_ms = 2500
//! ```
//!
//! Every field is optional, so a file only needs the values it overrides.
//! Unknown keys are rejected so that a typo does not silently fall back to a
//! default.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub http: HttpSection,
    pub device: DeviceSection,
}

/// `[http]`: the browser-facing listener.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    /// IP address to bind, e.g. `"0.0.0.0"`.
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Directory of static browser assets.
    pub public_dir: Option<PathBuf>,
}

/// `[device]`: the CoAP device being controlled.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub timeout_ms: Option<u64>,
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses config file content.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed, has wrongly
/// typed values, or contains unknown keys.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Reads and parses the config file at `path`.
///
/// Unlike a default-location config, an explicitly named file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its content is invalid.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
