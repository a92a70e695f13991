//! Configuration loading and config file resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MOUTHPIECE_CONFIG";

/// Default directory holding per-message audio assets
pub const DEFAULT_AUDIO_DIR: &str = "audios";

/// Default transcoder program
pub const DEFAULT_TRANSCODER: &str = "ffmpeg";

/// Default aligner tool name
pub const DEFAULT_ALIGNER_TOOL: &str = "rhubarb";

/// Default environment variable overriding the aligner location
pub const DEFAULT_ALIGNER_OVERRIDE_ENV: &str = "RHUBARB_PATH";

/// Diagnostic fragments that identify a missing speech-recognition resource
pub const DEFAULT_RECOVERY_MARKERS: [&str; 3] = ["pocketsphinx", "cmudict", "speech recognition"];

/// Top-level configuration, loaded from `config.toml`
///
/// Every field has a default so a partial (or absent) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Directory containing `message_<id>.*` assets
    pub audio_dir: PathBuf,
    /// Transcoder program name or path
    pub transcoder: String,
    /// Aligner settings
    pub aligner: AlignerConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from(DEFAULT_AUDIO_DIR),
            transcoder: DEFAULT_TRANSCODER.to_string(),
            aligner: AlignerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Aligner (lip-sync tool) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Executable name, used for `./bin/<tool>` and the PATH lookup
    pub tool_name: String,
    /// Environment variable that may point at the executable
    pub override_env: String,
    /// Value passed to the aligner's `-f` flag
    pub output_format: String,
    /// Case-insensitive diagnostic fragments that allow a non-phonetic retry
    pub recovery_markers: Vec<String>,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_ALIGNER_TOOL.to_string(),
            override_env: DEFAULT_ALIGNER_OVERRIDE_ENV.to_string(),
            output_format: "json".to_string(),
            recovery_markers: DEFAULT_RECOVERY_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Optional log file (appended, no ANSI colors)
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Config file resolution following priority order:
/// 1. Explicit path (command-line argument or `MOUTHPIECE_CONFIG`)
/// 2. User config directory (`<config_dir>/mouthpiece/config.toml`) if present
/// 3. None (compiled defaults)
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit path, even if it does not exist yet
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: platform config directory
    default_config_file().filter(|path| path.exists())
}

/// Platform config file location (may not exist)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mouthpiece").join("config.toml"))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// A config path was resolved but the file does not exist
    MissingFile(PathBuf),
    /// No config path was resolved
    Defaults,
}

impl ConfigSource {
    /// True when compiled defaults were used
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ConfigSource::File(_))
    }

    /// Report the source through `tracing`
    ///
    /// Loading happens before the subscriber exists, so callers log the
    /// source once tracing is initialized.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                info!(config_file = %path.display(), "Loaded configuration")
            }
            ConfigSource::MissingFile(path) => warn!(
                config_file = %path.display(),
                "Config file not found, using compiled defaults"
            ),
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
        }
    }
}

/// Load configuration from a resolved path
///
/// A missing file is not fatal: defaults are used and the returned
/// [`ConfigSource`] records the fallback. A file that exists but cannot be
/// read or parsed is an error.
pub fn load_config(path: Option<&Path>) -> Result<(LipSyncConfig, ConfigSource)> {
    let Some(path) = path else {
        return Ok((LipSyncConfig::default(), ConfigSource::Defaults));
    };

    if !path.exists() {
        return Ok((
            LipSyncConfig::default(),
            ConfigSource::MissingFile(path.to_path_buf()),
        ));
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Parse and validate a TOML configuration document
pub fn parse_config(content: &str) -> Result<LipSyncConfig> {
    let config: LipSyncConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl LipSyncConfig {
    /// Reject values that would produce unusable commands
    pub fn validate(&self) -> Result<()> {
        if self.transcoder.trim().is_empty() {
            return Err(Error::Config("transcoder must not be empty".to_string()));
        }
        if self.aligner.tool_name.trim().is_empty() {
            return Err(Error::Config("aligner.tool_name must not be empty".to_string()));
        }
        if self.aligner.override_env.trim().is_empty() {
            return Err(Error::Config(
                "aligner.override_env must not be empty".to_string(),
            ));
        }
        if self.aligner.output_format.trim().is_empty() {
            return Err(Error::Config(
                "aligner.output_format must not be empty".to_string(),
            ));
        }
        if self.audio_dir.as_os_str().is_empty() {
            return Err(Error::Config("audio_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_rhubarb_layout() {
        let config = LipSyncConfig::default();
        assert_eq!(config.audio_dir, PathBuf::from("audios"));
        assert_eq!(config.transcoder, "ffmpeg");
        assert_eq!(config.aligner.tool_name, "rhubarb");
        assert_eq!(config.aligner.override_env, "RHUBARB_PATH");
        assert_eq!(config.aligner.recovery_markers.len(), 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = parse_config(
            r#"
            audio_dir = "/srv/audio"

            [aligner]
            tool_name = "rhubarb-1.13"
            "#,
        )
        .unwrap();

        assert_eq!(config.audio_dir, PathBuf::from("/srv/audio"));
        assert_eq!(config.aligner.tool_name, "rhubarb-1.13");
        assert_eq!(config.aligner.override_env, "RHUBARB_PATH");
        assert_eq!(config.transcoder, "ffmpeg");
    }

    #[test]
    fn test_empty_tool_name_rejected() {
        let result = parse_config(
            r#"
            [aligner]
            tool_name = "  "
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/mouthpiece-explicit.toml");
        assert_eq!(resolve_config_path(Some(explicit.as_path())), Some(explicit));
    }
}
