//! Integration tests for config file loading and graceful degradation
//!
//! Covers:
//! - Missing config file → defaults, no error
//! - Partial config file → defaults for unspecified keys
//! - Malformed config file → parse error surfaced to the caller

use mouthpiece_common::config::{load_config, ConfigSource, LipSyncConfig};
use mouthpiece_common::Error;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_no_config_path_uses_defaults() {
    let (config, source) = load_config(None).unwrap();
    assert_eq!(config, LipSyncConfig::default());
    assert_eq!(source, ConfigSource::Defaults);
    assert!(source.is_fallback());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("does-not-exist.toml");

    let (config, source) = load_config(Some(path.as_path())).unwrap();
    assert_eq!(config, LipSyncConfig::default());
    // Missing file is reported distinctly so the caller can warn about it
    assert_eq!(source, ConfigSource::MissingFile(path.clone()));
    assert!(source.is_fallback());
}

#[test]
fn test_full_config_file_loaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
audio_dir = "/var/lib/avatar/audios"
transcoder = "/opt/ffmpeg/bin/ffmpeg"

[aligner]
tool_name = "rhubarb"
override_env = "AVATAR_RHUBARB"
output_format = "json"
recovery_markers = ["pocketsphinx"]

[logging]
level = "debug"
log_file = "/tmp/mouthpiece.log"
"#,
    )
    .unwrap();

    let (config, source) = load_config(Some(path.as_path())).unwrap();

    assert_eq!(source, ConfigSource::File(path.clone()));
    assert!(!source.is_fallback());
    assert_eq!(config.audio_dir, PathBuf::from("/var/lib/avatar/audios"));
    assert_eq!(config.transcoder, "/opt/ffmpeg/bin/ffmpeg");
    assert_eq!(config.aligner.override_env, "AVATAR_RHUBARB");
    assert_eq!(config.aligner.recovery_markers, vec!["pocketsphinx".to_string()]);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.log_file, Some(PathBuf::from("/tmp/mouthpiece.log")));
}

#[test]
fn test_malformed_config_file_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "audio_dir = [unterminated").unwrap();

    let result = load_config(Some(path.as_path()));
    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
fn test_wrong_type_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[aligner]\nrecovery_markers = \"pocketsphinx\"\n").unwrap();

    assert!(load_config(Some(path.as_path())).is_err());
}

#[test]
fn test_empty_transcoder_rejected_on_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "transcoder = \"\"\n").unwrap();

    let err = load_config(Some(path.as_path())).unwrap_err();
    assert!(err.to_string().contains("transcoder"));
}
