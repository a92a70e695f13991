//! Per-message asset paths
//!
//! Every file a conversion touches is keyed by its message id, so requests for
//! distinct ids never share a path.

use crate::error::{LipSyncError, LipSyncResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Rejects ids that are empty or could escape the audio directory
    pub fn new(id: impl Into<String>) -> LipSyncResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LipSyncError::InvalidRequest(
                "message id must not be empty".to_string(),
            ));
        }
        if id.contains(['/', '\\']) || id.contains("..") {
            return Err(LipSyncError::InvalidRequest(format!(
                "message id '{}' must not contain path separators",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic file set for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAssets {
    audio_dir: PathBuf,
    message_id: MessageId,
}

impl MessageAssets {
    pub fn new(audio_dir: impl Into<PathBuf>, message_id: MessageId) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            message_id,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Source audio (`message_<id>.mp3`)
    pub fn source_audio(&self) -> PathBuf {
        self.file("mp3")
    }

    /// Transcoded aligner input (`message_<id>.wav`)
    pub fn aligner_input(&self) -> PathBuf {
        self.file("wav")
    }

    /// Aligner output (`message_<id>.json`)
    pub fn alignment_output(&self) -> PathBuf {
        self.file("json")
    }

    /// Transcript sidecar (`message_<id>.txt`)
    pub fn transcript(&self) -> PathBuf {
        self.file("txt")
    }

    fn file(&self, extension: &str) -> PathBuf {
        self.audio_dir
            .join(format!("message_{}.{}", self.message_id, extension))
    }
}

/// Render a path for use as a command-line argument
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_message_naming() {
        let assets = MessageAssets::new("audios", MessageId::new("42").unwrap());
        assert_eq!(assets.source_audio(), PathBuf::from("audios/message_42.mp3"));
        assert_eq!(assets.aligner_input(), PathBuf::from("audios/message_42.wav"));
        assert_eq!(assets.alignment_output(), PathBuf::from("audios/message_42.json"));
        assert_eq!(assets.transcript(), PathBuf::from("audios/message_42.txt"));
    }

    #[test]
    fn test_rejects_empty_id() {
        assert!(matches!(
            MessageId::new("   "),
            Err(LipSyncError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(MessageId::new("../etc/passwd").is_err());
        assert!(MessageId::new("a/b").is_err());
        assert!(MessageId::new("a\\b").is_err());
    }

    #[test]
    fn test_distinct_ids_never_share_paths() {
        let a = MessageAssets::new("audios", MessageId::new("1").unwrap());
        let b = MessageAssets::new("audios", MessageId::new("11").unwrap());
        assert_ne!(a.transcript(), b.transcript());
        assert_ne!(a.aligner_input(), b.aligner_input());
    }
}
