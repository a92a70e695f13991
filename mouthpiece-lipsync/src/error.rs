//! Error types for the lip-sync pipeline
//!
//! Each pipeline stage fails with its own variant so callers can tell a
//! missing dependency apart from a bad source asset or an aligner failure.

use crate::resolver::ResolutionAttempt;
use std::path::PathBuf;
use thiserror::Error;

/// Lip-sync pipeline error type
#[derive(Debug, Error)]
pub enum LipSyncError {
    /// A required external tool cannot be invoked
    #[error("{tool} not found or not runnable ({detail}). {guidance}")]
    DependencyMissing {
        tool: String,
        detail: String,
        guidance: String,
    },

    /// Aligner binary could not be located at any candidate path
    #[error("{tool} binary not found. Tried paths: {}.\n{guidance}", format_attempts(.attempts))]
    ToolNotFound {
        tool: String,
        attempts: Vec<ResolutionAttempt>,
        guidance: String,
    },

    /// Source asset could not be transcoded
    #[error("Transcode failed for message {message_id} (command: {command}): {detail}")]
    TranscodeFailed {
        message_id: String,
        command: String,
        detail: String,
    },

    /// Aligner exited unsuccessfully (after the fallback, if one applied)
    #[error("Alignment failed for message {message_id} (command: {command}): {detail}")]
    AlignmentFailed {
        message_id: String,
        command: String,
        exit_code: Option<i32>,
        detail: String,
    },

    /// Aligner output could not be read as a mouth-cue document
    #[error("Invalid aligner output {}: {detail}", .path.display())]
    InvalidOutput { path: PathBuf, detail: String },

    /// Caller supplied an unusable request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// mouthpiece-common error
    #[error("Common error: {0}")]
    Common(#[from] mouthpiece_common::Error),
}

/// Result type for lip-sync operations
pub type LipSyncResult<T> = Result<T, LipSyncError>;

fn format_attempts(attempts: &[ResolutionAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LipSyncError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            LipSyncError::DependencyMissing { .. } => "DEPENDENCY_MISSING",
            LipSyncError::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            LipSyncError::TranscodeFailed { .. } => "TRANSCODE_FAILED",
            LipSyncError::AlignmentFailed { .. } => "ALIGNMENT_FAILED",
            LipSyncError::InvalidOutput { .. } => "INVALID_OUTPUT",
            LipSyncError::InvalidRequest(_) => "INVALID_REQUEST",
            LipSyncError::Io(_) => "IO_ERROR",
            LipSyncError::Common(_) => "COMMON_ERROR",
        }
    }
}
