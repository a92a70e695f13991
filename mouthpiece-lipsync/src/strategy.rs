//! Alignment strategy selection and aligner command construction

use crate::assets::{path_arg, MessageAssets};
use crate::process::{quote, Invocation};
use crate::resolver::ResolvedToolPath;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Aligner flag selecting the recognizer
pub const RECOGNIZER_FLAG: &str = "-r";
/// Recognizer value for phonetic-guess alignment
pub const PHONETIC_RECOGNIZER: &str = "phonetic";
/// Aligner flag naming a transcript file
pub const TRANSCRIPT_FLAG: &str = "-t";

/// How the aligner is asked to align the audio
///
/// A transcript reference and the phonetic recognizer can never appear in
/// the same command: each variant carries at most one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentStrategy {
    /// Fast guess from audio alone (`-r phonetic`)
    Phonetic,
    /// Align against a transcript file (`-t <file>`)
    TranscriptGuided { transcript: PathBuf },
    /// Aligner's default recognizer, no extra flags
    Standard,
}

impl AlignmentStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            AlignmentStrategy::Phonetic => "phonetic",
            AlignmentStrategy::TranscriptGuided { .. } => "transcript",
            AlignmentStrategy::Standard => "standard",
        }
    }

    pub fn is_phonetic(&self) -> bool {
        matches!(self, AlignmentStrategy::Phonetic)
    }
}

impl fmt::Display for AlignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fully constructed aligner invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentCommand {
    message_id: String,
    binary: ResolvedToolPath,
    output_format: String,
    output: PathBuf,
    input: PathBuf,
    strategy: AlignmentStrategy,
}

impl AlignmentCommand {
    pub fn new(
        binary: ResolvedToolPath,
        assets: &MessageAssets,
        output_format: impl Into<String>,
        strategy: AlignmentStrategy,
    ) -> Self {
        Self {
            message_id: assets.message_id().to_string(),
            binary,
            output_format: output_format.into(),
            output: assets.alignment_output(),
            input: assets.aligner_input(),
            strategy,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn binary(&self) -> &ResolvedToolPath {
        &self.binary
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn strategy(&self) -> &AlignmentStrategy {
        &self.strategy
    }

    pub fn uses_phonetic(&self) -> bool {
        self.strategy.is_phonetic()
    }

    pub fn transcript(&self) -> Option<&Path> {
        match &self.strategy {
            AlignmentStrategy::TranscriptGuided { transcript } => Some(transcript),
            _ => None,
        }
    }

    /// Same command with the phonetic recognizer dropped
    ///
    /// Returns `None` when the command is not phonetic, since there is
    /// nothing to degrade.
    pub fn without_phonetic(&self) -> Option<Self> {
        if !self.uses_phonetic() {
            return None;
        }
        Some(Self {
            strategy: AlignmentStrategy::Standard,
            ..self.clone()
        })
    }

    /// Argument vector handed to the OS
    pub fn to_invocation(&self) -> Invocation {
        let invocation = Invocation::new(path_arg(self.binary.as_path()))
            .arg("-f")
            .arg(&self.output_format)
            .arg("-o")
            .arg(path_arg(&self.output))
            .arg(path_arg(&self.input));

        match &self.strategy {
            AlignmentStrategy::Phonetic => invocation.arg(RECOGNIZER_FLAG).arg(PHONETIC_RECOGNIZER),
            AlignmentStrategy::TranscriptGuided { transcript } => {
                invocation.arg(TRANSCRIPT_FLAG).arg(path_arg(transcript))
            }
            AlignmentStrategy::Standard => invocation,
        }
    }

    /// Human-readable command line for logs and error messages
    ///
    /// The transcript path is always quoted.
    pub fn command_line(&self) -> String {
        match &self.strategy {
            AlignmentStrategy::TranscriptGuided { transcript } => {
                let base = Self {
                    strategy: AlignmentStrategy::Standard,
                    ..self.clone()
                };
                format!(
                    "{} {} {}",
                    base.to_invocation(),
                    TRANSCRIPT_FLAG,
                    quote(&path_arg(transcript))
                )
            }
            _ => self.to_invocation().to_string(),
        }
    }
}

impl fmt::Display for AlignmentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Transcript usable for guided alignment, if any
///
/// Text that is empty after trimming counts as absent.
pub fn usable_transcript(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Picks the alignment strategy for a request
#[derive(Debug, Clone)]
pub struct StrategySelector {
    output_format: String,
}

impl StrategySelector {
    pub fn new(output_format: impl Into<String>) -> Self {
        Self {
            output_format: output_format.into(),
        }
    }

    /// Build the aligner command for `assets`
    ///
    /// With usable transcript text, the text is written verbatim to the
    /// sidecar file and the command references it. If that write fails the
    /// command uses the aligner's standard recognizer instead: the caller
    /// asked for transcript guidance, so phonetic mode is still not used.
    /// Without text, the phonetic recognizer is requested.
    pub async fn select(
        &self,
        binary: &ResolvedToolPath,
        assets: &MessageAssets,
        transcript: Option<&str>,
    ) -> AlignmentCommand {
        let strategy = match usable_transcript(transcript) {
            Some(text) => {
                let path = assets.transcript();
                match tokio::fs::write(&path, text).await {
                    Ok(()) => {
                        debug!(transcript = %path.display(), "Transcript sidecar written");
                        AlignmentStrategy::TranscriptGuided { transcript: path }
                    }
                    Err(e) => {
                        warn!(
                            message_id = %assets.message_id(),
                            transcript = %path.display(),
                            error = %e,
                            "Could not write transcript, aligning without it"
                        );
                        AlignmentStrategy::Standard
                    }
                }
            }
            None => AlignmentStrategy::Phonetic,
        };

        AlignmentCommand::new(binary.clone(), assets, &self.output_format, strategy)
    }
}
