//! Aligner execution with a single degraded retry
//!
//! Execution is an explicit state machine:
//!
//! ```text
//! Running ──ok──────────────────────────────▶ Succeeded
//!    │
//!    ├─fail (recoverable, phonetic)──▶ Retrying ──ok──▶ Succeeded
//!    │                                    └─fail─────▶ Failed (retry error)
//!    └─fail (anything else)──────────────────────────▶ Failed (original error)
//! ```
//!
//! At most two aligner invocations happen per command.

use crate::error::{LipSyncError, LipSyncResult};
use crate::process::{CommandRunner, PathProbe};
use crate::strategy::AlignmentCommand;
use mouthpiece_common::config::DEFAULT_RECOVERY_MARKERS;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Why a failure is considered recoverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverableCause {
    /// Speech-recognition model or dictionary is missing or misconfigured
    MissingSpeechModel,
}

/// Classification of a failed aligner invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClassification {
    Recoverable(RecoverableCause),
    Fatal,
}

/// Decides which aligner failures earn a retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    markers: Vec<String>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECOVERY_MARKERS)
    }
}

impl RecoveryPolicy {
    /// Markers are matched case-insensitively as substrings; blank ones are ignored
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// First marker found in `diagnostic`, if any
    pub fn matching_marker(&self, diagnostic: &str) -> Option<&str> {
        let haystack = diagnostic.to_lowercase();
        self.markers
            .iter()
            .find(|m| haystack.contains(m.as_str()))
            .map(String::as_str)
    }

    /// Only phonetic commands can fail recoverably; the other strategies
    /// never depend on the speech-recognition resource.
    pub fn classify(&self, diagnostic: &str, command: &AlignmentCommand) -> FailureClassification {
        if !command.uses_phonetic() {
            return FailureClassification::Fatal;
        }
        match self.matching_marker(diagnostic) {
            Some(_) => FailureClassification::Recoverable(RecoverableCause::MissingSpeechModel),
            None => FailureClassification::Fatal,
        }
    }
}

/// Successful alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentOutcome {
    /// Aligner output file (exists when this value is produced)
    pub output: PathBuf,
    /// Strategy of the invocation that succeeded
    pub strategy: String,
    /// Command line of the invocation that succeeded
    pub command_line: String,
    /// Number of aligner invocations (1 or 2)
    pub invocations: u32,
    /// True if the fallback retry produced the result
    pub retried: bool,
}

/// Executor state
#[derive(Debug)]
pub enum AlignmentState {
    /// First invocation pending
    Running(AlignmentCommand),
    /// First invocation failed recoverably; degraded command pending
    Retrying {
        command: AlignmentCommand,
        cause: RecoverableCause,
    },
    Succeeded(AlignmentOutcome),
    Failed(LipSyncError),
}

impl AlignmentState {
    pub fn name(&self) -> &'static str {
        match self {
            AlignmentState::Running(_) => "running",
            AlignmentState::Retrying { .. } => "retrying",
            AlignmentState::Succeeded(_) => "succeeded",
            AlignmentState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlignmentState::Succeeded(_) | AlignmentState::Failed(_))
    }
}

/// Failure details from one invocation
#[derive(Debug)]
struct AttemptFailure {
    exit_code: Option<i32>,
    diagnostic: String,
}

impl AttemptFailure {
    fn into_error(self, command: &AlignmentCommand) -> LipSyncError {
        LipSyncError::AlignmentFailed {
            message_id: command.message_id().to_string(),
            command: command.command_line(),
            exit_code: self.exit_code,
            detail: self.diagnostic,
        }
    }
}

/// Runs aligner commands and applies the recovery policy
pub struct AlignmentExecutor<'a> {
    runner: &'a dyn CommandRunner,
    probe: &'a dyn PathProbe,
    policy: &'a RecoveryPolicy,
}

impl<'a> AlignmentExecutor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        probe: &'a dyn PathProbe,
        policy: &'a RecoveryPolicy,
    ) -> Self {
        Self {
            runner,
            probe,
            policy,
        }
    }

    /// Drive the state machine from `Running` to a terminal state
    pub async fn execute(&self, command: AlignmentCommand) -> LipSyncResult<AlignmentOutcome> {
        let mut state = AlignmentState::Running(command);
        loop {
            state = match state {
                AlignmentState::Succeeded(outcome) => return Ok(outcome),
                AlignmentState::Failed(err) => return Err(err),
                pending => self.step(pending).await,
            };
        }
    }

    /// Perform one transition; terminal states are returned unchanged
    pub async fn step(&self, state: AlignmentState) -> AlignmentState {
        match state {
            AlignmentState::Running(command) => match self.attempt(&command, 1).await {
                Ok(()) => AlignmentState::Succeeded(outcome(&command, 1)),
                Err(failure) => match self.policy.classify(&failure.diagnostic, &command) {
                    FailureClassification::Recoverable(cause) => {
                        match command.without_phonetic() {
                            Some(degraded) => {
                                warn!(
                                    message_id = command.message_id(),
                                    cause = ?cause,
                                    diagnostic = %failure.diagnostic,
                                    "Aligner failed due to missing speech-recognition resources; \
                                     retrying without phonetic recognizer"
                                );
                                AlignmentState::Retrying {
                                    command: degraded,
                                    cause,
                                }
                            }
                            None => AlignmentState::Failed(failure.into_error(&command)),
                        }
                    }
                    FailureClassification::Fatal => {
                        AlignmentState::Failed(failure.into_error(&command))
                    }
                },
            },
            AlignmentState::Retrying { command, cause } => {
                match self.attempt(&command, 2).await {
                    Ok(()) => {
                        info!(
                            message_id = command.message_id(),
                            cause = ?cause,
                            "Aligner fallback succeeded"
                        );
                        AlignmentState::Succeeded(outcome(&command, 2))
                    }
                    Err(failure) => {
                        error!(
                            message_id = command.message_id(),
                            diagnostic = %failure.diagnostic,
                            "Aligner fallback also failed"
                        );
                        AlignmentState::Failed(failure.into_error(&command))
                    }
                }
            }
            terminal => terminal,
        }
    }

    async fn attempt(&self, command: &AlignmentCommand, attempt: u32) -> Result<(), AttemptFailure> {
        let invocation = command.to_invocation();
        info!(
            message_id = command.message_id(),
            attempt,
            strategy = %command.strategy(),
            "Running aligner command: {}",
            command.command_line()
        );

        let output = self.runner.run(&invocation).await.map_err(|e| AttemptFailure {
            exit_code: None,
            diagnostic: format!("could not start aligner: {}", e),
        })?;

        if !output.success() {
            return Err(AttemptFailure {
                exit_code: output.code,
                diagnostic: output.diagnostic(),
            });
        }

        if !self.probe.exists(command.output()) {
            return Err(AttemptFailure {
                exit_code: output.code,
                diagnostic: format!(
                    "aligner exited successfully but {} was not created",
                    command.output().display()
                ),
            });
        }

        Ok(())
    }
}

fn outcome(command: &AlignmentCommand, invocations: u32) -> AlignmentOutcome {
    AlignmentOutcome {
        output: command.output().to_path_buf(),
        strategy: command.strategy().label().to_string(),
        command_line: command.command_line(),
        invocations,
        retried: invocations > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MessageAssets, MessageId};
    use crate::resolver::ResolvedToolPath;
    use crate::strategy::AlignmentStrategy;
    use std::path::Path;

    fn command(strategy: AlignmentStrategy) -> AlignmentCommand {
        let assets = MessageAssets::new("audios", MessageId::new("7").unwrap());
        AlignmentCommand::new(
            ResolvedToolPath::new_unchecked("/usr/bin/rhubarb"),
            &assets,
            "json",
            strategy,
        )
    }

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let policy = RecoveryPolicy::default();
        let cmd = command(AlignmentStrategy::Phonetic);
        assert_eq!(
            policy.classify("Error: POCKETSPHINX could not load acoustic model", &cmd),
            FailureClassification::Recoverable(RecoverableCause::MissingSpeechModel)
        );
        assert_eq!(
            policy.classify("missing CMUdict file", &cmd),
            FailureClassification::Recoverable(RecoverableCause::MissingSpeechModel)
        );
        assert_eq!(
            policy.classify("Speech Recognition failed", &cmd),
            FailureClassification::Recoverable(RecoverableCause::MissingSpeechModel)
        );
    }

    #[test]
    fn test_unrelated_diagnostic_is_fatal() {
        let policy = RecoveryPolicy::default();
        let cmd = command(AlignmentStrategy::Phonetic);
        assert_eq!(
            policy.classify("Unsupported WAVE format", &cmd),
            FailureClassification::Fatal
        );
    }

    #[test]
    fn test_non_phonetic_commands_are_never_recoverable() {
        let policy = RecoveryPolicy::default();
        let guided = command(AlignmentStrategy::TranscriptGuided {
            transcript: Path::new("audios/message_7.txt").to_path_buf(),
        });
        let standard = command(AlignmentStrategy::Standard);
        assert_eq!(policy.classify("PocketSphinx error", &guided), FailureClassification::Fatal);
        assert_eq!(policy.classify("PocketSphinx error", &standard), FailureClassification::Fatal);
    }

    #[test]
    fn test_custom_markers_normalized() {
        let policy = RecoveryPolicy::new(["  Acoustic Model ", ""]);
        assert_eq!(policy.markers(), &["acoustic model".to_string()]);
        assert_eq!(policy.matching_marker("no ACOUSTIC MODEL found"), Some("acoustic model"));
        assert_eq!(policy.matching_marker("pocketsphinx"), None);
    }

    #[test]
    fn test_state_names_and_terminality() {
        let running = AlignmentState::Running(command(AlignmentStrategy::Phonetic));
        assert_eq!(running.name(), "running");
        assert!(!running.is_terminal());

        let failed = AlignmentState::Failed(LipSyncError::InvalidRequest("x".to_string()));
        assert_eq!(failed.name(), "failed");
        assert!(failed.is_terminal());
    }
}
