//! End-to-end conversion pipeline
//!
//! Dependency check → transcode → strategy selection → aligner execution.
//! Every stage is awaited before the next one starts. Requests for distinct
//! message ids touch disjoint files and can run concurrently; requests for the
//! same id must be serialized by the caller.

use crate::assets::{MessageAssets, MessageId};
use crate::error::LipSyncResult;
use crate::executor::{AlignmentExecutor, AlignmentOutcome, RecoveryPolicy};
use crate::process::{CommandRunner, LocalFs, PathProbe, SystemRunner};
use crate::resolver::{ExecutableResolver, ResolvedToolPath, ResolverConfig};
use crate::strategy::StrategySelector;
use crate::transcode::TranscodeStage;
use crate::verifier::DependencyVerifier;
use chrono::{DateTime, Utc};
use mouthpiece_common::LipSyncConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// One conversion job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    message_id: MessageId,
    transcript: Option<String>,
}

impl ConversionRequest {
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            transcript: None,
        }
    }

    /// Validate a raw message id
    pub fn for_message(message_id: impl Into<String>) -> LipSyncResult<Self> {
        Ok(Self::new(MessageId::new(message_id)?))
    }

    pub fn with_transcript(mut self, text: impl Into<String>) -> Self {
        self.transcript = Some(text.into());
        self
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }
}

/// Summary of a successful conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub message_id: String,
    pub started_at: DateTime<Utc>,
    /// Aligner binary used
    pub aligner: PathBuf,
    /// Milliseconds spent verifying dependencies and transcoding
    pub transcode_ms: u64,
    /// Milliseconds for the whole conversion
    pub total_ms: u64,
    pub alignment: AlignmentOutcome,
}

/// Orchestrates the external tools for lip-sync conversion
pub struct LipSyncPipeline {
    config: LipSyncConfig,
    verifier: DependencyVerifier,
    transcoder: TranscodeStage,
    selector: StrategySelector,
    policy: RecoveryPolicy,
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn PathProbe>,
}

impl LipSyncPipeline {
    /// Fails with [`crate::LipSyncError::Common`] when `config` does not validate
    pub fn new(
        config: LipSyncConfig,
        resolver: ResolverConfig,
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn PathProbe>,
    ) -> LipSyncResult<Self> {
        config.validate()?;

        let verifier =
            DependencyVerifier::new(&config.transcoder, ExecutableResolver::new(resolver));
        let transcoder = TranscodeStage::new(&config.transcoder);
        let selector = StrategySelector::new(&config.aligner.output_format);
        let policy = RecoveryPolicy::new(&config.aligner.recovery_markers);

        Ok(Self {
            config,
            verifier,
            transcoder,
            selector,
            policy,
            runner,
            probe,
        })
    }

    /// Pipeline using real processes, the local filesystem, and the current
    /// process environment for aligner resolution
    pub fn from_environment(config: LipSyncConfig) -> LipSyncResult<Self> {
        let resolver = ResolverConfig::from_environment(
            &config.aligner.tool_name,
            &config.aligner.override_env,
        )?;
        Self::new(
            config,
            resolver,
            Arc::new(SystemRunner),
            Arc::new(LocalFs),
        )
    }

    pub fn config(&self) -> &LipSyncConfig {
        &self.config
    }

    pub fn assets(&self, message_id: &MessageId) -> MessageAssets {
        MessageAssets::new(&self.config.audio_dir, message_id.clone())
    }

    /// Verify the transcoder and locate the aligner without touching any file
    pub async fn check_dependencies(&self) -> LipSyncResult<ResolvedToolPath> {
        self.verifier
            .verify(self.runner.as_ref(), self.probe.as_ref())
            .await
    }

    /// Convert one message to a mouth-cue file
    pub async fn convert(&self, request: &ConversionRequest) -> LipSyncResult<ConversionReport> {
        let message_id = request.message_id();
        info!(message_id = %message_id, "Starting conversion for message");

        match self.run_stages(request).await {
            Ok(report) => Ok(report),
            Err(err) => {
                error!(
                    message_id = %message_id,
                    kind = err.kind(),
                    error = %err,
                    "Error while getting phonemes for message"
                );
                Err(err)
            }
        }
    }

    async fn run_stages(&self, request: &ConversionRequest) -> LipSyncResult<ConversionReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let assets = self.assets(request.message_id());

        // Fails before any file is written
        let aligner = self.check_dependencies().await?;

        self.transcoder
            .run(&assets, self.runner.as_ref())
            .await?;
        let transcode_ms = elapsed_ms(&timer);
        info!(
            message_id = %assets.message_id(),
            elapsed_ms = transcode_ms,
            "Conversion done in {}ms",
            transcode_ms
        );

        // Path resolved during verification is reused for the command
        let command = self
            .selector
            .select(&aligner, &assets, request.transcript())
            .await;

        let executor =
            AlignmentExecutor::new(self.runner.as_ref(), self.probe.as_ref(), &self.policy);
        let alignment = executor.execute(command).await?;

        let total_ms = elapsed_ms(&timer);
        info!(
            message_id = %assets.message_id(),
            elapsed_ms = total_ms,
            strategy = %alignment.strategy,
            invocations = alignment.invocations,
            "Lip sync done in {}ms",
            total_ms
        );

        Ok(ConversionReport {
            message_id: assets.message_id().to_string(),
            started_at,
            aligner: aligner.into_path_buf(),
            transcode_ms,
            total_ms,
            alignment,
        })
    }
}

fn elapsed_ms(timer: &Instant) -> u64 {
    u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX)
}
