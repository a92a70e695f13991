//! Dependency verification
//!
//! Confirms the transcoder runs and the aligner can be located before any
//! file is touched.

use crate::error::{LipSyncError, LipSyncResult};
use crate::process::{CommandRunner, Invocation, PathProbe};
use crate::resolver::{ExecutableResolver, ResolvedToolPath};
use tracing::{debug, info};

/// Install hints shown when the transcoder is unusable
pub const TRANSCODER_INSTALL_GUIDANCE: &str = "Please install ffmpeg and ensure it's on your PATH. \
     On Debian/Ubuntu: sudo apt install ffmpeg; macOS: brew install ffmpeg";

/// Checks both external tools
#[derive(Debug, Clone)]
pub struct DependencyVerifier {
    transcoder: String,
    resolver: ExecutableResolver,
}

impl DependencyVerifier {
    pub fn new(transcoder: impl Into<String>, resolver: ExecutableResolver) -> Self {
        Self {
            transcoder: transcoder.into(),
            resolver,
        }
    }

    /// Verify the transcoder, then resolve the aligner
    ///
    /// Returns the resolved aligner path so later stages can reuse it.
    pub async fn verify(
        &self,
        runner: &dyn CommandRunner,
        probe: &dyn PathProbe,
    ) -> LipSyncResult<ResolvedToolPath> {
        self.verify_transcoder(runner).await?;
        let aligner = self.resolver.resolve(runner, probe).await?;
        info!(aligner = %aligner, transcoder = %self.transcoder, "Dependencies verified");
        Ok(aligner)
    }

    async fn verify_transcoder(&self, runner: &dyn CommandRunner) -> LipSyncResult<()> {
        let invocation = Invocation::new(&self.transcoder).arg("-version");
        let detail = match runner.run(&invocation).await {
            Ok(output) if output.success() => {
                debug!(
                    version = output.stdout.lines().next().unwrap_or_default(),
                    "Transcoder available"
                );
                return Ok(());
            }
            Ok(output) => format!("'{}' exited with {:?}", invocation, output.code),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("'{}': command not found", self.transcoder)
            }
            Err(e) => format!("'{}' could not be started: {}", invocation, e),
        };

        Err(LipSyncError::DependencyMissing {
            tool: self.transcoder.clone(),
            detail,
            guidance: TRANSCODER_INSTALL_GUIDANCE.to_string(),
        })
    }
}
