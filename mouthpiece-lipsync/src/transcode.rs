//! Source audio transcoding (mp3 → wav)

use crate::assets::{path_arg, MessageAssets};
use crate::error::{LipSyncError, LipSyncResult};
use crate::process::{CommandRunner, Invocation};
use std::path::PathBuf;
use tracing::{debug, info};

/// Runs the transcoder for one message
#[derive(Debug, Clone)]
pub struct TranscodeStage {
    program: String,
}

impl TranscodeStage {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `<program> -y -i message_<id>.mp3 message_<id>.wav`
    pub fn invocation(&self, assets: &MessageAssets) -> Invocation {
        Invocation::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(path_arg(&assets.source_audio()))
            .arg(path_arg(&assets.aligner_input()))
    }

    /// Convert the source asset, overwriting any previous intermediate file
    ///
    /// Failures are never retried: they point at a bad or missing source.
    pub async fn run(
        &self,
        assets: &MessageAssets,
        runner: &dyn CommandRunner,
    ) -> LipSyncResult<PathBuf> {
        let invocation = self.invocation(assets);
        debug!(command = %invocation, "Running transcoder");

        let failure = |detail: String| LipSyncError::TranscodeFailed {
            message_id: assets.message_id().to_string(),
            command: invocation.to_string(),
            detail,
        };

        let output = runner
            .run(&invocation)
            .await
            .map_err(|e| failure(format!("could not start transcoder: {}", e)))?;

        if !output.success() {
            return Err(failure(format!(
                "exit code {:?}: {}",
                output.code,
                output.diagnostic()
            )));
        }

        let wav = assets.aligner_input();
        info!(message_id = %assets.message_id(), output = %wav.display(), "Transcode complete");
        Ok(wav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MessageId;

    #[test]
    fn test_invocation_overwrites_and_uses_message_paths() {
        let assets = MessageAssets::new("audios", MessageId::new("3").unwrap());
        let inv = TranscodeStage::new("ffmpeg").invocation(&assets);
        assert_eq!(
            inv.to_string(),
            "ffmpeg -y -i audios/message_3.mp3 audios/message_3.wav"
        );
    }
}
