//! mouthpiece-lipsync - command-line entry point
//!
//! `check` verifies ffmpeg and locates Rhubarb; `convert` turns
//! `<audio_dir>/message_<id>.mp3` into `<audio_dir>/message_<id>.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mouthpiece_common::config::{load_config, resolve_config_path, CONFIG_ENV_VAR};
use mouthpiece_lipsync::cues::CueDocument;
use mouthpiece_lipsync::{ConversionRequest, LipSyncPipeline};
use tracing::info;

/// Command-line arguments for mouthpiece-lipsync
#[derive(Parser, Debug)]
#[command(name = "mouthpiece-lipsync")]
#[command(about = "Generate lip-sync mouth cues with ffmpeg and Rhubarb")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Directory holding message_<id>.* files (overrides config)
    #[arg(short, long)]
    audio_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify ffmpeg and locate the Rhubarb binary
    Check,

    /// Convert one message to mouth cues
    Convert {
        /// Message identifier
        #[arg(short, long)]
        message: String,

        /// Transcript text for guided alignment
        #[arg(short, long, conflicts_with = "text_file")]
        text: Option<String>,

        /// Read the transcript from a file
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Print the conversion report as JSON
        #[arg(long)]
        json: bool,

        /// Parse the output and print a cue summary
        #[arg(long)]
        summary: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let (mut config, config_source) = load_config(config_path.as_deref())
        .with_context(|| format!("Failed to load config {:?}", config_path))?;
    if let Some(audio_dir) = args.audio_dir {
        config.audio_dir = audio_dir;
    }

    mouthpiece_common::logging::init_tracing(&config.logging)
        .context("Failed to initialize logging")?;
    config_source.log();

    info!("Starting mouthpiece-lipsync {}", env!("CARGO_PKG_VERSION"));
    info!("Audio directory: {}", config.audio_dir.display());

    let pipeline =
        LipSyncPipeline::from_environment(config).context("Failed to initialize pipeline")?;

    match args.command {
        Commands::Check => {
            let aligner = pipeline.check_dependencies().await?;
            println!("{}", aligner);
        }
        Commands::Convert {
            message,
            text,
            text_file,
            json,
            summary,
        } => {
            let transcript = match text_file {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read transcript {}", path.display()))?,
                ),
                None => text,
            };

            let mut request = ConversionRequest::for_message(message)?;
            if let Some(text) = transcript {
                request = request.with_transcript(text);
            }

            let report = pipeline.convert(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "message {}: {} ({} strategy, {} aligner run(s), {}ms)",
                    report.message_id,
                    report.alignment.output.display(),
                    report.alignment.strategy,
                    report.alignment.invocations,
                    report.total_ms
                );
            }

            if summary {
                let doc = CueDocument::load(&report.alignment.output).await?;
                println!(
                    "{} cues over {:.2}s (time-ordered: {})",
                    doc.mouth_cues.len(),
                    doc.duration(),
                    doc.is_time_ordered()
                );
                for (viseme, count) in doc.viseme_counts() {
                    println!("  {:?}: {}", viseme, count);
                }
            }
        }
    }

    Ok(())
}
