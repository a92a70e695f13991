//! mouthpiece-lipsync library interface
//!
//! Turns a spoken-audio message into a mouth-cue JSON file by driving two
//! external tools: a transcoder (ffmpeg) and a lip-sync aligner (Rhubarb).
//!
//! Stages, in order:
//! 1. [`verifier`] checks ffmpeg runs and locates the aligner ([`resolver`])
//! 2. [`transcode`] converts `message_<id>.mp3` to `message_<id>.wav`
//! 3. [`strategy`] picks transcript-guided or phonetic alignment
//! 4. [`executor`] runs the aligner, retrying once without the phonetic
//!    recognizer when speech-recognition resources are missing
//!
//! [`pipeline::LipSyncPipeline`] wires the stages together.

pub mod assets;
pub mod cues;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod process;
pub mod resolver;
pub mod strategy;
pub mod transcode;
pub mod verifier;

pub use crate::error::{LipSyncError, LipSyncResult};
pub use crate::pipeline::{ConversionReport, ConversionRequest, LipSyncPipeline};
