//! Mouth-cue documents produced by the aligner
//!
//! The pipeline itself only checks that the output file exists. This reader
//! is for callers (and the CLI summary) that want to look inside.

use crate::error::{LipSyncError, LipSyncResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Rhubarb mouth shapes (A–F basic, G/H/X extended)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Viseme {
    /// Closed mouth (P, B, M)
    A,
    /// Slightly open, clenched teeth (most consonants)
    B,
    /// Open mouth (EH, AE)
    C,
    /// Wide open (AA)
    D,
    /// Slightly rounded (AO, ER)
    E,
    /// Puckered (UW, OW, W)
    F,
    /// Upper teeth on lower lip (F, V)
    G,
    /// Tongue raised (long L)
    H,
    /// Idle / rest
    X,
}

/// Timestamped mouth shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouthCue {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub value: Viseme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueMetadata {
    pub sound_file: Option<String>,
    /// Duration of the analysed audio in seconds
    pub duration: Option<f64>,
}

/// Whole aligner output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueDocument {
    #[serde(default)]
    pub metadata: Option<CueMetadata>,
    pub mouth_cues: Vec<MouthCue>,
}

impl CueDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read and parse an aligner output file
    pub async fn load(path: &Path) -> LipSyncResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content).map_err(|e| LipSyncError::InvalidOutput {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// True when every cue has `start <= end` and each cue starts no
    /// earlier than the previous one ends
    ///
    /// Both checks are exact; the aligner writes shared boundaries with
    /// identical decimal text, so adjacent cues compare equal.
    pub fn is_time_ordered(&self) -> bool {
        self.mouth_cues.iter().all(|c| c.start <= c.end)
            && self
                .mouth_cues
                .windows(2)
                .all(|pair| pair[0].end <= pair[1].start)
    }

    /// End of the last cue, or the metadata duration when there are no cues
    pub fn duration(&self) -> f64 {
        self.mouth_cues
            .last()
            .map(|c| c.end)
            .or_else(|| self.metadata.as_ref().and_then(|m| m.duration))
            .unwrap_or(0.0)
    }

    /// Number of cues per mouth shape
    pub fn viseme_counts(&self) -> BTreeMap<Viseme, usize> {
        let mut counts = BTreeMap::new();
        for cue in &self.mouth_cues {
            *counts.entry(cue.value).or_insert(0) += 1;
        }
        counts
    }
}
