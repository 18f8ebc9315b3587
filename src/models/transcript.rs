//! Captured transcript data held per tab.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TabId = i64;
pub type WindowId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
    pub text: String,
}

/// Either the transcript as already-flattened text or the raw cue list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TranscriptPayload {
    Text(String),
    Cues(Vec<Cue>),
}

impl TranscriptPayload {
    pub fn render(&self, include_timestamps: bool) -> String {
        match self {
            TranscriptPayload::Text(text) => text.clone(),
            TranscriptPayload::Cues(cues) => cues
                .iter()
                .map(|cue| {
                    let text = cue.text.trim();
                    if include_timestamps {
                        format!("[{}] {}", format_offset(cue.start), text)
                    } else {
                        text.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TranscriptPayload::Text(text) => text.trim().is_empty(),
            TranscriptPayload::Cues(cues) => cues.is_empty(),
        }
    }
}

fn format_offset(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedTranscript {
    pub tab_id: TabId,
    pub url: String,
    pub payload: TranscriptPayload,
    pub captured_at: DateTime<Utc>,
}
