use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::event::OutputEvent;
use crate::writer::strip_markup;

/// Presentation-side state plus the outbound event queue.
///
/// The traversal machine owns story position; `Ctx` owns what the player can
/// currently see and hear. On load none of this is deserialized directly:
/// replaying the command history rebuilds it, which keeps save files honest
/// about what actually happened.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    pub transcript: Vec<Transcript>,
    pub current_cg: Option<String>,
    pub current_music: Option<String>,
    pub player_visible: bool,
    pub event_queue: VecDeque<OutputEvent>,
}

impl Ctx {
    pub fn push(&mut self, event: OutputEvent) {
        self.event_queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<OutputEvent> {
        self.event_queue.pop_front()
    }

    pub fn drain(&mut self) -> Vec<OutputEvent> {
        self.event_queue.drain(..).collect()
    }

    pub fn record_line(&mut self, speaker: Option<String>, text: String) {
        self.transcript.push(Transcript { speaker, text });
    }

    /// The line currently on screen.
    pub fn latest_line(&self) -> Option<&Transcript> {
        self.transcript.last()
    }

    /// History text for a transcript view: everything before the line
    /// currently on screen, most recent `max_lines` entries, markup
    /// stripped, blank line between entries.
    pub fn transcript_text(&self, max_lines: usize) -> String {
        if self.transcript.len() < 2 {
            return "No transcript yet.".to_string();
        }
        let shown = &self.transcript[..self.transcript.len() - 1];
        let start = shown.len().saturating_sub(max_lines);

        let mut out = String::new();
        for (i, entry) in shown[start..].iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            match &entry.speaker {
                Some(speaker) => {
                    out.push_str(speaker);
                    out.push_str(": ");
                }
                None => {}
            }
            out.push_str(&entry.raw_text());
        }
        out
    }

    /// Drops everything except the transcript, which the caller replaces
    /// from the snapshot before replay.
    pub(crate) fn reset_presentation(&mut self) {
        self.current_cg = None;
        self.current_music = None;
        self.player_visible = false;
        self.event_queue.clear();
    }
}

/// One recorded dialogue line, markup included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub speaker: Option<String>,
    pub text: String,
}

impl Transcript {
    /// The text without `[..]` markup tags.
    pub fn raw_text(&self) -> String {
        strip_markup(&self.text)
    }
}
