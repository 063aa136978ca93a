//! Append-only execution trace returned alongside every pipeline answer.
//!
//! Each entry is also mirrored to `tracing` so the same information lands in
//! the process log: steps at debug, errors at warn, notes at info.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugTrace {
    pub steps: Vec<String>,
    pub errors: Vec<String>,
    pub notes: Vec<String>,
}

impl DebugTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, step: impl Into<String>) {
        let step = step.into();
        tracing::debug!(step = %step, "Pipeline step");
        self.steps.push(step);
    }

    pub fn error(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::warn!(error = %error, "Pipeline error recorded");
        self.errors.push(error);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        tracing::info!(note = %note, "Pipeline note");
        self.notes.push(note);
    }

    /// Record an error tagged with the stage that produced it.
    pub fn stage_error(&mut self, stage: &str, error: &dyn std::fmt::Display) {
        self.error(format!("{stage}_error: {error}"));
    }

    pub fn has_step(&self, needle: &str) -> bool {
        self.steps.iter().any(|s| s.contains(needle))
    }

    pub fn has_note(&self, needle: &str) -> bool {
        self.notes.iter().any(|n| n.contains(needle))
    }
}
