use serde::{Deserialize, Serialize};

use super::debug::DebugTrace;

/// A bounded slice of label text used as a retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    /// Index of the input text this passage was cut from.
    pub origin_index: usize,
}

/// A passage with its relevance score (higher is better).
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
    /// Position in the chunker output, used as the stable tie-break.
    pub position: usize,
}

/// Context handed to the prompt builder and the rule-based summary.
///
/// Retrieved passage contents first (at most `top_k`), then the synthetic
/// allergy lines in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievedContext {
    pub passages: Vec<String>,
    pub allergy_lines: Vec<String>,
}

impl RetrievedContext {
    pub fn new(passages: Vec<String>) -> Self {
        Self {
            passages,
            allergy_lines: Vec::new(),
        }
    }

    pub fn extend_allergy(&mut self, lines: Vec<String>) {
        self.allergy_lines.extend(lines);
    }

    /// All snippets in prompt order.
    pub fn snippets(&self) -> Vec<&str> {
        self.passages
            .iter()
            .chain(self.allergy_lines.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.passages.len() + self.allergy_lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Terminal output of one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    /// Always `Some` when `success` is true.
    pub answer: Option<String>,
    pub debug: DebugTrace,
}

impl PipelineResult {
    pub fn answered(answer: String, debug: DebugTrace) -> Self {
        Self {
            success: true,
            answer: Some(answer),
            debug,
        }
    }

    pub fn failed(debug: DebugTrace) -> Self {
        Self {
            success: false,
            answer: None,
            debug,
        }
    }
}
