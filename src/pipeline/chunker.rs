use std::collections::VecDeque;

use super::types::Passage;
use crate::config::ChunkingMode;

/// Separators tried in order by the overlapping splitter. The empty separator
/// splits into single characters and always succeeds.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Splits one label text into passage contents.
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Non-overlapping fixed windows measured in characters.
///
/// The concatenation of the produced windows is exactly the input text.
pub struct FixedWindowChunker {
    window: usize,
}

impl FixedWindowChunker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Chunker for FixedWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let mut windows = Vec::new();
        let mut current = String::new();
        let mut count = 0;

        for ch in text.chars() {
            current.push(ch);
            count += 1;
            if count == self.window {
                windows.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            windows.push(current);
        }

        windows
    }
}

/// Recursive separator-aware splitter.
///
/// Prefers paragraph breaks, then line breaks, then spaces, then raw
/// characters. Neighbouring pieces are merged up to `window` characters and
/// consecutive windows share up to `overlap` characters of trailing context.
pub struct OverlappingChunker {
    window: usize,
    overlap: usize,
}

impl OverlappingChunker {
    pub fn new(window: usize, overlap: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            overlap: overlap.min(window - 1),
        }
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();

        let (separator, remaining) = pick_separator(text, separators);
        let pieces = split_keeping_chars(text, separator);

        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.window {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    /// Greedily join pieces into windows, carrying overlap forward.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut windows = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner(&current) > self.window && !current.is_empty() {
                push_joined(&mut windows, &current, separator);

                while total > self.overlap
                    || (total > 0 && total + len + joiner(&current) > self.window)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    let removed = char_len(front) + if current.is_empty() { 0 } else { sep_len };
                    total = total.saturating_sub(removed);
                }
            }

            total += len + joiner(&current);
            current.push_back(piece);
        }

        push_joined(&mut windows, &current, separator);
        windows
    }
}

impl Chunker for OverlappingChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, SEPARATORS)
    }
}

/// Build the chunker for a configured mode.
pub fn chunker_for(mode: ChunkingMode) -> Box<dyn Chunker> {
    match mode {
        ChunkingMode::Overlapping { window, overlap } => {
            Box::new(OverlappingChunker::new(window, overlap))
        }
        ChunkingMode::Fixed { window } => Box::new(FixedWindowChunker::new(window)),
    }
}

/// Split every input text into passages, preserving input order.
///
/// Empty texts are skipped and contribute no passages.
pub fn chunk_texts(texts: &[String], mode: ChunkingMode) -> Vec<Passage> {
    let chunker = chunker_for(mode);

    texts
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.is_empty())
        .flat_map(|(origin_index, text)| {
            chunker
                .chunk(text)
                .into_iter()
                .map(move |content| Passage {
                    content,
                    origin_index,
                })
        })
        .collect()
}

fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split on `separator`, dropping empty pieces. The empty separator yields
/// one piece per character.
fn split_keeping_chars<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    text.split(separator).filter(|s| !s.is_empty()).collect()
}

fn push_joined(windows: &mut Vec<String>, current: &VecDeque<&str>, separator: &str) {
    if current.is_empty() {
        return;
    }
    let joined = current.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        windows.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(sections: usize) -> String {
        (0..sections)
            .map(|i| {
                format!(
                    "SECTION {i}:\n{}",
                    "Concomitant use may increase anticoagulant effect. ".repeat(6)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn fixed_windows_reconstruct_input() {
        let text = label(5);
        let chunks = FixedWindowChunker::new(1000).chunk(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.chars().count(), 1000);
        }
    }

    #[test]
    fn fixed_windows_respect_multibyte_characters() {
        let text = "é".repeat(25);
        let chunks = FixedWindowChunker::new(10).chunk(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 5);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn overlapping_windows_stay_within_size() {
        let chunks = OverlappingChunker::new(500, 80).chunk(&label(6));
        assert!(chunks.len() > 1, "Expected several windows, got {}", chunks.len());
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 500,
                "Window too large: {} chars",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn overlapping_windows_share_context() {
        let text = (0..200).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = OverlappingChunker::new(100, 30).chunk(&text);
        assert!(chunks.len() > 2);

        let first_tail = chunks[0].split(' ').last().unwrap();
        assert!(
            chunks[1].split(' ').any(|w| w == first_tail),
            "Second window should repeat the tail of the first"
        );
    }

    #[test]
    fn small_text_is_single_window() {
        let chunks = OverlappingChunker::new(500, 80).chunk("Amoxicillin:\nWARNINGS:\nallergic reactions");
        assert_eq!(chunks, vec!["Amoxicillin:\nWARNINGS:\nallergic reactions"]);
    }

    #[test]
    fn unbroken_text_splits_by_characters() {
        let text = "x".repeat(250);
        let chunks = OverlappingChunker::new(100, 20).chunk(&text);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.len() <= 100));
    }

    #[test]
    fn overlap_is_clamped_below_window() {
        let chunker = OverlappingChunker::new(10, 50);
        assert_eq!(chunker.overlap, 9);
    }

    #[test]
    fn empty_texts_are_skipped() {
        let texts = vec![String::new(), "Warfarin:\nbleeding".to_string(), String::new()];
        let passages = chunk_texts(&texts, ChunkingMode::Fixed { window: 1000 });
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].origin_index, 1);

        let passages = chunk_texts(&texts, ChunkingMode::default());
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].origin_index, 1);
    }

    #[test]
    fn whitespace_only_text_yields_nothing_when_overlapping() {
        assert!(OverlappingChunker::new(500, 80).chunk("  \n\n  ").is_empty());
    }

    #[test]
    fn passages_keep_document_order() {
        let texts = vec!["a".repeat(30), "b".repeat(30)];
        let passages = chunk_texts(&texts, ChunkingMode::Fixed { window: 10 });
        assert_eq!(passages.len(), 6);
        assert!(passages[..3].iter().all(|p| p.origin_index == 0));
        assert!(passages[3..].iter().all(|p| p.origin_index == 1));
    }

    #[test]
    fn no_texts_no_passages() {
        assert!(chunk_texts(&[], ChunkingMode::default()).is_empty());
    }
}
