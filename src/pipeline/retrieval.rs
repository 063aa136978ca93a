use super::debug::DebugTrace;
use super::embedder::{EmbeddingError, EmbeddingModel};
use super::types::{Passage, ScoredPassage};

/// Query text for a drug list: names joined by single spaces.
pub fn build_query(drugs: &[String]) -> String {
    drugs.join(" ")
}

/// Rank passages by cosine similarity between passage and query embeddings.
pub fn semantic_search(
    passages: &[Passage],
    query: &str,
    embedder: &dyn EmbeddingModel,
    top_k: usize,
) -> Result<Vec<ScoredPassage>, EmbeddingError> {
    if passages.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let contents: Vec<&str> = passages.iter().map(|p| p.content.as_str()).collect();
    let passage_vecs = embedder.embed_batch(&contents)?;
    if passage_vecs.len() != passages.len() {
        return Err(EmbeddingError::CountMismatch {
            sent: passages.len(),
            received: passage_vecs.len(),
        });
    }
    let query_vec = embedder.embed(query)?;

    let scored = passages
        .iter()
        .zip(passage_vecs.iter())
        .enumerate()
        .map(|(position, (passage, vec))| ScoredPassage {
            passage: passage.clone(),
            score: cosine_similarity(&query_vec, vec),
            position,
        })
        .collect();

    Ok(top_k_stable(scored, top_k))
}

/// Rank passages by how many lowercase query tokens occur in them.
pub fn keyword_search(passages: &[Passage], query: &str, top_k: usize) -> Vec<ScoredPassage> {
    let query = query.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();

    let scored = passages
        .iter()
        .enumerate()
        .map(|(position, passage)| {
            let content = passage.content.to_lowercase();
            let hits = tokens.iter().filter(|t| content.contains(*t)).count();
            ScoredPassage {
                passage: passage.clone(),
                score: hits as f32,
                position,
            }
        })
        .collect();

    top_k_stable(scored, top_k)
}

/// Select the `top_k` passages most relevant to the drug list.
///
/// Tries the vector path when an embedder is supplied and falls back to
/// keyword overlap on any embedding failure. Output length is always
/// `min(passages.len(), top_k)`.
pub fn retrieve(
    passages: &[Passage],
    drugs: &[String],
    top_k: usize,
    embedder: Option<&dyn EmbeddingModel>,
    trace: &mut DebugTrace,
) -> Vec<String> {
    let query = build_query(drugs);

    let mut ranked: Option<Vec<ScoredPassage>> = None;
    match embedder {
        Some(embedder) => {
            trace.step("attempting_vector_retrieval");
            match semantic_search(passages, &query, embedder, top_k) {
                Ok(hits) => {
                    trace.step(format!("vector_retrieved: {}", hits.len()));
                    ranked = Some(hits);
                }
                Err(e) => {
                    trace.stage_error("embeddings", &e);
                    trace.step("fallback_to_keyword_retrieval");
                }
            }
        }
        None => trace.step("no_embeddings: keyword retrieval"),
    }

    let ranked = ranked.unwrap_or_else(|| {
        let hits = keyword_search(passages, &query, top_k);
        trace.step(format!("keyword_retrieved: {}", hits.len()));
        hits
    });

    let mut selected: Vec<String> = ranked.into_iter().map(|s| s.passage.content).collect();

    if selected.is_empty() {
        trace.note("no_context_retrieved_using_all_texts");
        selected = passages
            .iter()
            .take(passages.len().min(top_k))
            .map(|p| p.content.clone())
            .collect();
    }

    selected
}

/// Sort by descending score, ties by original position, then truncate.
fn top_k_stable(mut scored: Vec<ScoredPassage>, top_k: usize) -> Vec<ScoredPassage> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.position.cmp(&b.position))
    });
    scored.truncate(top_k);
    scored
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
