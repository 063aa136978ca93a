use super::types::RetrievedContext;

/// Phrase the model must use when the extracts show no interaction. The
/// rule-based summary uses the same wording.
pub const NO_INTERACTION_PHRASE: &str = "No major interaction found based on the provided sources.";

/// Delimiter placed between context snippets.
pub const SNIPPET_DELIMITER: &str = "\n\n---\n\n";

pub const INTERACTION_INSTRUCTIONS: &str = "You are an assistant that summarizes potential drug interactions using \
the provided authoritative extracts. Use plain language suitable for a non-medical audience. \
Do not diagnose or prescribe.";

const CLOSING_INSTRUCTIONS: &str = "Now, summarize the potential interactions and the confidence of the evidence. \
Give a one-line top-level verdict and a short explanation. \
Cite 'openFDA' or 'sample' where appropriate if present in the extracts.";

/// Build the summarization prompt for a drug list and its retrieved context.
///
/// At most `max_snippets` snippets are included, passages first.
pub fn build_interaction_prompt(
    drugs: &[String],
    context: &RetrievedContext,
    max_snippets: usize,
) -> String {
    let snippets: Vec<&str> = context.snippets().into_iter().take(max_snippets).collect();

    let mut prompt = String::new();
    prompt.push_str(INTERACTION_INSTRUCTIONS);
    prompt.push_str(&format!(
        " If evidence indicates no interaction, say '{NO_INTERACTION_PHRASE}'\n\n"
    ));
    prompt.push_str(&format!("Drugs to evaluate: {}\n\n", drugs.join(", ")));
    prompt.push_str("Relevant extracts:\n");
    prompt.push_str(&snippets.join(SNIPPET_DELIMITER));
    prompt.push_str("\n\n");
    prompt.push_str(CLOSING_INSTRUCTIONS);

    prompt
}
