//! Prompt construction for review summaries.

const INSTRUCTIONS: &str = "Summarize these customer reviews in 2-3 concise sentences, max 40 words.

Capture what customers like most, mention any mixed or varied feedback briefly, and note overall impressions or typical uses. Write in a clear, neutral, and helpful style similar to Amazon review summaries, avoiding hype or vague praise.

Return only the summary, with no intro, conclusion, or extra text.";

/// Build the single user message sent to the model.
///
/// Blank review bodies are skipped; the rest are separated by blank lines.
pub fn build_prompt(review_bodies: &[String]) -> String {
  let combined = review_bodies
    .iter()
    .map(|b| b.trim())
    .filter(|b| !b.is_empty())
    .collect::<Vec<_>>()
    .join("\n\n");

  format!("{}\n\n{}", INSTRUCTIONS, combined)
}
