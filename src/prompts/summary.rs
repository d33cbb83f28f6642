//! Summary prompts for casual paper digests.
//!
//! Contains the system prompt and the default user prompt template.

/// System prompt for paper summarization
pub const SYSTEM_PROMPT: &str = "You are a researcher who explains new papers to friends. \
You read carefully, never invent results, and write in a warm, casual tone.";

/// Default user prompt template
/// Placeholders: {title}, {abstract}, {paper_text}, {language}
pub const USER_PROMPT_TEMPLATE: &str = r#"Summarize the following paper for a casual audience.

Rules:
- Write in {language}.
- Keep a friendly, conversational register, as if chatting with a colleague.
- 3 to 5 sentences: what problem it tackles, what they did, and why it matters.
- Only state what the paper says. No markdown, no bullet points.

Title: {title}

Abstract:
{abstract}

Paper text:
{paper_text}"#;

/// Marker inserted where the middle of a long paper was cut out
pub const OMISSION_MARKER: &str = "\n...(omitted)...\n";

/// Fill a user prompt template with paper data.
///
/// Placeholders are only recognized in the template itself; substituted
/// values are copied verbatim even when they contain `{...}`.
pub fn build_user_prompt(
    template: &str,
    title: &str,
    abstract_text: &str,
    paper_text: &str,
    language: &str,
) -> String {
    let values = [
        ("{title}", title),
        ("{abstract}", abstract_text),
        ("{paper_text}", paper_text),
        ("{language}", language),
    ];

    let mut out = String::with_capacity(template.len() + paper_text.len() + abstract_text.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Shorten `text` to about `max_chars` characters, keeping the head and the tail.
pub fn truncate_middle(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }

    let half = max_chars / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();
    format!("{}{}{}", head, OMISSION_MARKER, tail)
}
