use super::GenerationRequest;

/// Target length of a generated post.
pub const TARGET_WORDS: u32 = 800;

const KEYWORD_SEPARATOR: &str = ", ";

/// Render the user instruction for a validated request.
pub fn build(request: &GenerationRequest) -> String {
    let GenerationRequest {
        topic,
        keywords,
        tone,
    } = request;
    let keywords = keywords.join(KEYWORD_SEPARATOR);

    format!(
        "Write a professional blog post about \"{topic}\" using the following keywords: {keywords}.
The blog should include:
- A compelling introduction
- At least 3 subheadings with relevant content
- Key points incorporating the keywords
- A strong conclusion with a call-to-action
- Keep it around {TARGET_WORDS} words
- Use a {tone} tone

Format the output in Markdown."
    )
}
