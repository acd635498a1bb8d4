use ammonia;

/// Clean admin-entered question and template text with the ammonia library.
///
/// Whitelist-based: safe inline tags (like <b>, <code>) survive so question
/// prompts can carry formatting, while <script>, <iframe> and event-handler
/// attributes are stripped together with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
