use std::collections::HashSet;

/// Strips every HTML tag from user input, leaving the plain text.
///
/// Entities are decoded again afterwards: templates escape on output, so the
/// stored text must not carry escapes of its own.
pub fn strip_all_html(input: &str) -> String {
    let cleaned = ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}

/// Trims and strips; `None` when nothing is left.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(strip_all_html)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
