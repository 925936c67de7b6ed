//! Case-insensitive substring search helpers.

/// Build an `ILIKE` pattern for a substring match, or `None` when the query
/// is blank and every row should match. `%`, `_`, and `\` in the query are
/// escaped so they match literally.
pub(crate) fn like_pattern(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(trimmed.len() + 2);
    pattern.push('%');
    for ch in trimmed.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}
