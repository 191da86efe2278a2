/// Longest directory-name stem produced from a title. Listing titles are
/// capped well below this by the marketplace; the cap keeps image file names
/// inside filesystem limits for anything else.
const MAX_TITLE_LEN: usize = 120;

/// Filesystem-safe title: keep ASCII word characters and spaces, collapse
/// runs of spaces, join words with `_`, lowercase.
///
/// `"Men's Shirt  — Blue!!"` becomes `mens_shirt_blue`.
pub fn normalize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|&c| is_word_char(c) || c == ' ')
        .collect();
    let mut normalized = kept
        .split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase();
    if normalized.len() > MAX_TITLE_LEN {
        // Only ASCII remains, so byte truncation is char-safe.
        normalized.truncate(MAX_TITLE_LEN);
        let trimmed = normalized.trim_end_matches('_').len();
        normalized.truncate(trimmed);
    }
    normalized
}

/// Category directory: the first run of word characters in the category name.
///
/// `"Clothing, Shoes & Accessories"` becomes `Clothing`.
pub fn normalize_category(category: &str) -> Option<String> {
    category
        .split(|c: char| !is_word_char(c))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
