//! Text normalization shared by the chat rules, the search box, and seed
//! matching.

/// Fold a single character to its unaccented lowercase ASCII form when it
/// is one of the Latin-1 / French accented letters; otherwise lowercase it.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        other => other.to_lowercase().next().unwrap_or(other),
    }
}

/// Lowercase, strip French accents, and collapse runs of whitespace into a
/// single space.
///
/// # Examples
///
/// ```
/// use rdv_core::text::normalize;
/// assert_eq!(normalize("  Révision   Système "), "revision systeme");
/// ```
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.chars().map(fold_char).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split normalized input into alphanumeric terms, dropping punctuation.
pub fn terms(input: &str) -> Vec<String> {
    normalize(input)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accent- and case-insensitive equality.
pub fn eq_folded(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
