//! Label normalization and comparison helpers

/// Produce the canonical lookup key for a free-text label:
/// trim, collapse internal whitespace, lowercase.
///
/// Used as the embedded store's node identity. The SQLite backend keeps
/// original-cased labels and folds case in its queries instead.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Spelling variants a relation query must match: the label itself,
/// spaces substituted for underscores, and vice versa.
pub fn label_variants(label: &str) -> Vec<String> {
    let mut variants = vec![label.to_string()];
    if label.contains('_') {
        variants.push(label.replace('_', " "));
    }
    if label.contains(' ') {
        variants.push(label.replace(' ', "_"));
    }
    variants
}

/// Levenshtein edit distance between two strings, by character.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Jane Smith"), "jane smith");
        assert_eq!(normalize_label("  Jane   Smith  "), "jane smith");
        assert_eq!(normalize_label("PROJECT\tAlpha"), "project alpha");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_label_variants() {
        let variants = label_variants("project_alpha");
        assert!(variants.contains(&"project_alpha".to_string()));
        assert!(variants.contains(&"project alpha".to_string()));

        let variants = label_variants("Project Alpha");
        assert!(variants.contains(&"Project Alpha".to_string()));
        assert!(variants.contains(&"Project_Alpha".to_string()));

        assert_eq!(label_variants("single"), vec!["single".to_string()]);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("jane smith", "jane smyth"), 1);
    }

    #[test]
    fn test_levenshtein_unicode() {
        assert_eq!(levenshtein("café", "cafe"), 1);
    }
}
