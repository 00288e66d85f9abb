//! Fuzzy text matching for the task search box.
//!
//! A query matches when it is a case-insensitive substring of the candidate,
//! or (for queries longer than one character) when the edit distance fits a
//! length-proportional budget. Single-character queries stay substring-only
//! to keep the noise down.

/// Edit-distance budget: just over a quarter of the query length, never
/// below one.
fn distance_threshold(query_len: usize) -> usize {
    ((query_len as f64 * 0.28).floor() as usize).max(1)
}

pub fn fuzzy_match(text: &str, query: &str) -> bool {
    if query.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let query = query.to_lowercase();

    let query_len = query.chars().count();
    if query_len <= 1 {
        return text.contains(&query);
    }
    if text.contains(&query) {
        return true;
    }
    levenshtein(&text, &query) <= distance_threshold(query_len)
}

/// Plain two-row Levenshtein over characters. Inputs are expected to be
/// lowercased already.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_always_matches() {
        assert!(fuzzy_match("task", "tas"));
        assert!(fuzzy_match("Pick up GROCERIES", "groceries"));
    }

    #[test]
    fn near_miss_within_budget_matches() {
        // One substitution against a seven-character query (budget 1).
        assert!(fuzzy_match("grocery", "grocary"));
    }

    #[test]
    fn distant_text_does_not_match() {
        // length 6 query, threshold floor(6 * 0.28) = 1, distance is larger.
        assert!(!fuzzy_match("abc", "xyz123"));
    }

    #[test]
    fn single_character_query_is_substring_only() {
        assert!(fuzzy_match("task", "t"));
        assert!(!fuzzy_match("abc", "t"));
    }

    #[test]
    fn empty_query_never_matches() {
        assert!(!fuzzy_match("anything", ""));
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }
}
