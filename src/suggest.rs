//! Near-miss suggestions for typo correction.
//!
//! Used for unknown engine names, unknown frontmatter fields and unknown
//! tool names, so error messages can say "Did you mean ...?".

/// Maximum number of suggestions attached to an error.
pub const MAX_SUGGESTIONS: usize = 3;

/// Levenshtein edit distance between two strings (by `char`).
pub fn edit_distance(a: &str, b: &str) -> usize {
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
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Rank `candidates` by edit distance to `input`, closest first.
///
/// Candidates that would need a complete rewrite (distance not smaller than
/// the longer of the two strings) are dropped. Ties are broken by name so the
/// result is deterministic.
pub fn rank<'a, I>(input: &str, candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = input.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = edit_distance(&needle, &candidate.to_lowercase());
            let longest = needle.chars().count().max(candidate.chars().count());
            (distance < longest).then_some((distance, candidate))
        })
        .collect();

    scored.sort();
    scored.dedup();
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Format a "Did you mean ...?" sentence, or an empty string.
pub fn did_you_mean(suggestions: &[String]) -> String {
    let quoted: Vec<String> = suggestions.iter().map(|s| format!("'{}'", s)).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [only] => format!("Did you mean {}?", only),
        [init @ .., last] => format!("Did you mean {} or {}?", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("claude", "claude"), 0);
        assert_eq!(edit_distance("cluade", "claude"), 2);
    }

    #[test]
    fn distance_for_unregistered_engine_name() {
        assert_eq!(edit_distance("gpt4", "custom"), 5);
        assert_eq!(edit_distance("gpt4", "claude"), 6);
        assert_eq!(edit_distance("gpt4", "copilot"), 6);
    }

    #[test]
    fn rank_orders_closest_first() {
        let ranked = rank("copilt", ["claude", "copilot", "copilot-sdk", "custom"], 3);
        assert_eq!(ranked[0], "copilot");
    }

    #[test]
    fn rank_drops_total_rewrites() {
        let ranked = rank("xyz", ["abc"], 3);
        assert!(ranked.is_empty());
    }

    #[test]
    fn rank_respects_limit() {
        let ranked = rank("a", ["ab", "ac", "ad", "ae"], 2);
        assert_eq!(ranked, vec!["ab".to_string(), "ac".to_string()]);
    }

    #[test]
    fn did_you_mean_formats() {
        assert_eq!(did_you_mean(&[]), "");
        assert_eq!(did_you_mean(&["custom".to_string()]), "Did you mean 'custom'?");
        assert_eq!(
            did_you_mean(&["custom".to_string(), "copilot".to_string()]),
            "Did you mean 'custom' or 'copilot'?"
        );
        assert_eq!(
            did_you_mean(&["a".to_string(), "b".to_string(), "c".to_string()]),
            "Did you mean 'a', 'b' or 'c'?"
        );
    }
}
