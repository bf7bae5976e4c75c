//! "Did you mean" suggestions for misspelled names

/// Compute Levenshtein edit distance between two strings
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }

    dp[m][n]
}

/// Find up to three known names within `max_distance` edits of `target`,
/// closest first
pub fn find_similar<'a>(
    known: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(String, usize)> = known
        .into_iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            if dist <= max_distance && dist > 0 {
                Some((name.to_string(), dist))
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));
    candidates
        .into_iter()
        .map(|(name, _)| name)
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_same() {
        assert_eq!(levenshtein_distance("width", "width"), 0);
    }

    #[test]
    fn test_levenshtein_one_off() {
        assert_eq!(levenshtein_distance("height", "heigt"), 1);
        assert_eq!(levenshtein_distance("height", "heihgt"), 2);
    }

    #[test]
    fn test_levenshtein_different() {
        assert_eq!(levenshtein_distance("cat", "dog"), 3);
    }

    #[test]
    fn test_find_similar() {
        let known = ["width", "height", "depth"];
        let suggestions = find_similar(known, "widht", 2);
        assert_eq!(suggestions, vec!["width".to_string()]);
    }

    #[test]
    fn test_exact_match_is_not_a_suggestion() {
        let suggestions = find_similar(["c"], "c", 2);
        assert!(suggestions.is_empty());
    }
}
