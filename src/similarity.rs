//! Approximate string similarity using longest matching blocks
//! (the Ratcliff/Obershelp "gestalt" ratio).
//!
//! The longest common run of characters is found, then the same search is
//! repeated on the unmatched pieces to its left and right. The ratio is
//! `2 * matched / (len(a) + len(b))`, in `0.0..=1.0`.
//!
//! ## Cost
//!
//! One longest-match pass over slices of length n and m is O(n·m) time and
//! O(m) space. Each recursion level works on disjoint sub-rectangles, so a
//! level is O(n·m) in total and there are at most min(n, m) levels. Short
//! strings such as artist names and titles stay close to O(n·m); matching a
//! query against k candidates costs k such passes.

/// A run of equal items: `a[a..a + len] == b[b..b + len]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchingBlock {
    pub a: usize,
    pub b: usize,
    pub len: usize,
}

/// Longest run shared by `a` and `b`.
///
/// Among equally long runs, the one starting earliest in `a` wins, then the
/// one starting earliest in `b`. Returns a zero-length block when nothing matches.
pub fn longest_match<T: PartialEq>(a: &[T], b: &[T]) -> MatchingBlock {
    let mut best = MatchingBlock { a: 0, b: 0, len: 0 };
    // prev[j + 1] = length of the run ending at (i - 1, j)
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            let run = if x == y { prev[j] + 1 } else { 0 };
            curr[j + 1] = run;
            if run > best.len {
                best = MatchingBlock {
                    a: i + 1 - run,
                    b: j + 1 - run,
                    len: run,
                };
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

/// All matching blocks, ordered by position in `a`.
pub fn matching_blocks<T: PartialEq>(a: &[T], b: &[T]) -> Vec<MatchingBlock> {
    let mut blocks = Vec::new();
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let found = longest_match(&a[a_lo..a_hi], &b[b_lo..b_hi]);
        if found.len == 0 {
            continue;
        }

        let (i, j) = (a_lo + found.a, b_lo + found.b);
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + found.len < a_hi && j + found.len < b_hi {
            pending.push((i + found.len, a_hi, j + found.len, b_hi));
        }
        blocks.push(MatchingBlock {
            a: i,
            b: j,
            len: found.len,
        });
    }

    blocks.sort_by_key(|block| (block.a, block.b));
    blocks
}

/// Similarity of two item sequences in `0.0..=1.0`. Two empty inputs are identical.
pub fn sequence_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched: usize = matching_blocks(a, b).iter().map(|block| block.len).sum();
    2.0 * matched as f64 / total as f64
}

/// Similarity of two strings, compared character by character.
/// Callers normalize first; this function is case- and space-sensitive.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    sequence_ratio(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ratio_identical_and_empty() {
        assert_eq!(ratio("usher", "usher"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_ratio_known_values() {
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        assert!(approx(ratio("abxcd", "abcd"), 8.0 / 9.0));
        assert!(approx(ratio("qabxcd", "abycdf"), 8.0 / 12.0));
    }

    #[test]
    fn test_ratio_is_symmetric_for_distinct_blocks() {
        assert!(approx(ratio("lil jon", "lil john"), ratio("lil john", "lil jon")));
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        // Two runs of length 2: "ab" at a=1 and "cd" at a=4
        let found = longest_match(&chars("qabxcd"), &chars("abycdf"));
        assert_eq!(found, MatchingBlock { a: 1, b: 0, len: 2 });

        // Single-char tie: earliest in a, then earliest in b
        let found = longest_match(&chars("ab"), &chars("ba"));
        assert_eq!(found, MatchingBlock { a: 0, b: 1, len: 1 });
    }

    #[test]
    fn test_longest_match_none() {
        let found = longest_match(&chars("abc"), &chars("xyz"));
        assert_eq!(found.len, 0);
    }

    #[test]
    fn test_matching_blocks() {
        let blocks = matching_blocks(&chars("abxcd"), &chars("abcd"));
        assert_eq!(
            blocks,
            vec![
                MatchingBlock { a: 0, b: 0, len: 2 },
                MatchingBlock { a: 3, b: 2, len: 2 },
            ]
        );
    }

    #[test]
    fn test_sequence_ratio_on_words() {
        let a = ["smells", "like", "teen", "spirit"];
        let b = ["smells", "like", "spirit"];
        assert!(approx(sequence_ratio(&a, &b), 6.0 / 7.0));
    }

    #[test]
    fn test_ratio_counts_chars_not_bytes() {
        // "é" is two bytes but one char
        assert!(approx(ratio("café", "cafe"), 6.0 / 8.0));
    }
}
