//! Sentence segmentation and fuzzy string similarity.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]\s+").expect("static sentence regex"))
}

/// Split after `.`, `!` or `?` followed by whitespace. The punctuation
/// stays with its sentence; the whitespace is dropped.
///
/// Always returns at least one element (possibly the empty string).
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary().find_iter(text) {
        // The punctuation mark is one ASCII byte.
        let end = boundary.start() + 1;
        sentences.push(&text[start..end]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);
    sentences
}

/// Trim, then cut a trailing fragment back to the last terminal
/// punctuation mark. Text without any terminal mark is returned trimmed.
pub fn clean_trailing_fragment(text: &str) -> String {
    let text = text.trim();
    match text.chars().last() {
        Some(last) if !TERMINAL_PUNCTUATION.contains(&last) => {
            match text.rfind(TERMINAL_PUNCTUATION) {
                Some(pos) => text[..pos + 1].to_string(),
                None => text.to_string(),
            }
        }
        _ => text.to_string(),
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Ratcliff/Obershelp similarity in `[0, 1]`: `2 * M / (|a| + |b|)` where
/// `M` is the total length of the matching blocks found by recursively
/// taking the longest common substring and recursing on both sides.
///
/// Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b_positions.entry(*ch).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b_positions, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`; ties go to
/// the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b_positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // Length of the match ending at a[i - 1], b[j], keyed by j.
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_runs = HashMap::new();
        if let Some(positions) = b_positions.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let run = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_runs.insert(j, run);
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        run_lengths = next_runs;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation_followed_by_whitespace() {
        let sentences = split_sentences("Cats purr. Dogs bark!  Birds sing? Fish swim");
        assert_eq!(
            sentences,
            vec!["Cats purr.", "Dogs bark!", "Birds sing?", "Fish swim"]
        );
    }

    #[test]
    fn does_not_split_inside_tokens() {
        assert_eq!(
            split_sentences("Version 1.5 is out.See docs."),
            vec!["Version 1.5 is out.See docs."]
        );
    }

    #[test]
    fn empty_text_yields_one_empty_sentence() {
        assert_eq!(split_sentences(""), vec![""]);
    }

    #[test]
    fn trailing_fragment_is_cut_back() {
        assert_eq!(
            clean_trailing_fragment("One sentence. Two sentences! And a frag"),
            "One sentence. Two sentences!"
        );
        assert_eq!(clean_trailing_fragment("  Complete.  "), "Complete.");
        assert_eq!(clean_trailing_fragment("no punctuation"), "no punctuation");
        assert_eq!(clean_trailing_fragment(""), "");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn ratio_matches_known_values() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        assert_eq!(similarity_ratio("abcd", "abcd"), 1.0);
        // Blocks "ab" and "d": 2 * 3 / 8.
        assert!((similarity_ratio("abcd", "abxd") - 0.75).abs() < 1e-9);
        // Longest block "abc" only.
        assert!((similarity_ratio("abcxyz", "abc") - 2.0 * 3.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_is_higher_for_closer_sentences() {
        let query = "what is colbert late interaction";
        let near = similarity_ratio("colbert uses late interaction.", query);
        let far = similarity_ratio("the weather was pleasant today.", query);
        assert!(near > far);
    }
}
