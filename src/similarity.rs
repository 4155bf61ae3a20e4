//! String similarity for human-friendly input
//!
//! Scores how close two phrases are, in priority order:
//! - Exact match (raw or after normalization)
//! - Substring containment
//! - Word overlap
//! - Levenshtein distance (for typo tolerance)

/// Score for one normalized string containing the other
const CONTAINS_SCORE: f64 = 0.9;

/// Score for an identical word shared by both phrases
const WORD_EQUAL_SCORE: f64 = 0.8;

/// Score for a word of one phrase containing a word of the other
const WORD_CONTAINS_SCORE: f64 = 0.7;

/// Normalize a phrase for comparison.
///
/// Keeps lowercase letters and digits, collapses whitespace runs to a single
/// space and drops everything else (punctuation, underscores, symbols).
pub fn normalize(s: &str) -> String {
    let mut cleaned = String::with_capacity(s.len());
    // Filter after lowercasing: some letters lowercase to a base letter plus
    // a combining mark, and the mark must not survive.
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            cleaned.push(c);
        } else if c.is_whitespace() {
            cleaned.push(' ');
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity between two phrases in `[0, 1]`.
///
/// Equality and containment are checked in both directions, but word overlap
/// walks the words of `a` in order and stops at the first pair that is equal
/// or where one word contains the other. Swapping the arguments can
/// therefore change a 0.8 into a 0.7.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 1.0;
    }

    if a.contains(&b) || b.contains(&a) {
        return CONTAINS_SCORE;
    }

    if let Some(score) = word_overlap(&a, &b) {
        return score;
    }

    levenshtein_similarity(&a, &b)
}

fn word_overlap(a: &str, b: &str) -> Option<f64> {
    let b_words: Vec<&str> = b.split_whitespace().collect();

    for wa in a.split_whitespace() {
        for &wb in &b_words {
            if wa == wb {
                return Some(WORD_EQUAL_SCORE);
            }
            if wa.contains(wb) || wb.contains(wa) {
                return Some(WORD_CONTAINS_SCORE);
            }
        }
    }

    None
}

/// `1 - distance / longest`, or 0.0 when either side is empty
fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 || b_len == 0 {
        return 0.0;
    }

    let distance = levenshtein(a, b);
    1.0 - distance as f64 / a_len.max(b_len) as f64
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}
