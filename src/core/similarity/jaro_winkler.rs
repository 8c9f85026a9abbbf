// Jaro-Winkler similarity, used to flag customer folders whose names are
// probably the same account spelled two ways ("Audet" vs "Audette").
//
// This is a pure function with no I/O. It allocates two small flag vectors per
// call, so it is safe to call from any number of tasks at once.

/// Weight of each shared prefix character in the Winkler boost.
const PREFIX_SCALE: f64 = 0.1;

/// Longest common prefix that counts towards the boost.
const MAX_PREFIX: usize = 4;

/// Jaro similarity below or at this value gets no prefix boost.
const BOOST_THRESHOLD: f64 = 0.7;

/// Plain Jaro similarity of two strings, in `[0, 1]`.
///
/// Matching is greedy: each character of `s1` takes the first unmatched equal
/// character of `s2` inside the match window, scanning left to right. This is
/// not an optimal assignment, and scores depend on it, so keep it that way.
///
/// The window is `max(|s1|, |s2|) / 2 - 1` and can be negative when the longer
/// string has a single character. A negative window finds no matches, so
/// `jaro_similarity("a", "a")` is `0.0`.
pub fn jaro_similarity(s1: &str, s2: &str) -> f64 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let range = (a.len().max(b.len()) / 2) as isize - 1;
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ch) in a.iter().enumerate() {
        let i = i as isize;
        let start = (i - range).max(0);
        let end = (i + range + 1).min(b.len() as isize);

        for j in start..end {
            let j = j as usize;
            if b_matched[j] || b[j] != *ch {
                continue;
            }
            a_matched[i as usize] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Walk both sides' matched characters in order and count mismatched pairs.
    let b_in_order = b
        .iter()
        .zip(&b_matched)
        .filter_map(|(ch, matched)| matched.then_some(ch));
    let transpositions = a
        .iter()
        .zip(&a_matched)
        .filter_map(|(ch, matched)| matched.then_some(ch))
        .zip(b_in_order)
        .filter(|(x, y)| x != y)
        .count();

    let m = matches as f64;
    let t = transpositions as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t / 2.0) / m) / 3.0
}

/// Jaro-Winkler similarity of two strings, in `[0, 1]`.
///
/// Comparison is case-sensitive. Callers that want case-insensitive scores
/// must lowercase both inputs first, as [`suggest_merges`] does.
///
/// Either input being empty gives `0.0`.
///
/// [`suggest_merges`]: crate::core::folders::folder_service::suggest_merges
pub fn jaro_winkler_similarity(s1: &str, s2: &str) -> f64 {
    let jaro = jaro_similarity(s1, s2);
    if jaro <= BOOST_THRESHOLD {
        return jaro;
    }

    let prefix = s1
        .chars()
        .zip(s2.chars())
        .take(MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * PREFIX_SCALE * (1.0 - jaro)
}
