//! Text normalization and query feature extraction.
//!
//! Everything the matcher compares goes through [`normalize`] first, so that
//! "Matemática 8° Básico" and "matematica 8 basico" are the same string.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Characters removed outright during normalization.
const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '¿', '¡', '"', '\'', '(', ')', '[', ']', '{', '}', '<', '>',
    '/', '\\', '@', '#', '$', '%', '^', '&', '*', '_', '+', '=', '|', '~', '`', '°', 'º', 'ª',
    '-',
];

/// Spanish function words that never count as significant query words.
const STOP_WORDS: &[&str] = &[
    "y", "de", "la", "el", "para", "con", "un", "una", "los", "las", "del", "en", "al", "por",
    "su", "se", "que", "es", "no", "o", "a",
];

/// Shortest token (in chars) that can be a significant word
const MIN_SIGNIFICANT_LEN: usize = 2;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Whole-number token: a digit run bounded by ASCII word boundaries on both sides.
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u:\b)[0-9]+(?-u:\b)").unwrap());

/// Normalize text for comparison: lowercase, strip diacritics and punctuation,
/// collapse whitespace.
///
/// - "Ñandú" → "nandu"
/// - "8° Básico" → "8 basico"
/// - "978-956-123" → "978956123"
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_diacritic(*c))
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Combining diacritical marks left over after NFD decomposition.
fn is_diacritic(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |  // Combining Diacritical Marks
        '\u{1AB0}'..='\u{1AFF}' |  // Combining Diacritical Marks Extended
        '\u{1DC0}'..='\u{1DFF}' |  // Combining Diacritical Marks Supplement
        '\u{20D0}'..='\u{20FF}' |  // Combining Diacritical Marks for Symbols
        '\u{FE20}'..='\u{FE2F}'    // Combining Half Marks
    )
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Does `number` occur in `text` as a whole-number token?
///
/// "8" matches "lenguaje 8 basico" but not "18 basico" or "8b".
pub fn contains_number_token(text: &str, number: &str) -> bool {
    NUMBER_TOKEN.find_iter(text).any(|m| m.as_str() == number)
}

/// Features derived once from a query and reused across every window the
/// matcher evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryFeatures {
    /// The normalized query
    pub normalized: String,
    /// Tokens of at least two chars that are not stop words, in query order
    pub significant_words: Vec<String>,
    /// Maximal digit runs, in query order (grade levels: "8° básico" → ["8"])
    pub grade_numbers: Vec<String>,
}

impl QueryFeatures {
    pub fn from_query(query: &str) -> Self {
        Self::from_normalized(normalize(query))
    }

    pub fn from_normalized(normalized: String) -> Self {
        let significant_words = normalized
            .split(' ')
            .filter(|w| w.chars().count() >= MIN_SIGNIFICANT_LEN && !is_stop_word(w))
            .map(str::to_string)
            .collect();
        let grade_numbers = DIGIT_RUN
            .find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .collect();

        Self { normalized, significant_words, grade_numbers }
    }

    /// Significant words occurring as substrings of `text`
    pub fn words_found(&self, text: &str) -> usize {
        self.significant_words.iter().filter(|w| text.contains(w.as_str())).count()
    }

    /// Every grade number appears in `text` as a whole-number token.
    /// Vacuously true when the query carries no numbers.
    pub fn numbers_present(&self, text: &str) -> bool {
        self.grade_numbers.iter().all(|n| contains_number_token(text, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_diacritics() {
        assert_eq!(normalize("Ñandú"), "nandu");
        assert_eq!(normalize("Matemática 8° Básico"), normalize("matematica 8 basico"));
        assert_eq!(normalize("Matemática 8° Básico"), "matematica 8 basico");
    }

    #[test]
    fn test_normalize_strips_punctuation_and_whitespace() {
        assert_eq!(normalize("  ¿Qué es  esto?  "), "que es esto");
        assert_eq!(normalize("978-956-123-456-7"), "9789561234567");
        assert_eq!(normalize("1º medio (2ª edición)"), "1 medio 2 edicion");
        assert_eq!(normalize("a\tb\n\nc"), "a b c");
        assert_eq!(normalize("<<>>"), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Lenguaje y Comunicación 7° Básico",
            "  ÑANDÚ   del   Sur!! ",
            "İstanbul ǅemal ﬁnal",
            "C'est l'été — déjà",
            "",
            "   ",
            "a_b-c.d/e\\f",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_significant_words_skip_stop_words_and_short_tokens() {
        let f = QueryFeatures::from_query("Lenguaje y Comunicación para el 7° Básico");
        assert_eq!(f.significant_words, vec!["lenguaje", "comunicacion", "basico"]);
        assert_eq!(f.grade_numbers, vec!["7"]);
    }

    #[test]
    fn test_grade_numbers_are_maximal_runs() {
        let f = QueryFeatures::from_query("Ciencias 12 y 3° medio");
        assert_eq!(f.grade_numbers, vec!["12", "3"]);
    }

    #[test]
    fn test_number_token_respects_boundaries() {
        assert!(contains_number_token("lenguaje 8 basico", "8"));
        assert!(contains_number_token("8", "8"));
        assert!(!contains_number_token("lenguaje 18 basico", "8"));
        assert!(!contains_number_token("lenguaje 81 basico", "8"));
        assert!(!contains_number_token("basico8", "8"));
    }

    #[test]
    fn test_numbers_present_vacuous_without_numbers() {
        let f = QueryFeatures::from_query("Historia universal");
        assert!(f.grade_numbers.is_empty());
        assert!(f.numbers_present("anything at all"));
    }

    #[test]
    fn test_words_found_counts_substrings() {
        let f = QueryFeatures::from_query("historia geografia ciencias");
        assert_eq!(f.words_found("historia y geografias"), 2);
    }
}
