//! Three-phase catalog matcher.
//!
//! Phase 1 (ISBN literal) and Phase 2 (exact substring) are unambiguous and
//! always win over Phase 3 (strict windowed fuzzy). The fuzzy phase scores
//! windows of 1..=5 consecutive fragments by how many significant query words
//! they contain, with the grade number acting as a hard gate: catalog entries
//! for different grade levels are often identical except for that digit.
//!
//! The first phase that yields a candidate ends the search.

use crate::interface::{MatchCandidate, MatchTier, SearchHints, SearchStatus, TextFragment};
use crate::normalize::{normalize, QueryFeatures};
use serde::Serialize;

/// Largest number of consecutive fragments tested as one window.
pub const MAX_WINDOW_FRAGMENTS: usize = 5;

/// Minimum share of significant words a window must contain.
pub const MIN_MATCH_RATIO: f64 = 0.70;

/// Share of significant words at which a window match counts as `Exact`.
pub const EXACT_MATCH_RATIO: f64 = 0.90;

/// Minimum absolute number of significant words in an accepted window.
/// Guards against spurious one-word coincidences.
pub const MIN_WORDS_FOUND: usize = 2;

/// Which phase produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchPhase {
    Isbn,
    Substring,
    Window,
}

/// Result of one matcher pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    /// Ranked: tier first, then ascending fragment index
    pub matches: Vec<MatchCandidate>,
    pub status: SearchStatus,
    /// Phase that produced `matches`; `None` when nothing matched
    pub phase: Option<MatchPhase>,
}

impl MatchOutcome {
    fn not_found() -> Self {
        Self { matches: Vec::new(), status: SearchStatus::NotFound, phase: None }
    }

    fn from_phase(phase: MatchPhase, mut matches: Vec<MatchCandidate>) -> Self {
        rank(&mut matches);
        Self { matches, status: SearchStatus::Found, phase: Some(phase) }
    }
}

/// A fragment with its normalized text, computed once per pass
struct Normalized<'a> {
    fragment: &'a TextFragment,
    text: String,
}

/// Find every place `query` appears in `fragments`.
pub fn find_matches(
    query: &str,
    fragments: &[TextFragment],
    hints: Option<&SearchHints>,
) -> MatchOutcome {
    let features = QueryFeatures::from_query(query);
    find_matches_with_features(&features, fragments, hints)
}

/// Same as [`find_matches`] with precomputed query features.
pub fn find_matches_with_features(
    features: &QueryFeatures,
    fragments: &[TextFragment],
    hints: Option<&SearchHints>,
) -> MatchOutcome {
    if fragments.is_empty() {
        return MatchOutcome::not_found();
    }

    #[cfg(feature = "perf-log")]
    let t0 = std::time::Instant::now();

    let outcome = run_phases(features, fragments, hints);

    #[cfg(feature = "perf-log")]
    eprintln!("{}", perf_line(t0.elapsed().as_secs_f64() * 1000.0, fragments.len(), &outcome));

    outcome
}

fn run_phases(
    features: &QueryFeatures,
    fragments: &[TextFragment],
    hints: Option<&SearchHints>,
) -> MatchOutcome {
    let normalized: Vec<Normalized<'_>> = fragments
        .iter()
        .map(|fragment| Normalized { fragment, text: normalize(&fragment.text) })
        .collect();

    if let Some(isbn) = hints.and_then(|h| h.isbn.as_deref()) {
        let matches = isbn_matches(isbn, &normalized);
        if !matches.is_empty() {
            tracing::debug!(matches = matches.len(), "isbn_match");
            return MatchOutcome::from_phase(MatchPhase::Isbn, matches);
        }
    }

    if features.normalized.is_empty() {
        return MatchOutcome::not_found();
    }

    let matches = substring_matches(&features.normalized, &normalized);
    if !matches.is_empty() {
        tracing::debug!(matches = matches.len(), "substring_match");
        return MatchOutcome::from_phase(MatchPhase::Substring, matches);
    }

    let matches = window_matches(features, &normalized);
    if matches.is_empty() {
        tracing::debug!(
            significant_words = features.significant_words.len(),
            grade_numbers = ?features.grade_numbers,
            "no_match"
        );
        return MatchOutcome::not_found();
    }
    tracing::debug!(matches = matches.len(), "window_match");
    MatchOutcome::from_phase(MatchPhase::Window, matches)
}

#[cfg(any(test, feature = "perf-log"))]
fn perf_line(elapsed_ms: f64, fragments: usize, outcome: &MatchOutcome) -> String {
    let phase = match outcome.phase {
        Some(MatchPhase::Isbn) => "isbn",
        Some(MatchPhase::Substring) => "substring",
        Some(MatchPhase::Window) => "window",
        None => "none",
    };
    format!(
        "[perf] match_pass={elapsed_ms:.2}ms phase={phase} fragments={fragments} matches={}",
        outcome.matches.len()
    )
}

/// Phase 1: literal ISBN anywhere in a fragment.
fn isbn_matches(isbn: &str, fragments: &[Normalized<'_>]) -> Vec<MatchCandidate> {
    let raw = normalize(isbn);
    let clean: String = raw.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Vec::new();
    }

    fragments
        .iter()
        .filter(|f| f.text.contains(&clean) || f.text.contains(&raw))
        .map(|f| MatchCandidate::single(f.fragment.order, MatchTier::Exact))
        .collect()
}

/// Phase 2: the whole normalized query inside a single fragment.
fn substring_matches(query: &str, fragments: &[Normalized<'_>]) -> Vec<MatchCandidate> {
    fragments
        .iter()
        .filter(|f| f.text.contains(query))
        .map(|f| MatchCandidate::single(f.fragment.order, MatchTier::Exact))
        .collect()
}

/// Words a window must contain: `max(2, ceil(0.70 * n))`.
fn required_words(significant: usize) -> usize {
    let scaled = (MIN_MATCH_RATIO * significant as f64).ceil() as usize;
    scaled.max(MIN_WORDS_FOUND)
}

/// Score one window of normalized text. `None` means rejected.
fn classify_window(features: &QueryFeatures, window_text: &str) -> Option<MatchTier> {
    // Grade mismatch disqualifies regardless of word overlap
    if !features.numbers_present(window_text) {
        return None;
    }

    let significant = features.significant_words.len();
    if significant == 0 {
        return None;
    }
    let words_found = features.words_found(window_text);
    let match_ratio = words_found as f64 / significant as f64;

    if words_found < required_words(significant) || match_ratio < MIN_MATCH_RATIO {
        return None;
    }
    if match_ratio >= EXACT_MATCH_RATIO {
        Some(MatchTier::Exact)
    } else {
        Some(MatchTier::Partial)
    }
}

/// Phase 3: sliding windows of unclaimed consecutive fragments.
///
/// Window sizes are tried smallest first; the first size that yields any
/// match ends the phase. Accepted windows claim their fragments so later
/// windows of the same size cannot overlap them.
fn window_matches(features: &QueryFeatures, fragments: &[Normalized<'_>]) -> Vec<MatchCandidate> {
    let max_size = MAX_WINDOW_FRAGMENTS.min(fragments.len());
    let mut claimed = vec![false; fragments.len()];
    let mut matches = Vec::new();

    for size in 1..=max_size {
        for start in 0..=(fragments.len() - size) {
            let range = start..start + size;
            if claimed[range.clone()].iter().any(|&c| c) {
                continue;
            }

            let joined = fragments[range.clone()]
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let window_text = normalize(&joined);

            if let Some(tier) = classify_window(features, &window_text) {
                claimed[range.clone()].iter_mut().for_each(|c| *c = true);
                let orders: Vec<usize> = fragments[range].iter().map(|f| f.fragment.order).collect();
                matches.push(MatchCandidate { first_index: orders[0], fragments: orders, tier });
            }
        }

        if !matches.is_empty() {
            break;
        }
    }

    matches
}

/// Sort by tier (`Exact` first), then by ascending fragment index.
pub fn rank(matches: &mut [MatchCandidate]) {
    matches.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.first_index.cmp(&b.first_index)));
}
