//! Highlight painting on a fragment surface.
//!
//! The highlighter remembers every fragment it painted so that `clear` can
//! return the surface to its pristine form, and so that highlight state never
//! accumulates across searches. Surface failures on individual fragments are
//! logged and skipped. A fragment whose paint could not be removed because the
//! surface was unavailable stays tracked, so a later `clear` retries it.

use crate::config::Palette;
use crate::interface::{FragmentSurface, HighlightStyle, MatchCandidate, SurfaceError};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    palette: Palette,
    /// Fragments currently carrying a paint applied by this highlighter
    painted: BTreeSet<usize>,
}

impl Highlighter {
    pub fn new(palette: Palette) -> Self {
        Self { palette, painted: BTreeSet::new() }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Fragment orders currently painted, ascending
    pub fn painted(&self) -> impl Iterator<Item = usize> + '_ {
        self.painted.iter().copied()
    }

    pub fn is_clear(&self) -> bool {
        self.painted.is_empty()
    }

    /// Paint every match with its tier style, then promote the first match to
    /// the active style and scroll it into view. Any previous pass is cleared
    /// first.
    pub fn apply<S: FragmentSurface + ?Sized>(&mut self, surface: &S, matches: &[MatchCandidate]) {
        self.clear(surface);

        for candidate in matches {
            let style = self.palette.for_tier(candidate.tier).clone();
            self.paint_candidate(surface, candidate, &style);
        }

        if let Some(first) = matches.first() {
            self.activate(surface, first);
        }
    }

    /// Remove every paint this highlighter applied. No-op when nothing is painted.
    ///
    /// Detached fragments are forgotten. Fragments the surface could not reach
    /// right now stay tracked for the next call.
    pub fn clear<S: FragmentSurface + ?Sized>(&mut self, surface: &S) {
        for order in std::mem::take(&mut self.painted) {
            match surface.clear_paint(order) {
                Ok(()) => {}
                Err(e @ SurfaceError::Detached(_)) => {
                    tracing::debug!(order, error = %e, "clear_paint_skipped");
                }
                Err(e @ SurfaceError::Unavailable(_)) => {
                    tracing::debug!(order, error = %e, "clear_paint_deferred");
                    self.painted.insert(order);
                }
            }
        }
    }

    /// Move the active style from `previous` (restored to its tier color) to `current`.
    pub fn set_active<S: FragmentSurface + ?Sized>(
        &mut self,
        surface: &S,
        previous: Option<&MatchCandidate>,
        current: &MatchCandidate,
    ) {
        if let Some(prev) = previous {
            let style = self.palette.for_tier(prev.tier).clone();
            self.paint_candidate(surface, prev, &style);
        }
        self.activate(surface, current);
    }

    fn activate<S: FragmentSurface + ?Sized>(&mut self, surface: &S, candidate: &MatchCandidate) {
        let style = self.palette.active.clone();
        self.paint_candidate(surface, candidate, &style);
        if let Err(e) = surface.scroll_to(candidate.first_index) {
            tracing::debug!(order = candidate.first_index, error = %e, "scroll_skipped");
        }
    }

    fn paint_candidate<S: FragmentSurface + ?Sized>(
        &mut self,
        surface: &S,
        candidate: &MatchCandidate,
        style: &HighlightStyle,
    ) {
        for &order in &candidate.fragments {
            match surface.paint(order, style) {
                Ok(()) => {
                    self.painted.insert(order);
                }
                Err(e) => tracing::debug!(order, error = %e, "paint_skipped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{MatchTier, TextFragment};
    use crate::layer::MemoryTextLayer;

    fn layer(n: usize) -> MemoryTextLayer {
        MemoryTextLayer::with_fragments(TextFragment::from_texts((0..n).map(|i| format!("f{i}"))))
    }

    #[test]
    fn test_apply_paints_tiers_and_active() {
        let surface = layer(6);
        let palette = Palette::default();
        let mut hl = Highlighter::new(palette.clone());
        let matches = vec![
            MatchCandidate { fragments: vec![1, 2], tier: MatchTier::Exact, first_index: 1 },
            MatchCandidate::single(4, MatchTier::Partial),
        ];

        hl.apply(&surface, &matches);

        assert_eq!(surface.paint_of(1), Some(palette.active.clone()));
        assert_eq!(surface.paint_of(2), Some(palette.active.clone()));
        assert_eq!(surface.paint_of(4), Some(palette.partial.clone()));
        assert_eq!(surface.paint_of(0), None);
        assert_eq!(surface.scroll_requests(), vec![1]);
        assert_eq!(hl.painted().collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn test_apply_clears_previous_pass() {
        let surface = layer(4);
        let mut hl = Highlighter::default();
        hl.apply(&surface, &[MatchCandidate::single(0, MatchTier::Exact)]);
        hl.apply(&surface, &[MatchCandidate::single(3, MatchTier::Exact)]);

        assert_eq!(surface.paint_of(0), None);
        assert!(surface.paint_of(3).is_some());
        assert_eq!(surface.painted_orders(), vec![3]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let surface = layer(3);
        let mut hl = Highlighter::default();
        hl.clear(&surface);

        hl.apply(&surface, &[MatchCandidate::single(1, MatchTier::Partial)]);
        hl.clear(&surface);
        hl.clear(&surface);

        assert!(hl.is_clear());
        assert!(surface.painted_orders().is_empty());
    }

    #[test]
    fn test_detached_fragment_does_not_abort_pass() {
        let surface = layer(5);
        surface.detach(2);
        let palette = Palette::default();
        let mut hl = Highlighter::new(palette.clone());
        let matches = vec![
            MatchCandidate { fragments: vec![1, 2, 3], tier: MatchTier::Exact, first_index: 1 },
            MatchCandidate::single(4, MatchTier::Partial),
        ];

        hl.apply(&surface, &matches);

        assert_eq!(surface.paint_of(1), Some(palette.active.clone()));
        assert_eq!(surface.paint_of(2), None);
        assert_eq!(surface.paint_of(3), Some(palette.active.clone()));
        assert_eq!(surface.paint_of(4), Some(palette.partial));
        hl.clear(&surface);
        assert!(surface.painted_orders().is_empty());
    }

    #[test]
    fn test_scroll_failure_is_swallowed() {
        let surface = layer(2);
        surface.fail_scrolls(true);
        let mut hl = Highlighter::default();
        hl.apply(&surface, &[MatchCandidate::single(1, MatchTier::Exact)]);
        assert!(surface.paint_of(1).is_some());
        assert!(surface.scroll_requests().is_empty());
    }

    #[test]
    fn test_set_active_restores_previous_tier() {
        let surface = layer(4);
        let palette = Palette::default();
        let mut hl = Highlighter::new(palette.clone());
        let matches = vec![
            MatchCandidate::single(0, MatchTier::Exact),
            MatchCandidate::single(3, MatchTier::Partial),
        ];
        hl.apply(&surface, &matches);

        hl.set_active(&surface, Some(&matches[0]), &matches[1]);

        assert_eq!(surface.paint_of(0), Some(palette.exact));
        assert_eq!(surface.paint_of(3), Some(palette.active));
        assert_eq!(surface.scroll_requests(), vec![0, 3]);
    }

    #[test]
    fn test_unavailable_clear_is_retried() {
        let surface = layer(3);
        let mut hl = Highlighter::default();
        hl.apply(&surface, &[MatchCandidate::single(1, MatchTier::Exact)]);

        surface.fail_clears(true);
        hl.clear(&surface);
        assert!(surface.paint_of(1).is_some());
        assert_eq!(hl.painted().collect::<Vec<_>>(), vec![1]);

        surface.fail_clears(false);
        hl.clear(&surface);
        assert!(hl.is_clear());
        assert!(surface.painted_orders().is_empty());
    }

    #[test]
    fn test_detached_clear_is_forgotten() {
        let surface = layer(3);
        let mut hl = Highlighter::default();
        hl.apply(&surface, &[MatchCandidate::single(2, MatchTier::Exact)]);

        surface.detach(2);
        hl.clear(&surface);
        assert!(hl.is_clear());
    }
}
