//! Pagemark Interface Definition
//!
//! Shared types for the matcher and the search session, plus the capability
//! trait a rendering surface implements so the engine can paint its text layer.
//! This file is the source of truth for everything crossing the crate boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Confidence classification of a match.
///
/// Declaration order is rank order: `Exact` sorts before `Partial`, which sorts
/// before `Word`. `Word` is reserved and never produced by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchTier {
    Exact,
    Partial,
    Word,
}

/// Lifecycle of a search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Found,
    NotFound,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One addressable unit of text exposed by the rendering surface.
///
/// `order` is the fragment's position among its siblings and doubles as its
/// identity: it is stable for the lifetime of one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub order: usize,
    pub text: String,
}

impl TextFragment {
    pub fn new(order: usize, text: impl Into<String>) -> Self {
        Self { order, text: text.into() }
    }

    /// Build an ordered fragment list from raw strings, numbering them from 0.
    pub fn from_texts<I, S>(texts: I) -> Vec<TextFragment>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(order, text)| TextFragment::new(order, text))
            .collect()
    }
}

/// Optional disambiguating hints supplied with a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHints {
    pub isbn: Option<String>,
    /// Brand/publisher name. Carried for diagnostics; does not affect matching.
    pub marca: Option<String>,
}

impl SearchHints {
    pub fn with_isbn(isbn: impl Into<String>) -> Self {
        Self { isbn: Some(isbn.into()), marca: None }
    }
}

/// A group of fragments that together match the query.
///
/// `fragments` holds fragment orders in ascending order; `first_index` is the
/// order of the first of them and is the secondary ranking key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub fragments: Vec<usize>,
    pub tier: MatchTier,
    pub first_index: usize,
}

impl MatchCandidate {
    pub fn single(order: usize, tier: MatchTier) -> Self {
        Self { fragments: vec![order], tier, first_index: order }
    }
}

/// Observable state of a search session.
///
/// Invariants: `total_matches == matches.len()` and, whenever there are
/// matches, `active_index < total_matches`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchState {
    pub query: String,
    pub matches: Vec<MatchCandidate>,
    pub active_index: usize,
    pub status: SearchStatus,
    pub total_matches: usize,
}

impl SearchState {
    pub(crate) fn searching(query: &str) -> Self {
        Self {
            query: query.to_string(),
            status: SearchStatus::Searching,
            ..Self::default()
        }
    }

    pub(crate) fn not_found(query: &str) -> Self {
        Self {
            query: query.to_string(),
            status: SearchStatus::NotFound,
            ..Self::default()
        }
    }

    pub(crate) fn found(query: &str, matches: Vec<MatchCandidate>) -> Self {
        if matches.is_empty() {
            return Self::not_found(query);
        }
        Self {
            query: query.to_string(),
            total_matches: matches.len(),
            matches,
            active_index: 0,
            status: SearchStatus::Found,
        }
    }

    /// The currently active match, if any
    pub fn active(&self) -> Option<&MatchCandidate> {
        self.matches.get(self.active_index)
    }

    /// 1-based position and total for a "3 of 12" indicator
    pub fn indicator(&self) -> Option<(usize, usize)> {
        if self.total_matches == 0 {
            None
        } else {
            Some((self.active_index + 1, self.total_matches))
        }
    }
}

/// Presentation attributes painted onto a fragment.
///
/// Values are CSS-style strings handed verbatim to the surface; empty strings
/// mean "leave unset".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightStyle {
    pub background: String,
    #[serde(default)]
    pub text_color: String,
    #[serde(default)]
    pub outline: String,
    #[serde(default)]
    pub box_shadow: String,
}

impl HighlightStyle {
    pub fn background(color: impl Into<String>) -> Self {
        Self {
            background: color.into(),
            text_color: String::new(),
            outline: String::new(),
            box_shadow: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure reported by a rendering surface for a single fragment operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Fragment {0} is no longer attached to the document")]
    Detached(usize),
    #[error("Surface unavailable: {0}")]
    Unavailable(String),
}

/// Error type for pagemark operations
#[derive(Debug, Error)]
pub enum PagemarkError {
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Poll error: {0}")]
    Poll(#[from] crate::poller::PollError),
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SURFACE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// The capability a text-layer renderer exposes to the engine.
///
/// The engine never touches presentation primitives directly; every paint,
/// cleanup and scroll goes through this trait, keyed by fragment order.
///
/// A `SearchSession` calls `paint`, `clear_paint` and `scroll_to` while holding
/// its internal lock. Implementations may read `SearchSession::state` or a
/// `subscribe` receiver from these callbacks, but must not call `search`,
/// `next`, `previous` or `clear` on the same session.
pub trait FragmentSurface: Send + Sync {
    /// Current fragments in document order. Empty until the layer is rendered.
    /// Must be idempotent.
    fn fragments(&self) -> Vec<TextFragment>;

    /// Apply `style` to a fragment and mark it as highlighted by this engine
    fn paint(&self, order: usize, style: &HighlightStyle) -> Result<(), SurfaceError>;

    /// Remove every style trace this engine applied to a fragment
    fn clear_paint(&self, order: usize) -> Result<(), SurfaceError>;

    /// Bring a fragment into view. Best effort.
    fn scroll_to(&self, order: usize) -> Result<(), SurfaceError>;
}

impl<T: FragmentSurface + ?Sized> FragmentSurface for std::sync::Arc<T> {
    fn fragments(&self) -> Vec<TextFragment> {
        (**self).fragments()
    }

    fn paint(&self, order: usize, style: &HighlightStyle) -> Result<(), SurfaceError> {
        (**self).paint(order, style)
    }

    fn clear_paint(&self, order: usize) -> Result<(), SurfaceError> {
        (**self).clear_paint(order)
    }

    fn scroll_to(&self, order: usize) -> Result<(), SurfaceError> {
        (**self).scroll_to(order)
    }
}
