//! In-memory text layer.
//!
//! A [`FragmentSurface`] that keeps its fragments and the paints applied to
//! them in memory. It can be rendered late (fragments set after a search has
//! started) and individual fragments can be detached to mimic handles that
//! were removed from the document. Used by the CLI, the benchmark and tests,
//! and as a reference for surface implementors.

use crate::interface::{FragmentSurface, HighlightStyle, SurfaceError, TextFragment};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct LayerState {
    fragments: Vec<TextFragment>,
    paints: BTreeMap<usize, HighlightStyle>,
    detached: BTreeSet<usize>,
    scrolls: Vec<usize>,
}

impl LayerState {
    fn check_attached(&self, order: usize) -> Result<(), SurfaceError> {
        if self.detached.contains(&order) || !self.fragments.iter().any(|f| f.order == order) {
            return Err(SurfaceError::Detached(order));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTextLayer {
    state: Mutex<LayerState>,
    reads: AtomicUsize,
    fail_scrolls: AtomicBool,
    fail_clears: AtomicBool,
}

impl MemoryTextLayer {
    /// An unrendered layer: `fragments()` is empty until `set_fragments`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragments(fragments: Vec<TextFragment>) -> Self {
        let layer = Self::new();
        layer.set_fragments(fragments);
        layer
    }

    /// Replace the rendered fragments. Paints on the old render are dropped.
    pub fn set_fragments(&self, fragments: Vec<TextFragment>) {
        let mut state = self.state.lock();
        state.fragments = fragments;
        state.paints.clear();
        state.detached.clear();
    }

    /// Mark a fragment as removed from the document
    pub fn detach(&self, order: usize) {
        let mut state = self.state.lock();
        state.paints.remove(&order);
        state.detached.insert(order);
    }

    /// Make every `scroll_to` call fail
    pub fn fail_scrolls(&self, fail: bool) {
        self.fail_scrolls.store(fail, Ordering::SeqCst);
    }

    /// Make every `clear_paint` call fail as if the renderer were busy
    pub fn fail_clears(&self, fail: bool) {
        self.fail_clears.store(fail, Ordering::SeqCst);
    }

    /// Style currently painted on a fragment
    pub fn paint_of(&self, order: usize) -> Option<HighlightStyle> {
        self.state.lock().paints.get(&order).cloned()
    }

    /// Orders of every painted fragment, ascending
    pub fn painted_orders(&self) -> Vec<usize> {
        self.state.lock().paints.keys().copied().collect()
    }

    /// Successful scroll requests, oldest first
    pub fn scroll_requests(&self) -> Vec<usize> {
        self.state.lock().scrolls.clone()
    }

    /// Number of times `fragments()` was called
    pub fn fragment_reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FragmentSurface for MemoryTextLayer {
    fn fragments(&self) -> Vec<TextFragment> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        state
            .fragments
            .iter()
            .filter(|f| !state.detached.contains(&f.order))
            .cloned()
            .collect()
    }

    fn paint(&self, order: usize, style: &HighlightStyle) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_attached(order)?;
        state.paints.insert(order, style.clone());
        Ok(())
    }

    fn clear_paint(&self, order: usize) -> Result<(), SurfaceError> {
        if self.fail_clears.load(Ordering::SeqCst) {
            return Err(SurfaceError::Unavailable("renderer busy".into()));
        }
        let mut state = self.state.lock();
        state.check_attached(order)?;
        state.paints.remove(&order);
        Ok(())
    }

    fn scroll_to(&self, order: usize) -> Result<(), SurfaceError> {
        if self.fail_scrolls.load(Ordering::SeqCst) {
            return Err(SurfaceError::Unavailable("scrolling disabled".into()));
        }
        let mut state = self.state.lock();
        state.check_attached(order)?;
        state.scrolls.push(order);
        Ok(())
    }
}
