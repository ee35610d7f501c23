//! Pagemark - catalog entry verification on rendered document pages
//!
//! Checks that a catalog entry (book title, subject, grade level) appears in a
//! page's text layer and highlights every place it appears. Matching runs in
//! three phases: ISBN literal, exact substring, then a strict windowed word
//! match gated on grade numbers.
//!
//! The rendering surface is abstracted behind [`FragmentSurface`]; a
//! [`SearchSession`] drives polling, matching, painting and navigation on it.

pub mod config;
pub mod highlight;
pub mod interface;
pub mod layer;
pub mod matcher;
pub mod normalize;
pub mod poller;
pub mod session;

pub use config::SessionConfig;
pub use interface::*;
pub use layer::MemoryTextLayer;
pub use matcher::{find_matches, MatchOutcome, MatchPhase};
pub use normalize::normalize;
pub use session::SearchSession;
