//! Ranking and filtering of the shared film list.
//!
//! This crate provides:
//! - Selections: the caller-owned filter and sort choices
//! - RankingContext: the current viewer's votes, viewed marks and the ratings
//! - Filter trait and implementations (horror, vote state, text search)
//! - FilterPipeline for composing filters
//! - Comparators for the active and archived lists
//! - `rank`, which runs all of the above and returns a render-ready list
//!
//! ## Architecture
//! Every render goes through the same stages:
//! 1. Films not on the selected list (active or archived) are dropped
//! 2. Filters narrow the list: horror, then vote state, then text
//! 3. The survivors are sorted with a stable, fully tie-broken comparator
//! 4. Each film is wrapped into a RankedFilm; an empty result says why
//!
//! ## Example Usage
//! ```ignore
//! use ranking::{build_ranking_context, rank, HorrorMode, Selections};
//!
//! let context = build_ranking_context(&catalog, Some(profile_id))?;
//! let selections = Selections::active().with_horror(HorrorMode::Spooky);
//!
//! let films = catalog.films_with_tallies(selections.mode, selections.identity_scope());
//! let ranking = rank(films, &context, &selections);
//! ```

pub mod selections;
pub mod context;
pub mod traits;
pub mod filters;
pub mod filter_pipeline;
pub mod sort;
pub mod engine;

// Re-export main types
pub use context::{build_ranking_context, RankingContext};
pub use engine::{rank, EmptyReason, RankedFilm, Ranking, Synopsis};
pub use filter_pipeline::FilterPipeline;
pub use selections::{
    ActiveFilters, ArchivedSortMode, HorrorMode, Mode, Narrowing, Selection, SelectionError,
    Selections, SortMode, VoteFilter,
};
pub use sort::{vote_ratio, NEUTRAL_WEIGHT};
pub use traits::Filter;
