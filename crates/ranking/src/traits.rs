//! Core traits for the ranking pipeline.

use crate::context::RankingContext;
use catalog::Film;

/// A membership filter over a film list.
///
/// Filters take ownership of the list and hand back the films that pass,
/// keeping their relative order. They never fail: a field a filter cannot
/// read simply doesn't match.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Keep the films that pass this filter for the given viewer
    fn apply(&self, films: Vec<Film>, context: &RankingContext) -> Vec<Film>;
}
