//! The FilterPipeline orchestrates multiple filters.
//!
//! Filters run in the order they were added, each narrowing the output of
//! the previous one.

use crate::context::RankingContext;
use crate::filters::{HorrorFilter, TextSearchFilter, VoteStateFilter};
use crate::selections::ActiveFilters;
use crate::traits::Filter;
use catalog::Film;
use tracing::debug;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(HorrorFilter::new(HorrorMode::Spooky))
///     .add_filter(TextSearchFilter::new("carpenter"));
///
/// let films = pipeline.apply(films, &context);
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// The pipeline for a set of filters that are in effect:
    /// horror, then vote state, then text.
    pub fn from_active(active: &ActiveFilters) -> Self {
        let mut pipeline = Self::new();
        if let Some(horror) = active.horror {
            pipeline = pipeline.add_filter(HorrorFilter::new(horror));
        }
        if let Some(vote_filter) = active.vote_filter {
            pipeline = pipeline.add_filter(VoteStateFilter::new(vote_filter));
        }
        if let Some(query) = &active.text_query {
            pipeline = pipeline.add_filter(TextSearchFilter::new(query));
        }
        pipeline
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply all filters in sequence, logging the count before and after each
    pub fn apply(&self, films: Vec<Film>, context: &RankingContext) -> Vec<Film> {
        let mut current = films;
        for filter in &self.filters {
            debug!(
                "Applying filter: {} (input count: {})",
                filter.name(),
                current.len()
            );
            current = filter.apply(current, context);
            debug!(
                "Filter applied: {} (output count: {})",
                filter.name(),
                current.len()
            );
        }
        current
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}
