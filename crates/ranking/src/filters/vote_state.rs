//! Filter on the selected profile's vote.

use crate::context::RankingContext;
use crate::selections::VoteFilter;
use crate::traits::Filter;
use catalog::Film;

/// Keeps films on which the viewer holds the selected vote state.
///
/// Without a selected profile there is nothing to compare against and
/// every film passes.
pub struct VoteStateFilter {
    filter: VoteFilter,
}

impl VoteStateFilter {
    pub fn new(filter: VoteFilter) -> Self {
        Self { filter }
    }
}

impl Filter for VoteStateFilter {
    fn name(&self) -> &str {
        "VoteStateFilter"
    }

    fn apply(&self, films: Vec<Film>, context: &RankingContext) -> Vec<Film> {
        if context.profile.is_none() || self.filter == VoteFilter::None {
            return films;
        }

        films
            .into_iter()
            .filter(|film| self.filter.matches(context.vote_on(film.id)))
            .collect()
    }
}
