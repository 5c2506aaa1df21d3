//! Comparators for the active and archived lists.
//!
//! Every comparator orders "better" films first. Sorting goes through the
//! stable `sort_by`, so films equal on every key keep their input order.

use crate::context::RankingContext;
use crate::selections::{ArchivedSortMode, Mode, Selections, SortMode};
use catalog::{Film, FilmId, RatingStats};
use std::cmp::Ordering;
use std::collections::HashMap;

/// How much a neutral vote counts towards the ratio, relative to an upvote
pub const NEUTRAL_WEIGHT: f64 = 0.5;

/// Share of a film's voters in favour, with neutral votes at half weight.
/// A film nobody voted on has a ratio of 0.
pub fn vote_ratio(film: &Film) -> f64 {
    let voters = film.voter_count();
    if voters == 0 {
        return 0.0;
    }
    (film.upvotes as f64 + NEUTRAL_WEIGHT * film.neutral_votes as f64) / voters as f64
}

/// Total score, then vote ratio
pub fn by_score(a: &Film, b: &Film) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| vote_ratio(b).total_cmp(&vote_ratio(a)))
}

/// Vote ratio, then total score
pub fn by_ratio(a: &Film, b: &Film) -> Ordering {
    vote_ratio(b)
        .total_cmp(&vote_ratio(a))
        .then_with(|| b.total_score.cmp(&a.total_score))
}

/// Most recently archived first; films without a date go last
pub fn by_archive_date(a: &Film, b: &Film) -> Ordering {
    // None < Some(_), so the reversed comparison puts undated films last
    b.archive_date.cmp(&a.archive_date)
}

/// Mean stars, then number of ratings, then archive date.
///
/// Films missing from `stats` count as unrated (mean 0, count 0).
pub fn by_rating(
    stats: &HashMap<FilmId, RatingStats>,
) -> impl Fn(&Film, &Film) -> Ordering + '_ {
    let unrated = RatingStats { mean: 0.0, count: 0 };
    move |a, b| {
        let sa = stats.get(&a.id).unwrap_or(&unrated);
        let sb = stats.get(&b.id).unwrap_or(&unrated);
        sb.mean
            .total_cmp(&sa.mean)
            .then_with(|| sb.count.cmp(&sa.count))
            .then_with(|| by_archive_date(a, b))
    }
}

/// Rating statistics for every rated film in the context
pub fn rating_stats(context: &RankingContext) -> HashMap<FilmId, RatingStats> {
    context
        .ratings
        .iter()
        .filter(|(_, ratings)| !ratings.is_empty())
        .map(|(&film_id, ratings)| (film_id, RatingStats::from_ratings(ratings)))
        .collect()
}

/// Sort films in place for the list and sort mode the selections name
pub fn sort_films(films: &mut [Film], selections: &Selections, context: &RankingContext) {
    match (selections.mode, selections.sort, selections.archived_sort) {
        (Mode::Active, SortMode::Score, _) => films.sort_by(by_score),
        (Mode::Active, SortMode::Ratio, _) => films.sort_by(by_ratio),
        (Mode::Archived, _, ArchivedSortMode::Date) => films.sort_by(by_archive_date),
        (Mode::Archived, _, ArchivedSortMode::Rating) => {
            let stats = rating_stats(context);
            films.sort_by(by_rating(&stats));
        }
    }
}
