//! The `rank` entry point and the view-model it produces.
//!
//! `rank` is a pure function of the film snapshot, the viewer context and
//! the caller's selections. It filters (horror, vote state, text), sorts,
//! and wraps each surviving film into a render-ready [`RankedFilm`].

use crate::context::RankingContext;
use crate::filter_pipeline::FilterPipeline;
use crate::selections::{ActiveFilters, Mode, Selections};
use crate::sort::{self, vote_ratio};
use catalog::{Film, ProfileId, RatingStats, VoteValue};
use tracing::{debug, instrument};

/// What a film card shows under its title. A teaser hides plot and trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synopsis {
    Teaser {
        text: String,
        submitted_by: Option<ProfileId>,
    },
    Plot {
        plot: Option<String>,
        trailer_url: Option<String>,
    },
}

impl Synopsis {
    pub fn of(film: &Film) -> Self {
        match film.teaser_text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Synopsis::Teaser {
                text: text.to_string(),
                submitted_by: film.submitted_by_profile_id,
            },
            _ => Synopsis::Plot {
                plot: film.plot.clone(),
                trailer_url: film.trailer_url.clone(),
            },
        }
    }
}

/// One render-ready row of the ranked list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFilm {
    /// 1-based place in the list
    pub position: usize,
    pub film: Film,
    pub vote_ratio: f64,
    /// Star statistics, archived list only
    pub rating: Option<RatingStats>,
    pub viewer_vote: VoteValue,
    pub viewed: bool,
    pub synopsis: Synopsis,
}

impl RankedFilm {
    /// Mean stars to one decimal, or None while unrated
    pub fn display_rating(&self) -> Option<String> {
        self.rating
            .filter(|stats| stats.count > 0)
            .map(|stats| format!("{:.1}", stats.mean))
    }

    /// Ratio as a whole percentage
    pub fn ratio_percent(&self) -> u32 {
        (self.vote_ratio * 100.0).round() as u32
    }
}

/// Why a ranking came out empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// The list itself is empty; nothing narrowed it
    NoFilms,
    /// These filters removed every film
    Filtered(ActiveFilters),
}

/// Result of one ranking run
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub entries: Vec<RankedFilm>,
    /// Set only when `entries` is empty
    pub empty_reason: Option<EmptyReason>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn films(&self) -> impl Iterator<Item = &Film> {
        self.entries.iter().map(|entry| &entry.film)
    }
}

/// Rank a film snapshot for one viewer.
///
/// Films not on the selected list are dropped first; that is not reported
/// as a narrowing filter. Never fails.
#[instrument(skip_all, fields(mode = ?selections.mode, films = films.len()))]
pub fn rank(films: Vec<Film>, context: &RankingContext, selections: &Selections) -> Ranking {
    let mut films: Vec<Film> = films
        .into_iter()
        .filter(|film| film.mode() == selections.mode)
        .collect();

    let active = selections.active_filters(context.profile.is_some());
    films = FilterPipeline::from_active(&active).apply(films, context);
    sort::sort_films(&mut films, selections, context);
    debug!("Ranked {} films", films.len());

    if films.is_empty() {
        let reason = if active.is_empty() {
            EmptyReason::NoFilms
        } else {
            EmptyReason::Filtered(active)
        };
        return Ranking {
            entries: Vec::new(),
            empty_reason: Some(reason),
        };
    }

    let stats = match selections.mode {
        Mode::Archived => Some(sort::rating_stats(context)),
        Mode::Active => None,
    };

    let entries = films
        .into_iter()
        .enumerate()
        .map(|(i, film)| RankedFilm {
            position: i + 1,
            vote_ratio: vote_ratio(&film),
            rating: stats.as_ref().map(|stats| {
                stats
                    .get(&film.id)
                    .copied()
                    .unwrap_or(RatingStats { mean: 0.0, count: 0 })
            }),
            viewer_vote: context.vote_on(film.id),
            viewed: context.has_viewed(film.id),
            synopsis: Synopsis::of(&film),
            film,
        })
        .collect();

    Ranking {
        entries,
        empty_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selections::{HorrorMode, VoteFilter};
    use catalog::Rating;

    #[test]
    fn test_teaser_replaces_plot() {
        let film = Film {
            plot: Some("Everyone dies".to_string()),
            trailer_url: Some("https://example.org/t".to_string()),
            teaser_text: Some(" Trust me ".to_string()),
            submitted_by_profile_id: Some(3),
            ..Film::new(1, "Film")
        };
        assert_eq!(
            Synopsis::of(&film),
            Synopsis::Teaser { text: "Trust me".to_string(), submitted_by: Some(3) }
        );

        let film = Film {
            teaser_text: Some("  ".to_string()),
            ..film
        };
        assert!(matches!(Synopsis::of(&film), Synopsis::Plot { plot: Some(_), trailer_url: Some(_) }));
    }

    #[test]
    fn test_rank_handles_extreme_vote_counts() {
        let films = vec![
            Film {
                upvotes: u32::MAX,
                downvotes: 1,
                total_score: i64::from(u32::MAX) - 1,
                ..Film::new(1, "Landslide")
            },
            Film::new(2, "Unseen"),
        ];
        let ranking = rank(films, &RankingContext::anonymous(), &Selections::active());

        assert_eq!(ranking.films().map(|f| f.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!((ranking.entries[0].vote_ratio - 1.0).abs() < 1e-6);
        assert_eq!(ranking.entries[0].ratio_percent(), 100);
    }

    #[test]
    fn test_rank_drops_films_from_the_other_list() {
        let films = vec![
            Film::new(1, "Active"),
            Film { is_archived: true, ..Film::new(2, "Archived") },
        ];
        let ranking = rank(films.clone(), &RankingContext::anonymous(), &Selections::active());
        assert_eq!(ranking.films().map(|f| f.id).collect::<Vec<_>>(), vec![1]);

        let ranking = rank(films, &RankingContext::anonymous(), &Selections::archived());
        assert_eq!(ranking.films().map(|f| f.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_entries_carry_viewer_state() {
        let mut context = RankingContext::for_profile(1);
        context.votes.insert(1, VoteValue::Neutral);
        context.viewed.insert(1);

        let films = vec![Film { upvotes: 1, total_score: 1, ..Film::new(1, "Film") }];
        let ranking = rank(films, &context, &Selections::active());

        let entry = &ranking.entries[0];
        assert_eq!(entry.position, 1);
        assert_eq!(entry.viewer_vote, VoteValue::Neutral);
        assert!(entry.viewed);
        assert_eq!(entry.ratio_percent(), 100);
        assert!(entry.rating.is_none());
        assert_eq!(ranking.empty_reason, None);
    }

    #[test]
    fn test_archived_entries_carry_rating() {
        let mut context = RankingContext::anonymous();
        context.ratings.insert(
            1,
            vec![
                Rating { film_id: 1, profile_id: 1, rating: 4 },
                Rating { film_id: 1, profile_id: 2, rating: 5 },
                Rating { film_id: 1, profile_id: 3, rating: 5 },
            ],
        );
        let films = vec![
            Film { is_archived: true, ..Film::new(1, "Rated") },
            Film { is_archived: true, ..Film::new(2, "Unrated") },
        ];

        let ranking = rank(films, &context, &Selections::archived());
        assert_eq!(ranking.entries[0].display_rating().as_deref(), Some("4.7"));
        assert_eq!(ranking.entries[1].rating.map(|s| s.count), Some(0));
        assert_eq!(ranking.entries[1].display_rating(), None);
    }

    #[test]
    fn test_empty_reasons() {
        let context = RankingContext::anonymous();

        let ranking = rank(Vec::new(), &context, &Selections::active());
        assert_eq!(ranking.empty_reason, Some(EmptyReason::NoFilms));

        let films = vec![Film { genre: Some("Drama".to_string()), ..Film::new(1, "Film") }];
        let selections = Selections::active()
            .with_horror(HorrorMode::Spooky)
            // no profile selected, so this one never runs
            .with_vote_filter(VoteFilter::Upvoted);
        let ranking = rank(films, &context, &selections);

        match ranking.empty_reason {
            Some(EmptyReason::Filtered(active)) => {
                assert_eq!(active.horror, Some(HorrorMode::Spooky));
                assert_eq!(active.vote_filter, None);
                assert_eq!(active.text_query, None);
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }
}
