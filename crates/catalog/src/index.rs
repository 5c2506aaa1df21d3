//! Catalog building, aggregate maintenance and validation.
//!
//! This module turns a [`Snapshot`] into a [`Catalog`] and back, and keeps
//! the derived data consistent:
//! - vote counters on every film (upvotes, neutral, downvotes, score)
//! - per-film rating statistics
//! - referential integrity of every relation

use crate::error::{CatalogError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

impl Catalog {
    /// Load a snapshot file and build a validated catalog.
    ///
    /// Steps:
    /// 1. Parse the snapshot
    /// 2. Insert profiles, films and every relation
    /// 3. Validate references, value ranges, and that ratings and comments
    ///    only sit on archived films
    /// 4. Recompute vote counters from the vote rows
    /// 5. Compute rating statistics
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading catalog snapshot from {:?}", path);
        let snapshot = parser::read_snapshot(path)?;
        let catalog = Self::from_snapshot(snapshot)?;

        let (profiles, films, votes) = catalog.counts();
        info!(
            "Loaded {} profiles, {} films, {} votes",
            profiles, films, votes
        );
        Ok(catalog)
    }

    /// Write the catalog back out as a snapshot file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        parser::write_snapshot(path, &self.to_snapshot())?;
        info!("Saved catalog snapshot to {:?}", path);
        Ok(())
    }

    /// Build a catalog from an already parsed snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut catalog = Catalog::new();

        for profile in snapshot.profiles {
            catalog.insert_profile(profile);
        }
        for film in snapshot.films {
            catalog.insert_film(film);
        }
        for vote in snapshot.votes {
            catalog.check_refs(vote.film_id, vote.profile_id)?;
            catalog.insert_vote(vote);
        }
        for mark in snapshot.viewed {
            catalog.check_refs(mark.film_id, mark.profile_id)?;
            catalog.insert_viewed(mark);
        }
        for rating in snapshot.ratings {
            catalog.check_refs(rating.film_id, rating.profile_id)?;
            catalog.require_archived(rating.film_id)?;
            catalog.insert_rating(rating);
        }
        for comment in snapshot.comments {
            catalog.check_refs(comment.film_id, comment.profile_id)?;
            catalog.require_archived(comment.film_id)?;
            catalog.insert_comment(comment);
        }

        catalog.validate()?;
        catalog.recompute_tallies();
        catalog.compute_rating_stats();
        Ok(catalog)
    }

    /// Serialisable copy of everything in the catalog
    pub fn to_snapshot(&self) -> Snapshot {
        let mut ratings: Vec<Rating> = self.ratings.values().flatten().copied().collect();
        ratings.sort_by_key(|r| (r.film_id, r.profile_id));

        let mut comments: Vec<Comment> = self.comments.values().flatten().cloned().collect();
        comments.sort_by_key(|c| (c.film_id, c.profile_id));

        Snapshot {
            profiles: self.profiles.values().cloned().collect(),
            films: self.films.values().cloned().collect(),
            votes: self
                .votes
                .iter()
                .map(|(&(film_id, profile_id), &vote)| Vote {
                    film_id,
                    profile_id,
                    vote,
                })
                .collect(),
            viewed: self
                .viewed
                .iter()
                .map(|&(film_id, profile_id)| ViewedMark {
                    film_id,
                    profile_id,
                })
                .collect(),
            ratings,
            comments,
        }
    }

    /// Recompute every film's vote counters from the stored votes
    pub fn recompute_tallies(&mut self) {
        let tallies = tally_votes(self.votes.iter().map(|(&(fid, _), &v)| (fid, v)));
        for (film_id, film) in self.films.iter_mut() {
            tallies
                .get(film_id)
                .copied()
                .unwrap_or_default()
                .apply_to(film);
        }
    }

    /// Recompute a single film's counters after one of its votes changed
    pub(crate) fn refresh_tally(&mut self, film_id: FilmId) {
        let mut tally = VoteTally::default();
        for (_, &value) in self.votes.range((film_id, ProfileId::MIN)..=(film_id, ProfileId::MAX)) {
            tally.record(value);
        }
        if let Some(film) = self.films.get_mut(&film_id) {
            tally.apply_to(film);
        }
    }

    /// Films on one list, newest first, with counters restricted to a set
    /// of profiles.
    ///
    /// With `None` (or an empty set) the stored counters are returned as is.
    /// Otherwise only the votes cast by the given profiles are counted, which
    /// lets a group see how a film fares among the people actually present.
    pub fn films_with_tallies(&self, mode: Mode, scope: Option<&[ProfileId]>) -> Vec<Film> {
        let scope = match scope {
            Some(ids) if !ids.is_empty() => ids.iter().copied().collect::<HashSet<_>>(),
            _ => return self.films(mode),
        };

        let tallies = tally_votes(
            self.votes
                .iter()
                .filter(|((_, pid), _)| scope.contains(pid))
                .map(|(&(fid, _), &v)| (fid, v)),
        );

        self.films
            .values()
            .rev()
            .filter(|f| f.mode() == mode)
            .map(|film| {
                let mut film = film.clone();
                tallies
                    .get(&film.id)
                    .copied()
                    .unwrap_or_default()
                    .apply_to(&mut film);
                film
            })
            .collect()
    }

    /// Compute rating statistics for every film in parallel
    pub fn compute_rating_stats(&mut self) {
        let rating_stats = self
            .ratings
            .par_iter()
            .filter(|(_, ratings)| !ratings.is_empty())
            .map(|(&film_id, ratings)| (film_id, RatingStats::from_ratings(ratings)))
            .collect();
        self.rating_stats = rating_stats;
    }

    /// Recompute the statistics for one film
    pub(crate) fn refresh_rating_stats(&mut self, film_id: FilmId) {
        match self.ratings.get(&film_id) {
            Some(ratings) if !ratings.is_empty() => {
                self.rating_stats.insert(film_id, RatingStats::from_ratings(ratings));
            }
            _ => {
                self.rating_stats.remove(&film_id);
            }
        }
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - profile names are unique
    /// - ratings are in the 1-5 range
    /// - teaser submitters exist
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for profile in self.profiles.values() {
            if !names.insert(profile.name.as_str()) {
                return Err(CatalogError::DuplicateProfile(profile.name.clone()));
            }
        }

        for rating in self.ratings.values().flatten() {
            check_stars(rating.rating)?;
        }

        for film in self.films.values() {
            if let Some(pid) = film.submitted_by_profile_id {
                if !self.profiles.contains_key(&pid) {
                    return Err(CatalogError::missing_profile(pid));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn check_refs(&self, film_id: FilmId, profile_id: ProfileId) -> Result<()> {
        if !self.films.contains_key(&film_id) {
            return Err(CatalogError::missing_film(film_id));
        }
        if !self.profiles.contains_key(&profile_id) {
            return Err(CatalogError::missing_profile(profile_id));
        }
        Ok(())
    }
}

pub(crate) fn check_stars(stars: u8) -> Result<()> {
    if (1..=5).contains(&stars) {
        Ok(())
    } else {
        Err(CatalogError::InvalidValue {
            field: "rating".to_string(),
            value: stars.to_string(),
        })
    }
}

fn tally_votes(votes: impl Iterator<Item = (FilmId, VoteValue)>) -> HashMap<FilmId, VoteTally> {
    let mut tallies: HashMap<FilmId, VoteTally> = HashMap::new();
    for (film_id, value) in votes {
        tallies.entry(film_id).or_default().record(value);
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            profiles: vec![
                Profile { id: 1, name: "Ana".to_string() },
                Profile { id: 2, name: "Bruno".to_string() },
                Profile { id: 3, name: "Chloé".to_string() },
            ],
            films: vec![
                Film {
                    // stale counters, must be recomputed on load
                    upvotes: 40,
                    total_score: 40,
                    ..Film::new(1, "Alien")
                },
                Film {
                    is_archived: true,
                    ..Film::new(2, "Heat")
                },
            ],
            votes: vec![
                Vote { film_id: 1, profile_id: 1, vote: VoteValue::Up },
                Vote { film_id: 1, profile_id: 2, vote: VoteValue::Down },
                Vote { film_id: 1, profile_id: 3, vote: VoteValue::Neutral },
                Vote { film_id: 2, profile_id: 1, vote: VoteValue::None },
            ],
            viewed: vec![],
            ratings: vec![
                Rating { film_id: 2, profile_id: 1, rating: 4 },
                Rating { film_id: 2, profile_id: 2, rating: 5 },
            ],
            comments: vec![],
        }
    }

    #[test]
    fn test_load_recomputes_counters() {
        let catalog = Catalog::from_snapshot(snapshot()).unwrap();
        let alien = catalog.get_film(1).unwrap();

        assert_eq!(alien.upvotes, 1);
        assert_eq!(alien.downvotes, 1);
        assert_eq!(alien.neutral_votes, 1);
        assert_eq!(alien.total_score, 0);
        // the zero vote row is not stored
        assert_eq!(catalog.counts(), (3, 2, 3));
    }

    #[test]
    fn test_rating_stats() {
        let catalog = Catalog::from_snapshot(snapshot()).unwrap();
        let stats = catalog.rating_stats(2).unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 4.5).abs() < 1e-9);
        assert!(catalog.rating_stats(1).is_none());
    }

    #[test]
    fn test_scoped_tallies() {
        let catalog = Catalog::from_snapshot(snapshot()).unwrap();

        let scoped = catalog.films_with_tallies(Mode::Active, Some(&[1, 3]));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].upvotes, 1);
        assert_eq!(scoped[0].neutral_votes, 1);
        assert_eq!(scoped[0].downvotes, 0);
        assert_eq!(scoped[0].total_score, 1);

        // an empty scope means everyone
        let everyone = catalog.films_with_tallies(Mode::Active, Some(&[]));
        assert_eq!(everyone[0].total_score, 0);
    }

    #[test]
    fn test_dangling_vote_rejected() {
        let mut snapshot = snapshot();
        snapshot.votes.push(Vote { film_id: 99, profile_id: 1, vote: VoteValue::Up });

        let err = Catalog::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, CatalogError::MissingReference { id: 99, .. }));
    }

    #[test]
    fn test_out_of_range_rating_rejected() {
        let mut snapshot = snapshot();
        snapshot.ratings.push(Rating { film_id: 2, profile_id: 3, rating: 6 });

        assert!(matches!(
            Catalog::from_snapshot(snapshot),
            Err(CatalogError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rating_on_active_film_rejected() {
        let mut snapshot = snapshot();
        snapshot.ratings.push(Rating { film_id: 1, profile_id: 3, rating: 3 });

        assert!(matches!(
            Catalog::from_snapshot(snapshot),
            Err(CatalogError::ValidationError(_))
        ));
    }

    #[test]
    fn test_comment_on_active_film_rejected() {
        let mut snapshot = snapshot();
        snapshot.comments.push(Comment {
            film_id: 1,
            profile_id: 2,
            text: "Too early to say".to_string(),
            created_at: Default::default(),
            updated_at: None,
        });

        assert!(matches!(
            Catalog::from_snapshot(snapshot),
            Err(CatalogError::ValidationError(_))
        ));
    }

    #[test]
    fn test_scoped_tallies_list_newest_first() {
        let mut snapshot = snapshot();
        snapshot.films.push(Film::new(3, "Ronin"));
        snapshot.films.push(Film::new(4, "Thief"));
        let catalog = Catalog::from_snapshot(snapshot).unwrap();

        for scope in [None, Some(&[2][..])] {
            let ids: Vec<FilmId> = catalog
                .films_with_tallies(Mode::Active, scope)
                .iter()
                .map(|f| f.id)
                .collect();
            assert_eq!(ids, vec![4, 3, 1]);
        }
    }

    #[test]
    fn test_duplicate_profile_name_rejected() {
        let mut snapshot = snapshot();
        snapshot.profiles.push(Profile { id: 4, name: "Ana".to_string() });

        assert!(matches!(
            Catalog::from_snapshot(snapshot),
            Err(CatalogError::DuplicateProfile(_))
        ));
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let catalog = Catalog::from_snapshot(snapshot()).unwrap();
        catalog.save_to_file(&path).unwrap();

        let reloaded = Catalog::load_from_file(&path).unwrap();
        assert_eq!(reloaded.counts(), catalog.counts());
        assert_eq!(reloaded.get_film(1), catalog.get_film(1));
        assert_eq!(reloaded.film_ratings(2).len(), 2);
    }

    #[test]
    fn test_load_bundled_sample() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/snapshot.json");
        let catalog = Catalog::load_from_file(&path).unwrap();

        assert_eq!(catalog.films(Mode::Active).len(), 5);
        assert_eq!(catalog.films(Mode::Archived).len(), 3);
        assert_eq!(catalog.get_film(1).unwrap().total_score, 1);
        assert_eq!(catalog.get_film(2).unwrap().year, "1967");
        assert_eq!(catalog.get_film(8).unwrap().archive_date, None);
        assert_eq!(catalog.rating_stats(6).unwrap().count, 3);
    }
}
