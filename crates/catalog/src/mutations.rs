//! Mutations applied on behalf of a profile.
//!
//! Every operation checks its references first, then updates the stored
//! relation and the derived data (vote counters, rating statistics) for
//! the films it touched.

use crate::error::{CatalogError, Result};
use crate::index::check_stars;
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

impl Catalog {
    /// Add a profile. Names are trimmed and must be unique.
    pub fn create_profile(&mut self, name: &str) -> Result<Profile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidValue {
                field: "name".to_string(),
                value: name.to_string(),
            });
        }
        if self.profiles.values().any(|p| p.name == name) {
            return Err(CatalogError::DuplicateProfile(name.to_string()));
        }

        let id = self.profiles.keys().next_back().map_or(1, |id| id + 1);
        let profile = Profile {
            id,
            name: name.to_string(),
        };
        self.insert_profile(profile.clone());
        Ok(profile)
    }

    /// Add a film to the active list.
    ///
    /// The id is assigned here. Vote counters and archive state start out
    /// empty whatever the caller passed. A film whose IMDb id is already
    /// on either list is rejected.
    pub fn add_film(&mut self, film: Film) -> Result<Film> {
        let title = film.title.trim().to_string();
        if title.is_empty() {
            return Err(CatalogError::InvalidValue {
                field: "title".to_string(),
                value: film.title,
            });
        }
        let imdb_id = non_blank(film.imdb_id);
        if let Some(imdb_id) = &imdb_id {
            if self
                .films
                .values()
                .any(|f| f.imdb_id.as_deref() == Some(imdb_id.as_str()))
            {
                return Err(CatalogError::DuplicateFilm(imdb_id.clone()));
            }
        }
        if let Some(pid) = film.submitted_by_profile_id {
            if !self.profiles.contains_key(&pid) {
                return Err(CatalogError::missing_profile(pid));
            }
        }

        let id = self.films.keys().next_back().map_or(1, |id| id + 1);
        let film = Film {
            id,
            imdb_id,
            title,
            original_title: non_blank(film.original_title),
            year: film.year.trim().to_string(),
            genre: non_blank(film.genre),
            director: non_blank(film.director),
            actors: non_blank(film.actors),
            plot: non_blank(film.plot),
            poster_url: non_blank(film.poster_url),
            trailer_url: non_blank(film.trailer_url),
            teaser_text: non_blank(film.teaser_text),
            submitted_by_profile_id: film.submitted_by_profile_id,
            ..Film::default()
        };
        self.insert_film(film.clone());
        debug!("Added film {} ({})", film.id, film.title);
        Ok(film)
    }

    /// Set the title shown next to a translated one; blank text clears it
    pub fn set_original_title(&mut self, film_id: FilmId, text: &str) -> Result<()> {
        let film = self.film_mut(film_id)?;
        film.original_title = non_blank(Some(text.to_string()));
        Ok(())
    }

    /// Remove a profile together with everything it owns
    pub fn delete_profile(&mut self, profile_id: ProfileId) -> Result<Profile> {
        let profile = self
            .profiles
            .remove(&profile_id)
            .ok_or_else(|| CatalogError::missing_profile(profile_id))?;

        let touched: Vec<FilmId> = self
            .votes
            .keys()
            .filter(|(_, pid)| *pid == profile_id)
            .map(|&(fid, _)| fid)
            .collect();
        self.votes.retain(|(_, pid), _| *pid != profile_id);
        self.viewed.retain(|(_, pid)| *pid != profile_id);
        for ratings in self.ratings.values_mut() {
            ratings.retain(|r| r.profile_id != profile_id);
        }
        for comments in self.comments.values_mut() {
            comments.retain(|c| c.profile_id != profile_id);
        }
        for film in self.films.values_mut() {
            if film.submitted_by_profile_id == Some(profile_id) {
                film.submitted_by_profile_id = None;
            }
        }

        for film_id in touched {
            self.refresh_tally(film_id);
        }
        self.compute_rating_stats();
        debug!("Deleted profile {} ({})", profile.id, profile.name);
        Ok(profile)
    }

    /// Remove a film together with its votes, viewed marks, ratings and comments
    pub fn delete_film(&mut self, film_id: FilmId) -> Result<Film> {
        let film = self
            .films
            .remove(&film_id)
            .ok_or_else(|| CatalogError::missing_film(film_id))?;

        self.votes.retain(|(fid, _), _| *fid != film_id);
        self.viewed.retain(|(fid, _)| *fid != film_id);
        self.ratings.remove(&film_id);
        self.comments.remove(&film_id);
        self.rating_stats.remove(&film_id);
        debug!("Deleted film {} ({})", film.id, film.title);
        Ok(film)
    }

    /// Cast a vote.
    ///
    /// Casting the value the profile already holds retracts it, so the
    /// same gesture toggles a vote on and off. Casting `None` removes
    /// whatever is stored.
    pub fn cast_vote(
        &mut self,
        film_id: FilmId,
        profile_id: ProfileId,
        value: VoteValue,
    ) -> Result<VoteOutcome> {
        self.check_refs(film_id, profile_id)?;

        let key = (film_id, profile_id);
        let existing = self.votes.get(&key).copied();
        let requested = if existing == Some(value) {
            VoteValue::None
        } else {
            value
        };

        let outcome = match (existing, requested) {
            (None, VoteValue::None) => VoteOutcome::NoVote,
            (Some(_), VoteValue::None) => {
                self.votes.remove(&key);
                VoteOutcome::Removed
            }
            (Some(_), value) => {
                self.votes.insert(key, value);
                VoteOutcome::Updated
            }
            (None, value) => {
                self.votes.insert(key, value);
                VoteOutcome::Created
            }
        };

        self.refresh_tally(film_id);
        debug!(
            "Vote on film {} by profile {}: {:?}",
            film_id, profile_id, outcome
        );
        Ok(outcome)
    }

    /// Flip the viewed mark. Returns whether the film is now viewed.
    pub fn toggle_viewed(&mut self, film_id: FilmId, profile_id: ProfileId) -> Result<bool> {
        self.check_refs(film_id, profile_id)?;

        let key = (film_id, profile_id);
        if self.viewed.remove(&key) {
            Ok(false)
        } else {
            self.viewed.insert(key);
            Ok(true)
        }
    }

    /// Give an archived film 1 to 5 stars; last write wins
    pub fn set_rating(
        &mut self,
        film_id: FilmId,
        profile_id: ProfileId,
        stars: u8,
    ) -> Result<RecordOutcome> {
        self.check_refs(film_id, profile_id)?;
        check_stars(stars)?;
        self.require_archived(film_id)?;

        let outcome = self.insert_rating(Rating {
            film_id,
            profile_id,
            rating: stars,
        });
        self.refresh_rating_stats(film_id);
        Ok(outcome)
    }

    /// Returns whether a rating was removed
    pub fn delete_rating(&mut self, film_id: FilmId, profile_id: ProfileId) -> Result<bool> {
        self.check_refs(film_id, profile_id)?;

        let removed = match self.ratings.get_mut(&film_id) {
            Some(ratings) => {
                let before = ratings.len();
                ratings.retain(|r| r.profile_id != profile_id);
                ratings.len() != before
            }
            None => false,
        };
        self.refresh_rating_stats(film_id);
        Ok(removed)
    }

    /// Comment on an archived film; last write wins, creation time is kept
    pub fn set_comment(
        &mut self,
        film_id: FilmId,
        profile_id: ProfileId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        self.check_refs(film_id, profile_id)?;
        self.require_archived(film_id)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(CatalogError::InvalidValue {
                field: "comment_text".to_string(),
                value: text.to_string(),
            });
        }

        let created_at = self
            .comments
            .get(&film_id)
            .and_then(|comments| comments.iter().find(|c| c.profile_id == profile_id))
            .map_or(at, |c| c.created_at);

        Ok(self.insert_comment(Comment {
            film_id,
            profile_id,
            text: text.to_string(),
            created_at,
            updated_at: Some(at),
        }))
    }

    /// Returns whether a comment was removed
    pub fn delete_comment(&mut self, film_id: FilmId, profile_id: ProfileId) -> Result<bool> {
        self.check_refs(film_id, profile_id)?;

        Ok(match self.comments.get_mut(&film_id) {
            Some(comments) => {
                let before = comments.len();
                comments.retain(|c| c.profile_id != profile_id);
                comments.len() != before
            }
            None => false,
        })
    }

    /// Attach a teaser; blank text clears it
    pub fn set_teaser(
        &mut self,
        film_id: FilmId,
        text: &str,
        submitted_by: Option<ProfileId>,
    ) -> Result<()> {
        if let Some(pid) = submitted_by {
            if !self.profiles.contains_key(&pid) {
                return Err(CatalogError::missing_profile(pid));
            }
        }
        let film = self.film_mut(film_id)?;
        let text = text.trim();
        if text.is_empty() {
            film.teaser_text = None;
            film.submitted_by_profile_id = None;
        } else {
            film.teaser_text = Some(text.to_string());
            film.submitted_by_profile_id = submitted_by;
        }
        Ok(())
    }

    pub fn clear_teaser(&mut self, film_id: FilmId) -> Result<()> {
        self.set_teaser(film_id, "", None)
    }

    /// Move a film to the archive, recording when the group watched it
    pub fn archive_film(
        &mut self,
        film_id: FilmId,
        date: Option<NaiveDate>,
        commentary: Option<String>,
    ) -> Result<()> {
        let film = self.film_mut(film_id)?;
        film.is_archived = true;
        film.archive_date = date;
        film.archive_commentary = commentary;
        Ok(())
    }

    /// Put a film back on the active list.
    ///
    /// Archive metadata is kept. Ratings and comments only live on archived
    /// films, so the film's are dropped; returns how many records went.
    pub fn unarchive_film(&mut self, film_id: FilmId) -> Result<usize> {
        self.film_mut(film_id)?.is_archived = false;

        let dropped = self.ratings.remove(&film_id).map_or(0, |r| r.len())
            + self.comments.remove(&film_id).map_or(0, |c| c.len());
        self.rating_stats.remove(&film_id);
        if dropped > 0 {
            debug!("Unarchived film {}, dropped {} ratings and comments", film_id, dropped);
        }
        Ok(dropped)
    }

    pub fn set_archive_metadata(
        &mut self,
        film_id: FilmId,
        date: Option<NaiveDate>,
        commentary: Option<String>,
    ) -> Result<()> {
        let film = self.film_mut(film_id)?;
        film.archive_date = date;
        film.archive_commentary = commentary;
        Ok(())
    }

    fn film_mut(&mut self, film_id: FilmId) -> Result<&mut Film> {
        self.films
            .get_mut(&film_id)
            .ok_or_else(|| CatalogError::missing_film(film_id))
    }

    pub(crate) fn require_archived(&self, film_id: FilmId) -> Result<()> {
        match self.films.get(&film_id) {
            Some(film) if film.is_archived => Ok(()),
            Some(film) => Err(CatalogError::ValidationError(format!(
                "film {} ({}) is not archived",
                film.id, film.title
            ))),
            None => Err(CatalogError::missing_film(film_id)),
        }
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
