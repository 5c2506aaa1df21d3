//! Core domain types for the film voting catalog.
//!
//! This module defines the records exchanged with the voting backend
//! (films, profiles, votes, viewed marks, ratings, comments) and the
//! [`Catalog`] that holds them in memory.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique, stable identifier for a film
pub type FilmId = u32;

/// Unique identifier for a voting profile
pub type ProfileId = u32;

// =============================================================================
// Profiles
// =============================================================================

/// A named voter within the shared list. Not an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
}

// =============================================================================
// Films
// =============================================================================

/// Which of the two lists a film currently lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Active,
    Archived,
}

/// A film on the shared list.
///
/// The vote counters are aggregates over the current non-zero votes.
/// The catalog keeps them in sync; consumers treat them as read-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Film {
    pub id: FilmId,
    #[serde(default)]
    pub imdb_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    /// Free text as returned by the movie database ("1999", "2019–2020")
    #[serde(default, deserialize_with = "crate::parser::year_text")]
    pub year: String,
    /// Comma separated genre tags, e.g. "Horror, Comedy"
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    /// Spoiler-free note shown instead of the plot and trailer
    #[serde(default)]
    pub teaser_text: Option<String>,
    #[serde(default)]
    pub submitted_by_profile_id: Option<ProfileId>,

    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub neutral_votes: u32,
    #[serde(default)]
    pub downvotes: u32,
    /// upvotes - downvotes; neutral votes don't move it
    #[serde(default)]
    pub total_score: i64,

    #[serde(default, deserialize_with = "crate::parser::flag")]
    pub is_archived: bool,
    #[serde(default, deserialize_with = "crate::parser::optional_iso_date")]
    pub archive_date: Option<NaiveDate>,
    #[serde(default)]
    pub archive_commentary: Option<String>,
}

impl Film {
    /// Create a film with only the required fields set
    pub fn new(id: FilmId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn mode(&self) -> Mode {
        if self.is_archived {
            Mode::Archived
        } else {
            Mode::Active
        }
    }

    /// Number of profiles holding a non-zero vote on this film
    pub fn voter_count(&self) -> u64 {
        u64::from(self.upvotes) + u64::from(self.neutral_votes) + u64::from(self.downvotes)
    }
}

// =============================================================================
// Votes
// =============================================================================

/// A profile's vote on a film.
///
/// On the wire the backend encodes this as -1 (down), 0 (none),
/// 1 (up) and 2 (neutral).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteValue {
    #[default]
    None,
    Up,
    Neutral,
    Down,
}

impl VoteValue {
    /// Decode the backend's integer encoding
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::None),
            1 => Ok(VoteValue::Up),
            2 => Ok(VoteValue::Neutral),
            _ => Err(CatalogError::InvalidValue {
                field: "vote".to_string(),
                value: code.to_string(),
            }),
        }
    }

    /// Encode for the backend
    pub fn code(self) -> i8 {
        match self {
            VoteValue::Down => -1,
            VoteValue::None => 0,
            VoteValue::Up => 1,
            VoteValue::Neutral => 2,
        }
    }

    /// Whether this value counts as a vote at all
    pub fn is_cast(self) -> bool {
        self != VoteValue::None
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = CatalogError;

    fn try_from(code: i8) -> Result<Self> {
        VoteValue::from_code(code as i64)
    }
}

impl From<VoteValue> for i8 {
    fn from(value: VoteValue) -> i8 {
        value.code()
    }
}

/// One row of the (film, profile) -> vote relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub film_id: FilmId,
    pub profile_id: ProfileId,
    pub vote: VoteValue,
}

/// What a vote request did to the stored relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Created,
    Updated,
    /// The vote was retracted (same value cast again, or an explicit none)
    Removed,
    /// Nothing stored and nothing requested
    NoVote,
}

/// Aggregate vote counters for one film
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    pub upvotes: u32,
    pub neutral_votes: u32,
    pub downvotes: u32,
}

impl VoteTally {
    pub fn record(&mut self, value: VoteValue) {
        match value {
            VoteValue::Up => self.upvotes += 1,
            VoteValue::Neutral => self.neutral_votes += 1,
            VoteValue::Down => self.downvotes += 1,
            VoteValue::None => {}
        }
    }

    pub fn total_score(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }

    /// Overwrite the film's counters with this tally
    pub fn apply_to(&self, film: &mut Film) {
        film.upvotes = self.upvotes;
        film.neutral_votes = self.neutral_votes;
        film.downvotes = self.downvotes;
        film.total_score = self.total_score();
    }
}

/// Profile names grouped by the vote they hold on one film
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilmVoters {
    pub upvoters: Vec<String>,
    pub neutral_voters: Vec<String>,
    pub downvoters: Vec<String>,
}

// =============================================================================
// Viewed marks, ratings and comments
// =============================================================================

/// Presence-only (film, profile) relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewedMark {
    pub film_id: FilmId,
    pub profile_id: ProfileId,
}

/// Star rating given to an archived film
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub film_id: FilmId,
    pub profile_id: ProfileId,
    /// 1 to 5 stars
    pub rating: u8,
}

/// Comment left on an archived film; one per (film, profile)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub film_id: FilmId,
    pub profile_id: ProfileId,
    #[serde(rename = "comment_text")]
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Whether a last-write-wins record was inserted or overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
}

/// Precomputed star rating statistics for a film
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub mean: f64,
    pub count: u32,
}

impl RatingStats {
    /// Mean and count of a set of ratings; a film without ratings scores 0
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        let count = ratings.len() as u32;
        if count == 0 {
            return Self { mean: 0.0, count };
        }
        let total: u32 = ratings.iter().map(|r| r.rating as u32).sum();
        Self {
            mean: total as f64 / count as f64,
            count,
        }
    }
}

// =============================================================================
// Snapshot - the serialised catalog
// =============================================================================

/// Everything the backend hands out, in one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub profiles: Vec<Profile>,
    pub films: Vec<Film>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub viewed: Vec<ViewedMark>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

// =============================================================================
// Catalog - the in-memory store
// =============================================================================

/// In-memory store of films, profiles and every per-profile relation.
///
/// Films and profiles are kept in id order so listings are deterministic.
#[derive(Debug, Default)]
pub struct Catalog {
    pub(crate) profiles: BTreeMap<ProfileId, Profile>,
    pub(crate) films: BTreeMap<FilmId, Film>,

    /// Non-zero votes only
    pub(crate) votes: BTreeMap<(FilmId, ProfileId), VoteValue>,
    pub(crate) viewed: BTreeSet<(FilmId, ProfileId)>,

    /// All ratings received by each film
    pub(crate) ratings: HashMap<FilmId, Vec<Rating>>,
    pub(crate) comments: HashMap<FilmId, Vec<Comment>>,

    pub(crate) rating_stats: HashMap<FilmId, RatingStats>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_profile(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.get(&id)
    }

    /// Look a profile up by numeric id or by name (exact, then case-insensitive)
    pub fn find_profile(&self, key: &str) -> Option<&Profile> {
        let key = key.trim();
        if let Ok(id) = key.parse::<ProfileId>() {
            if let Some(profile) = self.profiles.get(&id) {
                return Some(profile);
            }
        }
        self.profiles
            .values()
            .find(|p| p.name == key)
            .or_else(|| {
                let lowered = key.to_lowercase();
                self.profiles
                    .values()
                    .find(|p| p.name.to_lowercase() == lowered)
            })
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn get_film(&self, id: FilmId) -> Option<&Film> {
        self.films.get(&id)
    }

    /// Snapshot of the films on one list, newest first.
    ///
    /// Ids are handed out in creation order, so this is descending id order.
    pub fn films(&self, mode: Mode) -> Vec<Film> {
        self.films
            .values()
            .rev()
            .filter(|f| f.mode() == mode)
            .cloned()
            .collect()
    }

    /// The vote a profile holds on a film
    pub fn vote_of(&self, film_id: FilmId, profile_id: ProfileId) -> VoteValue {
        self.votes
            .get(&(film_id, profile_id))
            .copied()
            .unwrap_or_default()
    }

    /// Every non-zero vote held by a profile, keyed by film
    pub fn profile_votes(&self, profile_id: ProfileId) -> HashMap<FilmId, VoteValue> {
        self.votes
            .iter()
            .filter(|((_, pid), _)| *pid == profile_id)
            .map(|(&(fid, _), &value)| (fid, value))
            .collect()
    }

    /// Films a profile has marked as viewed
    pub fn profile_viewed(&self, profile_id: ProfileId) -> HashSet<FilmId> {
        self.viewed
            .iter()
            .filter(|(_, pid)| *pid == profile_id)
            .map(|&(fid, _)| fid)
            .collect()
    }

    /// All ratings for a film; empty if it has none
    pub fn film_ratings(&self, film_id: FilmId) -> &[Rating] {
        self.ratings
            .get(&film_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All ratings, keyed by film
    pub fn all_ratings(&self) -> &HashMap<FilmId, Vec<Rating>> {
        &self.ratings
    }

    /// Comments on a film, newest first
    pub fn film_comments(&self, film_id: FilmId) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self
            .comments
            .get(&film_id)
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    pub fn rating_stats(&self, film_id: FilmId) -> Option<&RatingStats> {
        self.rating_stats.get(&film_id)
    }

    /// Names of the profiles voting on a film, grouped by vote and sorted
    pub fn film_voters(&self, film_id: FilmId) -> FilmVoters {
        let mut voters = FilmVoters::default();
        for (&(fid, pid), &value) in &self.votes {
            if fid != film_id {
                continue;
            }
            let Some(profile) = self.profiles.get(&pid) else {
                continue;
            };
            let name = profile.name.clone();
            match value {
                VoteValue::Up => voters.upvoters.push(name),
                VoteValue::Neutral => voters.neutral_voters.push(name),
                VoteValue::Down => voters.downvoters.push(name),
                VoteValue::None => {}
            }
        }
        voters.upvoters.sort();
        voters.neutral_voters.sort();
        voters.downvoters.sort();
        voters
    }

    /// Names of the profiles that viewed a film, optionally restricted to a profile set
    pub fn film_viewers(&self, film_id: FilmId, scope: Option<&[ProfileId]>) -> Vec<String> {
        let mut names: Vec<String> = self
            .viewed
            .iter()
            .filter(|(fid, pid)| {
                *fid == film_id && scope.is_none_or(|ids| ids.contains(pid))
            })
            .filter_map(|(_, pid)| self.profiles.get(pid).map(|p| p.name.clone()))
            .collect();
        names.sort();
        names
    }

    /// (profiles, films, votes) for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.profiles.len(), self.films.len(), self.votes.len())
    }

    // Raw inserts used while loading. They do not touch the counters;
    // callers run `recompute_tallies` / `compute_rating_stats` afterwards.

    pub fn insert_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn insert_film(&mut self, film: Film) {
        self.films.insert(film.id, film);
    }

    /// A `None` vote is the same as no row
    pub fn insert_vote(&mut self, vote: Vote) {
        let key = (vote.film_id, vote.profile_id);
        if vote.vote.is_cast() {
            self.votes.insert(key, vote.vote);
        } else {
            self.votes.remove(&key);
        }
    }

    pub fn insert_viewed(&mut self, mark: ViewedMark) {
        self.viewed.insert((mark.film_id, mark.profile_id));
    }

    /// Last write wins per (film, profile)
    pub fn insert_rating(&mut self, rating: Rating) -> RecordOutcome {
        let ratings = self.ratings.entry(rating.film_id).or_default();
        match ratings
            .iter_mut()
            .find(|r| r.profile_id == rating.profile_id)
        {
            Some(existing) => {
                *existing = rating;
                RecordOutcome::Updated
            }
            None => {
                ratings.push(rating);
                RecordOutcome::Created
            }
        }
    }

    /// Last write wins per (film, profile)
    pub fn insert_comment(&mut self, comment: Comment) -> RecordOutcome {
        let comments = self.comments.entry(comment.film_id).or_default();
        match comments
            .iter_mut()
            .find(|c| c.profile_id == comment.profile_id)
        {
            Some(existing) => {
                *existing = comment;
                RecordOutcome::Updated
            }
            None => {
                comments.push(comment);
                RecordOutcome::Created
            }
        }
    }
}
