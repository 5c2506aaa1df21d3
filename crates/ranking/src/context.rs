//! Build the per-viewer context the engine ranks against.

use anyhow::{anyhow, Result};
use catalog::{Catalog, FilmId, ProfileId, Rating, VoteValue};
use std::collections::{HashMap, HashSet};

/// Everything about the current viewer the engine needs, gathered once
/// per render so the filters and comparators never touch the catalog.
#[derive(Debug, Clone, Default)]
pub struct RankingContext {
    /// The selected profile, if any. Without one the vote filter is a no-op.
    pub profile: Option<ProfileId>,
    /// The selected profile's non-zero votes
    pub votes: HashMap<FilmId, VoteValue>,
    /// Films the selected profile marked as viewed
    pub viewed: HashSet<FilmId>,
    /// Every collected rating, keyed by film
    pub ratings: HashMap<FilmId, Vec<Rating>>,
}

impl RankingContext {
    /// Context for a viewer with no profile selected
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_profile(profile: ProfileId) -> Self {
        Self {
            profile: Some(profile),
            ..Self::default()
        }
    }

    /// The viewer's vote on a film; absent means none
    pub fn vote_on(&self, film_id: FilmId) -> VoteValue {
        self.votes.get(&film_id).copied().unwrap_or_default()
    }

    pub fn has_viewed(&self, film_id: FilmId) -> bool {
        self.viewed.contains(&film_id)
    }

    pub fn ratings_for(&self, film_id: FilmId) -> &[Rating] {
        self.ratings
            .get(&film_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Build a RankingContext from the catalog for an optional profile.
///
/// Only fails when a profile is named that the catalog doesn't know.
pub fn build_ranking_context(
    catalog: &Catalog,
    profile: Option<ProfileId>,
) -> Result<RankingContext> {
    let mut context = RankingContext {
        ratings: catalog.all_ratings().clone(),
        ..RankingContext::default()
    };

    let Some(profile_id) = profile else {
        return Ok(context);
    };

    catalog
        .get_profile(profile_id)
        .ok_or_else(|| anyhow!("Profile {} not found", profile_id))?;

    context.profile = Some(profile_id);
    context.votes = catalog.profile_votes(profile_id);
    context.viewed = catalog.profile_viewed(profile_id);
    Ok(context)
}
