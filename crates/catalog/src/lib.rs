//! # Catalog Crate
//!
//! This crate holds the shared film list and everything profiles attach to
//! it: votes, viewed marks, star ratings and comments.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Film, Profile, VoteValue, Rating, Catalog)
//! - **parser**: Read and write JSON snapshots shaped like the backend API
//! - **index**: Build the catalog, maintain vote counters and rating stats
//! - **mutations**: New films and profiles, votes, viewed marks, ratings, comments, archive moves
//! - **error**: Error types for loading and mutating
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{Catalog, Mode, VoteValue};
//! use std::path::Path;
//!
//! let mut catalog = Catalog::load_from_file(Path::new("data/snapshot.json"))?;
//!
//! catalog.cast_vote(12, 3, VoteValue::Up)?;
//! let active = catalog.films(Mode::Active);
//!
//! catalog.save_to_file(Path::new("data/snapshot.json"))?;
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod index;
pub mod mutations;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use types::{
    // Type aliases
    FilmId,
    ProfileId,
    // Core types
    Catalog,
    Comment,
    Film,
    FilmVoters,
    Profile,
    Rating,
    RatingStats,
    Snapshot,
    ViewedMark,
    Vote,
    VoteTally,
    // Enums
    Mode,
    RecordOutcome,
    VoteOutcome,
    VoteValue,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_creation() {
        let catalog = Catalog::new();
        let (profiles, films, votes) = catalog.counts();

        assert_eq!(profiles, 0);
        assert_eq!(films, 0);
        assert_eq!(votes, 0);
    }

    #[test]
    fn test_insert_film() {
        let mut catalog = Catalog::new();

        catalog.insert_film(Film {
            year: "1977".to_string(),
            genre: Some("Horror".to_string()),
            ..Film::new(1, "Suspiria")
        });

        let retrieved = catalog.get_film(1).unwrap();
        assert_eq!(retrieved.title, "Suspiria");
        assert_eq!(retrieved.mode(), Mode::Active);
        assert_eq!(catalog.films(Mode::Active).len(), 1);
        assert!(catalog.films(Mode::Archived).is_empty());
    }

    #[test]
    fn test_films_list_newest_first() {
        let mut catalog = Catalog::new();
        for (id, title) in [(1, "Oldest"), (2, "Middle"), (3, "Newest")] {
            catalog.insert_film(Film::new(id, title));
        }
        catalog.insert_film(Film {
            is_archived: true,
            ..Film::new(4, "Watched")
        });

        let titles: Vec<String> = catalog
            .films(Mode::Active)
            .into_iter()
            .map(|f| f.title)
            .collect();
        assert_eq!(titles, vec!["Newest", "Middle", "Oldest"]);
    }

    #[test]
    fn test_voter_count_does_not_overflow() {
        let film = Film {
            upvotes: u32::MAX,
            downvotes: 1,
            ..Film::new(1, "Everyone")
        };
        assert_eq!(film.voter_count(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_vote_wire_codes() {
        for value in [VoteValue::Down, VoteValue::None, VoteValue::Up, VoteValue::Neutral] {
            assert_eq!(VoteValue::from_code(value.code() as i64).unwrap(), value);
        }
        assert!(VoteValue::from_code(-2).is_err());
        assert!(!VoteValue::None.is_cast());
    }

    #[test]
    fn test_empty_queries() {
        let catalog = Catalog::new();

        assert!(catalog.get_film(999).is_none());
        assert!(catalog.get_profile(999).is_none());
        assert!(catalog.film_ratings(999).is_empty());
        assert!(catalog.profile_votes(999).is_empty());
        assert_eq!(catalog.film_voters(999), FilmVoters::default());
    }
}
