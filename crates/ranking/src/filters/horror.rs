//! Filter to keep or drop horror films.

use crate::context::RankingContext;
use crate::selections::HorrorMode;
use crate::traits::Filter;
use catalog::Film;

const HORROR_TAG: &str = "horror";

/// Whether a genre string names horror anywhere in it, ignoring case
pub fn is_horror(genre: Option<&str>) -> bool {
    genre.is_some_and(|g| g.to_lowercase().contains(HORROR_TAG))
}

/// Keeps horror films (`Spooky`) or everything else (`Unspooky`).
///
/// A film without a genre is never treated as horror: it is dropped by
/// `Spooky` and kept by `Unspooky`.
pub struct HorrorFilter {
    mode: HorrorMode,
}

impl HorrorFilter {
    pub fn new(mode: HorrorMode) -> Self {
        Self { mode }
    }
}

impl Filter for HorrorFilter {
    fn name(&self) -> &str {
        "HorrorFilter"
    }

    fn apply(&self, films: Vec<Film>, _context: &RankingContext) -> Vec<Film> {
        let want_horror = match self.mode {
            HorrorMode::All => return films,
            HorrorMode::Spooky => true,
            HorrorMode::Unspooky => false,
        };

        films
            .into_iter()
            .filter(|film| is_horror(film.genre.as_deref()) == want_horror)
            .collect()
    }
}
