//! Free-text search over a film's descriptive fields.

use crate::context::RankingContext;
use crate::traits::Filter;
use catalog::Film;

/// Keeps films whose searchable text contains the query, ignoring case.
///
/// The searchable text is title, original title, director, actors, genre,
/// year and plot joined by spaces; missing fields count as empty.
pub struct TextSearchFilter {
    query: String,
}

impl TextSearchFilter {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.trim().to_lowercase(),
        }
    }
}

/// The lower-cased text a query is matched against
pub fn searchable_text(film: &Film) -> String {
    [
        Some(film.title.as_str()),
        film.original_title.as_deref(),
        film.director.as_deref(),
        film.actors.as_deref(),
        film.genre.as_deref(),
        Some(film.year.as_str()),
        film.plot.as_deref(),
    ]
    .map(|field| field.unwrap_or(""))
    .join(" ")
    .to_lowercase()
}

impl Filter for TextSearchFilter {
    fn name(&self) -> &str {
        "TextSearchFilter"
    }

    fn apply(&self, films: Vec<Film>, _context: &RankingContext) -> Vec<Film> {
        if self.query.is_empty() {
            return films;
        }

        films
            .into_iter()
            .filter(|film| searchable_text(film).contains(&self.query))
            .collect()
    }
}
