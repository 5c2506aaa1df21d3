//! Filter implementations for the ranking pipeline.
//!
//! Each filter narrows the film list on one selection. They are composed,
//! in this order, by a FilterPipeline.

pub mod horror;
pub mod vote_state;
pub mod text_search;

// Re-export for convenience
pub use horror::HorrorFilter;
pub use text_search::TextSearchFilter;
pub use vote_state::VoteStateFilter;
