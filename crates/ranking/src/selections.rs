//! Filter and sort selections owned by the caller.
//!
//! The rendering layer keeps one [`Selections`] value, mutates it in
//! response to user gestures and hands it to [`crate::rank`] on every
//! render. The engine only ever reads it.

use catalog::{ProfileId, VoteValue};
use thiserror::Error;
use tracing::warn;

pub use catalog::Mode;

/// A selection value the caller passed but the engine doesn't know
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown {kind} selection: {value:?} (expected one of: {expected})")]
    UnknownSelection {
        kind: &'static str,
        value: String,
        expected: String,
    },
}

/// A closed set of named options, parsed from the caller's strings.
pub trait Selection: Copy + Default + PartialEq + 'static {
    /// Name of the selection, used in error messages
    const KIND: &'static str;

    /// Every option with the name it is selected by
    const OPTIONS: &'static [(&'static str, Self)];

    /// Strict parse; unknown names are an error
    fn parse(s: &str) -> Result<Self, SelectionError> {
        let key = s.trim().to_lowercase();
        Self::OPTIONS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|&(_, option)| option)
            .ok_or_else(|| SelectionError::UnknownSelection {
                kind: Self::KIND,
                value: s.to_string(),
                expected: Self::OPTIONS
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Unknown names fall back to the default option
    fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|e| {
            warn!("{}; using default", e);
            Self::default()
        })
    }

    /// The name this option is selected by
    fn as_str(self) -> &'static str {
        Self::OPTIONS
            .iter()
            .find(|(_, option)| *option == self)
            .map_or("", |&(name, _)| name)
    }
}

impl Selection for Mode {
    const KIND: &'static str = "mode";
    const OPTIONS: &'static [(&'static str, Self)] =
        &[("active", Mode::Active), ("archived", Mode::Archived)];
}

/// Keep or drop horror films (active list only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorrorMode {
    #[default]
    All,
    /// Horror only
    Spooky,
    /// Everything but horror
    Unspooky,
}

impl Selection for HorrorMode {
    const KIND: &'static str = "horror filter";
    const OPTIONS: &'static [(&'static str, Self)] = &[
        ("all", HorrorMode::All),
        ("spooky", HorrorMode::Spooky),
        ("unspooky", HorrorMode::Unspooky),
    ];
}

/// Keep films by the selected profile's vote on them (active list only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoteFilter {
    #[default]
    None,
    Unvoted,
    Upvoted,
    Neutral,
    Downvoted,
}

impl VoteFilter {
    /// Whether a film on which the profile holds `vote` passes
    pub fn matches(self, vote: VoteValue) -> bool {
        match self {
            VoteFilter::None => true,
            VoteFilter::Unvoted => vote == VoteValue::None,
            VoteFilter::Upvoted => vote == VoteValue::Up,
            VoteFilter::Neutral => vote == VoteValue::Neutral,
            VoteFilter::Downvoted => vote == VoteValue::Down,
        }
    }
}

impl Selection for VoteFilter {
    const KIND: &'static str = "vote filter";
    const OPTIONS: &'static [(&'static str, Self)] = &[
        ("none", VoteFilter::None),
        ("unvoted", VoteFilter::Unvoted),
        ("upvoted", VoteFilter::Upvoted),
        ("neutral", VoteFilter::Neutral),
        ("downvoted", VoteFilter::Downvoted),
    ];
}

/// Active list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortMode {
    /// total score, then vote ratio
    #[default]
    Score,
    /// vote ratio, then total score
    Ratio,
}

impl Selection for SortMode {
    const KIND: &'static str = "sort";
    const OPTIONS: &'static [(&'static str, Self)] =
        &[("score", SortMode::Score), ("ratio", SortMode::Ratio)];
}

/// Archived list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArchivedSortMode {
    /// most recently watched first
    #[default]
    Date,
    /// mean stars, then number of ratings, then date
    Rating,
}

impl Selection for ArchivedSortMode {
    const KIND: &'static str = "archived sort";
    const OPTIONS: &'static [(&'static str, Self)] = &[
        ("date", ArchivedSortMode::Date),
        ("rating", ArchivedSortMode::Rating),
    ];
}

/// Everything the user picked that shapes the list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    pub mode: Mode,
    pub horror: HorrorMode,
    pub vote_filter: VoteFilter,
    pub text_query: String,
    pub sort: SortMode,
    pub archived_sort: ArchivedSortMode,
    /// Profiles whose votes the counters are restricted to; empty = everyone
    pub identities: Vec<ProfileId>,
}

impl Selections {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn archived() -> Self {
        Self {
            mode: Mode::Archived,
            ..Self::default()
        }
    }

    pub fn with_horror(mut self, horror: HorrorMode) -> Self {
        self.horror = horror;
        self
    }

    pub fn with_vote_filter(mut self, vote_filter: VoteFilter) -> Self {
        self.vote_filter = vote_filter;
        self
    }

    pub fn with_text_query(mut self, query: impl Into<String>) -> Self {
        self.text_query = query.into();
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_archived_sort(mut self, archived_sort: ArchivedSortMode) -> Self {
        self.archived_sort = archived_sort;
        self
    }

    pub fn with_identities(mut self, identities: Vec<ProfileId>) -> Self {
        self.identities = identities;
        self
    }

    /// The query as it is matched: trimmed and lower-cased
    pub fn normalized_query(&self) -> String {
        self.text_query.trim().to_lowercase()
    }

    /// Profiles the vote counters should be restricted to, if any.
    /// Only meaningful on the active list.
    pub fn identity_scope(&self) -> Option<&[ProfileId]> {
        match self.mode {
            Mode::Active if !self.identities.is_empty() => Some(&self.identities),
            _ => None,
        }
    }

    /// The filters that will actually narrow the list.
    ///
    /// Horror and vote filters only exist on the active list, and the vote
    /// filter needs a selected profile to compare against.
    pub fn active_filters(&self, profile_selected: bool) -> ActiveFilters {
        let on_active_list = self.mode == Mode::Active;
        let query = self.normalized_query();

        ActiveFilters {
            horror: (on_active_list && self.horror != HorrorMode::All).then_some(self.horror),
            vote_filter: (on_active_list && profile_selected && self.vote_filter != VoteFilter::None)
                .then_some(self.vote_filter),
            text_query: (!query.is_empty()).then_some(query),
        }
    }

    /// Switch between the active and archived lists.
    /// Entering the archive drops the filters it doesn't support.
    pub fn toggle_mode(&mut self) {
        match self.mode {
            Mode::Active => {
                self.mode = Mode::Archived;
                self.horror = HorrorMode::All;
                self.vote_filter = VoteFilter::None;
                self.identities.clear();
            }
            Mode::Archived => self.mode = Mode::Active,
        }
    }

    /// all -> spooky -> unspooky -> all
    pub fn cycle_horror(&mut self) {
        if self.mode == Mode::Archived {
            return;
        }
        self.horror = match self.horror {
            HorrorMode::All => HorrorMode::Spooky,
            HorrorMode::Spooky => HorrorMode::Unspooky,
            HorrorMode::Unspooky => HorrorMode::All,
        };
    }

    /// Selecting the filter already in place turns it off
    pub fn toggle_vote_filter(&mut self, filter: VoteFilter) {
        if self.mode == Mode::Archived {
            return;
        }
        self.vote_filter = if self.vote_filter == filter {
            VoteFilter::None
        } else {
            filter
        };
    }

    /// Flip the sort of whichever list is showing
    pub fn toggle_sort(&mut self) {
        match self.mode {
            Mode::Active => {
                self.sort = match self.sort {
                    SortMode::Score => SortMode::Ratio,
                    SortMode::Ratio => SortMode::Score,
                }
            }
            Mode::Archived => {
                self.archived_sort = match self.archived_sort {
                    ArchivedSortMode::Date => ArchivedSortMode::Rating,
                    ArchivedSortMode::Rating => ArchivedSortMode::Date,
                }
            }
        }
    }
}

/// The membership filters that ran for one ranking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFilters {
    /// Spooky or unspooky; never `All`
    pub horror: Option<HorrorMode>,
    /// Never `VoteFilter::None`
    pub vote_filter: Option<VoteFilter>,
    /// Normalised query; never empty
    pub text_query: Option<String>,
}

/// One filter that can explain an empty list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narrowing {
    VoteState(VoteFilter),
    Horror(HorrorMode),
    Text(String),
}

impl ActiveFilters {
    pub fn is_empty(&self) -> bool {
        self.horror.is_none() && self.vote_filter.is_none() && self.text_query.is_none()
    }

    /// The filter an empty-list message should name first:
    /// vote state, then horror, then text.
    pub fn primary(&self) -> Option<Narrowing> {
        if let Some(filter) = self.vote_filter {
            return Some(Narrowing::VoteState(filter));
        }
        if let Some(horror) = self.horror {
            return Some(Narrowing::Horror(horror));
        }
        self.text_query.clone().map(Narrowing::Text)
    }
}
