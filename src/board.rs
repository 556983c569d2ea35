use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv::RawRow;

const TIMESTAMP_COLUMN: usize = 0;
const TITLE_COLUMN: usize = 1;
const DETAILS_COLUMN: usize = 2;
const MIN_COLUMNS: usize = 3;

/// A recruitment posting materialized from one sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Position among retained rows in source order. This is the only
    /// ordering key and is fixed at materialization time.
    pub origin_index: usize,
    pub timestamp: String,
    pub title: String,
    pub details: String,
}

/// A post paired with the 1-based number shown for the current ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPost<'a> {
    pub post: &'a Post,
    pub display_number: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Posting order.
    #[default]
    Oldest,
    Newest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Oldest => "oldest",
            SortOrder::Newest => "newest",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Oldest => SortOrder::Newest,
            SortOrder::Newest => SortOrder::Oldest,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort order {0:?} (expected \"oldest\" or \"newest\")")]
pub struct ParseSortOrderError(String);

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" => Ok(SortOrder::Oldest),
            "newest" => Ok(SortOrder::Newest),
            _ => Err(ParseSortOrderError(s.to_string())),
        }
    }
}

fn column(row: &RawRow, index: usize) -> &str {
    row.get(index).map(|field| field.trim()).unwrap_or_default()
}

/// Turns decoded sheet rows into posts.
///
/// The first row is the header and is always skipped. A data row survives
/// only with at least three columns and a non-blank title or details;
/// survivors are numbered contiguously from zero in the order they appear.
pub fn materialize(rows: &[RawRow]) -> Vec<Post> {
    let mut posts = Vec::new();
    for row in rows.iter().skip(1) {
        if row.len() < MIN_COLUMNS {
            continue;
        }
        let title = column(row, TITLE_COLUMN);
        let details = column(row, DETAILS_COLUMN);
        if title.is_empty() && details.is_empty() {
            continue;
        }
        posts.push(Post {
            origin_index: posts.len(),
            timestamp: column(row, TIMESTAMP_COLUMN).to_string(),
            title: title.to_string(),
            details: details.to_string(),
        });
    }
    debug!(
        rows = rows.len().saturating_sub(1),
        retained = posts.len(),
        "materialized posts"
    );
    posts
}

/// Orders posts for display and numbers them.
///
/// `Oldest` numbers positions 1..=n; `Newest` reverses the order and
/// numbers from n down to 1, so a post keeps the same number in both views.
pub fn sorted_view(posts: &[Post], order: SortOrder) -> Vec<DisplayPost<'_>> {
    let mut ordered: Vec<&Post> = posts.iter().collect();
    match order {
        SortOrder::Oldest => ordered.sort_by_key(|post| post.origin_index),
        SortOrder::Newest => {
            ordered.sort_by(|a, b| b.origin_index.cmp(&a.origin_index));
        }
    }

    let count = ordered.len();
    ordered
        .into_iter()
        .enumerate()
        .map(|(position, post)| DisplayPost {
            post,
            display_number: match order {
                SortOrder::Oldest => position + 1,
                SortOrder::Newest => count - position,
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    FetchStarted,
    PostsLoaded(Vec<Post>),
    FetchFailed(String),
    SortChanged(SortOrder),
}

/// Everything the board keeps between renders.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    posts: Vec<Post>,
    sort: SortOrder,
    load: LoadState,
}

impl AppState {
    pub fn new(sort: SortOrder) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn view(&self) -> Vec<DisplayPost<'_>> {
        sorted_view(&self.posts, self.sort)
    }
}

/// Applies one event to the board state.
///
/// The post collection is only ever replaced as a whole by a successful
/// load; a failed fetch leaves the previous posts in place.
pub fn update(state: &mut AppState, event: BoardEvent) {
    match event {
        BoardEvent::FetchStarted => {
            state.load = LoadState::Loading;
        }
        BoardEvent::PostsLoaded(posts) => {
            debug!(count = posts.len(), "replacing post collection");
            state.posts = posts;
            state.load = LoadState::Ready;
        }
        BoardEvent::FetchFailed(message) => {
            state.load = LoadState::Failed { message };
        }
        BoardEvent::SortChanged(sort) => {
            debug!(%sort, "sort order changed");
            state.sort = sort;
        }
    }
}
