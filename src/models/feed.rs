use serde::{Deserialize, Serialize};

use crate::models::song::Song;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FeedQuery {
    pub limit: Option<usize>,
    pub cursor: Option<usize>,
    pub seed: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GenreFeedQuery {
    /// Comma separated genre names.
    pub genres: Option<String>,
    pub limit: Option<usize>,
    pub cursor: Option<usize>,
    pub seed: Option<i64>,
}

/// One page of the discover feed. Callers pass `next_cursor` and the same
/// `seed` back to continue the traversal.
#[derive(Debug, Serialize, Clone)]
pub struct FeedPage {
    pub songs: Vec<Song>,
    pub next_cursor: usize,
    pub has_more: bool,
    pub seed: i64,
    pub total: u64,
}

impl FeedPage {
    pub fn empty(cursor: usize, seed: i64, total: u64) -> Self {
        Self {
            songs: Vec::new(),
            next_cursor: cursor,
            has_more: false,
            seed,
            total,
        }
    }
}
