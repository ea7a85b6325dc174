use serde::{Deserialize, Serialize};

use crate::models::song::Song;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GenreSongsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<String>,
}

/// Offset page of songs.
#[derive(Debug, Serialize, Clone)]
pub struct SongListResponse {
    pub songs: Vec<Song>,
    pub total: usize,
    pub page: usize, // (1-based)
    pub limit: usize,
    pub has_more: bool,
}

impl SongListResponse {
    pub fn new(songs: Vec<Song>, limit: usize, offset: usize) -> Self {
        let total = songs.len();
        Self {
            has_more: total == limit,
            page: offset / limit.max(1) + 1,
            total,
            songs,
            limit,
        }
    }
}
