use serde::{Deserialize, Serialize};

use crate::models::database_helpers::{null_as_default, string_or_number};

pub const GENRE_CATEGORY: &str = "genre";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Genre {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Entry of the genre listing. Counting is skipped, `song_count` is always 0.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GenreSummary {
    pub name: String,
    pub song_count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SongGenreRow {
    #[serde(deserialize_with = "string_or_number")]
    pub song_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub genre_id: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewGenre {
    pub name: String,
    pub category: String,
}
