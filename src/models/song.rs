use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::database_helpers::{lenient_timestamp, null_as_default, string_or_number};

/// Raw `songs` row as stored.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SongRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artist: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub album: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub view_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub streams: u64,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    // Only used to recover user-upload file names.
    #[serde(default)]
    pub storage_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Song as served to clients, URLs freshly resolved.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: f64,
    pub storage_url: String,
    pub thumbnail_url: String,
    pub release_date: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub streams: u64,
    pub is_public: bool,
    pub uploaded_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Song {
    pub fn from_row(row: SongRow, urls: SongUrls) -> Self {
        Self {
            id: row.id,
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration: row.duration,
            storage_url: urls.storage_url,
            thumbnail_url: urls.thumbnail_url,
            release_date: row.release_date,
            description: row.description,
            genres: row.tags,
            view_count: row.view_count,
            like_count: row.like_count,
            streams: row.streams,
            is_public: row.is_public,
            uploaded_by: row.uploaded_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Columns written when a user uploads a song.
#[derive(Debug, Serialize, Clone)]
pub struct NewSongRow {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: f64,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub storage_url: String,
    pub thumbnail_url: String,
    pub is_public: bool,
    pub uploaded_by: String,
    pub view_count: u64,
    pub like_count: u64,
    pub streams: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SongUrls {
    pub storage_url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct SongUrlsResponse {
    pub song_id: String,
    pub urls: SongUrls,
}

#[derive(Debug, Serialize, Clone)]
pub struct FileValidation {
    pub song_id: String,
    pub audio_exists: bool,
    pub thumbnail_exists: bool,
    pub all_files_exist: bool,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub listen_duration: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub message: String,
    pub song_id: String,
    pub counted: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct UnlikeResponse {
    pub success: bool,
    pub unliked: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeStatus {
    pub liked: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LikeRow {
    pub user_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub song_id: String,
}
