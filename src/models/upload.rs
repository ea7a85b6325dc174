use bytes::Bytes;
use serde::Serialize;

use crate::models::song::Song;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Multipart form of `POST /api/upload/song` after parsing.
#[derive(Debug, Clone, Default)]
pub struct SongUploadForm {
    pub audio: Option<UploadedFile>,
    pub thumbnail: Option<UploadedFile>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub song: Song,
}
