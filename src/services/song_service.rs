use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use tracing::{debug, info};

use crate::{
    clients::storage::StorageClient,
    error::{Error, Result},
    helpers::song_helpers::{audio_location, format_song_id, thumbnail_location},
    models::{
        genre::GenreSummary,
        search::{GenreSongsSort, SearchParams},
        song::{FileValidation, Song, SongRow, SongUrls},
    },
    services::catalog_service::SongRepository,
};

/// Minimum listen time that always counts as a stream.
pub const STREAM_MIN_SECS: f64 = 30.0;
/// Fraction of the song that counts as a stream for short tracks.
pub const STREAM_MIN_FRACTION: f64 = 0.5;

/// Catalog reads and writes, with storage URLs regenerated on every read.
#[derive(Clone)]
pub struct SongService {
    repo: Arc<dyn SongRepository>,
    storage: Arc<StorageClient>,
}

impl SongService {
    pub fn new(repo: Arc<dyn SongRepository>, storage: Arc<StorageClient>) -> Self {
        Self { repo, storage }
    }

    pub fn repo(&self) -> &Arc<dyn SongRepository> {
        &self.repo
    }

    // -- Decoration.

    pub async fn urls_for(&self, row: &SongRow) -> Result<SongUrls> {
        let config = self.storage.config();
        let audio = audio_location(config, row);
        let thumbnail = thumbnail_location(config, row);

        Ok(SongUrls {
            storage_url: self
                .storage
                .resolve_playback_url(&audio.folder, &audio.filename)
                .await?,
            thumbnail_url: self
                .storage
                .resolve_playback_url(&thumbnail.folder, &thumbnail.filename)
                .await?,
        })
    }

    pub async fn decorate(&self, row: SongRow) -> Result<Song> {
        let urls = self.urls_for(&row).await?;
        Ok(Song::from_row(row, urls))
    }

    pub async fn decorate_all(&self, rows: Vec<SongRow>) -> Result<Vec<Song>> {
        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            songs.push(self.decorate(row).await?);
        }
        Ok(songs)
    }

    /// Fetches rows for `ids` and returns them in the order of `ids`.
    pub async fn songs_by_ids(&self, ids: &[String]) -> Result<Vec<Song>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<String, SongRow> = self
            .repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();

        let ordered = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        self.decorate_all(ordered).await
    }

    // -- Listing.

    pub async fn list_songs(&self, limit: usize, offset: usize) -> Result<Vec<Song>> {
        let rows = self.repo.list_public(limit, offset).await?;
        self.decorate_all(rows).await
    }

    pub async fn random_songs(&self, limit: usize) -> Result<Vec<Song>> {
        let total = self.repo.count_public().await? as usize;
        if total == 0 {
            return Ok(Vec::new());
        }

        let max_offset = total.saturating_sub(limit);
        let offset = rand::rng().random_range(0..=max_offset);
        debug!(total, offset, "random songs window");

        let rows = self.repo.list_public(limit, offset).await?;
        self.decorate_all(rows).await
    }

    pub async fn popular_songs(&self, limit: usize) -> Result<Vec<Song>> {
        let rows = self.repo.popular(limit).await?;
        self.decorate_all(rows).await
    }

    pub async fn song_details(&self, id: &str) -> Result<Song> {
        let mut row = self.find_row(id).await?;

        let genres = self.repo.genre_names_for_song(id).await?;
        if !genres.is_empty() {
            row.tags = genres;
        }

        self.decorate(row).await
    }

    pub async fn song_urls(&self, id: &str) -> Result<SongUrls> {
        let row = self.find_row(id).await?;
        self.urls_for(&row).await
    }

    async fn find_row(&self, id: &str) -> Result<SongRow> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::SongNotFound { id: id.to_string() })
    }

    // -- Search and genres.

    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Song>> {
        if params.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let restrict_to = if params.genres.is_empty() {
            None
        } else {
            let ids = self.song_ids_with_any_genre(&params.genres).await?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            Some(ids)
        };

        let rows = self.repo.search(params, restrict_to.as_deref()).await?;
        self.decorate_all(rows).await
    }

    async fn song_ids_with_any_genre(&self, names: &[String]) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for name in names {
            if let Some(genre) = self.repo.find_genre_exact(name).await? {
                ids.extend(self.repo.song_ids_for_genre(&genre.id).await?);
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub async fn genres(&self, limit: usize) -> Result<Vec<GenreSummary>> {
        let genres = self.repo.list_genres(limit).await?;
        Ok(genres
            .into_iter()
            .map(|genre| GenreSummary {
                name: genre.name,
                song_count: 0,
            })
            .collect())
    }

    pub async fn songs_by_genre(
        &self,
        name: &str,
        limit: usize,
        offset: usize,
        sort_by: GenreSongsSort,
    ) -> Result<Vec<Song>> {
        let Some(genre) = self.repo.find_genre_exact(name).await? else {
            return Ok(Vec::new());
        };

        let ids = self.repo.song_ids_for_genre(&genre.id).await?;
        let public = self.repo.filter_public_ids(&ids).await?;
        let mut rows = self.repo.find_by_ids(&public).await?;

        sort_rows(&mut rows, sort_by);
        let page = rows.into_iter().skip(offset).take(limit).collect();
        self.decorate_all(page).await
    }

    // -- Likes.

    /// Toggles the like. Returns whether the song is liked afterwards.
    pub async fn like_song(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let row = self.find_row(song_id).await?;

        if self.repo.like_exists(user_id, song_id).await? {
            self.repo.delete_like(user_id, song_id).await?;
            self.repo
                .set_like_count(song_id, row.like_count.saturating_sub(1))
                .await?;
            info!(user_id, song_id, "song unliked");
            Ok(false)
        } else {
            self.repo.insert_like(user_id, song_id).await?;
            self.repo
                .set_like_count(song_id, row.like_count + 1)
                .await?;
            info!(user_id, song_id, "song liked");
            Ok(true)
        }
    }

    /// Removes the like if present. Returns whether a like was removed.
    pub async fn unlike_song(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let row = self.find_row(song_id).await?;

        if !self.repo.like_exists(user_id, song_id).await? {
            return Ok(false);
        }

        self.repo.delete_like(user_id, song_id).await?;
        self.repo
            .set_like_count(song_id, row.like_count.saturating_sub(1))
            .await?;
        Ok(true)
    }

    pub async fn is_song_liked(&self, user_id: &str, song_id: &str) -> Result<bool> {
        self.repo.like_exists(user_id, song_id).await
    }

    pub async fn liked_songs(&self, user_id: &str) -> Result<Vec<Song>> {
        let ids = self.repo.liked_song_ids(user_id).await?;
        self.songs_by_ids(&ids).await
    }

    // -- Streams.

    /// Returns whether the listen was counted as a stream.
    pub async fn record_stream(&self, song_id: &str, listen_duration: Option<f64>) -> Result<bool> {
        let row = self.find_row(song_id).await?;

        if !counts_as_stream(listen_duration, row.duration) {
            debug!(song_id, ?listen_duration, "listen too short to count");
            return Ok(false);
        }

        self.repo.increment_streams(song_id).await?;
        Ok(true)
    }

    // -- Storage.

    pub async fn validate_files(&self, id: &str) -> Result<FileValidation> {
        let row = self.find_row(id).await?;
        let config = self.storage.config();
        let audio = audio_location(config, &row);
        let thumbnail = thumbnail_location(config, &row);

        let audio_exists = self.storage.file_exists(&audio.folder, &audio.filename).await?;
        let thumbnail_exists = self
            .storage
            .file_exists(&thumbnail.folder, &thumbnail.filename)
            .await?;

        Ok(FileValidation {
            song_id: id.to_string(),
            audio_exists,
            thumbnail_exists,
            all_files_exist: audio_exists && thumbnail_exists,
        })
    }

    pub async fn audio_bytes(&self, id: &str) -> Result<(SongRow, Bytes)> {
        let row = self.find_row(id).await?;
        let audio = audio_location(self.storage.config(), &row);
        let bytes = self.storage.download(&audio.folder, &audio.filename).await?;
        Ok((row, bytes))
    }

    pub async fn thumbnail_bytes(&self, id: &str) -> Result<Bytes> {
        let row = self.find_row(id).await?;
        let thumbnail = thumbnail_location(self.storage.config(), &row);
        self.storage
            .download(&thumbnail.folder, &thumbnail.filename)
            .await
    }

    pub async fn next_song_id(&self) -> Result<String> {
        let next = self.repo.max_song_id().await?.map_or(1, |max| max + 1);
        Ok(format_song_id(next))
    }
}

/// A listen counts when its length is unknown, at least 30 s, or at least
/// half of a song with a known duration.
pub fn counts_as_stream(listen_duration: Option<f64>, song_duration: f64) -> bool {
    match listen_duration {
        None => true,
        Some(listened) => {
            listened >= STREAM_MIN_SECS
                || (song_duration > 0.0 && listened >= song_duration * STREAM_MIN_FRACTION)
        }
    }
}

fn sort_rows(rows: &mut [SongRow], sort_by: GenreSongsSort) {
    match sort_by {
        GenreSongsSort::Streams => rows.sort_by(|a, b| b.streams.cmp(&a.streams)),
        GenreSongsSort::LikeCount => rows.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
        GenreSongsSort::CreatedAt => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        GenreSongsSort::Title => rows.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
    }
}
