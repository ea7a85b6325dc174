use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    clients::storage::StorageClient,
    error::{Error, Result},
    helpers::{
        audio_helpers::audio_duration_secs,
        song_helpers::slugify,
    },
    models::{
        song::{NewSongRow, Song},
        upload::SongUploadForm,
    },
    services::song_service::SongService,
    validators::upload_validator::{FileKind, UploadValidator},
};

const DEFAULT_ALBUM: &str = "Unknown Album";
const MAX_TEXT_FIELD: usize = 200;

/// Stores a user upload: audio, optional thumbnail, then the catalog row.
#[derive(Clone)]
pub struct UploadService {
    songs: SongService,
    storage: Arc<StorageClient>,
}

impl UploadService {
    pub fn new(songs: SongService, storage: Arc<StorageClient>) -> Self {
        Self { songs, storage }
    }

    pub async fn upload_song(&self, user_id: &str, form: SongUploadForm) -> Result<Song> {
        let title = required_text(form.title.as_deref(), "title")?;
        let artist = required_text(form.artist.as_deref(), "artist")?;
        let album = optional_text(form.album.as_deref())
            .unwrap_or_else(|| DEFAULT_ALBUM.to_string());
        let description = optional_text(form.description.as_deref());

        let audio = form.audio.ok_or_else(|| Error::InvalidUpload {
            reason: "An audio file is required".to_string(),
        })?;
        let audio_ext = UploadValidator::validate(&audio, FileKind::Audio)?;
        let thumbnail = match form.thumbnail {
            Some(file) => {
                let ext = UploadValidator::validate(&file, FileKind::Image)?;
                Some((file, ext))
            }
            None => None,
        };

        let duration = audio_duration_secs(&audio.bytes)?;

        let config = self.storage.config().clone();
        let song_id = self.songs.next_song_id().await?;
        let slug = slugify(&title);
        let base_name = if slug.is_empty() {
            song_id.clone()
        } else {
            format!("{song_id}-{slug}")
        };

        let audio_name = format!("{base_name}.{audio_ext}");
        let storage_url = self
            .storage
            .upload(
                audio.bytes,
                &audio_name,
                &config.user_audio_folder,
                UploadValidator::content_type(&audio_ext),
            )
            .await?;

        let mut uploaded = vec![(config.user_audio_folder.clone(), audio_name)];

        let thumbnail_url = match thumbnail {
            Some((file, ext)) => {
                let name = format!("{base_name}.{ext}");
                let result = self
                    .storage
                    .upload(
                        file.bytes,
                        &name,
                        &config.user_thumbnail_folder,
                        UploadValidator::content_type(&ext),
                    )
                    .await;
                match result {
                    Ok(url) => {
                        uploaded.push((config.user_thumbnail_folder.clone(), name));
                        url
                    }
                    Err(err) => {
                        self.cleanup(&uploaded).await;
                        return Err(err);
                    }
                }
            }
            None => String::new(),
        };

        let row = NewSongRow {
            id: song_id.clone(),
            title,
            artist,
            album,
            duration,
            description,
            tags: form.genres.clone(),
            storage_url,
            thumbnail_url,
            is_public: false,
            uploaded_by: user_id.to_string(),
            view_count: 0,
            like_count: 0,
            streams: 0,
        };

        let inserted = match self.songs.repo().insert_song(&row).await {
            Ok(inserted) => inserted,
            Err(err) => {
                error!(song_id = %song_id, "song row insert failed, removing uploaded files");
                self.cleanup(&uploaded).await;
                return Err(err);
            }
        };

        if let Err(err) = self.link_genres(&song_id, &form.genres).await {
            // The song itself is stored; missing genre links only affect browsing.
            warn!(song_id = %song_id, "genre linking failed: {err:?}");
        }

        info!(song_id = %song_id, user_id, "song uploaded");
        self.songs.decorate(inserted).await
    }

    async fn link_genres(&self, song_id: &str, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let genres = self.songs.repo().ensure_genres(names).await?;
        let ids: Vec<String> = genres.into_iter().map(|genre| genre.id).collect();
        self.songs.repo().link_song_genres(song_id, &ids).await
    }

    async fn cleanup(&self, uploaded: &[(String, String)]) {
        for (folder, filename) in uploaded {
            if let Err(err) = self.storage.delete(folder, filename).await {
                error!(folder = %folder, filename = %filename, "cleanup failed: {err:?}");
            }
        }
    }
}

fn required_text(value: Option<&str>, field: &str) -> Result<String> {
    optional_text(value).ok_or_else(|| Error::InvalidUpload {
        reason: format!("Field '{field}' is required"),
    })
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(MAX_TEXT_FIELD).collect())
}
