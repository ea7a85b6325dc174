use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::{
    error::Result,
    middlewares::mw_ctx::Ctx,
    models::upload::{SongUploadForm, UploadResponse, UploadedFile},
    validators::query_validator::split_genres,
    AppState,
};

pub struct UploadController;

impl UploadController {
    pub async fn upload_song(
        State(state): State<AppState>,
        ctx: Ctx,
        multipart: Multipart,
    ) -> Result<(StatusCode, Json<UploadResponse>)> {
        let form = read_form(multipart).await?;
        let song = state.uploads.upload_song(&ctx.user_id, form).await?;

        Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                success: true,
                message: "Song uploaded successfully".to_string(),
                song,
            }),
        ))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<SongUploadForm> {
    let mut form = SongUploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "thumbnail" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await?;
                debug!(field = %name, filename = %filename, size = bytes.len(), "multipart file");

                let file = UploadedFile {
                    filename,
                    content_type,
                    bytes,
                };
                if name == "file" {
                    form.audio = Some(file);
                } else if !file.bytes.is_empty() {
                    form.thumbnail = Some(file);
                }
            }
            "title" => form.title = Some(field.text().await?),
            "artist" => form.artist = Some(field.text().await?),
            "album" => form.album = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "genres" => form.genres = split_genres(Some(&field.text().await?)),
            _ => debug!(field = %name, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}
