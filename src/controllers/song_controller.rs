use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{Error, Result},
    middlewares::mw_ctx::Ctx,
    models::{
        feed::{FeedPage, FeedQuery, GenreFeedQuery},
        genre::GenreSummary,
        pagination::{GenreSongsQuery, LimitQuery, ListQuery, SongListResponse},
        search::{GenreSongsSort, SearchParams, SearchQuery, SearchSort},
        song::{
            FileValidation, LikeResponse, LikeStatus, Song, SongUrlsResponse, StreamQuery,
            StreamResponse, UnlikeResponse,
        },
    },
    validators::query_validator::{
        bounded, feed_genres, is_descending, split_genres, validate_song_id, MAX_SEARCH_QUERY_LEN,
    },
    AppState,
};

pub struct SongController;

impl SongController {
    pub async fn list_songs(
        State(state): State<AppState>,
        Query(query): Query<ListQuery>,
    ) -> Result<Json<SongListResponse>> {
        let limit = bounded(query.limit, 20, 1, 100, "limit")?;
        let offset = query.offset.unwrap_or(0);

        let songs = state.songs.list_songs(limit, offset).await?;
        Ok(Json(SongListResponse::new(songs, limit, offset)))
    }

    pub async fn random_songs(
        State(state): State<AppState>,
        Query(query): Query<LimitQuery>,
    ) -> Result<Json<Vec<Song>>> {
        let limit = bounded(query.limit, 10, 1, 50, "limit")?;
        Ok(Json(state.songs.random_songs(limit).await?))
    }

    pub async fn popular_songs(
        State(state): State<AppState>,
        Query(query): Query<LimitQuery>,
    ) -> Result<Json<Vec<Song>>> {
        let limit = bounded(query.limit, 10, 1, 50, "limit")?;
        Ok(Json(state.songs.popular_songs(limit).await?))
    }

    pub async fn discover(
        State(state): State<AppState>,
        Query(query): Query<FeedQuery>,
    ) -> Result<Json<FeedPage>> {
        let limit = bounded(query.limit, 20, 1, 100, "limit")?;
        let page = state
            .feed
            .discover(limit, query.cursor.unwrap_or(0), query.seed.unwrap_or(0))
            .await?;
        Ok(Json(page))
    }

    pub async fn discover_by_genre(
        State(state): State<AppState>,
        Query(query): Query<GenreFeedQuery>,
    ) -> Result<Json<FeedPage>> {
        let genres = feed_genres(query.genres.as_deref())?;
        let limit = bounded(query.limit, 20, 1, 100, "limit")?;
        let page = state
            .feed
            .discover_by_genres(
                &genres,
                limit,
                query.cursor.unwrap_or(0),
                query.seed.unwrap_or(0),
            )
            .await?;
        Ok(Json(page))
    }

    pub async fn search(
        State(state): State<AppState>,
        Query(query): Query<SearchQuery>,
    ) -> Result<Json<Vec<Song>>> {
        let text = query.query.unwrap_or_default();
        if text.chars().count() > MAX_SEARCH_QUERY_LEN {
            return Err(Error::InvalidInput {
                reason: format!("query must be at most {MAX_SEARCH_QUERY_LEN} characters"),
            });
        }

        let sort_by = match query.sort_by.as_deref() {
            None => SearchSort::Relevance,
            Some(raw) => raw.parse().map_err(|_| Error::InvalidInput {
                reason: format!("Unsupported sort_by: {raw}"),
            })?,
        };

        let params = SearchParams {
            query: text,
            limit: bounded(query.limit, 10, 1, 50, "limit")?,
            genres: split_genres(query.genres.as_deref()),
            sort_by,
            descending: is_descending(query.sort_order.as_deref())?,
        };

        Ok(Json(state.songs.search(&params).await?))
    }

    pub async fn genres(
        State(state): State<AppState>,
        Query(query): Query<LimitQuery>,
    ) -> Result<Json<Vec<GenreSummary>>> {
        let limit = bounded(query.limit, 50, 1, 3000, "limit")?;
        Ok(Json(state.songs.genres(limit).await?))
    }

    pub async fn songs_by_genre(
        State(state): State<AppState>,
        Path(genre): Path<String>,
        Query(query): Query<GenreSongsQuery>,
    ) -> Result<Json<Vec<Song>>> {
        let limit = bounded(query.limit, 20, 1, 50, "limit")?;
        let sort_by = match query.sort_by.as_deref() {
            None => GenreSongsSort::Streams,
            Some(raw) => raw.parse().map_err(|_| Error::InvalidInput {
                reason: format!("Unsupported sort_by: {raw}"),
            })?,
        };

        let songs = state
            .songs
            .songs_by_genre(&genre, limit, query.offset.unwrap_or(0), sort_by)
            .await?;
        Ok(Json(songs))
    }

    pub async fn liked_songs(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Vec<Song>>> {
        Ok(Json(state.songs.liked_songs(&ctx.user_id).await?))
    }

    pub async fn song_details(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Json<Song>> {
        validate_song_id(&id)?;
        Ok(Json(state.songs.song_details(&id).await?))
    }

    pub async fn song_urls(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Json<SongUrlsResponse>> {
        validate_song_id(&id)?;
        let urls = state.songs.song_urls(&id).await?;
        Ok(Json(SongUrlsResponse { song_id: id, urls }))
    }

    pub async fn validate_files(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Json<FileValidation>> {
        validate_song_id(&id)?;
        Ok(Json(state.songs.validate_files(&id).await?))
    }

    pub async fn record_stream(
        State(state): State<AppState>,
        Path(id): Path<String>,
        Query(query): Query<StreamQuery>,
    ) -> Result<Json<StreamResponse>> {
        validate_song_id(&id)?;
        if query.listen_duration.is_some_and(|d| !d.is_finite() || d < 0.0) {
            return Err(Error::InvalidInput {
                reason: "listen_duration must be a non-negative number".to_string(),
            });
        }

        let counted = state.songs.record_stream(&id, query.listen_duration).await?;
        let message = if counted {
            "Stream recorded successfully"
        } else {
            "Listen too short to count as a stream"
        };

        Ok(Json(StreamResponse {
            message: message.to_string(),
            song_id: id,
            counted,
        }))
    }

    pub async fn like_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(id): Path<String>,
    ) -> Result<Json<LikeResponse>> {
        validate_song_id(&id)?;
        let liked = state.songs.like_song(&ctx.user_id, &id).await?;
        Ok(Json(LikeResponse {
            success: true,
            liked,
        }))
    }

    pub async fn unlike_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(id): Path<String>,
    ) -> Result<Json<UnlikeResponse>> {
        validate_song_id(&id)?;
        let unliked = state.songs.unlike_song(&ctx.user_id, &id).await?;
        Ok(Json(UnlikeResponse {
            success: true,
            unliked,
        }))
    }

    /// Anonymous callers are never reported as having liked anything.
    pub async fn like_status(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(id): Path<String>,
    ) -> Result<Json<LikeStatus>> {
        validate_song_id(&id)?;
        let liked = match ctx {
            Some(ctx) => state.songs.is_song_liked(&ctx.user_id, &id).await?,
            None => false,
        };
        Ok(Json(LikeStatus { liked }))
    }

    pub async fn download(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Response> {
        validate_song_id(&id)?;
        let (row, bytes) = state.songs.audio_bytes(&id).await?;
        let disposition = download_disposition(&row.artist, &row.title);

        Ok((
            [
                (header::CONTENT_TYPE, "audio/mpeg".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response())
    }

    pub async fn audio(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Response> {
        validate_song_id(&id)?;
        let (_row, bytes) = state.songs.audio_bytes(&id).await?;
        Ok(inline_media("audio/mpeg", format!("{id}.mp3"), bytes))
    }

    pub async fn thumbnail(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Response> {
        validate_song_id(&id)?;
        let bytes = state.songs.thumbnail_bytes(&id).await?;
        Ok(inline_media("image/png", format!("{id}.png"), bytes))
    }
}

fn inline_media(content_type: &'static str, filename: String, bytes: bytes::Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        bytes,
    )
        .into_response()
}

/// Attachment header for `"<artist> - <title>.mp3"`: an ASCII `filename` for
/// old clients plus the full UTF-8 name as RFC 5987 `filename*`.
fn download_disposition(artist: &str, title: &str) -> String {
    let name: String = format!("{artist} - {title}.mp3")
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let fallback: String = name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && c.is_ascii())
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(&name)
    )
}
