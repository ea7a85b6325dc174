use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::song_controller::SongController, AppState};

pub struct SongRoutes;

impl SongRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/", get(SongController::list_songs))
            .route("/random", get(SongController::random_songs))
            .route("/popular", get(SongController::popular_songs))
            .route("/discover", get(SongController::discover))
            .route("/discover/genre", get(SongController::discover_by_genre))
            .route("/search", get(SongController::search))
            .route("/genres", get(SongController::genres))
            .route("/genres/{genre}/songs", get(SongController::songs_by_genre))
            .route("/liked", get(SongController::liked_songs))
            .route("/{id}", get(SongController::song_details))
            .route("/{id}/details", get(SongController::song_details))
            .route("/{id}/urls", get(SongController::song_urls))
            .route("/{id}/validate", get(SongController::validate_files))
            .route("/{id}/stream", post(SongController::record_stream))
            .route(
                "/{id}/like",
                post(SongController::like_song).delete(SongController::unlike_song),
            )
            .route("/{id}/like-status", get(SongController::like_status))
            .route("/{id}/download", get(SongController::download))
            .route("/{id}/audio", get(SongController::audio))
            .route("/{id}/thumbnail", get(SongController::thumbnail))
    }
}
