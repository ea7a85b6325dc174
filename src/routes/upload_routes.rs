use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::{
    controllers::upload_controller::UploadController,
    validators::upload_validator::MAX_FILE_SIZE,
    AppState,
};

/// Audio plus thumbnail at their limits, with room for the text fields.
const MAX_UPLOAD_BODY: usize = 2 * MAX_FILE_SIZE + 1024 * 1024;

pub struct UploadRoutes;

impl UploadRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/song", post(UploadController::upload_song))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY))
    }
}
