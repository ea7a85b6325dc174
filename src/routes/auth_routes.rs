use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{controllers::auth_controller::AuthController, AppState};

pub struct AuthRoutes;

impl AuthRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/health", get(AuthController::health))
            .route("/login", post(AuthController::login))
            .route("/register", post(AuthController::register))
            .route("/delete", delete(AuthController::delete_account))
    }
}
