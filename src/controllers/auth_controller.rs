use axum::{extract::State, Json};

use crate::{
    models::auth::{AuthHealth, AuthResponse, DeleteAccountResponse, UsernameRequest},
    AppState, Result,
};

pub struct AuthController;

impl AuthController {
    pub async fn health(State(state): State<AppState>) -> Json<AuthHealth> {
        Json(state.auth.health().await)
    }

    pub async fn login(
        State(state): State<AppState>,
        Json(payload): Json<UsernameRequest>,
    ) -> Result<Json<AuthResponse>> {
        Ok(Json(state.auth.login(payload.username.trim()).await?))
    }

    pub async fn register(
        State(state): State<AppState>,
        Json(payload): Json<UsernameRequest>,
    ) -> Result<Json<AuthResponse>> {
        Ok(Json(state.auth.register(payload.username.trim()).await?))
    }

    pub async fn delete_account(
        State(state): State<AppState>,
        Json(payload): Json<UsernameRequest>,
    ) -> Result<Json<DeleteAccountResponse>> {
        Ok(Json(
            state.auth.delete_account(payload.username.trim()).await?,
        ))
    }
}
