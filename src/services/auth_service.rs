use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{
    clients::postgrest::PostgrestClient,
    error::{Error, Result},
    http::HttpResponse,
    models::auth::{AuthHealth, AuthResponse, DeleteAccountResponse, RpcAuthResult},
    validators::query_validator::validate_username,
};

const LOGIN_RPC: &str = "login_username";
const REGISTER_RPC: &str = "register_username";
const DELETE_RPC: &str = "delete_user_by_username";

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub development: bool,
    pub test_user_username: String,
    /// Whether a dedicated service-role key was configured.
    pub service_key_present: bool,
}

/// Username-only accounts backed by stored procedures. Calls use the
/// service-role key.
#[derive(Clone)]
pub struct AuthService {
    client: Arc<PostgrestClient>,
    settings: AuthSettings,
}

#[derive(Deserialize)]
struct RpcError {
    error: Option<String>,
    message: Option<String>,
}

impl AuthService {
    pub fn new(client: Arc<PostgrestClient>, settings: AuthSettings) -> Self {
        Self { client, settings }
    }

    pub async fn login(&self, username: &str) -> Result<AuthResponse> {
        validate_username(username)?;
        info!(username, "login attempt");
        self.call_auth_rpc(LOGIN_RPC, username, "Username not found", "Login failed")
            .await
    }

    pub async fn register(&self, username: &str) -> Result<AuthResponse> {
        validate_username(username)?;
        info!(username, "registration attempt");
        self.call_auth_rpc(REGISTER_RPC, username, "Registration failed", "Registration failed")
            .await
    }

    /// Verifies the account first; the configured test user cannot be
    /// deleted in development.
    pub async fn delete_account(&self, username: &str) -> Result<DeleteAccountResponse> {
        validate_username(username)?;

        let verify = self.rpc(LOGIN_RPC, username).await?;
        let verified = verify.is_success()
            && verify
                .json::<RpcAuthResult>()
                .map(|result| result.success)
                .unwrap_or(false);
        if !verified {
            warn!(username, status = verify.status, "account verification failed before delete");
            return Err(Error::UserNotAuthenticated);
        }

        if self.settings.development && username == self.settings.test_user_username {
            warn!(username, "refusing to delete the test user in development");
            return Err(Error::InvalidInput {
                reason: "Cannot delete test user in development mode".to_string(),
            });
        }

        let response = self.rpc(DELETE_RPC, username).await?;
        if !response.is_success() {
            error!(username, status = response.status, "delete rpc failed");
            return Err(Error::DbError(format!(
                "{DELETE_RPC} returned {}",
                response.status
            )));
        }

        let result: RpcAuthResult = response.json()?;
        if !result.success {
            return Err(Error::InvalidInput {
                reason: result.error.unwrap_or_else(|| "Delete failed".to_string()),
            });
        }

        info!(username, "account deleted");
        Ok(DeleteAccountResponse {
            success: true,
            message: "Account deleted successfully".to_string(),
            force_logout: true,
        })
    }

    /// Checks the login procedure with the test user.
    pub async fn health(&self) -> AuthHealth {
        let healthy = match self.rpc(LOGIN_RPC, &self.settings.test_user_username).await {
            Ok(response) => response.is_success(),
            Err(err) => {
                error!("auth health check failed: {err:?}");
                false
            }
        };

        AuthHealth {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database_connected: healthy,
            service_key_present: self.settings.service_key_present,
        }
    }

    async fn rpc(&self, function: &str, username: &str) -> Result<HttpResponse> {
        self.client
            .rpc_raw(function, &json!({ "username_input": username }))
            .await
    }

    async fn call_auth_rpc(
        &self,
        function: &str,
        username: &str,
        rejected_message: &str,
        failed_message: &str,
    ) -> Result<AuthResponse> {
        let response = self.rpc(function, username).await?;

        if response.status == 400 {
            warn!(function, username, "auth rpc rejected request");
            let message = response
                .json::<RpcError>()
                .ok()
                .and_then(|err| err.error.or(err.message))
                .unwrap_or_else(|| rejected_message.to_string());
            return Ok(AuthResponse::failure(message));
        }

        if !response.is_success() {
            error!(function, status = response.status, "auth rpc failed");
            return Err(Error::DbError(format!(
                "{function} returned {}",
                response.status
            )));
        }

        let result: RpcAuthResult = response.json()?;
        if !result.success {
            return Ok(AuthResponse::failure(
                result.error.unwrap_or_else(|| failed_message.to_string()),
            ));
        }

        Ok(AuthResponse {
            success: true,
            error: None,
            user_id: result.user_id.map(|id| match id {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            username: result.username,
            created_at: Some(result.created_at.unwrap_or_default()),
        })
    }
}
