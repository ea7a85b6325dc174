use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Clone)]
pub struct UsernameRequest {
    pub username: String,
}

/// Shape returned by the username RPCs.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RpcAuthResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl AuthResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            user_id: None,
            username: None,
            created_at: None,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
    pub force_logout: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct AuthHealth {
    pub status: String,
    pub database_connected: bool,
    pub service_key_present: bool,
}
