use std::env;

use crate::{
    clients::storage::StorageConfig,
    error::{Error, Result},
    services::feed_service::FeedStrategy,
};

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000,http://localhost:3001";
const LOCAL_DEV_ORIGIN: &str = "http://127.0.0.1:3000";
const DEFAULT_B2_API_URL: &str = "https://api.backblazeb2.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    /// Default `EnvFilter` directives when `RUST_LOG` is unset.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Development => "vibify_api=debug,tower_http=info,info",
            Self::Production => "vibify_api=warn,tower_http=warn,warn",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_host: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Falls back to the anon key when unset.
    pub supabase_service_role_key: String,
    pub service_role_key_set: bool,
    pub storage: StorageConfig,
    pub cors_origins: Vec<String>,
    pub discover_strategy: FeedStrategy,
    pub test_user_username: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let environment = Environment::parse(
            &env::var("APP_ENV")
                .or_else(|_| env::var("PYTHON_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        );

        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;
        let service_role_key = optional("SUPABASE_SERVICE_ROLE_KEY");
        let service_role_key_set = service_role_key.is_some();
        let supabase_service_role_key =
            service_role_key.unwrap_or_else(|| supabase_anon_key.clone());

        let storage = StorageConfig {
            key_id: required("B2_APPLICATION_KEY_ID")?,
            application_key: required("B2_APPLICATION_KEY")?,
            bucket_name: required("B2_BUCKET_NAME")?,
            api_url: optional("B2_API_URL").unwrap_or_else(|| DEFAULT_B2_API_URL.to_string()),
            audio_folder: optional("B2_AUDIO_FOLDER").unwrap_or_else(|| "audio".to_string()),
            thumbnail_folder: optional("B2_THUMBNAIL_FOLDER")
                .unwrap_or_else(|| "thumbnails".to_string()),
            user_audio_folder: optional("B2_USER_AUDIO_FOLDER")
                .unwrap_or_else(|| "user-audio".to_string()),
            user_thumbnail_folder: optional("B2_USER_THUMBNAIL_FOLDER")
                .unwrap_or_else(|| "user-thumbnails".to_string()),
        };

        let discover_strategy = match optional("DISCOVER_STRATEGY") {
            Some(value) => value.parse::<FeedStrategy>().map_err(|_| Error::InvalidInput {
                reason: format!("DISCOVER_STRATEGY must be 'shuffle' or 'windowed', got '{value}'"),
            })?,
            None => FeedStrategy::SeededShuffle,
        };

        Ok(Self {
            environment,
            bind_host: optional("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: optional("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key,
            supabase_service_role_key,
            service_role_key_set,
            storage,
            cors_origins: parse_cors_origins(
                &optional("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            discover_strategy,
            test_user_username: optional("TEST_USER_USERNAME")
                .unwrap_or_else(|| "test_user".to_string()),
        })
    }
}

fn required(var: &str) -> Result<String> {
    optional(var).ok_or_else(|| Error::ConfigMissing {
        var: var.to_string(),
    })
}

fn optional(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The local dev origin is always allowed.
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    let mut origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect();

    if !origins.iter().any(|origin| origin == LOCAL_DEV_ORIGIN) {
        origins.push(LOCAL_DEV_ORIGIN.to_string());
    }

    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cors_origins_adds_local_origin() {
        let origins = parse_cors_origins(" https://vibify.app , ,https://www.vibify.app");
        assert_eq!(
            origins,
            vec![
                "https://vibify.app".to_string(),
                "https://www.vibify.app".to_string(),
                LOCAL_DEV_ORIGIN.to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_cors_origins_keeps_single_local_origin() {
        let origins = parse_cors_origins(DEFAULT_CORS_ORIGINS);
        assert_eq!(
            origins.iter().filter(|o| *o == LOCAL_DEV_ORIGIN).count(),
            1
        );
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }
}
