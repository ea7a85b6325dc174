use std::{net::SocketAddr, sync::Arc};

use crate::{
    clients::{postgrest::PostgrestClient, storage::StorageClient},
    clock::SystemClock,
    config::AppConfig,
    http::{HttpClient, ReqwestHttpClient, DEFAULT_TIMEOUT},
    routes::app_router,
    services::{
        auth_service::{AuthService, AuthSettings},
        catalog_service::{PostgrestCatalog, SongRepository},
        feed_service::FeedService,
        song_service::SongService,
        upload_service::UploadService,
    },
};

pub use self::error::{Error, Result};

mod clients;
mod clock;
mod config;
mod controllers;
mod error;
mod helpers;
mod http;
mod middlewares;
mod models;
mod routes;
mod services;
mod validators;

#[cfg(test)]
mod test_utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub songs: SongService,
    pub feed: FeedService,
    pub auth: AuthService,
    pub uploads: UploadService,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.environment.default_log_filter());

    tracing::info!("Starting Vibify API...");

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(DEFAULT_TIMEOUT)?);

    let catalog_client = Arc::new(PostgrestClient::new(
        http.clone(),
        &config.supabase_url,
        &config.supabase_anon_key,
    ));
    let auth_client = Arc::new(PostgrestClient::new(
        http.clone(),
        &config.supabase_url,
        &config.supabase_service_role_key,
    ));
    tracing::info!("Database gateway at: {}", config.supabase_url);

    let storage = Arc::new(StorageClient::new(
        http,
        Arc::new(SystemClock),
        config.storage.clone(),
    ));
    storage.warm_up().await;
    tracing::info!("Storage session: {:?}", storage.state().await);

    let repo: Arc<dyn SongRepository> = Arc::new(PostgrestCatalog::new(catalog_client));
    let songs = SongService::new(repo.clone(), storage.clone());
    tracing::info!("Discover strategy: {}", config.discover_strategy.as_ref());

    let app_state = AppState {
        feed: FeedService::new(repo, songs.clone(), config.discover_strategy),
        auth: AuthService::new(
            auth_client,
            AuthSettings {
                development: config.environment.is_development(),
                test_user_username: config.test_user_username.clone(),
                service_key_present: config.service_role_key_set,
            },
        ),
        uploads: UploadService::new(songs.clone(), storage),
        songs,
        config: Arc::new(config),
    };

    let addr: SocketAddr = format!("{}:{}", app_state.config.bind_host, app_state.config.port)
        .parse()
        .map_err(|_| Error::InvalidInput {
            reason: "BIND_HOST/PORT do not form a valid socket address".to_string(),
        })?;

    let routes_all = app_router(app_state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, routes_all).await?;

    Ok(())
}

fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
