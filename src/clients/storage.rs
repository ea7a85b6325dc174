//! Object storage access over the B2 native JSON API.
//!
//! One account session is cached behind a `RwLock` and refreshed lazily at the
//! start of any call that needs it. Private folders are served through
//! download authorizations scoped to the folder prefix, cached inside the
//! session so they expire with it.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::{Error, Result},
    http::{HttpClient, HttpRequest, HttpResponse, TRANSFER_TIMEOUT},
};

/// Lifetime of an account authorization as issued by the provider.
pub const SESSION_LIFETIME_HOURS: i64 = 24;
/// Refresh this long before the provider-side expiry.
pub const SESSION_SAFETY_MARGIN_HOURS: i64 = 1;
const CACHE_CONTROL: &str = "max-age=86400";
const MAX_DOWNLOAD_AUTH_SECS: i64 = 604_800;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub key_id: String,
    pub application_key: String,
    pub bucket_name: String,
    pub api_url: String,
    pub audio_folder: String,
    pub thumbnail_folder: String,
    pub user_audio_folder: String,
    pub user_thumbnail_folder: String,
}

impl StorageConfig {
    /// User upload folders are served without a token.
    pub fn is_public_folder(&self, folder: &str) -> bool {
        folder == self.user_audio_folder || folder == self.user_thumbnail_folder
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Expired,
}

#[derive(Debug, Clone)]
struct StorageSession {
    authorization_token: String,
    api_url: String,
    download_url: String,
    account_id: String,
    bucket_id: String,
    bucket_name: String,
    expires_at: DateTime<Utc>,
    download_tokens: HashMap<String, String>,
}

impl StorageSession {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    account_id: String,
    authorization_token: String,
    api_url: String,
    download_url: String,
    #[serde(default)]
    allowed: Option<AllowedScope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllowedScope {
    bucket_id: Option<String>,
    bucket_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBucketsResponse {
    buckets: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketEntry {
    bucket_id: String,
    bucket_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlResponse {
    upload_url: String,
    authorization_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFileNamesResponse {
    files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    file_id: String,
    file_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadAuthorizationResponse {
    authorization_token: String,
}

pub struct StorageClient {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    config: StorageConfig,
    session: RwLock<Option<StorageSession>>,
}

impl StorageClient {
    pub fn new(http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, config: StorageConfig) -> Self {
        Self {
            http,
            clock,
            config,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub async fn state(&self) -> SessionState {
        match self.session.read().await.as_ref() {
            None => SessionState::Unauthenticated,
            Some(session) if session.is_valid_at(self.clock.now()) => SessionState::Authenticated,
            Some(_) => SessionState::Expired,
        }
    }

    /// Authenticates eagerly. Failures are logged so the server still boots.
    pub async fn warm_up(&self) {
        match self.session().await {
            Ok(_) => info!("storage session established"),
            Err(err) => error!("storage warm-up failed: {err:?}"),
        }
    }

    /// Playback URL for `folder/filename`. Empty inputs give an empty URL.
    pub async fn resolve_playback_url(&self, folder: &str, filename: &str) -> Result<String> {
        let filename = strip_folder_prefix(folder, filename);
        if folder.is_empty() || filename.is_empty() {
            return Ok(String::new());
        }

        let session = self.session().await?;
        let url = build_file_url(&session.download_url, &session.bucket_name, folder, filename);

        if self.config.is_public_folder(folder) {
            return Ok(url);
        }

        let token = self.download_token(&session, folder).await?;
        Ok(format!("{url}?Authorization={}", urlencoding::encode(&token)))
    }

    /// Uploads `bytes` to `folder/filename` and returns its playback URL.
    pub async fn upload(
        &self,
        bytes: Bytes,
        filename: &str,
        folder: &str,
        content_type: &str,
    ) -> Result<String> {
        let filename = strip_folder_prefix(folder, filename);
        let key = object_key(folder, filename);
        let session = self.session().await?;

        let upload_target: UploadUrlResponse = self
            .api_call(
                &session,
                "b2_get_upload_url",
                &json!({ "bucketId": session.bucket_id }),
            )
            .await?
            .json()?;

        let sha1 = hex::encode(Sha1::digest(&bytes));
        let size = bytes.len();

        debug!(key = %key, size, "uploading object");
        let request = HttpRequest::post(&upload_target.upload_url)
            .header("authorization", &upload_target.authorization_token)
            .header("x-bz-file-name", encode_key(&key))
            .header("content-type", content_type)
            .header("x-bz-content-sha1", sha1)
            .header("content-length", size.to_string())
            .header("x-bz-info-b2-cache-control", urlencoding::encode(CACHE_CONTROL))
            .body(bytes)
            .timeout(TRANSFER_TIMEOUT);

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            error!(key = %key, status = response.status, "upload rejected");
            return Err(Error::StorageError(format!(
                "upload of {key} failed with {}: {}",
                response.status,
                response.text()
            )));
        }

        info!(key = %key, size, "uploaded object");
        self.resolve_playback_url(folder, filename).await
    }

    pub async fn file_exists(&self, folder: &str, filename: &str) -> Result<bool> {
        let filename = strip_folder_prefix(folder, filename);
        if folder.is_empty() || filename.is_empty() {
            return Ok(false);
        }
        Ok(self.find_file(&object_key(folder, filename)).await?.is_some())
    }

    /// Deletes the latest version of `folder/filename`. A missing file is not an error.
    pub async fn delete(&self, folder: &str, filename: &str) -> Result<()> {
        let filename = strip_folder_prefix(folder, filename);
        let key = object_key(folder, filename);

        let Some(file) = self.find_file(&key).await? else {
            warn!(key = %key, "delete skipped, object not found");
            return Ok(());
        };

        let session = self.session().await?;
        self.api_call(
            &session,
            "b2_delete_file_version",
            &json!({ "fileName": file.file_name, "fileId": file.file_id }),
        )
        .await?;

        info!(key = %key, "deleted object");
        Ok(())
    }

    /// Fetches the object bytes with the account authorization.
    pub async fn download(&self, folder: &str, filename: &str) -> Result<Bytes> {
        let filename = strip_folder_prefix(folder, filename);
        let key = object_key(folder, filename);
        let session = self.session().await?;

        let url = build_file_url(&session.download_url, &session.bucket_name, folder, filename);
        let request = HttpRequest::get(url)
            .header("authorization", &session.authorization_token)
            .timeout(TRANSFER_TIMEOUT);

        let response = self.http.execute(request).await?;
        match response.status {
            200..=299 => Ok(response.body),
            404 => Err(Error::FileNotFound { key }),
            401 => {
                self.invalidate().await;
                Err(Error::StorageError(format!("download of {key} unauthorized")))
            }
            status => Err(Error::StorageError(format!(
                "download of {key} failed with {status}"
            ))),
        }
    }

    // -- Session handling.

    async fn session(&self) -> Result<StorageSession> {
        let now = self.clock.now();
        {
            let guard = self.session.read().await;
            if let Some(session) = guard.as_ref().filter(|s| s.is_valid_at(now)) {
                return Ok(session.clone());
            }
        }

        // Two callers may both get here and authorize twice; the last write wins.
        let fresh = self.authorize().await?;
        *self.session.write().await = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate(&self) {
        warn!("storage session rejected, clearing cached authorization");
        *self.session.write().await = None;
    }

    async fn authorize(&self) -> Result<StorageSession> {
        let issued_at = self.clock.now();
        let credentials = BASE64.encode(format!(
            "{}:{}",
            self.config.key_id, self.config.application_key
        ));
        let url = format!(
            "{}/b2api/v2/b2_authorize_account",
            self.config.api_url.trim_end_matches('/')
        );

        debug!("authorizing storage account");
        let response = self
            .http
            .execute(HttpRequest::get(url).header("authorization", format!("Basic {credentials}")))
            .await?;

        if matches!(response.status, 401 | 403) {
            return Err(Error::StorageAuthFailed {
                reason: format!("credentials rejected with {}", response.status),
            });
        }
        if !response.is_success() {
            return Err(Error::StorageError(format!(
                "authorize failed with {}",
                response.status
            )));
        }

        let auth: AuthorizeAccountResponse = response.json()?;
        let mut session = StorageSession {
            authorization_token: auth.authorization_token,
            api_url: auth.api_url,
            download_url: auth.download_url,
            account_id: auth.account_id,
            bucket_id: String::new(),
            bucket_name: self.config.bucket_name.clone(),
            expires_at: issued_at + Duration::hours(SESSION_LIFETIME_HOURS)
                - Duration::hours(SESSION_SAFETY_MARGIN_HOURS),
            download_tokens: HashMap::new(),
        };

        let restricted = auth
            .allowed
            .and_then(|scope| scope.bucket_id.map(|id| (id, scope.bucket_name)));

        session.bucket_id = match restricted {
            Some((bucket_id, bucket_name)) => {
                if bucket_name.as_deref() != Some(self.config.bucket_name.as_str()) {
                    return Err(Error::StorageAuthFailed {
                        reason: format!(
                            "key is restricted to another bucket than {}",
                            self.config.bucket_name
                        ),
                    });
                }
                bucket_id
            }
            None => self.lookup_bucket_id(&session).await?,
        };

        info!(bucket = %session.bucket_name, "storage account authorized");
        Ok(session)
    }

    async fn lookup_bucket_id(&self, session: &StorageSession) -> Result<String> {
        let listing: ListBucketsResponse = self
            .api_call(
                session,
                "b2_list_buckets",
                &json!({
                    "accountId": session.account_id,
                    "bucketName": self.config.bucket_name,
                }),
            )
            .await?
            .json()?;

        listing
            .buckets
            .into_iter()
            .find(|bucket| bucket.bucket_name == self.config.bucket_name)
            .map(|bucket| bucket.bucket_id)
            .ok_or_else(|| Error::StorageAuthFailed {
                reason: format!("bucket {} not found for this account", self.config.bucket_name),
            })
    }

    async fn download_token(&self, session: &StorageSession, folder: &str) -> Result<String> {
        if let Some(token) = session.download_tokens.get(folder) {
            return Ok(token.clone());
        }

        let valid_secs = (session.expires_at - self.clock.now())
            .num_seconds()
            .clamp(1, MAX_DOWNLOAD_AUTH_SECS);

        let auth: DownloadAuthorizationResponse = self
            .api_call(
                session,
                "b2_get_download_authorization",
                &json!({
                    "bucketId": session.bucket_id,
                    "fileNamePrefix": format!("{folder}/"),
                    "validDurationInSeconds": valid_secs,
                }),
            )
            .await?
            .json()?;

        let mut guard = self.session.write().await;
        if let Some(current) = guard
            .as_mut()
            .filter(|s| s.authorization_token == session.authorization_token)
        {
            current
                .download_tokens
                .insert(folder.to_string(), auth.authorization_token.clone());
        }

        Ok(auth.authorization_token)
    }

    async fn find_file(&self, key: &str) -> Result<Option<FileEntry>> {
        let session = self.session().await?;
        let listing: ListFileNamesResponse = self
            .api_call(
                &session,
                "b2_list_file_names",
                &json!({
                    "bucketId": session.bucket_id,
                    "startFileName": key,
                    "prefix": key,
                    "maxFileCount": 10,
                }),
            )
            .await?
            .json()?;

        Ok(listing.files.into_iter().find(|file| file.file_name == key))
    }

    async fn api_call(
        &self,
        session: &StorageSession,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let url = format!("{}/b2api/v2/{operation}", session.api_url);
        let request = HttpRequest::post(url)
            .header("authorization", &session.authorization_token)
            .json(body)?;

        debug!(operation, "storage api call");
        let response = self.http.execute(request).await?;

        if response.status == 401 {
            self.invalidate().await;
            return Err(Error::StorageError(format!("{operation} unauthorized")));
        }
        if !response.is_success() {
            error!(operation, status = response.status, "storage api error");
            return Err(Error::StorageError(format!(
                "{operation} failed with {}: {}",
                response.status,
                response.text()
            )));
        }

        Ok(response)
    }
}

/// `audio/0000001.mp3` under folder `audio` becomes `0000001.mp3`.
pub fn strip_folder_prefix<'a>(folder: &str, filename: &'a str) -> &'a str {
    if folder.is_empty() {
        return filename;
    }
    filename
        .strip_prefix(folder)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(filename)
}

fn object_key(folder: &str, filename: &str) -> String {
    format!("{folder}/{filename}")
}

/// Percent-encodes each path segment, keeping the separators.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_file_url(download_url: &str, bucket: &str, folder: &str, filename: &str) -> String {
    format!(
        "{}/file/{}/{}",
        download_url.trim_end_matches('/'),
        bucket,
        encode_key(&object_key(folder, filename))
    )
}
