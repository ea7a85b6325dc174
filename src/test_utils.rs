//! Fakes shared by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};

use crate::{
    clients::{
        postgrest::PostgrestClient,
        storage::{StorageClient, StorageConfig},
    },
    clock::Clock,
    config::{parse_cors_origins, AppConfig, Environment},
    error::{Error, Result},
    http::{HttpClient, HttpRequest, HttpResponse},
    models::{
        genre::{Genre, GENRE_CATEGORY},
        search::SearchParams,
        song::{NewSongRow, SongRow},
    },
    routes::app_router,
    services::{
        auth_service::{AuthService, AuthSettings},
        catalog_service::SongRepository,
        feed_service::{FeedService, FeedStrategy},
        song_service::SongService,
        upload_service::UploadService,
    },
    AppState,
};

// -- Scripted HTTP.

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

pub struct MockHttpClient {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

// -- Time.

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// -- Object store.

pub const FAKE_BUCKET: &str = "vibify-test";
const FAKE_BUCKET_ID: &str = "bucket-1";
const FAKE_API: &str = "https://api.fake";
const FAKE_DOWNLOAD: &str = "https://download.fake";
const FAKE_UPLOAD_URL: &str = "https://upload.fake/upload";

pub fn storage_config() -> StorageConfig {
    StorageConfig {
        key_id: "key-id".to_string(),
        application_key: "app-key".to_string(),
        bucket_name: FAKE_BUCKET.to_string(),
        api_url: FAKE_API.to_string(),
        audio_folder: "audio".to_string(),
        thumbnail_folder: "thumbnails".to_string(),
        user_audio_folder: "user-audio".to_string(),
        user_thumbnail_folder: "user-thumbnails".to_string(),
    }
}

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<String, Bytes>,
    account_tokens: Vec<String>,
    upload_tokens: HashSet<String>,
    download_tokens: HashMap<String, String>,
    authorize_calls: usize,
    download_authorization_calls: usize,
    reject_credentials: bool,
    next_token: usize,
    last_upload: Option<HttpRequest>,
}

impl StoreState {
    fn token(&mut self, kind: &str) -> String {
        self.next_token += 1;
        format!("{kind}-{}", self.next_token)
    }
}

/// In-memory stand-in for the storage provider's native API.
pub struct FakeObjectStore {
    state: Mutex<StoreState>,
    public_prefixes: Vec<String>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            public_prefixes: vec!["user-audio/".to_string(), "user-thumbnails/".to_string()],
        }
    }

    pub fn reject_credentials(self) -> Self {
        self.state.lock().unwrap().reject_credentials = true;
        self
    }

    pub fn reject_all_authorizations(&self) {
        self.state.lock().unwrap().reject_credentials = true;
    }

    pub fn revoke_tokens(&self) {
        let mut state = self.state.lock().unwrap();
        state.account_tokens.clear();
        state.upload_tokens.clear();
        state.download_tokens.clear();
    }

    pub fn put(&self, key: &str, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(key.to_string(), Bytes::copy_from_slice(bytes));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn authorize_calls(&self) -> usize {
        self.state.lock().unwrap().authorize_calls
    }

    pub fn download_authorization_calls(&self) -> usize {
        self.state.lock().unwrap().download_authorization_calls
    }

    pub fn account_token(&self) -> String {
        self.state
            .lock()
            .unwrap()
            .account_tokens
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn download_token_prefix(&self, token: &str) -> Option<String> {
        let token = urlencoding::decode(token).ok()?.into_owned();
        self.state.lock().unwrap().download_tokens.get(&token).cloned()
    }

    pub fn last_upload_request(&self) -> Option<HttpRequest> {
        self.state.lock().unwrap().last_upload.clone()
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let (path, query) = request.url.split_once('?').unwrap_or((request.url.as_str(), ""));
        let mut state = self.state.lock().unwrap();

        if path == format!("{FAKE_API}/b2api/v2/b2_authorize_account") {
            return Self::authorize(&mut state, request);
        }

        if let Some(operation) = path.strip_prefix(&format!("{FAKE_API}/b2api/v2/")) {
            let token = request.header_value("authorization").unwrap_or_default();
            if !state.account_tokens.iter().any(|t| t == token) {
                return HttpResponse::new(401, r#"{"code":"bad_auth_token"}"#);
            }
            let body: Value = request
                .body
                .as_ref()
                .and_then(|b| serde_json::from_slice(b).ok())
                .unwrap_or(Value::Null);
            return Self::api(&mut state, operation, &body);
        }

        if path == FAKE_UPLOAD_URL {
            return Self::upload(&mut state, request);
        }

        let file_prefix = format!("{FAKE_DOWNLOAD}/file/{FAKE_BUCKET}/");
        if let Some(encoded_key) = path.strip_prefix(&file_prefix) {
            let key = urlencoding::decode(encoded_key)
                .map(|k| k.into_owned())
                .unwrap_or_default();
            let query_token = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("Authorization="))
                .and_then(|t| urlencoding::decode(t).ok())
                .map(|t| t.into_owned());

            let header_ok = request
                .header_value("authorization")
                .is_some_and(|t| state.account_tokens.iter().any(|a| a == t));
            let query_ok = query_token
                .and_then(|t| state.download_tokens.get(&t).cloned())
                .is_some_and(|prefix| key.starts_with(&prefix));
            let public = self.public_prefixes.iter().any(|p| key.starts_with(p));

            if !(header_ok || query_ok || public) {
                return HttpResponse::new(401, "unauthorized");
            }

            return match state.objects.get(&key) {
                Some(bytes) => HttpResponse::new(200, bytes.clone()),
                None => HttpResponse::new(404, "not found"),
            };
        }

        HttpResponse::new(404, "unknown endpoint")
    }

    fn authorize(state: &mut StoreState, request: &HttpRequest) -> HttpResponse {
        state.authorize_calls += 1;
        let expected = format!("Basic {}", BASE64.encode("key-id:app-key"));
        if state.reject_credentials || request.header_value("authorization") != Some(expected.as_str()) {
            return HttpResponse::new(401, r#"{"code":"unauthorized"}"#);
        }

        let token = state.token("acct");
        state.account_tokens.push(token.clone());
        HttpResponse::new(
            200,
            json!({
                "accountId": "acc-1",
                "authorizationToken": token,
                "apiUrl": FAKE_API,
                "downloadUrl": FAKE_DOWNLOAD,
                "allowed": { "bucketId": null, "bucketName": null },
            })
            .to_string(),
        )
    }

    fn api(state: &mut StoreState, operation: &str, body: &Value) -> HttpResponse {
        let reply = match operation {
            "b2_list_buckets" => json!({
                "buckets": [{ "bucketId": FAKE_BUCKET_ID, "bucketName": FAKE_BUCKET }]
            }),
            "b2_get_upload_url" => {
                let token = state.token("upload");
                state.upload_tokens.insert(token.clone());
                json!({ "uploadUrl": FAKE_UPLOAD_URL, "authorizationToken": token })
            }
            "b2_list_file_names" => {
                let start = body["startFileName"].as_str().unwrap_or_default();
                let prefix = body["prefix"].as_str().unwrap_or_default();
                let max = body["maxFileCount"].as_u64().unwrap_or(100) as usize;
                let files: Vec<Value> = state
                    .objects
                    .range(start.to_string()..)
                    .filter(|(name, _)| name.starts_with(prefix))
                    .take(max)
                    .map(|(name, _)| json!({ "fileId": format!("id-{name}"), "fileName": name }))
                    .collect();
                json!({ "files": files })
            }
            "b2_delete_file_version" => {
                let name = body["fileName"].as_str().unwrap_or_default().to_string();
                if body["fileId"].as_str() != Some(format!("id-{name}").as_str())
                    || state.objects.remove(&name).is_none()
                {
                    return HttpResponse::new(400, r#"{"code":"file_not_present"}"#);
                }
                json!({ "fileId": format!("id-{name}"), "fileName": name })
            }
            "b2_get_download_authorization" => {
                state.download_authorization_calls += 1;
                let prefix = body["fileNamePrefix"].as_str().unwrap_or_default().to_string();
                let token = state.token("dl");
                state.download_tokens.insert(token.clone(), prefix.clone());
                json!({
                    "bucketId": FAKE_BUCKET_ID,
                    "fileNamePrefix": prefix,
                    "authorizationToken": token,
                })
            }
            _ => return HttpResponse::new(400, "unsupported operation"),
        };

        HttpResponse::new(200, reply.to_string())
    }

    fn upload(state: &mut StoreState, request: &HttpRequest) -> HttpResponse {
        let token = request.header_value("authorization").unwrap_or_default();
        if !state.upload_tokens.contains(token) {
            return HttpResponse::new(401, "bad upload token");
        }

        let body = request.body.clone().unwrap_or_default();
        let sha1 = hex::encode(Sha1::digest(&body));
        if request.header_value("x-bz-content-sha1") != Some(sha1.as_str()) {
            return HttpResponse::new(400, "checksum mismatch");
        }
        if request.header_value("content-length") != Some(body.len().to_string().as_str()) {
            return HttpResponse::new(400, "length mismatch");
        }

        let key = request
            .header_value("x-bz-file-name")
            .and_then(|name| urlencoding::decode(name).ok())
            .map(|name| name.into_owned())
            .unwrap_or_default();
        state.objects.insert(key.clone(), body);
        state.last_upload = Some(request.clone());

        HttpResponse::new(200, json!({ "fileId": format!("id-{key}"), "fileName": key }).to_string())
    }
}

#[async_trait]
impl HttpClient for FakeObjectStore {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.handle(&request))
    }
}

// -- Catalog.

#[derive(Default)]
struct RepoState {
    songs: BTreeMap<String, SongRow>,
    genres: Vec<Genre>,
    song_genres: Vec<(String, String)>,
    likes: Vec<(String, String)>,
    fail_inserts: bool,
}

impl RepoState {
    fn genre_id(&mut self, name: &str) -> String {
        let name = name.trim().to_lowercase();
        if let Some(genre) = self.genres.iter().find(|g| g.name == name) {
            return genre.id.clone();
        }
        let id = (self.genres.len() + 1).to_string();
        self.genres.push(Genre {
            id: id.clone(),
            name,
            category: Some(GENRE_CATEGORY.to_string()),
        });
        id
    }

    fn public_sorted_by_recency(&self) -> Vec<SongRow> {
        let mut rows: Vec<SongRow> = self.songs.values().filter(|s| s.is_public).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }
}

#[derive(Default)]
pub struct InMemorySongRepository {
    state: Mutex<RepoState>,
}

impl InMemorySongRepository {
    pub fn insert(&self, row: SongRow) {
        self.state.lock().unwrap().songs.insert(row.id.clone(), row);
    }

    pub fn get(&self, id: &str) -> Option<SongRow> {
        self.state.lock().unwrap().songs.get(id).cloned()
    }

    pub fn set_public(&self, id: &str, is_public: bool) {
        if let Some(song) = self.state.lock().unwrap().songs.get_mut(id) {
            song.is_public = is_public;
        }
    }

    /// Links a song to a genre, creating the genre (lowercased) if needed.
    pub fn tag(&self, song_id: &str, genre: &str) {
        let mut state = self.state.lock().unwrap();
        let genre_id = state.genre_id(genre);
        let link = (song_id.to_string(), genre_id);
        if !state.song_genres.contains(&link) {
            state.song_genres.push(link);
        }
    }

    pub fn genres_of(&self, song_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .song_genres
            .iter()
            .filter(|(song, _)| song == song_id)
            .filter_map(|(_, genre_id)| state.genres.iter().find(|g| &g.id == genre_id))
            .map(|g| g.name.clone())
            .collect()
    }

    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_inserts = true;
    }
}

#[async_trait]
impl SongRepository for InMemorySongRepository {
    async fn list_public(&self, limit: usize, offset: usize) -> Result<Vec<SongRow>> {
        let state = self.state.lock().unwrap();
        Ok(state.public_sorted_by_recency().into_iter().skip(offset).take(limit).collect())
    }

    async fn count_public(&self) -> Result<u64> {
        let state = self.state.lock().unwrap();
        Ok(state.songs.values().filter(|s| s.is_public).count() as u64)
    }

    async fn popular(&self, limit: usize) -> Result<Vec<SongRow>> {
        let state = self.state.lock().unwrap();
        let mut rows = state.public_sorted_by_recency();
        rows.sort_by(|a, b| b.streams.cmp(&a.streams));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SongRow>> {
        Ok(self.get(id))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<SongRow>> {
        let state = self.state.lock().unwrap();
        // Reverse on purpose so callers cannot rely on input order.
        Ok(ids.iter().rev().filter_map(|id| state.songs.get(id).cloned()).collect())
    }

    async fn public_ids(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.songs.values().filter(|s| s.is_public).map(|s| s.id.clone()).rev().collect())
    }

    async fn public_window(&self, offset: usize, limit: usize) -> Result<Vec<SongRow>> {
        self.list_public(limit, offset).await
    }

    async fn filter_public_ids(&self, ids: &[String]) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter(|id| state.songs.get(*id).is_some_and(|s| s.is_public))
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        params: &SearchParams,
        restrict_to: Option<&[String]>,
    ) -> Result<Vec<SongRow>> {
        let state = self.state.lock().unwrap();
        let words: Vec<String> = params
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let mut rows: Vec<SongRow> = state
            .public_sorted_by_recency()
            .into_iter()
            .filter(|s| restrict_to.is_none_or(|ids| ids.contains(&s.id)))
            .filter(|s| {
                let haystack = format!("{} {} {}", s.title, s.artist, s.album).to_lowercase();
                words.iter().all(|w| haystack.contains(w.as_str()))
            })
            .collect();

        match params.sort_by.column() {
            "streams" => rows.sort_by(|a, b| a.streams.cmp(&b.streams)),
            "title" => rows.sort_by(|a, b| a.title.cmp(&b.title)),
            _ => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        if params.descending {
            rows.reverse();
        }
        rows.truncate(params.limit);
        Ok(rows)
    }

    async fn list_genres(&self, limit: usize) -> Result<Vec<Genre>> {
        let state = self.state.lock().unwrap();
        let mut genres = state.genres.clone();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        genres.truncate(limit);
        Ok(genres)
    }

    async fn find_genre_exact(&self, name: &str) -> Result<Option<Genre>> {
        let wanted = name.trim().to_lowercase();
        let state = self.state.lock().unwrap();
        Ok(state.genres.iter().find(|g| g.name == wanted).cloned())
    }

    async fn song_ids_for_genre(&self, genre_id: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .song_genres
            .iter()
            .filter(|(_, genre)| genre == genre_id)
            .map(|(song, _)| song.clone())
            .collect())
    }

    async fn genre_names_for_song(&self, song_id: &str) -> Result<Vec<String>> {
        Ok(self.genres_of(song_id))
    }

    async fn ensure_genres(&self, names: &[String]) -> Result<Vec<Genre>> {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<String> = names.iter().map(|name| state.genre_id(name)).collect();
        Ok(state.genres.iter().filter(|g| ids.contains(&g.id)).cloned().collect())
    }

    async fn link_song_genres(&self, song_id: &str, genre_ids: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for genre_id in genre_ids {
            let link = (song_id.to_string(), genre_id.clone());
            if !state.song_genres.contains(&link) {
                state.song_genres.push(link);
            }
        }
        Ok(())
    }

    async fn like_exists(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.likes.iter().any(|(u, s)| u == user_id && s == song_id))
    }

    async fn insert_like(&self, user_id: &str, song_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let like = (user_id.to_string(), song_id.to_string());
        if !state.likes.contains(&like) {
            state.likes.push(like);
        }
        Ok(())
    }

    async fn delete_like(&self, user_id: &str, song_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.likes.retain(|(u, s)| !(u == user_id && s == song_id));
        Ok(())
    }

    async fn liked_song_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state
            .likes
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, s)| s.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn set_like_count(&self, song_id: &str, like_count: u64) -> Result<()> {
        if let Some(song) = self.state.lock().unwrap().songs.get_mut(song_id) {
            song.like_count = like_count;
        }
        Ok(())
    }

    async fn increment_streams(&self, song_id: &str) -> Result<()> {
        if let Some(song) = self.state.lock().unwrap().songs.get_mut(song_id) {
            song.streams += 1;
        }
        Ok(())
    }

    async fn max_song_id(&self) -> Result<Option<u64>> {
        let state = self.state.lock().unwrap();
        Ok(state.songs.keys().filter_map(|id| id.parse().ok()).max())
    }

    async fn insert_song(&self, song: &NewSongRow) -> Result<SongRow> {
        let mut state = self.state.lock().unwrap();
        if state.fail_inserts {
            return Err(Error::DbError("insert rejected".to_string()));
        }

        let row = SongRow {
            id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            duration: song.duration,
            description: song.description.clone(),
            tags: song.tags.clone(),
            is_public: song.is_public,
            uploaded_by: Some(song.uploaded_by.clone()),
            storage_url: Some(song.storage_url.clone()),
            thumbnail_url: Some(song.thumbnail_url.clone()),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        state.songs.insert(row.id.clone(), row.clone());
        Ok(row)
    }
}

/// Public catalog song; higher ids are more recent.
pub fn catalog_row(id: &str, duration: f64) -> SongRow {
    let minutes: i64 = id.parse().unwrap_or(0);
    SongRow {
        id: id.to_string(),
        title: format!("Song {id}"),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        duration,
        is_public: true,
        created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)),
        ..Default::default()
    }
}

// -- Media.

/// Silent 8 kHz mono 16-bit PCM WAV of the given length.
pub fn wav_bytes(seconds: u32) -> Vec<u8> {
    let sample_rate: u32 = 8_000;
    let data_len = sample_rate * 2 * seconds;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

/// `(name, filename, content)` parts into a multipart body and its content type.
pub fn multipart_body(parts: &[(&str, Option<&str>, Vec<u8>)]) -> (String, Vec<u8>) {
    let boundary = "vibify-test-boundary";
    let mut body = Vec::new();

    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

// -- Wiring.

pub struct TestHarness {
    pub repo: Arc<InMemorySongRepository>,
    pub store: Arc<FakeObjectStore>,
    pub clock: Arc<ManualClock>,
    pub songs: SongService,
    pub feed: FeedService,
    pub uploads: UploadService,
    pub auth: AuthService,
    pub config: AppConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let repo = Arc::new(InMemorySongRepository::default());
        let store = Arc::new(FakeObjectStore::new());
        let clock = Arc::new(ManualClock::new());
        let storage = Arc::new(StorageClient::new(
            store.clone(),
            clock.clone(),
            storage_config(),
        ));

        let songs = SongService::new(repo.clone(), storage.clone());
        let auth_http = Arc::new(MockHttpClient::new(|_| {
            Ok(HttpResponse::new(200, r#"{"success": true, "user_id": "u-1", "username": "test_user"}"#))
        }));

        Self {
            feed: FeedService::new(repo.clone(), songs.clone(), FeedStrategy::SeededShuffle),
            uploads: UploadService::new(songs.clone(), storage),
            auth: AuthService::new(
                Arc::new(PostgrestClient::new(auth_http, "https://db.fake", "service")),
                AuthSettings {
                    development: true,
                    test_user_username: "test_user".to_string(),
                    service_key_present: true,
                },
            ),
            config: AppConfig {
                environment: Environment::Development,
                bind_host: "127.0.0.1".to_string(),
                port: 0,
                supabase_url: "https://db.fake".to_string(),
                supabase_anon_key: "anon".to_string(),
                supabase_service_role_key: "service".to_string(),
                service_role_key_set: true,
                storage: storage_config(),
                cors_origins: parse_cors_origins(""),
                discover_strategy: FeedStrategy::SeededShuffle,
                test_user_username: "test_user".to_string(),
            },
            songs,
            repo,
            store,
            clock,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            songs: self.songs.clone(),
            feed: self.feed.clone(),
            auth: self.auth.clone(),
            uploads: self.uploads.clone(),
        }
    }

    pub fn router(&self) -> Router {
        app_router(self.state())
    }
}
