//! Catalog access over the database gateway.
//!
//! [`SongRepository`] is the seam between the services and the gateway; the
//! PostgREST implementation lives here and tests use an in-memory one.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{
    clients::postgrest::{Order, PostgrestClient, TableQuery},
    error::{Error, Result},
    models::{
        database_helpers::IdRow,
        genre::{Genre, NewGenre, SongGenreRow, GENRE_CATEGORY},
        search::{SearchParams, SearchSort},
        song::{LikeRow, NewSongRow, SongRow},
    },
};

const SONGS: &str = "songs";
const GENRES: &str = "genres";
const SONG_GENRES: &str = "song_genres";
const USER_LIKES: &str = "user_likes";
/// Keeps `in.(...)` filters well under common URL length limits.
const ID_CHUNK: usize = 200;

#[async_trait]
pub trait SongRepository: Send + Sync {
    // -- Reads (public only unless stated).
    async fn list_public(&self, limit: usize, offset: usize) -> Result<Vec<SongRow>>;
    async fn count_public(&self) -> Result<u64>;
    async fn popular(&self, limit: usize) -> Result<Vec<SongRow>>;
    /// Any visibility.
    async fn find_by_id(&self, id: &str) -> Result<Option<SongRow>>;
    /// Any visibility, no particular order.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<SongRow>>;
    async fn public_ids(&self) -> Result<Vec<String>>;
    /// Ordered by `created_at DESC, id ASC`.
    async fn public_window(&self, offset: usize, limit: usize) -> Result<Vec<SongRow>>;
    async fn filter_public_ids(&self, ids: &[String]) -> Result<Vec<String>>;
    async fn search(&self, params: &SearchParams, restrict_to: Option<&[String]>)
        -> Result<Vec<SongRow>>;

    // -- Genres.
    async fn list_genres(&self, limit: usize) -> Result<Vec<Genre>>;
    /// Case-insensitive exact match among browsable genres.
    async fn find_genre_exact(&self, name: &str) -> Result<Option<Genre>>;
    async fn song_ids_for_genre(&self, genre_id: &str) -> Result<Vec<String>>;
    async fn genre_names_for_song(&self, song_id: &str) -> Result<Vec<String>>;
    async fn ensure_genres(&self, names: &[String]) -> Result<Vec<Genre>>;
    async fn link_song_genres(&self, song_id: &str, genre_ids: &[String]) -> Result<()>;

    // -- Likes.
    async fn like_exists(&self, user_id: &str, song_id: &str) -> Result<bool>;
    async fn insert_like(&self, user_id: &str, song_id: &str) -> Result<()>;
    async fn delete_like(&self, user_id: &str, song_id: &str) -> Result<()>;
    /// Ordered by song id.
    async fn liked_song_ids(&self, user_id: &str) -> Result<Vec<String>>;
    async fn set_like_count(&self, song_id: &str, like_count: u64) -> Result<()>;

    // -- Writes.
    async fn increment_streams(&self, song_id: &str) -> Result<()>;
    async fn max_song_id(&self) -> Result<Option<u64>>;
    async fn insert_song(&self, song: &NewSongRow) -> Result<SongRow>;
}

pub struct PostgrestCatalog {
    client: Arc<PostgrestClient>,
}

impl PostgrestCatalog {
    pub fn new(client: Arc<PostgrestClient>) -> Self {
        Self { client }
    }

    fn public_songs() -> TableQuery {
        TableQuery::new(SONGS).eq("is_public", true)
    }
}

#[derive(Deserialize)]
struct GenreNameRow {
    genres: Option<GenreName>,
}

#[derive(Deserialize)]
struct GenreName {
    name: String,
}

#[async_trait]
impl SongRepository for PostgrestCatalog {
    async fn list_public(&self, limit: usize, offset: usize) -> Result<Vec<SongRow>> {
        let query = Self::public_songs()
            .select("*")
            .order("created_at", Order::Desc)
            .limit(limit)
            .offset(offset);
        self.client.select(&query).await
    }

    async fn count_public(&self) -> Result<u64> {
        self.client.count(&Self::public_songs()).await
    }

    async fn popular(&self, limit: usize) -> Result<Vec<SongRow>> {
        let query = Self::public_songs()
            .select("*")
            .order("streams", Order::Desc)
            .limit(limit);
        self.client.select(&query).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SongRow>> {
        let query = TableQuery::new(SONGS).select("*").eq("id", id).limit(1);
        let rows: Vec<SongRow> = self.client.select(&query).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<SongRow>> {
        let mut rows = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let query = TableQuery::new(SONGS).select("*").in_list("id", chunk);
            rows.extend(self.client.select::<SongRow>(&query).await?);
        }
        Ok(rows)
    }

    async fn public_ids(&self) -> Result<Vec<String>> {
        let query = Self::public_songs()
            .select("id")
            .order("id", Order::Asc);
        let rows: Vec<IdRow> = self.client.select_all(&query).await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn public_window(&self, offset: usize, limit: usize) -> Result<Vec<SongRow>> {
        let query = Self::public_songs()
            .select("*")
            .order("created_at", Order::Desc)
            .order("id", Order::Asc)
            .limit(limit)
            .offset(offset);
        self.client.select(&query).await
    }

    async fn filter_public_ids(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut public = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let query = Self::public_songs().select("id").in_list("id", chunk);
            let rows: Vec<IdRow> = self.client.select(&query).await?;
            public.extend(rows.into_iter().map(|row| row.id));
        }
        Ok(public)
    }

    async fn search(
        &self,
        params: &SearchParams,
        restrict_to: Option<&[String]>,
    ) -> Result<Vec<SongRow>> {
        let order = if params.descending { Order::Desc } else { Order::Asc };
        let query = Self::public_songs()
            .select("*")
            .plfts("search_vector", &params.query)
            .order(params.sort_by.column(), order)
            .limit(params.limit);

        let Some(ids) = restrict_to else {
            return self.client.select(&query).await;
        };

        // Each chunk returns its own best rows; merge them and keep the overall best.
        let mut rows: Vec<SongRow> = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let chunk_query = query.clone().in_list("id", chunk);
            rows.extend(self.client.select::<SongRow>(&chunk_query).await?);
        }
        sort_search_rows(&mut rows, params.sort_by, params.descending);
        rows.truncate(params.limit);
        Ok(rows)
    }

    async fn list_genres(&self, limit: usize) -> Result<Vec<Genre>> {
        let query = TableQuery::new(GENRES)
            .select("id,name,category")
            .eq("category", GENRE_CATEGORY)
            .order("name", Order::Asc)
            .limit(limit);
        self.client.select(&query).await
    }

    async fn find_genre_exact(&self, name: &str) -> Result<Option<Genre>> {
        let wanted = name.trim().to_lowercase();
        // ilike narrows the candidates; equality below makes it exact.
        let query = TableQuery::new(GENRES)
            .select("id,name,category")
            .eq("category", GENRE_CATEGORY)
            .ilike("name", &wanted);
        let candidates: Vec<Genre> = self.client.select(&query).await?;

        Ok(candidates
            .into_iter()
            .find(|genre| genre.name.to_lowercase() == wanted))
    }

    async fn song_ids_for_genre(&self, genre_id: &str) -> Result<Vec<String>> {
        let query = TableQuery::new(SONG_GENRES)
            .select("song_id,genre_id")
            .eq("genre_id", genre_id)
            .order("song_id", Order::Asc);
        let rows: Vec<SongGenreRow> = self.client.select_all(&query).await?;
        Ok(rows.into_iter().map(|row| row.song_id).collect())
    }

    async fn genre_names_for_song(&self, song_id: &str) -> Result<Vec<String>> {
        let query = TableQuery::new(SONG_GENRES)
            .select("genres(name)")
            .eq("song_id", song_id);
        let rows: Vec<GenreNameRow> = self.client.select(&query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.genres.map(|genre| genre.name))
            .collect())
    }

    async fn ensure_genres(&self, names: &[String]) -> Result<Vec<Genre>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let new_genres: Vec<NewGenre> = names
            .iter()
            .map(|name| NewGenre {
                name: name.clone(),
                category: GENRE_CATEGORY.to_string(),
            })
            .collect();
        self.client
            .insert_ignore_duplicates(GENRES, "name", &new_genres)
            .await?;

        let query = TableQuery::new(GENRES)
            .select("id,name,category")
            .in_list("name", names);
        self.client.select(&query).await
    }

    async fn link_song_genres(&self, song_id: &str, genre_ids: &[String]) -> Result<()> {
        if genre_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<_> = genre_ids
            .iter()
            .map(|genre_id| json!({ "song_id": song_id, "genre_id": genre_id }))
            .collect();
        self.client
            .insert_ignore_duplicates(SONG_GENRES, "song_id,genre_id", &rows)
            .await
    }

    async fn like_exists(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let query = TableQuery::new(USER_LIKES)
            .select("user_id,song_id")
            .eq("user_id", user_id)
            .eq("song_id", song_id)
            .limit(1);
        let rows: Vec<LikeRow> = self.client.select(&query).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_like(&self, user_id: &str, song_id: &str) -> Result<()> {
        self.client
            .insert_ignore_duplicates(
                USER_LIKES,
                "user_id,song_id",
                &json!({ "user_id": user_id, "song_id": song_id }),
            )
            .await
    }

    async fn delete_like(&self, user_id: &str, song_id: &str) -> Result<()> {
        let query = TableQuery::new(USER_LIKES)
            .eq("user_id", user_id)
            .eq("song_id", song_id);
        self.client.delete(&query).await
    }

    async fn liked_song_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let query = TableQuery::new(USER_LIKES)
            .select("user_id,song_id")
            .eq("user_id", user_id)
            .order("song_id", Order::Asc);
        let rows: Vec<LikeRow> = self.client.select_all(&query).await?;
        Ok(rows.into_iter().map(|row| row.song_id).collect())
    }

    async fn set_like_count(&self, song_id: &str, like_count: u64) -> Result<()> {
        let query = TableQuery::new(SONGS).eq("id", song_id);
        self.client
            .update(&query, &json!({ "like_count": like_count }))
            .await
    }

    async fn increment_streams(&self, song_id: &str) -> Result<()> {
        debug!(song_id, "incrementing streams");
        self.client
            .rpc::<_, serde_json::Value>(
                "increment_song_streams",
                &json!({ "song_id_param": song_id }),
            )
            .await?;
        Ok(())
    }

    async fn max_song_id(&self) -> Result<Option<u64>> {
        let query = TableQuery::new(SONGS)
            .select("id")
            .order("id", Order::Desc)
            .limit(1);
        let rows: Vec<IdRow> = self.client.select(&query).await?;

        rows.first()
            .map(|row| {
                row.id.parse::<u64>().map_err(|_| {
                    Error::DbError(format!("song id {} is not numeric", row.id))
                })
            })
            .transpose()
    }

    async fn insert_song(&self, song: &NewSongRow) -> Result<SongRow> {
        let rows: Vec<SongRow> = self.client.insert(SONGS, song).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::DbError("insert returned no row".to_string()))
    }
}

fn sort_search_rows(rows: &mut [SongRow], sort_by: SearchSort, descending: bool) {
    match sort_by {
        SearchSort::Streams => rows.sort_by(|a, b| a.streams.cmp(&b.streams)),
        SearchSort::Title => rows.sort_by(|a, b| a.title.cmp(&b.title)),
        SearchSort::Relevance | SearchSort::CreatedAt => {
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at))
        }
    }
    if descending {
        rows.reverse();
    }
}

/// Ids present in every list, in the order of the first one.
pub fn intersect_ids(lists: &[Vec<String>]) -> Vec<String> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };

    let others: Vec<HashSet<&String>> = rest.iter().map(|list| list.iter().collect()).collect();
    let mut seen = HashSet::new();

    first
        .iter()
        .filter(|id| others.iter().all(|set| set.contains(id)))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}
