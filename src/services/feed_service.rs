//! Discover feed.
//!
//! The seeded strategy shuffles the full candidate id list with a PRNG keyed
//! by the caller's seed, so every `(seed, cursor, limit)` maps to the same page
//! while the catalog is unchanged and a traversal visits each song once.

use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use strum_macros::{AsRefStr, EnumString};
use tracing::debug;

use crate::{
    error::Result,
    models::feed::FeedPage,
    services::{
        catalog_service::{intersect_ids, SongRepository},
        song_service::SongService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum FeedStrategy {
    #[strum(serialize = "shuffle")]
    SeededShuffle,
    #[strum(serialize = "windowed")]
    Windowed,
}

#[derive(Clone)]
pub struct FeedService {
    repo: Arc<dyn SongRepository>,
    songs: SongService,
    strategy: FeedStrategy,
}

impl FeedService {
    pub fn new(repo: Arc<dyn SongRepository>, songs: SongService, strategy: FeedStrategy) -> Self {
        Self {
            repo,
            songs,
            strategy,
        }
    }

    pub async fn discover(&self, limit: usize, cursor: usize, seed: i64) -> Result<FeedPage> {
        match self.strategy {
            FeedStrategy::SeededShuffle => {
                let ids = self.repo.public_ids().await?;
                self.shuffled_page(ids, limit, cursor, seed).await
            }
            FeedStrategy::Windowed => self.windowed_page(limit, cursor, seed).await,
        }
    }

    /// Songs carrying every requested genre. Genres are matched exactly,
    /// so an unknown genre yields an empty feed.
    pub async fn discover_by_genres(
        &self,
        genres: &[String],
        limit: usize,
        cursor: usize,
        seed: i64,
    ) -> Result<FeedPage> {
        let mut per_genre = Vec::with_capacity(genres.len());
        for name in genres {
            let Some(genre) = self.repo.find_genre_exact(name).await? else {
                debug!(genre = %name, "unknown genre, empty feed");
                return Ok(FeedPage::empty(cursor, seed, 0));
            };
            per_genre.push(self.repo.song_ids_for_genre(&genre.id).await?);
        }

        let candidates = intersect_ids(&per_genre);
        if candidates.is_empty() {
            return Ok(FeedPage::empty(cursor, seed, 0));
        }

        let public = self.repo.filter_public_ids(&candidates).await?;
        self.shuffled_page(public, limit, cursor, seed).await
    }

    async fn shuffled_page(
        &self,
        ids: Vec<String>,
        limit: usize,
        cursor: usize,
        seed: i64,
    ) -> Result<FeedPage> {
        let order = shuffled_ids(ids, seed);
        let total = order.len();

        if cursor >= total {
            return Ok(FeedPage::empty(cursor, seed, total as u64));
        }

        let end = (cursor + limit).min(total);
        let slice = &order[cursor..end];
        let songs = self.songs.songs_by_ids(slice).await?;

        let next_cursor = cursor + slice.len();
        Ok(FeedPage {
            songs,
            next_cursor,
            has_more: next_cursor < total,
            seed,
            total: total as u64,
        })
    }

    async fn windowed_page(&self, limit: usize, cursor: usize, seed: i64) -> Result<FeedPage> {
        let mut rows = self.repo.public_window(cursor, limit + 1).await?;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        if rows.is_empty() {
            return Ok(FeedPage::empty(cursor, seed, 0));
        }

        rows.shuffle(&mut StdRng::seed_from_u64(window_seed(seed, cursor)));
        let next_cursor = cursor + rows.len();
        let songs = self.songs.decorate_all(rows).await?;

        Ok(FeedPage {
            songs,
            next_cursor,
            has_more,
            seed,
            total: 0,
        })
    }
}

/// Sorts first so the permutation depends only on the set of ids and the seed.
pub fn shuffled_ids(mut ids: Vec<String>, seed: i64) -> Vec<String> {
    ids.sort();
    ids.dedup();
    ids.shuffle(&mut StdRng::seed_from_u64(seed as u64));
    ids
}

fn window_seed(seed: i64, cursor: usize) -> u64 {
    (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ cursor as u64
}
