pub mod auth;
pub mod feed;
pub mod genre;
pub mod search;
pub mod song;
pub mod upload;

pub mod database_helpers;
pub mod pagination;
