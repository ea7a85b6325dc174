pub mod auth_service;
pub mod catalog_service;
pub mod feed_service;
pub mod song_service;
pub mod upload_service;
