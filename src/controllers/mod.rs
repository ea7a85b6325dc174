pub mod auth_controller;
pub mod song_controller;
pub mod upload_controller;
