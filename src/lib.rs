pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod cursor;
pub mod guard;
pub mod links;
pub mod models;
pub mod redirect;
pub mod seed;
pub mod storage;

pub use app::build_app;
