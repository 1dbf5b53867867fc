pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod redirect;
pub mod shortener;
pub mod storage;
