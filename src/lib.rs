pub mod api;
pub mod bucket;
pub mod config;
pub mod entities;
pub mod error;
pub mod library;
pub mod moments;
pub mod reconcile;
pub mod storage;
pub mod utils;
