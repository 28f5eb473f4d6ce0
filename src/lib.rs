pub mod api;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod identity;
pub mod merge;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
