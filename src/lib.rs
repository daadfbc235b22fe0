pub mod api;
pub mod aps;
pub mod auth;
pub mod config;
pub mod error;
pub mod observability;
pub mod storage;
pub mod translation;
pub mod urn;
