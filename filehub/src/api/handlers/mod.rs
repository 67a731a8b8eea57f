//! Axum route handlers.

pub mod files;
pub mod storage;
