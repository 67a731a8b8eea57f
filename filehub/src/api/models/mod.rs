//! Request and response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire. The client module serializes and deserializes the same
//! types.

pub mod files;
pub mod storage;
