//! Shared types for the playlist sync client: the JSON bodies exchanged with
//! the playlist server, persisted configuration, and platform paths.

pub mod config;
pub mod platform;
pub mod protocol;
