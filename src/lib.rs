#![forbid(unsafe_code)]

//! Extracts title, description and a cleaned English transcript for YouTube
//! videos and playlists, and writes them as JSON or plain text.

pub mod captions;
pub mod config;
pub mod extractor;
pub mod fetch;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod text;
