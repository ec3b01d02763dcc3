//! Songbot - chat commands backed by Genius and Spotify
//!
//! This library identifies songs from lyrics snippets, fetches lyrics pages and
//! lists Spotify playlists. Every lookup degrades to "nothing found" instead of
//! failing, so a broken or unconfigured provider only disables the features
//! that need it.

/// Client modules for interacting with the lyrics and streaming providers
pub mod clients;
/// Bot commands built on top of the clients
pub mod commands;
/// Credentials and their sources
pub mod config;
