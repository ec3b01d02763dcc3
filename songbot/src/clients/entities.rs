use std::fmt;

use serde::Serialize;

/// Short-lived app token from the client-credentials exchange.
/// Requested fresh for every top-level operation and never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw access token.
    pub fn new(token: impl Into<String>) -> Self {
        BearerToken(token.into())
    }

    /// Raw token, for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Top hit of a lyrics search. Fields the provider omits stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongMatch {
    /// Song title.
    pub title: Option<String>,
    /// Primary artist name.
    pub artist: Option<String>,
    /// Song page, the input of lyrics extraction.
    pub page_url: Option<String>,
}

/// Public URL of a streaming track.
pub type TrackLink = String;

/// Plain-text lyrics, line breaks preserved.
pub type LyricsText = String;

/// Playlist id that passed normalization; safe to use as a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub(crate) fn new_unchecked(id: &str) -> Self {
        PlaylistId(id.to_string())
    }

    /// The bare id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One playlist entry, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackItem {
    /// Track title; `None` for entries the provider could not resolve.
    pub name: Option<String>,
    /// Artist names in credit order, possibly empty.
    pub artists: Vec<String>,
    /// Public track link.
    pub url: Option<String>,
}
