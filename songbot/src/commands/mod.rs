//! User-facing commands.
//!
//! Each command runs exactly one lookup pipeline and turns its outcome,
//! including every "nothing found", into a [`Reply`].

/// Sending replies back to the chat
pub mod delivery;
/// Reply model and text formatting
pub mod reply;

use std::sync::Arc;

use log::{info, warn};

use crate::clients::{
    GeniusClient, SpotifyClient, errors::Result, spotify::normalize_playlist_id,
    transport::Transport,
};
use crate::config::Config;
pub use delivery::{Responder, deliver};
pub use reply::{Button, ButtonStyle, Embed, Reply};

/// Tracks listed when `/playlist` is given no limit.
pub const DEFAULT_PLAYLIST_LIMIT: usize = 10;
/// Largest accepted `/playlist` limit; bigger values are clamped.
pub const MAX_PLAYLIST_LIMIT: usize = 100;
/// Custom id carried by the `/button` demo button.
pub const DEMO_BUTTON_ID: &str = "songbot:demo-button";

/// A slash command invocation with its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Guess the song from a lyrics snippet (Genius + Spotify).
    Guess {
        /// Free-text snippet as typed.
        lyrics: String,
    },
    /// Short lyrics excerpt for a query or a Genius song URL.
    Lyrics {
        /// Search text, used when no `url` is given.
        query: Option<String>,
        /// Genius song page; takes precedence over `query`.
        url: Option<String>,
    },
    /// Tracks of a Spotify playlist.
    Playlist {
        /// Link, URI or bare id.
        playlist: String,
        /// Defaults to [`DEFAULT_PLAYLIST_LIMIT`].
        limit: Option<usize>,
    },
    /// A button that does nothing useful.
    Button,
}

impl Command {
    /// Slash command name, without the slash.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Guess { .. } => "guess",
            Command::Lyrics { .. } => "lyrics",
            Command::Playlist { .. } => "playlist",
            Command::Button => "button",
        }
    }

    /// Commands that call providers are acknowledged first and answered later.
    pub fn defers(&self) -> bool {
        !matches!(self, Command::Button)
    }

    /// Whether the answer is shown only to the invoking user.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Command::Lyrics { .. })
    }
}

/// Runs commands against the configured providers.
pub struct Bot {
    genius: GeniusClient,
    spotify: SpotifyClient,
}

impl Bot {
    /// Bot over already-built clients.
    pub fn new(genius: GeniusClient, spotify: SpotifyClient) -> Self {
        Bot { genius, spotify }
    }

    /// Both clients share `transport`.
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Bot {
            genius: GeniusClient::new(transport.clone(), config.genius_token.clone()),
            spotify: SpotifyClient::new(transport, config.spotify.clone()),
        }
    }

    /// Reply for `command`. Never fails; provider trouble becomes a message.
    pub async fn run(&self, command: Command) -> Reply {
        info!("Running /{}", command.name());
        match command {
            Command::Guess { lyrics } => self.guess(&lyrics).await,
            Command::Lyrics { query, url } => self.lyrics(query.as_deref(), url.as_deref()).await,
            Command::Playlist { playlist, limit } => self.playlist(&playlist, limit).await,
            Command::Button => demo_button(),
        }
    }

    /// Run `command` and answer through `responder`, deferring first when the
    /// command talks to providers.
    pub async fn handle(&self, command: Command, responder: &dyn Responder) -> Result<()> {
        let deferred = if command.defers() {
            match responder.defer(command.is_ephemeral()).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Could not defer /{}: {e}", command.name());
                    false
                }
            }
        } else {
            false
        };
        let reply = self.run(command).await;
        deliver(responder, &reply, deferred).await
    }

    /// `/guess`: Genius match plus, when available, a Spotify link.
    pub async fn guess(&self, lyrics: &str) -> Reply {
        let Some(song) = self.genius.identify(lyrics).await else {
            return Reply::text("No match found on Genius for that lyrics snippet.");
        };

        let title = song.title.as_deref().unwrap_or("Unknown title");
        let artist = song.artist.as_deref().unwrap_or("Unknown artist");

        let token = self.spotify.app_token().await;
        if token.is_none() {
            warn!("Spotify is unavailable, answering without a track link");
        }
        let spotify_url = self
            .spotify
            .find_track_link(
                song.title.as_deref().unwrap_or_default(),
                song.artist.as_deref().unwrap_or_default(),
                token.as_ref(),
            )
            .await;

        let genius_line = match &song.page_url {
            Some(url) => format!("Found a likely match on Genius: {url}"),
            None => "Found a likely match on Genius.".to_string(),
        };
        let spotify_line = match spotify_url {
            Some(url) => format!("Spotify link: {url}"),
            None => "Spotify match not found.".to_string(),
        };
        Reply::embed(
            format!("{title} — {artist}"),
            format!("{genius_line}\n{spotify_line}"),
        )
    }

    /// `/lyrics`: bounded excerpt and a link to the full page.
    pub async fn lyrics(&self, query: Option<&str>, url: Option<&str>) -> Reply {
        let query = query.filter(|q| !q.trim().is_empty());
        let url = url.filter(|u| !u.trim().is_empty());

        let target_url = match (url, query) {
            (Some(url), _) => url.trim().to_string(),
            (None, Some(query)) => {
                match self.genius.identify(query).await.and_then(|s| s.page_url) {
                    Some(url) => url,
                    None => {
                        return Reply::text("No match found on Genius for that query.").ephemeral();
                    }
                }
            }
            (None, None) => {
                return Reply::text("Provide either `query` or `url` to fetch lyrics.").ephemeral();
            }
        };

        let Some(text) = self
            .genius
            .extract_lyrics(&target_url)
            .await
            .filter(|t| !t.trim().is_empty())
        else {
            return Reply::text("Could not extract lyrics from the Genius page.").ephemeral();
        };

        let snippet = reply::lyrics_snippet(&text);
        Reply::text(format!(
            "Lyrics snippet:\n{snippet}\n\nFull lyrics are available on Genius: {target_url}"
        ))
        .ephemeral()
    }

    /// Track listing for a playlist reference typed by a user; whitespace
    /// around the reference is ignored.
    pub async fn playlist(&self, playlist: &str, limit: Option<usize>) -> Reply {
        let playlist = playlist.trim();
        if normalize_playlist_id(playlist).is_none() {
            return Reply::text("That doesn't look like a Spotify playlist link, URI or id.");
        }
        let limit = limit
            .unwrap_or(DEFAULT_PLAYLIST_LIMIT)
            .clamp(1, MAX_PLAYLIST_LIMIT);

        match self.spotify.list_playlist_tracks(playlist, None, limit).await {
            Some(tracks) => Reply::text(reply::track_listing(&tracks)),
            None => Reply::text("Could not fetch tracks for that playlist."),
        }
    }
}

/// `/button`: a message with a randomly styled button.
pub fn demo_button() -> Reply {
    Reply::text("Here is a button for you.").with_button(Button {
        label: "Click me!".to_string(),
        custom_id: DEMO_BUTTON_ID.to_string(),
        style: ButtonStyle::random(),
    })
}

/// Acknowledgement for a click on a button this bot created.
pub fn button_clicked(custom_id: &str) -> Option<Reply> {
    (custom_id == DEMO_BUTTON_ID).then(|| Reply::text("You clicked the button!").ephemeral())
}
