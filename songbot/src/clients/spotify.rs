use std::pin::pin;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::stream::{self, TryStreamExt};
use log::{debug, warn};
use serde::Deserialize;
use url::Url;

use crate::clients::{
    decode::null_as_default,
    entities::{BearerToken, PlaylistId, TrackItem, TrackLink},
    errors::{Error, Result},
    transport::{HttpRequest, Transport},
};
use crate::config::SpotifyCredentials;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE_URL: &str = "https://api.spotify.com/v1";
const PLAYLIST_URI_PREFIX: &str = "spotify:playlist:";
const WEB_HOST: &str = "spotify.com";

/// Largest page the playlist endpoint serves.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ApiArtist {
    name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ApiTrack {
    name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    artists: Vec<ApiArtist>,
    #[serde(default, deserialize_with = "null_as_default")]
    external_urls: ExternalUrls,
}

#[derive(Deserialize, Debug, Default)]
struct ApiTrackPage {
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<ApiTrack>,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    tracks: ApiTrackPage,
}

#[derive(Deserialize, Debug)]
struct ApiPlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Deserialize, Debug)]
struct PlaylistPage {
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<ApiPlaylistItem>,
    next: Option<String>,
}

impl From<ApiTrack> for TrackItem {
    fn from(t: ApiTrack) -> TrackItem {
        TrackItem {
            name: t.name,
            artists: t.artists.into_iter().filter_map(|a| a.name).collect(),
            url: t.external_urls.spotify,
        }
    }
}

impl From<ApiPlaylistItem> for TrackItem {
    fn from(item: ApiPlaylistItem) -> TrackItem {
        item.track.map(TrackItem::from).unwrap_or_default()
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn as_playlist_id(candidate: &str) -> Option<PlaylistId> {
    (!candidate.is_empty() && candidate.chars().all(is_id_char))
        .then(|| PlaylistId::new_unchecked(candidate))
}

fn is_spotify_host(host: &str) -> bool {
    host == WEB_HOST || host.ends_with(".spotify.com")
}

/// Reduce a playlist URI, web link or bare id to the id itself.
///
/// Accepted shapes, tried in this order:
/// `spotify:playlist:<id>`, `https://open.spotify.com/playlist/<id>[/...][?...]`,
/// and a bare id made of ASCII letters, digits, `_` and `-`.
/// Whitespace anywhere, including around the reference, makes it invalid.
pub fn normalize_playlist_id(reference: &str) -> Option<PlaylistId> {
    // The URL parser would silently strip these
    if reference.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }

    if let Some(id) = reference.strip_prefix(PLAYLIST_URI_PREFIX) {
        return as_playlist_id(id);
    }

    if let Ok(url) = Url::parse(reference) {
        if url.host_str().is_some_and(is_spotify_host) {
            let mut segments = url.path_segments()?;
            if segments.next() == Some("playlist") {
                return segments.next().and_then(as_playlist_id);
            }
        }
        return None;
    }

    as_playlist_id(reference)
}

/// Spotify Web API access with app (client-credentials) authentication.
pub struct SpotifyClient {
    transport: Arc<dyn Transport>,
    credentials: Option<SpotifyCredentials>,
}

impl SpotifyClient {
    /// `credentials` are only needed for [`SpotifyClient::app_token`].
    pub fn new(transport: Arc<dyn Transport>, credentials: Option<SpotifyCredentials>) -> Self {
        SpotifyClient {
            transport,
            credentials,
        }
    }

    /// Exchange an id/secret pair for an app token. A single attempt; any
    /// failure yields `None`. Empty credentials never reach the network.
    pub async fn obtain_token(&self, client_id: &str, client_secret: &str) -> Option<BearerToken> {
        if client_id.is_empty() || client_secret.is_empty() {
            debug!("Spotify credentials are incomplete, not requesting a token");
            return None;
        }
        match self.request_token(client_id, client_secret).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Spotify token request failed: {e}");
                None
            }
        }
    }

    /// Fresh token for the credentials this client was configured with.
    pub async fn app_token(&self) -> Option<BearerToken> {
        let Some(creds) = &self.credentials else {
            debug!("No Spotify credentials configured");
            return None;
        };
        self.obtain_token(&creds.client_id, &creds.client_secret)
            .await
    }

    async fn request_token(&self, client_id: &str, client_secret: &str) -> Result<BearerToken> {
        let basic = STANDARD.encode(format!("{client_id}:{client_secret}"));
        let request = HttpRequest::post(TOKEN_URL)
            .header("Authorization", format!("Basic {basic}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials");

        let response = self.transport.send(request).await?;
        if !response.is_ok() {
            return Err(Error::UnexpectedStatus(response.status));
        }
        let body: TokenResponse = serde_json::from_str(&response.body)?;
        body.access_token
            .filter(|t| !t.is_empty())
            .map(BearerToken::new)
            .ok_or_else(|| Error::NotFound("access_token in token response".into()))
    }

    /// Public link of the first track the search ranks for `title` by `artist`.
    pub async fn find_track_link(
        &self,
        title: &str,
        artist: &str,
        token: Option<&BearerToken>,
    ) -> Option<TrackLink> {
        let Some(token) = token else {
            debug!("No Spotify token, skipping track search");
            return None;
        };
        match self.search_track(title, artist, token).await {
            Ok(link) => Some(link),
            Err(e) => {
                debug!("No Spotify track for {title} - {artist}: {e}");
                None
            }
        }
    }

    async fn search_track(&self, title: &str, artist: &str, token: &BearerToken) -> Result<TrackLink> {
        let request = HttpRequest::get(format!("{API_BASE_URL}/search"))
            .query("q", format!("track:{title} artist:{artist}"))
            .query("type", "track")
            .query("limit", 1)
            .bearer(token.as_str());

        let response = self.transport.send(request).await?;
        if !response.is_ok() {
            return Err(Error::UnexpectedStatus(response.status));
        }
        let body: SearchResponse = serde_json::from_str(&response.body)?;
        body.tracks
            .items
            .into_iter()
            .next()
            .and_then(|t| t.external_urls.spotify)
            .ok_or_else(|| Error::NotFound("track search returned no items".into()))
    }

    /// Tracks of a playlist, in playlist order, at most `limit` of them.
    ///
    /// Without a `token` one is requested with the configured credentials.
    /// A failed page discards everything fetched so far.
    pub async fn list_playlist_tracks(
        &self,
        playlist_ref: &str,
        token: Option<BearerToken>,
        limit: usize,
    ) -> Option<Vec<TrackItem>> {
        let Some(id) = normalize_playlist_id(playlist_ref) else {
            debug!("Not a playlist reference: {playlist_ref:?}");
            return None;
        };
        if limit == 0 {
            return None;
        }
        let token = match token {
            Some(token) => token,
            None => self.app_token().await?,
        };

        match self.collect_playlist_tracks(&id, &token, limit).await {
            Ok(tracks) if tracks.is_empty() => {
                debug!("Playlist {id} has no tracks");
                None
            }
            Ok(tracks) => Some(tracks),
            Err(e) => {
                warn!("Listing playlist {id} failed: {e}");
                None
            }
        }
    }

    async fn collect_playlist_tracks(
        &self,
        id: &PlaylistId,
        token: &BearerToken,
        limit: usize,
    ) -> Result<Vec<TrackItem>> {
        let page_size = limit.min(MAX_PAGE_SIZE);

        // Pages are fetched lazily, so nothing past `limit` is requested
        let pages = stream::try_unfold(Some(0usize), move |offset| async move {
            let Some(offset) = offset else {
                return Ok::<_, Error>(None);
            };
            let page = self.fetch_playlist_page(id, token, offset, page_size).await?;
            let next_offset =
                (page.next.is_some() && !page.items.is_empty()).then_some(offset + page_size);
            Ok(Some((page.items, next_offset)))
        });
        let mut pages = pin!(pages);

        let mut tracks = Vec::with_capacity(page_size);
        while let Some(items) = pages.try_next().await? {
            let remaining = limit - tracks.len();
            tracks.extend(items.into_iter().take(remaining).map(TrackItem::from));
            if tracks.len() >= limit {
                break;
            }
        }
        Ok(tracks)
    }

    async fn fetch_playlist_page(
        &self,
        id: &PlaylistId,
        token: &BearerToken,
        offset: usize,
        page_size: usize,
    ) -> Result<PlaylistPage> {
        debug!("Fetching playlist {id} tracks at offset {offset}");
        let request = HttpRequest::get(format!("{API_BASE_URL}/playlists/{id}/tracks"))
            .query("limit", page_size)
            .query("offset", offset)
            .bearer(token.as_str());

        let response = self.transport.send(request).await?;
        if !response.is_ok() {
            return Err(Error::UnexpectedStatus(response.status));
        }
        Ok(serde_json::from_str(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clients::transport::testing::FakeTransport;

    fn client(fake: &Arc<FakeTransport>) -> SpotifyClient {
        SpotifyClient::new(fake.clone(), SpotifyCredentials::new("id", "secret"))
    }

    fn token() -> Option<BearerToken> {
        Some(BearerToken::new("tok"))
    }

    fn playlist_page(names: &[&str], next: Option<&str>) -> String {
        let items: Vec<_> = names
            .iter()
            .map(|name| {
                json!({"track": {
                    "name": name,
                    "artists": [{"name": "Artist"}],
                    "external_urls": {"spotify": format!("https://open.spotify.com/track/{name}")}
                }})
            })
            .collect();
        json!({"items": items, "next": next}).to_string()
    }

    #[test]
    fn normalizes_uri_url_and_bare_id() {
        let id = |r| normalize_playlist_id(r).map(|id| id.as_str().to_string());
        assert_eq!(id("spotify:playlist:abc123").as_deref(), Some("abc123"));
        assert_eq!(
            id("https://open.spotify.com/playlist/abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=ff00").as_deref(),
            Some("37i9dQZF1DXcBWIGoYBM5M")
        );
        assert_eq!(
            id("https://open.spotify.com/playlist/abc/extra").as_deref(),
            Some("abc")
        );
        assert_eq!(id("abc_12-3").as_deref(), Some("abc_12-3"));
        assert!(id("  abc123 ").is_none());
    }

    #[test]
    fn rejects_malformed_references() {
        assert!(normalize_playlist_id("").is_none());
        assert!(normalize_playlist_id("spotify:playlist:").is_none());
        assert!(normalize_playlist_id("spotify:playlist:a/b").is_none());
        assert!(normalize_playlist_id("abc/123").is_none());
        assert!(normalize_playlist_id("abc 123").is_none());
        assert!(normalize_playlist_id(" abc123").is_none());
        assert!(normalize_playlist_id("abc\t").is_none());
        assert!(normalize_playlist_id("\nspotify:playlist:abc").is_none());
        assert!(normalize_playlist_id("spotify:playlist:abc ").is_none());
        assert!(normalize_playlist_id(" https://open.spotify.com/playlist/abc").is_none());
        assert!(normalize_playlist_id("https://open.spotify.com/play\tlist/abc").is_none());
        assert!(normalize_playlist_id("https://example.com/playlist/abc").is_none());
        assert!(normalize_playlist_id("https://open.spotify.com/album/abc").is_none());
        assert!(normalize_playlist_id("https://open.spotify.com/playlist/").is_none());
    }

    #[tokio::test]
    async fn empty_secret_makes_no_request() {
        let fake = Arc::new(FakeTransport::new());
        let spotify = client(&fake);

        assert!(spotify.obtain_token("id", "").await.is_none());
        assert!(spotify.obtain_token("", "secret").await.is_none());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn token_exchange_uses_basic_auth() {
        let fake = Arc::new(FakeTransport::new().reply(200, r#"{"access_token": "abc"}"#));
        let spotify = client(&fake);

        let token = spotify.obtain_token("id", "secret").await;
        assert_eq!(token, Some(BearerToken::new("abc")));

        let request = fake.request(0);
        assert_eq!(request.url, TOKEN_URL);
        assert_eq!(request.header_value("authorization"), Some("Basic aWQ6c2VjcmV0"));
        assert_eq!(request.body.as_deref(), Some("grant_type=client_credentials"));
    }

    #[tokio::test]
    async fn token_exchange_degrades_to_none() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(401, r#"{"error": "invalid_client"}"#)
                .fail()
                .reply(200, r#"{"token_type": "Bearer"}"#),
        );
        let spotify = client(&fake);

        assert!(spotify.obtain_token("id", "secret").await.is_none());
        assert!(spotify.obtain_token("id", "secret").await.is_none());
        assert!(spotify.obtain_token("id", "secret").await.is_none());
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn track_search_returns_first_item() {
        let body = json!({"tracks": {"items": [
            {"external_urls": {"spotify": "https://open.example/track/1"}},
            {"external_urls": {"spotify": "https://open.example/track/2"}}
        ]}});
        let fake = Arc::new(FakeTransport::new().reply(200, &body.to_string()));
        let spotify = client(&fake);

        let link = spotify
            .find_track_link("Bohemian Rhapsody", "Queen", token().as_ref())
            .await;
        assert_eq!(link.as_deref(), Some("https://open.example/track/1"));

        let request = fake.request(0);
        assert_eq!(
            request.query_value("q"),
            Some("track:Bohemian Rhapsody artist:Queen")
        );
        assert_eq!(request.query_value("limit"), Some("1"));
        assert_eq!(request.header_value("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn track_search_without_match_or_token_is_none() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(200, r#"{"tracks": {"items": []}}"#)
                .reply(500, "oops"),
        );
        let spotify = client(&fake);

        assert!(spotify.find_track_link("a", "b", None).await.is_none());
        assert_eq!(fake.calls(), 0);
        assert!(spotify.find_track_link("a", "b", token().as_ref()).await.is_none());
        assert!(spotify.find_track_link("a", "b", token().as_ref()).await.is_none());
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn single_page_playlist() {
        let body = json!({"items": [{"track": {
            "name": "Song1",
            "artists": [{"name": "A"}],
            "external_urls": {"spotify": "u"}
        }}], "next": null});
        let fake = Arc::new(FakeTransport::new().reply(200, &body.to_string()));
        let spotify = client(&fake);

        let tracks = spotify
            .list_playlist_tracks("https://open.spotify.com/playlist/abc", token(), 10)
            .await
            .unwrap();
        assert_eq!(
            tracks,
            vec![TrackItem {
                name: Some("Song1".into()),
                artists: vec!["A".into()],
                url: Some("u".into()),
            }]
        );
        let request = fake.request(0);
        assert!(request.url.ends_with("/v1/playlists/abc/tracks"));
        assert_eq!(request.query_value("limit"), Some("10"));
        assert_eq!(request.query_value("offset"), Some("0"));
    }

    #[tokio::test]
    async fn follows_next_pages_until_limit() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(200, &playlist_page(&["a", "b"], Some("page-2")))
                .reply(200, &playlist_page(&["c", "d"], Some("page-3"))),
        );
        let spotify = client(&fake);

        let tracks = spotify
            .list_playlist_tracks("spotify:playlist:abc", token(), 3)
            .await
            .unwrap();
        let names: Vec<_> = tracks.iter().filter_map(|t| t.name.as_deref()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(fake.calls(), 2);
        assert_eq!(fake.request(1).query_value("offset"), Some("3"));
    }

    #[tokio::test]
    async fn stops_when_provider_has_no_next_page() {
        let fake = Arc::new(FakeTransport::new().reply(200, &playlist_page(&["a", "b"], None)));
        let spotify = client(&fake);

        let tracks = spotify
            .list_playlist_tracks("abc", token(), 50)
            .await
            .unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn never_returns_more_than_limit() {
        let names: Vec<String> = (0..100).map(|i| format!("t{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        for limit in [1, 7, 99, 100] {
            let fake = Arc::new(FakeTransport::new().reply(200, &playlist_page(&names, Some("more"))));
            let spotify = client(&fake);
            let tracks = spotify
                .list_playlist_tracks("abc", token(), limit)
                .await
                .unwrap();
            assert_eq!(tracks.len(), limit);
            assert_eq!(fake.calls(), 1);
        }
    }

    #[tokio::test]
    async fn failed_second_page_discards_everything() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(200, &playlist_page(&["a", "b"], Some("page-2")))
                .reply(502, "bad gateway"),
        );
        let spotify = client(&fake);

        assert!(spotify.list_playlist_tracks("abc", token(), 4).await.is_none());
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn not_found_playlist_is_none() {
        let fake = Arc::new(FakeTransport::new().reply(404, "{}"));
        let spotify = client(&fake);

        assert!(spotify.list_playlist_tracks("invalid", token(), 5).await.is_none());
    }

    #[tokio::test]
    async fn requests_app_token_when_none_given() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(200, r#"{"access_token": "fresh"}"#)
                .reply(200, &playlist_page(&["a"], None)),
        );
        let spotify = client(&fake);

        let tracks = spotify.list_playlist_tracks("abc", None, 10).await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(
            fake.request(1).header_value("authorization"),
            Some("Bearer fresh")
        );
    }

    #[tokio::test]
    async fn no_request_without_token_credentials_or_valid_ref() {
        let fake = Arc::new(FakeTransport::new());
        let spotify = SpotifyClient::new(fake.clone(), None);

        assert!(spotify.list_playlist_tracks("abc", None, 10).await.is_none());
        assert!(spotify.list_playlist_tracks("not a ref!", token(), 10).await.is_none());
        assert!(spotify.list_playlist_tracks("abc", token(), 0).await.is_none());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn null_tracks_keep_their_slot() {
        let body = json!({"items": [{"track": null}, {"track": {"name": "x", "artists": null}}], "next": null});
        let fake = Arc::new(FakeTransport::new().reply(200, &body.to_string()));
        let spotify = client(&fake);

        let tracks = spotify.list_playlist_tracks("abc", token(), 10).await.unwrap();
        assert_eq!(tracks[0], TrackItem::default());
        assert_eq!(tracks[1].name.as_deref(), Some("x"));
        assert!(tracks[1].artists.is_empty());
    }

    #[tokio::test]
    async fn empty_page_with_next_link_ends_listing() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(200, &playlist_page(&["a"], Some("page-2")))
                .reply(200, &playlist_page(&[], Some("page-3"))),
        );
        let spotify = client(&fake);

        let tracks = spotify.list_playlist_tracks("abc", token(), 5).await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(fake.calls(), 2);
    }
}
