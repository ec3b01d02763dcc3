use std::sync::Arc;

use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::clients::{
    decode::null_as_default,
    entities::{LyricsText, SongMatch},
    errors::{Error, Result},
    transport::{HttpRequest, Transport},
};

const SEARCH_URL: &str = "https://api.genius.com/search";
const PAGE_USER_AGENT: &str = "lyrics-bot/1.0";

// Current markup splits lyrics over several of these
const LYRICS_CONTAINER_SELECTOR: &str = r#"div[data-lyrics-container="true"]"#;
const LEGACY_LYRICS_SELECTOR: &str = ".lyrics";

#[derive(Deserialize, Debug, Default)]
struct PrimaryArtist {
    name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct HitResult {
    title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    primary_artist: PrimaryArtist,
    url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Hit {
    #[serde(default, deserialize_with = "null_as_default")]
    result: HitResult,
}

#[derive(Deserialize, Debug, Default)]
struct SearchBody {
    #[serde(default, deserialize_with = "null_as_default")]
    hits: Vec<Hit>,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    response: SearchBody,
}

impl From<HitResult> for SongMatch {
    fn from(r: HitResult) -> SongMatch {
        SongMatch {
            title: r.title,
            artist: r.primary_artist.name,
            page_url: r.url,
        }
    }
}

/// Genius search API plus scraping of song pages.
pub struct GeniusClient {
    transport: Arc<dyn Transport>,
    api_token: Option<String>,
}

impl GeniusClient {
    /// Without a token, searches are skipped; page scraping still works.
    pub fn new(transport: Arc<dyn Transport>, api_token: Option<String>) -> Self {
        GeniusClient {
            transport,
            api_token,
        }
    }

    /// Identify a song with the configured API token.
    pub async fn identify(&self, snippet: &str) -> Option<SongMatch> {
        self.identify_song(snippet, self.api_token.as_deref()).await
    }

    /// Top search hit for a free-text lyrics snippet.
    ///
    /// Only a missing token short-circuits; an empty snippet is still sent.
    pub async fn identify_song(&self, snippet: &str, api_token: Option<&str>) -> Option<SongMatch> {
        let Some(api_token) = api_token.filter(|t| !t.is_empty()) else {
            debug!("No Genius token, skipping search");
            return None;
        };
        match self.search(snippet, api_token).await {
            Ok(song) => Some(song),
            Err(e) => {
                debug!("Genius search for {snippet:?} found nothing: {e}");
                None
            }
        }
    }

    async fn search(&self, snippet: &str, api_token: &str) -> Result<SongMatch> {
        let request = HttpRequest::get(SEARCH_URL)
            .query("q", snippet)
            .bearer(api_token);

        let response = self.transport.send(request).await?;
        if !response.is_ok() {
            return Err(Error::UnexpectedStatus(response.status));
        }
        let body: SearchResponse = serde_json::from_str(&response.body)?;
        body.response
            .hits
            .into_iter()
            .next()
            .map(|hit| SongMatch::from(hit.result))
            .ok_or_else(|| Error::NotFound("search returned no hits".into()))
    }

    /// Download a song page and pull the lyrics out of it. No truncation
    /// happens here; callers decide how much to show.
    pub async fn extract_lyrics(&self, page_url: &str) -> Option<LyricsText> {
        match self.fetch_page(page_url).await {
            Ok(html) => lyrics_from_html(&html),
            Err(e) => {
                warn!("Could not fetch lyrics page {page_url}: {e}");
                None
            }
        }
    }

    async fn fetch_page(&self, page_url: &str) -> Result<String> {
        let request = HttpRequest::get(page_url).header("User-Agent", PAGE_USER_AGENT);
        let response = self.transport.send(request).await?;
        if !response.is_ok() {
            return Err(Error::UnexpectedStatus(response.status));
        }
        Ok(response.body)
    }
}

type Extractor = fn(&Html) -> Option<LyricsText>;

/// Tried in order, first hit wins.
const EXTRACTORS: [(&str, Extractor); 2] = [
    ("lyrics containers", from_lyrics_containers),
    ("legacy container", from_legacy_container),
];

/// Lyrics text of a Genius song page, or `None` if the page has no known
/// lyrics markup.
pub fn lyrics_from_html(html: &str) -> Option<LyricsText> {
    let document = Html::parse_document(html);
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let text = extract(&document)?;
        debug!("Lyrics taken from {name}");
        Some(text)
    })
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css)
        .map_err(|e| warn!("Bad selector {css}: {e:?}"))
        .ok()
}

fn from_lyrics_containers(document: &Html) -> Option<LyricsText> {
    let selector = selector(LYRICS_CONTAINER_SELECTOR)?;
    let blocks: Vec<String> = document.select(&selector).map(block_text).collect();
    if blocks.is_empty() {
        return None;
    }
    Some(blocks.join("\n").trim().to_string())
}

fn from_legacy_container(document: &Html) -> Option<LyricsText> {
    let selector = selector(LEGACY_LYRICS_SELECTOR)?;
    document.select(&selector).next().map(block_text)
}

/// Text of every descendant text node, trimmed, one per line.
fn block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
