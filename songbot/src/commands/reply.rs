use std::fmt;

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::clients::entities::TrackItem;

/// Longest lyrics excerpt a reply may carry.
pub const SNIPPET_LEN: usize = 400;
/// Platform limit for a single message body.
pub const MESSAGE_LIMIT: usize = 2000;

/// Colour of a message button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    /// Blurple.
    Primary,
    /// Green.
    Success,
    /// Red.
    Danger,
}

impl ButtonStyle {
    /// Every style, in a fixed order.
    pub const CHOICES: [ButtonStyle; 3] =
        [ButtonStyle::Primary, ButtonStyle::Success, ButtonStyle::Danger];

    /// Any of the three styles, for a bit of variety.
    pub fn random() -> Self {
        Self::CHOICES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(ButtonStyle::Primary)
    }
}

/// Clickable component attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Echoed back on click, see [`crate::commands::button_clicked`].
    pub custom_id: String,
    /// Colour of the button.
    pub style: ButtonStyle,
}

/// Rich card with a title line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    /// Bold first line.
    pub title: String,
    /// Body text, may span several lines.
    pub description: String,
}

/// What a command sends back to the chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Plain message text.
    pub content: Option<String>,
    /// Optional card below the text.
    pub embed: Option<Embed>,
    /// Optional single button.
    pub button: Option<Button>,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl Reply {
    /// Plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Reply {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Reply made of a single embed.
    pub fn embed(title: impl Into<String>, description: impl Into<String>) -> Self {
        Reply {
            embed: Some(Embed {
                title: title.into(),
                description: description.into(),
            }),
            ..Default::default()
        }
    }

    /// Show only to the invoking user.
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Attach `button`.
    #[must_use]
    pub fn with_button(mut self, button: Button) -> Self {
        self.button = Some(button);
        self
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sections = Vec::new();
        if let Some(content) = &self.content {
            sections.push(content.clone());
        }
        if let Some(embed) = &self.embed {
            sections.push(format!("{}\n{}", embed.title, embed.description));
        }
        if let Some(button) = &self.button {
            sections.push(format!("[{}] ({:?})", button.label, button.style));
        }
        f.write_str(&sections.join("\n\n"))
    }
}

/// Bounded prefix of `text`: at most [`SNIPPET_LEN`] characters, cut back to
/// the last complete line and marked with `...` when shortened.
pub fn lyrics_snippet(text: &str) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(SNIPPET_LEN) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let head = head.rsplit_once('\n').map_or(head, |(before, _)| before);
    format!("{head}...")
}

fn track_line(position: usize, track: &TrackItem) -> String {
    let name = track.name.as_deref().unwrap_or("Unknown title");
    let artists = if track.artists.is_empty() {
        "Unknown artist".to_string()
    } else {
        track.artists.join(", ")
    };
    match &track.url {
        Some(url) => format!("{position}. {name} — {artists} <{url}>"),
        None => format!("{position}. {name} — {artists}"),
    }
}

/// Numbered track listing that fits in one message.
pub fn track_listing(tracks: &[TrackItem]) -> String {
    // room for the "...and N more" trailer
    const TRAILER_ROOM: usize = 32;

    let mut lines: Vec<String> = Vec::with_capacity(tracks.len());
    let mut used = 0;
    for (i, track) in tracks.iter().enumerate() {
        let line = track_line(i + 1, track);
        let cost = line.chars().count() + 1;
        if used + cost + TRAILER_ROOM > MESSAGE_LIMIT {
            lines.push(format!("...and {} more", tracks.len() - i));
            break;
        }
        used += cost;
        lines.push(line);
    }
    lines.join("\n")
}
