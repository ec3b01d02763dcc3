use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::{debug, info};
use songbot::clients::{ReqwestTransport, errors::Result};
use songbot::commands::{Bot, Command, Reply, Responder};
use songbot::config::{Config, ConfigBuilder};

#[derive(Parser)]
#[command(name = "songbot")]
#[command(version, about = "Guess songs from lyrics, fetch lyrics and list Spotify playlists", long_about = None)]
struct Cli {
    /// JSON file with credentials, consulted for keys the environment lacks
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Guess the song from a lyrics snippet (Genius + Spotify)
    Guess { lyrics: String },
    /// Fetch a short lyrics snippet and a link to the full lyrics
    Lyrics {
        /// Song title and/or artist to search for
        #[arg(long)]
        query: Option<String>,
        /// Direct Genius song URL
        #[arg(long)]
        url: Option<String>,
    },
    /// List the tracks of a Spotify playlist
    Playlist {
        /// Playlist link, spotify:playlist: URI or bare id
        playlist: String,
        /// Maximum number of tracks (1-100)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the demo button
    Button,
    /// Report which credentials are configured
    CheckConfig,
}

impl Commands {
    fn into_command(self) -> Option<Command> {
        match self {
            Commands::Guess { lyrics } => Some(Command::Guess { lyrics }),
            Commands::Lyrics { query, url } => Some(Command::Lyrics { query, url }),
            Commands::Playlist { playlist, limit } => Some(Command::Playlist { playlist, limit }),
            Commands::Button => Some(Command::Button),
            Commands::CheckConfig => None,
        }
    }
}

/// Prints replies to the terminal.
struct StdoutResponder;

#[async_trait]
impl Responder for StdoutResponder {
    async fn defer(&self, ephemeral: bool) -> Result<()> {
        debug!("Deferred (ephemeral: {ephemeral})");
        Ok(())
    }

    async fn follow_up(&self, reply: &Reply) -> Result<()> {
        println!("{reply}");
        Ok(())
    }

    async fn respond(&self, reply: &Reply) -> Result<()> {
        println!("{reply}");
        Ok(())
    }
}

/// Parse the command line and run one subcommand.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    info!("Building config ...");
    let mut builder = ConfigBuilder::new();
    if let Some(path) = cli.config {
        builder = builder.config_path(path);
    }
    let config = builder.build().await?;

    match cli.command.into_command() {
        Some(command) => run_command(&config, command).await,
        None => {
            check_config(&config);
            Ok(())
        }
    }
}

async fn run_command(config: &Config, command: Command) -> Result<()> {
    config.warn_missing();
    let transport = Arc::new(ReqwestTransport::try_default()?);
    let bot = Bot::from_config(config, transport);
    bot.handle(command, &StdoutResponder).await
}

fn check_config(config: &Config) {
    let missing = config.missing_keys();
    if missing.is_empty() {
        println!("All credentials are configured.");
        return;
    }
    for key in missing {
        println!("missing: {key}");
    }
}
