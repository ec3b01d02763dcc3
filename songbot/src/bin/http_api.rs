//! HTTP front end exposing the bot commands as JSON endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use log::info;
use serde::Deserialize;
use songbot::clients::ReqwestTransport;
use songbot::commands::{Bot, Command, Reply, button_clicked};
use songbot::config::ConfigBuilder;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

type SharedBot = Arc<Bot>;

#[derive(Deserialize)]
struct GuessRequest {
    lyrics: String,
}

#[derive(Deserialize)]
struct LyricsRequest {
    query: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistRequest {
    playlist: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct ButtonClickRequest {
    custom_id: String,
}

async fn health() -> &'static str {
    "ok"
}

async fn guess(State(bot): State<SharedBot>, Json(req): Json<GuessRequest>) -> Json<Reply> {
    Json(bot.run(Command::Guess { lyrics: req.lyrics }).await)
}

async fn lyrics(State(bot): State<SharedBot>, Json(req): Json<LyricsRequest>) -> Json<Reply> {
    Json(
        bot.run(Command::Lyrics {
            query: req.query,
            url: req.url,
        })
        .await,
    )
}

async fn playlist(State(bot): State<SharedBot>, Json(req): Json<PlaylistRequest>) -> Json<Reply> {
    Json(
        bot.run(Command::Playlist {
            playlist: req.playlist,
            limit: req.limit,
        })
        .await,
    )
}

async fn button(State(bot): State<SharedBot>) -> Json<Reply> {
    Json(bot.run(Command::Button).await)
}

async fn button_click(Json(req): Json<ButtonClickRequest>) -> Result<Json<Reply>, StatusCode> {
    button_clicked(&req.custom_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn router(bot: SharedBot) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/guess", post(guess))
        .route("/lyrics", post(lyrics))
        .route("/playlist", post(playlist))
        .route("/button", post(button))
        .route("/button/click", post(button_click))
        .with_state(bot)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ConfigBuilder::new().build().await?;
    config.warn_missing();

    let transport = Arc::new(ReqwestTransport::try_default()?);
    let bot = Arc::new(Bot::from_config(&config, transport));

    let addr = std::env::var("SONGBOT_HTTP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, router(bot)).await?;

    Ok(())
}
