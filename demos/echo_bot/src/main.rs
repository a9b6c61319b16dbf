//! Echo Bot Example
//!
//! A small bot showing the pieces of the framework working together:
//!
//! - commands with arguments (`/echo`, `/ping`, `/help`, `/stop`)
//! - a plain-text echo
//! - inline buttons answered through a regex callback pattern
//! - a timing middleware wrapping every update
//! - an error handler for the polling loop
//!
//! # Usage
//!
//! ```bash
//! MAXBOT_API__TOKEN=... cargo run --package echo-bot
//! cargo run --package echo-bot -- --config maxbot.toml --marker 1234
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use maxbot::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "Echo bot for the MAX messenger")]
struct Cli {
    /// Configuration file (defaults to maxbot.toml in the usual places)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resume polling from this marker
    #[arg(long)]
    marker: Option<i64>,
}

// ============================================================================
// Replies
// ============================================================================

async fn send_text(api: &Api, chat_id: i64, text: &str) -> Result<(), BoxError> {
    api.call(
        ApiRequest::post("messages")
            .query("chat_id", chat_id)
            .body(json!({ "text": text })),
    )
    .await?;
    Ok(())
}

async fn reply(api: &Api, message: &Message, text: &str) -> Result<(), BoxError> {
    match message.chat_id() {
        Some(chat_id) => send_text(api, chat_id, text).await,
        None => {
            warn!("Message has no chat to reply to");
            Ok(())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn echo_command(message: Message, args: CommandArgs, api: Api) -> Result<(), BoxError> {
    if args.is_empty() {
        return reply(&api, &message, "Usage: /echo <text>").await;
    }
    reply(&api, &message, &args.join(" ")).await
}

async fn ping(message: Message, api: Api) -> Result<(), BoxError> {
    reply(&api, &message, "Pong!").await
}

async fn help(message: Message, api: Api) -> Result<(), BoxError> {
    let chat_id = message.chat_id().unwrap_or_default();
    api.call(
        ApiRequest::post("messages")
            .query("chat_id", chat_id)
            .body(json!({
                "text": "/echo <text> - echo text\n/ping - pong\n/help - this help\n/stop - stop the bot",
                "attachments": [{
                    "type": "inline_keyboard",
                    "payload": {"buttons": [[
                        {"type": "callback", "text": "Like", "payload": "vote_like"},
                        {"type": "callback", "text": "Dislike", "payload": "vote_dislike"}
                    ]]}
                }]
            })),
    )
    .await?;
    Ok(())
}

async fn stop(message: Message, control: BotControl, api: Api) -> Result<(), BoxError> {
    reply(&api, &message, "Bye!").await?;
    control.stop();
    Ok(())
}

/// Echoes plain text back; commands are left to their own handlers.
async fn echo_text(message: Message, api: Api) -> Result<(), BoxError> {
    match message.text() {
        Some(text) if !text.starts_with('/') => reply(&api, &message, text).await,
        _ => Ok(()),
    }
}

async fn vote(callback: CallbackQuery, captures: Captures, api: Api) -> Result<(), BoxError> {
    let choice = captures.get(1).unwrap_or("nothing");
    api.call(
        ApiRequest::post("answers")
            .query("callback_id", &callback.callback_id)
            .body(json!({ "notification": format!("You voted {choice}") })),
    )
    .await?;
    Ok(())
}

async fn greet(update: Arc<Update>, api: Api) -> Result<(), BoxError> {
    if let Some(chat_id) = update.chat_id.as_deref().and_then(|id| id.parse().ok()) {
        send_text(&api, chat_id, "Hello! Send /help to see what I can do.").await?;
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;

    let bot = Bot::from_config(&config)?;
    if cli.marker.is_some() {
        bot.set_marker(cli.marker);
    }

    bot.use_middleware(from_fn(|ctx, next| async move {
        let started = Instant::now();
        let update_type = ctx.update().update_type;
        let result = next.run(ctx).await;
        debug!(%update_type, elapsed = ?started.elapsed(), ok = result.is_ok(), "Update handled");
        result
    }));

    bot.on_command("echo", echo_command)
        .on_command("ping", ping)
        .on_command("help", help)
        .on_command("stop", stop)
        .on_message(echo_text)
        .on_bot_started(greet)
        .on_callback_query("/^vote_(\\w+)$/", vote)?;

    bot.on_error(|error: PollError| async move {
        warn!(%error, "Polling loop error");
        if error.is_fetch() {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    });

    info!(marker = ?bot.marker(), "Echo bot starting");
    bot.run().await?;
    info!(marker = ?bot.marker(), "Echo bot stopped");

    Ok(())
}
