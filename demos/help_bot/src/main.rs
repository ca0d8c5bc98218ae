//! Help Bot Example
//!
//! A console front end for the help-desk handlers in this package. Every line
//! typed on stdin becomes one event for a single conversation; replies are
//! printed to stdout.
//!
//! # Input
//!
//! ```text
//! help me          plain channel message
//! @bot hello       message mentioning the bot
//! /dm hello        direct message to the bot
//! /pin             pin added
//! /file notes.txt  file shared
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package help-bot -- --user alice
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use help_bot::handlers;
use parley::prelude::*;
use parley::runtime::ConfigLoader;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(version, about = "A console help-desk bot")]
struct Args {
    /// Configuration file to load instead of searching the default locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (development, production, ...).
    #[arg(short, long)]
    profile: Option<String>,

    /// Channel id used for every event.
    #[arg(long, default_value = "console")]
    channel: String,

    /// User id used for every event.
    #[arg(long, default_value = "you")]
    user: String,
}

// ============================================================================
// Console Reply Sink
// ============================================================================

/// Prints replies to stdout, prefixed with the bot's name.
struct ConsoleSink {
    name: String,
}

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn reply(&self, _event: &Event, message: Message) -> ReplyResult<()> {
        for line in message.text.lines() {
            println!("{}> {line}", self.name);
        }
        Ok(())
    }
}

// ============================================================================
// Console Adapter
// ============================================================================

/// Turns one line of console input into an event.
fn parse_line(key: &ConversationKey, line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let event = if line == "/pin" {
        Event::builder(EventType::PinAdded, key.clone()).build()
    } else if let Some(file) = line.strip_prefix("/file ") {
        Event::builder(EventType::FileShared, key.clone())
            .raw(json!({ "file": { "name": file.trim() } }))
            .build()
    } else if let Some(text) = line.strip_prefix("/dm ") {
        Event::text_event(EventType::DirectMessage, key.clone(), text.trim())
    } else if let Some(rest) = line.strip_prefix('@') {
        // Drop the mentioned name, keep the rest of the message
        let text = rest.split_once(' ').map(|(_, t)| t).unwrap_or_default();
        Event::text_event(EventType::DirectMention, key.clone(), text.trim())
    } else {
        Event::text_event(EventType::Message, key.clone(), line)
    };
    Some(event)
}

async fn read_console(key: ConversationKey, tx: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(event) = parse_line(&key, &line)
                    && tx.send(event).await.is_err()
                {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        }
    }
    debug!("Console input closed");
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;
    let bot_name = config.bot.name.clone();

    let runtime = ParleyRuntime::builder()
        .config(config)
        .handlers(handlers(&bot_name))
        .reply_sink(ConsoleSink {
            name: bot_name.clone(),
        })
        .build()?;

    let (tx, rx) = mpsc::channel(128);
    let key = ConversationKey::new(args.channel, args.user);
    tokio::spawn(read_console(key, tx));

    println!("{bot_name} is listening. Type \"help me\" or \"mood\" to start; Ctrl+D to quit.");
    runtime.run(rx).await?;

    Ok(())
}
