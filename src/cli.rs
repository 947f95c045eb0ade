use std::path::PathBuf;

use clap::Parser;

/// Broadcast a file of messages to a Twitch extension channel at a fixed
/// cadence.
///
/// Values omitted here may also come from `BROADCASTER_*` environment
/// variables; see [`crate::config::Config::load`].
#[derive(Debug, Parser)]
#[command(name = "pubsub-broadcaster", version, about)]
pub struct Cli {
    /// How many ms to wait inbetween messages
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// A file containing messages
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Log outbound payloads and response headers
    #[arg(short, long)]
    pub verbose: bool,

    /// Whether to endlessly repeat the data
    #[arg(short, long)]
    pub repeat: bool,

    /// The channel to send the data to
    #[arg(long)]
    pub channel: Option<String>,

    /// The extension owner
    #[arg(long)]
    pub owner: Option<String>,

    /// The extension client id
    #[arg(long)]
    pub extension: Option<String>,

    /// The extension secret, base64 encoded
    #[arg(long)]
    pub secret: Option<String>,
}
