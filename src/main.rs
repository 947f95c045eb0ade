use std::sync::Arc;

use clap::Parser;
use pubsub_broadcaster::cli::Cli;
use pubsub_broadcaster::config::Config;
use pubsub_broadcaster::message_file;
use pubsub_broadcaster::outbound::{BroadcastHttpClient, Dispatcher, MessageQueue, TokenIssuer};
use pubsub_broadcaster::telemetry;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    telemetry::init_tracing(config.verbose);

    tracing::info!(
        "Configured extension {} with owner {}",
        config.extension,
        config.owner
    );
    tracing::info!("Sending to channel {}", config.channel);

    let messages = message_file::load_messages(&config.file).await?;
    let queue = MessageQueue::new(messages, config.repeat);
    let issuer = TokenIssuer::from_config(&config)?;
    let client = Arc::new(BroadcastHttpClient::new()?);

    let summary = Dispatcher::new(queue, issuer, client, &config).run().await;
    tracing::info!(attempted = summary.attempted, "Done");
    Ok(())
}
