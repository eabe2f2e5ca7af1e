//! Watch demo: open a reconnecting channel and print every notification.
//!
//! Run with: cargo run --example watch [HOST]
//! Pair with: cargo run --example push
//!
//! Kill and restart the push demo while this runs to watch the channel
//! drop to `disconnected` and recover on its own.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ws_relay::{ChannelBuilder, Endpoint};

const DEFAULT_HOST: &str = "127.0.0.1:4680";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ws_relay=debug"))
        .with_target(false)
        .init();

    let host = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let channel = ChannelBuilder::new()
        .endpoint(Endpoint::insecure(host.as_str()))
        .event("state_update")
        .on_message(|notification| {
            println!("[{}] {}", notification.event, notification.action);
        })
        .open()?;

    println!("Watching ws://{host}/__ws__");
    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    channel.close();
    Ok(())
}
