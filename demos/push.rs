//! Push demo: bind a broadcaster and publish a counter state every second.
//!
//! Run with: cargo run --example push [PORT]
//! Pair with: cargo run --example watch

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use ws_relay::Broadcaster;

const DEFAULT_PORT: u16 = 4680;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ws_relay=debug"))
        .with_target(false)
        .init();

    let port = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(DEFAULT_PORT);

    let server = Broadcaster::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), port).await?;
    println!("Publishing state updates on {}", server.ws_url());
    println!("Press Ctrl+C to exit...");

    let mut revision: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = tokio::time::sleep(Duration::from_secs(1)) => {
                revision += 1;
                let delivered = server.publish(&json!({
                    "type": "state_update",
                    "data": { "revision": revision },
                }))?;
                println!("revision {revision} -> {delivered} client(s)");
            }
        }
    }

    server.shutdown();
    Ok(())
}
