//! Tail a live log stream
//!
//! Run with: cargo run --example tail -- [URL] [QUERY] [CAPACITY]
//!
//! Examples:
//!   cargo run --example tail                                        # tcp://127.0.0.1:9000
//!   cargo run --example tail -- tcp://logs:9000 '{job="api"}' 200
//!
//! The server side is any process writing one JSON push message per line:
//!
//!   echo '{"streams":[{"labels":"{level=\"info\"}","entries":[{"line":"hello"}]}]}' | nc -l 9000
//!
//! Two consumers attach to the same URL to show that they share one
//! connection. Set RUST_LOG=logtail_cache=debug to watch the cache work.

use logtail_cache::cache::{StreamCache, StreamEvent, StreamTarget};
use logtail_cache::transport::TcpTransport;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "tcp://127.0.0.1:9000".to_string());
    let query = args.next().unwrap_or_default();
    let capacity = match args.next() {
        Some(raw) => raw.parse()?,
        None => 100,
    };

    let cache = StreamCache::new(TcpTransport::new());
    let target = StreamTarget::new(url.clone(), query, capacity);

    let mut table = cache.get_stream(&target.clone().ref_id("table"))?;
    let mut counter = cache.get_stream(&target.ref_id("counter"))?;

    // Second consumer only reports sizes
    let counter_task = tokio::spawn(async move {
        while let Some(event) = counter.next().await {
            if let StreamEvent::Snapshot(snapshot) = event {
                println!("[counter] {} rows buffered", snapshot.len());
            }
        }
    });

    while let Some(event) = table.next().await {
        match event {
            StreamEvent::Snapshot(snapshot) => {
                if let Some(row) = snapshot.last() {
                    let labels: Vec<String> =
                        row.labels.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                    println!("[{}] {} {{{}}} {}", row.id, row.time, labels.join(","), row.line);
                }
            }
            StreamEvent::Malformed(e) => println!("skipped: {}", e),
            StreamEvent::Error(e) => println!("stream failed: {}", e),
            StreamEvent::Closed => println!("stream closed"),
        }
    }

    if let Some(stats) = cache.stream_stats(&url) {
        println!("{:?}", stats);
    }
    drop(cache);
    counter_task.await?;

    Ok(())
}
