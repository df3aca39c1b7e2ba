//! Example: Simulated weather stations over TCP
//!
//! Serves JSON-lines readings from a handful of fake stations so the
//! dashboard has something to show. The values are deterministic:
//! `cellar` sends a sentinel temperature now and then, and `mast` stops
//! reporting after a while so an outage appears.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example station_simulator -- 127.0.0.1:9090
//! ```
//!
//! Then, in another terminal:
//!
//! ```bash
//! cargo run -- --connect 127.0.0.1:9090 --station roof --station ghost
//! ```

use std::env;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

const STATIONS: [&str; 4] = ["roof", "harbour", "cellar", "mast"];
/// Ticks after which `mast` goes silent.
const MAST_SILENT_AFTER: u64 = 20;

#[tokio::main]
async fn main() {
    let addr = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:9090".to_string());

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    println!("Serving {} stations on {}", STATIONS.len(), addr);

    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                println!("Client connected: {}", peer);
                tokio::spawn(async move {
                    if let Err(e) = serve(socket).await {
                        println!("Client {} went away: {}", peer, e);
                    }
                });
            }
            Err(e) => eprintln!("Accept failed: {}", e),
        }
    }
}

async fn serve(mut socket: TcpStream) -> std::io::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    for tick in 0u64.. {
        interval.tick().await;

        for (index, station) in STATIONS.iter().enumerate() {
            if *station == "mast" && tick >= MAST_SILENT_AFTER {
                continue;
            }

            let line = reading(station, index, tick).to_string();
            socket.write_all(line.as_bytes()).await?;
            socket.write_all(b"\n").await?;
        }
    }

    Ok(())
}

fn reading(station: &str, index: usize, tick: u64) -> serde_json::Value {
    let phase = tick as f64 / 10.0 + index as f64;
    let temperature = 15.0 + 6.0 * phase.sin();
    let humidity = 55.0 + 20.0 * (phase / 2.0).cos();

    // every 13th cellar reading is the sensor's error sentinel, sent as text
    let temperature = if station == "cellar" && tick % 13 == 12 {
        json!("-999")
    } else {
        json!((temperature * 10.0).round() / 10.0)
    };

    json!({
        "stationId": station,
        "temperature": temperature,
        "humidity": humidity.round() as i64,
        "timestamp": Utc::now().to_rfc3339(),
    })
}
