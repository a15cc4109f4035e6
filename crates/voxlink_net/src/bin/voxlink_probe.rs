//! # VOXLINK Probe
//!
//! Headless client: connects, announces itself, and drains the event queue
//! at frame rate the way the renderer would, logging what it sees.
//!
//! ## Usage
//!
//! ```bash
//! voxlink_probe --host 127.0.0.1 --port 15000 --name steve --duration 30
//! voxlink_probe --config client.toml
//! ```

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use voxlink_net::{
    ChunkPosition, ClientConfig, EntityState, NetworkClient, NetworkEvent, CHUNK_VOLUME,
};

/// Render loop cadence.
const FRAME: Duration = Duration::from_micros(16_667);

struct Args {
    config: ClientConfig,
    duration_secs: Option<u64>,
}

fn parse_args() -> Result<Option<Args>, String> {
    // Simple parsing, no external deps
    let args: Vec<String> = std::env::args().collect();

    // --config first so flags can override it
    let mut config = match args.iter().position(|a| a == "--config" || a == "-c") {
        Some(i) => {
            let path = args.get(i + 1).ok_or("--config needs a path")?;
            ClientConfig::load(path).map_err(|e| e.to_string())?
        }
        None => ClientConfig::default(),
    };
    let mut duration_secs = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => i += 1,
            "--host" | "-H" => {
                config.host = value.ok_or("--host needs a value")?.clone();
                i += 1;
            }
            "--port" | "-p" => {
                config.port = value
                    .and_then(|v| v.parse().ok())
                    .ok_or("--port needs a number")?;
                i += 1;
            }
            "--name" | "-n" => {
                config.player_name = value.ok_or("--name needs a value")?.clone();
                i += 1;
            }
            "--render-distance" | "-r" => {
                config.render_distance = value
                    .and_then(|v| v.parse().ok())
                    .ok_or("--render-distance needs a number 0-255")?;
                i += 1;
            }
            "--duration" | "-d" => {
                duration_secs = Some(
                    value
                        .and_then(|v| v.parse().ok())
                        .ok_or("--duration needs seconds")?,
                );
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: voxlink_probe [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>            TOML client config");
                println!("  -H, --host <HOST>              Server host (default: 127.0.0.1)");
                println!("  -p, --port <PORT>              Server port (default: 15000)");
                println!("  -n, --name <NAME>              Player name");
                println!("  -r, --render-distance <N>      Render distance in chunks");
                println!("  -d, --duration <SECS>          Run for N seconds then exit");
                println!("  -h, --help                     Show this help");
                return Ok(None);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(Some(Args {
        config,
        duration_secs,
    }))
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn main() {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(&args.config.log_level);

    tracing::info!(
        "VOXLINK probe v{} connecting to {}",
        env!("CARGO_PKG_VERSION"),
        args.config.socket_addr_string()
    );

    let mut client = match NetworkClient::connect(&args.config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let outbound = client.outbound();
    if let Err(e) =
        outbound.send_client_metadata(args.config.render_distance, &args.config.player_name)
    {
        tracing::error!("Failed to send client metadata: {}", e);
    }

    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut entities: HashMap<u32, EntityState> = HashMap::new();
    let mut chunks = 0u64;

    'frames: loop {
        let frame_start = Instant::now();

        let mut on_chunk = |position: ChunkPosition, blocks: &[u8; CHUNK_VOLUME]| {
            chunks += 1;
            let solid = blocks.iter().filter(|&&b| b != 0).count();
            tracing::debug!(
                "Chunk ({}, {}, {}): {} solid blocks",
                position.x, position.y, position.z, solid
            );
        };

        for event in client.events().pump(&mut on_chunk) {
            match event {
                NetworkEvent::EntityAdded(state) => {
                    entities.insert(state.pose.entity_id, state);
                }
                NetworkEvent::EntityUpdated(pose) => {
                    if let Some(state) = entities.get_mut(&pose.entity_id) {
                        state.pose = pose;
                    }
                }
                NetworkEvent::EntityRemoved { entity_id } => {
                    entities.remove(&entity_id);
                }
                NetworkEvent::EntityMetadata(meta) => {
                    if let Some(state) = entities.get_mut(&meta.entity_id) {
                        state.name = meta.name;
                    }
                }
                NetworkEvent::Disconnected { reason } => {
                    tracing::warn!("Server connection lost: {}", reason);
                    break 'frames;
                }
                NetworkEvent::Identified { .. }
                | NetworkEvent::Chat { .. }
                | NetworkEvent::ChunkReceived(_)
                | NetworkEvent::MonoTypeChunk(_) => {}
            }
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if let Some(rest) = FRAME.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    client.stop();

    let stats = client.stats();
    tracing::info!(
        "Session over: {} entities in view, {} chunks, {} packets / {} bytes received, {} packets sent",
        entities.len(),
        chunks,
        stats.packets_received,
        stats.bytes_received,
        stats.packets_sent
    );
}
