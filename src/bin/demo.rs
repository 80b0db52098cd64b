//! LodeKV Demo Binary
//!
//! Drives the engine with synthetic workloads.

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use lodekv::{Config, Engine};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// LodeKV Demo
#[derive(Parser, Debug)]
#[command(name = "lodekv-demo")]
#[command(about = "Synthetic workloads against an embedded LodeKV engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./lodekv_data")]
    data_dir: String,

    /// Level 0 budget in MB
    #[arg(long, default_value = "100")]
    level0_mb: u64,

    /// Tables per level before compaction
    #[arg(long, default_value = "4")]
    part_size: usize,

    /// MemTable key count that triggers a flush
    #[arg(long, default_value = "10000")]
    threshold: usize,

    /// Milliseconds between maintenance passes
    #[arg(long, default_value = "1000")]
    check_interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert `count` generated records
    Insert {
        #[arg(short, long, default_value = "100000")]
        count: usize,
    },

    /// Read back `count` generated records
    Query {
        #[arg(short, long, default_value = "100000")]
        count: usize,
    },

    /// Delete `count` generated records
    Delete {
        #[arg(short, long, default_value = "100000")]
        count: usize,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },
}

/// Payload written by the synthetic workloads
#[derive(Debug, Serialize, Deserialize)]
struct TestValue {
    a: i64,
    b: i64,
    c: i64,
    d: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lodekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LodeKV Demo v{}", lodekv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let level0_size = args.level0_mb * 1024 * 1024;
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .level0_size(level0_size)
        .wal_size_limit(level0_size)
        .part_size(args.part_size)
        .threshold(args.threshold)
        .check_interval(Duration::from_millis(args.check_interval_ms))
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command) {
        tracing::error!("Workload failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        std::process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> lodekv::Result<()> {
    match command {
        Commands::Insert { count } => {
            let start = Instant::now();
            let value = TestValue {
                a: 1,
                b: 2,
                c: 3,
                d: "abcdefghijklmnopqrstuvwxyz".to_string(),
            };
            for i in 0..count {
                engine.set_value(&synthetic_key(i), &value)?;
            }
            tracing::info!(count, elapsed = ?start.elapsed(), "Insert finished");
        }
        Commands::Query { count } => {
            let start = Instant::now();
            let mut found = 0usize;
            for i in 0..count {
                if engine.get_value::<TestValue>(&synthetic_key(i))?.is_some() {
                    found += 1;
                }
            }
            tracing::info!(count, found, elapsed = ?start.elapsed(), "Query finished");
        }
        Commands::Delete { count } => {
            let start = Instant::now();
            for i in 0..count {
                engine.delete(&synthetic_key(i))?;
            }
            tracing::info!(count, elapsed = ?start.elapsed(), "Delete finished");
        }
        Commands::Get { key } => match engine.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Set { key, value } => {
            engine.set(&key, value.as_bytes())?;
            println!("OK");
        }
    }

    Ok(())
}

/// Five lowercase letters, "aaaaa", "aaaab", ... in ascending order
fn synthetic_key(mut n: usize) -> String {
    let mut key = [b'a'; 5];
    for slot in key.iter_mut().rev() {
        *slot = b'a' + (n % 26) as u8;
        n /= 26;
    }
    String::from_utf8_lossy(&key).into_owned()
}
