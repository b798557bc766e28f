//! FastIndex Binary
//!
//! Generates data files, builds indexes and runs lookup workloads.

use std::time::Instant;

use clap::{Parser, Subcommand};
use fastindex::util::{parse_size, readable_duration};
use fastindex::{Config, Db, FindStats};
use tracing_subscriber::{fmt, EnvFilter};

/// FastIndex
#[derive(Parser, Debug)]
#[command(name = "fastindex")]
#[command(about = "Disk-backed key/value lookups over a sharded, memory-mapped index")]
#[command(version)]
struct Args {
    /// Base directory (holds data/ and index/)
    #[arg(short, long, default_value = "./fastindex_data")]
    dir: String,

    /// Number of index shards (must match between build and lookup)
    #[arg(short, long, default_value = "1000")]
    shards: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a random data file
    CreateData {
        /// Target size, e.g. 128M or 16G
        #[arg(default_value = "16G")]
        size: String,
    },

    /// Build the index for the data file
    CreateIndex,

    /// Run concurrent random lookups
    FindTest {
        /// Number of lookup threads
        #[arg(short, long, default_value = "10")]
        concurrency: usize,

        /// Lookups per thread
        #[arg(short, long, default_value = "100000")]
        loops: u64,
    },

    /// Print the value stored for a key
    Get {
        key: u64,
    },

    /// Print every entry of one shard
    DumpShard {
        shard: usize,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fastindex=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("FastIndex v{}", fastindex::VERSION);
    tracing::info!("Base directory: {}", args.dir);

    let config = Config::builder()
        .base_dir(&args.dir)
        .shard_count(args.shards)
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> fastindex::Result<()> {
    let start = Instant::now();
    let db = Db::open(config)?;

    match command {
        Commands::CreateData { size } => {
            let size = parse_size(&size)?;
            println!("call createData...");
            let report = db.create_data(size)?;
            println!(
                "createData successfully. records: {}, bytes: {}, cost time: {}",
                report.records,
                report.bytes_written,
                readable_duration(start.elapsed())
            );
        }
        Commands::CreateIndex => {
            println!("call createIndex...");
            let report = db.create_index()?;
            println!(
                "createIndex successfully. records: {}, cost time: {}",
                report.records,
                readable_duration(start.elapsed())
            );
        }
        Commands::FindTest { concurrency, loops } => {
            println!("call findTest...");
            let reader = db.reader()?;
            let mut total = FindStats::default();

            let per_thread = crossbeam::thread::scope(|s| {
                let handles: Vec<_> = (0..concurrency.max(1))
                    .map(|_| {
                        let reader = &reader;
                        s.spawn(move |_| reader.find_loop(loops, &mut rand::thread_rng()))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join())
                    .collect::<std::thread::Result<Vec<_>>>()
            })
            .and_then(|joined| joined)
            .map_err(|_| fastindex::FastIndexError::WorkerPanicked)?;

            for stats in &per_thread {
                total.merge(stats);
            }

            println!(
                "findTest successfully. cost time: {}, hits: {}/{}, errors: {}, find-operation avg time: {}",
                readable_duration(start.elapsed()),
                total.hits,
                total.lookups,
                total.errors,
                readable_duration(total.avg_latency())
            );
        }
        Commands::Get { key } => {
            let reader = db.reader()?;
            let value = reader.find(key)?;
            println!("key: {}, v: {}", key, String::from_utf8_lossy(&value));
        }
        Commands::DumpShard { shard } => {
            let reader = db.reader()?;
            let shard_reader = reader.index().shard(shard).ok_or_else(|| {
                fastindex::FastIndexError::Config(format!(
                    "shard {} out of range 0..{}",
                    shard,
                    reader.index().shard_count()
                ))
            })?;
            for (i, entry) in shard_reader.iter().enumerate() {
                println!(
                    "index: {}, key: {}, valueSize: {}, valuePos: {}",
                    i, entry.key, entry.value_size, entry.value_position
                );
            }
        }
    }

    Ok(())
}
