//! Quadtree Bucket Indexer CLI
//!
//! Builds bounded-size binary tile indexes from quadkey size records.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quadbucket::{build_buckets, run_aligned_build, run_build, Config};

#[derive(Parser)]
#[command(name = "quadbucket")]
#[command(about = "Partition a tile pyramid into bucket index files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the two-tier bucket index
    Build(BuildArgs),

    /// Build with the historical idxStep-aligned bucket scheme
    BuildAligned(BuildArgs),

    /// Partition and aggregate without writing, then report bucket stats
    Analyze(BuildArgs),

    /// Report quadtree nodes missing from a key list read on stdin
    Missing {
        /// Maximum depth to explore
        max_level: usize,
    },

    /// Compress files into length-prefixed zlib siblings (<file>z)
    Compress {
        /// Files to compress
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Series name (output file prefix)
    #[arg(required_unless_present = "config")]
    series: Option<String>,

    /// Maximum quadtree depth
    #[arg(required_unless_present = "config")]
    max_level: Option<usize>,

    /// Bucket depth span
    #[arg(required_unless_present = "config")]
    idx_step: Option<usize>,

    /// Path to configuration file (positionals override its fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Size records file (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl BuildArgs {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config {
                series: String::new(),
                max_level: 0,
                idx_step: 0,
                input: None,
                output_dir: PathBuf::from("."),
            },
        };

        if let Some(series) = self.series {
            config.series = series;
        }
        if let Some(max_level) = self.max_level {
            config.max_level = max_level;
        }
        if let Some(idx_step) = self.idx_step {
            config.idx_step = idx_step;
        }
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => {
            run_build(&args.into_config()?)?;
        }

        Commands::BuildAligned(args) => {
            let mut stdout = std::io::stdout().lock();
            run_aligned_build(&args.into_config()?, &mut stdout)?;
        }

        Commands::Analyze(args) => {
            analyze_command(&args.into_config()?)?;
        }

        Commands::Missing { max_level } => {
            missing_command(max_level)?;
        }

        Commands::Compress { files } => {
            for file in &files {
                quadbucket::compress::compress_file(file)?;
            }
        }

        Commands::Validate { config } => {
            let config = Config::from_file(&config)?;
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

fn analyze_command(config: &Config) -> Result<()> {
    let buckets = build_buckets(config)?;

    println!("\n=== Bucket Analysis ===");
    println!("Series: {}", config.series);
    println!(
        "max_level: {}, idx_step: {}",
        config.max_level, config.idx_step
    );
    println!("Buckets: {}", buckets.len());

    let mut total_tiles = 0usize;
    let mut total_index_bytes = 0u64;
    for bucket in buckets.buckets() {
        let tiles = bucket.tile_count();
        total_tiles += tiles;
        total_index_bytes += (bucket.array_len() * 4) as u64;

        println!(
            "\nBucket t{} (levels: {}, tiles: {}, array: {} entries)",
            bucket.prefix,
            bucket.num_levels,
            tiles,
            bucket.array_len()
        );
        for (depth, layer) in bucket.layers.iter().enumerate().skip(1) {
            let depth_tiles = layer.keys().filter(|k| k.len() == depth).count();
            let depth_bytes: u64 = layer
                .iter()
                .filter(|(k, _)| k.len() == depth)
                .map(|(_, &v)| u64::from(v))
                .sum();
            if !layer.is_empty() {
                println!(
                    "  depth {}: {} tiles, {} bytes, {} table entries",
                    depth,
                    depth_tiles,
                    depth_bytes,
                    layer.len()
                );
            }
        }
    }

    println!("\n=== Totals ===");
    println!("Tiles: {}", total_tiles);
    println!(
        "Index size: {} bytes ({:.1} KB)",
        total_index_bytes,
        total_index_bytes as f64 / 1024.0
    );
    println!("=======================\n");

    Ok(())
}

fn missing_command(max_level: usize) -> Result<()> {
    let present = quadbucket::missing::read_present(std::io::stdin().lock())?;
    let mut stdout = std::io::stdout().lock();
    quadbucket::missing::find_missing(&present, max_level, &mut stdout)
}
