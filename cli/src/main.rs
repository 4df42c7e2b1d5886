mod report;

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use cache_sim::{
    config::{CacheConfig, CacheConfigBuilder},
    sim::Simulator,
};
use clap::Parser;

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

/// replay a memory trace against an LRU set-associative cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of set index bits (S = 2^s sets)
    #[arg(short = 's', value_name = "num")]
    set_index_bits: Option<u32>,
    /// Number of lines per set (associativity)
    #[arg(short = 'E', value_name = "num")]
    associativity: Option<usize>,
    /// Number of block offset bits (B = 2^b bytes per block)
    #[arg(short = 'b', value_name = "num")]
    block_offset_bits: Option<u32>,
    /// Trace file
    #[arg(short = 't', value_name = "file")]
    trace: PathBuf,
    /// Print every replayed record with its outcome
    #[arg(short, long)]
    verbose: bool,
    /// JSON file supplying cache geometry (flags take precedence)
    #[arg(long)]
    config: Option<PathBuf>,
    /// File path to write `hits misses evictions` to
    #[arg(long, default_value = ".csim_results")]
    results: PathBuf,
    /// File path to write the counters to as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
    let config = read_config(&args)?;
    let mut sim = Simulator::new(config);
    let counters = if args.verbose {
        sim.run_file(&args.trace, |r| println!("{r}"))?
    } else {
        sim.run_file(&args.trace, |_| {})?
    };
    output_stat(&sim);
    report::print_summary(&counters);
    report::write_results(&args.results, &counters)?;
    if let Some(json) = &args.json {
        report::write_json(json, &counters)?;
    }
    Ok(())
}

fn read_config(args: &Cli) -> Result<CacheConfig> {
    let builder = match &args.config {
        Some(p) => {
            let file = File::open(p)
                .with_context(|| format!("failed to open config {}", p.display()))?;
            CacheConfigBuilder::deser(file)?
        }
        None => CacheConfigBuilder::new(),
    };
    let config = builder
        .set_index_bits(args.set_index_bits)
        .associativity(args.associativity)
        .block_offset_bits(args.block_offset_bits)
        .build()
        .context("invalid cache configuration")?;
    Ok(config)
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Simulator) {}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}
