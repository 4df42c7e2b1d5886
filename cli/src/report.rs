use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use cache_sim::engine::Counters;

pub fn print_summary(counters: &Counters) {
    println!("{counters}");
}

/// writes `hits misses evictions` on a single line, the format graders read back.
pub fn write_results(path: &Path, counters: &Counters) -> Result<()> {
    let mut out =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    writeln!(
        out,
        "{} {} {}",
        counters.hits, counters.misses, counters.evictions
    )?;
    Ok(())
}

pub fn write_json(path: &Path, counters: &Counters) -> Result<()> {
    let out = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(out, counters)?;
    Ok(())
}
