use std::fmt;

use bitmask_enum::bitmask;
use serde::Serialize;

use crate::{
    addr::{AddressDecoder, Addr},
    cache::{Cache, Victim},
    config::CacheConfig,
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// what a single access did to the cache.
#[bitmask(u8)]
pub enum AccessOutcome {
    Hit,
    Miss,
    Eviction,
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::Hit) {
            write!(f, "hit")?;
        } else if self.contains(Self::Miss) {
            write!(f, "miss")?;
            if self.contains(Self::Eviction) {
                write!(f, " eviction")?;
            }
        }
        Ok(())
    }
}

/// final tallies of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }
    fn record(&mut self, outcome: AccessOutcome) {
        if outcome.contains(AccessOutcome::Hit) {
            self.hits += 1;
        }
        if outcome.contains(AccessOutcome::Miss) {
            self.misses += 1;
        }
        if outcome.contains(AccessOutcome::Eviction) {
            self.evictions += 1;
        }
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}

/// services accesses against an LRU set-associative cache.
pub struct AccessEngine {
    cache: Cache,
    decoder: AddressDecoder,
    /// strictly increasing across the whole run; never reset.
    clock: u64,
    counters: Counters,
    #[cfg(feature = "stat")]
    num_lines: usize,
}

impl AccessEngine {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            cache: Cache::new(config),
            decoder: AddressDecoder::new(config),
            clock: 0,
            counters: Counters::default(),
            #[cfg(feature = "stat")]
            num_lines: config.num_lines(),
        }
    }
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
    pub fn counters(&self) -> Counters {
        self.counters
    }
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
    pub fn access(&mut self, addr: Addr) -> AccessOutcome {
        let decoded = self.decoder.decode(addr);
        let now = self.tick();
        let set = self.cache.set_mut(decoded.set_index);
        let outcome = if let Some(way) = set.lookup(decoded.tag) {
            set.touch(way, now);
            AccessOutcome::Hit
        } else {
            let victim = set.select_victim();
            set.fill(victim.way(), decoded.tag, now);
            match victim {
                Victim::Vacant(_) => AccessOutcome::Miss,
                Victim::Evict(_) => AccessOutcome::Miss | AccessOutcome::Eviction,
            }
        };
        log::trace!("{addr} -> set {} tag {:#x}: {outcome}", decoded.set_index, decoded.tag);
        self.counters.record(outcome);
        outcome
    }
}

#[cfg(feature = "stat")]
impl AddStats for AccessEngine {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(stat::CacheStat {
            counters: self.counters,
            valid_lines: self.cache.valid_lines(),
            num_lines: self.num_lines,
        }));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::Counters;
    use crate::stat::*;

    pub struct CacheStat {
        pub counters: Counters,
        pub valid_lines: usize,
        pub num_lines: usize,
    }

    impl Stat for CacheStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(CacheStatView::new(self))
        }
    }

    pub struct CacheStatView<'a> {
        stat: &'a CacheStat,
    }

    impl<'a> CacheStatView<'a> {
        pub fn new(stat: &'a CacheStat) -> Self {
            Self { stat }
        }
    }

    impl StatView for CacheStatView<'_> {
        fn header(&self) -> &'static str {
            "cache stat"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for CacheStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let Counters {
                hits,
                misses,
                evictions,
            } = self.stat.counters;
            let total = self.stat.counters.accesses();
            writeln!(f, "        hit: {hits:>10} ({:>10}%)", percent(hits, total))?;
            writeln!(f, "       miss: {misses:>10} ({:>10}%)", percent(misses, total))?;
            writeln!(f, "   eviction: {evictions:>10} ({:>10}%)", percent(evictions, total))?;
            let lines = format!("{} / {}", self.stat.valid_lines, self.stat.num_lines);
            writeln!(f, "  occupancy: {lines:>24}")
        }
    }

    fn percent(n: u64, total: u64) -> String {
        if total == 0 {
            "-".to_owned()
        } else {
            format!("{:.6}", 100. * n as f64 / total as f64)
        }
    }
}
