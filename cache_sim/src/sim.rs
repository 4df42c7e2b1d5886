use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{
    config::CacheConfig,
    engine::{AccessEngine, Counters},
    trace::{self, Replayed, ReplayStat, TraceError, TraceReplayer},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// one simulation run: owns the cache, the counters and the replay state.
pub struct Simulator {
    engine: AccessEngine,
    replayer: TraceReplayer,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

impl Simulator {
    pub fn new(config: CacheConfig) -> Self {
        log::info!("cache geometry: {config}");
        Self {
            engine: AccessEngine::new(&config),
            replayer: TraceReplayer::new(),
            #[cfg(feature = "stat")]
            stat_builder: stat::SimStatBuilder::new(),
        }
    }
    pub fn counters(&self) -> Counters {
        self.engine.counters()
    }
    pub fn replay_stat(&self) -> &ReplayStat {
        self.replayer.stat()
    }
    pub fn run<R: BufRead>(&mut self, source: R) -> trace::Result<Counters> {
        self.run_with(source, |_| {})
    }
    /// replays `source`, reporting every replayed record to `observer`.
    pub fn run_with<R: BufRead>(
        &mut self,
        source: R,
        observer: impl FnMut(Replayed<'_>),
    ) -> trace::Result<Counters> {
        self.replayer.replay(&mut self.engine, source, observer)?;
        #[cfg(feature = "stat")]
        self.stat_builder.stop_timer();
        let counters = self.counters();
        log::info!("finished replay. {counters}");
        Ok(counters)
    }
    pub fn run_file(
        &mut self,
        path: impl AsRef<Path>,
        observer: impl FnMut(Replayed<'_>),
    ) -> trace::Result<Counters> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_owned(),
            source,
        })?;
        log::info!("replaying {}", path.display());
        self.run_with(BufReader::new(file), observer)
    }
}

impl Simulator {
    #[cfg(feature = "stat")]
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish(self.counters().accesses())));
        self.replayer.add_stats(buf);
        self.engine.add_stats(buf);
    }
}

#[cfg(feature = "stat")]
mod stat {
    use crate::stat::*;

    use std::{fmt, time};

    pub struct SimStatBuilder {
        begin: time::Instant,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                elapsed: None,
            }
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(self.begin.elapsed())
        }
        pub fn finish(&self, accesses: u64) -> SimStat {
            SimStat {
                elapsed: self.elapsed.unwrap_or_else(|| self.begin.elapsed()),
                accesses,
            }
        }
    }

    impl Default for SimStatBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct SimStat {
        elapsed: time::Duration,
        accesses: u64,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ SimStat {
        fn header(&self) -> &'static str {
            "simulator stat"
        }
        fn width(&self) -> usize {
            33
        }
    }

    impl fmt::Display for &'_ SimStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let ms = format!("{} ms", self.elapsed.as_millis());
            writeln!(f, "  elapsed total: {ms:>12}")?;
            let accesses = format!("#{}", self.accesses);
            writeln!(f, "  accesses total: {accesses:>11}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config(s: u32, b: u32, e: usize) -> CacheConfig {
        CacheConfig::new(s, b, e).unwrap()
    }

    #[test]
    fn test_run_scenario() {
        let mut sim = Simulator::new(config(1, 1, 1));
        let c = sim.run(" L 0,1\n L 1,1\n L 2,1\n L 8,1\n".as_bytes()).unwrap();
        assert_eq!(
            c,
            Counters {
                hits: 1,
                misses: 3,
                evictions: 1
            }
        );
    }
    #[test]
    fn test_runs_are_independent() {
        let trace = " L 0,1\n M 0,1\n";
        let a = Simulator::new(config(1, 1, 1)).run(trace.as_bytes()).unwrap();
        let b = Simulator::new(config(1, 1, 1)).run(trace.as_bytes()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a,
            Counters {
                hits: 2,
                misses: 1,
                evictions: 0
            }
        );
    }
    #[test]
    fn test_accesses_match_records() {
        let trace = "I 10,4\n L 10,4\n S 20,4\n M 30,4\n M 40,4\n bad\n";
        let mut sim = Simulator::new(config(2, 2, 2));
        let c = sim.run(trace.as_bytes()).unwrap();
        assert_eq!(c.accesses(), 6);
        assert_eq!(sim.replay_stat().accesses(), 6);
        assert!(c.evictions <= c.misses);
    }
    #[test]
    fn test_run_file() {
        let path = std::env::temp_dir().join(format!("cache_sim_trace_{}", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, " L 10,1\n M 20,1\n L 22,1\n S 18,1\n L 110,1\n L 210,1\n M 12,1").unwrap();
        }
        let mut sim = Simulator::new(config(4, 4, 1));
        let mut records = 0;
        let c = sim.run_file(&path, |_| records += 1).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(records, 7);
        assert_eq!(format!("{c}"), "hits:4 misses:5 evictions:3");
    }
    #[test]
    fn test_missing_trace_is_fatal() {
        let mut sim = Simulator::new(config(1, 1, 1));
        let r = sim.run_file("/nonexistent/trace/file", |_| {});
        assert!(matches!(r, Err(TraceError::Open { .. })));
    }
    #[cfg(feature = "stat")]
    #[test]
    fn test_collect_stat() {
        let mut sim = Simulator::new(config(1, 1, 1));
        sim.run(" M 0,1\n".as_bytes()).unwrap();
        let ss = sim.collect_stat();
        assert_eq!(ss.len(), 3);
        let s = format!("{}", ss.view(120));
        assert!(s.contains("cache stat"));
        assert!(s.contains("#2"));
        assert!(s.contains("1 / 2"));
    }
}
