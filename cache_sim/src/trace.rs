use std::{
    fmt::{self, Display},
    io::{self, BufRead},
    path::PathBuf,
};

use nom::{
    character::complete::{char, digit1, hex_digit1, satisfy, space0, space1},
    combinator::{all_consuming, map, map_res},
    IResult,
};
use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::{
    addr::Addr,
    engine::{AccessEngine, AccessOutcome},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to open trace {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read trace: {0}")]
    Read(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;

/// operation letter of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Op {
    /// instruction fetch (`I`)
    Instr = 0x49,
    /// `L`
    Load = 0x4c,
    /// `S`
    Store = 0x53,
    /// load followed by a store to the same address (`M`)
    Modify = 0x4d,
}

impl Op {
    /// number of cache accesses the operation performs. instruction fetches are not simulated.
    pub fn accesses(self) -> usize {
        match self {
            Op::Instr => 0,
            Op::Load | Op::Store => 1,
            Op::Modify => 2,
        }
    }
    pub fn letter(self) -> char {
        self as u8 as char
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// one line of a trace, e.g. ` L 10,4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub op: Op,
    pub addr: Addr,
    /// bytes touched. read but never simulated: an access stays within one block.
    /// saturates instead of rejecting the record.
    pub size: u64,
}

impl TraceRecord {
    pub fn parse(line: &str) -> std::result::Result<Self, nom::Err<nom::error::Error<&str>>> {
        let (_, record) = all_consuming(read_record)(line)?;
        Ok(record)
    }
}

impl Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.op, self.addr.inner(), self.size)
    }
}

fn read_op(input: &str) -> IResult<&str, Op> {
    map_res(satisfy(|c| c.is_ascii_alphabetic()), |c| {
        Op::try_from(c as u8)
    })(input)
}

fn read_addr(input: &str) -> IResult<&str, Addr> {
    map_res(hex_digit1, |h| u64::from_str_radix(h, 16).map(Addr::new))(input)
}

fn read_size(input: &str) -> IResult<&str, u64> {
    map(digit1, |d: &str| d.parse().unwrap_or(u64::MAX))(input)
}

fn read_record(input: &str) -> IResult<&str, TraceRecord> {
    let (input, _) = space0(input)?;
    let (input, op) = read_op(input)?;
    let (input, _) = space1(input)?;
    let (input, addr) = read_addr(input)?;
    let (input, _) = char(',')(input)?;
    let (input, size) = read_size(input)?;
    let (input, _) = space0(input)?;
    Ok((input, TraceRecord { op, addr, size }))
}

/// a record which reached the cache, with the outcome of each of its accesses.
pub struct Replayed<'a> {
    pub record: &'a TraceRecord,
    pub outcomes: &'a [AccessOutcome],
}

impl Display for Replayed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)?;
        for o in self.outcomes {
            write!(f, " {o}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStat {
    pub loads: u64,
    pub stores: u64,
    pub modifies: u64,
    /// instruction fetch records
    pub ignored: u64,
    /// lines which do not form a record
    pub malformed: u64,
}

impl ReplayStat {
    fn count(&mut self, op: Op) {
        match op {
            Op::Instr => self.ignored += 1,
            Op::Load => self.loads += 1,
            Op::Store => self.stores += 1,
            Op::Modify => self.modifies += 1,
        }
    }
    /// accesses issued to the cache by the records seen so far.
    pub fn accesses(&self) -> u64 {
        self.loads + self.stores + 2 * self.modifies
    }
}

/// feeds trace records to an [`AccessEngine`]. malformed lines are skipped, not fatal.
#[derive(Default)]
pub struct TraceReplayer {
    stat: ReplayStat,
}

impl TraceReplayer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn stat(&self) -> &ReplayStat {
        &self.stat
    }
    pub fn replay<R: BufRead>(
        &mut self,
        engine: &mut AccessEngine,
        source: R,
        mut observer: impl FnMut(Replayed<'_>),
    ) -> Result<()> {
        for (index, line) in source.split(b'\n').enumerate() {
            let line = line?;
            let Ok(line) = std::str::from_utf8(&line) else {
                log::debug!("line {}: skipped non-UTF-8 record", index + 1);
                self.stat.malformed += 1;
                continue;
            };
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            match TraceRecord::parse(line) {
                Ok(record) => self.apply(engine, &record, &mut observer),
                Err(e) => {
                    log::debug!("line {}: skipped malformed record {line:?}: {e}", index + 1);
                    self.stat.malformed += 1;
                }
            }
        }
        Ok(())
    }
    fn apply(
        &mut self,
        engine: &mut AccessEngine,
        record: &TraceRecord,
        observer: &mut impl FnMut(Replayed<'_>),
    ) {
        self.stat.count(record.op);
        let n = record.op.accesses();
        if n == 0 {
            return;
        }
        let mut outcomes = [AccessOutcome::none(); 2];
        for o in &mut outcomes[..n] {
            *o = engine.access(record.addr);
        }
        observer(Replayed {
            record,
            outcomes: &outcomes[..n],
        });
    }
}

#[cfg(feature = "stat")]
impl AddStats for TraceReplayer {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::ReplayStat;
    use crate::stat::*;

    impl Stat for ReplayStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ ReplayStat {
        fn header(&self) -> &'static str {
            "trace records"
        }
        fn width(&self) -> usize {
            27
        }
    }

    impl fmt::Display for &'_ ReplayStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "       load: {:>14}", self.loads)?;
            writeln!(f, "      store: {:>14}", self.stores)?;
            writeln!(f, "     modify: {:>14}", self.modifies)?;
            writeln!(f, "    ignored: {:>14}", self.ignored)?;
            writeln!(f, "  malformed: {:>14}", self.malformed)
        }
    }
}
