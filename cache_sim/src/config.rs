use std::fmt;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required parameter `{param}`")]
    Missing { param: &'static str },
    #[error("parameter `{param}` must be positive")]
    NotPositive { param: &'static str },
    #[error("{set_index_bits} set index bits and {block_offset_bits} block offset bits exceed a 64-bit address")]
    AddressWidth {
        set_index_bits: u32,
        block_offset_bits: u32,
    },
    #[error("2^{set_index_bits} sets of {associativity} lines do not fit in memory")]
    TooLarge {
        set_index_bits: u32,
        associativity: usize,
    },
    #[error("failed to parse cache configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// upper bound on `2^s * E`, keeping the line arena allocatable.
pub const MAX_LINES: usize = 1 << 26;

/// geometry of the simulated cache. always validated, immutable for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    set_index_bits: u32,
    block_offset_bits: u32,
    associativity: usize,
}

impl CacheConfig {
    pub fn new(set_index_bits: u32, block_offset_bits: u32, associativity: usize) -> Result<Self> {
        if set_index_bits == 0 {
            return Err(ConfigError::NotPositive { param: "s" });
        }
        if block_offset_bits == 0 {
            return Err(ConfigError::NotPositive { param: "b" });
        }
        if associativity == 0 {
            return Err(ConfigError::NotPositive { param: "E" });
        }
        if set_index_bits.saturating_add(block_offset_bits) > u64::BITS {
            return Err(ConfigError::AddressWidth {
                set_index_bits,
                block_offset_bits,
            });
        }
        let too_large = ConfigError::TooLarge {
            set_index_bits,
            associativity,
        };
        if set_index_bits >= usize::BITS {
            return Err(too_large);
        }
        match (1usize << set_index_bits).checked_mul(associativity) {
            Some(lines) if lines <= MAX_LINES => {}
            _ => return Err(too_large),
        }
        Ok(Self {
            set_index_bits,
            block_offset_bits,
            associativity,
        })
    }
    pub fn set_index_bits(&self) -> u32 {
        self.set_index_bits
    }
    pub fn block_offset_bits(&self) -> u32 {
        self.block_offset_bits
    }
    pub fn associativity(&self) -> usize {
        self.associativity
    }
    /// S = 2^s
    pub fn num_sets(&self) -> usize {
        1 << self.set_index_bits
    }
    /// B = 2^b
    pub fn block_size(&self) -> u64 {
        1 << self.block_offset_bits
    }
    pub fn num_lines(&self) -> usize {
        self.num_sets() * self.associativity
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S:{} E:{} B:{}",
            self.num_sets(),
            self.associativity,
            self.block_size()
        )
    }
}

/// partially specified configuration, gathered from a config file and command line flags.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfigBuilder {
    pub set_index_bits: Option<u32>,
    pub block_offset_bits: Option<u32>,
    pub associativity: Option<usize>,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn deser(file: impl std::io::Read) -> Result<Self> {
        Ok(serde_json::from_reader(file)?)
    }
    pub fn set_index_bits(mut self, v: Option<u32>) -> Self {
        self.set_index_bits = v.or(self.set_index_bits);
        self
    }
    pub fn block_offset_bits(mut self, v: Option<u32>) -> Self {
        self.block_offset_bits = v.or(self.block_offset_bits);
        self
    }
    pub fn associativity(mut self, v: Option<usize>) -> Self {
        self.associativity = v.or(self.associativity);
        self
    }
    pub fn build(self) -> Result<CacheConfig> {
        let s = self
            .set_index_bits
            .ok_or(ConfigError::Missing { param: "s" })?;
        let e = self
            .associativity
            .ok_or(ConfigError::Missing { param: "E" })?;
        let b = self
            .block_offset_bits
            .ok_or(ConfigError::Missing { param: "b" })?;
        CacheConfig::new(s, b, e)
    }
}
