use std::fmt::Display;

use crate::{bin, config::CacheConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(u64);

impl Addr {
    pub fn new(v: u64) -> Self {
        Self(v)
    }
    pub fn inner(self) -> u64 {
        self.0
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// address split into the fields the cache cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddr {
    pub tag: u64,
    pub set_index: usize,
    /// unused by the simulation: an access never straddles a block.
    pub block_offset: u64,
}

/// splits addresses as `tag | set index (s bits) | block offset (b bits)`.
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    set_index_bits: u32,
    block_offset_bits: u32,
}

impl AddressDecoder {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            set_index_bits: config.set_index_bits(),
            block_offset_bits: config.block_offset_bits(),
        }
    }
    pub fn decode(&self, addr: Addr) -> DecodedAddr {
        let addr = addr.inner();
        let s = self.set_index_bits;
        let b = self.block_offset_bits;
        DecodedAddr {
            tag: bin::shr(addr, s + b),
            // bounded by `CacheConfig::num_sets`, which fits in usize
            set_index: bin::extract(addr, b, s) as usize,
            block_offset: bin::extract(addr, 0, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(s: u32, b: u32) -> AddressDecoder {
        AddressDecoder::new(&CacheConfig::new(s, b, 1).unwrap())
    }

    #[test]
    fn test_decode() {
        let d = decoder(4, 4);
        let r = d.decode(Addr::new(0x1234));
        assert_eq!(r.block_offset, 0x4);
        assert_eq!(r.set_index, 0x3);
        assert_eq!(r.tag, 0x12);
    }
    #[test]
    fn test_decode_same_block() {
        let d = decoder(1, 1);
        let (a, b) = (d.decode(Addr::new(0)), d.decode(Addr::new(1)));
        assert_eq!((a.tag, a.set_index), (b.tag, b.set_index));
        assert_eq!(b.block_offset, 1);
        assert_eq!(d.decode(Addr::new(2)).set_index, 1);
        let r = d.decode(Addr::new(8));
        assert_eq!((r.tag, r.set_index), (2, 0));
    }
    #[test]
    fn test_decode_full_width() {
        // s + b covers the whole address: the tag is always zero.
        let d = decoder(16, 48);
        let r = d.decode(Addr::new(u64::MAX));
        assert_eq!(r.tag, 0);
        assert_eq!(r.set_index, 0xffff);
        assert_eq!(r.block_offset, 0xffff_ffff_ffff);
    }
    #[test]
    fn test_addr_display() {
        assert_eq!(format!("{}", Addr::new(0x7ff0)), "0x7ff0");
    }
}
