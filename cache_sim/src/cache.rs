use crate::config::CacheConfig;

/// one slot of a set. only tag presence is modeled, never the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    tag: u64,
    valid: bool,
    /// logical timestamp of the last touch, compared for LRU.
    recency: u64,
}

impl CacheLine {
    pub fn tag(&self) -> Option<u64> {
        self.valid.then_some(self.tag)
    }
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    pub fn recency(&self) -> u64 {
        self.recency
    }
}

/// slot chosen to receive a missed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    /// never used. compulsory miss.
    Vacant(usize),
    /// least recently used valid line of a full set.
    Evict(usize),
}

impl Victim {
    pub fn way(self) -> usize {
        match self {
            Victim::Vacant(way) | Victim::Evict(way) => way,
        }
    }
}

pub struct CacheSet {
    lines: Box<[CacheLine]>,
}

impl CacheSet {
    fn new(associativity: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); associativity].into_boxed_slice(),
        }
    }
    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }
    pub fn valid_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.valid).count()
    }
    /// way holding `tag`, if resident.
    pub fn lookup(&self, tag: u64) -> Option<usize> {
        self.lines.iter().position(|l| l.valid && l.tag == tag)
    }
    /// first invalid way, otherwise the way with the smallest recency (lowest index on ties).
    pub fn select_victim(&self) -> Victim {
        if let Some(way) = self.lines.iter().position(|l| !l.valid) {
            return Victim::Vacant(way);
        }
        let way = self
            .lines
            .iter()
            .enumerate()
            .min_by_key(|(_, l)| l.recency)
            .map_or(0, |(way, _)| way);
        Victim::Evict(way)
    }
    pub fn touch(&mut self, way: usize, recency: u64) {
        self.lines[way].recency = recency;
    }
    pub fn fill(&mut self, way: usize, tag: u64, recency: u64) {
        self.lines[way] = CacheLine {
            tag,
            valid: true,
            recency,
        };
    }
}

/// all sets of the cache, indexed by set index.
pub struct Cache {
    sets: Vec<CacheSet>,
}

impl Cache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            sets: (0..config.num_sets())
                .map(|_| CacheSet::new(config.associativity()))
                .collect(),
        }
    }
    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }
    pub fn set(&self, index: usize) -> &CacheSet {
        &self.sets[index]
    }
    pub fn set_mut(&mut self, index: usize) -> &mut CacheSet {
        &mut self.sets[index]
    }
    pub fn sets(&self) -> impl Iterator<Item = &CacheSet> {
        self.sets.iter()
    }
    pub fn valid_lines(&self) -> usize {
        self.sets.iter().map(CacheSet::valid_lines).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_is_empty() {
        let c = Cache::new(&CacheConfig::new(2, 4, 3).unwrap());
        assert_eq!(c.num_sets(), 4);
        assert!(c.sets().all(|s| s.lines().len() == 3));
        assert_eq!(c.valid_lines(), 0);
        assert_eq!(c.set(0).lookup(0), None);
    }
    #[test]
    fn test_victim_prefers_vacant() {
        let mut s = CacheSet::new(3);
        assert_eq!(s.select_victim(), Victim::Vacant(0));
        s.fill(0, 7, 1);
        s.fill(2, 8, 2);
        assert_eq!(s.select_victim(), Victim::Vacant(1));
        assert_eq!(s.lookup(8), Some(2));
    }
    #[test]
    fn test_victim_minimum_recency() {
        let mut s = CacheSet::new(4);
        s.fill(0, 10, 5);
        s.fill(1, 11, 2);
        s.fill(2, 12, 9);
        s.fill(3, 13, 4);
        // the minimum is not at the first way scanned
        assert_eq!(s.select_victim(), Victim::Evict(1));
        s.touch(1, 10);
        assert_eq!(s.select_victim(), Victim::Evict(3));
    }
    #[test]
    fn test_victim_tie_lowest_way() {
        let mut s = CacheSet::new(3);
        s.fill(0, 1, 6);
        s.fill(1, 2, 3);
        s.fill(2, 3, 3);
        assert_eq!(s.select_victim(), Victim::Evict(1));
    }
    #[test]
    fn test_line_tag_requires_valid() {
        let mut s = CacheSet::new(1);
        assert_eq!(s.lines()[0].tag(), None);
        s.fill(0, 0, 1);
        assert_eq!(s.lines()[0].tag(), Some(0));
        assert_eq!(s.valid_lines(), 1);
    }
}
