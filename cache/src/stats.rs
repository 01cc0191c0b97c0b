/// Counters of a glyph cache's lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of times the atlas ran full and everything was evicted. Explicit clears are not
    /// counted.
    pub resets: u64,
}

impl GlyphCacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_ratio(&self) -> Option<f64> {
        match self.lookups() {
            0 => None,
            lookups => Some(self.hits as f64 / lookups as f64),
        }
    }
}
