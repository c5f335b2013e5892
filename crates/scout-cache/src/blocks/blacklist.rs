use hashbrown::HashMap;
use scout_geom::BlockPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlacklistEntry {
    /// `None` means permanent until cleared.
    pub expires_at: Option<u64>,
    pub retries: u32,
}

impl BlacklistEntry {
    #[inline]
    pub fn is_active(&self, now: u64) -> bool {
        match self.expires_at {
            None => true,
            Some(t) => now <= t,
        }
    }
}

/// Positions the consumer reported as unreachable, with exponential backoff
/// on repeated reports. Expired entries read as absent but keep their retry
/// count until the next purge.
#[derive(Clone, Debug)]
pub struct Blacklist {
    entries: HashMap<BlockPos, BlacklistEntry>,
    growth: f32,
    max_delay_secs: f32,
    ticks_per_second: u32,
}

impl Blacklist {
    pub fn new(growth: f32, max_delay_secs: f32, ticks_per_second: u32) -> Self {
        Self {
            entries: HashMap::new(),
            growth,
            max_delay_secs,
            ticks_per_second,
        }
    }

    /// Blacklists `pos` for `base_delay * growth^(retries-1)` seconds.
    /// Returns the applied delay in ticks, or `None` for a permanent entry.
    pub fn mark(&mut self, pos: BlockPos, delay_secs: f32, now: u64) -> Option<u64> {
        let entry = self.entries.entry(pos).or_insert(BlacklistEntry {
            expires_at: None,
            retries: 0,
        });
        entry.retries = entry.retries.saturating_add(1);
        if !(delay_secs > 0.0) {
            entry.expires_at = None;
            return None;
        }
        let exp = i32::try_from(entry.retries - 1).unwrap_or(i32::MAX);
        let secs = (delay_secs * self.growth.powi(exp)).min(self.max_delay_secs.max(delay_secs));
        let ticks = (f64::from(secs) * f64::from(self.ticks_per_second)).ceil() as u64;
        entry.expires_at = Some(now.saturating_add(ticks));
        Some(ticks)
    }

    pub fn clear(&mut self, pos: BlockPos) -> bool {
        self.entries.remove(&pos).is_some()
    }

    #[inline]
    pub fn is_blacklisted(&self, pos: BlockPos, now: u64) -> bool {
        self.entries.get(&pos).is_some_and(|e| e.is_active(now))
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlacklistEntry> {
        self.entries.get(&pos).copied()
    }

    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_active(now));
        before - self.entries.len()
    }

    /// Number of entries active at `now`.
    pub fn active_len(&self, now: u64) -> usize {
        self.entries.values().filter(|e| e.is_active(now)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Blacklist {
        Blacklist::new(2.0, 600.0, 20)
    }

    #[test]
    fn delay_doubles_per_retry() {
        let mut bl = list();
        let p = BlockPos::new(1, 2, 3);
        assert_eq!(bl.mark(p, 5.0, 0), Some(100));
        assert_eq!(bl.mark(p, 5.0, 0), Some(200));
        assert_eq!(bl.mark(p, 5.0, 0), Some(400));
        assert_eq!(bl.get(p).map(|e| e.retries), Some(3));
    }

    #[test]
    fn delay_is_capped() {
        let mut bl = Blacklist::new(10.0, 30.0, 20);
        let p = BlockPos::new(0, 0, 0);
        bl.mark(p, 5.0, 0);
        assert_eq!(bl.mark(p, 5.0, 0), Some(600));
        assert_eq!(bl.mark(p, 5.0, 0), Some(600));
    }

    #[test]
    fn zero_delay_is_permanent() {
        let mut bl = list();
        let p = BlockPos::new(0, 64, 0);
        assert_eq!(bl.mark(p, 0.0, 10), None);
        assert!(bl.is_blacklisted(p, u64::MAX));
        assert_eq!(bl.purge_expired(u64::MAX), 0);
        assert!(bl.clear(p));
        assert!(!bl.is_blacklisted(p, 10));
    }

    #[test]
    fn expiry_is_lazy_and_purge_removes() {
        let mut bl = list();
        let p = BlockPos::new(4, 4, 4);
        bl.mark(p, 1.0, 100);
        assert!(bl.is_blacklisted(p, 120));
        assert!(!bl.is_blacklisted(p, 121));
        assert_eq!(bl.len(), 1);
        assert_eq!(bl.active_len(121), 0);
        assert_eq!(bl.purge_expired(121), 1);
        assert!(bl.is_empty());
    }
}
