//! Lazy-refresh gate shared by every cache.

/// Decides whether a query must refresh the cache before answering: either
/// someone marked the data dirty, or the minimum interval since the last
/// refresh has elapsed. All times are world ticks.
#[derive(Clone, Copy, Debug)]
pub struct UpdateGate {
    dirty: bool,
    min_interval: u64,
    last_refresh: Option<u64>,
    next_allowed: u64,
}

impl UpdateGate {
    pub fn new(min_interval: u64) -> Self {
        Self {
            dirty: false,
            min_interval,
            last_refresh: None,
            next_allowed: 0,
        }
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn is_due(&self, now: u64) -> bool {
        self.dirty || self.last_refresh.is_none() || now >= self.next_allowed
    }

    /// Records a refresh at `now` using the default interval.
    pub fn refreshed(&mut self, now: u64) {
        self.refreshed_with(now, self.min_interval);
    }

    /// Records a refresh at `now` and schedules the next one after `interval`.
    pub fn refreshed_with(&mut self, now: u64, interval: u64) {
        self.dirty = false;
        self.last_refresh = Some(now);
        self.next_allowed = now.saturating_add(interval);
    }

    /// Clears the dirty flag without counting as a refresh.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn last_refresh(&self) -> Option<u64> {
        self.last_refresh
    }
}
