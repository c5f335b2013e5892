use scout_geom::BlockPos;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub visited: u64,
    pub total: u64,
}

impl ScanProgress {
    /// Fraction of the volume visited; an empty volume counts as complete.
    pub fn fraction(self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.visited as f64 / self.total as f64) as f32
        }
    }

    #[inline]
    pub fn is_complete(self) -> bool {
        self.visited >= self.total
    }
}

/// Resumable walk over a box of cells, x fastest, then z, then y.
#[derive(Clone, Debug)]
pub struct ScanCursor {
    min: BlockPos,
    sx: u64,
    sz: u64,
    next: u64,
    total: u64,
}

/// Start and length of `c - r ..= c + r` clamped to `lo..=hi`.
fn axis(c: i32, r: i64, lo: i64, hi: i64) -> (i64, u64) {
    let a = (i64::from(c) - r).max(lo);
    let b = (i64::from(c) + r).min(hi);
    if b >= a { (a, (b - a + 1) as u64) } else { (a, 0) }
}

impl ScanCursor {
    /// Cube of half-extent `radius` around `center`, with y clamped to
    /// `height.0..height.1` (max exclusive) and x/z clamped to the i32 range.
    /// Oversized volumes only take more steps.
    pub fn around(center: BlockPos, radius: i32, height: (i32, i32)) -> Self {
        let r = i64::from(radius.max(0));
        let (lo, hi) = (i64::from(i32::MIN), i64::from(i32::MAX));
        let (x0, sx) = axis(center.x, r, lo, hi);
        let (y0, sy) = axis(center.y, r, i64::from(height.0), i64::from(height.1) - 1);
        let (z0, sz) = axis(center.z, r, lo, hi);
        Self {
            min: BlockPos::new(x0 as i32, y0 as i32, z0 as i32),
            sx,
            sz,
            next: 0,
            total: sx.saturating_mul(sz).saturating_mul(sy),
        }
    }

    #[inline]
    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            visited: self.next,
            total: self.total,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.next >= self.total
    }

    #[inline]
    fn pos_at(&self, idx: u64) -> BlockPos {
        let x = idx % self.sx;
        let rest = idx / self.sx;
        let z = rest % self.sz;
        let y = rest / self.sz;
        BlockPos::new(
            (i64::from(self.min.x) + x as i64) as i32,
            (i64::from(self.min.y) + y as i64) as i32,
            (i64::from(self.min.z) + z as i64) as i32,
        )
    }
}

impl Iterator for ScanCursor {
    type Item = BlockPos;

    fn next(&mut self) -> Option<BlockPos> {
        if self.is_done() {
            return None;
        }
        let pos = self.pos_at(self.next);
        self.next += 1;
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn visits_every_cell_once() {
        let cursor = ScanCursor::around(BlockPos::new(5, 10, -3), 2, (-64, 320));
        assert_eq!(cursor.progress().total, 125);
        let seen: HashSet<BlockPos> = cursor.collect();
        assert_eq!(seen.len(), 125);
        assert!(seen.contains(&BlockPos::new(3, 8, -5)));
        assert!(seen.contains(&BlockPos::new(7, 12, -1)));
    }

    #[test]
    fn clamps_to_height_bounds() {
        let cursor = ScanCursor::around(BlockPos::new(0, 1, 0), 3, (0, 3));
        // y in 0..=2 only
        assert_eq!(cursor.progress().total, 7 * 7 * 3);
        assert!(cursor.clone().all(|p| (0..3).contains(&p.y)));
    }

    #[test]
    fn fully_out_of_bounds_volume_is_empty() {
        let mut cursor = ScanCursor::around(BlockPos::new(0, 500, 0), 4, (0, 256));
        assert_eq!(cursor.progress().total, 0);
        assert!(cursor.next().is_none());
        assert_eq!(cursor.progress().fraction(), 1.0);
    }

    #[test]
    fn huge_radius_saturates_instead_of_overflowing() {
        let mut cursor = ScanCursor::around(BlockPos::new(0, 64, 0), 1_200_000_000, (-64, 320));
        assert_eq!(cursor.progress().total, u64::MAX);
        assert_eq!(cursor.next(), Some(BlockPos::new(-1_200_000_000, -64, -1_200_000_000)));
        assert_eq!(cursor.next(), Some(BlockPos::new(-1_199_999_999, -64, -1_200_000_000)));

        // x/z clamp to the i32 range near the edges.
        let edge = BlockPos::new(i32::MAX - 1, 0, i32::MIN + 1);
        let mut cursor = ScanCursor::around(edge, i32::MAX, (0, 1));
        let span = (1u64 << 31) + 1;
        assert_eq!(cursor.progress().total, span * span);
        assert_eq!(cursor.next(), Some(BlockPos::new(-1, 0, i32::MIN)));
        assert!(!cursor.is_done());
    }

    #[test]
    fn progress_tracks_partial_walks() {
        let mut cursor = ScanCursor::around(BlockPos::new(0, 0, 0), 1, (-10, 10));
        for _ in 0..9 {
            cursor.next();
        }
        let p = cursor.progress();
        assert_eq!((p.visited, p.total), (9, 27));
        assert!((p.fraction() - 1.0 / 3.0).abs() < 1e-6);
    }
}
