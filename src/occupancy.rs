//! Bit-per-block occupancy tracking.
//!
//! [`Occupancy`] keeps one bit per block slot in a caller-supplied byte
//! slice and hands out free slot indices with a circular sweep. Both pool
//! flavors of this crate are built on top of it and only translate slot
//! indices into their own address domains.

use core::fmt;

/// Returns the bitmap storage size in bytes for `block_count` slots.
///
/// Useful for sizing the storage at compile time:
///
/// ```
/// use bitpool::occupancy::bitmap_len;
///
/// let bitmap = [0_u8; bitmap_len(12)];
/// assert_eq!(bitmap.len(), 2);
/// ```
#[inline]
pub const fn bitmap_len(block_count: usize) -> usize {
    block_count.div_ceil(8)
}

/// A fixed set of block slots tracked by one bit each.
///
/// Bit `i` of the map corresponds to slot `i`: `1` is claimed, `0` is
/// free. A claim sweep resumes where the previous one succeeded and wraps
/// around at most once, so released slots are picked up in circular order
/// instead of clustering at the start of the map.
pub struct Occupancy<'a> {
    /// Bit storage. The least significant bit of byte 0 is slot 0.
    bits: &'a mut [u8],
    /// Number of valid slots. This field is immutable.
    count: usize,
    /// Index of the last successful claim, 0 after an exhausted sweep.
    probe: usize,
}

impl<'a> Occupancy<'a> {
    /// Creates a new `Occupancy` of `count` slots over `bits`, with every
    /// slot initially free.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is shorter than [`bitmap_len`]`(count)`.
    pub fn new(bits: &'a mut [u8], count: usize) -> Self {
        assert!(bits.len() >= bitmap_len(count), "bitmap storage too small");
        bits.fill(0);
        Self { bits, count, probe: 0 }
    }

    /// Returns the number of slots.
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Claims the first free slot found by a circular sweep, returning its
    /// index.
    ///
    /// The sweep starts at the slot where the previous claim succeeded and
    /// wraps around at most once. Returns `None` when every slot is
    /// claimed; the next sweep then restarts from slot 0.
    pub fn claim(&mut self) -> Option<usize> {
        let index =
            self.scan_free(self.probe, self.count).or_else(|| self.scan_free(0, self.probe));
        if let Some(index) = index {
            self.set(index);
            self.probe = index;
        } else {
            self.probe = 0;
        }
        index
    }

    /// Releases the slot at `index`, returning whether it was claimed.
    ///
    /// Releasing a free slot is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the slot count.
    pub fn release(&mut self, index: usize) -> bool {
        assert!(index < self.count, "slot index out of range");
        let was_claimed = self.is_set(index);
        self.clear(index);
        was_claimed
    }

    /// Returns whether the slot at `index` is claimed.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the slot count.
    #[inline]
    pub fn is_claimed(&self, index: usize) -> bool {
        assert!(index < self.count, "slot index out of range");
        self.is_set(index)
    }

    /// Returns the index of the first claimed slot at or after `start`,
    /// wrapping around the end of the map at most once.
    ///
    /// `start` values of `count` and above are treated as 0. Returns
    /// `None` when no slot is claimed. The claim cursor is not affected.
    pub fn next_claimed(&self, start: usize) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let start = if start < self.count { start } else { 0 };
        let mut index = start;
        loop {
            if self.is_set(index) {
                return Some(index);
            }
            index += 1;
            if index == self.count {
                index = 0;
            }
            if index == start {
                return None;
            }
        }
    }

    /// Counts the claimed slots by scanning the map.
    pub fn claimed(&self) -> usize {
        (0..self.count).filter(|&index| self.is_set(index)).count()
    }

    fn scan_free(&self, from: usize, to: usize) -> Option<usize> {
        (from..to).find(|&index| !self.is_set(index))
    }

    #[inline]
    fn is_set(&self, index: usize) -> bool {
        self.bits[index >> 3] & 1 << (index & 7) != 0
    }

    #[inline]
    fn set(&mut self, index: usize) {
        self.bits[index >> 3] |= 1 << (index & 7);
    }

    #[inline]
    fn clear(&mut self, index: usize) {
        self.bits[index >> 3] &= !(1 << (index & 7));
    }
}

impl fmt::Debug for Occupancy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Occupancy")
            .field("count", &self.count)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}
