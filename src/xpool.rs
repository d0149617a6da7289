//! Fixed-size block pool in external memory.
//!
//! An [`XPool`] manages blocks that live in an externally attached memory
//! device, like FRAM or serial flash, addressed by 32-bit offsets instead
//! of pointers. The pool reserves its region from the device once at
//! construction through the [`Xmem`] trait and does pure offset
//! bookkeeping from then on; reading and writing block contents stays
//! with the device driver.
//!
//! On top of the allocate/free pair of [`pool`](crate::pool), an external
//! pool counts its live blocks and can enumerate them, which lets an
//! application rescan records persisted in the device without keeping its
//! own table of offsets.
//!
//! # Usage
//!
//! ```
//! use bitpool::xmem::LinearXmem;
//! use bitpool::xpool::XPool;
//!
//! let mut fram = LinearXmem::new(4096);
//! let mut bitmap = [0_u8; 2];
//! let mut pool = XPool::new(&mut fram, &mut bitmap, 64, 16).unwrap();
//!
//! let record = pool.allocate().unwrap();
//! assert!(pool.contains(record));
//! assert_eq!(pool.live_count(), 1);
//!
//! pool.free(record).unwrap();
//! assert_eq!(pool.live_count(), 0);
//! ```

use core::fmt;
use core::iter::FusedIterator;

use crate::occupancy::Occupancy;
use crate::pool::Misaligned;
use crate::xmem::{ReserveError, Xmem};

/// A pool of fixed-size blocks in an external memory device.
///
/// See [the module level documentation](self) for more.
pub struct XPool<'a> {
    occupancy: Occupancy<'a>,
    /// Device offset of the reserved region. This field is immutable.
    base: u32,
    /// Block size in bytes. This field is immutable.
    block_size: u32,
    /// Number of currently allocated blocks.
    live: usize,
}

impl<'a> XPool<'a> {
    /// Creates a new `XPool` of `block_count` blocks of `block_size`
    /// bytes each, reserving the backing region from `xmem`.
    ///
    /// The device is asked for `block_size * block_count` contiguous
    /// bytes exactly once. A failed reservation is logged and returned as
    /// an error, and no pool is constructed.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero, if `block_size * block_count`
    /// does not fit in `u32`, or if `bitmap` is shorter than
    /// [`bitmap_len`](crate::occupancy::bitmap_len)`(block_count)`.
    pub fn new<X: Xmem>(
        xmem: &mut X,
        bitmap: &'a mut [u8],
        block_size: u32,
        block_count: usize,
    ) -> Result<Self, ReserveError> {
        assert!(block_size > 0, "block size must be non-zero");
        let capacity = (block_count as u64)
            .checked_mul(u64::from(block_size))
            .and_then(|bytes| u32::try_from(bytes).ok());
        let capacity = match capacity {
            Some(capacity) => capacity,
            None => panic!("pool capacity overflows the offset space"),
        };
        let occupancy = Occupancy::new(bitmap, block_count);
        let base = xmem.reserve(capacity).map_err(|err| {
            log::error!("external pool reservation of {capacity} bytes failed");
            err
        })?;
        debug_assert!(
            u64::from(base) + u64::from(capacity) <= u64::from(u32::MAX) + 1,
            "device reservation exceeds the offset space"
        );
        log::debug!("external pool: {block_count} blocks of {block_size} bytes at {base:#x}");
        Ok(Self { occupancy, base, block_size, live: 0 })
    }

    /// Returns the device offset of the pool's region.
    #[inline]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Returns the block size in bytes.
    #[inline]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns the number of blocks.
    #[inline]
    pub const fn block_count(&self) -> usize {
        self.occupancy.count()
    }

    /// Returns the total size of the pool's region in bytes.
    #[inline]
    pub const fn capacity(&self) -> u32 {
        self.block_size * self.occupancy.count() as u32
    }

    /// Returns the number of currently allocated blocks.
    #[inline]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Returns whether no block is currently allocated.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocates one block, returning the device offset of its first
    /// byte.
    ///
    /// If this method returns `None`, the pool is exhausted. The search
    /// is a circular sweep resuming where the previous allocation
    /// succeeded, *O(block_count)* in the worst case.
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.occupancy.claim()?;
        self.live += 1;
        Some(self.base + index as u32 * self.block_size)
    }

    /// Frees the block at `offset`.
    ///
    /// Offsets outside the pool's region are ignored. Freeing a block
    /// that is already free is a no-op and does not touch the live count.
    /// An offset inside the region that is not the start of a block
    /// leaves the pool untouched and returns [`Misaligned`].
    pub fn free(&mut self, offset: u32) -> Result<(), Misaligned> {
        if !self.contains(offset) {
            return Ok(());
        }
        let offset = offset - self.base;
        if offset % self.block_size != 0 {
            return Err(Misaligned);
        }
        if self.occupancy.release((offset / self.block_size) as usize) {
            self.live -= 1;
        }
        debug_assert_eq!(self.live, self.occupancy.claimed());
        Ok(())
    }

    /// Returns whether `offset` falls inside the pool's region.
    ///
    /// Membership does not imply the block holding `offset` is allocated.
    #[inline]
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.base && offset - self.base < self.capacity()
    }

    /// Returns the device offset of the first allocated block at or after
    /// the block at `start_index`, wrapping around the end of the pool at
    /// most once.
    ///
    /// `start_index` counts blocks, not bytes; values of `block_count`
    /// and above are treated as 0. Returns `None` when no block is
    /// allocated. Each call is a fresh bounded scan; to enumerate every
    /// live block use [`live_offsets`](XPool::live_offsets).
    pub fn next_live(&self, start_index: usize) -> Option<u32> {
        let index = self.occupancy.next_claimed(start_index)?;
        Some(self.base + index as u32 * self.block_size)
    }

    /// Returns an iterator over the device offsets of all live blocks, in
    /// ascending block order.
    ///
    /// The iterator borrows the pool, so blocks cannot be allocated or
    /// freed while it is alive.
    pub fn live_offsets(&self) -> LiveOffsets<'_, 'a> {
        LiveOffsets { pool: self, index: 0 }
    }
}

impl fmt::Debug for XPool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XPool")
            .field("base", &self.base)
            .field("block_size", &self.block_size)
            .field("block_count", &self.occupancy.count())
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

/// An iterator over the device offsets of live blocks of an [`XPool`].
///
/// Created by [`XPool::live_offsets`].
pub struct LiveOffsets<'p, 'a> {
    pool: &'p XPool<'a>,
    index: usize,
}

impl Iterator for LiveOffsets<'_, '_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        while self.index < self.pool.block_count() {
            let index = self.index;
            self.index += 1;
            if self.pool.occupancy.is_claimed(index) {
                return Some(self.pool.base + index as u32 * self.pool.block_size);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.pool.live))
    }
}

impl FusedIterator for LiveOffsets<'_, '_> {}
