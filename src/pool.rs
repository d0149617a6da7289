//! Fixed-size block pool in directly addressable memory.
//!
//! A [`Pool`] splits a caller-supplied memory region into blocks of one
//! fixed size and tracks them with a bit-per-block occupancy map.
//! Allocation is a circular sweep over the map that resumes where the
//! previous allocation succeeded; there is no per-block header, no free
//! list threaded through the region, and no dynamic memory of the pool's
//! own. Both the region and the map storage are borrowed, so a pool can
//! sit on top of a statically reserved buffer on bare metal just as well
//! as on a plain array in a test.
//!
//! # Usage
//!
//! ```
//! use bitpool::occupancy::bitmap_len;
//! use bitpool::pool::Pool;
//!
//! const BLOCK_SIZE: usize = 8;
//! const BLOCK_COUNT: usize = 16;
//!
//! let mut region = [0_u8; BLOCK_SIZE * BLOCK_COUNT];
//! let mut bitmap = [0_u8; bitmap_len(BLOCK_COUNT)];
//! let mut pool = Pool::new(&mut region, &mut bitmap, BLOCK_SIZE);
//!
//! let block = pool.allocate().unwrap();
//! assert!(pool.contains(block));
//! pool.free(block).unwrap();
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use thiserror::Error;

use crate::occupancy::Occupancy;

/// An error returned when freeing an address that lies inside the pool
/// but is not the start of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("free target is not aligned to a block boundary")]
pub struct Misaligned;

/// A pool of fixed-size memory blocks.
///
/// See [the module level documentation](self) for more.
pub struct Pool<'a> {
    occupancy: Occupancy<'a>,
    /// First byte of the block region. This field is immutable.
    base: *mut u8,
    /// Block size in bytes. This field is immutable.
    block_size: usize,
    _region: PhantomData<&'a mut [u8]>,
}

// The raw `base` pointer refers to the region exclusively borrowed for
// `'a`, so moving the pool to another context moves that borrow with it.
unsafe impl Send for Pool<'_> {}

impl<'a> Pool<'a> {
    /// Creates a new `Pool` of `block_size`-byte blocks over `region`,
    /// tracking them in `bitmap`.
    ///
    /// The block count is `region.len() / block_size`; trailing bytes
    /// that do not fill a whole block are never handed out. Both `region`
    /// and `bitmap` are zero-filled.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero or `bitmap` is shorter than
    /// [`bitmap_len`](crate::occupancy::bitmap_len)`(block_count)`.
    pub fn new(region: &'a mut [u8], bitmap: &'a mut [u8], block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        let block_count = region.len() / block_size;
        region.fill(0);
        log::debug!("local pool: {block_count} blocks of {block_size} bytes");
        Self {
            occupancy: Occupancy::new(bitmap, block_count),
            base: region.as_mut_ptr(),
            block_size,
            _region: PhantomData,
        }
    }

    /// Returns the block size in bytes.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks.
    #[inline]
    pub const fn block_count(&self) -> usize {
        self.occupancy.count()
    }

    /// Allocates one block, returning the address of its first byte.
    ///
    /// If this method returns `Some(addr)`, the block `[addr, addr +
    /// block_size)` belongs to the caller until it is freed. If this
    /// method returns `None`, the pool is exhausted.
    ///
    /// The search is a circular sweep resuming where the previous
    /// allocation succeeded, *O(block_count)* in the worst case.
    pub fn allocate(&mut self) -> Option<NonNull<u8>> {
        let index = self.occupancy.claim()?;
        let addr = unsafe { self.base.add(index * self.block_size) };
        Some(unsafe { NonNull::new_unchecked(addr) })
    }

    /// Frees the block at `ptr`.
    ///
    /// Addresses outside the pool are ignored, so a caller owning several
    /// pools may offer an address to each in turn. Freeing a block that
    /// is already free is a no-op. An address inside the pool that is not
    /// the start of a block leaves the pool untouched and returns
    /// [`Misaligned`].
    pub fn free(&mut self, ptr: NonNull<u8>) -> Result<(), Misaligned> {
        if !self.contains(ptr) {
            return Ok(());
        }
        let offset = ptr.as_ptr() as usize - self.base as usize;
        if offset % self.block_size != 0 {
            return Err(Misaligned);
        }
        self.occupancy.release(offset / self.block_size);
        Ok(())
    }

    /// Returns whether `ptr` points inside the pool's region.
    ///
    /// Membership does not imply the block holding `ptr` is allocated; it
    /// only means the address falls within
    /// `[base, base + block_size * block_count)`.
    #[inline]
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.base as usize;
        addr >= base && addr - base < self.block_size * self.occupancy.count()
    }
}

impl fmt::Debug for Pool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("base", &self.base)
            .field("block_size", &self.block_size)
            .field("block_count", &self.occupancy.count())
            .finish_non_exhaustive()
    }
}
