//! External memory devices.
//!
//! Pools from [`xpool`](crate::xpool) live in memory the CPU cannot
//! address directly, like FRAM or serial flash behind a bus controller.
//! This module defines the one primitive such a device must provide:
//! reserving a contiguous region once, at pool construction. Reading and
//! writing the reserved blocks stays with the device driver; the pool
//! only does offset bookkeeping.

use thiserror::Error;

/// An error returned when an external memory device cannot reserve the
/// requested region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("external memory reservation failed")]
pub struct ReserveError;

/// An external memory device that hands out regions of its offset space.
pub trait Xmem {
    /// Reserves `size` bytes of contiguous device memory, returning the
    /// offset of the first byte.
    ///
    /// A successful reservation `[offset, offset + size)` must not
    /// overlap any earlier reservation and must lie entirely within the
    /// device's 32-bit offset space.
    fn reserve(&mut self, size: u32) -> Result<u32, ReserveError>;
}

impl<X: Xmem + ?Sized> Xmem for &mut X {
    #[inline]
    fn reserve(&mut self, size: u32) -> Result<u32, ReserveError> {
        (**self).reserve(size)
    }
}

/// A watermark reservation tracker over a fixed device capacity.
///
/// Regions are handed out consecutively from offset 0 and never returned,
/// matching devices whose driver parcels out space once at boot. It also
/// serves as a stand-in device for tests and host builds.
///
/// # Examples
///
/// ```
/// use bitpool::xmem::{LinearXmem, Xmem};
///
/// let mut xmem = LinearXmem::new(128);
/// assert_eq!(xmem.reserve(96), Ok(0));
/// assert_eq!(xmem.reserve(32), Ok(96));
/// assert!(xmem.reserve(1).is_err());
/// ```
#[derive(Debug)]
pub struct LinearXmem {
    next: u32,
    capacity: u32,
}

impl LinearXmem {
    /// Creates a new `LinearXmem` of `capacity` bytes, all unreserved.
    #[inline]
    pub const fn new(capacity: u32) -> Self {
        Self { next: 0, capacity }
    }

    /// Returns the device capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the number of bytes reserved so far.
    #[inline]
    pub const fn reserved(&self) -> u32 {
        self.next
    }

    /// Returns the number of bytes still available.
    #[inline]
    pub const fn remaining(&self) -> u32 {
        self.capacity - self.next
    }
}

impl Xmem for LinearXmem {
    fn reserve(&mut self, size: u32) -> Result<u32, ReserveError> {
        let end = self.next.checked_add(size).ok_or(ReserveError)?;
        if end > self.capacity {
            return Err(ReserveError);
        }
        let offset = self.next;
        self.next = end;
        Ok(offset)
    }
}
