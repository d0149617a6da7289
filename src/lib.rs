//! Fixed-size block pools with bit-per-block occupancy tracking.
//!
//! Memory-constrained firmware often cannot afford a general heap, yet
//! still needs to hand out buffers at run time: packet slots, queue
//! entries, records in an external FRAM chip. This crate provides two
//! pool flavors over caller-supplied storage:
//!
//! - [`pool::Pool`] manages blocks in directly addressable memory and
//!   deals in native pointers.
//! - [`xpool::XPool`] manages blocks in an externally attached device
//!   behind the [`xmem::Xmem`] trait and deals in 32-bit device offsets.
//!   It additionally counts its live blocks and can enumerate them.
//!
//! Both are built on the same circular-sweep occupancy map from
//! [`occupancy`], so the allocation policy is identical across address
//! domains: *O(block_count)* worst-case sweeps, no per-block headers, no
//! internal locking, no dynamic memory of the pools' own.
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
//!
//! Pools are single-context by construction: every mutating operation
//! takes `&mut self`, so sharing one between a main loop and an interrupt
//! handler requires the same critical section any other `&mut` data
//! would.

#![warn(missing_docs)]
#![no_std]

pub mod occupancy;
pub mod pool;
pub mod xmem;
pub mod xpool;
