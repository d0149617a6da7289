use std::collections::HashSet;

use bitpool::occupancy::bitmap_len;
use bitpool::pool::Pool;
use bitpool::xmem::{LinearXmem, Xmem};
use bitpool::xpool::XPool;
use proptest::prelude::*;

const BLOCK_SIZE: u32 = 8;
const BLOCK_COUNT: usize = 24;

#[derive(Debug, Clone)]
enum Op {
    Allocate,
    Free(prop::sample::Index),
    FreeStale(prop::sample::Index),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Allocate),
        2 => any::<prop::sample::Index>().prop_map(Op::Free),
        1 => any::<prop::sample::Index>().prop_map(Op::FreeStale),
    ]
}

proptest! {
    /// Drives an external pool with an arbitrary alloc/free interleaving
    /// and checks it against a plain set of outstanding offsets.
    #[test]
    fn xpool_matches_a_set_model(ops in prop::collection::vec(op(), 1..256)) {
        let mut xmem = LinearXmem::new(BLOCK_SIZE * BLOCK_COUNT as u32);
        let mut bitmap = [0_u8; bitmap_len(BLOCK_COUNT)];
        let mut pool = XPool::new(&mut xmem, &mut bitmap, BLOCK_SIZE, BLOCK_COUNT).unwrap();
        let mut outstanding: Vec<u32> = Vec::new();
        let mut stale: Vec<u32> = Vec::new();
        for op in ops {
            match op {
                Op::Allocate => match pool.allocate() {
                    Some(offset) => {
                        prop_assert!(!outstanding.contains(&offset));
                        prop_assert!(pool.contains(offset));
                        prop_assert_eq!((offset - pool.base()) % BLOCK_SIZE, 0);
                        outstanding.push(offset);
                    }
                    None => prop_assert_eq!(outstanding.len(), BLOCK_COUNT),
                },
                Op::Free(index) => {
                    if !outstanding.is_empty() {
                        let offset = outstanding.swap_remove(index.index(outstanding.len()));
                        prop_assert!(pool.free(offset).is_ok());
                        stale.push(offset);
                    }
                }
                Op::FreeStale(index) => {
                    if !stale.is_empty() {
                        let offset = stale[index.index(stale.len())];
                        if !outstanding.contains(&offset) {
                            prop_assert!(pool.free(offset).is_ok());
                        }
                    }
                }
            }
            prop_assert_eq!(pool.live_count(), outstanding.len());
        }
        let live: HashSet<u32> = pool.live_offsets().collect();
        let model: HashSet<u32> = outstanding.iter().copied().collect();
        prop_assert_eq!(live, model);
    }

    /// On a full pool, freeing any single block makes the next allocation
    /// return exactly that block.
    #[test]
    fn freed_block_is_always_reallocatable(victim in 0..BLOCK_COUNT) {
        let mut xmem = LinearXmem::new(BLOCK_SIZE * BLOCK_COUNT as u32);
        let mut bitmap = [0_u8; bitmap_len(BLOCK_COUNT)];
        let mut pool = XPool::new(&mut xmem, &mut bitmap, BLOCK_SIZE, BLOCK_COUNT).unwrap();
        let offsets: Vec<u32> = (0..BLOCK_COUNT).map(|_| pool.allocate().unwrap()).collect();
        prop_assert!(pool.allocate().is_none());
        prop_assert!(pool.free(offsets[victim]).is_ok());
        prop_assert_eq!(pool.allocate(), Some(offsets[victim]));
    }

    /// Membership agrees with plain offset arithmetic for arbitrary
    /// probes, including a pool that does not start at offset 0.
    #[test]
    fn membership_agrees_with_offset_arithmetic(probe in any::<u32>()) {
        let mut xmem = LinearXmem::new(256);
        xmem.reserve(40).unwrap();
        let mut bitmap = [0_u8; bitmap_len(BLOCK_COUNT)];
        let pool = XPool::new(&mut xmem, &mut bitmap, BLOCK_SIZE, BLOCK_COUNT).unwrap();
        let inside = probe >= pool.base()
            && probe - pool.base() < BLOCK_SIZE * BLOCK_COUNT as u32;
        prop_assert_eq!(pool.contains(probe), inside);
    }

    /// The local pool never hands out overlapping or misplaced blocks,
    /// whatever the interleaving.
    #[test]
    fn local_blocks_stay_distinct(
        ops in prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), 1..128),
    ) {
        const SIZE: usize = 4;
        const COUNT: usize = 8;
        let mut region = [0_u8; SIZE * COUNT];
        let mut bitmap = [0_u8; bitmap_len(COUNT)];
        let mut pool = Pool::new(&mut region, &mut bitmap, SIZE);
        // A fresh pool hands out block 0 first, which is the region base.
        let base = {
            let first = pool.allocate().unwrap();
            pool.free(first).unwrap();
            first.as_ptr() as usize
        };
        let mut live = Vec::new();
        for op in ops {
            match op {
                Some(index) if !live.is_empty() => {
                    let ptr = live.swap_remove(index.index(live.len()));
                    prop_assert!(pool.free(ptr).is_ok());
                }
                _ => {
                    if let Some(ptr) = pool.allocate() {
                        prop_assert!(!live.contains(&ptr));
                        prop_assert!(pool.contains(ptr));
                        let offset = ptr.as_ptr() as usize - base;
                        prop_assert_eq!(offset % SIZE, 0);
                        prop_assert!(offset < SIZE * COUNT);
                        live.push(ptr);
                    } else {
                        prop_assert_eq!(live.len(), COUNT);
                    }
                }
            }
        }
        prop_assert!(live.len() <= COUNT);
    }
}
