use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};

pub const DEFAULT_STRIPES: usize = 1024;

/// A fixed pool of locks shared out to buckets by the low bits of their hash.
///
/// The pool never resizes. It is sized to at most half the table length it
/// was created for, so the two buckets produced by splitting one bucket
/// always map to the same lock.
pub struct StripedLocks {
    locks: Box<[CachePadded<Mutex<()>>]>,
    mask: u64,
}

impl StripedLocks {
    pub fn for_table(stripes: usize, table_length: u64) -> Self {
        let limit = (table_length / 2).max(1);
        let n = (stripes.max(1).next_power_of_two() as u64).min(limit);
        // table lengths are powers of two, so is `n`
        let locks = (0..n).map(|_| CachePadded::new(Mutex::new(()))).collect();
        Self { locks, mask: n - 1 }
    }

    /// Lock for a hash, or equally for any bucket index derived from it.
    pub fn lock_for_hash(&self, hash: u64) -> MutexGuard<'_, ()> {
        self.locks[(hash & self.mask) as usize].lock()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}
