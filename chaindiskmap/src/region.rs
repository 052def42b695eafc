use std::io;
use std::ops::Deref;
use std::ptr;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::byte_store::ByteStore;

/// A `ByteStore` shared between threads.
///
/// Any number of threads may hold a [`RegionRef`] and access bytes through it;
/// the caller's locking decides who may touch which bytes. Growing needs a
/// [`RegionMut`], which waits for every `RegionRef` to be dropped, so a remap
/// is never observed halfway.
pub struct Region<BS> {
    store: RwLock<BS>,
}

impl<BS: ByteStore> Region<BS> {
    pub fn new(store: BS) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    pub fn read(&self) -> RegionRef<'_, BS> {
        let guard = self.store.read();
        let view = RawView::of(&*guard);
        RegionRef { view, _guard: guard }
    }

    pub fn exclusive(&self) -> RegionMut<'_, BS> {
        let guard = self.store.write();
        let view = RawView::of(&*guard);
        RegionMut { view, guard }
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Grows the region so it holds at least `min_len` bytes. No-op if it already does.
    pub fn ensure_len(&self, min_len: usize) -> io::Result<()> {
        let mut region = self.exclusive();
        region.ensure_len(min_len)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.store.read().flush()
    }

    pub fn stats(&self) -> u64 {
        self.store.read().stats()
    }

    pub fn into_inner(self) -> BS {
        self.store.into_inner()
    }
}

/// Shared access to a region.
pub struct RegionRef<'a, BS> {
    view: RawView,
    _guard: RwLockReadGuard<'a, BS>,
}

impl<BS> Deref for RegionRef<'_, BS> {
    type Target = RawView;

    fn deref(&self) -> &RawView {
        &self.view
    }
}

/// Exclusive access to a region, the only way to grow it.
pub struct RegionMut<'a, BS> {
    view: RawView,
    guard: RwLockWriteGuard<'a, BS>,
}

impl<BS: ByteStore> RegionMut<'_, BS> {
    pub fn ensure_len(&mut self, min_len: usize) -> io::Result<()> {
        if self.guard.len() < min_len {
            self.guard.grow(min_len)?;
            self.view = RawView::of(&*self.guard);
        }
        Ok(())
    }
}

impl<BS> Deref for RegionMut<'_, BS> {
    type Target = RawView;

    fn deref(&self) -> &RawView {
        &self.view
    }
}

/// Typed little endian access to the bytes of a locked region.
///
/// All accessors take `&self`. Two threads must never write the same bytes, or
/// read bytes another thread is writing, at the same time; the engine's stripe
/// locks guarantee that. Range checks panic like slice indexing does.
pub struct RawView {
    ptr: *mut u8,
    len: usize,
}

impl RawView {
    fn of<BS: ByteStore>(store: &BS) -> Self {
        Self {
            ptr: store.as_mut_ptr(),
            len: store.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `width` bytes starting at `pos` lie inside the region.
    pub fn contains(&self, pos: u64, width: u64) -> bool {
        pos.checked_add(width)
            .is_some_and(|end| end <= self.len as u64)
    }

    #[inline]
    fn check(&self, pos: u64, width: usize) -> usize {
        assert!(
            self.contains(pos, width as u64),
            "access of {width} bytes at {pos} is out of bounds for a region of {} bytes",
            self.len
        );
        pos as usize
    }

    pub fn read_u64(&self, pos: u64) -> u64 {
        let start = self.check(pos, 8);
        // SAFETY: in bounds; concurrent writers are excluded by the caller's locks
        let raw = unsafe { ptr::read_unaligned(self.ptr.add(start) as *const u64) };
        u64::from_le(raw)
    }

    pub fn write_u64(&self, pos: u64, value: u64) {
        let start = self.check(pos, 8);
        // SAFETY: as for `read_u64`
        unsafe { ptr::write_unaligned(self.ptr.add(start) as *mut u64, value.to_le()) }
    }

    pub fn read_u32(&self, pos: u64) -> u32 {
        let start = self.check(pos, 4);
        // SAFETY: as for `read_u64`
        let raw = unsafe { ptr::read_unaligned(self.ptr.add(start) as *const u32) };
        u32::from_le(raw)
    }

    pub fn write_u32(&self, pos: u64, value: u32) {
        let start = self.check(pos, 4);
        // SAFETY: as for `read_u64`
        unsafe { ptr::write_unaligned(self.ptr.add(start) as *mut u32, value.to_le()) }
    }

    /// Borrows `len` bytes at `pos`. The bytes must not be written while borrowed.
    pub fn bytes(&self, pos: u64, len: u64) -> &[u8] {
        let start = self.check(pos, len as usize);
        // SAFETY: in bounds, and the mapping outlives `&self` since a view only
        // exists while its region lock is held
        unsafe { std::slice::from_raw_parts(self.ptr.add(start), len as usize) }
    }

    pub fn write_bytes(&self, pos: u64, src: &[u8]) {
        let start = self.check(pos, src.len());
        // SAFETY: in bounds; `src` cannot alias the region since the range is
        // not handed out as a slice while it is being written
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.add(start), src.len()) }
    }

    pub fn fill_zero(&self, pos: u64, len: u64) {
        let start = self.check(pos, len as usize);
        // SAFETY: in bounds
        unsafe { ptr::write_bytes(self.ptr.add(start), 0, len as usize) }
    }
}
