//! Fixed width slot records for the open addressing layout.
//!
//! Each slot points into a separate heap holding the key bytes followed by the
//! value bytes. A `data_ptr` of `0` marks a free slot and `-1` a tombstone.
use bytemuck::{Pod, Zeroable};

use crate::region::RawView;

pub const SLOT_RECORD_LEN: u64 = std::mem::size_of::<SlotRecord>() as u64;

const FREE: i64 = 0;
const TOMBSTONE: i64 = -1;
const DATA_PTR_OFFSET: u64 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SlotRecord {
    pub hash: u64,
    pub data_ptr: i64,
    pub key_len: u32,
    pub value_len: u32,
}

impl SlotRecord {
    pub const TOMBSTONE: SlotRecord = SlotRecord {
        hash: u64::MAX,
        data_ptr: TOMBSTONE,
        key_len: u32::MAX,
        value_len: u32::MAX,
    };

    pub fn new(hash: u64, data_ptr: i64, key_len: u32, value_len: u32) -> Self {
        Self {
            hash,
            data_ptr,
            key_len,
            value_len,
        }
    }

    pub fn read_at(view: &RawView, pos: u64) -> Self {
        Self {
            hash: view.read_u64(pos),
            data_ptr: view.read_u64(pos + DATA_PTR_OFFSET) as i64,
            key_len: view.read_u32(pos + 16),
            value_len: view.read_u32(pos + 20),
        }
    }

    pub fn write_at(&self, view: &RawView, pos: u64) {
        view.write_u64(pos, self.hash);
        view.write_u64(pos + DATA_PTR_OFFSET, self.data_ptr as u64);
        view.write_u32(pos + 16, self.key_len);
        view.write_u32(pos + 20, self.value_len);
    }

    /// Whether the slot at `pos` may take a new insert. Only reads `data_ptr`.
    pub fn writable_at(view: &RawView, pos: u64) -> bool {
        let data_ptr = view.read_u64(pos + DATA_PTR_OFFSET) as i64;
        data_ptr == FREE || data_ptr == TOMBSTONE
    }

    pub fn is_free(&self) -> bool {
        self.data_ptr == FREE
    }

    pub fn is_tombstone(&self) -> bool {
        self.data_ptr == TOMBSTONE
    }

    pub fn is_writable(&self) -> bool {
        self.is_free() || self.is_tombstone()
    }

    /// Cheap pre-check before comparing key bytes.
    pub fn matches(&self, hash: u64, key_len: u32) -> bool {
        self.hash == hash && self.key_len == key_len
    }

    /// Key bytes in `heap`, `None` for free or tombstoned slots and bad pointers.
    pub fn key<'a>(&self, heap: &'a RawView) -> Option<&'a [u8]> {
        self.heap_bytes(heap, 0, self.key_len)
    }

    pub fn value<'a>(&self, heap: &'a RawView) -> Option<&'a [u8]> {
        self.heap_bytes(heap, self.key_len as u64, self.value_len)
    }

    fn heap_bytes<'a>(&self, heap: &'a RawView, offset: u64, len: u32) -> Option<&'a [u8]> {
        if self.is_writable() || self.data_ptr < 0 {
            return None;
        }
        let pos = (self.data_ptr as u64).checked_add(offset)?;
        heap.contains(pos, len as u64).then(|| heap.bytes(pos, len as u64))
    }
}
