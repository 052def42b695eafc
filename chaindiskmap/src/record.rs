use bytemuck::{Pod, Zeroable};

use crate::error::{Error, Result};
use crate::region::RawView;

/// Width of the fixed part of a chained record.
pub const RECORD_HEADER_LEN: u64 = std::mem::size_of::<RecordHeader>() as u64;

/// Offset of `next` inside a record, the only field rewritten after the first write.
const NEXT_OFFSET: u64 = 8;

/// Fixed prefix of every record in the log, stored little endian.
///
/// ```text
/// [hash: u64][next: u64][key_len: u32][value_len: u32][key bytes][value bytes]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RecordHeader {
    pub hash: u64,
    /// Log offset of the next record in the chain, `0` ends the chain.
    pub next: u64,
    pub key_len: u32,
    pub value_len: u32,
}

impl RecordHeader {
    fn to_le(self) -> Self {
        Self {
            hash: self.hash.to_le(),
            next: self.next.to_le(),
            key_len: self.key_len.to_le(),
            value_len: self.value_len.to_le(),
        }
    }

    fn from_le(self) -> Self {
        // byte swapping is its own inverse
        self.to_le()
    }
}

/// A record located in the log. Key and value are borrowed from the mapping.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pos: u64,
    header: RecordHeader,
    key: &'a [u8],
    value: &'a [u8],
}

impl<'a> Record<'a> {
    /// Decodes the record at `pos`, checking that it lies inside the region.
    pub fn read(view: &'a RawView, pos: u64) -> Result<Self> {
        if !view.contains(pos, RECORD_HEADER_LEN) {
            return Err(Error::InvalidRecord {
                pos,
                reason: "header out of bounds",
            });
        }
        let header: RecordHeader =
            bytemuck::pod_read_unaligned::<RecordHeader>(view.bytes(pos, RECORD_HEADER_LEN))
                .from_le();

        let key_pos = pos + RECORD_HEADER_LEN;
        let value_pos = key_pos + header.key_len as u64;
        if !view.contains(key_pos, header.key_len as u64 + header.value_len as u64) {
            return Err(Error::InvalidRecord {
                pos,
                reason: "key or value out of bounds",
            });
        }

        Ok(Self {
            pos,
            header,
            key: view.bytes(key_pos, header.key_len as u64),
            value: view.bytes(value_pos, header.value_len as u64),
        })
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn hash(&self) -> u64 {
        self.header.hash
    }

    /// The chain link as it was when this record was read.
    pub fn next(&self) -> u64 {
        self.header.next
    }

    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    pub fn size(&self) -> u64 {
        RECORD_HEADER_LEN + self.key.len() as u64 + self.value.len() as u64
    }

    /// Compares hashes first and only looks at key bytes when they agree.
    pub fn key_equals(&self, hash: u64, key: &[u8]) -> bool {
        self.header.hash == hash && self.key == key
    }
}

/// Rewrites the chain link of the record at `pos`.
pub fn set_next(view: &RawView, pos: u64, next: u64) {
    view.write_u64(pos + NEXT_OFFSET, next);
}

/// A record that has not been written yet.
#[derive(Debug, Clone, Copy)]
pub struct NewRecord<'a> {
    hash: u64,
    key: &'a [u8],
    value: &'a [u8],
}

impl<'a> NewRecord<'a> {
    pub fn new(hash: u64, key: &'a [u8], value: &'a [u8]) -> Result<Self> {
        if key.len() > u32::MAX as usize {
            return Err(Error::CapacityExceeded(format!(
                "key of {} bytes is longer than {} bytes",
                key.len(),
                u32::MAX
            )));
        }
        if value.len() > u32::MAX as usize {
            return Err(Error::CapacityExceeded(format!(
                "value of {} bytes is longer than {} bytes",
                value.len(),
                u32::MAX
            )));
        }
        Ok(Self { hash, key, value })
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn size(&self) -> u64 {
        RECORD_HEADER_LEN + self.key.len() as u64 + self.value.len() as u64
    }

    /// Writes the record at `pos` with the given chain link.
    /// `pos` must come from an allocation of at least `size()` bytes.
    pub fn write_at(&self, view: &RawView, pos: u64, next: u64) {
        let header = RecordHeader {
            hash: self.hash,
            next,
            key_len: self.key.len() as u32,
            value_len: self.value.len() as u32,
        }
        .to_le();
        view.write_bytes(pos, bytemuck::bytes_of(&header));
        view.write_bytes(pos + RECORD_HEADER_LEN, self.key);
        view.write_bytes(pos + RECORD_HEADER_LEN + self.key.len() as u64, self.value);
    }
}
