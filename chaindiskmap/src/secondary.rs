use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};

use crate::byte_store::ByteStore;
use crate::error::{Error, Result};
use crate::region::{Region, RegionRef};

pub const LOG_HEADER_LEN: u64 = std::mem::size_of::<LogHeader>() as u64;

const SPLIT_MARKER_OFFSET: u64 = 24;

/// Header stored at the start of the secondary file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct LogHeader {
    /// Number of live entries.
    pub size: u64,
    /// Number of primary slots, `0` if unknown.
    pub table_length: u64,
    /// Offset of the next allocation, `0` means right after the header.
    pub write_pos: u64,
    /// Number of buckets of the lower half that have been split after the
    /// last doubling. Equals `table_length / 2` when no rehash is in progress.
    pub split_marker: u64,
}

/// Append only log of records.
pub struct SecondaryLog<BS> {
    region: Region<BS>,
    write_pos: AtomicU64,
}

impl<BS: ByteStore> SecondaryLog<BS> {
    /// Starts an empty log over `store`, discarding whatever header it held.
    pub fn create(store: BS) -> Result<Self> {
        let region = Region::new(store);
        region.ensure_len(LOG_HEADER_LEN as usize)?;
        region.read().fill_zero(0, LOG_HEADER_LEN);
        Ok(Self {
            region,
            write_pos: AtomicU64::new(LOG_HEADER_LEN),
        })
    }

    /// Opens an existing log and returns it with its persisted header.
    pub fn open(store: BS) -> Result<(Self, LogHeader)> {
        if (store.len() as u64) < LOG_HEADER_LEN {
            return Err(Error::InvalidHeader(format!(
                "secondary file holds {} bytes, less than the {LOG_HEADER_LEN} byte header",
                store.len()
            )));
        }
        let region = Region::new(store);
        let mut header = {
            let view = region.read();
            LogHeader {
                size: view.read_u64(0),
                table_length: view.read_u64(8),
                write_pos: view.read_u64(16),
                split_marker: view.read_u64(SPLIT_MARKER_OFFSET),
            }
        };
        if header.write_pos == 0 {
            header.write_pos = LOG_HEADER_LEN;
        }
        if header.write_pos < LOG_HEADER_LEN || header.write_pos > region.len() as u64 {
            return Err(Error::InvalidHeader(format!(
                "write position {} is outside the secondary file of {} bytes",
                header.write_pos,
                region.len()
            )));
        }

        let log = Self {
            region,
            write_pos: AtomicU64::new(header.write_pos),
        };
        Ok((log, header))
    }

    pub fn read(&self) -> RegionRef<'_, BS> {
        self.region.read()
    }

    /// Reserves `n` bytes and returns their offset, growing the log when the
    /// reservation runs past its end.
    ///
    /// Must not be called while holding a guard from [`read`](Self::read).
    ///
    /// The cursor only moves once the log is long enough to hold the
    /// reservation, so a failed growth leaves it where it was.
    pub fn allocate(&self, n: u64) -> Result<u64> {
        let mut pos = self.write_pos.load(Ordering::Acquire);
        loop {
            let end = pos
                .checked_add(n)
                .filter(|&end| usize::try_from(end).is_ok())
                .ok_or_else(|| {
                    Error::CapacityExceeded(format!("allocation of {n} bytes at offset {pos}"))
                })?;
            if end as usize > self.region.len() {
                self.region.ensure_len(end as usize)?;
            }
            match self
                .write_pos
                .compare_exchange_weak(pos, end, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(pos),
                Err(current) => pos = current,
            }
        }
    }

    pub fn write_pos(&self) -> u64 {
        self.write_pos.load(Ordering::Acquire)
    }

    /// Persists `header` with the current write position.
    pub fn write_header(&self, header: LogHeader) {
        let view = self.region.exclusive();
        view.write_u64(0, header.size);
        view.write_u64(8, header.table_length);
        view.write_u64(16, self.write_pos());
        view.write_u64(SPLIT_MARKER_OFFSET, header.split_marker);
    }

    /// Persists the split progress alone. Only the rehashing thread calls this.
    pub fn write_split_marker(&self, split: u64) {
        self.region.read().write_u64(SPLIT_MARKER_OFFSET, split);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.region.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.write_pos() == LOG_HEADER_LEN
    }

    pub fn flush(&self) -> Result<()> {
        Ok(self.region.flush()?)
    }

    pub fn stats(&self) -> u64 {
        self.region.stats()
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> BS {
        self.region.into_inner()
    }
}
