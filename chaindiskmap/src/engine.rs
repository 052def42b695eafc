use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::byte_store::ByteStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::hash;
use crate::primary::{self, SLOT_WIDTH, directory_len};
use crate::record::{self, NewRecord, Record};
use crate::region::{RawView, Region, RegionRef};
use crate::secondary::{LogHeader, SecondaryLog};
use crate::stripes::StripedLocks;

/// Bucket of `hash` in a table of `table_length` slots whose first `split`
/// low buckets have been split since the last doubling.
pub(crate) fn bucket_of(hash: u64, table_length: u64, split: u64) -> u64 {
    let idx = hash & (table_length - 1);
    let low = idx & (table_length / 2 - 1);
    if low < split { idx } else { low }
}

/// The chained hash table over a primary directory and a secondary log.
///
/// Every access to a bucket's chain happens under the bucket's stripe lock.
/// Guards are always taken in the order stripe, primary, secondary, and
/// nothing allocates from the log while holding a secondary guard.
///
/// Doubling the table happens in two phases. The directory is grown under its
/// exclusive lock and `split` is reset to zero, which keeps every hash in its
/// old bucket. The lower buckets are then split one by one, each under its
/// stripe lock, advancing `split` after each. At no point can a reader see a
/// chain that is half relinked.
pub struct Engine<BS> {
    primary: Region<BS>,
    log: SecondaryLog<BS>,
    stripes: StripedLocks,
    table_length: AtomicU64,
    split: AtomicU64,
    size: AtomicU64,
    config: Config,
    rehash_lock: Mutex<()>,
}

enum Probe<'a> {
    Empty,
    Found { prev: Option<u64>, record: Record<'a> },
    Missing { tail: u64 },
}

struct Bucket<'a, BS> {
    _stripe: MutexGuard<'a, ()>,
    primary: RegionRef<'a, BS>,
    log: RegionRef<'a, BS>,
    index: u64,
}

impl<BS> Bucket<'_, BS> {
    fn probe(&self, hash: u64, key: &[u8]) -> Result<Probe<'_>> {
        let mut pos = primary::slot(&self.primary, self.index);
        if pos == 0 {
            return Ok(Probe::Empty);
        }
        let mut prev = None;
        loop {
            let record = Record::read(&self.log, pos)?;
            if record.key_equals(hash, key) {
                return Ok(Probe::Found { prev, record });
            }
            if record.next() == 0 {
                return Ok(Probe::Missing { tail: pos });
            }
            prev = Some(pos);
            pos = record.next();
        }
    }

    /// Points the slot, or the record at `prev`, to `target`.
    fn link(&self, prev: Option<u64>, target: u64) {
        match prev {
            None => primary::set_slot(&self.primary, self.index, target),
            Some(prev) => record::set_next(&self.log, prev, target),
        }
    }
}

fn read_chain(log: &RawView, mut pos: u64) -> Result<Vec<Record<'_>>> {
    let mut chain = Vec::new();
    while pos != 0 {
        let record = Record::read(log, pos)?;
        pos = record.next();
        chain.push(record);
    }
    Ok(chain)
}

fn relink(log: &RawView, chain: &[u64]) {
    for pair in chain.windows(2) {
        record::set_next(log, pair[0], pair[1]);
    }
    if let Some(&last) = chain.last() {
        record::set_next(log, last, 0);
    }
}

impl<BS: ByteStore> Engine<BS> {
    /// Builds an empty table over the two stores.
    pub fn create(primary: BS, secondary: BS, config: &Config) -> Result<Self> {
        let table_length = config.table_length;
        let primary = Region::new(primary);
        {
            let mut dir = primary.exclusive();
            dir.ensure_len(directory_len(table_length)?)?;
            primary::clear_slots(&dir, 0, table_length);
        }
        let secondary = SecondaryLog::create(secondary)?;

        let engine = Self::assemble(primary, secondary, table_length, table_length / 2, 0, config);
        engine.write_header();
        log::debug!("created table of {table_length} slots");
        Ok(engine)
    }

    /// Opens a table from stores written by an earlier [`create`](Self::create),
    /// completing any rehash that was interrupted.
    pub fn open(primary: BS, secondary: BS, config: &Config) -> Result<Self> {
        let primary = Region::new(primary);
        let (secondary, header) = SecondaryLog::open(secondary)?;
        let slots = primary.len() as u64 / SLOT_WIDTH;

        let (table_length, split) = if header.table_length == 0 {
            (slots, slots / 2)
        } else {
            (header.table_length, header.split_marker)
        };
        if table_length < 2 || !table_length.is_power_of_two() {
            return Err(Error::InvalidHeader(format!(
                "table length {table_length} is not a power of two of at least 2"
            )));
        }
        if table_length > slots {
            return Err(Error::InvalidHeader(format!(
                "table length {table_length} does not fit a primary file of {} bytes",
                primary.len()
            )));
        }
        if split > table_length / 2 {
            return Err(Error::InvalidHeader(format!(
                "split marker {split} is past the middle of {table_length} slots"
            )));
        }

        let engine = Self::assemble(primary, secondary, table_length, split, header.size, config);
        log::debug!(
            "opened table of {table_length} slots holding {} entries",
            header.size
        );
        if split < table_length / 2 {
            log::debug!("resuming rehash of {table_length} slots at bucket {split}");
            let _rehash = engine.rehash_lock.lock();
            engine.finish_split()?;
            engine.write_header();
        }
        Ok(engine)
    }

    fn assemble(
        primary: Region<BS>,
        log: SecondaryLog<BS>,
        table_length: u64,
        split: u64,
        size: u64,
        config: &Config,
    ) -> Self {
        Self {
            primary,
            log,
            stripes: StripedLocks::for_table(config.stripes, table_length),
            table_length: AtomicU64::new(table_length),
            split: AtomicU64::new(split),
            size: AtomicU64::new(size),
            config: config.clone(),
            rehash_lock: Mutex::new(()),
        }
    }

    fn lock_bucket(&self, hash: u64) -> Bucket<'_, BS> {
        let stripe = self.stripes.lock_for_hash(hash);
        let primary = self.primary.read();
        // stable while both guards are held
        let index = bucket_of(
            hash,
            self.table_length.load(Ordering::Acquire),
            self.split.load(Ordering::Acquire),
        );
        let log = self.log.read();
        Bucket {
            _stripe: stripe,
            primary,
            log,
            index,
        }
    }

    /// Looks up `key` and hands its value to `f` without copying it.
    pub fn get_with<R>(&self, key: &[u8], f: impl FnOnce(&[u8]) -> R) -> Result<Option<R>> {
        let hash = hash(key);
        let bucket = self.lock_bucket(hash);
        match bucket.probe(hash, key)? {
            Probe::Found { record, .. } => Ok(Some(f(record.value()))),
            Probe::Empty | Probe::Missing { .. } => Ok(None),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_with(key, <[u8]>::to_vec)
    }

    /// Inserts or replaces `key`, returning the value it replaced.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.maybe_rehash()?;
        let new = NewRecord::new(hash(key), key, value)?;
        let pos = self.log.allocate(new.size())?;

        let bucket = self.lock_bucket(new.hash());
        match bucket.probe(new.hash(), key)? {
            Probe::Found { prev, record } => {
                let old = record.value().to_vec();
                new.write_at(&bucket.log, pos, record.next());
                bucket.link(prev, pos);
                Ok(Some(old))
            }
            Probe::Empty => {
                self.append(&bucket, &new, pos, None);
                Ok(None)
            }
            Probe::Missing { tail } => {
                self.append(&bucket, &new, pos, Some(tail));
                Ok(None)
            }
        }
    }

    /// Inserts `key` only if it is absent. Returns the existing value otherwise,
    /// in which case nothing is written.
    pub fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        let new = NewRecord::new(hash(key), key, value)?;
        if let Some(existing) = self.get(key)? {
            return Ok(Some(existing));
        }

        self.maybe_rehash()?;
        let pos = self.log.allocate(new.size())?;
        let bucket = self.lock_bucket(new.hash());
        match bucket.probe(new.hash(), key)? {
            // inserted by another thread since the first probe; the space at `pos` stays unused
            Probe::Found { record, .. } => Ok(Some(record.value().to_vec())),
            Probe::Empty => {
                self.append(&bucket, &new, pos, None);
                Ok(None)
            }
            Probe::Missing { tail } => {
                self.append(&bucket, &new, pos, Some(tail));
                Ok(None)
            }
        }
    }

    fn append(&self, bucket: &Bucket<'_, BS>, new: &NewRecord<'_>, pos: u64, tail: Option<u64>) {
        new.write_at(&bucket.log, pos, 0);
        bucket.link(tail, pos);
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    /// Unlinks `key` from its chain and returns its value. The record's bytes
    /// stay in the log.
    pub fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let hash = hash(key);
        let bucket = self.lock_bucket(hash);
        match bucket.probe(hash, key)? {
            Probe::Found { prev, record } => {
                let old = record.value().to_vec();
                bucket.link(prev, record.next());
                self.size.fetch_sub(1, Ordering::Relaxed);
                Ok(Some(old))
            }
            Probe::Empty | Probe::Missing { .. } => Ok(None),
        }
    }

    pub fn len(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn table_length(&self) -> u64 {
        self.table_length.load(Ordering::Acquire)
    }

    /// Live entries per slot.
    pub fn load(&self) -> f64 {
        self.len() as f64 / self.table_length() as f64
    }

    /// Growth counts of the primary and secondary stores.
    pub fn stats(&self) -> (u64, u64) {
        (self.primary.stats(), self.log.stats())
    }

    fn over_threshold(&self) -> bool {
        self.len() as f64 > self.config.rehash_threshold(self.table_length())
    }

    /// Doubles the table if it is over its load threshold and no other thread
    /// is already doing so.
    fn maybe_rehash(&self) -> Result<()> {
        if !self.over_threshold() {
            return Ok(());
        }
        if let Some(_rehash) = self.rehash_lock.try_lock() {
            if self.over_threshold() {
                self.rehash_locked()?;
            }
        }
        Ok(())
    }

    /// Doubles the table, blocking until any rehash in progress is done.
    pub fn rehash(&self) -> Result<()> {
        let _rehash = self.rehash_lock.lock();
        self.rehash_locked()
    }

    fn rehash_locked(&self) -> Result<()> {
        // left over from a split that failed part way
        self.finish_split()?;

        let old = self.grow_directory()?;
        log::debug!("rehashing {old} buckets into {}", old * 2);
        self.finish_split()?;
        self.write_header();
        log::debug!("rehash into {} buckets complete", old * 2);
        Ok(())
    }

    /// Doubles the directory and returns the previous table length. Every hash
    /// still resolves to its old bucket until that bucket is split.
    pub(crate) fn grow_directory(&self) -> Result<u64> {
        let old = self.table_length();
        let new = old
            .checked_mul(2)
            .ok_or_else(|| Error::CapacityExceeded(format!("cannot double {old} slots")))?;
        let len = directory_len(new)?;
        {
            let mut dir = self.primary.exclusive();
            dir.ensure_len(len)?;
            primary::clear_slots(&dir, old, new);
            self.table_length.store(new, Ordering::Release);
            self.split.store(0, Ordering::Release);
        }
        self.write_header();
        Ok(old)
    }

    fn finish_split(&self) -> Result<()> {
        let table_length = self.table_length();
        let mut split = self.split.load(Ordering::Acquire);
        while split < table_length / 2 {
            self.split_bucket(split, table_length)?;
            split += 1;
        }
        Ok(())
    }

    /// Moves the records of bucket `low` that belong to its upper partner.
    ///
    /// Records already chained in the upper bucket stay at its head, so
    /// splitting a bucket a second time changes nothing.
    pub(crate) fn split_bucket(&self, low: u64, table_length: u64) -> Result<()> {
        let high = low + table_length / 2;
        let mask = table_length - 1;
        {
            let _stripe = self.stripes.lock_for_hash(low);
            let primary = self.primary.read();
            let log = self.log.read();

            let mut moved = Vec::new();
            for record in read_chain(&log, primary::slot(&primary, high))? {
                let resolved = record.hash() & mask;
                if resolved != high {
                    return Err(Error::Corrupted {
                        hash: record.hash(),
                        bucket: high,
                        resolved,
                        table_length,
                    });
                }
                moved.push(record.pos());
            }

            let mut kept = Vec::new();
            for record in read_chain(&log, primary::slot(&primary, low))? {
                match record.hash() & mask {
                    resolved if resolved == low => kept.push(record.pos()),
                    resolved if resolved == high => moved.push(record.pos()),
                    resolved => {
                        return Err(Error::Corrupted {
                            hash: record.hash(),
                            bucket: low,
                            resolved,
                            table_length,
                        });
                    }
                }
            }

            relink(&log, &kept);
            relink(&log, &moved);
            primary::set_slot(&primary, low, kept.first().copied().unwrap_or(0));
            primary::set_slot(&primary, high, moved.first().copied().unwrap_or(0));
            self.split.store(low + 1, Ordering::Release);
        }
        self.log.write_split_marker(low + 1);
        Ok(())
    }

    /// Visits every live record, one bucket at a time, until `visitor` breaks.
    ///
    /// Each bucket is seen as a consistent snapshot but the scan as a whole is
    /// not: records written or moved by a concurrent rehash while the scan
    /// runs may be missed or seen twice. `visitor` runs under a bucket lock
    /// and must not call back into the map.
    pub fn process_all_records<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Record<'_>) -> ControlFlow<()>,
    {
        let mut bucket = 0;
        loop {
            let _stripe = self.stripes.lock_for_hash(bucket);
            let primary = self.primary.read();
            if bucket >= self.table_length() {
                return Ok(());
            }
            let log = self.log.read();
            let mut pos = primary::slot(&primary, bucket);
            while pos != 0 {
                let record = Record::read(&log, pos)?;
                if visitor(&record).is_break() {
                    return Ok(());
                }
                pos = record.next();
            }
            bucket += 1;
        }
    }

    /// Mean size in bytes of the live records, `None` for an empty table.
    pub fn avg_record_size(&self) -> Result<Option<f64>> {
        let mut count = 0u64;
        let mut total = 0u64;
        self.process_all_records(|record| {
            count += 1;
            total += record.size();
            ControlFlow::Continue(())
        })?;
        Ok((count > 0).then(|| total as f64 / count as f64))
    }

    fn write_header(&self) {
        // a table length only changes under the exclusive directory guard; a
        // split marker may lag behind, which reopening re-splits harmlessly
        let _primary = self.primary.read();
        self.log.write_header(LogHeader {
            size: self.len(),
            table_length: self.table_length(),
            write_pos: 0,
            split_marker: self.split.load(Ordering::Acquire),
        });
    }

    /// Persists the header and flushes both stores.
    pub fn sync(&self) -> Result<()> {
        self.write_header();
        self.primary.flush()?;
        self.log.flush()
    }

    #[cfg(test)]
    pub(crate) fn chain_len(&self, bucket: u64) -> usize {
        let primary = self.primary.read();
        let log = self.log.read();
        read_chain(&log, primary::slot(&primary, bucket))
            .map(|chain| chain.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn bucket_for(&self, key: &[u8]) -> u64 {
        bucket_of(
            hash(key),
            self.table_length(),
            self.split.load(Ordering::Acquire),
        )
    }
}
