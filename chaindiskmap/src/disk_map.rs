use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::byte_store::{ByteStore, MMapFile, VecStore};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::primary::directory_len;
use crate::record::Record;
use crate::storage::MapStorage;
use crate::types::{BytesDecode, BytesEncode, Native, Str};

// Type aliases for common use cases
pub type U64StringMap<BS = MMapFile> = TypedDiskMap<Native<u64>, Str, BS>;
pub type StringU64Map<BS = MMapFile> = TypedDiskMap<Str, Native<u64>, BS>;
pub type StringStringMap<BS = MMapFile> = TypedDiskMap<Str, Str, BS>;

/// A persistent hash map from byte keys to byte values.
///
/// Entries live in two memory-mapped files: a directory with one slot per
/// bucket and an append only log of records chained per bucket. All
/// operations take `&self`; share the map between threads with an `Arc`.
/// Operations on different buckets run in parallel and the table doubles
/// incrementally once its load passes the configured factor.
///
/// Dropping the map persists its header. Use [`close`](Self::close) to see
/// whether that succeeded.
pub struct DiskMap<BS: ByteStore = MMapFile> {
    engine: Engine<BS>,
    path: Option<PathBuf>,
    closed: bool,
}

impl DiskMap<MMapFile> {
    /// Creates an empty map in `path`, replacing any map already there.
    pub fn new_in(path: &Path, config: &Config) -> Result<Self> {
        let storage = MapStorage::new_in(path, directory_len(config.table_length)?)?;
        let engine = Engine::create(storage.primary, storage.secondary, config)?;
        log::debug!("created map in {}", path.display());
        Ok(Self::with_engine(engine, Some(path)))
    }

    /// Opens the map stored in `path`. The table length of `config` is ignored.
    pub fn load_from(path: &Path, config: &Config) -> Result<Self> {
        let storage = MapStorage::load_from(path)?;
        let engine = Engine::open(storage.primary, storage.secondary, config)?;
        log::debug!("loaded map of {} entries from {}", engine.len(), path.display());
        Ok(Self::with_engine(engine, Some(path)))
    }

    /// Loads the map in `path` if there is one, otherwise creates it.
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        if MapStorage::exists(path) {
            Self::load_from(path, config)
        } else {
            Self::new_in(path, config)
        }
    }
}

impl DiskMap<VecStore> {
    pub fn in_memory(config: &Config) -> Result<Self> {
        Self::with_stores(VecStore::new(), VecStore::new(), config)
    }
}

impl<BS: ByteStore> DiskMap<BS> {
    /// Creates an empty map over two stores of any kind.
    pub fn with_stores(primary: BS, secondary: BS, config: &Config) -> Result<Self> {
        let engine = Engine::create(primary, secondary, config)?;
        Ok(Self::with_engine(engine, None))
    }

    /// Opens a map previously written to the two stores.
    pub fn from_stores(primary: BS, secondary: BS, config: &Config) -> Result<Self> {
        let engine = Engine::open(primary, secondary, config)?;
        Ok(Self::with_engine(engine, None))
    }

    fn with_engine(engine: Engine<BS>, path: Option<&Path>) -> Self {
        Self {
            engine,
            path: path.map(Path::to_path_buf),
            closed: false,
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.get(key)
    }

    /// Looks up `key` and passes the stored value to `f` without copying it.
    /// `f` runs under the bucket lock and must not use the map.
    pub fn get_with<R>(&self, key: &[u8], f: impl FnOnce(&[u8]) -> R) -> Result<Option<R>> {
        self.engine.get_with(key, f)
    }

    /// Inserts or replaces `key` and returns the previous value.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.put(key, value)
    }

    /// Inserts `key` unless it is present, in which case the present value is
    /// returned and the map is unchanged.
    pub fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.put_if_absent(key, value)
    }

    pub fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.remove(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.engine.get_with(key, |_| ())?.is_some())
    }

    /// Returns the number of key-value pairs in the map
    pub fn len(&self) -> usize {
        self.engine.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    /// Number of buckets in the directory.
    pub fn table_length(&self) -> u64 {
        self.engine.table_length()
    }

    /// Entries per bucket.
    pub fn load(&self) -> f64 {
        self.engine.load()
    }

    /// How many times the directory and the log have grown since they were opened.
    pub fn stats(&self) -> (u64, u64) {
        self.engine.stats()
    }

    /// Doubles the table now instead of waiting for the load factor.
    pub fn rehash(&self) -> Result<()> {
        self.engine.rehash()
    }

    /// Visits every live record, one bucket at a time, until `visitor` breaks.
    ///
    /// Each bucket is a consistent snapshot, the whole scan is not: a rehash
    /// running alongside may make a record show up twice or not at all.
    /// `visitor` runs under a bucket lock and must not use the map.
    pub fn process_all_records<F>(&self, visitor: F) -> Result<()>
    where
        F: FnMut(&Record<'_>) -> ControlFlow<()>,
    {
        self.engine.process_all_records(visitor)
    }

    pub fn avg_record_size(&self) -> Result<Option<f64>> {
        self.engine.avg_record_size()
    }

    /// Persists the header and flushes both files.
    pub fn sync(&self) -> Result<()> {
        self.engine.sync()
    }

    /// Syncs and closes the map.
    pub fn close(mut self) -> Result<()> {
        let synced = self.engine.sync();
        self.closed = true;
        synced
    }

    /// Closes the map and removes its files.
    pub fn delete(mut self) -> Result<()> {
        self.closed = true;
        let path = self.path.take();
        // unmap before removing
        drop(self);
        if let Some(path) = path {
            MapStorage::delete(&path)?;
            log::debug!("deleted map in {}", path.display());
        }
        Ok(())
    }
}

impl<BS: ByteStore> Drop for DiskMap<BS> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.engine.sync() {
            log::warn!("failed to sync map on drop: {e}");
        }
    }
}

fn encode<'a, E: BytesEncode<'a>>(item: &'a E::EItem) -> Result<Cow<'a, [u8]>> {
    E::bytes_encode(item).map_err(|e| Error::Encoding(e.to_string()))
}

fn decode<D: BytesDecode>(bytes: &[u8]) -> Result<D::DItem> {
    D::bytes_decode(bytes).map_err(|e| Error::Decoding(e.to_string()))
}

/// A [`DiskMap`] whose keys and values go through `BytesEncode`/`BytesDecode`.
pub struct TypedDiskMap<K, V, BS: ByteStore = MMapFile> {
    map: DiskMap<BS>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> TypedDiskMap<K, V, MMapFile> {
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        DiskMap::open(path, config).map(Self::new)
    }
}

impl<K, V> TypedDiskMap<K, V, VecStore> {
    pub fn in_memory(config: &Config) -> Result<Self> {
        DiskMap::in_memory(config).map(Self::new)
    }
}

impl<K, V, BS: ByteStore> TypedDiskMap<K, V, BS> {
    pub fn new(map: DiskMap<BS>) -> Self {
        Self {
            map,
            _marker: PhantomData,
        }
    }

    pub fn raw(&self) -> &DiskMap<BS> {
        &self.map
    }

    pub fn into_raw(self) -> DiskMap<BS> {
        self.map
    }

    pub fn get<'a>(&self, key: &'a K::EItem) -> Result<Option<V::DItem>>
    where
        K: BytesEncode<'a>,
        V: BytesDecode,
    {
        let key = encode::<K>(key)?;
        self.map.get_with(&key, decode::<V>)?.transpose()
    }

    pub fn put<'a, 'b>(&self, key: &'a K::EItem, value: &'b V::EItem) -> Result<Option<V::DItem>>
    where
        K: BytesEncode<'a>,
        V: BytesEncode<'b> + BytesDecode,
    {
        let key = encode::<K>(key)?;
        let value = encode::<V>(value)?;
        self.map
            .put(&key, &value)?
            .map(|old| decode::<V>(&old))
            .transpose()
    }

    pub fn put_if_absent<'a, 'b>(
        &self,
        key: &'a K::EItem,
        value: &'b V::EItem,
    ) -> Result<Option<V::DItem>>
    where
        K: BytesEncode<'a>,
        V: BytesEncode<'b> + BytesDecode,
    {
        let key = encode::<K>(key)?;
        let value = encode::<V>(value)?;
        self.map
            .put_if_absent(&key, &value)?
            .map(|existing| decode::<V>(&existing))
            .transpose()
    }

    pub fn remove<'a>(&self, key: &'a K::EItem) -> Result<Option<V::DItem>>
    where
        K: BytesEncode<'a>,
        V: BytesDecode,
    {
        let key = encode::<K>(key)?;
        self.map
            .remove(&key)?
            .map(|old| decode::<V>(&old))
            .transpose()
    }

    pub fn contains_key<'a>(&self, key: &'a K::EItem) -> Result<bool>
    where
        K: BytesEncode<'a>,
    {
        let key = encode::<K>(key)?;
        self.map.contains_key(&key)
    }

    /// Decodes every entry. Stops at the first entry that fails to decode.
    pub fn entries(&self) -> Result<Vec<(K::DItem, V::DItem)>>
    where
        K: BytesDecode,
        V: BytesDecode,
    {
        let mut entries = Vec::new();
        let mut failure = None;
        self.map.process_all_records(|record| {
            match (decode::<K>(record.key()), decode::<V>(record.value())) {
                (Ok(k), Ok(v)) => {
                    entries.push((k, v));
                    ControlFlow::Continue(())
                }
                (Err(e), _) | (_, Err(e)) => {
                    failure = Some(e);
                    ControlFlow::Break(())
                }
            }
        })?;
        failure.map_or(Ok(entries), Err)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn sync(&self) -> Result<()> {
        self.map.sync()
    }

    pub fn close(self) -> Result<()> {
        self.map.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bytes;
    use proptest::prelude::*;
    use rustc_hash::FxHashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn test_config() -> Config {
        Config::new().table_length(64)
    }

    #[test]
    fn test_insert_and_get() {
        let map = DiskMap::in_memory(&test_config()).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.get(b"key").unwrap(), None);

        assert_eq!(map.put(b"key", b"value").unwrap(), None);
        assert_eq!(map.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert!(map.contains_key(b"key").unwrap());
        assert!(!map.contains_key(b"nope").unwrap());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_returns_previous_value() {
        let map = DiskMap::in_memory(&test_config()).unwrap();
        assert_eq!(map.put(b"k", b"1").unwrap(), None);
        assert_eq!(map.put(b"k", b"2").unwrap(), Some(b"1".to_vec()));
        assert_eq!(map.put(b"k", b"").unwrap(), Some(b"2".to_vec()));
        assert_eq!(map.get(b"k").unwrap(), Some(vec![]));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_put_if_absent() {
        let map = DiskMap::in_memory(&test_config()).unwrap();
        assert_eq!(map.put_if_absent(b"k", b"v1").unwrap(), None);
        assert_eq!(map.put_if_absent(b"k", b"v2").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(map.get(b"k").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn test_remove() {
        let map = DiskMap::in_memory(&test_config()).unwrap();
        map.put(b"a", b"1").unwrap();
        map.put(b"b", b"2").unwrap();

        assert_eq!(map.remove(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(map.get(b"a").unwrap(), None);
        assert_eq!(map.remove(b"a").unwrap(), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_growth_keeps_entries() {
        let map = DiskMap::in_memory(&Config::new().table_length(2)).unwrap();
        for i in 0..1000u32 {
            map.put(&i.to_le_bytes(), format!("v{i}").as_bytes()).unwrap();
        }
        assert_eq!(map.len(), 1000);
        assert!(map.table_length() >= 2048);
        assert!(map.load() <= 0.75);
        for i in 0..1000u32 {
            assert_eq!(
                map.get(&i.to_le_bytes()).unwrap(),
                Some(format!("v{i}").into_bytes())
            );
        }
    }

    #[test]
    fn test_explicit_rehash() {
        let map = DiskMap::in_memory(&test_config()).unwrap();
        map.put(b"x", b"y").unwrap();
        map.rehash().unwrap();
        map.rehash().unwrap();
        assert_eq!(map.table_length(), 256);
        assert_eq!(map.get(b"x").unwrap(), Some(b"y".to_vec()));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(Vec<u8>, Vec<u8>),
        PutIfAbsent(Vec<u8>, Vec<u8>),
        Remove(Vec<u8>),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        // a small key space so operations hit existing keys
        let key = proptest::collection::vec(0u8..8, 0..3);
        let value = proptest::collection::vec(any::<u8>(), 0..16);
        prop_oneof![
            (key.clone(), value.clone()).prop_map(|(k, v)| Op::Put(k, v)),
            (key.clone(), value).prop_map(|(k, v)| Op::PutIfAbsent(k, v)),
            key.prop_map(Op::Remove),
        ]
    }

    fn check_ops(ops: Vec<Op>) {
        let map = DiskMap::in_memory(&Config::new().table_length(4)).unwrap();
        let mut model: FxHashMap<Vec<u8>, Vec<u8>> = FxHashMap::default();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    assert_eq!(map.put(&k, &v).unwrap(), model.insert(k, v));
                }
                Op::PutIfAbsent(k, v) => {
                    let expected = model.get(&k).cloned();
                    if expected.is_none() {
                        model.insert(k.clone(), v.clone());
                    }
                    assert_eq!(map.put_if_absent(&k, &v).unwrap(), expected);
                }
                Op::Remove(k) => {
                    assert_eq!(map.remove(&k).unwrap(), model.remove(&k));
                }
            }
            assert_eq!(map.len(), model.len());
        }

        for (k, v) in &model {
            assert_eq!(map.get(k).unwrap().as_ref(), Some(v), "key: {k:?}");
        }
        let mut scanned = FxHashMap::default();
        map.process_all_records(|record| {
            scanned.insert(record.key().to_vec(), record.value().to_vec());
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(scanned, model);
    }

    #[test]
    fn it_s_a_hash_map() {
        proptest!(|(ops in proptest::collection::vec(op_strategy(), 1..300))| {
            check_ops(ops);
        });
    }

    #[test]
    fn it_s_a_hash_map_1() {
        check_ops(vec![
            Op::Put(vec![1], vec![10]),
            Op::Put(vec![], vec![]),
            Op::PutIfAbsent(vec![1], vec![11]),
            Op::Remove(vec![2]),
            Op::Put(vec![2, 3], vec![1, 2, 3]),
            Op::Remove(vec![1]),
            Op::PutIfAbsent(vec![1], vec![12]),
            Op::Remove(vec![]),
        ]);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path();
        let config = test_config();

        // 1. Create a new map and add some data
        {
            let map = DiskMap::new_in(path, &config).unwrap();
            map.put(b"key1", b"value1").unwrap();
            map.put(b"key2", b"value2").unwrap();
            assert_eq!(map.len(), 2);
        } // dropped, the header is persisted

        // 2. Load the map from disk
        {
            let map = DiskMap::load_from(path, &config).unwrap();
            assert_eq!(map.len(), 2);
            assert_eq!(map.get(b"key1").unwrap(), Some(b"value1".to_vec()));
            assert_eq!(map.get(b"key2").unwrap(), Some(b"value2".to_vec()));
            assert_eq!(map.get(b"key3").unwrap(), None);
        }

        // 3. Load again, add and remove
        {
            let map = DiskMap::open(path, &config).unwrap();
            map.put(b"key3", b"value3").unwrap();
            map.remove(b"key1").unwrap();
            assert_eq!(map.len(), 2);
            map.close().unwrap();
        }

        // 4. Load one more time to check the changes are there
        {
            let map = DiskMap::load_from(path, &config).unwrap();
            assert_eq!(map.len(), 2);
            assert_eq!(map.get(b"key1").unwrap(), None);
            assert_eq!(map.get(b"key2").unwrap(), Some(b"value2".to_vec()));
            assert_eq!(map.get(b"key3").unwrap(), Some(b"value3".to_vec()));
        }
    }

    #[test]
    fn test_persistence_across_rehash() {
        let dir = tempdir().unwrap();
        let config = Config::new().table_length(4);

        {
            let map = config.open(dir.path()).unwrap();
            for i in 0..500u64 {
                map.put(&i.to_le_bytes(), &(i * i).to_le_bytes()).unwrap();
            }
            assert!(map.table_length() > 4);
        }

        // the creation table length does not apply to an existing map
        let map = Config::new().table_length(1 << 20).open(dir.path()).unwrap();
        assert!(map.table_length() < 1 << 20);
        assert_eq!(map.len(), 500);
        for i in 0..500u64 {
            assert_eq!(
                map.get(&i.to_le_bytes()).unwrap(),
                Some((i * i).to_le_bytes().to_vec())
            );
        }
    }

    #[test]
    fn test_primary_file_tracks_table_length() {
        use crate::storage::{PRIMARY_FILE, SECONDARY_FILE};
        use std::io::{Seek, SeekFrom, Write};

        let dir = tempdir().unwrap();
        let primary_len = || std::fs::metadata(dir.path().join(PRIMARY_FILE)).unwrap().len();
        {
            let map = DiskMap::new_in(dir.path(), &Config::new().table_length(2)).unwrap();
            assert_eq!(primary_len(), 16);
            map.put(b"one", b"1").unwrap();
            map.put(b"two", b"2").unwrap();
            map.rehash().unwrap();
            assert_eq!(map.table_length(), 4);
            assert_eq!(primary_len(), 8 * map.table_length());
            map.close().unwrap();
        }

        // an unknown table length is read back from the directory size
        let mut secondary = std::fs::OpenOptions::new()
            .write(true)
            .open(dir.path().join(SECONDARY_FILE))
            .unwrap();
        secondary.seek(SeekFrom::Start(8)).unwrap();
        secondary.write_all(&0u64.to_le_bytes()).unwrap();
        drop(secondary);

        let map = DiskMap::load_from(dir.path(), &Config::new()).unwrap();
        assert_eq!(map.table_length(), 4);
        assert_eq!(map.get(b"one").unwrap(), Some(b"1".to_vec()));
        assert_eq!(map.get(b"two").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_new_in_replaces_existing_map() {
        let dir = tempdir().unwrap();
        let config = test_config();
        {
            let map = DiskMap::new_in(dir.path(), &config).unwrap();
            map.put(b"old", b"data").unwrap();
        }
        let map = DiskMap::new_in(dir.path(), &config).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.get(b"old").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map");
        let map = DiskMap::new_in(&path, &test_config()).unwrap();
        map.put(b"k", b"v").unwrap();
        map.delete().unwrap();
        assert!(!path.exists());

        // deleting an in-memory map only closes it
        DiskMap::in_memory(&test_config()).unwrap().delete().unwrap();
    }

    #[test]
    fn test_from_stores() {
        let map = DiskMap::with_stores(VecStore::new(), VecStore::new(), &test_config()).unwrap();
        map.put(b"k", b"v").unwrap();
        map.sync().unwrap();
        let engine = &map.engine;
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_avg_record_size() {
        let map = DiskMap::in_memory(&test_config()).unwrap();
        assert_eq!(map.avg_record_size().unwrap(), None);
        map.put(b"1234", b"5678").unwrap();
        assert_eq!(map.avg_record_size().unwrap(), Some(32.0));
    }

    #[test]
    fn test_concurrent_file_map() {
        let dir = tempdir().unwrap();
        let map = Arc::new(DiskMap::new_in(dir.path(), &Config::new().table_length(32)).unwrap());

        let handles: Vec<_> = (0..10u32)
            .map(|t| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || {
                    for i in 0..100u32 {
                        let key = format!("thread-{t}-key-{i}");
                        map.put(key.as_bytes(), &(t * 1000 + i).to_le_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len(), 1000);
        for t in 0..10u32 {
            for i in 0..100u32 {
                let key = format!("thread-{t}-key-{i}");
                assert_eq!(
                    map.get(key.as_bytes()).unwrap(),
                    Some((t * 1000 + i).to_le_bytes().to_vec())
                );
            }
        }
    }

    #[test]
    fn test_typed_maps() {
        let numbers: U64StringMap<VecStore> = TypedDiskMap::in_memory(&test_config()).unwrap();
        assert_eq!(numbers.put(&1, "one").unwrap(), None);
        assert_eq!(numbers.put(&1, "uno").unwrap(), Some("one".to_string()));
        assert_eq!(numbers.put_if_absent(&2, "two").unwrap(), None);
        assert_eq!(numbers.get(&1).unwrap(), Some("uno".to_string()));
        assert!(numbers.contains_key(&2).unwrap());
        assert_eq!(numbers.remove(&2).unwrap(), Some("two".to_string()));
        assert_eq!(numbers.len(), 1);

        let counts: StringU64Map<VecStore> = TypedDiskMap::in_memory(&test_config()).unwrap();
        counts.put("apples", &3).unwrap();
        counts.put("pears", &5).unwrap();
        let mut entries = counts.entries().unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![("apples".to_string(), 3), ("pears".to_string(), 5)]
        );

        let names: StringStringMap<VecStore> = TypedDiskMap::in_memory(&test_config()).unwrap();
        names.put("k", "").unwrap();
        assert_eq!(names.get("k").unwrap(), Some(String::new()));
        assert_eq!(names.get("missing").unwrap(), None);
    }

    #[test]
    fn test_typed_decoding_errors() {
        let raw = DiskMap::in_memory(&test_config()).unwrap();
        raw.put(b"short", b"abc").unwrap();
        let typed: TypedDiskMap<Bytes, Native<u64>, VecStore> = TypedDiskMap::new(raw);

        assert!(matches!(typed.get(b"short".as_slice()), Err(Error::Decoding(_))));
        assert!(matches!(typed.entries(), Err(Error::Decoding(_))));
        assert!(typed.raw().contains_key(b"short").unwrap());
    }

    #[test]
    fn test_typed_persistence() {
        let dir = tempdir().unwrap();
        let config = test_config();
        {
            let map: StringStringMap = TypedDiskMap::open(dir.path(), &config).unwrap();
            map.put("hello", "world").unwrap();
            map.close().unwrap();
        }
        let map: StringStringMap = TypedDiskMap::open(dir.path(), &config).unwrap();
        assert_eq!(map.get("hello").unwrap(), Some("world".to_string()));
        assert_eq!(map.into_raw().len(), 1);
    }
}
