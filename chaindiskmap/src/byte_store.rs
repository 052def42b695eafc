use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU8;

use memmap2::MmapRaw;

/// Smallest length a store doubles to.
const MIN_GROW_LEN: usize = 64;

/// A growable block of bytes addressed by offset.
///
/// Stores hand out their base pointer so callers can read and write disjoint
/// ranges from several threads through a shared reference. Growth takes
/// `&mut self`, so it can never overlap with those accesses.
pub trait ByteStore: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Base pointer of the store. Valid for `len()` bytes until the next `grow`.
    fn as_mut_ptr(&self) -> *mut u8;

    /// Grows the store to at least `min_len` bytes, at least doubling it.
    /// New bytes are zeroed.
    fn grow(&mut self, min_len: usize) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;

    /// Number of times this store has grown.
    fn stats(&self) -> u64;
}

/// A request of at least twice the current length is met exactly, so callers
/// that double by themselves get the length they asked for.
pub(crate) fn grown_len(current: usize, min_len: usize) -> usize {
    let doubled = current.saturating_mul(2);
    if min_len >= doubled {
        min_len
    } else {
        doubled.max(MIN_GROW_LEN)
    }
}

/// In-memory store.
#[derive(Default)]
pub struct VecStore {
    // AtomicU8 has the layout of u8 and permits writes through a shared reference
    buf: Vec<AtomicU8>,
    resizes: u64,
}

impl VecStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_len(len: usize) -> Self {
        let mut buf = Vec::with_capacity(len);
        buf.resize_with(len, || AtomicU8::new(0));
        Self { buf, resizes: 0 }
    }
}

impl ByteStore for VecStore {
    fn len(&self) -> usize {
        self.buf.len()
    }

    fn as_mut_ptr(&self) -> *mut u8 {
        self.buf.as_ptr() as *mut u8
    }

    fn grow(&mut self, min_len: usize) -> io::Result<()> {
        let new_len = grown_len(self.buf.len(), min_len);
        self.buf.resize_with(new_len, || AtomicU8::new(0));
        self.resizes += 1;
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn stats(&self) -> u64 {
        self.resizes
    }
}

/// A file mapped into memory. Growing extends the file and remaps it.
pub struct MMapFile {
    mmap: MmapRaw,
    file: File,
    path: PathBuf,
    resizes: u64,
}

impl MMapFile {
    /// Creates (or truncates) the file at `path` with `len` zeroed bytes and maps it.
    pub fn new(path: &Path, len: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len.max(1) as u64)?;
        let mmap = MmapRaw::map_raw(&file)?;
        Ok(Self {
            mmap,
            file,
            path: path.to_path_buf(),
            resizes: 0,
        })
    }

    /// Maps an existing file without changing its contents.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is empty", path.display()),
            ));
        }
        let mmap = MmapRaw::map_raw(&file)?;
        Ok(Self {
            mmap,
            file,
            path: path.to_path_buf(),
            resizes: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for MMapFile {
    fn len(&self) -> usize {
        self.mmap.len()
    }

    fn as_mut_ptr(&self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    fn grow(&mut self, min_len: usize) -> io::Result<()> {
        let new_len = grown_len(self.mmap.len(), min_len);
        log::trace!(
            "growing {} from {} to {new_len} bytes",
            self.path.display(),
            self.mmap.len()
        );

        self.mmap.flush()?;
        self.file.set_len(new_len as u64)?;
        self.mmap = MmapRaw::map_raw(&self.file)?;
        self.resizes += 1;
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        self.mmap.flush()
    }

    fn stats(&self) -> u64 {
        self.resizes
    }
}

/// In-memory store that fails to grow past `capacity`, like a full disk.
#[cfg(test)]
pub(crate) struct CappedStore {
    inner: VecStore,
    capacity: usize,
}

#[cfg(test)]
impl CappedStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: VecStore::new(),
            capacity,
        }
    }
}

#[cfg(test)]
impl ByteStore for CappedStore {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.as_mut_ptr()
    }

    fn grow(&mut self, min_len: usize) -> io::Result<()> {
        if grown_len(self.inner.len(), min_len) > self.capacity {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.inner.grow(min_len)
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }

    fn stats(&self) -> u64 {
        self.inner.stats()
    }
}
