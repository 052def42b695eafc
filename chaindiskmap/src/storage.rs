use std::fs;
use std::io;
use std::path::Path;

use crate::byte_store::MMapFile;

pub const PRIMARY_FILE: &str = "primary.bin";
pub const SECONDARY_FILE: &str = "secondary.bin";

/// Initial size of a new secondary file. It doubles as records are appended.
pub const INITIAL_SECONDARY_LEN: usize = 1 << 16;

/// The pair of memory-mapped files that back a [`DiskMap`](crate::DiskMap).
pub struct MapStorage {
    pub primary: MMapFile,
    pub secondary: MMapFile,
}

impl MapStorage {
    /// Creates fresh `primary.bin` and `secondary.bin` files in `path`,
    /// creating the directory if needed and truncating older files.
    pub fn new_in(path: &Path, primary_len: usize) -> io::Result<Self> {
        fs::create_dir_all(path)?;

        let primary = MMapFile::new(&path.join(PRIMARY_FILE), primary_len)?;
        let secondary = MMapFile::new(&path.join(SECONDARY_FILE), INITIAL_SECONDARY_LEN)?;
        Ok(Self { primary, secondary })
    }

    /// Maps the files of an existing map.
    pub fn load_from(path: &Path) -> io::Result<Self> {
        if !Self::exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no map files in {}", path.display()),
            ));
        }

        let primary = MMapFile::from_file(&path.join(PRIMARY_FILE))?;
        let secondary = MMapFile::from_file(&path.join(SECONDARY_FILE))?;
        Ok(Self { primary, secondary })
    }

    /// Whether `path` holds both map files.
    pub fn exists(path: &Path) -> bool {
        path.join(PRIMARY_FILE).is_file() && path.join(SECONDARY_FILE).is_file()
    }

    /// Removes both map files, then the directory if nothing else is left in it.
    pub fn delete(path: &Path) -> io::Result<()> {
        for name in [PRIMARY_FILE, SECONDARY_FILE] {
            match fs::remove_file(path.join(name)) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        match fs::remove_dir(path) {
            Err(e) if e.kind() != io::ErrorKind::DirectoryNotEmpty => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_store::ByteStore;
    use tempfile::tempdir;

    #[test]
    fn create_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map");
        assert!(!MapStorage::exists(&path));

        {
            let storage = MapStorage::new_in(&path, 1024).unwrap();
            assert_eq!(storage.primary.len(), 1024);
            assert_eq!(storage.secondary.len(), INITIAL_SECONDARY_LEN);
        }
        assert!(MapStorage::exists(&path));

        let storage = MapStorage::load_from(&path).unwrap();
        assert_eq!(storage.primary.len(), 1024);
        assert_eq!(storage.primary.path(), path.join(PRIMARY_FILE).as_path());
    }

    #[test]
    fn loading_a_missing_map_fails() {
        let dir = tempdir().unwrap();
        let err = MapStorage::load_from(dir.path()).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn delete_removes_files_and_empty_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map");
        drop(MapStorage::new_in(&path, 64).unwrap());

        MapStorage::delete(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn delete_keeps_unrelated_files() {
        let dir = tempdir().unwrap();
        drop(MapStorage::new_in(dir.path(), 64).unwrap());
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        MapStorage::delete(dir.path()).unwrap();
        assert!(!MapStorage::exists(dir.path()));
        assert!(dir.path().join("notes.txt").exists());
    }
}
