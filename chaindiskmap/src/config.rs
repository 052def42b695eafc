use std::path::Path;

use crate::byte_store::{MMapFile, VecStore};
use crate::disk_map::DiskMap;
use crate::error::Result;
use crate::stripes::DEFAULT_STRIPES;

pub const DEFAULT_TABLE_LENGTH: u64 = 1 << 28;
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;

const MAX_TABLE_LENGTH: u64 = 1 << 62;

/// Options for opening a [`DiskMap`].
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub(crate) table_length: u64,
    pub(crate) load_factor: f64,
    pub(crate) stripes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_length: DEFAULT_TABLE_LENGTH,
            load_factor: DEFAULT_LOAD_FACTOR,
            stripes: DEFAULT_STRIPES,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of primary slots a new map starts with, rounded up to a power
    /// of two and at least 2. Ignored when opening an existing map.
    #[must_use]
    pub fn table_length(mut self, slots: u64) -> Self {
        self.table_length = slots
            .max(2)
            .checked_next_power_of_two()
            .unwrap_or(MAX_TABLE_LENGTH)
            .min(MAX_TABLE_LENGTH);
        self
    }

    /// Entries per slot above which the table doubles. Values that are not
    /// finite and positive are ignored.
    #[must_use]
    pub fn load_factor(mut self, load_factor: f64) -> Self {
        if load_factor.is_finite() && load_factor > 0.0 {
            self.load_factor = load_factor;
        }
        self
    }

    /// Upper bound on the number of bucket locks.
    #[must_use]
    pub fn stripes(mut self, stripes: usize) -> Self {
        self.stripes = stripes.max(1);
        self
    }

    /// Opens the map stored in `path`, creating it if the directory holds none.
    pub fn open(&self, path: &Path) -> Result<DiskMap<MMapFile>> {
        DiskMap::open(path, self)
    }

    pub fn open_in_memory(&self) -> Result<DiskMap<VecStore>> {
        DiskMap::in_memory(self)
    }

    /// Threshold on the live count for a table of `table_length` slots.
    pub(crate) fn rehash_threshold(&self, table_length: u64) -> f64 {
        table_length as f64 * self.load_factor
    }
}
