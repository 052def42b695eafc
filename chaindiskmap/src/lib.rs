//! A persistent, concurrent hash map backed by memory-mapped files.
//!
//! Keys hash into a primary directory of 8 byte slots, each pointing at a
//! chain of records in an append only secondary log. The table doubles
//! incrementally: buckets are split one at a time on a single extra hash bit,
//! so readers and writers keep running during a rehash.
pub mod byte_store;
mod config;
mod disk_map;
mod engine;
mod error;
pub mod hash;
mod primary;
pub mod record;
pub mod region;
mod secondary;
pub mod slot;
mod storage;
mod stripes;
pub mod types;

pub use byte_store::{ByteStore, MMapFile, VecStore};
pub use config::{Config, DEFAULT_LOAD_FACTOR, DEFAULT_TABLE_LENGTH};
pub use disk_map::{DiskMap, StringStringMap, StringU64Map, TypedDiskMap, U64StringMap};
pub use error::{Error, Result};
pub use record::Record;
pub use secondary::LogHeader;
pub use storage::{MapStorage, PRIMARY_FILE, SECONDARY_FILE};
pub use types::{Bytes, BytesDecode, BytesEncode, Native, Str};
