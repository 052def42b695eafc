//! The primary directory: one 8 byte slot per bucket, each holding the log
//! offset of the bucket's chain head or `0` for an empty bucket.
use crate::error::{Error, Result};
use crate::region::RawView;

pub const SLOT_WIDTH: u64 = 8;

/// Bytes needed for `table_length` slots.
pub fn directory_len(table_length: u64) -> Result<usize> {
    table_length
        .checked_mul(SLOT_WIDTH)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(|| {
            Error::CapacityExceeded(format!("a table of {table_length} slots is not addressable"))
        })
}

pub fn slot(view: &RawView, bucket: u64) -> u64 {
    view.read_u64(bucket * SLOT_WIDTH)
}

pub fn set_slot(view: &RawView, bucket: u64, pos: u64) {
    view.write_u64(bucket * SLOT_WIDTH, pos)
}

/// Empties the slots `[from, to)`.
pub fn clear_slots(view: &RawView, from: u64, to: u64) {
    view.fill_zero(from * SLOT_WIDTH, (to - from) * SLOT_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_store::VecStore;
    use crate::region::Region;

    #[test]
    fn slots_are_words() {
        let region = Region::new(VecStore::with_len(directory_len(4).unwrap()));
        let view = region.read();
        set_slot(&view, 2, 1234);
        assert_eq!(slot(&view, 2), 1234);
        assert_eq!(view.read_u64(16), 1234);
        assert_eq!(slot(&view, 3), 0);

        clear_slots(&view, 1, 4);
        assert_eq!(slot(&view, 2), 0);
    }

    #[test]
    fn directory_len_overflow() {
        assert_eq!(directory_len(1 << 10).unwrap(), 8 << 10);
        assert!(matches!(
            directory_len(u64::MAX / 4),
            Err(Error::CapacityExceeded(_))
        ));
    }
}
