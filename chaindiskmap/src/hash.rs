//! MurmurHash64A with a fixed seed.
//!
//! Bucket placement and the rehash split both depend on these values being
//! stable, so the output is part of the on-disk format. Do not change it.

/// Default seed. Only the low 32 bits take part in the hash.
pub const SEED: u64 = 0xe17a_1465;

const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;
const SIGN_MASK: u64 = 0x7fff_ffff_ffff_ffff;

#[inline]
fn mix(mut k: u64) -> u64 {
    k = k.wrapping_mul(M);
    k ^= k >> R;
    k.wrapping_mul(M)
}

#[inline]
fn finalize(mut h: u64) -> u64 {
    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h & SIGN_MASK
}

#[inline]
fn read_word(chunk: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(chunk);
    u64::from_le_bytes(buf)
}

/// Hash a byte key with the default seed. The result never has its top bit set.
pub fn hash(data: &[u8]) -> u64 {
    hash_with_seed(SEED, data)
}

/// Hash a byte key with `seed`, of which only the low 32 bits are used.
pub fn hash_with_seed(seed: u64, data: &[u8]) -> u64 {
    let mut h = (seed & 0xffff_ffff) ^ (data.len() as u64).wrapping_mul(M);

    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        h ^= mix(read_word(chunk));
        h = h.wrapping_mul(M);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate().rev() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    finalize(h)
}

/// Hash a single integer. Equal to `hash(&k.to_le_bytes())`.
pub fn hash_i64(k: i64) -> u64 {
    let mut h = (SEED & 0xffff_ffff) ^ 8u64.wrapping_mul(M);
    h ^= mix(k as u64);
    h = h.wrapping_mul(M);
    finalize(h)
}

/// Hash a sequence of words as if they were their little endian bytes.
pub fn hash_words(words: &[u64]) -> u64 {
    let mut h = (SEED & 0xffff_ffff) ^ ((words.len() as u64) * 8).wrapping_mul(M);
    for &k in words {
        h ^= mix(k);
        h = h.wrapping_mul(M);
    }
    finalize(h)
}

/// Returns the first integer greater than `start` whose hash agrees with the
/// hash of `start` on the low `n_bits` bits.
///
/// Only useful for building bucket collisions in tests.
pub fn find_collision(start: i64, n_bits: u32) -> Option<i64> {
    find_collision_with(start, n_bits, hash_i64)
}

/// Like [`find_collision`], with the hash function supplied by the caller.
pub fn find_collision_with(start: i64, n_bits: u32, hash_fn: impl Fn(i64) -> u64) -> Option<i64> {
    let mask = if n_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << n_bits) - 1
    };
    let target = hash_fn(start) & mask;
    (start.checked_add(1)?..i64::MAX).find(|&i| hash_fn(i) & mask == target)
}
