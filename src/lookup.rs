//! Bob Jenkins' 1996 `lookup2` hash and its table-sizing helpers.
//!
//! `lookup` is bit-for-bit the published algorithm over unsigned bytes:
//! the key is consumed in 12-byte little-endian blocks, the total length
//! is folded into `c` before the tail, and the tail bytes are folded into
//! `a`, `b` and the high bytes of `c`. Bucket indices produced by
//! `HashTable` depend on these exact values.
//!
//! Not suitable for anything adversarial; it is a table-lookup hash.

use core::hash::{BuildHasher, Hasher};

/// Initial internal state of `a` and `b` (the binary golden ratio).
pub const GOLDEN_RATIO: u32 = 0x9e37_79b9;

/// Number of buckets for a table of exponent `n`.
#[inline]
pub const fn hashsize(n: u32) -> u32 {
    1u32 << n
}

/// Mask selecting the low `n` bits of a hash.
#[inline]
pub const fn hashmask(n: u32) -> u32 {
    // `n == 32` would overflow the shift in `hashsize`.
    if n >= 32 {
        u32::MAX
    } else {
        hashsize(n) - 1
    }
}

#[inline(always)]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 13);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 8);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 13);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 16);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 3);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 10);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 15);
}

#[inline(always)]
fn word(bytes: &[u8]) -> u32 {
    u32::from(bytes[0])
        | (u32::from(bytes[1]) << 8)
        | (u32::from(bytes[2]) << 16)
        | (u32::from(bytes[3]) << 24)
}

/// Hash `key` into a 32-bit value, starting from `seed`.
///
/// Every bit of the key affects every bit of the result. To hash several
/// slices as one key, chain them: `h = lookup(part, h)`.
pub fn lookup(key: &[u8], seed: u32) -> u32 {
    let mut a = GOLDEN_RATIO;
    let mut b = GOLDEN_RATIO;
    let mut c = seed;

    let mut blocks = key.chunks_exact(12);
    for block in &mut blocks {
        a = a.wrapping_add(word(&block[0..4]));
        b = b.wrapping_add(word(&block[4..8]));
        c = c.wrapping_add(word(&block[8..12]));
        mix(&mut a, &mut b, &mut c);
    }

    // Only the low 32 bits of the length take part, as in the reference.
    c = c.wrapping_add(key.len() as u32);

    let tail = blocks.remainder();
    for (i, &byte) in tail.iter().enumerate() {
        let byte = u32::from(byte);
        match i {
            0..=3 => a = a.wrapping_add(byte << (8 * i)),
            4..=7 => b = b.wrapping_add(byte << (8 * (i - 4))),
            // The low byte of `c` is reserved for the length.
            _ => c = c.wrapping_add(byte << (8 * (i - 7))),
        }
    }
    mix(&mut a, &mut b, &mut c);

    c
}

/// `Hasher` that chains `lookup` over every written slice.
#[derive(Debug, Clone, Default)]
pub struct LookupHasher {
    state: u32,
}

impl LookupHasher {
    pub fn with_seed(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl Hasher for LookupHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.state = lookup(bytes, self.state);
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// `BuildHasher` for [`LookupHasher`], usable with std collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupBuildHasher {
    seed: u32,
}

impl LookupBuildHasher {
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

impl BuildHasher for LookupBuildHasher {
    type Hasher = LookupHasher;

    fn build_hasher(&self) -> Self::Hasher {
        LookupHasher::with_seed(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Reference values for `lookup(key, 0)` and `lookup(key, 1)`.
    const VECTORS: &[(&[u8], u32, u32)] = &[
        (b"", 0xbd49_d10d, 0x6ddf_b8c9),
        (b"a", 0x29ee_c818, 0x75f1_faad),
        (b"abc", 0x251e_4793, 0x5218_8305),
        (b"key0", 0xac32_f620, 0xcaef_2057),
        (b"hello world", 0x1aa9_19e6, 0xe903_6607),
        (b"0123456789ab", 0x92f3_1ad0, 0x66eb_7a83),
        (b"0123456789abcdefghijklm", 0xa225_3ac2, 0x6b81_2a42),
        (
            b"Four score and seven years ago",
            0x50f2_424b,
            0x89de_ae7e,
        ),
    ];

    #[test]
    fn matches_reference_vectors() {
        for &(key, zero, one) in VECTORS {
            assert_eq!(lookup(key, 0), zero, "seed 0, key {:?}", key);
            assert_eq!(lookup(key, 1), one, "seed 1, key {:?}", key);
        }
    }

    #[test]
    fn embedded_nul_is_significant() {
        assert_eq!(lookup(b"a\0b", 0), 0x05ad_eec1);
        assert_ne!(lookup(b"a\0b", 0), lookup(b"a", 0));
        assert_ne!(lookup(b"a\0", 0), lookup(b"a", 0));
    }

    #[test]
    fn deterministic_and_seed_sensitive() {
        let key = b"some reasonably long key spanning blocks";
        assert_eq!(lookup(key, 7), lookup(key, 7));
        assert_ne!(lookup(key, 7), lookup(key, 8));
    }

    #[test]
    fn every_tail_length_is_distinct() {
        let data = b"abcdefghijklmnopqrstuvwx";
        let mut seen = std::collections::BTreeSet::new();
        for n in 0..=data.len() {
            assert!(seen.insert(lookup(&data[..n], 0)), "collision at len {n}");
        }
    }

    #[test]
    fn high_bytes_are_unsigned() {
        // Bytes >= 0x80 are folded in without sign extension.
        let h = lookup(&[0xff], 0);
        let mut a = GOLDEN_RATIO.wrapping_add(0xff);
        let mut b = GOLDEN_RATIO;
        let mut c = 1u32;
        mix(&mut a, &mut b, &mut c);
        assert_eq!(h, c);
    }

    #[test]
    fn size_and_mask() {
        assert_eq!(hashsize(0), 1);
        assert_eq!(hashsize(9), 512);
        assert_eq!(hashmask(9), 0x1ff);
        assert_eq!(hashmask(31), 0x7fff_ffff);
        assert_eq!(hashmask(32), u32::MAX);
    }

    #[test]
    fn hasher_chains_lookup() {
        let mut h = LookupBuildHasher::default().build_hasher();
        h.write(b"foo");
        h.write(b"bar");
        assert_eq!(h.finish(), u64::from(0x8721_4f8c_u32));
        assert_eq!(h.finish(), u64::from(lookup(b"bar", lookup(b"foo", 0))));
    }

    #[test]
    fn build_hasher_drives_std_map() {
        let mut m: HashMap<String, i32, LookupBuildHasher> =
            HashMap::with_hasher(LookupBuildHasher::with_seed(3));
        m.insert("x".to_string(), 1);
        m.insert("y".to_string(), 2);
        assert_eq!(m.get("x"), Some(&1));
        assert_eq!(m.get("y"), Some(&2));
        assert_eq!(m.get("z"), None);
    }
}
