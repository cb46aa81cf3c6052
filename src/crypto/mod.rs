//! XTEA block cipher and DJB2 string hash used by the cache's folder
//! encryption and archive-manifest label lookup.
//!
//! # XTEA
//! 32 rounds, big-endian, golden-ratio round constant `0x9E3779B9` (treated
//! as a signed 32-bit value, `-1640531527`, matching the reference
//! implementation's integer arithmetic). Operates on successive 8-byte
//! blocks; trailing bytes beyond a multiple of 8 are simply not visited by
//! [`decipher`]/[`encipher`], which only iterate whole blocks.
//!
//! # DJB2
//! `h = c + (h << 5) - h`, folded over the input bytes with wrapping
//! 32-bit arithmetic. Folder name lookups compare the result as `u32`.

use byteorder::{BigEndian, ByteOrder};

pub const ROUNDS: u32 = 32;
pub const GOLDEN_RATIO: i32 = -1640531527; // 0x9E3779B9 as i32

/// A 128-bit XTEA key, as four big-endian 32-bit words.
pub type KeySet = [i32; 4];

pub const ZERO_KEY: KeySet = [0, 0, 0, 0];

/// A key of all zeroes means "this folder is not encrypted" — callers
/// should skip [`decipher`] entirely rather than run it as a no-op.
pub fn key_is_zero(key: &KeySet) -> bool {
    key.iter().all(|&word| word == 0)
}

pub fn decipher(buf: &mut [u8], key: &KeySet) {
    for block in buf.chunks_exact_mut(8) {
        let mut v0 = BigEndian::read_u32(&block[0..4]);
        let mut v1 = BigEndian::read_u32(&block[4..8]);
        let mut sum = GOLDEN_RATIO.wrapping_mul(ROUNDS as i32);

        for _ in 0..ROUNDS {
            v1 = v1.wrapping_sub(
                (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                    ^ (sum.wrapping_add(key[((sum >> 11) & 3) as usize])) as u32,
            );
            sum = sum.wrapping_sub(GOLDEN_RATIO);
            v0 = v0.wrapping_sub(
                (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                    ^ (sum.wrapping_add(key[(sum & 3) as usize])) as u32,
            );
        }

        BigEndian::write_u32(&mut block[0..4], v0);
        BigEndian::write_u32(&mut block[4..8], v1);
    }
}

pub fn encipher(buf: &mut [u8], key: &KeySet) {
    for block in buf.chunks_exact_mut(8) {
        let mut v0 = BigEndian::read_u32(&block[0..4]);
        let mut v1 = BigEndian::read_u32(&block[4..8]);
        let mut sum: i32 = 0;

        for _ in 0..ROUNDS {
            v0 = v0.wrapping_add(
                (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                    ^ (sum.wrapping_add(key[(sum & 3) as usize])) as u32,
            );
            sum = sum.wrapping_add(GOLDEN_RATIO);
            v1 = v1.wrapping_add(
                (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                    ^ (sum.wrapping_add(key[((sum >> 11) & 3) as usize])) as u32,
            );
        }

        BigEndian::write_u32(&mut block[0..4], v0);
        BigEndian::write_u32(&mut block[4..8], v1);
    }
}

/// Folder-name hash used to resolve a name to a `labelHash` in an archive
/// manifest. Iterates bytes, not `char`s — folder names are ASCII in
/// practice and this keeps the hash a pure function of the byte string.
pub fn djb2(value: &str) -> i32 {
    let mut hash: i32 = 0;
    for byte in value.bytes() {
        hash = (byte as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decipher_is_encipher_inverse() {
        let key: KeySet = [0x1111_1111, 0x2222_2222, 0x3333_3333, 0x4444_4444];
        let original = *b"ABCDEFGH";
        let mut buf = original;
        encipher(&mut buf, &key);
        assert_ne!(&buf, &original);
        decipher(&mut buf, &key);
        assert_eq!(&buf, &original);
    }

    #[test]
    fn zero_key_is_detected() {
        assert!(key_is_zero(&ZERO_KEY));
        assert!(!key_is_zero(&[0, 0, 1, 0]));
    }

    #[test]
    fn djb2_distinguishes_similar_strings() {
        assert_ne!(djb2("hello_world"), djb2("hello world"));
    }

    #[test]
    fn djb2_empty_string_is_zero() {
        assert_eq!(djb2(""), 0);
    }

    #[test]
    fn multi_block_roundtrip() {
        let key: KeySet = [7, 8, 9, 10];
        let original = *b"0123456789ABCDEF";
        let mut buf = original;
        encipher(&mut buf, &key);
        decipher(&mut buf, &key);
        assert_eq!(&buf, &original);
    }

    #[test]
    fn known_vector_roundtrips() {
        let key: KeySet = [1, 2, 3, 4];
        let original: [u8; 32] = [
            49, 47, 44, 31, 39, 45, 88, 28, 58, 28, 19, 48, 69, 99, 121, 27, 21, 33, 99, 98, 97, 94, 91, 12, 1, 56,
            45, 88, 91, 57, 77, 71,
        ];
        let mut buf = original;
        encipher(&mut buf, &key);
        decipher(&mut buf, &key);
        assert_eq!(buf, original);
    }

    #[test]
    fn known_vector_deciphers_to_ones_and_twenty_threes() {
        let key: KeySet = [1, 2, 3, 4];
        let block: [u8; 8] = [210, 206, 60, 145, 145, 183, 102, 21];
        let mut buf = [0u8; 32];
        for chunk in buf.chunks_exact_mut(8) {
            chunk.copy_from_slice(&block);
        }

        decipher(&mut buf, &key);

        assert!(buf.iter().all(|&b| b == 1 || b == 23));
    }
}
