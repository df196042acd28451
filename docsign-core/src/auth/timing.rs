//! Constant-time comparisons
//!
//! Secret material is never compared with `==`.

use subtle::ConstantTimeEq;

/// Constant-time byte comparison; unequal lengths compare false
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Constant-time hash comparison
pub fn constant_time_hash_compare(hash1: &[u8; 32], hash2: &[u8; 32]) -> bool {
    hash1.ct_eq(hash2).into()
}
