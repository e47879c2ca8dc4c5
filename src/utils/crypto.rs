//! Crypto Utilities
//!
//! Hash and randomness helpers shared by the bridge, the typed-data digests
//! and the program codecs.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hash (original Keccak padding, as used by typed-data digests)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// SHA256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Fill a fixed-size array from the operating system RNG
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Random 128-bit identifier rendered as lowercase hex
pub fn random_id() -> String {
    hex::encode(random_bytes::<16>())
}
