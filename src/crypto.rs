//! Cryptographic primitives for SRP update verification.
//!
//! Two things live here:
//!   1. A streaming SHA-256 hasher — SIG(0) digests are computed over
//!      several discontiguous message ranges.
//!   2. ECDSA P-256 signature verification over a finished digest.
//!
//! SRP clients sign with ECDSA P-256/SHA-256 (DNSSEC algorithm 13); no other
//! algorithm is accepted.

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};

use crate::error::Error;

/// DNSSEC algorithm number for ECDSA P-256 with SHA-256.
pub const ALGORITHM_ECDSA_P256_SHA256: u8 = 13;

/// Size of an uncompressed P-256 public key as carried in a KEY RR (x || y).
pub const ECDSA_P256_KEY_SIZE: usize = 64;

/// Size of a P-256 signature as carried in a SIG RR (r || s).
pub const ECDSA_P256_SIGNATURE_SIZE: usize = 64;

/// Incremental SHA-256 hasher.
pub struct Sha256(sha2::Sha256);

impl Sha256 {
    pub fn new() -> Self {
        use sha2::Digest;
        Self(sha2::Sha256::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.0.update(data);
    }

    pub fn finish(self) -> [u8; 32] {
        use sha2::Digest;
        self.0.finalize().into()
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify an ECDSA P-256 signature over a SHA-256 digest.
///
/// `public_key` is the raw 64-byte key from a KEY RR; `signature` is the raw
/// 64-byte fixed-width signature from a SIG RR. Any malformed input or
/// verification failure is [`Error::Security`].
pub fn verify_ecdsa_p256(
    public_key: &[u8; ECDSA_P256_KEY_SIZE],
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<(), Error> {
    // KEY RRs carry the bare x || y coordinates; SEC1 wants an 0x04 tag.
    let mut sec1 = [0u8; ECDSA_P256_KEY_SIZE + 1];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(public_key);

    let key = VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| Error::Security)?;
    let signature = Signature::from_slice(signature).map_err(|_| Error::Security)?;

    key.verify_prehash(digest, &signature).map_err(|_| Error::Security)
}
