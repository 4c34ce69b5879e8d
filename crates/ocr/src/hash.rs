use sha2::{Digest, Sha256};

/// SHA-256 of the uploaded photo bytes. Identical uploads hash identically,
/// so the digest doubles as a stable image reference in the audit trail.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex rendering of a digest (64 chars), the form recorded in
/// audit rows.
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
