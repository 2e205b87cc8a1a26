use sha2::{Digest, Sha256};

/// Function to hash a password for at-rest storage
///
/// SHA-256 over the UTF-8 bytes, hex-encoded. Unsalted, so equal passwords
/// produce equal digests; stored records depend on this staying deterministic.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Function to check a candidate password against a stored digest
pub fn verify_password(candidate: &str, password_hash: &str) -> bool {
    hash_password(candidate) == password_hash
}
