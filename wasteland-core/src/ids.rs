//! ID generation (§3, §6, §8): `w-<10 hex>`, `c-<16 hex>`, `s-<16 hex>`,
//! derived from a SHA-256 digest over semantic input + wall-clock time +
//! random bytes. Uses `uuid::Uuid::new_v4` as the random-byte source rather
//! than pulling in `rand` directly — `uuid` is already part of the inherited
//! dependency stack and a v4 UUID's 16 bytes are uniformly random.

use sha2::{Digest, Sha256};

fn digest_hex(seed: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    hex[..len.min(hex.len())].to_string()
}

pub fn generate_wanted_id(title: &str) -> String {
    format!("w-{}", digest_hex(title, 10))
}

pub fn generate_completion_id(wanted_id: &str) -> String {
    format!("c-{}", digest_hex(wanted_id, 16))
}

pub fn generate_stamp_id(subject: &str) -> String {
    format!("s-{}", digest_hex(subject, 16))
}
