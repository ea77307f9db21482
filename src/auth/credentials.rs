//! Credential validation and hashing

use sha2::{Digest, Sha256};

/// `local@domain.tld` with a 2-6 letter top-level domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = (2..=6).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}

/// 10 to 15 ASCII digits.
pub fn is_valid_phone(number: &str) -> bool {
    (10..=15).contains(&number.len()) && number.chars().all(|c| c.is_ascii_digit())
}

/// Exactly 4 ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit())
}

/// Lowercase hex SHA-256 of the PIN
pub fn hash_pin(pin: &str) -> String {
    sha256_hex(pin.as_bytes())
}

pub(crate) fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}
