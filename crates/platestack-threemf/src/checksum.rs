//! Checksums of the embedded G-code.

use md5::{Digest, Md5};

/// MD5 digest of `content` as upper-case hex, the form written to
/// `plate_1.gcode.md5`.
pub fn md5_hex(content: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(content);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}

/// Legacy content fingerprint. NOT a cryptographic hash and NOT MD5.
///
/// A 32-bit rolling hash (`h = h * 31 + unit`) over the UTF-16 code units of
/// `content`, printed as signed lower-case hex. Older archives stored this
/// value in place of an MD5; it is kept so callers can compare against them.
pub fn content_fingerprint(content: &str) -> String {
    let hash = content
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit)));
    if hash < 0 {
        format!("-{:x}", (hash as i64).unsigned_abs())
    } else {
        format!("{:x}", hash)
    }
}
