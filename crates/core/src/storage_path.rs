//! Blob paths for uploaded images.
//!
//! Paths are namespaced `{state}/{district_name}/` and the file name combines
//! a millisecond timestamp with a short random suffix, so concurrent
//! contributors never collide without any server-side coordination.

use std::sync::atomic::{AtomicI64, Ordering};

use rand::Rng;

use crate::district::District;

/// Length of the random file-name suffix.
pub const SUFFIX_LENGTH: usize = 6;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Last timestamp handed out in this process.
static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Strictly increasing millisecond stamp: wall clock, bumped past the
/// previous value when two calls land in the same millisecond.
pub fn next_millis() -> i64 {
    advance_millis(chrono::Utc::now().timestamp_millis())
}

fn advance_millis(now: i64) -> i64 {
    let mut prev = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_MILLIS.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

/// Random lowercase alphanumeric suffix of [`SUFFIX_LENGTH`] characters.
pub fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LENGTH)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

/// Assemble `{state}/{district_name}/{millis}-{suffix}.{ext}`.
pub fn storage_path(district: &District, millis: i64, suffix: &str, extension: &str) -> String {
    format!(
        "{}/{}/{millis}-{suffix}.{extension}",
        district.state, district.district_name
    )
}

/// A fresh, unique path for an image of `district` with `extension`.
pub fn generate_storage_path(district: &District, extension: &str) -> String {
    storage_path(district, next_millis(), &random_suffix(), extension)
}
