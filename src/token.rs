use rand::seq::SliceRandom;
use rand::thread_rng;

pub(crate) const CHARACTERS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random paste token of exactly `length` alphanumeric characters.
///
/// Uniqueness is not guaranteed here; the store enforces it by retrying
/// colliding inserts.
pub fn generate(length: usize) -> String {
    let mut rng = thread_rng();
    (0..length)
        .map(|_| *CHARACTERS.choose(&mut rng).expect("alphabet is non-empty") as char)
        .collect()
}
