//! Nonce value generation.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// A function that generates nonce values of the requested length.
pub type NonceGeneratorFn = Box<dyn Fn(usize) -> String + Send + Sync>;

/// Returns `length` characters drawn uniformly from `[A-Za-z0-9]`.
///
/// Uses the thread-local CSPRNG, so values are unpredictable as well as
/// unique in practice.
///
/// # Example
///
/// ```rust
/// let nonce = peasant::nonce::generate_nonce(32);
/// assert_eq!(nonce.len(), 32);
/// assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_nonce(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// The generator used when a service is not given one.
pub fn default_generator() -> NonceGeneratorFn {
    Box::new(generate_nonce)
}
