//! Pluggable digest function.
//!
//! The service treats the digest as a pure function from the submitted bytes
//! to a textual encoding. [`Sha512Base64`] is the default: SHA-512 encoded
//! with the standard base64 alphabet (88 characters including padding).

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};

/// Length in bytes of a raw SHA-512 digest.
pub const SHA512_LEN: usize = 64;

/// A pure function from input bytes to an encoded digest.
///
/// Implementations must be deterministic: equal inputs produce equal output.
pub trait Hasher: Send + Sync + 'static {
    fn digest(&self, input: &[u8]) -> String;
}

impl<F> Hasher for F
where
    F: Fn(&[u8]) -> String + Send + Sync + 'static,
{
    fn digest(&self, input: &[u8]) -> String {
        self(input)
    }
}

/// SHA-512, base64 (standard alphabet, padded).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Base64;

impl Hasher for Sha512Base64 {
    fn digest(&self, input: &[u8]) -> String {
        STANDARD.encode(Sha512::digest(input))
    }
}
