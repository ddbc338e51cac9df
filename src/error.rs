//! Error types, implemented by hand rather than pulled in from a derive
//! crate — there are exactly two failure modes in this crate and neither
//! needs more than a `Display` impl.

use std::error::Error;
use std::fmt;

/// Returned by [`crate::MbTree::insert_checked`] when a fixed-length
/// byte tree is given a key that doesn't match the width it was configured
/// with. The unchecked `insert` only `debug_assert`s this, trusting callers
/// who have already validated key length themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLengthMismatch {
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for KeyLengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key length mismatch: tree expects {}-byte keys, got {}",
            self.expected, self.found
        )
    }
}

impl Error for KeyLengthMismatch {}

/// Returned by [`crate::PrefixTree::insert_prefix`] when asked to
/// register a prefix longer than the key it is supposed to shorten, or a
/// prefix of zero length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPrefixLength {
    pub prefix_len: usize,
    pub key_len: usize,
}

impl fmt::Display for InvalidPrefixLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid prefix length {} for a {}-byte key",
            self.prefix_len, self.key_len
        )
    }
}

impl Error for InvalidPrefixLength {}
