#![deny(clippy::missing_safety_doc, deprecated_in_future, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![allow(clippy::type_complexity)]

//! Elastic binary trees: ordered associative containers keyed by
//! fixed-width integers, pointer-sized addresses, or byte strings, where
//! every operation costs time proportional to the number of significant
//! bits in the key rather than the number of stored entries.
//!
//! # References
//!
//!  - Aime, W. (2011). Elastic Binary Trees — ebtree. The original C
//!    library this crate's algorithm is patterned after, used as HAProxy's
//!    core scheduler and routing data structure.
//!
//! # Layout
//!
//! [`core`] holds the key-agnostic trie mechanism (arena, tagged indices,
//! first/last/next/prev/delete/insert_dup) shared by every flavor below it.
//! [`scalar`] builds the fixed-width integer trees on top of it; [`ptr_tree`]
//! is a thin pointer-width specialization of [`scalar`]; [`bytes`] builds the
//! variable-length byte-string engine and its prefix-matching, string, and
//! indirect-wrapper variants.

mod bytes;
mod core;
mod error;
mod node;
mod ptr_tree;
mod scalar;
mod tagged;

#[doc(hidden)]
pub mod tests_common;

pub use bytes::{ImTree, IsTree, MbTree, PrefixTree, StTree};
pub use error::{InvalidPrefixLength, KeyLengthMismatch};
pub use ptr_tree::PtrTree;
pub use scalar::{I128Tree, I32Tree, I64Tree, ScalarKey, ScalarTree, U128Tree, U32Tree, U64Tree};
pub use tagged::Handle;
