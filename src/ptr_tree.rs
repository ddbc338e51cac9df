//! A tree keyed by pointer-sized values.
//!
//! On *almost* all platforms a pointer can be cast to a `usize` and back
//! without loss, so rather than duplicate the scalar engine for `*const T`
//! this flavor just keys a [`ScalarTree`] on `usize` directly (selecting a
//! 32- or 64-bit encoding to match the platform's pointer width) and leaves
//! the `as usize` / `as *const T` casts to the caller, exactly as the
//! original's indirect pointer tree does.

use crate::scalar::{ScalarKey, ScalarTree};

#[cfg(target_pointer_width = "64")]
impl ScalarKey for usize {
    type Repr = u64;
    fn encode(self) -> u64 {
        self as u64
    }
    fn decode(repr: u64) -> usize {
        repr as usize
    }
}

#[cfg(target_pointer_width = "32")]
impl ScalarKey for usize {
    type Repr = u32;
    fn encode(self) -> u32 {
        self as u32
    }
    fn decode(repr: u32) -> usize {
        repr as usize
    }
}

/// An ordered tree keyed by raw addresses. Insert with `ptr as usize` and
/// recover the pointer with `tree.key(handle) as *const T`.
pub type PtrTree<V> = ScalarTree<usize, V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_address() {
        let values = [3u8, 1, 4, 1, 5];
        let mut t = PtrTree::new_multi();
        let handles: Vec<_> = values.iter().map(|v| t.insert(v as *const u8 as usize, *v)).collect();

        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.len(), handles.len());
    }
}
