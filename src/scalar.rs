//! Ordered trees keyed by fixed-width integers.
//!
//! A single generic engine stands in for the original's `eb32`/`eb64`/`eb128`
//! families and their signed `eb32i`/`eb64i`/`eb128i` counterparts: the
//! unsigned flavors compare the raw bit pattern, the signed flavors compare
//! it with the sign bit flipped (so two's-complement ordering matches
//! unsigned bit-pattern ordering), and [`ScalarKey::encode`]/`decode` is the
//! only place that distinction is expressed. Branching always examines the
//! most significant bit at which two keys differ, found with
//! [`UInt::leading_zeros`].

use crate::core::Core;
use crate::node::{HasHeader, Header};
use crate::tagged::{Handle, Kind, NodeId, Side, TaggedIndex};

/// An unsigned machine integer usable as the encoded representation of a
/// scalar key.
pub(crate) trait UInt:
    Copy + Eq + Ord + std::ops::BitXor<Output = Self> + std::ops::Shr<u32, Output = Self>
{
    const WIDTH: u32;
    const TWO: Self;

    fn leading_zeros(self) -> u32;
    fn bit_at(self, pos: u32) -> u32;
}

macro_rules! impl_uint {
    ($t:ty) => {
        impl UInt for $t {
            const WIDTH: u32 = <$t>::BITS;
            const TWO: Self = 2;

            fn leading_zeros(self) -> u32 {
                <$t>::leading_zeros(self)
            }

            fn bit_at(self, pos: u32) -> u32 {
                ((self >> pos) & 1) as u32
            }
        }
    };
}

impl_uint!(u32);
impl_uint!(u64);
impl_uint!(u128);

/// A key storable in a [`ScalarTree`]: anything with an unsigned encoding
/// that preserves its ordering.
pub trait ScalarKey: Copy {
    #[doc(hidden)]
    type Repr: UInt;
    #[doc(hidden)]
    fn encode(self) -> Self::Repr;
    #[doc(hidden)]
    fn decode(repr: Self::Repr) -> Self;
}

macro_rules! impl_scalar_key_unsigned {
    ($t:ty) => {
        impl ScalarKey for $t {
            type Repr = $t;
            fn encode(self) -> Self::Repr {
                self
            }
            fn decode(repr: Self::Repr) -> Self {
                repr
            }
        }
    };
}

macro_rules! impl_scalar_key_signed {
    ($signed:ty, $unsigned:ty) => {
        impl ScalarKey for $signed {
            type Repr = $unsigned;
            fn encode(self) -> Self::Repr {
                (self as $unsigned) ^ (1 << (<$unsigned>::BITS - 1))
            }
            fn decode(repr: Self::Repr) -> Self {
                (repr ^ (1 << (<$unsigned>::BITS - 1))) as $signed
            }
        }
    };
}

impl_scalar_key_unsigned!(u32);
impl_scalar_key_unsigned!(u64);
impl_scalar_key_unsigned!(u128);
impl_scalar_key_signed!(i32, u32);
impl_scalar_key_signed!(i64, u64);
impl_scalar_key_signed!(i128, u128);

fn overshoot<U: UInt>(xor: U, bit: u32) -> bool {
    (xor >> bit) >= U::TWO
}

fn highest_set_bit<U: UInt>(xor: U) -> i32 {
    debug_assert!(xor.leading_zeros() < U::WIDTH, "highest_set_bit of zero");
    (U::WIDTH - 1 - xor.leading_zeros()) as i32
}

/// Diverging bit and relative ordering between two distinct encoded keys.
fn branch_point<U: UInt>(new: U, old: U) -> (Side, i32) {
    let bit = highest_set_bit(new ^ old);
    let old_side = if old < new { Side::Left } else { Side::Right };
    (old_side, bit)
}

pub(crate) struct ScalarEntry<U, V> {
    header: Header,
    key: U,
    value: V,
}

impl<U, V> HasHeader for ScalarEntry<U, V> {
    fn header(&self) -> &Header {
        &self.header
    }
    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}

enum Bound {
    Le,
    Ge,
}

/// An ordered tree keyed by a fixed-width integer, generic over signedness
/// and width. See the module-level docs for the encoding scheme. Use
/// [`ScalarTree::new`] for a tree that rejects duplicate keys and
/// [`ScalarTree::new_multi`] for one that keeps every insertion, ordered by
/// arrival, behind a shared key.
pub struct ScalarTree<K: ScalarKey, V> {
    core: Core<ScalarEntry<K::Repr, V>>,
}

impl<K: ScalarKey, V> ScalarTree<K, V> {
    pub fn new() -> Self {
        ScalarTree { core: Core::new(true) }
    }

    pub fn new_multi() -> Self {
        ScalarTree { core: Core::new(false) }
    }

    pub fn len(&self) -> usize {
        self.core.len
    }

    pub fn is_empty(&self) -> bool {
        self.core.len == 0
    }

    /// In-order traversal from [`ScalarTree::first`] to exhaustion.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        std::iter::successors(self.first(), move |&h| self.next(h))
    }

    /// Like [`ScalarTree::insert`], but also reports whether this call
    /// actually inserted a new entry (`true`) as opposed to finding the key
    /// already present in a unique tree (`false`).
    pub fn insert_or_get(&mut self, key: K, value: V) -> (Handle, bool) {
        let before = self.core.len;
        let h = self.insert(key, value);
        (h, self.core.len != before)
    }

    /// Inserts `key` -> `value`. In a unique tree, if `key` is already
    /// present the new value is dropped and the handle of the existing
    /// entry is returned; otherwise the new entry's handle is returned.
    pub fn insert(&mut self, key: K, value: V) -> Handle {
        let repr = key.encode();
        let new = self.core.alloc(ScalarEntry { header: Header::default(), key: repr, value });

        if self.core.is_empty() {
            self.core.insert_root(new);
            return Handle(new);
        }

        let mut cur = self.core.root_branch();
        loop {
            let id = cur.node_id();
            match cur.kind() {
                Kind::Leaf => {
                    let old_key = self.core.entry(id).key;
                    if old_key == repr {
                        return self.land_on_duplicate(id, new);
                    }
                    let (old_side, bit) = branch_point(repr, old_key);
                    self.core.splice_above(id, Kind::Leaf, new, old_side, bit);
                    return Handle(new);
                }
                Kind::Node => {
                    let bit = self.core.bit_of(id);
                    let old_key = self.core.entry(id).key;
                    if bit < 0 {
                        if old_key == repr {
                            return self.land_on_duplicate(id, new);
                        }
                        let (old_side, diverge) = branch_point(repr, old_key);
                        self.core.splice_above(id, Kind::Node, new, old_side, diverge);
                        return Handle(new);
                    }
                    let xor = repr ^ old_key;
                    if overshoot(xor, bit as u32) {
                        let (old_side, diverge) = branch_point(repr, old_key);
                        self.core.splice_above(id, Kind::Node, new, old_side, diverge);
                        return Handle(new);
                    }
                    let side = if repr.bit_at(bit as u32) == 0 { Side::Left } else { Side::Right };
                    cur = self.core.branch_of(id, side);
                }
            }
        }
    }

    fn land_on_duplicate(&mut self, old: NodeId, new: NodeId) -> Handle {
        if self.core.unique {
            self.core.discard(new);
            Handle(old)
        } else {
            self.core.insert_dup(old, new);
            Handle(new)
        }
    }

    pub fn lookup(&self, key: K) -> Option<Handle> {
        if self.core.is_empty() {
            return None;
        }
        let repr = key.encode();
        let mut cur = self.core.root_branch();
        loop {
            let id = cur.node_id();
            match cur.kind() {
                Kind::Leaf => {
                    return (self.core.entry(id).key == repr).then(|| Handle(id));
                }
                Kind::Node => {
                    let bit = self.core.bit_of(id);
                    let old_key = self.core.entry(id).key;
                    if bit < 0 {
                        return (old_key == repr).then(|| Handle(self.core.leftmost_leaf(id)));
                    }
                    let xor = repr ^ old_key;
                    if overshoot(xor, bit as u32) {
                        return None;
                    }
                    let side = if repr.bit_at(bit as u32) == 0 { Side::Left } else { Side::Right };
                    cur = self.core.branch_of(id, side);
                }
            }
        }
    }

    fn lookup_bound(&self, key: K, bound: Bound) -> Option<Handle> {
        if self.core.is_empty() {
            return None;
        }
        let repr = key.encode();
        let wrong_side = match bound {
            Bound::Le => Side::Right,
            Bound::Ge => Side::Left,
        };
        let mut cur = self.core.root_branch();
        loop {
            let id = cur.node_id();
            match cur.kind() {
                Kind::Leaf => {
                    let k = self.core.entry(id).key;
                    let qualifies = match bound {
                        Bound::Le => k <= repr,
                        Bound::Ge => k >= repr,
                    };
                    if qualifies {
                        return Some(Handle(id));
                    }
                    return self.core.climb_for_bound(self.core.leaf_parent_of(id), wrong_side).map(Handle);
                }
                Kind::Node => {
                    let bit = self.core.bit_of(id);
                    let k = self.core.entry(id).key;
                    if bit < 0 {
                        let qualifies = match bound {
                            Bound::Le => k <= repr,
                            Bound::Ge => k >= repr,
                        };
                        if qualifies {
                            let leaf = match bound {
                                Bound::Le => self.core.rightmost_leaf(id),
                                Bound::Ge => self.core.leftmost_leaf(id),
                            };
                            return Some(Handle(leaf));
                        }
                        return self.core.climb_for_bound(self.core.node_parent_of(id), wrong_side).map(Handle);
                    }
                    let xor = repr ^ k;
                    if overshoot(xor, bit as u32) {
                        let node_is_smaller = k < repr;
                        let qualifies = match bound {
                            Bound::Le => node_is_smaller,
                            Bound::Ge => !node_is_smaller,
                        };
                        if qualifies {
                            let leaf = match bound {
                                Bound::Le => self.core.rightmost_leaf(id),
                                Bound::Ge => self.core.leftmost_leaf(id),
                            };
                            return Some(Handle(leaf));
                        }
                        return self.core.climb_for_bound(self.core.node_parent_of(id), wrong_side).map(Handle);
                    }
                    let side = if repr.bit_at(bit as u32) == 0 { Side::Left } else { Side::Right };
                    cur = self.core.branch_of(id, side);
                }
            }
        }
    }

    /// Greatest entry with a key `<= key`.
    pub fn lookup_le(&self, key: K) -> Option<Handle> {
        self.lookup_bound(key, Bound::Le)
    }

    /// Least entry with a key `>= key`.
    pub fn lookup_ge(&self, key: K) -> Option<Handle> {
        self.lookup_bound(key, Bound::Ge)
    }

    pub fn first(&self) -> Option<Handle> {
        self.core.first().map(Handle)
    }

    pub fn last(&self) -> Option<Handle> {
        self.core.last().map(Handle)
    }

    pub fn next(&self, h: Handle) -> Option<Handle> {
        self.core.next(h.0).map(Handle)
    }

    pub fn prev(&self, h: Handle) -> Option<Handle> {
        self.core.prev(h.0).map(Handle)
    }

    /// Like [`ScalarTree::next`] but skips past the rest of the current
    /// key's duplicates, landing on the next distinct key.
    pub fn next_unique(&self, h: Handle) -> Option<Handle> {
        self.core.next_unique(h.0).map(Handle)
    }

    pub fn prev_unique(&self, h: Handle) -> Option<Handle> {
        self.core.prev_unique(h.0).map(Handle)
    }

    /// Unlinks and returns the value held at `h`.
    pub fn delete(&mut self, h: Handle) -> V {
        self.core.delete(h.0);
        self.core.discard(h.0).value
    }

    pub fn key(&self, h: Handle) -> K {
        K::decode(self.core.entry(h.0).key)
    }

    pub fn value(&self, h: Handle) -> &V {
        &self.core.entry(h.0).value
    }

    pub fn value_mut(&mut self, h: Handle) -> &mut V {
        &mut self.core.entry_mut(h.0).value
    }
}

impl<K: ScalarKey, V> Default for ScalarTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type U32Tree<V> = ScalarTree<u32, V>;
pub type I32Tree<V> = ScalarTree<i32, V>;
pub type U64Tree<V> = ScalarTree<u64, V>;
pub type I64Tree<V> = ScalarTree<i64, V>;
pub type U128Tree<V> = ScalarTree<u128, V>;
pub type I128Tree<V> = ScalarTree<i128, V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_roundtrip() {
        let mut t = U32Tree::new();
        let h1 = t.insert(10, "a");
        let h2 = t.insert(20, "b");
        assert_eq!(t.key(h1), 10);
        assert_eq!(t.value(h2), &"b");
        assert_eq!(t.lookup(10), Some(h1));
        assert_eq!(t.lookup(15), None);
    }

    #[test]
    fn ordered_traversal_matches_sorted_order() {
        let mut t = U32Tree::new();
        for k in [5u32, 1, 9, 3, 7] {
            t.insert(k, k);
        }
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        assert_eq!(seen, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn signed_ordering_puts_negatives_before_positives() {
        let mut t = I32Tree::new();
        for k in [-5i32, 3, -1, 0, 2] {
            t.insert(k, ());
        }
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        assert_eq!(seen, vec![-5, -1, 0, 2, 3]);
    }

    #[test]
    fn unique_tree_rejects_duplicate_key() {
        let mut t = U32Tree::new();
        let h1 = t.insert(42, "first");
        let h2 = t.insert(42, "second");
        assert_eq!(h1, h2);
        assert_eq!(t.value(h1), &"first");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn multi_tree_orders_duplicates_by_insertion() {
        let mut t = U32Tree::new_multi();
        let h1 = t.insert(7, "first");
        let h2 = t.insert(7, "second");
        let h3 = t.insert(7, "third");
        assert_eq!(t.len(), 3);
        assert_eq!(t.first(), Some(h1));
        assert_eq!(t.next(h1), Some(h2));
        assert_eq!(t.next(h2), Some(h3));
        assert_eq!(t.next(h3), None);
        assert_eq!(t.next_unique(h1), None);
    }

    #[test]
    fn lookup_on_duplicate_key_returns_first_inserted() {
        let mut t = U32Tree::new_multi();
        let h1 = t.insert(9, "first");
        t.insert(9, "second");
        t.insert(9, "third");
        assert_eq!(t.lookup(9), Some(h1));
    }

    #[test]
    fn deleting_first_of_three_duplicates_preserves_the_rest() {
        // Three duplicates nest a nested chain of bit=-1 sentinel nodes in
        // the same self-loop-displacing shape exercised by
        // `delete_collapses_parent_when_sibling_is_a_foreign_subtree` above,
        // so deleting the very first duplicate inserted (the one without a
        // sentinel of its own) exercises the same parent-collapse path.
        let mut t = U32Tree::new_multi();
        let h1 = t.insert(9, "first");
        let h2 = t.insert(9, "second");
        let h3 = t.insert(9, "third");

        t.delete(h1);

        assert_eq!(t.len(), 2);
        assert_eq!(t.first(), Some(h2));
        assert_eq!(t.next(h2), Some(h3));
        assert_eq!(t.next(h3), None);
        assert_eq!(t.last(), Some(h3));
        assert_eq!(t.lookup(9), Some(h2));
    }

    #[test]
    fn lookup_le_and_ge_find_boundaries() {
        let mut t = U32Tree::new();
        for k in [10u32, 20, 30] {
            t.insert(k, k);
        }
        assert_eq!(t.key(t.lookup_le(25).unwrap()), 20);
        assert_eq!(t.key(t.lookup_ge(25).unwrap()), 30);
        assert_eq!(t.key(t.lookup_le(10).unwrap()), 10);
        assert!(t.lookup_le(5).is_none());
        assert!(t.lookup_ge(35).is_none());
    }

    #[test]
    fn delete_preserves_order_of_remaining_keys() {
        let mut t = U32Tree::new();
        let handles: Vec<_> = [1u32, 2, 3, 4, 5].into_iter().map(|k| t.insert(k, k)).collect();
        t.delete(handles[2]); // remove key 3
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        assert_eq!(seen, vec![1, 2, 4, 5]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn delete_collapses_parent_when_sibling_is_a_foreign_subtree() {
        // Builds a tree where an internal node's two children are both
        // themselves further subtrees (neither is the internal node's own
        // self-loop), then deletes the node's sibling leaf. The surviving
        // subtree must be promoted all the way up to the collapsed node's
        // own former slot rather than merely overwriting one of the
        // collapsed node's two (already-identical-after-the-bug) branches.
        let mut t = U32Tree::new();
        let a = t.insert(0x0000_0000u32, "a");
        let b = t.insert(0x8000_0000u32, "b");
        let c = t.insert(0xA000_0000u32, "c");
        let d = t.insert(0xA000_8000u32, "d");

        t.delete(a);

        assert_eq!(t.len(), 3);
        assert_eq!(t.first(), Some(b));
        assert_eq!(t.next(b), Some(c));
        assert_eq!(t.next(c), Some(d));
        assert_eq!(t.next(d), None, "the greatest remaining key must have no successor");
        assert_eq!(t.last(), Some(d));
    }

    #[test]
    fn delete_every_key_leaves_tree_empty() {
        let mut t = U32Tree::new();
        let handles: Vec<_> = [1u32, 2, 3].into_iter().map(|k| t.insert(k, k)).collect();
        for h in handles {
            t.delete(h);
        }
        assert!(t.is_empty());
        assert!(t.first().is_none());
    }

    #[test]
    fn random_keys_survive_deleting_every_even_indexed_entry() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut t = U64Tree::new_multi();
        let mut handles = Vec::with_capacity(1000);
        for _ in 0..1000 {
            let k: u64 = rng.gen();
            handles.push(t.insert(k, ()));
        }

        let original: Vec<_> = {
            let mut seen = Vec::new();
            let mut cur = t.first();
            while let Some(h) = cur {
                seen.push(h);
                cur = t.next(h);
            }
            seen
        };

        let expected: Vec<_> =
            original.iter().enumerate().filter(|(i, _)| i % 2 != 0).map(|(_, h)| t.key(*h)).collect();

        for (i, h) in original.iter().enumerate() {
            if i % 2 == 0 {
                t.delete(*h);
            }
        }

        let remaining: Vec<_> = {
            let mut seen = Vec::new();
            let mut cur = t.first();
            while let Some(h) = cur {
                seen.push(t.key(h));
                cur = t.next(h);
            }
            seen
        };

        assert_eq!(remaining, expected);
    }

    #[test]
    fn signed_128_bit_tree_preserves_bit_position_invariant() {
        let mut t = I128Tree::new();
        for k in [i128::MIN, i128::MIN + 1, -1, 0, 1, i128::MAX] {
            t.insert(k, ());
        }
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(seen, sorted);
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::BTreeSet;

    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn in_order_traversal_is_sorted(keys: Vec<u64>) -> bool {
        let mut t = U64Tree::new_multi();
        for k in &keys {
            t.insert(*k, ());
        }
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        let mut sorted = seen.clone();
        sorted.sort();
        seen == sorted && seen.len() == keys.len()
    }

    #[quickcheck]
    fn lookup_finds_every_inserted_key(keys: Vec<u64>) -> bool {
        let mut t = U64Tree::new_multi();
        for k in &keys {
            t.insert(*k, ());
        }
        keys.iter().all(|k| t.lookup(*k).map(|h| t.key(h)) == Some(*k))
    }

    #[quickcheck]
    fn lookup_le_and_ge_bound_correctly(keys: BTreeSet<u64>, query: u64) -> bool {
        let mut t = U64Tree::new();
        for k in &keys {
            t.insert(*k, ());
        }
        let expected_le = keys.iter().rev().find(|&&k| k <= query).copied();
        let expected_ge = keys.iter().find(|&&k| k >= query).copied();
        let actual_le = t.lookup_le(query).map(|h| t.key(h));
        let actual_ge = t.lookup_ge(query).map(|h| t.key(h));
        actual_le == expected_le && actual_ge == expected_ge
    }

    #[quickcheck]
    fn insert_then_delete_restores_prior_sequence(keys: BTreeSet<u64>, extra: u64) -> bool {
        if keys.contains(&extra) {
            // a unique tree's insert returns the pre-existing handle on a
            // duplicate key, so deleting it would remove that entry rather
            // than the no-op this property assumes.
            return true;
        }

        let mut t = U64Tree::new();
        for k in &keys {
            t.insert(*k, ());
        }
        let before = in_order_keys(&t);

        let h = t.insert(extra, ());
        t.delete(h);

        let after = in_order_keys(&t);
        before == after
    }

    fn in_order_keys(t: &U64Tree<()>) -> Vec<u64> {
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(h) = cur {
            seen.push(t.key(h));
            cur = t.next(h);
        }
        seen
    }
}
