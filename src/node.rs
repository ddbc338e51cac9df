//! The per-node header shared by every tree flavor.

use crate::tagged::TaggedIndex;

/// Fixed-size bookkeeping attached to every stored entry: the branching bit
/// and the three tagged links that thread it into the trie. Mirrors
/// `eb_node` — `bit` doubles as an MSB position for scalar keys and as a
/// leading-matching-bit count for byte-string keys, exactly as in the
/// original, and a negative value marks a duplicate-key sentinel.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Header {
    pub(crate) bit: i32,
    pub(crate) branches: [TaggedIndex; 2],
    pub(crate) node_parent: TaggedIndex,
    pub(crate) leaf_parent: TaggedIndex,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            bit: 0,
            branches: [TaggedIndex::NONE, TaggedIndex::NONE],
            node_parent: TaggedIndex::NONE,
            leaf_parent: TaggedIndex::NONE,
        }
    }
}

impl Header {
    /// A node is linked as an internal branch point iff it has a duplicate
    /// sentinel bit or a real node-parent link.
    pub(crate) fn is_linked_as_node(&self) -> bool {
        !self.node_parent.is_none()
    }

    pub(crate) fn is_duplicate_sentinel(&self) -> bool {
        self.bit < 0
    }
}

/// Anything that carries a [`Header`]; lets the generic trie walks in
/// [`crate::core`] operate over any concrete entry type (scalar, pointer,
/// byte-string) without knowing about keys or values.
pub(crate) trait HasHeader {
    fn header(&self) -> &Header;
    fn header_mut(&mut self) -> &mut Header;
}
