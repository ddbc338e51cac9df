//! Low-bit-tagged indices into the node arena.
//!
//! Every link in an elastic binary tree is a pointer with its two low bits
//! stolen to record which of two interpretations applies: a link stored in
//! a node's `branches` array is tagged with a [`Kind`] (does it point at a
//! further internal node, or at a leaf?), while a link stored in a node's
//! `node_parent`/`leaf_parent` back-pointer is tagged with a [`Side`] (which
//! branch of the parent holds this link?). Both tags occupy the same single
//! bit; which meaning applies is determined entirely by which field is being
//! read, exactly as in the C original.
//!
//! Caller-owned nodes in the original are identified by their address; here
//! nodes live in an arena ([`crate::core::Core`]) and are identified by a
//! `u32` slot index instead, packed into the same low-bit-tagged shape.

use std::fmt;

/// Index of a node's slot in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Which of a node's two roles a tagged link refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Kind {
    Node,
    Leaf,
}

/// Which branch of a parent a tagged back-pointer was attached through.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub(crate) fn as_index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    fn from_bit(bit: bool) -> Side {
        if bit {
            Side::Right
        } else {
            Side::Left
        }
    }
}

impl Kind {
    fn from_bit(bit: bool) -> Kind {
        if bit {
            Kind::Leaf
        } else {
            Kind::Node
        }
    }
}

/// An opaque reference to an entry previously returned by a tree operation
/// (`insert`, `lookup`, `first`, `next`, ...). Stays valid until the entry it
/// names is deleted; using a handle with a tree other than the one that
/// produced it is a logic error, the same way using an `eb_node` with the
/// wrong tree is in the original.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Handle(pub(crate) NodeId);

/// What a tagged index ultimately resolves to: the tree's own root slot, or
/// a node living in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Target {
    Root,
    Node(NodeId),
}

/// A link with one low bit stolen for a [`Kind`] or [`Side`] tag, and the
/// special payload value `1` reserved to mean "the tree root" rather than
/// any arena slot. Mirrors `eb_troot_t`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct TaggedIndex(u32);

const PAYLOAD_NONE: u32 = 0;
const PAYLOAD_ROOT: u32 = 1;
const PAYLOAD_OFFSET: u32 = 2;

impl TaggedIndex {
    pub(crate) const NONE: TaggedIndex = TaggedIndex(PAYLOAD_NONE << 1);

    pub(crate) fn root(tag: bool) -> Self {
        TaggedIndex((PAYLOAD_ROOT << 1) | tag as u32)
    }

    pub(crate) fn node(id: NodeId, tag: bool) -> Self {
        TaggedIndex(((id.index() as u32 + PAYLOAD_OFFSET) << 1) | tag as u32)
    }

    pub(crate) fn tagged_kind(id: NodeId, kind: Kind) -> Self {
        Self::node(id, matches!(kind, Kind::Leaf))
    }

    pub(crate) fn tagged_side(id: NodeId, side: Side) -> Self {
        Self::node(id, matches!(side, Side::Right))
    }

    pub(crate) fn root_side(side: Side) -> Self {
        Self::root(matches!(side, Side::Right))
    }

    pub(crate) fn is_none(self) -> bool {
        self.0 >> 1 == PAYLOAD_NONE
    }

    fn tag_bit(self) -> bool {
        self.0 & 1 != 0
    }

    pub(crate) fn kind(self) -> Kind {
        Kind::from_bit(self.tag_bit())
    }

    pub(crate) fn side(self) -> Side {
        Side::from_bit(self.tag_bit())
    }

    pub(crate) fn target(self) -> Target {
        let payload = self.0 >> 1;
        if payload == PAYLOAD_NONE {
            panic!("target() called on an absent link");
        } else if payload == PAYLOAD_ROOT {
            Target::Root
        } else {
            Target::Node(NodeId::new(payload - PAYLOAD_OFFSET))
        }
    }

    /// The node this link points at. Panics if it points at the root or is
    /// absent; only valid for links that are known to name a node (branch
    /// slots never hold the root).
    pub(crate) fn node_id(self) -> NodeId {
        match self.target() {
            Target::Node(id) => id,
            Target::Root => panic!("node_id() called on a root-tagged link"),
        }
    }
}

impl fmt::Debug for TaggedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TaggedIndex(none)")
        } else {
            write!(f, "TaggedIndex({:?}, tag={})", self.target(), self.tag_bit())
        }
    }
}
