//! Arena storage and the key-agnostic trie walks shared by every flavor.
//!
//! Everything in this module operates purely on [`crate::node::Header`]
//! links; it never looks at a key or a value. The scalar, pointer and
//! byte-string trees each keep their own descent logic (which depends on how
//! keys compare) but delegate first/last/next/prev/delete/duplicate-linking
//! to the functions here, the same way the original's per-flavor C files all
//! called into a single shared `ebtree.c`.

use crate::node::{HasHeader, Header};
use crate::tagged::{Kind, NodeId, Side, TaggedIndex, Target};

enum Slot<E> {
    Occupied(E),
    Free(Option<u32>),
}

/// Arena-backed storage plus the root links, generic over the entry type
/// each tree flavor stores in it.
pub(crate) struct Core<E> {
    slots: Vec<Slot<E>>,
    free_head: Option<u32>,
    root: [TaggedIndex; 2],
    pub(crate) unique: bool,
    pub(crate) len: usize,
}

impl<E: HasHeader> Core<E> {
    pub(crate) fn new(unique: bool) -> Self {
        Core {
            slots: Vec::new(),
            free_head: None,
            root: [TaggedIndex::NONE, TaggedIndex::NONE],
            unique,
            len: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root[Side::Left.as_index()].is_none()
    }

    fn root_link(&self) -> TaggedIndex {
        self.root[Side::Left.as_index()]
    }

    pub(crate) fn entry(&self, id: NodeId) -> &E {
        match &self.slots[id.index()] {
            Slot::Occupied(e) => e,
            Slot::Free(_) => unreachable!("dangling NodeId"),
        }
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> &mut E {
        match &mut self.slots[id.index()] {
            Slot::Occupied(e) => e,
            Slot::Free(_) => unreachable!("dangling NodeId"),
        }
    }

    fn header(&self, id: NodeId) -> &Header {
        self.entry(id).header()
    }

    fn header_mut(&mut self, id: NodeId) -> &mut Header {
        self.entry_mut(id).header_mut()
    }

    pub(crate) fn alloc(&mut self, entry: E) -> NodeId {
        match self.free_head {
            Some(slot) => {
                self.free_head = match self.slots[slot as usize] {
                    Slot::Free(next) => next,
                    Slot::Occupied(_) => unreachable!(),
                };
                self.slots[slot as usize] = Slot::Occupied(entry);
                NodeId::new(slot)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot::Occupied(entry));
                NodeId::new(slot)
            }
        }
    }

    /// Removes an entry's storage entirely. Only valid for an entry that was
    /// never linked into the tree (e.g. a discarded duplicate in a unique
    /// tree); linked entries are removed via [`Core::delete`], which keeps
    /// the record (and its value) alive for the caller.
    pub(crate) fn discard(&mut self, id: NodeId) -> E {
        let old = std::mem::replace(&mut self.slots[id.index()], Slot::Free(self.free_head));
        self.free_head = Some(id.index() as u32);
        match old {
            Slot::Occupied(e) => e,
            Slot::Free(_) => unreachable!(),
        }
    }

    fn branches(&self, target: Target) -> [TaggedIndex; 2] {
        match target {
            Target::Root => self.root,
            Target::Node(id) => self.header(id).branches,
        }
    }

    fn set_branch(&mut self, target: Target, side: Side, value: TaggedIndex) {
        match target {
            Target::Root => self.root[side.as_index()] = value,
            Target::Node(id) => self.header_mut(id).branches[side.as_index()] = value,
        }
    }

    // ---- first / last ---------------------------------------------------

    fn walk_down(&self, start: TaggedIndex, direction: Side) -> NodeId {
        let mut cur = start;
        loop {
            match cur.kind() {
                Kind::Leaf => return cur.node_id(),
                Kind::Node => {
                    let id = cur.node_id();
                    cur = self.header(id).branches[direction.as_index()];
                }
            }
        }
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }
        Some(self.walk_down(self.root_link(), Side::Left))
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }
        Some(self.walk_down(self.root_link(), Side::Right))
    }

    /// Rightmost leaf of the subtree rooted at `id` (which may itself
    /// already be a leaf, in which case it is its own answer).
    pub(crate) fn rightmost_leaf(&self, id: NodeId) -> NodeId {
        self.walk_down(TaggedIndex::tagged_kind(id, Kind::Node), Side::Right)
    }

    pub(crate) fn leftmost_leaf(&self, id: NodeId) -> NodeId {
        self.walk_down(TaggedIndex::tagged_kind(id, Kind::Node), Side::Left)
    }

    pub(crate) fn bit_of(&self, id: NodeId) -> i32 {
        self.header(id).bit
    }

    pub(crate) fn branch_of(&self, id: NodeId, side: Side) -> TaggedIndex {
        self.header(id).branches[side.as_index()]
    }

    pub(crate) fn leaf_parent_of(&self, id: NodeId) -> TaggedIndex {
        self.header(id).leaf_parent
    }

    pub(crate) fn node_parent_of(&self, id: NodeId) -> TaggedIndex {
        self.header(id).node_parent
    }

    // ---- next / prev ------------------------------------------------------

    /// Climb parent links while arriving from `direction`, then descend the
    /// opposite direction from the first ancestor reached from the other
    /// side. Used by both `next`/`prev` and their `_unique` counterparts,
    /// which differ only in the tagged link they start climbing from.
    fn climb_and_descend(&self, start: TaggedIndex, direction: Side) -> Option<NodeId> {
        let mut troot = start;
        loop {
            if troot.side() != direction {
                break;
            }
            match troot.target() {
                Target::Root => return None,
                Target::Node(id) => troot = self.header(id).node_parent,
            }
        }
        let target = troot.target();
        let sibling = self.branches(target)[direction.as_index()];
        if sibling.is_none() {
            return None;
        }
        Some(self.walk_down(sibling, direction.opposite()))
    }

    /// Walks up past any duplicate-sentinel ancestors of `id`'s leaf
    /// position, returning the tagged link to climb from for a `_unique`
    /// traversal.
    fn outermost_dup_anchor(&self, id: NodeId) -> TaggedIndex {
        let mut link = self.header(id).leaf_parent;
        loop {
            if let Target::Node(anchor) = link.target() {
                if self.header(anchor).is_duplicate_sentinel() {
                    link = self.header(anchor).node_parent;
                    continue;
                }
            }
            return link;
        }
    }

    pub(crate) fn next(&self, id: NodeId) -> Option<NodeId> {
        self.climb_and_descend(self.header(id).leaf_parent, Side::Right)
    }

    pub(crate) fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.climb_and_descend(self.header(id).leaf_parent, Side::Left)
    }

    pub(crate) fn next_unique(&self, id: NodeId) -> Option<NodeId> {
        self.climb_and_descend(self.outermost_dup_anchor(id), Side::Right)
    }

    pub(crate) fn prev_unique(&self, id: NodeId) -> Option<NodeId> {
        self.climb_and_descend(self.outermost_dup_anchor(id), Side::Left)
    }

    // ---- lookup_le / lookup_ge shared climb -------------------------------

    /// Shared tail of `lookup_le`/`lookup_ge`: given the tagged link at which
    /// descent stopped short of the target, climb until a link arriving from
    /// `wrong_side` is left behind, then return the `descend` -most leaf of
    /// the sibling subtree found there. `wrong_side` is `Right` for
    /// `lookup_le` (we want to leave behind links we followed because they
    /// were too small) and `Left` for `lookup_ge`.
    pub(crate) fn climb_for_bound(
        &self,
        start: TaggedIndex,
        wrong_side: Side,
    ) -> Option<NodeId> {
        let descend = wrong_side.opposite();
        let mut troot = start;
        loop {
            if troot.side() != wrong_side {
                break;
            }
            match troot.target() {
                Target::Root => return None,
                Target::Node(id) => troot = self.header(id).node_parent,
            }
        }
        let target = troot.target();
        let branch = self.branches(target)[wrong_side.as_index()];
        if branch.is_none() {
            return None;
        }
        Some(self.walk_down(branch, descend))
    }

    // ---- splicing ----------------------------------------------------------

    /// Attaches `new` as the very first entry of an empty tree.
    pub(crate) fn insert_root(&mut self, new: NodeId) {
        self.root[Side::Left.as_index()] = TaggedIndex::tagged_kind(new, Kind::Leaf);
        self.header_mut(new).leaf_parent = TaggedIndex::root_side(Side::Left);
        self.len += 1;
    }

    /// Splices `new` in as a fresh internal node taking over whichever of
    /// `old`'s external links (`old_kind`) currently places it in the tree,
    /// with `old` becoming `new`'s child on `old_side` and `new` becoming
    /// its own leaf child (a self-loop) on the opposite side. Used for an
    /// ordinary branching insert (`old_kind = Leaf` when landing on a plain
    /// leaf, `old_kind = Node` when landing above an existing node) and,
    /// with `bit = -1`, for attaching the first duplicate of a key.
    pub(crate) fn splice_above(
        &mut self,
        old: NodeId,
        old_kind: Kind,
        new: NodeId,
        old_side: Side,
        bit: i32,
    ) {
        let new_side = old_side.opposite();
        let old_external = match old_kind {
            Kind::Leaf => self.header(old).leaf_parent,
            Kind::Node => self.header(old).node_parent,
        };

        {
            let h = self.header_mut(new);
            h.bit = bit;
            h.branches[new_side.as_index()] = TaggedIndex::tagged_kind(new, Kind::Leaf);
            h.branches[old_side.as_index()] = TaggedIndex::tagged_kind(old, old_kind);
            h.node_parent = old_external;
            h.leaf_parent = TaggedIndex::tagged_side(new, new_side);
        }

        match old_kind {
            Kind::Leaf => self.header_mut(old).leaf_parent = TaggedIndex::tagged_side(new, old_side),
            Kind::Node => self.header_mut(old).node_parent = TaggedIndex::tagged_side(new, old_side),
        }

        let target = old_external.target();
        self.set_branch(target, old_external.side(), TaggedIndex::tagged_kind(new, Kind::Node));
        self.len += 1;
    }

    /// Attaches `new` as a new rightmost duplicate of the key represented by
    /// `old` (which may be a plain leaf holding the first occurrence, or an
    /// existing duplicate sentinel already holding two or more).
    pub(crate) fn insert_dup(&mut self, old: NodeId, new: NodeId) {
        let anchor = if self.header(old).is_duplicate_sentinel() {
            self.rightmost_leaf(old)
        } else {
            old
        };
        self.splice_above(anchor, Kind::Leaf, new, Side::Left, -1);
    }

    // ---- delete --------------------------------------------------------------

    /// Unlinks `id` from the tree. Leaves its storage in place (the caller
    /// still owns the value); a no-op if `id` was never linked.
    pub(crate) fn delete(&mut self, id: NodeId) {
        if self.header(id).leaf_parent.is_none() {
            return;
        }

        if self.header(id).is_linked_as_node() {
            // `id` doubles as an internal node; its own leaf role is always
            // self-hosted (see `splice_above`), so the real sibling sits on
            // the side opposite its self-loop.
            let self_side = self.header(id).leaf_parent.side();
            let sibling = self.header(id).branches[self_side.opposite().as_index()];
            let node_external = self.header(id).node_parent;
            self.promote(sibling, node_external.target(), node_external.side());
            self.header_mut(id).node_parent = TaggedIndex::NONE;
            self.header_mut(id).leaf_parent = TaggedIndex::NONE;
            self.len -= 1;
            return;
        }

        let leaf_external = self.header(id).leaf_parent;
        let p_target = leaf_external.target();
        let p_side = leaf_external.side();
        let sibling = self.branches(p_target)[p_side.opposite().as_index()];

        let sibling_is_parent_self_loop = matches!(
            (sibling.kind(), sibling.target(), p_target),
            (Kind::Leaf, Target::Node(sid), Target::Node(pid)) if sid == pid
        );

        if sibling_is_parent_self_loop {
            // `p_target` had exactly two children: `id` and itself. Removing
            // `id` collapses `p_target` from a node back into a plain leaf,
            // taking over whatever slot referenced it as a node.
            match p_target {
                Target::Root => self.root[p_side.as_index()] = TaggedIndex::NONE,
                Target::Node(p_id) => {
                    let grand = self.header(p_id).node_parent;
                    let dest = match grand.target() {
                        Target::Root => TaggedIndex::root_side(grand.side()),
                        Target::Node(g) => TaggedIndex::tagged_side(g, grand.side()),
                    };
                    self.set_branch(grand.target(), grand.side(), TaggedIndex::tagged_kind(p_id, Kind::Leaf));
                    self.header_mut(p_id).leaf_parent = dest;
                    self.header_mut(p_id).node_parent = TaggedIndex::NONE;
                }
            }
        } else if sibling.is_none() {
            // only reachable when p_target == Root and id was the sole leaf
            self.root[p_side.as_index()] = TaggedIndex::NONE;
        } else {
            // `p_target`'s other child is a distinct subtree, not its own
            // self-loop: `p_target` itself had exactly two children (`id`
            // and `sibling`), so removing `id` leaves no room for it to
            // keep branching. `p_target` collapses out of the node role
            // entirely and `sibling` is promoted to occupy the slot
            // `p_target` used to occupy as seen from its own node-parent;
            // `p_target` itself is untouched otherwise since it remains
            // linked as a leaf wherever that currently points.
            let p_id = match p_target {
                Target::Node(p_id) => p_id,
                Target::Root => unreachable!("root's sibling slot is always none"),
            };
            let node_external = self.header(p_id).node_parent;
            self.promote(sibling, node_external.target(), node_external.side());
            self.header_mut(p_id).node_parent = TaggedIndex::NONE;
        }

        self.header_mut(id).leaf_parent = TaggedIndex::NONE;
        self.len -= 1;
    }

    /// Writes `sibling` into `(target, side)` and fixes up whichever of its
    /// own back-pointers now needs to reference that slot.
    fn promote(&mut self, sibling: TaggedIndex, target: Target, side: Side) {
        let dest = match target {
            Target::Root => TaggedIndex::root_side(side),
            Target::Node(id) => TaggedIndex::tagged_side(id, side),
        };
        self.set_branch(target, side, sibling);
        match sibling.kind() {
            Kind::Leaf => self.header_mut(sibling.node_id()).leaf_parent = dest,
            Kind::Node => self.header_mut(sibling.node_id()).node_parent = dest,
        }
    }

    // ---- traversal starting point for descent ------------------------------

    pub(crate) fn root_branch(&self) -> TaggedIndex {
        self.root_link()
    }
}
