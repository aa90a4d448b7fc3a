//! The Type Node Model: a tagged tree of [`NodeKind`] values held in an
//! arena, addressed by [`NodeId`].
//!
//! Every edge the tree needs — field types, element type, pointee type,
//! nested declarations, the parent back-edge, and resolved references —
//! is an index into the arena rather than a pointer. This is what makes
//! teardown a single pass over a `Vec` and what lets [`NodeKind::Reference`]
//! be a genuinely non-owning back-edge (`spec.md` §9).
//!
//! A parsed tree is always handed to callers as `Arc<Arena>` so that
//! cross-tree references (an external reference scope built from a
//! previously parsed tree) and thread-shared read access both fall out of
//! the same mechanism, with no lifetime parameters threaded through the
//! public API.

use std::sync::Arc;

use crate::abi::{Layout, Primitive};

/// An index into an [`Arena`]'s node table. Never valid across arenas —
/// cross-tree edges go through [`RefTarget::Foreign`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// Where a `Reference` node's name resolved to.
#[derive(Debug, Clone)]
pub(crate) enum RefTarget {
    /// Resolved within the tree currently being built.
    Local(NodeId),
    /// Resolved into an already-built tree supplied via the external
    /// reference scope.
    Foreign(NodeHandle),
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Simple(Primitive),
    Text,
    Complex { fields: Vec<(Box<str>, NodeId)> },
    Sequence { element: NodeId },
    TypedPointer { pointee: NodeId },
    Reference(RefTarget),
}

/// The publicly visible tag of a node's kind. `Reference` never appears
/// here — `spec.md` invariant 5 requires reference transparency, so
/// [`NodeHandle::kind`] reports the stripped target's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Simple,
    Text,
    Complex,
    Sequence,
    TypedPointer,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub name: Option<Box<str>>,
    pub parent: Option<NodeId>,
    /// Named types declared locally via `T name = body ;`, searched before
    /// walking up to the parent (`spec.md` §4.3).
    pub nested: Vec<(Box<str>, NodeId)>,
    pub descriptor: u8,
    pub layout: Layout,
    /// Byte offsets of `Complex` fields, parallel to `kind`'s `fields`.
    /// Empty for every other kind.
    pub offsets: Vec<u32>,
    pub kind: NodeKind,
}

/// An immutable, arena-backed type tree produced by a successful parse.
///
/// Destruction is a single recursive-free pass rooted at the arena's
/// `Vec` (ordinary `Drop`); references are indices, never followed during
/// teardown, so there is nothing to leak or double-free.
#[derive(Debug)]
pub struct Arena {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: NodeId,
}

impl Arena {
    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    /// The root node of this tree, as a [`NodeHandle`].
    pub fn root(self: &Arc<Self>) -> NodeHandle {
        NodeHandle {
            tree: self.clone(),
            id: self.root,
        }
    }
}

/// A node located within a specific tree. This is the type every public
/// Accessor and Type Node Model operation is expressed in terms of.
///
/// Cheap to clone: cloning bumps the `Arc` refcount and copies a `u32`.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    pub(crate) tree: Arc<Arena>,
    pub(crate) id: NodeId,
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}
impl Eq for NodeHandle {}

impl NodeHandle {
    pub(crate) fn data(&self) -> &NodeData {
        self.tree.node(self.id)
    }

    fn with_id(&self, id: NodeId) -> NodeHandle {
        NodeHandle {
            tree: self.tree.clone(),
            id,
        }
    }

    /// Name of this node, if any (present for reference targets and for
    /// Complex fields).
    pub fn name(&self) -> Option<&str> {
        self.data().name.as_deref()
    }

    /// The one-character descriptor that produced this node. For a
    /// `Reference`, this is the reference's own descriptor (`l` or `L`),
    /// not the target's — use [`NodeHandle::resolve`] first if you want
    /// the target's descriptor.
    pub fn descriptor(&self) -> u8 {
        self.data().descriptor
    }

    /// Byte size of a value typed by this node, per the ABI Oracle.
    pub fn size(&self) -> u32 {
        self.resolve().data().layout.size
    }

    /// Alignment of a value typed by this node.
    pub fn align(&self) -> u32 {
        self.resolve().data().layout.align
    }

    /// Strips `Reference` wrappers transitively, per `spec.md` invariant 5.
    /// Every other accessor that returns "the type of X" calls this
    /// internally; it's exposed directly for callers that want to inspect
    /// a node generically.
    pub fn resolve(&self) -> NodeHandle {
        let mut current = self.clone();
        loop {
            let next = match &current.data().kind {
                NodeKind::Reference(RefTarget::Local(id)) => current.with_id(*id),
                NodeKind::Reference(RefTarget::Foreign(handle)) => handle.clone(),
                _ => return current,
            };
            current = next;
        }
    }

    /// The tag of this node's kind, with references stripped.
    pub fn kind(&self) -> Kind {
        match self.resolve().data().kind {
            NodeKind::Simple(_) => Kind::Simple,
            NodeKind::Text => Kind::Text,
            NodeKind::Complex { .. } => Kind::Complex,
            NodeKind::Sequence { .. } => Kind::Sequence,
            NodeKind::TypedPointer { .. } => Kind::TypedPointer,
            NodeKind::Reference(_) => unreachable!("resolve() strips references"),
        }
    }

    pub fn is_simple(&self) -> bool {
        self.kind() == Kind::Simple
    }
    pub fn is_text(&self) -> bool {
        self.kind() == Kind::Text
    }
    pub fn is_complex(&self) -> bool {
        self.kind() == Kind::Complex
    }
    pub fn is_sequence(&self) -> bool {
        self.kind() == Kind::Sequence
    }
    pub fn is_typed_pointer(&self) -> bool {
        self.kind() == Kind::TypedPointer
    }

    /// The primitive kind of a `Simple` node, or `None` if this node
    /// (after reference stripping) isn't `Simple`.
    pub fn primitive(&self) -> Option<Primitive> {
        match self.resolve().data().kind {
            NodeKind::Simple(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn child(&self, id: NodeId) -> NodeHandle {
        self.with_id(id)
    }

    /// Byte offsets cached on this node (populated for `Complex` fields and
    /// the `Sequence` header's three slots; empty otherwise). Does not
    /// resolve references — callers go through `resolve()` first.
    pub(crate) fn offsets_ref(&self) -> &[u32] {
        &self.data().offsets
    }
}

/// A name → type lookup table consulted first during reference resolution,
/// ahead of a node's own nested declarations and its ancestors'
/// (`spec.md` §4.3). Typically a previously parsed tree's named nodes.
pub trait ReferenceScope {
    fn lookup(&self, name: &str) -> Option<NodeHandle>;
}

impl ReferenceScope for [(&str, NodeHandle)] {
    fn lookup(&self, name: &str) -> Option<NodeHandle> {
        self.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, h)| h.clone())
    }
}

impl ReferenceScope for Vec<(String, NodeHandle)> {
    fn lookup(&self, name: &str) -> Option<NodeHandle> {
        self.iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| h.clone())
    }
}
