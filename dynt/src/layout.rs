//! The Layout Engine proper: thin helpers over the offsets the parser
//! already computed eagerly (via the [`crate::abi::AbiOracle`]) and cached
//! on each [`crate::node::NodeData`].
//!
//! Keeping this separate from `abi` mirrors the original's split between
//! `ffi_type` composition (the oracle) and the `dynType_getOffset` walk
//! that reads back the composed offsets (this module).

use crate::node::{Kind, NodeHandle};

/// Byte offset of field `index` within a `Complex` node, or `None` if the
/// node isn't `Complex` or the index is out of range. A node's `Kind` is
/// checked explicitly rather than inferred from the length of its cached
/// `offsets` — a 3-field `Complex` and a `Sequence` header both cache
/// exactly three offsets, so length alone can't tell them apart.
pub(crate) fn field_offset(node: &NodeHandle, index: usize) -> Option<u32> {
    let node = node.resolve();
    if node.kind() != Kind::Complex {
        return None;
    }
    node.offsets_ref().get(index).copied()
}

/// The three fixed offsets (`cap`, `len`, `buf`) of a `Sequence` node's
/// header, or `None` if the node isn't `Sequence`.
pub(crate) fn sequence_offsets(node: &NodeHandle) -> Option<[u32; 3]> {
    let node = node.resolve();
    if node.kind() != Kind::Sequence {
        return None;
    }
    let offs = node.offsets_ref();
    debug_assert_eq!(offs.len(), 3, "a Sequence header always has three offsets");
    Some([offs[0], offs[1], offs[2]])
}
