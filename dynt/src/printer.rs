//! Deterministic indented dump of a parsed type tree: first every declared
//! (named) type reachable from the root, then the main tree itself.
//!
//! Grounded in the original's two-pass `dynType_printType` /
//! `dynType_printTypes` split, with one addition: a declared type already
//! emitted once (the same node reached through two different fields, say)
//! is never printed twice, tracked by a visited set keyed on `NodeId`.

use std::collections::HashSet;
use std::fmt::{self, Write};
use std::sync::Arc;

use crate::node::{Arena, Kind, NodeHandle, NodeId, NodeKind};

const INDENT: &str = "  ";

/// Writes a human-readable dump of `tree` to `out`.
pub fn print<W: Write>(tree: &Arc<Arena>, out: &mut W) -> fmt::Result {
    let root = tree.root();
    let mut emitted = HashSet::new();
    writeln!(out, "declared types:")?;
    print_declared(&root, out, &mut emitted, 1)?;
    writeln!(out, "main type:")?;
    print_any(root.name(), &root, out, 1)
}

fn print_declared<W: Write>(
    node: &NodeHandle,
    out: &mut W,
    emitted: &mut HashSet<NodeId>,
    depth: usize,
) -> fmt::Result {
    for (_, id) in node.data().nested.iter() {
        let decl = node.child(*id).resolve();
        if !emitted.insert(decl_id(&decl)) {
            continue;
        }
        match decl.kind() {
            Kind::Complex | Kind::Simple => print_any(decl.name(), &decl, out, depth)?,
            _ => {}
        }
    }
    // Recurse into this node's own children to discover declarations
    // nested deeper than this level.
    match &node.data().kind {
        NodeKind::Complex { fields } => {
            for (_, id) in fields {
                print_declared(&node.child(*id), out, emitted, depth)?;
            }
        }
        NodeKind::Sequence { element } => print_declared(&node.child(*element), out, emitted, depth)?,
        NodeKind::TypedPointer { pointee } => {
            print_declared(&node.child(*pointee), out, emitted, depth)?
        }
        _ => {}
    }
    Ok(())
}

fn decl_id(node: &NodeHandle) -> NodeId {
    // `NodeHandle` doesn't expose its id publicly outside the crate; this
    // module is part of the crate so the private field is reachable.
    node.id
}

fn indent<W: Write>(out: &mut W, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_str(INDENT)?;
    }
    Ok(())
}

fn print_any<W: Write>(name: Option<&str>, node: &NodeHandle, out: &mut W, depth: usize) -> fmt::Result {
    let node = node.resolve();
    let label = name.unwrap_or("<anonymous>");
    indent(out, depth)?;
    match node.kind() {
        Kind::Simple => writeln!(
            out,
            "{label}: simple type, descriptor '{}', size {}, align {}",
            node.descriptor() as char,
            node.size(),
            node.align()
        ),
        Kind::Text => writeln!(out, "{label}: text type, size {}, align {}", node.size(), node.align()),
        Kind::Complex => {
            writeln!(
                out,
                "{label}: complex type, size {}, align {}",
                node.size(),
                node.align()
            )?;
            if let NodeKind::Complex { fields } = &node.data().kind {
                for (field_name, id) in fields {
                    print_any(Some(field_name), &node.child(*id), out, depth + 1)?;
                }
            }
            Ok(())
        }
        Kind::Sequence => {
            writeln!(
                out,
                "{label}: sequence type, header size {}, align {}",
                node.size(),
                node.align()
            )?;
            if let NodeKind::Sequence { element } = &node.data().kind {
                print_any(Some("element"), &node.child(*element), out, depth + 1)?;
            }
            Ok(())
        }
        Kind::TypedPointer => {
            writeln!(out, "{label}: typed pointer, size {}, align {}", node.size(), node.align())?;
            if let NodeKind::TypedPointer { pointee } = &node.data().kind {
                print_any(Some("target"), &node.child(*pointee), out, depth + 1)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::NativeAbi;
    use crate::logger::NullLogger;
    use crate::parser::{parse_string, ParseOptions};

    #[test]
    fn prints_nested_complex_without_duplicating_declared_types() {
        let abi = NativeAbi;
        let logger = NullLogger;
        let opts = ParseOptions::new().abi(&abi).logger(&logger);
        let tree = parse_string("Tperson={II age weight};Lperson;", &opts).unwrap();
        let mut out = String::new();
        print(&tree, &mut out).unwrap();
        assert!(out.contains("declared types:"));
        assert!(out.contains("main type:"));
        assert_eq!(out.matches("complex type").count(), 2);
    }
}
