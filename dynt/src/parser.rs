//! Recursive-descent parser for the descriptor grammar (`spec.md` §4.1).
//!
//! The parser keeps a single mutable cursor (the [`Lexer`]) and a growing
//! arena. Each production reserves one node up front — mirroring the
//! original's `calloc` of a `dyn_type` before its kind is known — then
//! recurses to fill it in. A failed parse simply drops the half-built
//! `Builder`; there's no separate teardown path to get wrong.

use std::io::{Cursor, Read};

use crate::abi::{sequence_header_layout, AbiOracle, Layout, NativeAbi, Primitive};
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::logger::{log, Level, Logger, NullLogger};
use crate::node::{Arena, NodeData, NodeId, NodeKind, RefTarget, ReferenceScope};

static DEFAULT_ABI: NativeAbi = NativeAbi;
static DEFAULT_LOGGER: NullLogger = NullLogger;

/// Options bundle for [`parse_stream`]/[`parse_string`], gathering the
/// name of the root type, an optional external reference scope, and the
/// two injected collaborators (`spec.md` §6).
pub struct ParseOptions<'a> {
    name: Option<&'a str>,
    ext_scope: Option<&'a dyn ReferenceScope>,
    abi: &'a dyn AbiOracle,
    logger: &'a dyn Logger,
}

impl<'a> ParseOptions<'a> {
    pub fn new() -> Self {
        ParseOptions {
            name: None,
            ext_scope: None,
            abi: &DEFAULT_ABI,
            logger: &DEFAULT_LOGGER,
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn ext_scope(mut self, scope: &'a dyn ReferenceScope) -> Self {
        self.ext_scope = Some(scope);
        self
    }

    pub fn abi(mut self, abi: &'a dyn AbiOracle) -> Self {
        self.abi = abi;
        self
    }

    pub fn logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = logger;
        self
    }
}

impl<'a> Default for ParseOptions<'a> {
    fn default() -> Self {
        Self::new()
    }
}

struct Builder<'a> {
    nodes: Vec<NodeData>,
    abi: &'a dyn AbiOracle,
    logger: &'a dyn Logger,
    ext_scope: Option<&'a dyn ReferenceScope>,
}

impl<'a> Builder<'a> {
    fn reserve(&mut self, name: Option<Box<str>>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            name,
            parent,
            nested: Vec::new(),
            descriptor: 0,
            layout: Layout::EMPTY,
            offsets: Vec::new(),
            // Placeholder; every reserved node is overwritten before the
            // parse that created it returns.
            kind: NodeKind::Text,
        });
        id
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    /// Resolves a name from the context of node `start`: external scope
    /// first, then `start`'s own nested declarations, then each ancestor's
    /// in turn (`spec.md` §4.3).
    fn resolve_name(&self, start: NodeId, name: &str) -> Option<RefTarget> {
        if let Some(scope) = self.ext_scope {
            if let Some(handle) = scope.lookup(name) {
                log!(self.logger, Level::Debug, "resolved '{name}' via external scope");
                return Some(RefTarget::Foreign(handle));
            }
        }
        let mut current = Some(start);
        while let Some(id) = current {
            let node = &self.nodes[id.0 as usize];
            if let Some((_, target)) = node.nested.iter().find(|(n, _)| &**n == name) {
                log!(self.logger, Level::Debug, "resolved '{name}' via nested declarations");
                return Some(RefTarget::Local(*target));
            }
            current = node.parent;
        }
        None
    }

    /// The resolved layout of a node still under construction: follows
    /// `Reference`s, since references carry no layout of their own.
    fn resolved_layout(&self, id: NodeId) -> Layout {
        match &self.nodes[id.0 as usize].kind {
            NodeKind::Reference(RefTarget::Local(target)) => self.resolved_layout(*target),
            NodeKind::Reference(RefTarget::Foreign(handle)) => {
                Layout::new(handle.size(), handle.align())
            }
            _ => self.nodes[id.0 as usize].layout,
        }
    }
}

fn parse_any<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, id: NodeId) -> Result<()> {
    let c = lex.expect_byte()?;
    match c {
        b'T' => {
            parse_nested_decl(b, lex, id)?;
            parse_any(b, lex, id)
        }
        b'L' => parse_typed_ref(b, lex, id),
        b'l' => parse_ref_by_value(b, lex, id),
        b'{' => parse_complex(b, lex, id),
        b'[' => parse_sequence(b, lex, id),
        b'*' => parse_typed_pointer(b, lex, id),
        b't' => {
            parse_text(b, id);
            Ok(())
        }
        other => parse_simple(b, other, id),
    }
}

fn parse_nested_decl<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, current: NodeId) -> Result<()> {
    let name = lex.parse_identifier()?;
    lex.expect(b'=')?;
    let child = b.reserve(Some(name.clone()), Some(current));
    b.node_mut(current).nested.push((name, child));
    parse_any(b, lex, child)?;
    lex.expect(b';')?;
    Ok(())
}

fn parse_simple(b: &mut Builder, c: u8, id: NodeId) -> Result<()> {
    let Some(primitive) = Primitive::from_descriptor(c) else {
        log!(b.logger, Level::Error, "unsupported type '{}'", c as char);
        return Err(Error::parse(format!("unsupported type '{}'", c as char)));
    };
    let layout = Layout::new(b.abi.size(primitive), b.abi.align(primitive));
    let node = b.node_mut(id);
    node.descriptor = c;
    node.layout = layout;
    node.kind = NodeKind::Simple(primitive);
    Ok(())
}

fn parse_text(b: &mut Builder, id: NodeId) {
    let layout = Layout::new(b.abi.size(Primitive::Ptr), b.abi.align(Primitive::Ptr));
    let node = b.node_mut(id);
    node.descriptor = b't';
    node.layout = layout;
    node.kind = NodeKind::Text;
}

fn parse_ref_by_value<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, id: NodeId) -> Result<()> {
    let name = lex.parse_identifier()?;
    lex.expect(b';')?;
    let Some(target) = b.resolve_name(id, &name) else {
        log!(b.logger, Level::Error, "cannot find type '{name}'");
        return Err(Error::parse(format!("cannot find type '{name}'")));
    };
    let node = b.node_mut(id);
    node.descriptor = b'l';
    node.kind = NodeKind::Reference(target);
    Ok(())
}

fn parse_typed_ref<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, id: NodeId) -> Result<()> {
    let sub = b.reserve(None, Some(id));
    parse_ref_by_value(b, lex, sub)?;
    let layout = Layout::new(b.abi.size(Primitive::Ptr), b.abi.align(Primitive::Ptr));
    let node = b.node_mut(id);
    node.descriptor = b'L';
    node.layout = layout;
    node.kind = NodeKind::TypedPointer { pointee: sub };
    Ok(())
}

fn parse_typed_pointer<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, id: NodeId) -> Result<()> {
    let sub = b.reserve(None, Some(id));
    parse_any(b, lex, sub)?;
    let layout = Layout::new(b.abi.size(Primitive::Ptr), b.abi.align(Primitive::Ptr));
    let node = b.node_mut(id);
    node.descriptor = b'*';
    node.layout = layout;
    node.kind = NodeKind::TypedPointer { pointee: sub };
    Ok(())
}

fn parse_sequence<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, id: NodeId) -> Result<()> {
    let elem = b.reserve(None, Some(id));
    parse_any(b, lex, elem)?;
    let header = sequence_header_layout(b.abi);
    let node = b.node_mut(id);
    node.descriptor = b'[';
    node.layout = header.layout;
    node.offsets = header.offsets;
    node.kind = NodeKind::Sequence { element: elem };
    Ok(())
}

fn parse_complex<R: Read>(b: &mut Builder, lex: &mut Lexer<R>, id: NodeId) -> Result<()> {
    let mut field_ids = Vec::new();
    let mut c = lex.expect_byte()?;
    while c != b' ' && c != b'}' {
        lex.unread(c);
        let child = b.reserve(None, Some(id));
        parse_any(b, lex, child)?;
        field_ids.push(child);
        c = lex.expect_byte()?;
    }

    let mut names = Vec::with_capacity(field_ids.len());
    if c == b' ' {
        for i in 0..field_ids.len() {
            names.push(lex.parse_identifier()?);
            if i + 1 < field_ids.len() {
                lex.expect(b' ')?;
            }
        }
        lex.expect(b'}')?;
    } else if !field_ids.is_empty() {
        return Err(Error::parse("complex type is missing field names"));
    }

    for (name, field_id) in names.iter().zip(field_ids.iter()) {
        b.node_mut(*field_id).name = Some(name.clone());
    }

    let field_layouts: Vec<Layout> = field_ids.iter().map(|id| b.resolved_layout(*id)).collect();
    let composed = b.abi.compose_struct(&field_layouts);

    let fields: Vec<(Box<str>, NodeId)> = names.into_iter().zip(field_ids).collect();
    let node = b.node_mut(id);
    node.descriptor = b'{';
    node.layout = composed.layout;
    node.offsets = composed.offsets;
    node.kind = NodeKind::Complex { fields };
    Ok(())
}

fn build<R: Read>(lex: &mut Lexer<R>, opts: &ParseOptions) -> Result<Arena> {
    let mut builder = Builder {
        nodes: Vec::new(),
        abi: opts.abi,
        logger: opts.logger,
        ext_scope: opts.ext_scope,
    };
    let root = builder.reserve(opts.name.map(|n| n.into()), None);
    parse_any(&mut builder, lex, root)?;
    Ok(Arena {
        nodes: builder.nodes,
        root,
    })
}

/// Parses a descriptor from any byte stream.
pub fn parse_stream<R: Read>(
    reader: R,
    opts: &ParseOptions,
) -> Result<std::sync::Arc<Arena>> {
    let mut lex = Lexer::new(reader);
    Ok(std::sync::Arc::new(build(&mut lex, opts)?))
}

/// Parses a descriptor from a string. Accepts a trailing NUL or end of
/// input after the type; any other trailing byte is a parse error
/// (`spec.md` §4.1, the `fmemopen`-style convenience variant).
pub fn parse_string(s: &str, opts: &ParseOptions) -> Result<std::sync::Arc<Arena>> {
    let mut lex = Lexer::new(Cursor::new(s.as_bytes()));
    let arena = build(&mut lex, opts)?;
    match lex.next_byte()? {
        None | Some(0) => {}
        Some(c) => {
            log!(opts.logger, Level::Error, "expected EOF got '{}'", c as char);
            return Err(Error::parse(format!("expected EOF got '{}'", c as char)));
        }
    }
    Ok(std::sync::Arc::new(arena))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_i32() {
        let tree = parse_string("I", &ParseOptions::new()).unwrap();
        let root = tree.root();
        assert!(root.is_simple());
        assert_eq!(root.size(), 4);
        assert_eq!(root.align(), 4);
    }

    #[test]
    fn unknown_simple_is_parse_error() {
        let err = parse_string("Q", &ParseOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn unresolved_reference_is_parse_error() {
        let err = parse_string("llmissing;", &ParseOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn unterminated_complex_is_parse_error() {
        let err = parse_string("{Ii a", &ParseOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn trailing_garbage_after_string_is_parse_error() {
        let err = parse_string("Ix", &ParseOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
