//! Accessors: allocate value blobs sized and aligned to a type node, then
//! navigate and mutate them by field/element index.
//!
//! A value blob is a flat, zero-initialized byte buffer whose layout
//! matches what the ABI Oracle computed for its node — this is what makes
//! it safe to hand to native code expecting the same C layout. `Sequence`
//! and `Text` nodes own a second, separately allocated buffer reached
//! through a raw pointer stored inline in the blob (mirroring the
//! original's `calloc`'d `buf` and `strdup`'d text pointer); that second
//! allocation is why `destroy_value` has to walk the type tree alongside
//! the bytes rather than just dropping a `Vec`.
//!
//! Non-goal (unchanged from the distillation): nothing here calls into
//! native code through `libffi` or similar — the oracle only supplies
//! sizes and alignments, never function pointers.

use std::ffi::{CStr, CString};
use std::mem::size_of;

use crate::error::{Error, Result};
use crate::logger::{log, Level, Logger};
use crate::node::{Kind, NodeHandle, NodeKind};

/// An allocated value blob, sized and aligned to the node it was
/// allocated from. Dropping it without calling
/// [`NodeHandle::destroy_value`] first leaks any `Sequence`/`Text`
/// buffers it owns — `destroy_value` is the only supported teardown path.
#[derive(Debug)]
pub struct Value {
    bytes: Box<[u8]>,
}

impl Value {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn read_u32(blob: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes(blob[offset..offset + 4].try_into().unwrap())
}

fn write_u32(blob: &mut [u8], offset: usize, value: u32) {
    blob[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

fn read_ptr(blob: &[u8], offset: usize) -> *mut u8 {
    let bits = usize::from_ne_bytes(blob[offset..offset + size_of::<usize>()].try_into().unwrap());
    bits as *mut u8
}

fn write_ptr(blob: &mut [u8], offset: usize, ptr: *mut u8) {
    let bits = ptr as usize;
    blob[offset..offset + size_of::<usize>()].copy_from_slice(&bits.to_ne_bytes());
}

impl NodeHandle {
    /// Allocates a zero-initialized value blob sized and aligned to this
    /// node (references are stripped automatically, per reference
    /// transparency — there's no separate "not permitted on a Reference"
    /// failure mode here because a Reference never has its own size).
    pub fn alloc(&self) -> Result<Value> {
        let node = self.resolve();
        let size = node.size() as usize;
        Ok(Value {
            bytes: vec![0u8; size].into_boxed_slice(),
        })
    }

    /// Index of the Complex field named `name`, or `None` if this node
    /// isn't Complex or has no such field. Returning `None` rather than an
    /// error lets callers probe for optional fields cheaply.
    pub fn complex_index_for_name(&self, name: &str) -> Option<usize> {
        let node = self.resolve();
        match &node.data().kind {
            NodeKind::Complex { fields } => fields.iter().position(|(n, _)| &**n == name),
            _ => None,
        }
    }

    /// Number of fields of a Complex node (zero for any other kind).
    pub fn complex_field_count(&self) -> usize {
        let node = self.resolve();
        match &node.data().kind {
            NodeKind::Complex { fields } => fields.len(),
            _ => 0,
        }
    }

    /// Type of Complex field `index`, reference-stripped.
    pub fn complex_field_type(&self, index: usize) -> Option<NodeHandle> {
        let node = self.resolve();
        match &node.data().kind {
            NodeKind::Complex { fields } => {
                fields.get(index).map(|(_, id)| node.child(*id).resolve())
            }
            _ => None,
        }
    }

    fn complex_field_offset(&self, index: usize) -> Option<u32> {
        crate::layout::field_offset(self, index)
    }

    /// Immutable view of Complex field `index` within `blob`.
    pub fn complex_field_loc<'v>(&self, blob: &'v [u8], index: usize) -> Result<&'v [u8]> {
        let offset = self
            .complex_field_offset(index)
            .ok_or_else(|| Error::not_found(format!("field index {index}")))?;
        let field = self
            .complex_field_type(index)
            .expect("an offset implies the field exists");
        let size = field.size() as usize;
        let start = offset as usize;
        blob.get(start..start + size)
            .ok_or_else(|| Error::parse("field location exceeds blob bounds"))
    }

    /// Mutable view of Complex field `index` within `blob`.
    pub fn complex_field_loc_mut<'v>(
        &self,
        blob: &'v mut [u8],
        index: usize,
    ) -> Result<&'v mut [u8]> {
        let offset = self
            .complex_field_offset(index)
            .ok_or_else(|| Error::not_found(format!("field index {index}")))?;
        let field = self
            .complex_field_type(index)
            .expect("an offset implies the field exists");
        let size = field.size() as usize;
        let start = offset as usize;
        blob.get_mut(start..start + size)
            .ok_or_else(|| Error::parse("field location exceeds blob bounds"))
    }

    /// Copies `src` into Complex field `index` of `blob`. Fails if the
    /// field's size doesn't match `src`'s length.
    pub fn complex_set_field(&self, blob: &mut [u8], index: usize, src: &[u8]) -> Result<()> {
        let dst = self.complex_field_loc_mut(blob, index)?;
        if dst.len() != src.len() {
            return Err(Error::parse(format!(
                "field {index} is {} bytes, source is {}",
                dst.len(),
                src.len()
            )));
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Element type of a Sequence node, reference-stripped.
    pub fn sequence_element_type(&self) -> Option<NodeHandle> {
        let node = self.resolve();
        match &node.data().kind {
            NodeKind::Sequence { element } => Some(node.child(*element).resolve()),
            _ => None,
        }
    }

    /// Initializes a Sequence header in `blob` with capacity `cap` and
    /// length zero, allocating the backing element buffer.
    pub fn sequence_alloc(&self, blob: &mut [u8], cap: u32) -> Result<()> {
        let [cap_off, len_off, buf_off] = crate::layout::sequence_offsets(self)
            .ok_or_else(|| Error::parse("sequence_alloc called on a non-Sequence node"))?;
        let elem = self
            .sequence_element_type()
            .expect("a Sequence node always has an element type");
        let elem_size = elem.size() as usize;
        let total = (cap as usize)
            .checked_mul(elem_size)
            .ok_or_else(|| Error::memory("sequence capacity overflows buffer size"))?;
        let buf: Box<[u8]> = vec![0u8; total].into_boxed_slice();
        let ptr = Box::into_raw(buf) as *mut u8;

        write_u32(blob, cap_off as usize, cap);
        write_u32(blob, len_off as usize, 0);
        write_ptr(blob, buf_off as usize, ptr);
        Ok(())
    }

    pub fn sequence_cap(&self, blob: &[u8]) -> Result<u32> {
        let [cap_off, ..] = crate::layout::sequence_offsets(self)
            .ok_or_else(|| Error::parse("sequence_cap called on a non-Sequence node"))?;
        Ok(read_u32(blob, cap_off as usize))
    }

    pub fn sequence_len(&self, blob: &[u8]) -> Result<u32> {
        let [_, len_off, _] = crate::layout::sequence_offsets(self)
            .ok_or_else(|| Error::parse("sequence_len called on a non-Sequence node"))?;
        Ok(read_u32(blob, len_off as usize))
    }

    fn sequence_elem_ptr(&self, blob: &[u8], index: u32, logger: &dyn Logger) -> Result<*mut u8> {
        let [cap_off, len_off, buf_off] = crate::layout::sequence_offsets(self)
            .ok_or_else(|| Error::parse("sequence accessor called on a non-Sequence node"))?;
        let cap = read_u32(blob, cap_off as usize);
        let len = read_u32(blob, len_off as usize);
        if index >= cap {
            return Err(Error::out_of_range(index, cap));
        }
        if index >= len {
            log!(
                logger,
                Level::Warning,
                "sequence index {index} is within capacity {cap} but beyond length {len}"
            );
        }
        let elem = self
            .sequence_element_type()
            .expect("a Sequence node always has an element type");
        let elem_size = elem.size() as usize;
        let base = read_ptr(blob, buf_off as usize);
        Ok(unsafe { base.add(index as usize * elem_size) })
    }

    /// Immutable view of element `index`. Fails with `OutOfRange` only if
    /// `index >= cap`; `index` in `[len, cap)` succeeds but logs a warning.
    pub fn sequence_elem_loc<'v>(
        &self,
        blob: &'v [u8],
        index: u32,
        logger: &dyn Logger,
    ) -> Result<&'v [u8]> {
        let ptr = self.sequence_elem_ptr(blob, index, logger)?;
        let elem_size = self
            .sequence_element_type()
            .expect("a Sequence node always has an element type")
            .size() as usize;
        // SAFETY: `sequence_elem_ptr` checked `index < cap`, and `buf` was
        // allocated by `sequence_alloc` with `cap` contiguous elements of
        // `elem_size` bytes each.
        Ok(unsafe { std::slice::from_raw_parts(ptr, elem_size) })
    }

    /// Mutable view of element `index`; same bounds behavior as
    /// [`NodeHandle::sequence_elem_loc`].
    pub fn sequence_elem_loc_mut<'v>(
        &self,
        blob: &'v mut [u8],
        index: u32,
        logger: &dyn Logger,
    ) -> Result<&'v mut [u8]> {
        let ptr = self.sequence_elem_ptr(blob, index, logger)?;
        let elem_size = self
            .sequence_element_type()
            .expect("a Sequence node always has an element type")
            .size() as usize;
        // SAFETY: see `sequence_elem_loc`; `&'v [u8]` for `blob` is enough
        // to derive the lifetime, the mutable aliasing is the caller's to
        // uphold by not holding two locs into the same sequence at once.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr, elem_size) })
    }

    /// Appends one slot if `len < cap`, bumps `len`, and returns it.
    /// Capacity is never grown implicitly — callers needing more room must
    /// allocate a bigger sequence themselves.
    pub fn sequence_push_slot<'v>(
        &self,
        blob: &'v mut [u8],
        logger: &dyn Logger,
    ) -> Result<&'v mut [u8]> {
        let [cap_off, len_off, _] = crate::layout::sequence_offsets(self)
            .ok_or_else(|| Error::parse("sequence_push_slot called on a non-Sequence node"))?;
        let cap = read_u32(blob, cap_off as usize);
        let len = read_u32(blob, len_off as usize);
        if len >= cap {
            return Err(Error::out_of_range(len, cap));
        }
        write_u32(blob, len_off as usize, len + 1);
        self.sequence_elem_loc_mut(blob, len, logger)
    }

    /// Target type of a TypedPointer node, reference-stripped.
    pub fn typed_pointer_target_type(&self) -> Option<NodeHandle> {
        let node = self.resolve();
        match &node.data().kind {
            NodeKind::TypedPointer { pointee } => Some(node.child(*pointee).resolve()),
            _ => None,
        }
    }

    /// Copies `src` into a Simple value at `loc`. Fails if the sizes
    /// disagree.
    pub fn simple_set(&self, loc: &mut [u8], src: &[u8]) -> Result<()> {
        let size = self.size() as usize;
        if loc.len() != size || src.len() != size {
            return Err(Error::parse(format!(
                "simple_set size mismatch: value is {size} bytes"
            )));
        }
        loc.copy_from_slice(src);
        Ok(())
    }

    /// Duplicates `value` into owned, NUL-terminated storage and stores a
    /// pointer to it at `loc` (a Text value blob is exactly one pointer
    /// wide). Fails if `value` contains an interior NUL.
    pub fn text_init(&self, loc: &mut [u8], value: &str) -> Result<()> {
        let owned = CString::new(value)
            .map_err(|_| Error::parse("text value contains an interior NUL byte"))?;
        let ptr = owned.into_raw() as *mut u8;
        write_ptr(loc, 0, ptr);
        Ok(())
    }

    /// Reads the string previously stored by `text_init` at `loc`.
    pub fn text_read<'v>(&self, loc: &'v [u8]) -> Result<&'v str> {
        let ptr = read_ptr(loc, 0);
        if ptr.is_null() {
            return Err(Error::parse("text value was never initialized"));
        }
        // SAFETY: `ptr` was produced by `CString::into_raw` in `text_init`
        // and hasn't been freed (freeing only happens in `destroy_value`,
        // which consumes the enclosing blob).
        let cstr = unsafe { CStr::from_ptr(ptr as *const std::ffi::c_char) };
        cstr.to_str()
            .map_err(|_| Error::parse("text storage is not valid UTF-8"))
    }

    /// Recursively frees every buffer a value owns — a Sequence's element
    /// buffer, a Text's string storage, and both of those transitively
    /// within nested Complex fields and Sequence elements — then drops the
    /// blob itself.
    ///
    /// The original left this as a stub (`//TODO` in `dynType_free`);
    /// every allocator here (`sequence_alloc`, `text_init`) has a matching
    /// deallocation path below so this can be complete.
    pub fn destroy_value(&self, value: Value) {
        self.destroy_value_bytes(&value.bytes);
    }

    fn destroy_value_bytes(&self, bytes: &[u8]) {
        let node = self.resolve();
        match node.kind() {
            Kind::Simple => {}
            Kind::Text => {
                let ptr = read_ptr(bytes, 0);
                if !ptr.is_null() {
                    // SAFETY: pairs with the `CString::into_raw` in
                    // `text_init`.
                    unsafe { drop(CString::from_raw(ptr as *mut std::ffi::c_char)) };
                }
            }
            Kind::Complex => {
                for i in 0..node.complex_field_count() {
                    if let (Some(field_ty), Ok(loc)) =
                        (node.complex_field_type(i), node.complex_field_loc(bytes, i))
                    {
                        field_ty.destroy_value_bytes(loc);
                    }
                }
            }
            Kind::Sequence => {
                let [cap_off, _, buf_off] = crate::layout::sequence_offsets(&node)
                    .expect("node.kind() confirmed this is Sequence");
                let buf_ptr = read_ptr(bytes, buf_off as usize);
                if !buf_ptr.is_null() {
                    let cap = read_u32(bytes, cap_off as usize);
                    let elem = node
                        .sequence_element_type()
                        .expect("a Sequence node always has an element type");
                    let elem_size = elem.size() as usize;
                    for i in 0..cap as usize {
                        // SAFETY: `buf_ptr` was allocated by
                        // `sequence_alloc` with `cap` contiguous elements
                        // of `elem_size` bytes each.
                        let elem_bytes =
                            unsafe { std::slice::from_raw_parts(buf_ptr.add(i * elem_size), elem_size) };
                        elem.destroy_value_bytes(elem_bytes);
                    }
                    let total = cap as usize * elem_size;
                    // SAFETY: reconstructs exactly the `Box<[u8]>` that
                    // `sequence_alloc` handed to `Box::into_raw`.
                    unsafe {
                        drop(Box::from_raw(std::slice::from_raw_parts_mut(
                            buf_ptr, total,
                        )));
                    }
                }
            }
            Kind::TypedPointer => {
                // This engine never allocates a separate pointee value on
                // a TypedPointer's behalf (the non-goal in spec.md §9
                // excludes an owning "deep pointer" model) — the blob is
                // just a pointer-sized slot, nothing further to free.
            }
        }
    }
}
