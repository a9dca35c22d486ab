//! Symbolic reference resolution.
//!
//! Mangled names in reflection metadata may embed a relative reference to a context
//! descriptor instead of spelling the name out. The demangler hands such references back to
//! the builder, which maps the local position of the reference to its remote address, follows
//! it, and asks the metadata reader to describe what it finds there.

use tracing::trace;

use crate::{
    demangle::{Directness, Node, NodeKind, SymbolicReferenceKind},
    reflection::ReflectionInfo,
    remote::{ContextDescriptorKind, MetadataReader},
};

/// Resolve one symbolic reference, or return `None` if it cannot be resolved.
///
/// `base` are the local bytes starting at the reference's offset field; they must point into
/// one of the registered images.
pub(crate) fn resolve_symbolic_reference(
    infos: &[ReflectionInfo<'_>],
    reader: Option<&dyn MetadataReader>,
    kind: SymbolicReferenceKind,
    directness: Directness,
    offset: i32,
    base: &[u8],
) -> Option<Node> {
    let Some(reader) = reader else {
        trace!(%kind, "no metadata reader, symbolic reference unresolved");
        return None;
    };

    // Accessor functions would have to run in the target.
    if kind == SymbolicReferenceKind::AccessorFunctionReference {
        trace!(offset, "accessor function reference left unresolved");
        return None;
    }

    let Some(base_address) = infos.iter().find_map(|info| info.remote_address_of(base)) else {
        trace!(offset, "symbolic reference outside every registered image");
        return None;
    };

    let mut address = base_address.checked_add_signed(i64::from(offset))?;
    if directness == Directness::Indirect {
        address = reader.read_pointer_value(address)?;
    }

    let descriptor = reader.read_context_descriptor(address)?;
    trace!(
        address = format_args!("{address:#x}"),
        kind = %descriptor.kind,
        "resolved symbolic reference"
    );

    if descriptor.kind == ContextDescriptorKind::OpaqueType {
        return Some(Node::with_index(
            NodeKind::OpaqueTypeDescriptorSymbolicReference,
            descriptor.address,
        ));
    }

    reader.build_context_mangling(&descriptor)
}
