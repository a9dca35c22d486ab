//! The type reference builder.
//!
//! [`TypeRefBuilder`] owns everything needed to turn reflection metadata into [`TypeRef`]s:
//! the registered images, the demangler and metadata reader collaborators, the interning pool
//! and the lookup caches. It is split over several modules:
//!
//! - [`factory`] - one constructor per type kind, the only place new nodes are interned
//! - [`decoder`] - walks demangle trees and calls the factories
//! - `resolver` - resolves symbolic references while a name is demangled
//! - [`subst`] - generic substitution
//! - [`lookup`] - field, builtin, capture, associated type and superclass lookups
//! - [`dump`] - textual dumps of whole sections
//!
//! # Examples
//!
//! ```rust,ignore
//! use reflscope::{Image, TypeRefBuilder};
//!
//! let image = Image::from_file("libSample.dylib".as_ref())?;
//! let mut builder = TypeRefBuilder::new(MyDemangler::default());
//! builder.add_reflection_info(image.reflection_info(0x1_0000_0000)?);
//!
//! let mut out = std::io::stdout();
//! builder.dump_all_sections(&mut out)?;
//! # Ok::<(), reflscope::Error>(())
//! ```

pub mod decoder;
pub mod dump;
pub mod factory;
pub mod lookup;
mod resolver;
pub mod subst;

use std::collections::HashMap;

use tracing::debug;

use crate::{
    config::BuilderConfig,
    demangle::{Demangler, Directness, Node, SymbolicReferenceKind},
    reflection::{records::symbolic_mangled_name, FieldDescriptor, ReflectionInfo},
    remote::{MetadataReader, RemoteRef},
    typeref::{TypeRef, TypeRefDisplay, TypeRefId, TypeRefPool},
    Result,
};

pub use factory::{ImplFunctionRepresentation, ProtocolDecl};
pub use lookup::{ClosureContextInfo, FieldTypeInfo};
pub use subst::GenericArgumentMap;

/// Builds uniqued [`TypeRef`]s from the reflection metadata of registered images.
///
/// A builder is used by one thread at a time; every operation that may intern new types or
/// fill a cache takes `&mut self`. Type handles stay valid for the lifetime of the builder.
pub struct TypeRefBuilder<'a> {
    config: BuilderConfig,
    demangler: Box<dyn Demangler + 'a>,
    reader: Option<Box<dyn MetadataReader + 'a>>,
    pool: TypeRefPool,
    reflection_infos: Vec<ReflectionInfo<'a>>,
    field_type_info_cache: HashMap<String, FieldDescriptor<'a>>,
    first_unprocessed_info: usize,
    associated_type_cache: HashMap<(String, String, String), TypeRefId>,
}

impl<'a> TypeRefBuilder<'a> {
    /// Create a builder with the default configuration and no metadata reader.
    ///
    /// Without a reader every symbolic reference stays unresolved and opaque types cannot be
    /// looked through.
    pub fn new(demangler: impl Demangler + 'a) -> Self {
        TypeRefBuilder {
            config: BuilderConfig::default(),
            demangler: Box::new(demangler),
            reader: None,
            pool: TypeRefPool::new(),
            reflection_infos: Vec::new(),
            field_type_info_cache: HashMap::new(),
            first_unprocessed_info: 0,
            associated_type_cache: HashMap::new(),
        }
    }

    /// Install the reader used to resolve symbolic references and opaque types.
    #[must_use]
    pub fn with_metadata_reader(mut self, reader: impl MetadataReader + 'a) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Register the sections of one more image.
    pub fn add_reflection_info(&mut self, info: ReflectionInfo<'a>) {
        debug!(
            index = self.reflection_infos.len(),
            remote_start = format_args!("{:#x}", info.remote_start_address()),
            "registered reflection info"
        );
        self.reflection_infos.push(info);
    }

    /// The registered images, in registration order.
    #[must_use]
    pub fn reflection_infos(&self) -> &[ReflectionInfo<'a>] {
        &self.reflection_infos
    }

    /// The type behind a handle issued by this builder.
    #[must_use]
    pub fn get(&self, id: TypeRefId) -> Option<&TypeRef> {
        self.pool.get(id)
    }

    /// All types interned so far.
    #[must_use]
    pub fn pool(&self) -> &TypeRefPool {
        &self.pool
    }

    /// The demangler collaborator.
    #[must_use]
    pub fn demangler(&self) -> &dyn Demangler {
        self.demangler.as_ref()
    }

    /// An s-expression rendering of a type.
    #[must_use]
    pub fn display(&self, id: TypeRefId) -> TypeRefDisplay<'_> {
        TypeRefDisplay::new(&self.pool, Some(self.demangler.as_ref()), id)
    }

    pub(crate) fn intern(&mut self, ty: TypeRef) -> TypeRefId {
        self.pool.intern(ty)
    }

    /// Skip the `$s` mangling prefix of a name read from the metadata, if configured.
    pub(crate) fn read_type_ref(&self, reference: RemoteRef<'a>) -> RemoteRef<'a> {
        if self.config.strip_mangling_prefix && reference.local().starts_with(b"$s") {
            if let Ok(stripped) = reference.at_byte_offset(2) {
                return stripped;
            }
        }
        reference
    }

    /// The bytes of the mangled name at `reference`, prefix stripped.
    pub(crate) fn mangled_name_bytes(&self, reference: RemoteRef<'a>) -> Result<&'a [u8]> {
        let reference = self.read_type_ref(reference);
        symbolic_mangled_name(reference.local(), self.config.pointer_size)
    }

    /// Demangle a name, resolving symbolic references against the registered images.
    pub(crate) fn demangle(&self, mangled: &[u8]) -> Option<Node> {
        let infos = self.reflection_infos.as_slice();
        let reader = self.reader.as_deref();
        let mut resolve = |kind: SymbolicReferenceKind,
                           directness: Directness,
                           offset: i32,
                           base: &[u8]| {
            resolver::resolve_symbolic_reference(infos, reader, kind, directness, offset, base)
        };
        self.demangler.demangle_type(mangled, &mut resolve)
    }

    /// Demangle the name at `reference`.
    pub(crate) fn demangle_reference(&self, reference: RemoteRef<'a>) -> Result<Option<Node>> {
        let mangled = self.mangled_name_bytes(reference)?;
        Ok(self.demangle(mangled))
    }

    /// Demangle and decode the name at `reference`.
    pub(crate) fn decode_reference(&mut self, reference: RemoteRef<'a>) -> Result<Option<TypeRefId>> {
        match self.demangle_reference(reference)? {
            Some(node) => self.decode_mangled_type(&node),
            None => Ok(None),
        }
    }
}
