//! Type construction.
//!
//! Every [`TypeRef`] the builder hands out is created by one of the factories in this module,
//! which intern the node in the builder's pool. They are called by the decoder while it walks
//! a demangle tree, and may also be called directly by embedders that synthesize types.
//!
//! Sugared forms (type aliases, optionals, arrays, dictionaries, parentheses and dynamic
//! `Self`) are never constructed; their factories return `None`.

use tracing::debug;

use crate::{
    builder::{subst::GenericArgumentMap, TypeRefBuilder},
    demangle::{Node, NodeKind},
    typeref::{
        FunctionConvention, FunctionParam, FunctionTypeFlags, ReferenceOwnership, TypeRef,
        TypeRefId,
    },
    Result,
};

/// A protocol named by a composition or a dependent member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolDecl {
    /// Mangled name for Swift protocols, runtime name for Objective-C protocols
    pub name: String,
    /// Whether this is an Objective-C protocol
    pub is_objc: bool,
}

/// The representation of a lowered function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ImplFunctionRepresentation {
    /// Native function with a context
    Thick,
    /// Objective-C block
    Block,
    /// Native function without a context
    Thin,
    /// C function pointer
    CFunctionPointer,
    /// Method
    Method,
    /// Objective-C method
    ObjCMethod,
    /// Protocol witness
    WitnessMethod,
    /// Closure
    Closure,
}

impl ImplFunctionRepresentation {
    /// The convention a function of this representation is described with.
    #[must_use]
    pub fn convention(self) -> FunctionConvention {
        match self {
            ImplFunctionRepresentation::Thick | ImplFunctionRepresentation::Closure => {
                FunctionConvention::Swift
            }
            ImplFunctionRepresentation::Thin
            | ImplFunctionRepresentation::Method
            | ImplFunctionRepresentation::ObjCMethod
            | ImplFunctionRepresentation::WitnessMethod => FunctionConvention::Thin,
            ImplFunctionRepresentation::CFunctionPointer => FunctionConvention::CFunctionPointer,
            ImplFunctionRepresentation::Block => FunctionConvention::Block,
        }
    }

    /// Parse the text of an `@convention(...)` attribute.
    #[must_use]
    pub fn from_convention_attribute(text: &str) -> Option<Self> {
        let name = text
            .strip_prefix("@convention(")
            .and_then(|rest| rest.strip_suffix(')'))?;
        Some(match name {
            "thick" => ImplFunctionRepresentation::Thick,
            "block" => ImplFunctionRepresentation::Block,
            "thin" => ImplFunctionRepresentation::Thin,
            "c" => ImplFunctionRepresentation::CFunctionPointer,
            "method" => ImplFunctionRepresentation::Method,
            "objc_method" => ImplFunctionRepresentation::ObjCMethod,
            "witness_method" => ImplFunctionRepresentation::WitnessMethod,
            "closure" => ImplFunctionRepresentation::Closure,
            _ => return None,
        })
    }
}

impl<'a> TypeRefBuilder<'a> {
    /// The declaration name of a nominal node: its canonical mangling.
    #[must_use]
    pub fn create_type_decl(&self, node: &Node) -> Option<String> {
        self.demangler.mangle_node(node)
    }

    /// A declaration known only by its mangled name.
    #[must_use]
    pub fn create_type_decl_from_name(&self, mangled_name: &str) -> String {
        mangled_name.to_owned()
    }

    /// The declaration of a Swift protocol node.
    #[must_use]
    pub fn create_protocol_decl(&self, node: &Node) -> Option<ProtocolDecl> {
        Some(ProtocolDecl {
            name: self.demangler.mangle_node(node)?,
            is_objc: false,
        })
    }

    /// The declaration of an Objective-C protocol.
    #[must_use]
    pub fn create_objc_protocol_decl(&self, name: &str) -> ProtocolDecl {
        ProtocolDecl {
            name: name.to_owned(),
            is_objc: true,
        }
    }

    /// A compiler builtin.
    ///
    /// `builtin_name` is the readable name (`Builtin.Int64`), which only shows up in logs; the
    /// type is identified by `mangled_name`.
    pub fn create_builtin_type(&mut self, builtin_name: &str, mangled_name: &str) -> TypeRefId {
        let id = self.intern(TypeRef::Builtin {
            mangled_name: mangled_name.to_owned(),
        });
        debug!(builtin_name, mangled_name, id = id.index(), "builtin type");
        id
    }

    /// A nominal type, nested in `parent` if given.
    pub fn create_nominal_type(&mut self, decl: &str, parent: Option<TypeRefId>) -> TypeRefId {
        self.intern(TypeRef::Nominal {
            mangled_name: decl.to_owned(),
            parent,
        })
    }

    /// A generic nominal type applied to `args`.
    pub fn create_bound_generic_type(
        &mut self,
        decl: &str,
        args: &[TypeRefId],
        parent: Option<TypeRefId>,
    ) -> TypeRefId {
        self.intern(TypeRef::BoundGeneric {
            mangled_name: decl.to_owned(),
            generic_params: args.to_vec(),
            parent,
        })
    }

    /// A tuple of `elements`.
    pub fn create_tuple_type(&mut self, elements: &[TypeRefId], is_variadic: bool) -> TypeRefId {
        self.intern(TypeRef::Tuple {
            elements: elements.to_vec(),
            is_variadic,
        })
    }

    /// A function type.
    pub fn create_function_type(
        &mut self,
        params: &[FunctionParam],
        result: TypeRefId,
        flags: FunctionTypeFlags,
    ) -> TypeRefId {
        self.intern(TypeRef::Function {
            parameters: params.to_vec(),
            result,
            flags,
        })
    }

    /// A lowered function type.
    ///
    /// Only the calling convention survives; parameters, results and yields of the lowered
    /// signature are dropped and the result is described as the empty tuple.
    pub fn create_impl_function_type(&mut self, representation: ImplFunctionRepresentation) -> TypeRefId {
        let result = self.create_tuple_type(&[], false);
        let flags = FunctionTypeFlags {
            convention: representation.convention(),
            ..FunctionTypeFlags::default()
        };
        self.create_function_type(&[], result, flags)
    }

    /// An existential over `protocols`.
    ///
    /// Protocols that could not be resolved are passed as `None` and left out.
    pub fn create_protocol_composition_type(
        &mut self,
        protocols: &[Option<ProtocolDecl>],
        superclass: Option<TypeRefId>,
        is_class_bound: bool,
    ) -> TypeRefId {
        let protocols = protocols
            .iter()
            .flatten()
            .map(|protocol| {
                if protocol.is_objc {
                    self.create_objc_protocol_type(&protocol.name)
                } else {
                    self.create_nominal_type(&protocol.name, None)
                }
            })
            .collect();

        self.intern(TypeRef::ProtocolComposition {
            protocols,
            superclass,
            has_explicit_any_object: is_class_bound,
        })
    }

    /// The metatype of `instance`.
    pub fn create_metatype_type(&mut self, instance: TypeRefId, was_abstract: bool) -> TypeRefId {
        self.intern(TypeRef::Metatype {
            instance,
            was_abstract,
        })
    }

    /// The metatype of an existential.
    pub fn create_existential_metatype_type(&mut self, instance: TypeRefId) -> TypeRefId {
        self.intern(TypeRef::ExistentialMetatype { instance })
    }

    /// The generic parameter at (`depth`, `index`).
    pub fn create_generic_type_parameter_type(&mut self, depth: u32, index: u32) -> TypeRefId {
        self.intern(TypeRef::GenericTypeParameter { depth, index })
    }

    /// The associated type `member` of `base` declared by `protocol`.
    ///
    /// Returns `None` without a protocol or for an Objective-C protocol, which cannot declare
    /// associated types.
    pub fn create_dependent_member_type(
        &mut self,
        member: &str,
        base: TypeRefId,
        protocol: Option<&ProtocolDecl>,
    ) -> Option<TypeRefId> {
        let protocol = protocol.filter(|protocol| !protocol.is_objc)?;
        Some(self.intern(TypeRef::DependentMember {
            member: member.to_owned(),
            base,
            protocol: protocol.name.clone(),
        }))
    }

    /// A `weak` reference to `base`.
    pub fn create_weak_storage_type(&mut self, base: TypeRefId) -> TypeRefId {
        self.intern(TypeRef::ReferenceStorage {
            ownership: ReferenceOwnership::Weak,
            base,
        })
    }

    /// An `unowned` reference to `base`.
    pub fn create_unowned_storage_type(&mut self, base: TypeRefId) -> TypeRefId {
        self.intern(TypeRef::ReferenceStorage {
            ownership: ReferenceOwnership::Unowned,
            base,
        })
    }

    /// An `unowned(unsafe)` reference to `base`.
    pub fn create_unmanaged_storage_type(&mut self, base: TypeRefId) -> TypeRefId {
        self.intern(TypeRef::ReferenceStorage {
            ownership: ReferenceOwnership::Unmanaged,
            base,
        })
    }

    /// A heap box of `boxed`.
    pub fn create_sil_box_type(&mut self, boxed: TypeRefId) -> TypeRefId {
        self.intern(TypeRef::SilBox { boxed })
    }

    /// An Objective-C class.
    pub fn create_objc_class_type(&mut self, name: &str) -> TypeRefId {
        self.intern(TypeRef::ObjCClass {
            name: name.to_owned(),
        })
    }

    /// An Objective-C class whose name is unknown.
    pub fn unnamed_objc_class_type(&mut self) -> TypeRefId {
        self.create_objc_class_type("")
    }

    /// A lightweight generic Objective-C class. The arguments are erased at runtime and dropped.
    pub fn create_bound_generic_objc_class_type(&mut self, name: &str, _args: &[TypeRefId]) -> TypeRefId {
        self.create_objc_class_type(name)
    }

    /// An Objective-C protocol.
    pub fn create_objc_protocol_type(&mut self, name: &str) -> TypeRefId {
        self.intern(TypeRef::ObjCProtocol {
            name: name.to_owned(),
        })
    }

    /// A foreign class.
    pub fn create_foreign_class_type(&mut self, name: &str) -> TypeRefId {
        self.intern(TypeRef::ForeignClass {
            name: name.to_owned(),
        })
    }

    /// A foreign class whose name is unknown.
    pub fn unnamed_foreign_class_type(&mut self) -> TypeRefId {
        self.create_foreign_class_type("")
    }

    /// The opaque type.
    pub fn opaque_type(&mut self) -> TypeRefId {
        self.intern(TypeRef::Opaque)
    }

    /// Type aliases are sugar and never constructed.
    pub fn create_type_alias_type(&mut self, _decl: &str, _parent: Option<TypeRefId>) -> Option<TypeRefId> {
        None
    }

    /// `T?` is sugar and never constructed.
    pub fn create_optional_type(&mut self, _base: TypeRefId) -> Option<TypeRefId> {
        None
    }

    /// `[T]` is sugar and never constructed.
    pub fn create_array_type(&mut self, _base: TypeRefId) -> Option<TypeRefId> {
        None
    }

    /// `[K: V]` is sugar and never constructed.
    pub fn create_dictionary_type(&mut self, _key: TypeRefId, _value: TypeRefId) -> Option<TypeRefId> {
        None
    }

    /// `(T)` is sugar and never constructed.
    pub fn create_paren_type(&mut self, _base: TypeRefId) -> Option<TypeRefId> {
        None
    }

    /// Dynamic `Self` is never constructed.
    pub fn create_dynamic_self_type(&mut self, _base: TypeRefId) -> Option<TypeRefId> {
        None
    }

    /// Look through an opaque type to its underlying type.
    ///
    /// `descriptor` must be the [`NodeKind::OpaqueTypeDescriptorSymbolicReference`] node
    /// produced by symbolic reference resolution, `generic_args` the arguments of each generic
    /// level of the opaque type's context (outermost first) and `ordinal` the index of the
    /// requested underlying type. Returns `None` for any other descriptor, without a metadata
    /// reader, or when the reader cannot produce the underlying type.
    ///
    /// # Errors
    /// Propagates decoding and substitution errors of the underlying type.
    pub fn resolve_opaque_type(
        &mut self,
        descriptor: &Node,
        generic_args: &[Vec<TypeRefId>],
        ordinal: u32,
    ) -> Result<Option<TypeRefId>> {
        if descriptor.kind() != NodeKind::OpaqueTypeDescriptorSymbolicReference {
            return Ok(None);
        }
        let (Some(reader), Some(address)) = (self.reader.as_deref(), descriptor.index()) else {
            return Ok(None);
        };
        let Some(underlying) = reader.read_underlying_type_for_opaque_type_descriptor(address, ordinal)
        else {
            return Ok(None);
        };

        let Some(underlying) = self.decode_mangled_type(&underlying)? else {
            return Ok(None);
        };

        let mut substitutions = GenericArgumentMap::new();
        for (depth, args) in (0u32..).zip(generic_args) {
            for (index, arg) in (0u32..).zip(args) {
                substitutions.insert((depth, index), *arg);
            }
        }

        debug!(
            descriptor = format_args!("{address:#x}"),
            ordinal,
            "resolved opaque type"
        );
        self.substitute(underlying, &substitutions).map(Some)
    }
}
