//! Uniqued type references.
//!
//! A [`TypeRef`] describes a type structurally: a nominal type by its mangled name, a tuple by
//! its elements, a function by its parameters and result, and so on. Child types are referred
//! to by [`TypeRefId`], a handle into the [`TypeRefPool`] of the builder that created them.
//!
//! The pool interns every node: constructing the same type twice yields the same handle, so
//! comparing two handles compares the types they stand for. Handles are only meaningful for
//! the builder that issued them.
//!
//! Syntactic sugar (optionals, arrays, dictionaries, type aliases, parentheses) has no
//! representation; the builder refuses to construct it.

mod display;
mod pool;
mod source;

use bitflags::bitflags;
use strum::{Display, EnumIter};

pub use display::TypeRefDisplay;
pub use pool::TypeRefPool;
pub use source::MetadataSource;

/// Handle to an interned [`TypeRef`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct TypeRefId(u32);

impl TypeRefId {
    /// Get the raw index (for debugging)
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Ownership qualifier of a reference storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ReferenceOwnership {
    /// `weak`
    #[strum(serialize = "weak")]
    Weak,
    /// `unowned`
    #[strum(serialize = "unowned")]
    Unowned,
    /// `unowned(unsafe)`
    #[strum(serialize = "unmanaged")]
    Unmanaged,
}

/// Calling convention of a function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum FunctionConvention {
    /// Native thick function with a context
    #[default]
    Swift,
    /// Objective-C block
    Block,
    /// Native function without a context
    Thin,
    /// Plain C function pointer
    CFunctionPointer,
}

/// Flags of a function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionTypeFlags {
    /// Calling convention
    pub convention: FunctionConvention,
    /// Whether the function can throw
    pub throws: bool,
    /// Whether the function may escape the scope it was passed to
    pub escaping: bool,
}

impl Default for FunctionTypeFlags {
    fn default() -> Self {
        FunctionTypeFlags {
            convention: FunctionConvention::Swift,
            throws: false,
            escaping: true,
        }
    }
}

bitflags! {
    /// Ownership and attribute flags of a function parameter
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, Default)]
    pub struct ParameterFlags: u8 {
        /// `inout`
        const INOUT = 0x01;
        /// `__shared`
        const SHARED = 0x02;
        /// `__owned`
        const OWNED = 0x04;
        /// Variadic `T...`
        const VARIADIC = 0x08;
        /// `@autoclosure`
        const AUTOCLOSURE = 0x10;
    }
}

/// One parameter of a function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionParam {
    /// Argument label
    pub label: Option<String>,
    /// Parameter type
    pub ty: TypeRefId,
    /// Parameter flags
    pub flags: ParameterFlags,
}

impl FunctionParam {
    /// An unlabeled parameter without flags.
    #[must_use]
    pub fn new(ty: TypeRefId) -> Self {
        FunctionParam {
            label: None,
            ty,
            flags: ParameterFlags::empty(),
        }
    }
}

/// A structurally described type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A compiler builtin such as `Builtin.Int64`, named by its mangling (e.g. `Bi64_`)
    Builtin {
        /// Mangled name
        mangled_name: String,
    },
    /// A struct, class, enum, protocol or alias declaration without generic arguments
    Nominal {
        /// Mangled name of the declaration
        mangled_name: String,
        /// The enclosing type of a nested declaration
        parent: Option<TypeRefId>,
    },
    /// A generic nominal type applied to arguments
    BoundGeneric {
        /// Mangled name of the unbound declaration
        mangled_name: String,
        /// Generic arguments, outermost first
        generic_params: Vec<TypeRefId>,
        /// The enclosing type of a nested declaration
        parent: Option<TypeRefId>,
    },
    /// A tuple; element labels are not part of the identity
    Tuple {
        /// Element types in order
        elements: Vec<TypeRefId>,
        /// Whether the last element is variadic
        is_variadic: bool,
    },
    /// A function type
    Function {
        /// Parameters in order
        parameters: Vec<FunctionParam>,
        /// Result type
        result: TypeRefId,
        /// Convention and effects
        flags: FunctionTypeFlags,
    },
    /// An existential of zero or more protocols, optionally class-bound
    ProtocolComposition {
        /// The protocols
        protocols: Vec<TypeRefId>,
        /// Superclass constraint
        superclass: Option<TypeRefId>,
        /// Whether the composition includes `AnyObject`
        has_explicit_any_object: bool,
    },
    /// The metatype of a type
    Metatype {
        /// Instance type
        instance: TypeRefId,
        /// Whether the metatype representation was spelled out explicitly
        was_abstract: bool,
    },
    /// The metatype of an existential
    ExistentialMetatype {
        /// Instance type
        instance: TypeRefId,
    },
    /// A generic parameter, addressed by its depth and index
    GenericTypeParameter {
        /// Nesting depth of the generic signature
        depth: u32,
        /// Index within that signature
        index: u32,
    },
    /// An associated type of a generic parameter, such as `T.Element`
    DependentMember {
        /// Associated type name
        member: String,
        /// The type the member is projected from
        base: TypeRefId,
        /// Mangled name of the protocol declaring the member
        protocol: String,
    },
    /// A `weak`, `unowned` or `unowned(unsafe)` reference
    ReferenceStorage {
        /// The ownership qualifier
        ownership: ReferenceOwnership,
        /// The referenced type
        base: TypeRefId,
    },
    /// A heap box holding a value of the boxed type
    SilBox {
        /// The boxed type
        boxed: TypeRefId,
    },
    /// An Objective-C class, by its runtime name
    ObjCClass {
        /// Class name
        name: String,
    },
    /// An Objective-C protocol, by its runtime name
    ObjCProtocol {
        /// Protocol name
        name: String,
    },
    /// A foreign (e.g. Core Foundation) class
    ForeignClass {
        /// Mangled name
        name: String,
    },
    /// A type this crate cannot describe
    Opaque,
}

/// Discriminant of a [`TypeRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum TypeRefKind {
    Builtin,
    Nominal,
    BoundGeneric,
    Tuple,
    Function,
    ProtocolComposition,
    Metatype,
    ExistentialMetatype,
    GenericTypeParameter,
    DependentMember,
    ReferenceStorage,
    SilBox,
    ObjCClass,
    ObjCProtocol,
    ForeignClass,
    Opaque,
}

impl TypeRef {
    /// The kind of this type.
    #[must_use]
    pub fn kind(&self) -> TypeRefKind {
        match self {
            TypeRef::Builtin { .. } => TypeRefKind::Builtin,
            TypeRef::Nominal { .. } => TypeRefKind::Nominal,
            TypeRef::BoundGeneric { .. } => TypeRefKind::BoundGeneric,
            TypeRef::Tuple { .. } => TypeRefKind::Tuple,
            TypeRef::Function { .. } => TypeRefKind::Function,
            TypeRef::ProtocolComposition { .. } => TypeRefKind::ProtocolComposition,
            TypeRef::Metatype { .. } => TypeRefKind::Metatype,
            TypeRef::ExistentialMetatype { .. } => TypeRefKind::ExistentialMetatype,
            TypeRef::GenericTypeParameter { .. } => TypeRefKind::GenericTypeParameter,
            TypeRef::DependentMember { .. } => TypeRefKind::DependentMember,
            TypeRef::ReferenceStorage { .. } => TypeRefKind::ReferenceStorage,
            TypeRef::SilBox { .. } => TypeRefKind::SilBox,
            TypeRef::ObjCClass { .. } => TypeRefKind::ObjCClass,
            TypeRef::ObjCProtocol { .. } => TypeRefKind::ObjCProtocol,
            TypeRef::ForeignClass { .. } => TypeRefKind::ForeignClass,
            TypeRef::Opaque => TypeRefKind::Opaque,
        }
    }

    /// The mangled name of a builtin, nominal or bound generic type.
    #[must_use]
    pub fn mangled_name(&self) -> Option<&str> {
        match self {
            TypeRef::Builtin { mangled_name }
            | TypeRef::Nominal { mangled_name, .. }
            | TypeRef::BoundGeneric { mangled_name, .. } => Some(mangled_name),
            _ => None,
        }
    }

    /// The enclosing type of a nominal or bound generic type.
    #[must_use]
    pub fn parent(&self) -> Option<TypeRefId> {
        match self {
            TypeRef::Nominal { parent, .. } | TypeRef::BoundGeneric { parent, .. } => *parent,
            _ => None,
        }
    }

    /// Returns `true` for nominal and bound generic types.
    #[must_use]
    pub fn is_nominal_like(&self) -> bool {
        matches!(self, TypeRef::Nominal { .. } | TypeRef::BoundGeneric { .. })
    }

    /// Handles of the direct children, in declaration order.
    #[must_use]
    pub fn children(&self) -> Vec<TypeRefId> {
        match self {
            TypeRef::Nominal { parent, .. } => parent.iter().copied().collect(),
            TypeRef::BoundGeneric {
                generic_params,
                parent,
                ..
            } => parent.iter().chain(generic_params).copied().collect(),
            TypeRef::Tuple { elements, .. } => elements.clone(),
            TypeRef::Function {
                parameters, result, ..
            } => parameters
                .iter()
                .map(|param| param.ty)
                .chain(std::iter::once(*result))
                .collect(),
            TypeRef::ProtocolComposition {
                protocols,
                superclass,
                ..
            } => protocols.iter().chain(superclass).copied().collect(),
            TypeRef::Metatype { instance, .. } | TypeRef::ExistentialMetatype { instance } => {
                vec![*instance]
            }
            TypeRef::DependentMember { base, .. } | TypeRef::ReferenceStorage { base, .. } => {
                vec![*base]
            }
            TypeRef::SilBox { boxed } => vec![*boxed],
            TypeRef::Builtin { .. }
            | TypeRef::GenericTypeParameter { .. }
            | TypeRef::ObjCClass { .. }
            | TypeRef::ObjCProtocol { .. }
            | TypeRef::ForeignClass { .. }
            | TypeRef::Opaque => Vec::new(),
        }
    }
}
