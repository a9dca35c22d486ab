//! Demangle trees and the demangler collaborator.
//!
//! Decoding a mangled name into a tree is the job of an external [`Demangler`]. This module
//! only defines the tree shape both sides agree on, [`Node`], and the callback through which
//! the demangler asks the builder to resolve symbolic references.
//!
//! # Node shape
//!
//! A type is always wrapped in a [`NodeKind::Type`] node. The children of the common kinds:
//!
//! | Kind | Children |
//! |---|---|
//! | `Structure`, `Class`, `Enum`, `Protocol`, `TypeAlias` | context (`Module` or a nominal type), `Identifier` |
//! | `BoundGenericStructure` and siblings | `Type` (the unbound nominal), `TypeList` |
//! | `Tuple` | `TupleElement`s, each with an optional `TupleElementName`, optional `VariadicMarker` and a `Type` |
//! | `FunctionType` and siblings | optional `ThrowsAnnotation`, `ArgumentTuple`, `ReturnType` |
//! | `ProtocolList` | `TypeList` of protocols |
//! | `Metatype` | optional `MetatypeRepresentation`, `Type` |
//! | `DependentGenericParamType` | `Index` depth, `Index` index |
//! | `DependentMemberType` | `Type` base, `DependentAssociatedTypeRef` |
//! | `OpaqueType` | descriptor, `Index` ordinal, `TypeList` of `TypeList`s |
//!
//! # Examples
//!
//! ```rust
//! use reflscope::demangle::{Node, NodeKind};
//!
//! // Swift.Int
//! let int = Node::new(NodeKind::Type).with_child(
//!     Node::new(NodeKind::Structure)
//!         .with_child(Node::with_text(NodeKind::Module, "Swift"))
//!         .with_child(Node::with_text(NodeKind::Identifier, "Int")),
//! );
//!
//! assert_eq!(int.child(0).unwrap().kind(), NodeKind::Structure);
//! assert_eq!(int.child(0).unwrap().child(1).unwrap().text(), Some("Int"));
//! ```

use std::fmt;

use strum::{Display, EnumIter};

/// Kinds of demangle tree nodes understood by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum NodeKind {
    Global,
    Type,
    Module,
    Identifier,
    Class,
    Structure,
    Enum,
    Protocol,
    TypeAlias,
    OtherNominalType,
    BoundGenericClass,
    BoundGenericStructure,
    BoundGenericEnum,
    BoundGenericOtherNominalType,
    TypeList,
    Tuple,
    TupleElement,
    TupleElementName,
    VariadicMarker,
    FunctionType,
    NoEscapeFunctionType,
    CFunctionPointer,
    ObjCBlock,
    ThinFunctionType,
    AutoClosureType,
    ArgumentTuple,
    ReturnType,
    ThrowsAnnotation,
    ImplFunctionType,
    ImplConvention,
    ImplFunctionAttribute,
    ProtocolList,
    ProtocolListWithClass,
    ProtocolListWithAnyObject,
    Metatype,
    ExistentialMetatype,
    MetatypeRepresentation,
    DependentGenericParamType,
    DependentMemberType,
    DependentAssociatedTypeRef,
    Weak,
    Unowned,
    Unmanaged,
    SILBoxType,
    InOut,
    Shared,
    Owned,
    BuiltinTypeName,
    SugaredOptional,
    SugaredArray,
    SugaredDictionary,
    SugaredParen,
    DynamicSelf,
    OpaqueType,
    OpaqueTypeDescriptorSymbolicReference,
    Index,
}

impl NodeKind {
    /// Returns `true` for unbound nominal type declarations.
    #[must_use]
    pub fn is_nominal(self) -> bool {
        matches!(
            self,
            NodeKind::Class
                | NodeKind::Structure
                | NodeKind::Enum
                | NodeKind::Protocol
                | NodeKind::TypeAlias
                | NodeKind::OtherNominalType
        )
    }

    /// Returns `true` for bound generic nominal types.
    #[must_use]
    pub fn is_bound_generic(self) -> bool {
        matches!(
            self,
            NodeKind::BoundGenericClass
                | NodeKind::BoundGenericStructure
                | NodeKind::BoundGenericEnum
                | NodeKind::BoundGenericOtherNominalType
        )
    }
}

/// Scalar payload of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Payload {
    /// No payload
    #[default]
    None,
    /// A name or other text
    Text(String),
    /// A number such as a generic depth or a descriptor address
    Index(u64),
}

/// A node of a demangle tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    kind: NodeKind,
    payload: Payload,
    children: Vec<Node>,
}

impl Node {
    /// A node without payload or children.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            payload: Payload::None,
            children: Vec::new(),
        }
    }

    /// A node carrying text.
    #[must_use]
    pub fn with_text(kind: NodeKind, text: impl Into<String>) -> Self {
        Node {
            kind,
            payload: Payload::Text(text.into()),
            children: Vec::new(),
        }
    }

    /// A node carrying a number.
    #[must_use]
    pub fn with_index(kind: NodeKind, index: u64) -> Self {
        Node {
            kind,
            payload: Payload::Index(index),
            children: Vec::new(),
        }
    }

    /// Builder-style [`Node::add_child`].
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append `child`.
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The text payload, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The numeric payload, if any.
    #[must_use]
    pub fn index(&self) -> Option<u64> {
        match self.payload {
            Payload::Index(index) => Some(index),
            _ => None,
        }
    }

    /// All children in order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// Number of children.
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Strip any number of [`NodeKind::Type`] wrappers.
    #[must_use]
    pub fn unwrap_type(&self) -> &Node {
        let mut node = self;
        while node.kind == NodeKind::Type && node.children.len() == 1 {
            node = &node.children[0];
        }
        node
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}kind={}", "", self.kind, indent = depth * 2)?;
        match &self.payload {
            Payload::None => {}
            Payload::Text(text) => write!(f, ", text=\"{text}\"")?,
            Payload::Index(index) => write!(f, ", index={index}")?,
        }
        writeln!(f)?;

        for child in &self.children {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

/// What a symbolic reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SymbolicReferenceKind {
    /// A context descriptor
    Context,
    /// A function that computes the referenced type at runtime
    AccessorFunctionReference,
}

/// Whether the reference targets the entity itself or a pointer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Directness {
    /// The offset leads to the entity
    Direct,
    /// The offset leads to a pointer to the entity
    Indirect,
}

/// Decode the control byte that introduces a symbolic reference.
///
/// Returns `None` for control bytes that do not introduce a reference this crate resolves.
#[must_use]
pub fn symbolic_reference_kind(control: u8) -> Option<(SymbolicReferenceKind, Directness)> {
    match control {
        0x01 => Some((SymbolicReferenceKind::Context, Directness::Direct)),
        0x02 => Some((SymbolicReferenceKind::Context, Directness::Indirect)),
        0x09 => Some((
            SymbolicReferenceKind::AccessorFunctionReference,
            Directness::Direct,
        )),
        _ => None,
    }
}

/// Callback through which a demangler resolves a symbolic reference.
///
/// Arguments are the reference kind, its directness, the signed offset stored in the mangled
/// name, and the local bytes starting at the offset field (the base the offset is relative
/// to). Returns the tree naming the referenced entity, or `None` if it cannot be resolved.
pub type SymbolicResolver<'r> =
    dyn FnMut(SymbolicReferenceKind, Directness, i32, &[u8]) -> Option<Node> + 'r;

/// Turns mangled names into demangle trees and back.
pub trait Demangler {
    /// Demangle a type name.
    ///
    /// `mangled` is a slice of the image buffer, without the terminating NUL. Whenever the
    /// name contains a symbolic reference, the demangler calls `resolver` with the local bytes
    /// of the reference's offset field so the builder can map them back to target memory.
    /// Returns `None` if the name cannot be demangled.
    fn demangle_type(&self, mangled: &[u8], resolver: &mut SymbolicResolver<'_>) -> Option<Node>;

    /// Mangle a tree back into its canonical string, without a mangling prefix.
    fn mangle_node(&self, node: &Node) -> Option<String>;

    /// Human-readable rendering of a tree.
    fn node_to_string(&self, node: &Node) -> String {
        node.to_string()
    }
}
