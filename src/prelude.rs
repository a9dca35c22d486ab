//! # reflscope Prelude
//!
//! The most commonly used types of the library, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all reflscope operations
pub use crate::Error;

/// The result type used throughout reflscope
pub use crate::Result;

/// Limits and target parameters of the builder
pub use crate::{BuilderConfig, PointerSize};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Loaded images and their reflection sections
pub use crate::{Image, ImageFormat, ReflectionInfo, ReflectionSections};

/// Builds uniqued type references from registered images
pub use crate::TypeRefBuilder;

// ================================================================================================
// Collaborators
// ================================================================================================

/// Demangler seam and demangle trees
pub use crate::{Demangler, Node, NodeKind};

/// Access to the memory of the inspected process
pub use crate::{ContextDescriptor, ContextDescriptorKind, MetadataReader, RemoteRef};

// ================================================================================================
// Type References
// ================================================================================================

/// The type model and its handles
pub use crate::{MetadataSource, TypeRef, TypeRefId, TypeRefKind};

/// Query results of the builder
pub use crate::{ClosureContextInfo, FieldTypeInfo, GenericArgumentMap};

/// Descriptor records
pub use crate::reflection::{
    AssociatedTypeDescriptor, BuiltinTypeDescriptor, CaptureDescriptor, FieldDescriptor,
    FieldDescriptorKind, FieldRecord,
};
