// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # reflscope
//!
//! A cross-platform library for reading the reflection metadata that the Swift compiler emits
//! into ELF and Mach-O images, and for turning it into uniqued type references.
//!
//! The metadata of an image is spread over six sections: field descriptors, associated type
//! witnesses, builtin type layouts, closure capture layouts, and two string pools. `reflscope`
//! locates and iterates those sections, demangles the type names stored in them through a
//! pluggable [`Demangler`], resolves symbolic references through a pluggable
//! [`MetadataReader`], and interns every type it reconstructs into an arena owned by a
//! [`TypeRefBuilder`].
//!
//! ## Features
//!
//! - **Zero-copy section views** - records are read in place from a memory-mapped image
//! - **Uniqued type references** - structurally equal types share one [`TypeRefId`]
//! - **Generic substitution** - including associated type witnesses and superclass chains
//! - **Local and remote images** - every address is tracked both in the local buffer and in
//!   the address space of the inspected process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reflscope::prelude::*;
//!
//! # struct MyDemangler;
//! # impl Demangler for MyDemangler {
//! #     fn demangle_type(&self, _: &[u8], _: &mut reflscope::demangle::SymbolicResolver<'_>) -> Option<Node> { None }
//! #     fn mangle_node(&self, _: &Node) -> Option<String> { None }
//! # }
//! let image = Image::from_file("libSample.so".as_ref())?;
//!
//! let mut builder = TypeRefBuilder::new(MyDemangler);
//! builder.add_reflection_info(image.reflection_info(0x7f00_0000_0000)?);
//!
//! let mut out = std::io::stdout();
//! builder.dump_all_sections(&mut out)?;
//! # Ok::<(), reflscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`reflection`] - section views and descriptor records
//! - [`remote`] - dual local/remote references and the [`MetadataReader`] seam
//! - [`demangle`] - demangle trees and the [`Demangler`] seam
//! - [`typeref`] - the [`TypeRef`] model, its arena and its rendering
//! - [`builder`] - the [`TypeRefBuilder`]: decoding, substitution and lookups
//! - [`config`] - builder limits and target pointer size
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. A truncated section surfaces as
//! [`Error::SectionTooSmall`], which [`Error::is_fatal`] reports as a reason to stop reading
//! the image. Names that cannot be demangled or decoded are not errors: lookups answer
//! `None` for them.
//!
//! ## Logging
//!
//! `reflscope` logs through `tracing`. Registration and cache fills are reported at `debug`,
//! skipped malformed records at `warn`, and symbolic reference resolution at `trace`.
#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use reflscope::prelude::*;
///
/// let image = Image::from_file("libSample.so".as_ref())?;
/// let info = image.reflection_info(0x1000)?;
/// for descriptor in &info.builtin {
///     println!("{} bytes", descriptor?.size);
/// }
/// # Ok::<(), reflscope::Error>(())
/// ```
pub mod prelude;

pub mod builder;
pub mod config;
pub mod demangle;
pub mod reflection;
pub mod remote;
pub mod typeref;

/// `reflscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `reflscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use reflscope::{Error, Image};
///
/// match Image::from_file(std::path::Path::new("libSample.dylib")) {
///     Ok(image) => println!("Loaded {} bytes", image.len()),
///     Err(Error::NotSupported) => println!("Container format not supported"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Image loading and low-level parsing utilities.
///
/// [`Image`] locates the reflection sections of an ELF or Mach-O file. [`Parser`] is the
/// cursor used to decode NUL-terminated names and metadata source strings.
///
/// # Example
///
/// ```rust
/// use reflscope::Parser;
///
/// let mut parser = Parser::new(b"G0B1_\0");
/// assert_eq!(parser.read_cstr()?, b"G0B1_");
/// # Ok::<(), reflscope::Error>(())
/// ```
pub use file::{io::RecordIO, parser::Parser, Backend, Image, ImageFormat};

/// The reflection sections of one image, and where they are located.
pub use reflection::{ReflectionInfo, ReflectionSections, SectionKind, SectionRange};

/// References that are valid both in the local buffer and in the inspected process.
pub use remote::{ContextDescriptor, ContextDescriptorKind, MetadataReader, RemoteRef};

/// Demangle trees and the demangler collaborator.
pub use demangle::{Demangler, Node, NodeKind};

/// The type reference model.
pub use typeref::{MetadataSource, TypeRef, TypeRefId, TypeRefKind, TypeRefPool};

/// The builder and its query results.
pub use builder::{ClosureContextInfo, FieldTypeInfo, GenericArgumentMap, TypeRefBuilder};

/// Builder configuration.
pub use config::{BuilderConfig, PointerSize};
