//! Addressable references into target memory and the metadata reader collaborator.
//!
//! Reflection metadata is read from a local copy of an image, but every address embedded in
//! it refers to the image as it is mapped in the target process. A [`RemoteRef`] pairs a
//! position inside the local buffer with the address the same byte has in the target, and
//! keeps both in lock-step when it is offset.
//!
//! # Key Components
//!
//! - [`RemoteRef`] - A borrowed position in local bytes plus its remote address
//! - [`MetadataReader`] - Reads pointers and context descriptors from the target
//! - [`ContextDescriptor`] - A context descriptor located in the target
//!
//! # Examples
//!
//! ```rust
//! use reflscope::RemoteRef;
//!
//! // A relative pointer at offset 0 pointing 8 bytes forward
//! let bytes = [0x08, 0, 0, 0, 0, 0, 0, 0, b'S', b'i', 0];
//! let base = RemoteRef::new(0x1000, &bytes);
//!
//! let target = base.resolve_relative(0)?.expect("non-zero offset");
//! assert_eq!(target.address(), 0x1008);
//! assert_eq!(target.local()[0], b'S');
//! # Ok::<(), reflscope::Error>(())
//! ```

use std::fmt;

use strum::{Display, EnumIter};

use crate::{
    demangle::Node,
    file::io::{read_le_at, RecordIO},
    Result,
};

/// A reference to a byte inside a locally available copy of target memory.
///
/// `address` is the address of `buffer[offset]` in the target process. The reference does not
/// own memory; it borrows the image buffer it was carved from.
#[derive(Clone, Copy)]
pub struct RemoteRef<'a> {
    address: u64,
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> RemoteRef<'a> {
    /// Create a reference to the first byte of `buffer`, which lives at `address` in the target.
    #[must_use]
    pub fn new(address: u64, buffer: &'a [u8]) -> Self {
        RemoteRef {
            address,
            buffer,
            offset: 0,
        }
    }

    /// Create a reference to `buffer[offset]`, where `buffer[0]` lives at `base_address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` lies beyond the buffer or the remote
    /// address overflows.
    pub fn from_bytes(base_address: u64, buffer: &'a [u8], offset: usize) -> Result<Self> {
        if offset > buffer.len() {
            return Err(out_of_bounds_error!());
        }

        let Some(address) = base_address.checked_add(offset as u64) else {
            return Err(out_of_bounds_error!());
        };

        Ok(RemoteRef {
            address,
            buffer,
            offset,
        })
    }

    /// The remote address of the referenced byte.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// The local bytes starting at the referenced byte, up to the end of the enclosing buffer.
    #[must_use]
    pub fn local(&self) -> &'a [u8] {
        &self.buffer[self.offset..]
    }

    /// Local address of the referenced byte, used to map local pointers back to images.
    #[must_use]
    pub fn local_address(&self) -> usize {
        self.local().as_ptr() as usize
    }

    /// The enclosing buffer this reference was carved from.
    #[must_use]
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns a reference moved by `delta` bytes, local and remote alike.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the result would leave the enclosing buffer.
    pub fn at_byte_offset(&self, delta: i64) -> Result<RemoteRef<'a>> {
        let Some(offset) = (self.offset as i64)
            .checked_add(delta)
            .and_then(|o| usize::try_from(o).ok())
        else {
            return Err(out_of_bounds_error!());
        };
        if offset > self.buffer.len() {
            return Err(out_of_bounds_error!());
        }

        let Some(address) = self.address.checked_add_signed(delta) else {
            return Err(out_of_bounds_error!());
        };

        Ok(RemoteRef {
            address,
            buffer: self.buffer,
            offset,
        })
    }

    /// Read a little-endian value located `at` bytes after the referenced byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the buffer.
    pub fn read_le<T: RecordIO>(&self, at: usize) -> Result<T> {
        let mut offset = at;
        read_le_at::<T>(self.local(), &mut offset)
    }

    /// Resolve the self-relative `i32` pointer stored `field_offset` bytes after this reference.
    ///
    /// The pointer is relative to the address of the field itself. A stored value of zero means
    /// the pointee is absent and yields `Ok(None)`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field cannot be read or the pointee lies
    /// outside the enclosing buffer.
    pub fn resolve_relative(&self, field_offset: usize) -> Result<Option<RemoteRef<'a>>> {
        let relative: i32 = self.read_le(field_offset)?;
        if relative == 0 {
            return Ok(None);
        }

        let field = self.at_byte_offset(field_offset as i64)?;
        Ok(Some(field.at_byte_offset(i64::from(relative))?))
    }
}

impl PartialEq for RemoteRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.local_address() == other.local_address()
    }
}

impl Eq for RemoteRef<'_> {}

impl fmt::Debug for RemoteRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRef")
            .field("address", &format_args!("{:#x}", self.address))
            .field("offset", &self.offset)
            .finish()
    }
}

/// The kind of a context descriptor, taken from the low bits of its flags word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum ContextDescriptorKind {
    Module = 0,
    Extension = 1,
    Anonymous = 2,
    Protocol = 3,
    OpaqueType = 4,
    Class = 16,
    Struct = 17,
    Enum = 18,
}

impl ContextDescriptorKind {
    /// Decode the kind stored in the low five bits of a context descriptor's flags.
    #[must_use]
    pub fn from_flags(flags: u32) -> Option<Self> {
        Some(match flags & 0x1F {
            0 => ContextDescriptorKind::Module,
            1 => ContextDescriptorKind::Extension,
            2 => ContextDescriptorKind::Anonymous,
            3 => ContextDescriptorKind::Protocol,
            4 => ContextDescriptorKind::OpaqueType,
            16 => ContextDescriptorKind::Class,
            17 => ContextDescriptorKind::Struct,
            18 => ContextDescriptorKind::Enum,
            _ => return None,
        })
    }
}

/// A context descriptor read from target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextDescriptor {
    /// Remote address of the descriptor
    pub address: u64,
    /// What kind of declaration the descriptor describes
    pub kind: ContextDescriptorKind,
}

/// Reads runtime metadata from the target address space.
///
/// Implemented by the embedder: a debugger reads from a live process, an offline tool from a
/// core file or from the image itself. Every method returns `None` when the target memory is
/// unreadable; the builder treats that as an unresolved reference.
pub trait MetadataReader {
    /// Read a pointer-sized value at `address`.
    fn read_pointer_value(&self, address: u64) -> Option<u64>;

    /// Read the context descriptor at `address`.
    fn read_context_descriptor(&self, address: u64) -> Option<ContextDescriptor>;

    /// Build the demangle tree naming the declaration a context descriptor describes.
    fn build_context_mangling(&self, descriptor: &ContextDescriptor) -> Option<Node>;

    /// Produce the demangle tree of the underlying type of an opaque type.
    ///
    /// `descriptor` is the remote address of the opaque type descriptor and `ordinal` selects
    /// which of its underlying types is requested. Readers that cannot look inside opaque
    /// types keep the default.
    fn read_underlying_type_for_opaque_type_descriptor(
        &self,
        descriptor: u64,
        ordinal: u32,
    ) -> Option<Node> {
        let _ = (descriptor, ordinal);
        None
    }
}
