//! Descriptor records of the four structured reflection sections.
//!
//! Every record starts with a fixed header read through [`RemoteRef`]. All name fields are
//! self-relative `i32` offsets where zero means the name is absent. Headers that declare a
//! table of entries also declare the stride of one entry, which must be at least as large as
//! the entry layout known to this crate; larger strides leave room for fields added by newer
//! producers and are skipped over.
//!
//! # Layouts
//!
//! | Record | Header | Entry |
//! |---|---|---|
//! | [`FieldDescriptor`] | name, superclass, kind `u16`, stride `u16`, count `u32` | [`FieldRecord`]: flags, type name, field name |
//! | [`AssociatedTypeDescriptor`] | conforming type, protocol, count `u32`, stride `u32` | [`AssociatedTypeRecord`]: name, substituted type |
//! | [`BuiltinTypeDescriptor`] | name, size, alignment and flags, stride, extra inhabitants | - |
//! | [`CaptureDescriptor`] | capture count, source count, binding count | [`CaptureTypeRecord`], then [`MetadataSourceRecord`] |

use std::marker::PhantomData;

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::{
    config::PointerSize,
    file::parser::Parser,
    reflection::{section::SectionRecord, SectionKind},
    remote::RemoteRef,
    Result,
};

/// Trait for fixed-layout entries trailing a descriptor header.
pub trait DescriptorEntry<'a>: Sized {
    /// Minimum stride of one entry
    const SIZE: usize;

    /// Parse the entry at `start`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the entry cannot be read.
    fn parse(start: RemoteRef<'a>) -> Result<Self>;
}

/// Iterator over the entry table of a descriptor.
pub struct EntryIter<'a, E> {
    next: RemoteRef<'a>,
    stride: usize,
    remaining: u32,
    _entry: PhantomData<E>,
}

impl<'a, E: DescriptorEntry<'a>> EntryIter<'a, E> {
    fn new(first: RemoteRef<'a>, stride: usize, count: u32) -> Result<Self> {
        if count > 0 && stride < E::SIZE {
            return Err(malformed_error!(
                "Entry stride {} is smaller than the entry size {}",
                stride,
                E::SIZE
            ));
        }

        Ok(EntryIter {
            next: first,
            stride,
            remaining: count,
            _entry: PhantomData,
        })
    }
}

impl<'a, E: DescriptorEntry<'a>> Iterator for EntryIter<'a, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let entry = E::parse(self.next);
        self.remaining -= 1;
        if self.remaining > 0 {
            match self.next.at_byte_offset(self.stride as i64) {
                Ok(next) => self.next = next,
                Err(error) => {
                    self.remaining = 0;
                    return Some(entry.and(Err(error)));
                }
            }
        }

        if entry.is_err() {
            self.remaining = 0;
        }
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (0, Some(remaining))
    }
}

fn table_length(count: u32, stride: u64) -> u64 {
    u64::from(count).saturating_mul(stride)
}

/// What kind of declaration a [`FieldDescriptor`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum FieldDescriptorKind {
    /// A struct
    Struct,
    /// A class
    Class,
    /// An enum without or with a single payload case
    Enum,
    /// An enum with several payload cases
    MultiPayloadEnum,
    /// A protocol
    Protocol,
    /// A class-bound protocol
    ClassProtocol,
    /// An Objective-C protocol
    ObjCProtocol,
    /// An Objective-C class
    ObjCClass,
}

impl FieldDescriptorKind {
    /// Decode the raw `u16` kind tag.
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            0 => FieldDescriptorKind::Struct,
            1 => FieldDescriptorKind::Class,
            2 => FieldDescriptorKind::Enum,
            3 => FieldDescriptorKind::MultiPayloadEnum,
            4 => FieldDescriptorKind::Protocol,
            5 => FieldDescriptorKind::ClassProtocol,
            6 => FieldDescriptorKind::ObjCProtocol,
            7 => FieldDescriptorKind::ObjCClass,
            _ => return None,
        })
    }

    /// Returns `true` for both enum kinds.
    #[must_use]
    pub fn is_enum(self) -> bool {
        matches!(
            self,
            FieldDescriptorKind::Enum | FieldDescriptorKind::MultiPayloadEnum
        )
    }
}

/// Describes the stored properties of a struct or class, or the cases of an enum.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor<'a> {
    base: RemoteRef<'a>,
    /// Raw kind tag, see [`FieldDescriptor::kind`]
    pub raw_kind: u16,
    /// Stride of one [`FieldRecord`]
    pub field_record_size: u16,
    /// Number of field records
    pub num_fields: u32,
}

impl<'a> FieldDescriptor<'a> {
    /// Reference to the start of the descriptor.
    #[must_use]
    pub fn base(&self) -> RemoteRef<'a> {
        self.base
    }

    /// The decoded kind, or `None` for kinds this crate does not know.
    #[must_use]
    pub fn kind(&self) -> Option<FieldDescriptorKind> {
        FieldDescriptorKind::from_raw(self.raw_kind)
    }

    /// Returns `true` if the descriptor lists enum cases.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.kind().is_some_and(FieldDescriptorKind::is_enum)
    }

    /// The mangled name of the described type, if present.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn mangled_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(0)
    }

    /// The mangled name of the superclass, present only for classes that have one.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn superclass(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(4)
    }

    /// Iterate the field records.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the declared stride is too small.
    pub fn fields(&self) -> Result<EntryIter<'a, FieldRecord<'a>>> {
        EntryIter::new(
            self.base.at_byte_offset(Self::HEADER_SIZE as i64)?,
            usize::from(self.field_record_size),
            self.num_fields,
        )
    }
}

impl<'a> SectionRecord<'a> for FieldDescriptor<'a> {
    const KIND: SectionKind = SectionKind::Field;
    const HEADER_SIZE: usize = 16;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        let mut parser = Parser::new(start.local());
        parser.seek(8)?;

        Ok(FieldDescriptor {
            base: start,
            raw_kind: parser.read_le::<u16>()?,
            field_record_size: parser.read_le::<u16>()?,
            num_fields: parser.read_le::<u32>()?,
        })
    }

    fn record_size(&self) -> u64 {
        (Self::HEADER_SIZE as u64)
            .saturating_add(table_length(self.num_fields, u64::from(self.field_record_size)))
    }
}

bitflags! {
    /// Flags of a [`FieldRecord`]
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
    pub struct FieldRecordFlags: u32 {
        /// The enum case is stored indirectly in a box
        const IS_INDIRECT_CASE = 0x1;
        /// The stored property is mutable
        const IS_VAR = 0x2;
        /// The field was synthesized by the compiler
        const IS_ARTIFICIAL = 0x4;
    }
}

/// One stored property or enum case.
#[derive(Debug, Clone, Copy)]
pub struct FieldRecord<'a> {
    base: RemoteRef<'a>,
    /// The record flags
    pub flags: FieldRecordFlags,
}

impl<'a> FieldRecord<'a> {
    /// The mangled type of the field. Enum cases without payload have none.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn mangled_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(4)
    }

    /// The field name.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn field_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(8)
    }

    /// Returns `true` if this enum case is stored indirectly.
    #[must_use]
    pub fn is_indirect_case(&self) -> bool {
        self.flags.contains(FieldRecordFlags::IS_INDIRECT_CASE)
    }

    /// Returns `true` if this stored property is a `var`.
    #[must_use]
    pub fn is_var(&self) -> bool {
        self.flags.contains(FieldRecordFlags::IS_VAR)
    }
}

impl<'a> DescriptorEntry<'a> for FieldRecord<'a> {
    const SIZE: usize = 12;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        Ok(FieldRecord {
            base: start,
            flags: FieldRecordFlags::from_bits_retain(start.read_le::<u32>(0)?),
        })
    }
}

/// Lists the associated type witnesses of one protocol conformance.
#[derive(Debug, Clone, Copy)]
pub struct AssociatedTypeDescriptor<'a> {
    base: RemoteRef<'a>,
    /// Number of associated type records
    pub num_associated_types: u32,
    /// Stride of one [`AssociatedTypeRecord`]
    pub associated_type_record_size: u32,
}

impl<'a> AssociatedTypeDescriptor<'a> {
    /// Mangled name of the conforming type.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn conforming_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(0)
    }

    /// Mangled name of the protocol.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn protocol_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(4)
    }

    /// Iterate the associated type records.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the declared stride is too small.
    pub fn associated_types(&self) -> Result<EntryIter<'a, AssociatedTypeRecord<'a>>> {
        EntryIter::new(
            self.base.at_byte_offset(Self::HEADER_SIZE as i64)?,
            self.associated_type_record_size as usize,
            self.num_associated_types,
        )
    }
}

impl<'a> SectionRecord<'a> for AssociatedTypeDescriptor<'a> {
    const KIND: SectionKind = SectionKind::AssociatedType;
    const HEADER_SIZE: usize = 16;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        Ok(AssociatedTypeDescriptor {
            base: start,
            num_associated_types: start.read_le::<u32>(8)?,
            associated_type_record_size: start.read_le::<u32>(12)?,
        })
    }

    fn record_size(&self) -> u64 {
        (Self::HEADER_SIZE as u64).saturating_add(table_length(
            self.num_associated_types,
            u64::from(self.associated_type_record_size),
        ))
    }
}

/// One associated type witness: member name and the type substituted for it.
#[derive(Debug, Clone, Copy)]
pub struct AssociatedTypeRecord<'a> {
    base: RemoteRef<'a>,
}

impl<'a> AssociatedTypeRecord<'a> {
    /// Name of the associated type, e.g. `Element`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(0)
    }

    /// Mangled name of the witness type.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn substituted_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(4)
    }
}

impl<'a> DescriptorEntry<'a> for AssociatedTypeRecord<'a> {
    const SIZE: usize = 8;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        // Both fields are resolved lazily; make sure they exist.
        start.read_le::<u64>(0)?;
        Ok(AssociatedTypeRecord { base: start })
    }
}

/// Layout information of a builtin type.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTypeDescriptor<'a> {
    base: RemoteRef<'a>,
    /// Size in bytes
    pub size: u32,
    /// Alignment in the low 16 bits, flags above
    pub alignment_and_flags: u32,
    /// Stride in bytes
    pub stride: u32,
    /// Number of extra inhabitants
    pub num_extra_inhabitants: u32,
}

impl<'a> BuiltinTypeDescriptor<'a> {
    /// Mangled name of the builtin type.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(0)
    }

    /// Reference to the start of the descriptor.
    #[must_use]
    pub fn base(&self) -> RemoteRef<'a> {
        self.base
    }

    /// Alignment in bytes.
    #[must_use]
    pub fn alignment(&self) -> u32 {
        self.alignment_and_flags & 0xFFFF
    }

    /// Returns `true` if values of the type can be moved with a plain memory copy.
    #[must_use]
    pub fn is_bitwise_takable(&self) -> bool {
        (self.alignment_and_flags >> 16) & 1 != 0
    }
}

impl<'a> SectionRecord<'a> for BuiltinTypeDescriptor<'a> {
    const KIND: SectionKind = SectionKind::Builtin;
    const HEADER_SIZE: usize = 20;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        let mut parser = Parser::new(start.local());
        parser.advance_by(4)?;

        Ok(BuiltinTypeDescriptor {
            base: start,
            size: parser.read_le::<u32>()?,
            alignment_and_flags: parser.read_le::<u32>()?,
            stride: parser.read_le::<u32>()?,
            num_extra_inhabitants: parser.read_le::<u32>()?,
        })
    }

    fn record_size(&self) -> u64 {
        Self::HEADER_SIZE as u64
    }
}

/// Describes the layout of a closure context.
#[derive(Debug, Clone, Copy)]
pub struct CaptureDescriptor<'a> {
    base: RemoteRef<'a>,
    /// Number of [`CaptureTypeRecord`]s
    pub num_capture_types: u32,
    /// Number of [`MetadataSourceRecord`]s
    pub num_metadata_sources: u32,
    /// Number of generic bindings stored in the context
    pub num_bindings: u32,
}

impl<'a> CaptureDescriptor<'a> {
    /// Reference to the start of the descriptor.
    #[must_use]
    pub fn base(&self) -> RemoteRef<'a> {
        self.base
    }

    /// Remote address of the descriptor.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.base.address()
    }

    /// Iterate the captured value types.
    ///
    /// ## Errors
    ///
    /// Returns an error if the table start lies outside the image.
    pub fn capture_types(&self) -> Result<EntryIter<'a, CaptureTypeRecord<'a>>> {
        EntryIter::new(
            self.base.at_byte_offset(Self::HEADER_SIZE as i64)?,
            CaptureTypeRecord::SIZE,
            self.num_capture_types,
        )
    }

    /// Iterate the metadata sources, which follow the capture types.
    ///
    /// ## Errors
    ///
    /// Returns an error if the table start lies outside the image.
    pub fn metadata_sources(&self) -> Result<EntryIter<'a, MetadataSourceRecord<'a>>> {
        let offset = Self::HEADER_SIZE as u64
            + table_length(self.num_capture_types, CaptureTypeRecord::SIZE as u64);
        let Ok(offset) = i64::try_from(offset) else {
            return Err(out_of_bounds_error!());
        };

        EntryIter::new(
            self.base.at_byte_offset(offset)?,
            MetadataSourceRecord::SIZE,
            self.num_metadata_sources,
        )
    }
}

impl<'a> SectionRecord<'a> for CaptureDescriptor<'a> {
    const KIND: SectionKind = SectionKind::Capture;
    const HEADER_SIZE: usize = 12;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        Ok(CaptureDescriptor {
            base: start,
            num_capture_types: start.read_le::<u32>(0)?,
            num_metadata_sources: start.read_le::<u32>(4)?,
            num_bindings: start.read_le::<u32>(8)?,
        })
    }

    fn record_size(&self) -> u64 {
        (Self::HEADER_SIZE as u64)
            .saturating_add(table_length(
                self.num_capture_types,
                CaptureTypeRecord::SIZE as u64,
            ))
            .saturating_add(table_length(
                self.num_metadata_sources,
                MetadataSourceRecord::SIZE as u64,
            ))
    }
}

/// The type of one captured value.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTypeRecord<'a> {
    base: RemoteRef<'a>,
}

impl<'a> CaptureTypeRecord<'a> {
    /// Mangled name of the captured type; absent for values the compiler could not describe.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn mangled_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(0)
    }
}

impl<'a> DescriptorEntry<'a> for CaptureTypeRecord<'a> {
    const SIZE: usize = 4;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        start.read_le::<i32>(0)?;
        Ok(CaptureTypeRecord { base: start })
    }
}

/// Describes how to recover one generic binding from a closure context.
#[derive(Debug, Clone, Copy)]
pub struct MetadataSourceRecord<'a> {
    base: RemoteRef<'a>,
}

impl<'a> MetadataSourceRecord<'a> {
    /// Mangled name of the bound generic parameter.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn mangled_type_name(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(0)
    }

    /// Encoded [`crate::typeref::MetadataSource`] recipe.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relative pointer leaves the image.
    pub fn mangled_metadata_source(&self) -> Result<Option<RemoteRef<'a>>> {
        self.base.resolve_relative(4)
    }
}

impl<'a> DescriptorEntry<'a> for MetadataSourceRecord<'a> {
    const SIZE: usize = 8;

    fn parse(start: RemoteRef<'a>) -> Result<Self> {
        start.read_le::<u64>(0)?;
        Ok(MetadataSourceRecord { base: start })
    }
}

/// Extract the bytes of a mangled name starting at `bytes[0]`.
///
/// The name ends at the first NUL that is not part of a symbolic reference. A control byte in
/// `0x01..=0x17` is followed by a 4 byte relative offset, one in `0x18..=0x1F` by a
/// pointer-sized absolute address; both payloads may contain NUL bytes.
///
/// ## Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the name or a payload runs past the buffer.
pub fn symbolic_mangled_name(bytes: &[u8], pointer_size: PointerSize) -> Result<&[u8]> {
    let mut parser = Parser::new(bytes);
    loop {
        let byte = parser.peek_byte()?;
        match byte {
            0x00 => return Ok(&bytes[..parser.pos()]),
            0x01..=0x17 => parser.advance_by(1 + 4)?,
            0x18..=0x1F => parser.advance_by(1 + pointer_size.bytes())?,
            _ => parser.advance()?,
        }
    }
}

/// Read a NUL terminated name such as a field or member name.
///
/// ## Errors
///
/// Returns [`crate::Error::OutOfBounds`] if no terminator exists.
pub fn read_name(reference: RemoteRef<'_>) -> Result<String> {
    let mut parser = Parser::new(reference.local());
    Ok(String::from_utf8_lossy(parser.read_cstr()?).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn put_i32(bytes: &mut [u8], at: usize, value: i32) {
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn field_descriptor_layout() {
        // header (16) + one record (12) + "Si\0" + "x\0"
        let mut bytes = vec![0u8; 33];
        put_i32(&mut bytes, 0, 28);
        bytes[8..10].copy_from_slice(&2u16.to_le_bytes());
        bytes[10..12].copy_from_slice(&12u16.to_le_bytes());
        bytes[12..16].copy_from_slice(&1u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&0x3u32.to_le_bytes());
        put_i32(&mut bytes, 20, 8);
        put_i32(&mut bytes, 24, 7);
        bytes[28..31].copy_from_slice(b"Si\0");
        bytes[31..33].copy_from_slice(b"x\0");

        let descriptor = FieldDescriptor::parse(RemoteRef::new(0x1000, &bytes)).unwrap();
        assert_eq!(descriptor.kind(), Some(FieldDescriptorKind::Enum));
        assert!(descriptor.is_enum());
        assert_eq!(descriptor.record_size(), 28);
        assert_eq!(descriptor.mangled_type_name().unwrap().unwrap().address(), 0x101C);
        assert!(descriptor.superclass().unwrap().is_none());

        let fields: Vec<_> = descriptor.fields().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].is_indirect_case());
        assert!(fields[0].is_var());
        let name = fields[0].field_name().unwrap().unwrap();
        assert_eq!(read_name(name).unwrap(), "x");
        let ty = fields[0].mangled_type_name().unwrap().unwrap();
        assert_eq!(&ty.local()[..2], b"Si");
    }

    #[test]
    fn small_field_stride_is_malformed() {
        let mut bytes = vec![0u8; 40];
        bytes[10..12].copy_from_slice(&8u16.to_le_bytes());
        bytes[12..16].copy_from_slice(&2u32.to_le_bytes());

        let descriptor = FieldDescriptor::parse(RemoteRef::new(0, &bytes)).unwrap();
        assert!(matches!(descriptor.fields(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn larger_stride_skips_unknown_trailing_fields() {
        let mut bytes = vec![0u8; 16 + 2 * 8];
        bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&8u32.to_le_bytes());
        let descriptor = AssociatedTypeDescriptor::parse(RemoteRef::new(0, &bytes)).unwrap();
        assert_eq!(descriptor.associated_types().unwrap().count(), 2);

        let mut bytes = vec![0u8; 16 + 2 * 12];
        bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&12u32.to_le_bytes());
        bytes[28] = 0xAA;
        let descriptor = AssociatedTypeDescriptor::parse(RemoteRef::new(0x10, &bytes)).unwrap();
        let records: Vec<_> = descriptor
            .associated_types()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[1].base.address(), 0x10 + 28);
    }

    #[test]
    fn builtin_alignment_flags() {
        let mut bytes = vec![0u8; 20];
        bytes[4..8].copy_from_slice(&16u32.to_le_bytes());
        bytes[8..12].copy_from_slice(&(0x0001_0008u32).to_le_bytes());
        bytes[12..16].copy_from_slice(&16u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&0x1000u32.to_le_bytes());

        let descriptor = BuiltinTypeDescriptor::parse(RemoteRef::new(0, &bytes)).unwrap();
        assert_eq!(descriptor.alignment(), 8);
        assert!(descriptor.is_bitwise_takable());
        assert_eq!(descriptor.num_extra_inhabitants, 0x1000);
        assert!(descriptor.type_name().unwrap().is_none());
    }

    #[test]
    fn capture_tables_follow_header() {
        let mut bytes = vec![0u8; 12 + 2 * 4 + 8];
        bytes[0..4].copy_from_slice(&2u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&1u32.to_le_bytes());
        bytes[8..12].copy_from_slice(&3u32.to_le_bytes());

        let descriptor = CaptureDescriptor::parse(RemoteRef::new(0x500, &bytes)).unwrap();
        assert_eq!(descriptor.capture_types().unwrap().count(), 2);
        let sources: Vec<_> = descriptor
            .metadata_sources()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(sources[0].base.address(), 0x500 + 20);
        assert_eq!(descriptor.num_bindings, 3);
    }

    #[test]
    fn mangled_names_skip_symbolic_payloads() {
        let bytes = [b'y', 0x01, 0x00, 0x00, 0x00, 0x00, b'G', 0x00, b'z'];
        assert_eq!(
            symbolic_mangled_name(&bytes, PointerSize::Bit64).unwrap(),
            &bytes[..7]
        );

        let bytes = [0x18, 0, 0, 0, 0, b'_', 0];
        assert_eq!(
            symbolic_mangled_name(&bytes, PointerSize::Bit32).unwrap().len(),
            6
        );
        assert!(symbolic_mangled_name(&bytes, PointerSize::Bit64).is_err());

        assert!(symbolic_mangled_name(b"Si", PointerSize::Bit64).is_err());
    }
}
