//! Reflection metadata sections and their descriptor records.
//!
//! A compiled image carries its reflection metadata in six sections. Four of them hold
//! sequences of variable-length descriptor records, two are plain string pools that the
//! records point into:
//!
//! | Section | Record | Module |
//! |---|---|---|
//! | `fieldmd` | [`FieldDescriptor`] | [`records`] |
//! | `assocty` | [`AssociatedTypeDescriptor`] | [`records`] |
//! | `builtin` | [`BuiltinTypeDescriptor`] | [`records`] |
//! | `capture` | [`CaptureDescriptor`] | [`records`] |
//! | `typeref` | mangled type names | [`section::GenericSection`] |
//! | `reflstr` | field and member names | [`section::GenericSection`] |
//!
//! [`ReflectionInfo`] bundles the six sections of one image together with the image's local
//! buffer and its remote load address.
//!
//! # Iteration
//!
//! Record sections are only ever walked front to back. Each step derives the record length
//! from its header and refuses to step past the end of the section:
//!
//! ```rust
//! use reflscope::reflection::{BuiltinTypeSection, SectionRecord};
//! use reflscope::RemoteRef;
//!
//! // One builtin descriptor without a name: size 8, alignment 8, stride 8
//! let mut bytes = vec![0u8; 20];
//! bytes[4..8].copy_from_slice(&8u32.to_le_bytes());
//! bytes[8..12].copy_from_slice(&8u32.to_le_bytes());
//! bytes[12..16].copy_from_slice(&8u32.to_le_bytes());
//!
//! let section = BuiltinTypeSection::new(RemoteRef::new(0x1000, &bytes), 20)?;
//! let descriptors = section.iter().collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(descriptors[0].size, 8);
//! # Ok::<(), reflscope::Error>(())
//! ```

mod info;
pub mod records;
pub mod section;

use strum::{Display, EnumIter};

pub use info::{ReflectionInfo, ReflectionSections, SectionRange};
pub use records::{
    AssociatedTypeDescriptor, AssociatedTypeRecord, BuiltinTypeDescriptor, CaptureDescriptor,
    CaptureTypeRecord, FieldDescriptor, FieldDescriptorKind, FieldRecord, FieldRecordFlags,
    MetadataSourceRecord,
};
pub use section::{
    AssociatedTypeSection, BuiltinTypeSection, CaptureSection, FieldSection, GenericSection,
    ReflectionSection, SectionIter, SectionRecord,
};

/// The six kinds of reflection sections an image can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SectionKind {
    /// Field descriptors of nominal types
    #[strum(serialize = "field")]
    Field,
    /// Associated type witnesses of conformances
    #[strum(serialize = "associated type")]
    AssociatedType,
    /// Layout of builtin types
    #[strum(serialize = "builtin")]
    Builtin,
    /// Closure capture layouts
    #[strum(serialize = "capture")]
    Capture,
    /// Mangled type name pool
    #[strum(serialize = "type reference")]
    TypeReference,
    /// Reflection string pool
    #[strum(serialize = "reflection string")]
    ReflectionString,
}

impl SectionKind {
    /// The section name suffix shared by all container formats, e.g. `fieldmd`.
    ///
    /// ELF images prefix it with `swift5_`, Mach-O images with `__swift5_`.
    #[must_use]
    pub fn section_suffix(self) -> &'static str {
        match self {
            SectionKind::Field => "fieldmd",
            SectionKind::AssociatedType => "assocty",
            SectionKind::Builtin => "builtin",
            SectionKind::Capture => "capture",
            SectionKind::TypeReference => "typeref",
            SectionKind::ReflectionString => "reflstr",
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn section_suffixes_are_unique() {
        let suffixes: std::collections::HashSet<_> =
            SectionKind::iter().map(SectionKind::section_suffix).collect();
        assert_eq!(suffixes.len(), 6);
        assert_eq!(SectionKind::Capture.to_string(), "capture");
    }
}
