use tracing::debug;

use crate::{
    reflection::{
        AssociatedTypeSection, BuiltinTypeSection, CaptureSection, FieldSection, GenericSection,
        ReflectionSection, SectionKind, SectionRecord,
    },
    remote::RemoteRef,
    Result,
};

/// Location of one section inside an image buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRange {
    /// Byte offset of the section from the start of the image buffer
    pub offset: usize,
    /// Section length in bytes
    pub size: u64,
}

impl SectionRange {
    /// Create a range of `size` bytes at `offset`.
    #[must_use]
    pub fn new(offset: usize, size: u64) -> Self {
        SectionRange { offset, size }
    }
}

/// The location of every reflection section inside one image buffer.
///
/// Sections an image does not carry keep the default, empty range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReflectionSections {
    /// `fieldmd`
    pub field: SectionRange,
    /// `assocty`
    pub associated_type: SectionRange,
    /// `builtin`
    pub builtin: SectionRange,
    /// `capture`
    pub capture: SectionRange,
    /// `typeref`
    pub type_reference: SectionRange,
    /// `reflstr`
    pub reflection_string: SectionRange,
}

impl ReflectionSections {
    /// The range of one section kind.
    #[must_use]
    pub fn range(&self, kind: SectionKind) -> SectionRange {
        match kind {
            SectionKind::Field => self.field,
            SectionKind::AssociatedType => self.associated_type,
            SectionKind::Builtin => self.builtin,
            SectionKind::Capture => self.capture,
            SectionKind::TypeReference => self.type_reference,
            SectionKind::ReflectionString => self.reflection_string,
        }
    }

    /// Mutable access to the range of one section kind.
    pub fn range_mut(&mut self, kind: SectionKind) -> &mut SectionRange {
        match kind {
            SectionKind::Field => &mut self.field,
            SectionKind::AssociatedType => &mut self.associated_type,
            SectionKind::Builtin => &mut self.builtin,
            SectionKind::Capture => &mut self.capture,
            SectionKind::TypeReference => &mut self.type_reference,
            SectionKind::ReflectionString => &mut self.reflection_string,
        }
    }
}

/// The reflection sections of one loaded image.
///
/// The image buffer is the local copy of the image as it is mapped in the target, starting at
/// `remote_start_address`. Relative pointers inside the metadata may cross from one section to
/// another, which is why every section keeps a view of the whole image.
#[derive(Debug, Clone)]
pub struct ReflectionInfo<'a> {
    /// Field descriptors
    pub field: FieldSection<'a>,
    /// Associated type descriptors
    pub associated_type: AssociatedTypeSection<'a>,
    /// Builtin type descriptors
    pub builtin: BuiltinTypeSection<'a>,
    /// Capture descriptors
    pub capture: CaptureSection<'a>,
    /// Mangled type name pool
    pub type_reference: GenericSection<'a>,
    /// Name pool
    pub reflection_string: GenericSection<'a>,
    image: &'a [u8],
    remote_start_address: u64,
}

fn record_section<'a, K: SectionRecord<'a>>(
    image: &'a [u8],
    remote_start: u64,
    range: SectionRange,
) -> Result<ReflectionSection<'a, K>> {
    ReflectionSection::new(
        RemoteRef::from_bytes(remote_start, image, range.offset)?,
        range.size,
    )
}

impl<'a> ReflectionInfo<'a> {
    /// Describe an image whose local copy is `image` and which is loaded at `remote_start`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if any section range lies outside the image.
    pub fn new(image: &'a [u8], remote_start: u64, sections: &ReflectionSections) -> Result<Self> {
        let generic = |range: SectionRange| -> Result<GenericSection<'a>> {
            GenericSection::new(
                RemoteRef::from_bytes(remote_start, image, range.offset)?,
                range.size,
            )
        };

        let info = ReflectionInfo {
            field: record_section(image, remote_start, sections.field)?,
            associated_type: record_section(image, remote_start, sections.associated_type)?,
            builtin: record_section(image, remote_start, sections.builtin)?,
            capture: record_section(image, remote_start, sections.capture)?,
            type_reference: generic(sections.type_reference)?,
            reflection_string: generic(sections.reflection_string)?,
            image,
            remote_start_address: remote_start,
        };

        debug!(
            remote_start = format_args!("{remote_start:#x}"),
            image_size = image.len(),
            fields = sections.field.size,
            assocty = sections.associated_type.size,
            builtin = sections.builtin.size,
            capture = sections.capture.size,
            "created reflection info"
        );
        Ok(info)
    }

    /// The local image buffer.
    #[must_use]
    pub fn image(&self) -> &'a [u8] {
        self.image
    }

    /// Local address of the first image byte.
    #[must_use]
    pub fn local_start_address(&self) -> usize {
        self.image.as_ptr() as usize
    }

    /// Remote address of the first image byte.
    #[must_use]
    pub fn remote_start_address(&self) -> u64 {
        self.remote_start_address
    }

    /// Translate a pointer into the local image buffer to its remote address.
    ///
    /// Returns `None` if `local` does not point into this image.
    #[must_use]
    pub fn remote_address_of(&self, local: &[u8]) -> Option<u64> {
        let start = self.local_start_address();
        let pointer = local.as_ptr() as usize;
        if pointer < start || pointer - start >= self.image.len() {
            return None;
        }

        self.remote_start_address
            .checked_add((pointer - start) as u64)
    }

    /// Returns `true` if the remote `address` lies inside this image.
    #[must_use]
    pub fn contains_remote(&self, address: u64) -> bool {
        address >= self.remote_start_address
            && address - self.remote_start_address < self.image.len() as u64
    }

    /// A reference to the byte at remote `address`, if it lies inside this image.
    #[must_use]
    pub fn reference_at(&self, address: u64) -> Option<RemoteRef<'a>> {
        if !self.contains_remote(address) {
            return None;
        }

        let offset = usize::try_from(address - self.remote_start_address).ok()?;
        RemoteRef::from_bytes(self.remote_start_address, self.image, offset).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn address_translation() {
        let image = vec![0u8; 64];
        let mut sections = ReflectionSections::default();
        *sections.range_mut(SectionKind::TypeReference) = SectionRange::new(16, 16);
        let info = ReflectionInfo::new(&image, 0x7000_0000, &sections).unwrap();

        assert_eq!(info.remote_address_of(&image[20..]), Some(0x7000_0014));
        assert_eq!(info.remote_address_of(&image[63..]), Some(0x7000_003F));
        let elsewhere = [0u8; 4];
        assert_eq!(info.remote_address_of(&elsewhere), None);

        assert_eq!(info.type_reference.start_address(), 0x7000_0010);
        assert!(info.field.is_empty());

        let reference = info.reference_at(0x7000_0020).unwrap();
        assert_eq!(reference.local_address(), image[32..].as_ptr() as usize);
        assert!(info.reference_at(0x7000_0040).is_none());
        assert!(info.reference_at(0x6FFF_FFFF).is_none());
    }

    #[test]
    fn out_of_image_ranges_are_rejected() {
        let image = vec![0u8; 32];
        let sections = ReflectionSections {
            capture: SectionRange::new(16, 17),
            ..Default::default()
        };
        assert!(matches!(
            ReflectionInfo::new(&image, 0, &sections),
            Err(Error::OutOfBounds)
        ));
    }
}
