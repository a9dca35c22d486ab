//! Loading compiled images and locating their reflection sections.
//!
//! An [`Image`] owns the bytes of one binary, either memory-mapped from disk or handed over as a
//! buffer, and knows where the six reflection sections live inside it. Section discovery
//! goes through `goblin`:
//!
//! - **ELF** section names carry a `swift5_` prefix, e.g. `swift5_fieldmd`
//! - **Mach-O** section names carry a `__swift5_` prefix, e.g. `__swift5_fieldmd`
//!
//! Fat Mach-O archives, PE files and anything else yield [`crate::Error::NotSupported`].
//! Images without any reflection section load fine and report empty ranges.
//!
//! The image is assumed to be mapped in the target exactly as it is laid out on disk, so the
//! file offset of a section is also its distance from the remote load address.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reflscope::{Image, TypeRefBuilder};
//! use std::path::Path;
//!
//! let image = Image::from_file(Path::new("libSample.so"))?;
//! println!("{} image, {} bytes", image.format(), image.len());
//!
//! let mut builder = TypeRefBuilder::new(MyDemangler);
//! builder.add_reflection_info(image.reflection_info(0x1000_0000)?);
//! # struct MyDemangler;
//! # impl reflscope::Demangler for MyDemangler {
//! #     fn demangle_type(&self, _: &[u8], _: &mut reflscope::demangle::SymbolicResolver<'_>) -> Option<reflscope::Node> { None }
//! #     fn mangle_node(&self, _: &reflscope::Node) -> Option<String> { None }
//! #     fn node_to_string(&self, node: &reflscope::Node) -> String { node.to_string() }
//! # }
//! # Ok::<(), reflscope::Error>(())
//! ```

pub mod io;
mod memory;
pub mod parser;
mod physical;

use std::path::Path;

use goblin::{
    elf::{section_header::SHT_NOBITS, Elf},
    mach::{Mach, MachO},
    Object,
};
use strum::{Display, IntoEnumIterator};
use tracing::{debug, trace};

use crate::{
    reflection::{ReflectionInfo, ReflectionSections, SectionKind, SectionRange},
    Error::{Empty, GoblinErr, NotSupported},
    Result,
};
use memory::Memory;
use physical::Physical;

/// Backend trait for image data sources.
///
/// All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Container format of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ImageFormat {
    /// ELF, section names prefixed with `swift5_`
    #[strum(serialize = "ELF")]
    Elf,
    /// Thin Mach-O, section names prefixed with `__swift5_`
    #[strum(serialize = "Mach-O")]
    MachO,
}

impl ImageFormat {
    /// The prefix in front of every reflection section name.
    #[must_use]
    pub fn section_prefix(self) -> &'static str {
        match self {
            ImageFormat::Elf => "swift5_",
            ImageFormat::MachO => "__swift5_",
        }
    }

    fn section_kind(self, name: &str) -> Option<SectionKind> {
        let suffix = name.strip_prefix(self.section_prefix())?;
        SectionKind::iter().find(|kind| kind.section_suffix() == suffix)
    }
}

/// A loaded binary image and the location of its reflection sections.
pub struct Image {
    data: Box<dyn Backend>,
    format: ImageFormat,
    sections: ReflectionSections,
}

impl Image {
    /// Memory-map and load the image at `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is empty, is not a supported container or
    /// declares a reflection section outside of the file.
    pub fn from_file(file: &Path) -> Result<Image> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Load an image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Same as [`Image::from_file`], minus the I/O errors.
    pub fn from_mem(data: Vec<u8>) -> Result<Image> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<Image> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let (format, sections) = match Object::parse(data.data()).map_err(GoblinErr)? {
            Object::Elf(elf) => (ImageFormat::Elf, elf_sections(&elf)?),
            Object::Mach(Mach::Binary(macho)) => (ImageFormat::MachO, macho_sections(&macho)?),
            _ => return Err(NotSupported),
        };

        for kind in SectionKind::iter() {
            let range = sections.range(kind);
            let end = u64::try_from(range.offset)
                .ok()
                .and_then(|offset| offset.checked_add(range.size));
            if !matches!(end, Some(end) if end <= data.len() as u64) {
                return Err(malformed_error!(
                    "{} section at {:#x}, {} bytes, exceeds the image of {} bytes",
                    kind,
                    range.offset,
                    range.size,
                    data.len()
                ));
            }
        }

        debug!(
            %format,
            size = data.len(),
            fieldmd = sections.field.size,
            typeref = sections.type_reference.size,
            "loaded image"
        );

        Ok(Image {
            data: Box::new(data),
            format,
            sections,
        })
    }

    /// Returns the total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The container format.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The whole image buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// A bounds-checked slice of the image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Where the reflection sections live inside the image.
    #[must_use]
    pub fn sections(&self) -> &ReflectionSections {
        &self.sections
    }

    /// Returns `true` if the image carries at least one reflection section.
    #[must_use]
    pub fn has_reflection_metadata(&self) -> bool {
        SectionKind::iter().any(|kind| self.sections.range(kind).size > 0)
    }

    /// Describe this image as loaded at `remote_start` in the target.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if a section range lies outside the image.
    pub fn reflection_info(&self, remote_start: u64) -> Result<ReflectionInfo<'_>> {
        ReflectionInfo::new(self.data(), remote_start, &self.sections)
    }
}

fn record(sections: &mut ReflectionSections, kind: SectionKind, offset: u64, size: u64) -> Result<()> {
    let offset = usize::try_from(offset)
        .map_err(|_| malformed_error!("{} section offset {:#x} does not fit", kind, offset))?;
    trace!(%kind, offset, size, "found reflection section");
    *sections.range_mut(kind) = SectionRange::new(offset, size);
    Ok(())
}

fn elf_sections(elf: &Elf<'_>) -> Result<ReflectionSections> {
    let mut sections = ReflectionSections::default();
    for header in &elf.section_headers {
        if header.sh_type == SHT_NOBITS {
            continue;
        }
        let Some(kind) = elf
            .shdr_strtab
            .get_at(header.sh_name)
            .and_then(|name| ImageFormat::Elf.section_kind(name))
        else {
            continue;
        };
        // Remote addresses are derived from file offsets, relocatable objects carry no address.
        if header.sh_addr != 0 && header.sh_addr != header.sh_offset {
            return Err(malformed_error!(
                "{} section is mapped at {:#x} but stored at file offset {:#x}",
                kind,
                header.sh_addr,
                header.sh_offset
            ));
        }
        record(&mut sections, kind, header.sh_offset, header.sh_size)?;
    }
    Ok(sections)
}

fn macho_sections(macho: &MachO<'_>) -> Result<ReflectionSections> {
    let mut sections = ReflectionSections::default();
    for segment in macho.segments.iter() {
        for (section, _) in segment.sections().map_err(GoblinErr)? {
            let Some(kind) = ImageFormat::MachO.section_kind(section.name().map_err(GoblinErr)?)
            else {
                continue;
            };
            record(&mut sections, kind, u64::from(section.offset), section.size)?;
        }
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// A relocatable x86-64 ELF file with the given sections plus `.shstrtab`.
    fn elf_with_sections(sections: &[(&str, &[u8])]) -> Vec<u8> {
        const EHSIZE: usize = 64;
        const SHENTSIZE: usize = 64;

        let mut bytes = vec![0u8; EHSIZE];
        let mut names = vec![0u8];
        let mut headers = vec![[0u8; SHENTSIZE]];

        let mut section_header = |name: u32, kind: u32, offset: usize, size: usize| {
            let mut header = [0u8; SHENTSIZE];
            header[0..4].copy_from_slice(&name.to_le_bytes());
            header[4..8].copy_from_slice(&kind.to_le_bytes());
            header[24..32].copy_from_slice(&(offset as u64).to_le_bytes());
            header[32..40].copy_from_slice(&(size as u64).to_le_bytes());
            header[48..56].copy_from_slice(&1u64.to_le_bytes());
            headers.push(header);
        };

        for (name, data) in sections {
            let name_offset = names.len() as u32;
            names.extend_from_slice(name.as_bytes());
            names.push(0);
            section_header(name_offset, 1, bytes.len(), data.len());
            bytes.extend_from_slice(data);
        }

        let shstrtab_name = names.len() as u32;
        names.extend_from_slice(b".shstrtab\0");
        section_header(shstrtab_name, 3, bytes.len(), names.len());
        bytes.extend_from_slice(&names);

        while bytes.len() % 8 != 0 {
            bytes.push(0);
        }
        let shoff = bytes.len();
        let shnum = headers.len();
        for header in &headers {
            bytes.extend_from_slice(header);
        }

        bytes[0..4].copy_from_slice(b"\x7fELF");
        bytes[4] = 2; // 64-bit
        bytes[5] = 1; // little endian
        bytes[6] = 1;
        bytes[16..18].copy_from_slice(&1u16.to_le_bytes());
        bytes[18..20].copy_from_slice(&62u16.to_le_bytes());
        bytes[20..24].copy_from_slice(&1u32.to_le_bytes());
        bytes[40..48].copy_from_slice(&(shoff as u64).to_le_bytes());
        bytes[52..54].copy_from_slice(&(EHSIZE as u16).to_le_bytes());
        bytes[58..60].copy_from_slice(&(SHENTSIZE as u16).to_le_bytes());
        bytes[60..62].copy_from_slice(&(shnum as u16).to_le_bytes());
        bytes[62..64].copy_from_slice(&((shnum - 1) as u16).to_le_bytes());
        bytes
    }

    #[test]
    fn load_empty() {
        assert!(matches!(Image::from_mem(Vec::new()), Err(Error::Empty)));
    }

    #[test]
    fn load_garbage() {
        assert!(Image::from_mem(vec![0xAB; 256]).is_err());
    }

    #[test]
    fn elf_sections_are_found() {
        let builtin = [0u8; 20];
        let bytes = elf_with_sections(&[
            (".text", &[0x90u8; 16][..]),
            ("swift5_typeref", &b"Si\0Sb\0"[..]),
            ("swift5_builtin", &builtin[..]),
            ("swift5_unknown", &[0u8; 4][..]),
        ]);

        let image = Image::from_mem(bytes).unwrap();
        assert_eq!(image.format(), ImageFormat::Elf);
        assert!(image.has_reflection_metadata());

        let sections = image.sections();
        assert_eq!(sections.type_reference.offset, 64 + 16);
        assert_eq!(sections.type_reference.size, 6);
        assert_eq!(sections.builtin.size, 20);
        assert_eq!(sections.field, SectionRange::default());
        assert_eq!(
            image.data_slice(sections.type_reference.offset, 2).unwrap(),
            b"Si"
        );

        let info = image.reflection_info(0x4000).unwrap();
        assert_eq!(info.builtin.size(), 20);
        assert_eq!(info.builtin.start_address(), 0x4000 + 64 + 16 + 6);
    }

    #[test]
    fn elf_without_reflection_metadata() {
        let image = Image::from_mem(elf_with_sections(&[(".data", &[1u8, 2, 3, 4][..])])).unwrap();
        assert!(!image.has_reflection_metadata());
        assert_eq!(*image.sections(), ReflectionSections::default());
    }

    #[test]
    fn elf_section_address_must_match_offset() {
        let bytes = elf_with_sections(&[("swift5_builtin", &[0u8; 20][..])]);
        let shoff = u64::from_le_bytes(bytes[40..48].try_into().unwrap()) as usize;
        let sh_addr = shoff + 64 + 16;

        let mut relocated = bytes.clone();
        relocated[sh_addr..sh_addr + 8].copy_from_slice(&0x20_0040u64.to_le_bytes());
        assert!(matches!(Image::from_mem(relocated), Err(Error::Malformed { .. })));

        let mut identity = bytes;
        identity[sh_addr..sh_addr + 8].copy_from_slice(&64u64.to_le_bytes());
        let image = Image::from_mem(identity).unwrap();
        assert_eq!(image.sections().builtin, SectionRange::new(64, 20));
    }

    #[test]
    fn section_names() {
        assert_eq!(
            ImageFormat::Elf.section_kind("swift5_fieldmd"),
            Some(SectionKind::Field)
        );
        assert_eq!(
            ImageFormat::MachO.section_kind("__swift5_reflstr"),
            Some(SectionKind::ReflectionString)
        );
        assert_eq!(ImageFormat::MachO.section_kind("swift5_fieldmd"), None);
        assert_eq!(ImageFormat::Elf.section_kind("swift5_protos"), None);
        assert_eq!(ImageFormat::MachO.to_string(), "Mach-O");
    }
}
