//! Textual dumps of the reflection sections.
//!
//! The output mirrors what reflection dumping tools print: one block per descriptor, with
//! every mangled name rendered by the demangler and every decoded type as an s-expression.
//! Names that fail to decode are reported inline with a `!!!` marker instead of aborting the
//! dump.

use std::io::Write;

use crate::{
    builder::{lookup::ClosureContextInfo, TypeRefBuilder},
    reflection::records::read_name,
    remote::RemoteRef,
    Result,
};

impl<'a> TypeRefBuilder<'a> {
    /// Human readable name of the mangled name at `reference`.
    fn type_name_string(&self, reference: Option<RemoteRef<'a>>) -> Result<String> {
        let Some(reference) = reference else {
            return Ok("<unnamed>".to_owned());
        };
        let mangled = self.mangled_name_bytes(reference)?;
        Ok(match self.demangle(mangled) {
            Some(node) => self.demangler.node_to_string(&node).trim_end().to_owned(),
            None => mangled.escape_ascii().to_string(),
        })
    }

    /// Print the demangled form of the name at `reference` followed by the decoded type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if writing fails, and propagates decoding errors.
    pub fn dump_type_ref(&mut self, reference: RemoteRef<'a>, out: &mut dyn Write) -> Result<()> {
        let mangled = self.mangled_name_bytes(reference)?;
        let node = self.demangle(mangled);

        let type_name = node
            .as_ref()
            .map(|node| self.demangler.node_to_string(node))
            .unwrap_or_default();
        writeln!(out, "{}", type_name.trim_end())?;

        let decoded = match &node {
            Some(node) => self.decode_mangled_type(node)?,
            None => None,
        };
        match decoded {
            Some(id) => writeln!(out, "{}", self.display(id))?,
            None => writeln!(out, "!!! Invalid typeref: {}", mangled.escape_ascii())?,
        }
        writeln!(out)?;
        Ok(())
    }

    /// Print every field descriptor of every registered image.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] for truncated sections and
    /// [`crate::Error::Io`] if writing fails.
    pub fn dump_field_section(&mut self, out: &mut dyn Write) -> Result<()> {
        for index in 0..self.reflection_infos.len() {
            let section = self.reflection_infos[index].field;
            for descriptor in &section {
                let descriptor = descriptor?;
                let type_name = self.type_name_string(descriptor.mangled_type_name()?)?;
                writeln!(out, "{type_name}")?;
                writeln!(out, "{}", "-".repeat(type_name.chars().count()))?;

                for record in descriptor.fields()? {
                    let record = record?;
                    let name = match record.field_name()? {
                        Some(name) => read_name(name)?,
                        None => String::new(),
                    };
                    write!(out, "{name}")?;
                    match record.mangled_type_name()? {
                        Some(type_name) => {
                            write!(out, ": ")?;
                            self.dump_type_ref(type_name, out)?;
                        }
                        None => write!(out, "\n\n")?,
                    }
                }
            }
        }
        Ok(())
    }

    /// Print every associated type descriptor of every registered image.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] for truncated sections and
    /// [`crate::Error::Io`] if writing fails.
    pub fn dump_associated_type_section(&mut self, out: &mut dyn Write) -> Result<()> {
        for index in 0..self.reflection_infos.len() {
            let section = self.reflection_infos[index].associated_type;
            for descriptor in &section {
                let descriptor = descriptor?;
                let conforming = self.type_name_string(descriptor.conforming_type_name()?)?;
                let protocol = self.type_name_string(descriptor.protocol_type_name()?)?;
                writeln!(out, "- {conforming} : {protocol}")?;

                for record in descriptor.associated_types()? {
                    let record = record?;
                    let name = match record.name()? {
                        Some(name) => read_name(name)?,
                        None => String::new(),
                    };
                    write!(out, "typealias {name} = ")?;
                    match record.substituted_type_name()? {
                        Some(substituted) => self.dump_type_ref(substituted, out)?,
                        None => writeln!(out, "!!! Invalid typeref\n")?,
                    }
                }
            }
        }
        Ok(())
    }

    /// Print every builtin type descriptor of every registered image.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] for truncated sections and
    /// [`crate::Error::Io`] if writing fails.
    pub fn dump_builtin_type_section(&self, out: &mut dyn Write) -> Result<()> {
        for info in &self.reflection_infos {
            for descriptor in &info.builtin {
                let descriptor = descriptor?;
                let type_name = self.type_name_string(descriptor.type_name()?)?;
                writeln!(out, "\n- {type_name}:")?;
                writeln!(out, "Size: {}", descriptor.size)?;
                writeln!(out, "Alignment: {}", descriptor.alignment())?;
                writeln!(out, "Stride: {}", descriptor.stride)?;
                writeln!(out, "NumExtraInhabitants: {}", descriptor.num_extra_inhabitants)?;
                writeln!(out, "BitwiseTakable: {}", u8::from(descriptor.is_bitwise_takable()))?;
            }
        }
        Ok(())
    }

    /// Print the capture types and metadata sources of a closure context.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if writing fails.
    pub fn dump_closure_context_info(&self, info: &ClosureContextInfo, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "- Capture types:")?;
        for capture in &info.capture_types {
            match capture {
                Some(id) => writeln!(out, "{}", self.display(*id))?,
                None => writeln!(out, "!!! Invalid typeref")?,
            }
        }

        writeln!(out, "- Metadata sources:")?;
        for (ty, source) in &info.metadata_sources {
            match ty {
                Some(id) => writeln!(out, "{}", self.display(*id))?,
                None => writeln!(out, "!!! Invalid typeref")?,
            }
            match source {
                Some(source) => {
                    let mut rendered = String::new();
                    // Writing into a String cannot fail
                    let _ = source.write_sexpr(&mut rendered);
                    writeln!(out, "{rendered}")?;
                }
                None => writeln!(out, "!!! Invalid metadata source")?,
            }
        }
        writeln!(out)?;
        Ok(())
    }

    /// Print the closure context of every capture descriptor of every registered image.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] for truncated sections and
    /// [`crate::Error::Io`] if writing fails.
    pub fn dump_capture_section(&mut self, out: &mut dyn Write) -> Result<()> {
        for index in 0..self.reflection_infos.len() {
            let section = self.reflection_infos[index].capture;
            for descriptor in &section {
                let info = self.get_closure_context_info(&descriptor?)?;
                self.dump_closure_context_info(&info, out)?;
            }
        }
        Ok(())
    }

    /// Print all four descriptor sections under their headings.
    ///
    /// # Errors
    /// Returns the first error of the individual section dumps.
    pub fn dump_all_sections(&mut self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "FIELDS:\n=======")?;
        self.dump_field_section(out)?;
        writeln!(out)?;

        writeln!(out, "ASSOCIATED TYPES:\n=================")?;
        self.dump_associated_type_section(out)?;
        writeln!(out)?;

        writeln!(out, "BUILTIN TYPES:\n==============")?;
        self.dump_builtin_type_section(out)?;
        writeln!(out)?;

        writeln!(out, "CAPTURE DESCRIPTORS:\n====================")?;
        self.dump_capture_section(out)?;
        writeln!(out)?;
        Ok(())
    }
}
