//! Lookups over the reflection sections of all registered images.
//!
//! Mangled names found in the metadata are compared by their normalized form: the mangling
//! prefix is stripped, the name is demangled (resolving symbolic references) and mangled again.
//! Names that cannot be demangled are compared as they are.
//!
//! Field descriptors are indexed lazily. The first lookup that misses the cache scans the
//! field sections of the images registered since the previous scan, one image at a time, until
//! the requested type shows up. When two images describe the same type, the one registered
//! first wins.

use tracing::{debug, warn};

use crate::{
    builder::TypeRefBuilder,
    demangle::NodeKind,
    file::parser::Parser,
    reflection::{
        records::read_name, BuiltinTypeDescriptor, CaptureDescriptor, FieldDescriptor,
    },
    remote::RemoteRef,
    typeref::{MetadataSource, TypeRef, TypeRefId},
    Result,
};

/// One stored property or enum case of a nominal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTypeInfo {
    /// Property or case name
    pub name: String,
    /// Declaration order, starting at zero
    pub value: i32,
    /// The field type, `None` for enum cases without payload
    pub type_ref: Option<TypeRefId>,
    /// Whether the enum case payload is stored out of line
    pub indirect: bool,
}

impl FieldTypeInfo {
    /// Returns `true` for an enum case without payload.
    #[must_use]
    pub fn is_empty_case(&self) -> bool {
        self.type_ref.is_none()
    }
}

/// The layout of a closure context as recorded by its capture descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureContextInfo {
    /// Types of the captured values, in order; `None` where the type could not be decoded
    pub capture_types: Vec<Option<TypeRefId>>,
    /// How to recover the metadata of each generic parameter of the context
    pub metadata_sources: Vec<(Option<TypeRefId>, Option<MetadataSource>)>,
    /// Number of bindings without a recorded source
    pub num_bindings: u32,
}

impl<'a> TypeRefBuilder<'a> {
    /// Normalized form of the mangled name at `reference`.
    ///
    /// Returns `Ok(None)` for names referring to an opaque type descriptor, which never name
    /// a described type.
    pub(crate) fn normalize_reflection_name(&self, reference: RemoteRef<'a>) -> Result<Option<String>> {
        let mangled = self.mangled_name_bytes(reference)?;
        let Some(node) = self.demangle(mangled) else {
            return Ok(Some(String::from_utf8_lossy(mangled).into_owned()));
        };

        if node.unwrap_type().kind() == NodeKind::OpaqueTypeDescriptorSymbolicReference {
            return Ok(None);
        }

        Ok(Some(
            self.demangler
                .mangle_node(&node)
                .unwrap_or_else(|| String::from_utf8_lossy(mangled).into_owned()),
        ))
    }

    fn normalized_name_matches(&self, reference: Option<RemoteRef<'a>>, expected: &str) -> Result<bool> {
        let Some(reference) = reference else {
            return Ok(false);
        };
        Ok(self.normalize_reflection_name(reference)?.as_deref() == Some(expected))
    }

    /// The field descriptor of a nominal or bound generic type.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] if a field section is truncated, and
    /// propagates errors reading the descriptor names.
    pub fn get_field_type_info(&mut self, id: TypeRefId) -> Result<Option<FieldDescriptor<'a>>> {
        let Some(mangled_name) = self
            .pool
            .get(id)
            .filter(|ty| ty.is_nominal_like())
            .and_then(TypeRef::mangled_name)
            .map(str::to_owned)
        else {
            return Ok(None);
        };

        if let Some(descriptor) = self.field_type_info_cache.get(&mangled_name) {
            return Ok(Some(*descriptor));
        }

        while self.first_unprocessed_info < self.reflection_infos.len() {
            let section = self.reflection_infos[self.first_unprocessed_info].field;
            let mut added = 0usize;
            for descriptor in &section {
                let descriptor = descriptor?;
                let Some(name) = descriptor.mangled_type_name()? else {
                    continue;
                };
                let Some(name) = self.normalize_reflection_name(name)? else {
                    continue;
                };
                self.field_type_info_cache.entry(name).or_insert_with(|| {
                    added += 1;
                    descriptor
                });
            }

            debug!(
                image = self.first_unprocessed_info,
                added,
                cached = self.field_type_info_cache.len(),
                "indexed field descriptors"
            );
            self.first_unprocessed_info += 1;

            if let Some(descriptor) = self.field_type_info_cache.get(&mangled_name) {
                return Ok(Some(*descriptor));
            }
        }

        Ok(None)
    }

    /// The fields of `id` described by `descriptor`, with types substituted for the generic
    /// arguments of `id`.
    ///
    /// Returns `Ok(None)` if the generic arguments are not concrete, or if the type of any
    /// field cannot be decoded.
    ///
    /// # Errors
    /// Propagates errors reading the records and substituting the field types.
    pub fn get_field_type_refs(
        &mut self,
        id: TypeRefId,
        descriptor: &FieldDescriptor<'a>,
    ) -> Result<Option<Vec<FieldTypeInfo>>> {
        let Some(substitutions) = self.subst_map(id) else {
            return Ok(None);
        };

        let is_enum = descriptor.is_enum();
        let records = descriptor.fields()?;
        let mut fields = Vec::new();
        for (value, record) in (0i32..).zip(records) {
            let record = record?;
            let name = match record.field_name()? {
                Some(name) => read_name(name)?,
                None => String::new(),
            };

            let Some(type_name) = record.mangled_type_name()? else {
                if !is_enum {
                    return Ok(None);
                }
                fields.push(FieldTypeInfo {
                    name,
                    value,
                    type_ref: None,
                    indirect: false,
                });
                continue;
            };

            let Some(unsubstituted) = self.decode_reference(type_name)? else {
                debug!(field = name, "field type did not decode");
                return Ok(None);
            };
            let type_ref = self.substitute(unsubstituted, &substitutions)?;

            fields.push(FieldTypeInfo {
                name,
                value,
                type_ref: Some(type_ref),
                indirect: is_enum && record.is_indirect_case(),
            });
        }

        Ok(Some(fields))
    }

    /// The builtin type descriptor describing the layout of `id`.
    ///
    /// Descriptors with an invalid layout are skipped.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] if a builtin section is truncated.
    pub fn get_builtin_type_info(&self, id: TypeRefId) -> Result<Option<BuiltinTypeDescriptor<'a>>> {
        let Some(mangled_name) = self
            .pool
            .get(id)
            .filter(|ty| matches!(ty, TypeRef::Builtin { .. }) || ty.is_nominal_like())
            .and_then(TypeRef::mangled_name)
        else {
            return Ok(None);
        };

        for info in &self.reflection_infos {
            for descriptor in &info.builtin {
                let descriptor = descriptor?;
                let alignment = descriptor.alignment();
                if descriptor.stride == 0 || alignment == 0 || !alignment.is_power_of_two() {
                    warn!(
                        address = format_args!("{:#x}", descriptor.base().address()),
                        stride = descriptor.stride,
                        alignment,
                        "skipping builtin descriptor with invalid layout"
                    );
                    continue;
                }

                let Some(name) = descriptor.type_name()? else {
                    warn!(
                        address = format_args!("{:#x}", descriptor.base().address()),
                        "skipping unnamed builtin descriptor"
                    );
                    continue;
                };
                if self.normalize_reflection_name(name)?.as_deref() == Some(mangled_name) {
                    return Ok(Some(descriptor));
                }
            }
        }

        Ok(None)
    }

    /// The type that `mangled_type_name` binds to the associated type `member` of `protocol`.
    ///
    /// `protocol` is the mangled name of the protocol. Hits are cached for the lifetime of the
    /// builder.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] if an associated type section is truncated.
    pub fn lookup_type_witness(
        &mut self,
        mangled_type_name: &str,
        member: &str,
        protocol: &str,
    ) -> Result<Option<TypeRefId>> {
        let key = (
            mangled_type_name.to_owned(),
            member.to_owned(),
            protocol.to_owned(),
        );
        if let Some(witness) = self.associated_type_cache.get(&key) {
            return Ok(Some(*witness));
        }

        for index in 0..self.reflection_infos.len() {
            let section = self.reflection_infos[index].associated_type;
            for descriptor in &section {
                let descriptor = descriptor?;
                if !self.normalized_name_matches(descriptor.conforming_type_name()?, mangled_type_name)?
                    || !self.normalized_name_matches(descriptor.protocol_type_name()?, protocol)?
                {
                    continue;
                }

                for record in descriptor.associated_types()? {
                    let record = record?;
                    let Some(name) = record.name()? else {
                        continue;
                    };
                    if read_name(name)? != member {
                        continue;
                    }
                    let Some(substituted) = record.substituted_type_name()? else {
                        continue;
                    };
                    let Some(witness) = self.decode_reference(substituted)? else {
                        continue;
                    };

                    debug!(
                        conforming = mangled_type_name,
                        member,
                        protocol,
                        "cached type witness"
                    );
                    self.associated_type_cache.insert(key, witness);
                    return Ok(Some(witness));
                }
            }
        }

        Ok(None)
    }

    /// The superclass of a class type, with the generic arguments of `id` substituted.
    ///
    /// # Errors
    /// Propagates errors of the field descriptor lookup and of substitution.
    pub fn lookup_superclass(&mut self, id: TypeRefId) -> Result<Option<TypeRefId>> {
        let Some(descriptor) = self.get_field_type_info(id)? else {
            return Ok(None);
        };
        let Some(superclass) = descriptor.superclass()? else {
            return Ok(None);
        };
        let Some(unsubstituted) = self.decode_reference(superclass)? else {
            return Ok(None);
        };
        let Some(substitutions) = self.subst_map(id) else {
            return Ok(None);
        };

        self.substitute(unsubstituted, &substitutions).map(Some)
    }

    /// The capture descriptor at `remote_address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::SectionTooSmall`] if a capture section is truncated.
    pub fn get_capture_descriptor(&self, remote_address: u64) -> Result<Option<CaptureDescriptor<'a>>> {
        for info in &self.reflection_infos {
            if !info.contains_remote(remote_address) {
                continue;
            }
            for descriptor in &info.capture {
                let descriptor = descriptor?;
                if descriptor.address() == remote_address {
                    return Ok(Some(descriptor));
                }
            }
        }

        Ok(None)
    }

    /// Decode the capture types and metadata sources of a closure context.
    ///
    /// Entries that cannot be decoded are kept as `None` so positions stay meaningful.
    ///
    /// # Errors
    /// Propagates errors reading the descriptor records.
    pub fn get_closure_context_info(&mut self, descriptor: &CaptureDescriptor<'a>) -> Result<ClosureContextInfo> {
        let mut info = ClosureContextInfo {
            num_bindings: descriptor
                .num_bindings
                .saturating_sub(descriptor.num_metadata_sources),
            ..ClosureContextInfo::default()
        };

        for record in descriptor.capture_types()? {
            let ty = match record?.mangled_type_name()? {
                Some(name) => self.decode_reference(name)?,
                None => None,
            };
            info.capture_types.push(ty);
        }

        for record in descriptor.metadata_sources()? {
            let record = record?;
            let ty = match record.mangled_type_name()? {
                Some(name) => self.decode_reference(name)?,
                None => None,
            };
            let source = match record.mangled_metadata_source()? {
                Some(encoded) => {
                    let mut parser = Parser::new(encoded.local());
                    MetadataSource::decode(parser.read_cstr()?).ok()
                }
                None => None,
            };
            info.metadata_sources.push((ty, source));
        }

        debug!(
            address = format_args!("{:#x}", descriptor.address()),
            captures = info.capture_types.len(),
            sources = info.metadata_sources.len(),
            bindings = info.num_bindings,
            "decoded closure context"
        );
        Ok(info)
    }
}
