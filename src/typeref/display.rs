use std::fmt;

use crate::{
    demangle::{Demangler, NodeKind},
    typeref::{FunctionConvention, ReferenceOwnership, TypeRef, TypeRefId, TypeRefPool},
};

/// Renders a type reference tree as an indented s-expression.
///
/// Obtained from [`crate::TypeRefBuilder::display`]. Nominal types are labelled `struct`,
/// `enum`, `class`, `protocol` or `alias` when the demangler recognizes their mangled name,
/// and `nominal` otherwise.
///
/// ```text
/// (bound_generic_struct Sa
///   (struct Si))
/// ```
pub struct TypeRefDisplay<'b> {
    pool: &'b TypeRefPool,
    demangler: Option<&'b dyn Demangler>,
    root: TypeRefId,
}

impl<'b> TypeRefDisplay<'b> {
    /// Render `root`, classifying nominal types with `demangler` when one is given.
    #[must_use]
    pub fn new(pool: &'b TypeRefPool, demangler: Option<&'b dyn Demangler>, root: TypeRefId) -> Self {
        TypeRefDisplay {
            pool,
            demangler,
            root,
        }
    }

    fn nominal_label(&self, mangled_name: &str) -> &'static str {
        let Some(demangler) = self.demangler else {
            return "nominal";
        };
        let Some(node) = demangler.demangle_type(mangled_name.as_bytes(), &mut |_, _, _, _| None)
        else {
            return "nominal";
        };

        match node.unwrap_type().kind() {
            NodeKind::Structure | NodeKind::BoundGenericStructure => "struct",
            NodeKind::Enum | NodeKind::BoundGenericEnum => "enum",
            NodeKind::Class | NodeKind::BoundGenericClass => "class",
            NodeKind::Protocol => "protocol",
            NodeKind::TypeAlias => "alias",
            _ => "nominal",
        }
    }

    fn write_child(&self, f: &mut fmt::Formatter<'_>, id: TypeRefId, indent: usize) -> fmt::Result {
        writeln!(f)?;
        self.write_node(f, id, indent + 2)
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: TypeRefId, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}(", "")?;
        let Some(ty) = self.pool.get(id) else {
            return write!(f, "<invalid {}>)", id.index());
        };

        match ty {
            TypeRef::Builtin { mangled_name } => write!(f, "builtin {mangled_name}")?,
            TypeRef::Nominal {
                mangled_name,
                parent,
            } => {
                write!(f, "{} {mangled_name}", self.nominal_label(mangled_name))?;
                if let Some(parent) = parent {
                    self.write_child(f, *parent, indent)?;
                }
            }
            TypeRef::BoundGeneric {
                mangled_name,
                generic_params,
                parent,
            } => {
                write!(
                    f,
                    "bound_generic_{} {mangled_name}",
                    self.nominal_label(mangled_name)
                )?;
                for param in generic_params {
                    self.write_child(f, *param, indent)?;
                }
                if let Some(parent) = parent {
                    self.write_child(f, *parent, indent)?;
                }
            }
            TypeRef::Tuple {
                elements,
                is_variadic,
            } => {
                f.write_str("tuple")?;
                if *is_variadic {
                    f.write_str(" variadic")?;
                }
                for element in elements {
                    self.write_child(f, *element, indent)?;
                }
            }
            TypeRef::Function {
                parameters,
                result,
                flags,
            } => {
                f.write_str("function")?;
                match flags.convention {
                    FunctionConvention::Swift => {}
                    FunctionConvention::Block => f.write_str(" convention=block")?,
                    FunctionConvention::Thin => f.write_str(" convention=thin")?,
                    FunctionConvention::CFunctionPointer => f.write_str(" convention=c")?,
                }
                if flags.throws {
                    f.write_str(" throws")?;
                }
                if !flags.escaping {
                    f.write_str(" noescape")?;
                }

                write!(f, "\n{:width$}(parameters", "", width = indent + 2)?;
                for param in parameters {
                    self.write_child(f, param.ty, indent + 2)?;
                }
                f.write_str(")")?;
                write!(f, "\n{:width$}(result", "", width = indent + 2)?;
                self.write_child(f, *result, indent + 2)?;
                f.write_str(")")?;
            }
            TypeRef::ProtocolComposition {
                protocols,
                superclass,
                has_explicit_any_object,
            } => {
                f.write_str("protocol_composition")?;
                if *has_explicit_any_object {
                    f.write_str(" any_object")?;
                }
                if let Some(superclass) = superclass {
                    self.write_child(f, *superclass, indent)?;
                }
                for protocol in protocols {
                    self.write_child(f, *protocol, indent)?;
                }
            }
            TypeRef::Metatype {
                instance,
                was_abstract,
            } => {
                f.write_str("metatype")?;
                if *was_abstract {
                    f.write_str(" was_abstract")?;
                }
                self.write_child(f, *instance, indent)?;
            }
            TypeRef::ExistentialMetatype { instance } => {
                f.write_str("existential_metatype")?;
                self.write_child(f, *instance, indent)?;
            }
            TypeRef::GenericTypeParameter { depth, index } => {
                write!(f, "generic_type_parameter depth={depth} index={index}")?;
            }
            TypeRef::DependentMember {
                member,
                base,
                protocol,
            } => {
                write!(f, "dependent_member protocol={protocol}")?;
                self.write_child(f, *base, indent)?;
                write!(f, " member={member}")?;
            }
            TypeRef::ReferenceStorage { ownership, base } => {
                match ownership {
                    ReferenceOwnership::Weak => f.write_str("weak_storage")?,
                    ReferenceOwnership::Unowned => f.write_str("unowned_storage")?,
                    ReferenceOwnership::Unmanaged => f.write_str("unmanaged_storage")?,
                }
                self.write_child(f, *base, indent)?;
            }
            TypeRef::SilBox { boxed } => {
                f.write_str("sil_box")?;
                self.write_child(f, *boxed, indent)?;
            }
            TypeRef::ObjCClass { name } => write!(f, "objective_c_class name={name}")?,
            TypeRef::ObjCProtocol { name } => write!(f, "objective_c_protocol name={name}")?,
            TypeRef::ForeignClass { name } => write!(f, "foreign name={name}")?,
            TypeRef::Opaque => f.write_str("opaque")?,
        }

        f.write_str(")")
    }
}

impl fmt::Display for TypeRefDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root, 0)
    }
}
