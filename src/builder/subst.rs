//! Generic substitution.
//!
//! Field types, associated type witnesses and superclasses are recorded in terms of the
//! generic parameters of their declaration. To describe them for a concrete specialization,
//! the parameters are replaced by the arguments of that specialization. The map between the
//! two is built from a bound generic type with [`TypeRefBuilder::subst_map`] and applied with
//! [`TypeRefBuilder::substitute`].
//!
//! Dependent members are resolved while substituting: once the base of `T.Element` is
//! concrete, the `Element` witness is looked up in the associated type sections, walking up
//! the superclass chain if the base does not conform directly.

use std::collections::BTreeMap;

use tracing::trace;

use crate::{
    builder::TypeRefBuilder,
    typeref::{FunctionParam, TypeRef, TypeRefId},
    Error, Result,
};

/// Replacement types keyed by generic parameter (depth, index).
pub type GenericArgumentMap = BTreeMap<(u32, u32), TypeRefId>;

impl<'a> TypeRefBuilder<'a> {
    /// Replace the generic parameters in `id` by their entries in `substitutions`.
    ///
    /// Parameters without an entry are left in place. Dependent members whose base becomes a
    /// nominal type are replaced by the type witness of the conformance, if one is recorded.
    ///
    /// # Errors
    /// Returns [`Error::RecursionLimit`] for types nested deeper than the configured bound,
    /// and propagates errors of the witness and superclass lookups.
    pub fn substitute(&mut self, id: TypeRefId, substitutions: &GenericArgumentMap) -> Result<TypeRefId> {
        self.substitute_at(id, substitutions, 0)
    }

    fn substitute_at(
        &mut self,
        id: TypeRefId,
        substitutions: &GenericArgumentMap,
        depth: usize,
    ) -> Result<TypeRefId> {
        if depth > self.config.max_recursion_depth {
            return Err(Error::RecursionLimit(self.config.max_recursion_depth));
        }
        let Some(ty) = self.pool.get(id).cloned() else {
            return Ok(id);
        };

        let next = depth + 1;
        Ok(match ty {
            TypeRef::Nominal {
                mangled_name,
                parent,
            } => match parent {
                Some(parent) => {
                    let parent = self.substitute_at(parent, substitutions, next)?;
                    self.create_nominal_type(&mangled_name, Some(parent))
                }
                None => id,
            },
            TypeRef::BoundGeneric {
                mangled_name,
                generic_params,
                parent,
            } => {
                let mut args = Vec::with_capacity(generic_params.len());
                for param in generic_params {
                    args.push(self.substitute_at(param, substitutions, next)?);
                }
                let parent = parent
                    .map(|parent| self.substitute_at(parent, substitutions, next))
                    .transpose()?;
                self.create_bound_generic_type(&mangled_name, &args, parent)
            }
            TypeRef::Tuple {
                elements,
                is_variadic,
            } => {
                let mut substituted = Vec::with_capacity(elements.len());
                for element in elements {
                    substituted.push(self.substitute_at(element, substitutions, next)?);
                }
                self.create_tuple_type(&substituted, is_variadic)
            }
            TypeRef::Function {
                parameters,
                result,
                flags,
            } => {
                let mut substituted = Vec::with_capacity(parameters.len());
                for param in parameters {
                    substituted.push(FunctionParam {
                        ty: self.substitute_at(param.ty, substitutions, next)?,
                        ..param
                    });
                }
                let result = self.substitute_at(result, substitutions, next)?;
                self.create_function_type(&substituted, result, flags)
            }
            TypeRef::Metatype {
                instance,
                was_abstract,
            } => {
                let instance = self.substitute_at(instance, substitutions, next)?;
                self.create_metatype_type(instance, was_abstract)
            }
            TypeRef::ReferenceStorage { ownership, base } => {
                let base = self.substitute_at(base, substitutions, next)?;
                self.intern(TypeRef::ReferenceStorage { ownership, base })
            }
            TypeRef::SilBox { boxed } => {
                let boxed = self.substitute_at(boxed, substitutions, next)?;
                self.create_sil_box_type(boxed)
            }
            TypeRef::GenericTypeParameter { depth, index } => {
                substitutions.get(&(depth, index)).copied().unwrap_or(id)
            }
            TypeRef::DependentMember {
                member,
                base,
                protocol,
            } => self.substitute_dependent_member(id, &member, base, &protocol, substitutions, next)?,
            TypeRef::Builtin { .. }
            | TypeRef::ProtocolComposition { .. }
            | TypeRef::ExistentialMetatype { .. }
            | TypeRef::ObjCClass { .. }
            | TypeRef::ObjCProtocol { .. }
            | TypeRef::ForeignClass { .. }
            | TypeRef::Opaque => id,
        })
    }

    fn substitute_dependent_member(
        &mut self,
        original: TypeRefId,
        member: &str,
        base: TypeRefId,
        protocol: &str,
        substitutions: &GenericArgumentMap,
        depth: usize,
    ) -> Result<TypeRefId> {
        let substituted_base = self.substitute_at(base, substitutions, depth)?;

        let mut conforming = substituted_base;
        let mut witness = None;
        for _ in 0..=self.config.max_superclass_chain {
            let Some(mangled_name) = self
                .pool
                .get(conforming)
                .filter(|ty| ty.is_nominal_like())
                .and_then(TypeRef::mangled_name)
                .map(str::to_owned)
            else {
                break;
            };

            witness = self.lookup_type_witness(&mangled_name, member, protocol)?;
            if witness.is_some() {
                break;
            }

            match self.lookup_superclass(conforming)? {
                Some(superclass) => conforming = superclass,
                None => break,
            }
        }

        let Some(witness) = witness else {
            trace!(member, protocol, "no type witness, keeping dependent member");
            return Ok(self.intern(TypeRef::DependentMember {
                member: member.to_owned(),
                base: substituted_base,
                protocol: protocol.to_owned(),
            }));
        };

        match self.subst_map(conforming) {
            Some(witness_substitutions) => {
                self.substitute_at(witness, &witness_substitutions, depth)
            }
            None => Ok(original),
        }
    }

    /// The generic nesting depth of a nominal or bound generic type: the number of enclosing
    /// nominal types.
    #[must_use]
    pub fn generic_depth(&self, id: TypeRefId) -> u32 {
        let mut depth = 0;
        let mut current = self.pool.get(id).and_then(TypeRef::parent);
        while let Some(parent) = current {
            match self.pool.get(parent) {
                Some(ty) if ty.is_nominal_like() => {
                    depth += 1;
                    current = ty.parent();
                }
                _ => break,
            }
        }
        depth
    }

    /// Returns `true` if `id` contains no unsubstituted generic parameter.
    #[must_use]
    pub fn is_concrete(&self, id: TypeRefId) -> bool {
        match self.pool.get(id) {
            None | Some(TypeRef::GenericTypeParameter { .. }) => false,
            Some(TypeRef::DependentMember { base, .. }) => self.is_concrete(*base),
            Some(ty) => ty.children().into_iter().all(|child| self.is_concrete(child)),
        }
    }

    /// The substitutions a nominal or bound generic type applies to the generic parameters of
    /// its declaration and of every enclosing declaration.
    ///
    /// Returns `None` if an argument is not concrete. Types of other kinds yield an empty map.
    #[must_use]
    pub fn subst_map(&self, id: TypeRefId) -> Option<GenericArgumentMap> {
        let mut substitutions = GenericArgumentMap::new();
        match self.pool.get(id)? {
            TypeRef::Nominal { parent, .. } => {
                if let Some(parent) = parent {
                    substitutions.extend(self.subst_map(*parent)?);
                }
            }
            TypeRef::BoundGeneric {
                generic_params,
                parent,
                ..
            } => {
                let depth = self.generic_depth(id);
                for (index, param) in (0u32..).zip(generic_params) {
                    if !self.is_concrete(*param) {
                        return None;
                    }
                    substitutions.insert((depth, index), *param);
                }
                if let Some(parent) = parent {
                    substitutions.extend(self.subst_map(*parent)?);
                }
            }
            _ => {}
        }
        Some(substitutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BuilderConfig, test::TableDemangler, typeref::FunctionTypeFlags};

    fn builder() -> TypeRefBuilder<'static> {
        TypeRefBuilder::new(TableDemangler::new())
    }

    #[test]
    fn parameters_are_replaced() {
        let mut builder = builder();
        let t = builder.create_generic_type_parameter_type(0, 0);
        let u = builder.create_generic_type_parameter_type(0, 1);
        let int = builder.create_nominal_type("Si", None);
        let tuple = builder.create_tuple_type(&[t, u], false);

        let substitutions = GenericArgumentMap::from([((0, 0), int)]);
        let substituted = builder.substitute(tuple, &substitutions).unwrap();

        let expected = builder.create_tuple_type(&[int, u], false);
        assert_eq!(substituted, expected);
        assert!(!builder.is_concrete(substituted));
    }

    #[test]
    fn function_labels_survive() {
        let mut builder = builder();
        let t = builder.create_generic_type_parameter_type(0, 0);
        let int = builder.create_nominal_type("Si", None);
        let result = builder.create_tuple_type(&[], false);
        let param = FunctionParam {
            label: Some("value".into()),
            ..FunctionParam::new(t)
        };
        let function = builder.create_function_type(&[param], result, FunctionTypeFlags::default());

        let substituted = builder
            .substitute(function, &GenericArgumentMap::from([((0, 0), int)]))
            .unwrap();
        let Some(TypeRef::Function { parameters, .. }) = builder.get(substituted) else {
            panic!("expected a function");
        };
        assert_eq!(parameters[0].label.as_deref(), Some("value"));
        assert_eq!(parameters[0].ty, int);
    }

    #[test]
    fn substitution_maps_follow_nesting() {
        let mut builder = builder();
        let int = builder.create_nominal_type("Si", None);
        let string = builder.create_nominal_type("SS", None);
        let t = builder.create_generic_type_parameter_type(0, 0);

        let outer = builder.create_bound_generic_type("4Test5OuterV", &[int], None);
        let inner = builder.create_bound_generic_type("4Test5OuterV5InnerV", &[string], Some(outer));
        let plain = builder.create_nominal_type("4Test5OuterV4LeafV", Some(outer));

        assert_eq!(builder.generic_depth(outer), 0);
        assert_eq!(builder.generic_depth(inner), 1);
        assert_eq!(
            builder.subst_map(inner),
            Some(GenericArgumentMap::from([((0, 0), int), ((1, 0), string)]))
        );
        assert_eq!(
            builder.subst_map(plain),
            Some(GenericArgumentMap::from([((0, 0), int)]))
        );
        assert_eq!(builder.subst_map(int), Some(GenericArgumentMap::new()));

        let open = builder.create_bound_generic_type("Sa", &[t], None);
        assert_eq!(builder.subst_map(open), None);
    }

    #[test]
    fn unresolved_dependent_members_keep_their_shape() {
        let mut builder = builder();
        let t = builder.create_generic_type_parameter_type(0, 0);
        let int = builder.create_nominal_type("Si", None);
        let member = builder.intern(TypeRef::DependentMember {
            member: "Element".into(),
            base: t,
            protocol: "STl".into(),
        });
        assert!(!builder.is_concrete(member));

        let substituted = builder
            .substitute(member, &GenericArgumentMap::from([((0, 0), int)]))
            .unwrap();
        assert_eq!(
            builder.get(substituted),
            Some(&TypeRef::DependentMember {
                member: "Element".into(),
                base: int,
                protocol: "STl".into(),
            })
        );
        assert!(builder.is_concrete(substituted));
    }

    #[test]
    fn recursion_is_bounded() {
        let mut builder = TypeRefBuilder::new(TableDemangler::new()).with_config(BuilderConfig {
            max_recursion_depth: 2,
            ..BuilderConfig::default()
        });
        let t = builder.create_generic_type_parameter_type(0, 0);
        let one = builder.create_tuple_type(&[t], false);
        let two = builder.create_tuple_type(&[one], false);
        let three = builder.create_tuple_type(&[two], false);

        assert!(builder.substitute(two, &GenericArgumentMap::new()).is_ok());
        assert!(matches!(
            builder.substitute(three, &GenericArgumentMap::new()),
            Err(Error::RecursionLimit(2))
        ));
    }
}
