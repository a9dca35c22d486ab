//! Demangle tree decoding.
//!
//! [`TypeRefBuilder::decode_mangled_type`] walks the tree produced by the demangler and builds
//! the corresponding [`TypeRef`](crate::TypeRef) through the factories. Node kinds without a
//! type reference counterpart, and trees that do not have the expected shape, decode to
//! `None`.

use crate::{
    builder::{
        factory::{ImplFunctionRepresentation, ProtocolDecl},
        TypeRefBuilder,
    },
    demangle::{Node, NodeKind},
    typeref::{FunctionConvention, FunctionParam, FunctionTypeFlags, ParameterFlags, TypeRefId},
    Error, Result,
};

/// The module Objective-C declarations are imported into.
const OBJC_MODULE: &str = "__C";

/// Runtime name of an imported Objective-C class or protocol node.
fn objc_name(node: &Node) -> Option<&str> {
    if node.num_children() != 2 {
        return None;
    }
    let module = node.child(0)?;
    let name = node.child(1)?;
    if module.kind() != NodeKind::Module
        || module.text() != Some(OBJC_MODULE)
        || name.kind() != NodeKind::Identifier
    {
        return None;
    }
    name.text()
}

fn index_child(node: &Node, position: usize) -> Option<u32> {
    let child = node.child(position)?;
    if child.kind() != NodeKind::Index {
        return None;
    }
    child.index().and_then(|index| u32::try_from(index).ok())
}

impl<'a> TypeRefBuilder<'a> {
    /// Build the type described by a demangle tree.
    ///
    /// Returns `Ok(None)` if the tree does not describe a type, or describes sugar.
    ///
    /// # Errors
    /// Returns [`Error::RecursionLimit`] for trees nested deeper than the configured bound.
    pub fn decode_mangled_type(&mut self, node: &Node) -> Result<Option<TypeRefId>> {
        self.decode_at(node, 0)
    }

    fn decode_at(&mut self, node: &Node, depth: usize) -> Result<Option<TypeRefId>> {
        if depth > self.config.max_recursion_depth {
            return Err(Error::RecursionLimit(self.config.max_recursion_depth));
        }
        let next = depth + 1;

        match node.kind() {
            NodeKind::Global | NodeKind::Type => match node.child(0) {
                Some(child) => self.decode_at(child, next),
                None => Ok(None),
            },
            NodeKind::Class => {
                if let Some(name) = objc_name(node) {
                    return Ok(Some(self.create_objc_class_type(name)));
                }
                self.decode_nominal(node, next)
            }
            NodeKind::Structure | NodeKind::Enum | NodeKind::OtherNominalType | NodeKind::TypeAlias => {
                self.decode_nominal(node, next)
            }
            NodeKind::Protocol => {
                let protocol = self.decode_protocol_decl(node);
                Ok(Some(self.create_protocol_composition_type(&[protocol], None, false)))
            }
            NodeKind::BoundGenericClass
            | NodeKind::BoundGenericStructure
            | NodeKind::BoundGenericEnum
            | NodeKind::BoundGenericOtherNominalType => self.decode_bound_generic(node, next),
            NodeKind::BuiltinTypeName => {
                let Some(name) = node.text() else {
                    return Ok(None);
                };
                let mangled = self
                    .demangler
                    .mangle_node(node)
                    .unwrap_or_else(|| name.to_owned());
                Ok(Some(self.create_builtin_type(name, &mangled)))
            }
            NodeKind::Metatype | NodeKind::ExistentialMetatype => {
                let (was_abstract, instance) = match node.num_children() {
                    1 => (false, node.child(0)),
                    2 => {
                        let Some(representation) = node
                            .child(0)
                            .filter(|child| child.kind() == NodeKind::MetatypeRepresentation)
                        else {
                            return Ok(None);
                        };
                        (representation.text() != Some("@thin"), node.child(1))
                    }
                    _ => return Ok(None),
                };
                let Some(instance) = instance else {
                    return Ok(None);
                };
                let Some(instance) = self.decode_at(instance, next)? else {
                    return Ok(None);
                };

                Ok(Some(if node.kind() == NodeKind::Metatype {
                    self.create_metatype_type(instance, was_abstract)
                } else {
                    self.create_existential_metatype_type(instance)
                }))
            }
            NodeKind::ProtocolList
            | NodeKind::ProtocolListWithAnyObject
            | NodeKind::ProtocolListWithClass => self.decode_protocol_list(node, next),
            NodeKind::DependentGenericParamType => {
                match (index_child(node, 0), index_child(node, 1)) {
                    (Some(depth), Some(index)) => {
                        Ok(Some(self.create_generic_type_parameter_type(depth, index)))
                    }
                    _ => Ok(None),
                }
            }
            NodeKind::FunctionType
            | NodeKind::NoEscapeFunctionType
            | NodeKind::AutoClosureType
            | NodeKind::ObjCBlock
            | NodeKind::CFunctionPointer
            | NodeKind::ThinFunctionType => self.decode_function(node, next),
            NodeKind::ImplFunctionType => {
                let representation = node
                    .children()
                    .iter()
                    .filter(|child| {
                        matches!(
                            child.kind(),
                            NodeKind::ImplConvention | NodeKind::ImplFunctionAttribute
                        )
                    })
                    .filter_map(|child| child.text())
                    .find_map(ImplFunctionRepresentation::from_convention_attribute)
                    .unwrap_or(ImplFunctionRepresentation::Thick);
                Ok(Some(self.create_impl_function_type(representation)))
            }
            NodeKind::Tuple => {
                let mut elements = Vec::with_capacity(node.num_children());
                let mut is_variadic = false;
                for element in node.children() {
                    if element.kind() != NodeKind::TupleElement {
                        return Ok(None);
                    }
                    if element
                        .children()
                        .iter()
                        .any(|child| child.kind() == NodeKind::VariadicMarker)
                    {
                        is_variadic = true;
                    }
                    let Some(ty) = self.decode_at(element, next)? else {
                        return Ok(None);
                    };
                    elements.push(ty);
                }
                Ok(Some(self.create_tuple_type(&elements, is_variadic)))
            }
            NodeKind::TupleElement => {
                // Name and variadic marker may come in either order ahead of the type
                let Some(ty) = node.children().iter().find(|child| child.kind() == NodeKind::Type)
                else {
                    return Ok(None);
                };
                self.decode_at(ty, next)
            }
            NodeKind::DependentMemberType => {
                let (Some(base), Some(reference)) = (node.child(0), node.child(1)) else {
                    return Ok(None);
                };
                if reference.kind() != NodeKind::DependentAssociatedTypeRef {
                    return Ok(None);
                }
                let Some(member) = reference.child(0).and_then(Node::text) else {
                    return Ok(None);
                };
                let Some(base) = self.decode_at(base, next)? else {
                    return Ok(None);
                };
                let protocol = reference
                    .child(1)
                    .and_then(|protocol| self.decode_protocol_decl(protocol.unwrap_type()));
                Ok(self.create_dependent_member_type(member, base, protocol.as_ref()))
            }
            NodeKind::Weak | NodeKind::Unowned | NodeKind::Unmanaged | NodeKind::SILBoxType => {
                let Some(child) = node.child(0) else {
                    return Ok(None);
                };
                let Some(base) = self.decode_at(child, next)? else {
                    return Ok(None);
                };
                Ok(Some(match node.kind() {
                    NodeKind::Weak => self.create_weak_storage_type(base),
                    NodeKind::Unowned => self.create_unowned_storage_type(base),
                    NodeKind::Unmanaged => self.create_unmanaged_storage_type(base),
                    _ => self.create_sil_box_type(base),
                }))
            }
            NodeKind::SugaredOptional
            | NodeKind::SugaredArray
            | NodeKind::SugaredParen
            | NodeKind::DynamicSelf => {
                let Some(child) = node.child(0) else {
                    return Ok(None);
                };
                let Some(base) = self.decode_at(child, next)? else {
                    return Ok(None);
                };
                Ok(match node.kind() {
                    NodeKind::SugaredOptional => self.create_optional_type(base),
                    NodeKind::SugaredArray => self.create_array_type(base),
                    NodeKind::SugaredParen => self.create_paren_type(base),
                    _ => self.create_dynamic_self_type(base),
                })
            }
            NodeKind::SugaredDictionary => {
                let (Some(key), Some(value)) = (node.child(0), node.child(1)) else {
                    return Ok(None);
                };
                let (Some(key), Some(value)) = (self.decode_at(key, next)?, self.decode_at(value, next)?)
                else {
                    return Ok(None);
                };
                Ok(self.create_dictionary_type(key, value))
            }
            NodeKind::OpaqueType => {
                let (Some(descriptor), Some(ordinal), Some(arg_lists)) =
                    (node.child(0), index_child(node, 1), node.child(2))
                else {
                    return Ok(None);
                };

                let mut generic_args = Vec::with_capacity(arg_lists.num_children());
                for list in arg_lists.children() {
                    let mut args = Vec::with_capacity(list.num_children());
                    for arg in list.children() {
                        let Some(arg) = self.decode_at(arg, next)? else {
                            return Ok(None);
                        };
                        args.push(arg);
                    }
                    generic_args.push(args);
                }
                self.resolve_opaque_type(descriptor, &generic_args, ordinal)
            }
            _ => Ok(None),
        }
    }

    /// Class, struct, enum, alias and other nominal declarations.
    fn decode_nominal(&mut self, node: &Node, depth: usize) -> Result<Option<TypeRefId>> {
        let Some((decl, parent)) = self.decode_type_decl(node, depth)? else {
            return Ok(None);
        };
        if node.kind() == NodeKind::TypeAlias {
            return Ok(self.create_type_alias_type(&decl, parent));
        }
        Ok(Some(self.create_nominal_type(&decl, parent)))
    }

    /// The declaration name of a nominal node and its decoded enclosing type.
    fn decode_type_decl(
        &mut self,
        node: &Node,
        depth: usize,
    ) -> Result<Option<(String, Option<TypeRefId>)>> {
        let Some(decl) = self.create_type_decl(node) else {
            return Ok(None);
        };

        let parent = match node.child(0) {
            Some(context) if context.kind().is_nominal() || context.kind().is_bound_generic() => {
                match self.decode_at(context, depth)? {
                    Some(parent) => Some(parent),
                    None => return Ok(None),
                }
            }
            _ => None,
        };
        Ok(Some((decl, parent)))
    }

    fn decode_bound_generic(&mut self, node: &Node, depth: usize) -> Result<Option<TypeRefId>> {
        let (Some(unbound), Some(arg_list)) = (node.child(0), node.child(1)) else {
            return Ok(None);
        };
        if arg_list.kind() != NodeKind::TypeList {
            return Ok(None);
        }

        let mut args = Vec::with_capacity(arg_list.num_children());
        for arg in arg_list.children() {
            let Some(arg) = self.decode_at(arg, depth)? else {
                return Ok(None);
            };
            args.push(arg);
        }

        let unbound = unbound.unwrap_type();
        if unbound.kind() == NodeKind::Class {
            if let Some(name) = objc_name(unbound) {
                return Ok(Some(self.create_bound_generic_objc_class_type(name, &args)));
            }
        }

        let Some((decl, parent)) = self.decode_type_decl(unbound, depth)? else {
            return Ok(None);
        };
        Ok(Some(self.create_bound_generic_type(&decl, &args, parent)))
    }

    fn decode_protocol_decl(&self, node: &Node) -> Option<ProtocolDecl> {
        if node.kind() != NodeKind::Protocol {
            return None;
        }
        match objc_name(node) {
            Some(name) => Some(self.create_objc_protocol_decl(name)),
            None => self.create_protocol_decl(node),
        }
    }

    fn decode_protocol_list(&mut self, node: &Node, depth: usize) -> Result<Option<TypeRefId>> {
        let Some(mut list) = node.child(0) else {
            return Ok(None);
        };
        if list.kind() == NodeKind::ProtocolList {
            let Some(inner) = list.child(0) else {
                return Ok(None);
            };
            list = inner;
        }
        if list.kind() != NodeKind::TypeList {
            return Ok(None);
        }

        let protocols: Vec<Option<ProtocolDecl>> = list
            .children()
            .iter()
            .map(|protocol| self.decode_protocol_decl(protocol.unwrap_type()))
            .collect();

        let (superclass, is_class_bound) = match node.kind() {
            NodeKind::ProtocolListWithClass => {
                let Some(superclass) = node.child(1) else {
                    return Ok(None);
                };
                match self.decode_at(superclass, depth)? {
                    Some(superclass) => (Some(superclass), true),
                    None => return Ok(None),
                }
            }
            NodeKind::ProtocolListWithAnyObject => (None, true),
            _ => (None, false),
        };

        Ok(Some(self.create_protocol_composition_type(
            &protocols,
            superclass,
            is_class_bound,
        )))
    }

    fn decode_function(&mut self, node: &Node, depth: usize) -> Result<Option<TypeRefId>> {
        let convention = match node.kind() {
            NodeKind::ObjCBlock => FunctionConvention::Block,
            NodeKind::CFunctionPointer => FunctionConvention::CFunctionPointer,
            NodeKind::ThinFunctionType => FunctionConvention::Thin,
            _ => FunctionConvention::Swift,
        };

        let mut children = node.children();
        let throws = children
            .first()
            .is_some_and(|child| child.kind() == NodeKind::ThrowsAnnotation);
        if throws {
            children = &children[1..];
        }

        let [arguments, result] = children else {
            return Ok(None);
        };
        if arguments.kind() != NodeKind::ArgumentTuple || result.kind() != NodeKind::ReturnType {
            return Ok(None);
        }

        let Some(parameters) = self.decode_parameters(arguments, depth)? else {
            return Ok(None);
        };
        let Some(result) = result.child(0) else {
            return Ok(None);
        };
        let Some(result) = self.decode_at(result, depth)? else {
            return Ok(None);
        };

        let flags = FunctionTypeFlags {
            convention,
            throws,
            escaping: matches!(node.kind(), NodeKind::FunctionType | NodeKind::AutoClosureType),
        };
        Ok(Some(self.create_function_type(&parameters, result, flags)))
    }

    fn decode_parameters(&mut self, arguments: &Node, depth: usize) -> Result<Option<Vec<FunctionParam>>> {
        let Some(input) = arguments.child(0) else {
            return Ok(None);
        };

        let tuple = input.unwrap_type();
        if tuple.kind() != NodeKind::Tuple {
            return Ok(self.decode_parameter(input, None, ParameterFlags::empty(), depth)?.map(|param| vec![param]));
        }

        let mut parameters = Vec::with_capacity(tuple.num_children());
        for element in tuple.children() {
            let mut label = None;
            let mut flags = ParameterFlags::empty();
            let mut ty = None;
            for child in element.children() {
                match child.kind() {
                    NodeKind::TupleElementName => label = child.text().map(str::to_owned),
                    NodeKind::VariadicMarker => flags |= ParameterFlags::VARIADIC,
                    _ => ty = Some(child),
                }
            }
            let Some(ty) = ty else {
                return Ok(None);
            };
            let Some(param) = self.decode_parameter(ty, label, flags, depth)? else {
                return Ok(None);
            };
            parameters.push(param);
        }
        Ok(Some(parameters))
    }

    fn decode_parameter(
        &mut self,
        node: &Node,
        label: Option<String>,
        mut flags: ParameterFlags,
        depth: usize,
    ) -> Result<Option<FunctionParam>> {
        let mut ty = node.unwrap_type();
        let ownership = match ty.kind() {
            NodeKind::InOut => Some(ParameterFlags::INOUT),
            NodeKind::Shared => Some(ParameterFlags::SHARED),
            NodeKind::Owned => Some(ParameterFlags::OWNED),
            _ => None,
        };
        if let Some(ownership) = ownership {
            flags |= ownership;
            let Some(inner) = ty.child(0) else {
                return Ok(None);
            };
            ty = inner;
        }

        Ok(self
            .decode_at(ty, depth)?
            .map(|ty| FunctionParam { label, ty, flags }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::BuilderConfig,
        test::{structure_node, type_node, TableDemangler},
        typeref::{TypeRef, TypeRefKind},
    };

    fn int_node() -> Node {
        type_node(structure_node("Swift", "Int"))
    }

    fn generic_param(depth: u64, index: u64) -> Node {
        type_node(
            Node::new(NodeKind::DependentGenericParamType)
                .with_child(Node::with_index(NodeKind::Index, depth))
                .with_child(Node::with_index(NodeKind::Index, index)),
        )
    }

    fn builder() -> TypeRefBuilder<'static> {
        let demangler = TableDemangler::new()
            .with_name("Si", int_node())
            .with_name("Sb", type_node(structure_node("Swift", "Bool")))
            .with_name("Sa", type_node(structure_node("Swift", "Array")))
            .with_name("4Test3FooC", type_node(
                Node::new(NodeKind::Class)
                    .with_child(Node::with_text(NodeKind::Module, "Test"))
                    .with_child(Node::with_text(NodeKind::Identifier, "Foo")),
            ))
            .with_name("4Test1PP", type_node(
                Node::new(NodeKind::Protocol)
                    .with_child(Node::with_text(NodeKind::Module, "Test"))
                    .with_child(Node::with_text(NodeKind::Identifier, "P")),
            ));
        TypeRefBuilder::new(demangler)
    }

    #[test]
    fn nominal_and_bound_generic() {
        let mut builder = builder();
        let int = builder.decode_mangled_type(&int_node()).unwrap().unwrap();
        assert_eq!(builder.get(int).and_then(TypeRef::mangled_name), Some("Si"));

        let array = type_node(
            Node::new(NodeKind::BoundGenericStructure)
                .with_child(type_node(structure_node("Swift", "Array")))
                .with_child(Node::new(NodeKind::TypeList).with_child(int_node())),
        );
        let id = builder.decode_mangled_type(&array).unwrap().unwrap();
        assert_eq!(
            builder.get(id),
            Some(&TypeRef::BoundGeneric {
                mangled_name: "Sa".into(),
                generic_params: vec![int],
                parent: None,
            })
        );
    }

    #[test]
    fn tuples_round_trip_through_the_pool() {
        let mut builder = builder();
        let tuple = type_node(
            Node::new(NodeKind::Tuple)
                .with_child(
                    Node::new(NodeKind::TupleElement)
                        .with_child(Node::with_text(NodeKind::TupleElementName, "a"))
                        .with_child(int_node()),
                )
                .with_child(Node::new(NodeKind::TupleElement).with_child(generic_param(0, 0))),
        );

        let first = builder.decode_mangled_type(&tuple).unwrap().unwrap();
        let second = builder.decode_mangled_type(&tuple).unwrap().unwrap();
        assert_eq!(first, second);

        let int = builder.create_nominal_type("Si", None);
        let param = builder.create_generic_type_parameter_type(0, 0);
        assert_eq!(builder.create_tuple_type(&[int, param], false), first);
    }

    #[test]
    fn sugar_decodes_to_nothing() {
        let mut builder = builder();
        let optional = type_node(Node::new(NodeKind::SugaredOptional).with_child(int_node()));
        let dictionary = type_node(
            Node::new(NodeKind::SugaredDictionary)
                .with_child(int_node())
                .with_child(int_node()),
        );
        assert_eq!(builder.decode_mangled_type(&optional).unwrap(), None);
        assert_eq!(builder.decode_mangled_type(&dictionary).unwrap(), None);
        assert_eq!(
            builder.decode_mangled_type(&Node::new(NodeKind::Identifier)).unwrap(),
            None
        );
    }

    #[test]
    fn functions() {
        let mut builder = builder();
        let function = type_node(
            Node::new(NodeKind::FunctionType)
                .with_child(Node::new(NodeKind::ThrowsAnnotation))
                .with_child(
                    Node::new(NodeKind::ArgumentTuple).with_child(type_node(
                        Node::new(NodeKind::Tuple).with_child(
                            Node::new(NodeKind::TupleElement)
                                .with_child(Node::with_text(NodeKind::TupleElementName, "into"))
                                .with_child(type_node(Node::new(NodeKind::InOut).with_child(int_node()))),
                        ),
                    )),
                )
                .with_child(Node::new(NodeKind::ReturnType).with_child(type_node(Node::new(NodeKind::Tuple)))),
        );

        let id = builder.decode_mangled_type(&function).unwrap().unwrap();
        let Some(TypeRef::Function {
            parameters,
            flags,
            ..
        }) = builder.get(id)
        else {
            panic!("expected a function");
        };
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].label.as_deref(), Some("into"));
        assert_eq!(parameters[0].flags, ParameterFlags::INOUT);
        assert!(flags.throws);
        assert!(flags.escaping);
        assert_eq!(flags.convention, FunctionConvention::Swift);

        let block = type_node(
            Node::new(NodeKind::ObjCBlock)
                .with_child(Node::new(NodeKind::ArgumentTuple).with_child(int_node()))
                .with_child(Node::new(NodeKind::ReturnType).with_child(int_node())),
        );
        let id = builder.decode_mangled_type(&block).unwrap().unwrap();
        let Some(TypeRef::Function { parameters, flags, .. }) = builder.get(id) else {
            panic!("expected a function");
        };
        assert_eq!(parameters.len(), 1);
        assert_eq!(flags.convention, FunctionConvention::Block);
        assert!(!flags.throws);

        let lowered = type_node(
            Node::new(NodeKind::ImplFunctionType)
                .with_child(Node::with_text(NodeKind::ImplConvention, "@callee_guaranteed"))
                .with_child(Node::with_text(NodeKind::ImplFunctionAttribute, "@convention(c)")),
        );
        let id = builder.decode_mangled_type(&lowered).unwrap().unwrap();
        let Some(TypeRef::Function { flags, .. }) = builder.get(id) else {
            panic!("expected a function");
        };
        assert_eq!(flags.convention, FunctionConvention::CFunctionPointer);
    }

    #[test]
    fn objc_classes_and_protocols() {
        let mut builder = builder();
        let objc = |kind, name: &str| {
            Node::new(kind)
                .with_child(Node::with_text(NodeKind::Module, "__C"))
                .with_child(Node::with_text(NodeKind::Identifier, name))
        };

        let class = builder
            .decode_mangled_type(&type_node(objc(NodeKind::Class, "NSObject")))
            .unwrap()
            .unwrap();
        assert_eq!(builder.get(class).map(TypeRef::kind), Some(TypeRefKind::ObjCClass));

        let composition = type_node(
            Node::new(NodeKind::ProtocolListWithAnyObject).with_child(
                Node::new(NodeKind::ProtocolList).with_child(
                    Node::new(NodeKind::TypeList)
                        .with_child(type_node(objc(NodeKind::Protocol, "NSCopying")))
                        .with_child(type_node(
                            Node::new(NodeKind::Protocol)
                                .with_child(Node::with_text(NodeKind::Module, "Test"))
                                .with_child(Node::with_text(NodeKind::Identifier, "P")),
                        )),
                ),
            ),
        );
        let id = builder.decode_mangled_type(&composition).unwrap().unwrap();
        let Some(TypeRef::ProtocolComposition {
            protocols,
            superclass,
            has_explicit_any_object,
        }) = builder.get(id).cloned()
        else {
            panic!("expected a composition");
        };
        assert!(has_explicit_any_object);
        assert_eq!(superclass, None);
        assert_eq!(
            builder.get(protocols[0]),
            Some(&TypeRef::ObjCProtocol {
                name: "NSCopying".into()
            })
        );
        assert_eq!(builder.get(protocols[1]).and_then(TypeRef::mangled_name), Some("4Test1PP"));
    }

    #[test]
    fn metatypes_and_dependent_members() {
        let mut builder = builder();
        let metatype = type_node(
            Node::new(NodeKind::Metatype)
                .with_child(Node::with_text(NodeKind::MetatypeRepresentation, "@thick"))
                .with_child(int_node()),
        );
        let id = builder.decode_mangled_type(&metatype).unwrap().unwrap();
        assert!(matches!(
            builder.get(id),
            Some(TypeRef::Metatype {
                was_abstract: true,
                ..
            })
        ));

        let thin = type_node(
            Node::new(NodeKind::Metatype)
                .with_child(Node::with_text(NodeKind::MetatypeRepresentation, "@thin"))
                .with_child(int_node()),
        );
        let id = builder.decode_mangled_type(&thin).unwrap().unwrap();
        assert!(matches!(
            builder.get(id),
            Some(TypeRef::Metatype {
                was_abstract: false,
                ..
            })
        ));

        let member = type_node(
            Node::new(NodeKind::DependentMemberType)
                .with_child(generic_param(0, 0))
                .with_child(
                    Node::new(NodeKind::DependentAssociatedTypeRef)
                        .with_child(Node::with_text(NodeKind::Identifier, "Element"))
                        .with_child(type_node(
                            Node::new(NodeKind::Protocol)
                                .with_child(Node::with_text(NodeKind::Module, "Test"))
                                .with_child(Node::with_text(NodeKind::Identifier, "P")),
                        )),
                ),
        );
        let id = builder.decode_mangled_type(&member).unwrap().unwrap();
        let base = builder.create_generic_type_parameter_type(0, 0);
        assert_eq!(
            builder.get(id),
            Some(&TypeRef::DependentMember {
                member: "Element".into(),
                base,
                protocol: "4Test1PP".into(),
            })
        );

        let weak = type_node(Node::new(NodeKind::Weak).with_child(type_node(
            Node::new(NodeKind::Class)
                .with_child(Node::with_text(NodeKind::Module, "Test"))
                .with_child(Node::with_text(NodeKind::Identifier, "Foo")),
        )));
        let id = builder.decode_mangled_type(&weak).unwrap().unwrap();
        assert_eq!(
            builder.get(id).map(TypeRef::kind),
            Some(TypeRefKind::ReferenceStorage)
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let mut node = int_node();
        for _ in 0..10 {
            node = type_node(Node::new(NodeKind::Weak).with_child(node));
        }

        let mut strict = TypeRefBuilder::new(TableDemangler::new().with_name("Si", int_node()))
            .with_config(BuilderConfig {
                max_recursion_depth: 8,
                ..BuilderConfig::default()
            });
        assert!(matches!(
            strict.decode_mangled_type(&node),
            Err(Error::RecursionLimit(8))
        ));
        assert!(builder().decode_mangled_type(&node).unwrap().is_some());
    }
}
