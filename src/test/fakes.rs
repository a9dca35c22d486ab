//! Table driven stand-ins for the demangler and the metadata reader.

use std::collections::HashMap;

use crate::{
    demangle::{symbolic_reference_kind, Demangler, Node, NodeKind, SymbolicResolver},
    remote::{ContextDescriptor, ContextDescriptorKind, MetadataReader},
};

pub fn type_node(node: Node) -> Node {
    if node.kind() == NodeKind::Type {
        return node;
    }
    Node::new(NodeKind::Type).with_child(node)
}

fn nominal_node(kind: NodeKind, module: &str, name: &str) -> Node {
    Node::new(kind)
        .with_child(Node::with_text(NodeKind::Module, module))
        .with_child(Node::with_text(NodeKind::Identifier, name))
}

pub fn structure_node(module: &str, name: &str) -> Node {
    nominal_node(NodeKind::Structure, module, name)
}

pub fn class_node(module: &str, name: &str) -> Node {
    nominal_node(NodeKind::Class, module, name)
}

pub fn protocol_node(module: &str, name: &str) -> Node {
    nominal_node(NodeKind::Protocol, module, name)
}

/// Demangles exactly the names it was given.
///
/// A name starting with a symbolic reference control byte is handed to the resolver as a
/// whole; `mangle_node` inverts the table.
#[derive(Default)]
pub struct TableDemangler {
    names: Vec<(Vec<u8>, Node)>,
    readable: bool,
}

impl TableDemangler {
    pub fn new() -> Self {
        TableDemangler::default()
    }

    pub fn with_name(mut self, mangled: &str, node: Node) -> Self {
        self.names.push((mangled.as_bytes().to_vec(), node));
        self
    }

    /// Render nominal types as `Module.Name` instead of the tree dump.
    pub fn with_readable_names(mut self) -> Self {
        self.readable = true;
        self
    }
}

impl Demangler for TableDemangler {
    fn demangle_type(&self, mangled: &[u8], resolver: &mut SymbolicResolver<'_>) -> Option<Node> {
        if let Some((kind, directness)) = mangled.first().and_then(|&b| symbolic_reference_kind(b)) {
            let payload: [u8; 4] = mangled.get(1..5)?.try_into().ok()?;
            let resolved = resolver(kind, directness, i32::from_le_bytes(payload), &mangled[1..])?;
            return Some(type_node(resolved));
        }

        self.names
            .iter()
            .find(|(name, _)| name == mangled)
            .map(|(_, node)| node.clone())
    }

    fn mangle_node(&self, node: &Node) -> Option<String> {
        self.names
            .iter()
            .find(|(_, known)| known == node || known.unwrap_type() == node.unwrap_type())
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
    }

    fn node_to_string(&self, node: &Node) -> String {
        let inner = node.unwrap_type();
        if self.readable && inner.kind().is_nominal() {
            if let (Some(module), Some(name)) = (
                inner.child(0).and_then(Node::text),
                inner.child(1).and_then(Node::text),
            ) {
                return format!("{module}.{name}");
            }
        }
        node.to_string()
    }
}

/// Serves pointers, context descriptors and opaque types from maps.
#[derive(Default)]
pub struct FakeReader {
    pointers: HashMap<u64, u64>,
    contexts: HashMap<u64, (ContextDescriptorKind, Node)>,
    opaque: HashMap<(u64, u32), Node>,
}

impl FakeReader {
    pub fn new() -> Self {
        FakeReader::default()
    }

    pub fn with_pointer(mut self, address: u64, value: u64) -> Self {
        self.pointers.insert(address, value);
        self
    }

    pub fn with_context(mut self, address: u64, kind: ContextDescriptorKind, node: Node) -> Self {
        self.contexts.insert(address, (kind, node));
        self
    }

    pub fn with_opaque_underlying(mut self, descriptor: u64, ordinal: u32, node: Node) -> Self {
        self.opaque.insert((descriptor, ordinal), node);
        self
    }
}

impl MetadataReader for FakeReader {
    fn read_pointer_value(&self, address: u64) -> Option<u64> {
        self.pointers.get(&address).copied()
    }

    fn read_context_descriptor(&self, address: u64) -> Option<ContextDescriptor> {
        self.contexts
            .get(&address)
            .map(|(kind, _)| ContextDescriptor {
                address,
                kind: *kind,
            })
    }

    fn build_context_mangling(&self, descriptor: &ContextDescriptor) -> Option<Node> {
        self.contexts
            .get(&descriptor.address)
            .map(|(_, node)| node.clone())
    }

    fn read_underlying_type_for_opaque_type_descriptor(
        &self,
        descriptor: u64,
        ordinal: u32,
    ) -> Option<Node> {
        self.opaque.get(&(descriptor, ordinal)).cloned()
    }
}
