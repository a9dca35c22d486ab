//! Fixtures shared by the integration tests: a name table demangler and a writer for
//! synthetic reflection images.

#![allow(dead_code)]

use reflscope::{
    demangle::{symbolic_reference_kind, SymbolicResolver},
    reflection::FieldDescriptorKind,
    Demangler, Node, NodeKind, ReflectionSections, SectionRange,
};

pub const IMAGE_BASE: u64 = 0x7f00_0000_0000;

pub fn ty(node: Node) -> Node {
    Node::new(NodeKind::Type).with_child(node)
}

pub fn nominal(kind: NodeKind, module: &str, name: &str) -> Node {
    ty(Node::new(kind)
        .with_child(Node::with_text(NodeKind::Module, module))
        .with_child(Node::with_text(NodeKind::Identifier, name)))
}

/// Knows a fixed set of mangled names.
#[derive(Default)]
pub struct NameTable {
    names: Vec<(Vec<u8>, Node)>,
}

impl NameTable {
    /// `Si`, `Sb`, `SS` and a few types of a `Zoo` module.
    pub fn standard() -> Self {
        NameTable::default()
            .with("Si", nominal(NodeKind::Structure, "Swift", "Int"))
            .with("Sb", nominal(NodeKind::Structure, "Swift", "Bool"))
            .with("SS", nominal(NodeKind::Structure, "Swift", "String"))
            .with("3Zoo6AnimalC", nominal(NodeKind::Class, "Zoo", "Animal"))
            .with("3Zoo3CatC", nominal(NodeKind::Class, "Zoo", "Cat"))
            .with("3Zoo4DietO", nominal(NodeKind::Enum, "Zoo", "Diet"))
            .with("3Zoo4PawsV", nominal(NodeKind::Structure, "Zoo", "Paws"))
    }

    pub fn with(mut self, mangled: &str, node: Node) -> Self {
        self.names.push((mangled.as_bytes().to_vec(), node));
        self
    }
}

impl Demangler for NameTable {
    fn demangle_type(&self, mangled: &[u8], resolver: &mut SymbolicResolver<'_>) -> Option<Node> {
        if let Some((kind, directness)) = mangled.first().and_then(|&b| symbolic_reference_kind(b)) {
            let offset = i32::from_le_bytes(mangled.get(1..5)?.try_into().ok()?);
            return resolver(kind, directness, offset, &mangled[1..]).map(ty);
        }

        self.names
            .iter()
            .find(|(name, _)| name == mangled)
            .map(|(_, node)| node.clone())
    }

    fn mangle_node(&self, node: &Node) -> Option<String> {
        self.names
            .iter()
            .find(|(_, known)| known.unwrap_type() == node.unwrap_type())
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
    }
}

enum Pool {
    TypeRef,
    ReflStr,
}

/// Writes `fieldmd`, `builtin` and `capture` records followed by the two string pools.
#[derive(Default)]
pub struct ImageWriter {
    field: Vec<u8>,
    builtin: Vec<u8>,
    capture: Vec<u8>,
    strings: Vec<(usize, usize, Pool, Vec<u8>)>,
}

pub struct WrittenImage {
    pub bytes: Vec<u8>,
    pub sections: ReflectionSections,
    pub capture_offsets: Vec<usize>,
}

const FIELD: usize = 0;
const BUILTIN: usize = 1;
const CAPTURE: usize = 2;

impl ImageWriter {
    fn section(&mut self, section: usize) -> &mut Vec<u8> {
        match section {
            FIELD => &mut self.field,
            BUILTIN => &mut self.builtin,
            _ => &mut self.capture,
        }
    }

    fn u16(&mut self, section: usize, value: u16) {
        self.section(section).extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, section: usize, value: u32) {
        self.section(section).extend_from_slice(&value.to_le_bytes());
    }

    fn name(&mut self, section: usize, pool: Pool, name: Option<&str>) {
        let at = self.section(section).len();
        self.u32(section, 0);
        if let Some(name) = name {
            self.strings.push((section, at, pool, name.as_bytes().to_vec()));
        }
    }

    pub fn field_descriptor(
        &mut self,
        mangled_name: &str,
        superclass: Option<&str>,
        kind: FieldDescriptorKind,
        fields: &[(&str, Option<&str>)],
    ) -> &mut Self {
        self.name(FIELD, Pool::TypeRef, Some(mangled_name));
        self.name(FIELD, Pool::TypeRef, superclass);
        self.u16(FIELD, kind as u16);
        self.u16(FIELD, 12);
        self.u32(FIELD, fields.len() as u32);
        for (name, type_name) in fields {
            self.u32(FIELD, 0);
            self.name(FIELD, Pool::TypeRef, *type_name);
            self.name(FIELD, Pool::ReflStr, Some(name));
        }
        self
    }

    pub fn builtin(&mut self, mangled_name: &str, size: u32, alignment: u32, stride: u32) -> &mut Self {
        self.name(BUILTIN, Pool::TypeRef, Some(mangled_name));
        self.u32(BUILTIN, size);
        self.u32(BUILTIN, alignment);
        self.u32(BUILTIN, stride);
        self.u32(BUILTIN, 0);
        self
    }

    pub fn capture(&mut self, captures: &[&str], sources: &[(&str, &str)], num_bindings: u32) -> &mut Self {
        self.u32(CAPTURE, captures.len() as u32);
        self.u32(CAPTURE, sources.len() as u32);
        self.u32(CAPTURE, num_bindings);
        for capture in captures {
            self.name(CAPTURE, Pool::TypeRef, Some(capture));
        }
        for (type_name, source) in sources {
            self.name(CAPTURE, Pool::TypeRef, Some(type_name));
            self.name(CAPTURE, Pool::ReflStr, Some(source));
        }
        self
    }

    /// Capture descriptors are found by address, so their offsets are reported back.
    pub fn write(&self) -> WrittenImage {
        let builtin_start = self.field.len();
        let capture_start = builtin_start + self.builtin.len();
        let typeref_start = capture_start + self.capture.len();

        let mut bytes = [self.field.as_slice(), self.builtin.as_slice(), self.capture.as_slice()].concat();
        let mut typeref = Vec::new();
        let mut reflstr = Vec::new();
        let mut patches = Vec::new();
        for (section, at, pool, name) in &self.strings {
            let at = at + [0, builtin_start, capture_start][*section];
            let target = match pool {
                Pool::TypeRef => &mut typeref,
                Pool::ReflStr => &mut reflstr,
            };
            patches.push((at, matches!(pool, Pool::TypeRef), target.len()));
            target.extend_from_slice(name);
            target.push(0);
        }
        let reflstr_start = typeref_start + typeref.len();
        bytes.extend_from_slice(&typeref);
        bytes.extend_from_slice(&reflstr);

        for (at, is_typeref, offset) in patches {
            let target = offset + if is_typeref { typeref_start } else { reflstr_start };
            let relative = (target as i64 - at as i64) as i32;
            bytes[at..at + 4].copy_from_slice(&relative.to_le_bytes());
        }

        let mut capture_offsets = Vec::new();
        let mut offset = 0;
        while offset < self.capture.len() {
            capture_offsets.push(capture_start + offset);
            let count = |at: usize| {
                u32::from_le_bytes(self.capture[at..at + 4].try_into().unwrap()) as usize
            };
            offset += 12 + 4 * count(offset) + 8 * count(offset + 4);
        }

        WrittenImage {
            sections: ReflectionSections {
                field: SectionRange::new(0, self.field.len() as u64),
                builtin: SectionRange::new(builtin_start, self.builtin.len() as u64),
                capture: SectionRange::new(capture_start, self.capture.len() as u64),
                type_reference: SectionRange::new(typeref_start, typeref.len() as u64),
                reflection_string: SectionRange::new(reflstr_start, reflstr.len() as u64),
                ..ReflectionSections::default()
            },
            bytes,
            capture_offsets,
        }
    }
}
