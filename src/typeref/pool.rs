use std::{collections::HashMap, ops::Index};

use tracing::trace;

use crate::typeref::{TypeRef, TypeRefId};

/// Append-only arena of interned [`TypeRef`]s.
///
/// Every distinct type is stored once. [`TypeRefPool::intern`] returns the existing handle for
/// a type that is already present.
#[derive(Default)]
pub struct TypeRefPool {
    nodes: boxcar::Vec<TypeRef>,
    lookup: HashMap<TypeRef, TypeRefId>,
}

impl TypeRefPool {
    /// Create an empty pool
    #[must_use]
    pub fn new() -> Self {
        TypeRefPool {
            nodes: boxcar::Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Return the handle of `ty`, inserting it if it is not yet known.
    pub fn intern(&mut self, ty: TypeRef) -> TypeRefId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }

        let id = TypeRefId(self.nodes.push(ty.clone()) as u32);
        trace!(id = id.0, kind = %ty.kind(), "interned type reference");
        self.lookup.insert(ty, id);
        id
    }

    /// Get the type behind a handle.
    #[must_use]
    pub fn get(&self, id: TypeRefId) -> Option<&TypeRef> {
        self.nodes.get(id.0 as usize)
    }

    /// Look up the handle of an already interned type without inserting it.
    #[must_use]
    pub fn find(&self, ty: &TypeRef) -> Option<TypeRefId> {
        self.lookup.get(ty).copied()
    }

    /// Number of distinct types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.count()
    }

    /// Returns `true` if no type was interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate all types in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeRefId, &TypeRef)> {
        self.nodes
            .iter()
            .map(|(index, ty)| (TypeRefId(index as u32), ty))
    }
}

impl Index<TypeRefId> for TypeRefPool {
    type Output = TypeRef;

    fn index(&self, id: TypeRefId) -> &Self::Output {
        &self.nodes[id.0 as usize]
    }
}
