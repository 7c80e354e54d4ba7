//! Per node analysis results.
//!
//! A stage fills an [`AttributeMap`] while it walks the tree and then
//! [`locks`](AttributeMap::lock) it into an [`AttributeTable`], which later
//! stages can only read.

use crate::{
    error::{CompileError, internal_error},
    frontend::ast::{Ast, NodeId},
    index::{Index, IndexVec},
};

/// A table under construction. Each node may be given a value once.
#[derive(Debug, Clone)]
pub struct AttributeMap<T> {
    name: &'static str,
    values: IndexVec<NodeId, Option<T>>,
}

impl<T: Clone> AttributeMap<T> {
    /// Creates an empty table with a slot for every node of `ast`
    pub fn new(name: &'static str, ast: &Ast) -> Self {
        Self {
            name,
            values: IndexVec::from_elem_n(None, ast.len()),
        }
    }
}

impl<T> AttributeMap<T> {
    pub fn insert(&mut self, id: NodeId, value: T) -> Result<(), CompileError> {
        let name = self.name;

        match self.values.get_mut(id) {
            Some(Some(_)) => Err(internal_error!(
                "`{name}` was written twice for node {}",
                id.index()
            )),
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(internal_error!(
                "node {} is outside of the tree `{name}` was built for",
                id.index()
            )),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.values.get(id).and_then(Option::as_ref)
    }

    /// Like [`get`](Self::get), but a missing value is an internal fault
    pub fn require(&self, id: NodeId) -> Result<&T, CompileError> {
        self.get(id)
            .ok_or_else(|| internal_error!("`{}` has no value for node {}", self.name, id.index()))
    }

    pub fn lock(self) -> AttributeTable<T> {
        AttributeTable {
            name: self.name,
            values: self.values,
        }
    }
}

/// A finished, read-only table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTable<T> {
    name: &'static str,
    values: IndexVec<NodeId, Option<T>>,
}

impl<T> AttributeTable<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.values.get(id).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Like [`get`](Self::get), but a missing value is an internal fault
    pub fn require(&self, id: NodeId) -> Result<&T, CompileError> {
        self.get(id)
            .ok_or_else(|| internal_error!("`{}` has no value for node {}", self.name, id.index()))
    }

    /// Every node with a value, in id order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.values
            .enumerate()
            .filter_map(|(id, value)| value.as_ref().map(|value| (id, value)))
    }

    /// Number of nodes with a value
    pub fn len(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
