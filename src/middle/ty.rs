use hashbrown::{HashMap, HashSet};

use crate::{
    error::{CompileError, internal_error},
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec, simple_index},
    middle::primitive::AtomKind,
};

simple_index! {
    /// A type owned by a [`TypeContext`]
    pub struct TypeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// int, char, bool, void
    Atom(AtomKind),
    /// ptr T
    Pointer(TypeId),
    /// arr[length] T
    Array { length: u64, element: TypeId },
    /// A declared type. It starts out undefined so that declarations in one
    /// group can refer to each other, and is defined exactly once.
    Named {
        name: InternedSymbol,
        definition: Option<TypeId>,
    },
}

/// Owns every type of a compilation.
///
/// Atoms, pointers and arrays are interned, so two of them are structurally
/// equal exactly when their ids are. Named types are unique per declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeContext {
    types: IndexVec<TypeId, TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn intern_type(&mut self, kind: TypeKind) -> TypeId {
        if let Some(id) = self.interned.get(&kind) {
            return *id;
        }

        let id = self.types.push(kind);
        self.interned.insert(kind, id);
        id
    }

    pub fn atom(&mut self, kind: AtomKind) -> TypeId {
        self.intern_type(TypeKind::Atom(kind))
    }

    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        self.intern_type(TypeKind::Pointer(pointee))
    }

    pub fn array(&mut self, length: u64, element: TypeId) -> TypeId {
        self.intern_type(TypeKind::Array { length, element })
    }

    /// Creates a fresh, undefined named type
    pub fn declare_named(&mut self, name: InternedSymbol) -> TypeId {
        self.types.push(TypeKind::Named {
            name,
            definition: None,
        })
    }

    pub fn define_named(&mut self, named: TypeId, ty: TypeId) -> Result<(), CompileError> {
        match self.types.get_mut(named) {
            Some(TypeKind::Named { definition, .. }) if definition.is_none() => {
                *definition = Some(ty);
                Ok(())
            }
            Some(TypeKind::Named { name, .. }) => {
                Err(internal_error!("named type `{name}` was defined twice"))
            }
            _ => Err(internal_error!("type {} is not a named type", named.index())),
        }
    }

    pub fn kind(&self, ty: TypeId) -> TypeKind {
        self.types[ty]
    }

    /// Follows named types to the structural type they stand for. Undefined
    /// named types are returned as they are.
    pub fn actual(&self, ty: TypeId) -> TypeId {
        let mut current = ty;

        // A chain of named types can't be longer than the number of types
        for _ in 0..self.types.len() {
            match self.types[current] {
                TypeKind::Named {
                    definition: Some(definition),
                    ..
                } => current = definition,
                _ => break,
            }
        }

        current
    }

    /// Whether expanding the definition of `named` reaches `named` again
    /// without going through a pointer
    pub fn is_infinite(&self, named: TypeId) -> bool {
        let TypeKind::Named {
            definition: Some(definition),
            ..
        } = self.types[named]
        else {
            return false;
        };

        let mut visited = HashSet::new();
        let mut pending = vec![definition];

        while let Some(ty) = pending.pop() {
            if ty == named {
                return true;
            }

            if !visited.insert(ty) {
                continue;
            }

            match self.types[ty] {
                TypeKind::Array { element, .. } => pending.push(element),
                TypeKind::Named {
                    definition: Some(definition),
                    ..
                } => pending.push(definition),
                TypeKind::Atom(_) | TypeKind::Pointer(_) | TypeKind::Named { .. } => {}
            }
        }

        false
    }

    /// Structural equality, looking through named types
    pub fn equal(&self, a: TypeId, b: TypeId) -> bool {
        self.equal_assuming(a, b, &mut HashSet::new())
    }

    /// Pairs in `assumed` are already being compared further up, so they are
    /// taken to be equal. This ends the comparison of recursive types.
    fn equal_assuming(
        &self,
        a: TypeId,
        b: TypeId,
        assumed: &mut HashSet<(TypeId, TypeId)>,
    ) -> bool {
        let (a, b) = (self.actual(a), self.actual(b));

        if a == b || !assumed.insert((a, b)) {
            return true;
        }

        match (self.types[a], self.types[b]) {
            (TypeKind::Atom(a), TypeKind::Atom(b)) => a == b,
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => self.equal_assuming(a, b, assumed),
            (
                TypeKind::Array {
                    length: a_length,
                    element: a_element,
                },
                TypeKind::Array {
                    length: b_length,
                    element: b_element,
                },
            ) => a_length == b_length && self.equal_assuming(a_element, b_element, assumed),
            _ => false,
        }
    }

    pub fn as_atom(&self, ty: TypeId) -> Option<AtomKind> {
        match self.types[self.actual(ty)] {
            TypeKind::Atom(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_atom(&self, ty: TypeId, kind: AtomKind) -> bool {
        self.as_atom(ty) == Some(kind)
    }

    /// The type a pointer points to
    pub fn pointee(&self, ty: TypeId) -> Option<TypeId> {
        match self.types[self.actual(ty)] {
            TypeKind::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    pub fn is_pointer(&self, ty: TypeId) -> bool {
        self.pointee(ty).is_some()
    }

    /// The length and element type of an array
    pub fn as_array(&self, ty: TypeId) -> Option<(u64, TypeId)> {
        match self.types[self.actual(ty)] {
            TypeKind::Array { length, element } => Some((length, element)),
            _ => None,
        }
    }

    /// bool, char, int and pointers
    pub fn is_scalar(&self, ty: TypeId) -> bool {
        match self.types[self.actual(ty)] {
            TypeKind::Atom(kind) => kind.is_scalar(),
            TypeKind::Pointer(_) => true,
            TypeKind::Array { .. } | TypeKind::Named { .. } => false,
        }
    }

    /// Renders a type the way it is written in source
    pub fn display(&self, ty: TypeId) -> String {
        match self.types[ty] {
            TypeKind::Atom(kind) => kind.to_string(),
            TypeKind::Pointer(pointee) => format!("ptr {}", self.display(pointee)),
            TypeKind::Array { length, element } => {
                format!("arr[{length}] {}", self.display(element))
            }
            TypeKind::Named { name, .. } => name.to_string(),
        }
    }
}
