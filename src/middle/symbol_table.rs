use std::collections::VecDeque;

use hashbrown::HashMap;
use log::trace;

use crate::{
    error::{SemanticError, SemanticErrorKind},
    frontend::{ast::{Identifier, NodeId}, intern::InternedSymbol},
};

/// Maps names to their declarations through nested scopes.
///
/// Types, variables, parameters and functions share one namespace.
#[derive(Debug)]
pub struct SymbolTable {
    global_scope: HashMap<InternedSymbol, NodeId>,
    stack: VecDeque<HashMap<InternedSymbol, NodeId>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            global_scope: HashMap::new(),
            stack: VecDeque::new(),
        }
    }

    /// Nesting depth of the innermost scope, 0 being the global scope
    fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opens a scope nested in the current one
    pub fn push_scope(&mut self) {
        self.stack.push_back(HashMap::new());
    }

    /// Closes the innermost scope, forgetting everything declared in it. The
    /// global scope is never closed.
    pub fn pop_scope(&mut self) {
        debug_assert!(
            !self.stack.is_empty(),
            "attempted to pop the global scope"
        );

        self.stack.pop_back();
    }

    fn innermost_scope(&mut self) -> &mut HashMap<InternedSymbol, NodeId> {
        self.stack.back_mut().unwrap_or(&mut self.global_scope)
    }

    /// Binds `name` to `declaration` in the innermost scope
    pub fn insert(&mut self, name: Identifier, declaration: NodeId) -> Result<(), SemanticError> {
        let depth = self.depth();
        let scope = self.innermost_scope();

        if scope.contains_key(&name.symbol) {
            return Err(SemanticError::new(
                name.span,
                SemanticErrorKind::DuplicateName(name.symbol),
            ));
        }

        trace!("binding `{}` at depth {depth}", name.symbol);
        scope.insert(name.symbol, declaration);

        Ok(())
    }

    /// Searches the scopes from the innermost outwards
    pub fn lookup(&self, name: Identifier) -> Result<NodeId, SemanticError> {
        self.stack
            .iter()
            .rev()
            .chain([&self.global_scope])
            .find_map(|scope| scope.get(&name.symbol).copied())
            .ok_or_else(|| {
                SemanticError::new(name.span, SemanticErrorKind::UndeclaredName(name.symbol))
            })
    }
}
