//! Trait definition for an AST visitor which walks the tree in DFS order

use super::{Ast, NodeId};

pub trait Visitor<'ast>: Sized {
    type Error;

    fn visit_node(&mut self, ast: &'ast Ast, id: NodeId) -> Result<(), Self::Error> {
        walk_node(self, ast, id)
    }
}

pub fn walk_ast<'a, V: Visitor<'a>>(visitor: &mut V, ast: &'a Ast) -> Result<(), V::Error> {
    visitor.visit_node(ast, ast.root())
}

/// Visits every child of the node in source order
pub fn walk_node<'a, V: Visitor<'a>>(
    visitor: &mut V,
    ast: &'a Ast,
    id: NodeId,
) -> Result<(), V::Error> {
    for child in ast[id].kind.children() {
        visitor.visit_node(ast, child)?;
    }

    Ok(())
}
