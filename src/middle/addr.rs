use log::{debug, trace};

use crate::{
    error::{CompileError, SemanticError, SemanticErrorKind},
    frontend::ast::{
        Ast, NodeId, NodeKind, UnaryOperatorKind,
        visit::{Visitor, walk_ast, walk_node},
    },
    index::Index,
    middle::{
        attributes::{AttributeMap, AttributeTable},
        type_check::TypeResolution,
    },
};

/// Which expressions denote a memory location rather than just a value
#[derive(Debug, Clone, PartialEq)]
pub struct Addressability {
    pub is_addr: AttributeTable<bool>,
}

/// Classifies every value expression bottom-up. Assignment destinations and
/// operands of `$` must be addressable.
pub struct AddrResolver<'a> {
    types: &'a TypeResolution,
    is_addr: AttributeMap<bool>,
}

impl<'a> AddrResolver<'a> {
    pub fn resolve_addresses(
        ast: &Ast,
        types: &'a TypeResolution,
    ) -> Result<Addressability, CompileError> {
        let mut resolver = Self {
            types,
            is_addr: AttributeMap::new("is_addr", ast),
        };

        walk_ast(&mut resolver, ast)?;

        let is_addr = resolver.is_addr.lock();
        debug!(
            "{} of {} expressions are addressable",
            is_addr.iter().filter(|(_, is_addr)| **is_addr).count(),
            is_addr.len()
        );

        Ok(Addressability { is_addr })
    }

    fn require_address(&self, ast: &Ast, id: NodeId) -> Result<(), CompileError> {
        if *self.is_addr.require(id)? {
            Ok(())
        } else {
            Err(SemanticError::new(ast.span(id), SemanticErrorKind::NotAddressable).into())
        }
    }
}

impl<'ast> Visitor<'ast> for AddrResolver<'_> {
    type Error = CompileError;

    fn visit_node(&mut self, ast: &'ast Ast, id: NodeId) -> Result<(), CompileError> {
        walk_node(self, ast, id)?;

        let is_addr = match &ast[id].kind {
            NodeKind::Literal(_) => false,
            NodeKind::Name(_) => true,
            NodeKind::Unary {
                operator: UnaryOperatorKind::Deref,
                operand,
            } => {
                let operand_type = *self.types.is_of_type.require(*operand)?;
                self.types.types.is_pointer(operand_type)
            }
            NodeKind::Unary {
                operator: UnaryOperatorKind::AddressOf,
                operand,
            } => {
                self.require_address(ast, *operand)?;
                false
            }
            NodeKind::Index { array, .. } => *self.is_addr.require(*array)?,
            NodeKind::Unary { .. }
            | NodeKind::Call { .. }
            | NodeKind::Binary { .. }
            | NodeKind::Block { .. }
            | NodeKind::New(_)
            | NodeKind::Delete(_)
            | NodeKind::Cast { .. } => false,
            NodeKind::Assignment { destination, .. } => {
                return self.require_address(ast, *destination);
            }
            // Declarations, types and the remaining statements
            _ => return Ok(()),
        };

        trace!("node {} is_addr = {is_addr}", id.index());

        self.is_addr.insert(id, is_addr)
    }
}
