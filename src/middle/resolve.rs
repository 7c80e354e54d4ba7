use log::{debug, trace};

use crate::{
    error::{CompileError, internal_error},
    frontend::ast::{Ast, Identifier, NodeId, NodeKind},
    index::Index,
    middle::{
        attributes::{AttributeMap, AttributeTable},
        symbol_table::SymbolTable,
    },
};

/// Maps every use of a name to the declaration it refers to
#[derive(Debug, Clone, PartialEq)]
pub struct NameResolution {
    /// Keyed by [`NodeKind::Name`], [`NodeKind::TypeName`] and
    /// [`NodeKind::Call`] nodes
    pub declared_at: AttributeTable<NodeId>,
}

/// AST name resolver
///
/// Every declaration group binds all of its names before any of its
/// declarations are resolved, so the declarations of a group can refer to
/// each other regardless of order.
#[derive(Debug)]
pub struct Resolver<'ast> {
    ast: &'ast Ast,
    symbols: SymbolTable,
    declared_at: AttributeMap<NodeId>,
}

impl<'ast> Resolver<'ast> {
    pub fn resolve_names(ast: &'ast Ast) -> Result<NameResolution, CompileError> {
        let mut resolver = Self {
            ast,
            symbols: SymbolTable::new(),
            declared_at: AttributeMap::new("declared_at", ast),
        };

        resolver.resolve(ast.root())?;

        let declared_at = resolver.declared_at.lock();
        debug!("resolved {} name uses", declared_at.len());

        Ok(NameResolution { declared_at })
    }

    fn resolve(&mut self, id: NodeId) -> Result<(), CompileError> {
        let ast = self.ast;

        match &ast[id].kind {
            NodeKind::Declarations(declarations) => self.resolve_declarations(declarations),
            NodeKind::FunctionDeclaration(function) => {
                // The enclosing group already opened the function's own scope,
                // which holds the parameter and return types
                for &parameter in &function.parameters {
                    let NodeKind::ParameterDeclaration { ty, .. } = &ast[parameter].kind else {
                        return Err(internal_error!(
                            "parameter {} of `{}` is not a parameter declaration",
                            parameter.index(),
                            function.name.symbol
                        ));
                    };

                    self.resolve(*ty)?;
                }

                self.resolve(function.return_type)?;

                let Some(body) = function.body else {
                    return Ok(());
                };

                self.symbols.push_scope();

                for &parameter in &function.parameters {
                    self.declare(parameter)?;
                }

                self.resolve(body)?;
                self.symbols.pop_scope();

                Ok(())
            }
            NodeKind::Name(name) | NodeKind::TypeName(name) => self.bind(id, *name),
            NodeKind::Call { callee, arguments } => {
                self.bind(id, *callee)?;

                for &argument in arguments {
                    self.resolve(argument)?;
                }

                Ok(())
            }
            NodeKind::Block {
                declarations,
                statements,
                result,
            } => {
                self.symbols.push_scope();
                self.resolve(*declarations)?;

                for &statement in statements {
                    self.resolve(statement)?;
                }

                self.resolve(*result)?;
                self.symbols.pop_scope();

                Ok(())
            }
            kind => {
                for child in kind.children() {
                    self.resolve(child)?;
                }

                Ok(())
            }
        }
    }

    fn resolve_declarations(&mut self, declarations: &[NodeId]) -> Result<(), CompileError> {
        for &declaration in declarations {
            self.declare(declaration)?;
        }

        for &declaration in declarations {
            self.symbols.push_scope();
            self.resolve(declaration)?;
            self.symbols.pop_scope();
        }

        Ok(())
    }

    /// Adds a declaration to the innermost scope
    fn declare(&mut self, declaration: NodeId) -> Result<(), CompileError> {
        let name = self.ast[declaration]
            .kind
            .declared_name()
            .ok_or_else(|| internal_error!("node {} declares nothing", declaration.index()))?;

        self.symbols.insert(name, declaration)?;

        Ok(())
    }

    fn bind(&mut self, id: NodeId, name: Identifier) -> Result<(), CompileError> {
        let declaration = self.symbols.lookup(name)?;

        trace!(
            "`{}` at {} refers to node {}",
            name.symbol,
            name.span,
            declaration.index()
        );

        self.declared_at.insert(id, declaration)
    }
}
