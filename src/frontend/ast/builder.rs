use super::{
    Ast, BinaryOperatorKind, FunctionDeclaration, Identifier, Literal, LiteralKind, Node, NodeId,
    NodeKind, UnaryOperatorKind,
};
use crate::{
    frontend::{Span, intern::InternedSymbol},
    index::IndexVec,
    middle::primitive::AtomKind,
};

/// Assembles an [`Ast`] bottom-up. Children must be built before their
/// parents, which keeps every id handed out stable.
///
/// Every node gets the span most recently set with [`AstBuilder::at`].
#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: IndexVec<NodeId, Node>,
    span: Span,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the span given to nodes created from now on
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    /// Sets a single character span on the given line and column
    pub fn at_position(&mut self, line: u32, column: u32) -> &mut Self {
        self.at(Span::point(line, column))
    }

    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.next_index();
        self.nodes.push(Node {
            id,
            span: self.span,
            kind,
        })
    }

    /// Wraps up the tree with the given top level declarations as its root
    pub fn finish(mut self, declarations: Vec<NodeId>) -> Ast {
        let root = self.declarations(declarations);
        Ast::new(self.nodes, root)
    }

    fn identifier(&self, name: &str) -> Identifier {
        Identifier {
            span: self.span,
            symbol: InternedSymbol::new(name),
        }
    }

    /* Declarations */

    pub fn declarations(&mut self, declarations: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Declarations(declarations))
    }

    pub fn type_declaration(&mut self, name: &str, ty: NodeId) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::TypeDeclaration { name, ty })
    }

    pub fn variable(&mut self, name: &str, ty: NodeId) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::VariableDeclaration { name, ty })
    }

    pub fn parameter(&mut self, name: &str, ty: NodeId) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::ParameterDeclaration { name, ty })
    }

    pub fn function(
        &mut self,
        name: &str,
        parameters: Vec<NodeId>,
        return_type: NodeId,
        body: NodeId,
    ) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::FunctionDeclaration(FunctionDeclaration {
            name,
            parameters,
            return_type,
            body: Some(body),
        }))
    }

    /// A function whose body is provided by the runtime
    pub fn external_function(
        &mut self,
        name: &str,
        parameters: Vec<NodeId>,
        return_type: NodeId,
    ) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::FunctionDeclaration(FunctionDeclaration {
            name,
            parameters,
            return_type,
            body: None,
        }))
    }

    /* Types */

    pub fn atom_type(&mut self, kind: AtomKind) -> NodeId {
        self.push(NodeKind::AtomType(kind))
    }

    pub fn int_type(&mut self) -> NodeId {
        self.atom_type(AtomKind::Int)
    }

    pub fn char_type(&mut self) -> NodeId {
        self.atom_type(AtomKind::Char)
    }

    pub fn bool_type(&mut self) -> NodeId {
        self.atom_type(AtomKind::Bool)
    }

    pub fn void_type(&mut self) -> NodeId {
        self.atom_type(AtomKind::Void)
    }

    pub fn pointer_type(&mut self, ty: NodeId) -> NodeId {
        self.push(NodeKind::PointerType(ty))
    }

    /// arr[length] element, with the length given as an integer literal
    pub fn array_type(&mut self, length: u64, element: NodeId) -> NodeId {
        let length = self.literal(LiteralKind::Integer, &length.to_string());
        self.push(NodeKind::ArrayType { length, element })
    }

    /// arr[length] element, with an arbitrary length expression
    pub fn array_type_with_length(&mut self, length: NodeId, element: NodeId) -> NodeId {
        self.push(NodeKind::ArrayType { length, element })
    }

    pub fn type_name(&mut self, name: &str) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::TypeName(name))
    }

    /* Statements */

    pub fn expression_statement(&mut self, expression: NodeId) -> NodeId {
        self.push(NodeKind::ExpressionStatement(expression))
    }

    pub fn assign(&mut self, destination: NodeId, source: NodeId) -> NodeId {
        self.push(NodeKind::Assignment {
            destination,
            source,
        })
    }

    pub fn if_then(&mut self, condition: NodeId, positive: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::If {
            condition,
            positive,
            negative: None,
        })
    }

    pub fn if_then_else(
        &mut self,
        condition: NodeId,
        positive: Vec<NodeId>,
        negative: Vec<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::If {
            condition,
            positive,
            negative: Some(negative),
        })
    }

    pub fn while_do(&mut self, condition: NodeId, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::While { condition, body })
    }

    /* Expressions */

    /// A literal with a raw lexeme, which is validated during type checking
    pub fn literal(&mut self, kind: LiteralKind, lexeme: &str) -> NodeId {
        self.push(NodeKind::Literal(Literal {
            kind,
            symbol: InternedSymbol::new(lexeme),
        }))
    }

    pub fn integer(&mut self, value: i64) -> NodeId {
        self.literal(LiteralKind::Integer, &value.to_string())
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.literal(LiteralKind::Boolean, if value { "true" } else { "false" })
    }

    pub fn character(&mut self, value: char) -> NodeId {
        self.literal(LiteralKind::Char, &format!("'{value}'"))
    }

    pub fn none(&mut self) -> NodeId {
        self.literal(LiteralKind::Void, "none")
    }

    pub fn null(&mut self) -> NodeId {
        self.literal(LiteralKind::Pointer, "null")
    }

    pub fn name(&mut self, name: &str) -> NodeId {
        let name = self.identifier(name);
        self.push(NodeKind::Name(name))
    }

    pub fn call(&mut self, callee: &str, arguments: Vec<NodeId>) -> NodeId {
        let callee = self.identifier(callee);
        self.push(NodeKind::Call { callee, arguments })
    }

    pub fn binary(&mut self, lhs: NodeId, operator: BinaryOperatorKind, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Binary { lhs, operator, rhs })
    }

    pub fn unary(&mut self, operator: UnaryOperatorKind, operand: NodeId) -> NodeId {
        self.push(NodeKind::Unary { operator, operand })
    }

    pub fn index(&mut self, array: NodeId, index: NodeId) -> NodeId {
        self.push(NodeKind::Index { array, index })
    }

    /// { statements : result where declarations }
    pub fn block(
        &mut self,
        declarations: Vec<NodeId>,
        statements: Vec<NodeId>,
        result: NodeId,
    ) -> NodeId {
        let declarations = self.declarations(declarations);
        self.push(NodeKind::Block {
            declarations,
            statements,
            result,
        })
    }

    pub fn new_expression(&mut self, ty: NodeId) -> NodeId {
        self.push(NodeKind::New(ty))
    }

    pub fn delete(&mut self, expression: NodeId) -> NodeId {
        self.push(NodeKind::Delete(expression))
    }

    pub fn cast(&mut self, expression: NodeId, ty: NodeId) -> NodeId {
        self.push(NodeKind::Cast { expression, ty })
    }
}
