//! Arena allocated abstract syntax tree.
//!
//! Nodes refer to their children by [`NodeId`], and every analysis keys its
//! results by the same ids instead of by node identity.

use super::{Span, intern::InternedSymbol};
use crate::{
    index::{IndexVec, simple_index},
    middle::primitive::AtomKind,
};

pub mod builder;
pub mod visit;

pub use builder::AstBuilder;

simple_index! {
    /// Identifies a node in the [`Ast`] arena
    pub struct NodeId;
}

/// A whole program. The root is always a [`NodeKind::Declarations`] group.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: IndexVec<NodeId, Node>,
    root: NodeId,
}

impl Ast {
    pub(crate) fn new(nodes: IndexVec<NodeId, Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of nodes in the arena. Every [`NodeId`] of this tree is below
    /// this bound.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }
}

impl core::ops::Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    pub span: Span,
    pub symbol: InternedSymbol,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /* Declarations */
    /// A group of declarations which may refer to each other in any order
    Declarations(Vec<NodeId>),
    /// typ name : type
    TypeDeclaration { name: Identifier, ty: NodeId },
    /// var name : type
    VariableDeclaration { name: Identifier, ty: NodeId },
    /// name : type (inside a function's parameter list)
    ParameterDeclaration { name: Identifier, ty: NodeId },
    /// fun name(parameters) : type [= body]
    FunctionDeclaration(FunctionDeclaration),

    /* Types */
    /// int, char, bool, void
    AtomType(AtomKind),
    /// ptr type
    PointerType(NodeId),
    /// arr[length] type
    ArrayType { length: NodeId, element: NodeId },
    /// A reference to a declared type
    TypeName(Identifier),

    /* Statements */
    /// expr;
    ExpressionStatement(NodeId),
    /// expr = expr;
    Assignment { destination: NodeId, source: NodeId },
    /// if cond then stmts [else stmts] end;
    If {
        condition: NodeId,
        positive: Vec<NodeId>,
        negative: Option<Vec<NodeId>>,
    },
    /// while cond do stmts end;
    While { condition: NodeId, body: Vec<NodeId> },

    /* Expressions */
    Literal(Literal),
    /// A reference to a variable or parameter
    Name(Identifier),
    /// name(args)
    Call {
        callee: Identifier,
        arguments: Vec<NodeId>,
    },
    Binary {
        lhs: NodeId,
        operator: BinaryOperatorKind,
        rhs: NodeId,
    },
    Unary {
        operator: UnaryOperatorKind,
        operand: NodeId,
    },
    /// expr[expr]
    Index { array: NodeId, index: NodeId },
    /// { stmts : expr where decls }
    Block {
        declarations: NodeId,
        statements: Vec<NodeId>,
        result: NodeId,
    },
    /// new type
    New(NodeId),
    /// del expr
    Delete(NodeId),
    /// (expr : type)
    Cast { expression: NodeId, ty: NodeId },
}

impl NodeKind {
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Self::TypeDeclaration { .. }
                | Self::VariableDeclaration { .. }
                | Self::ParameterDeclaration { .. }
                | Self::FunctionDeclaration(_)
        )
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::AtomType(_) | Self::PointerType(_) | Self::ArrayType { .. } | Self::TypeName(_)
        )
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::ExpressionStatement(_)
                | Self::Assignment { .. }
                | Self::If { .. }
                | Self::While { .. }
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            Self::Literal(_)
                | Self::Name(_)
                | Self::Call { .. }
                | Self::Binary { .. }
                | Self::Unary { .. }
                | Self::Index { .. }
                | Self::Block { .. }
                | Self::New(_)
                | Self::Delete(_)
                | Self::Cast { .. }
        )
    }

    /// The name introduced by a declaration
    pub fn declared_name(&self) -> Option<Identifier> {
        match self {
            Self::TypeDeclaration { name, .. }
            | Self::VariableDeclaration { name, .. }
            | Self::ParameterDeclaration { name, .. } => Some(*name),
            Self::FunctionDeclaration(function) => Some(function.name),
            _ => None,
        }
    }

    /// Direct children of the node in source order
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Declarations(declarations) => declarations.clone(),
            Self::TypeDeclaration { ty, .. }
            | Self::VariableDeclaration { ty, .. }
            | Self::ParameterDeclaration { ty, .. } => vec![*ty],
            Self::FunctionDeclaration(function) => function
                .parameters
                .iter()
                .copied()
                .chain([function.return_type])
                .chain(function.body)
                .collect(),
            Self::AtomType(_) | Self::TypeName(_) | Self::Literal(_) | Self::Name(_) => vec![],
            Self::PointerType(ty) => vec![*ty],
            Self::ArrayType { length, element } => vec![*length, *element],
            Self::ExpressionStatement(expression) => vec![*expression],
            Self::Assignment {
                destination,
                source,
            } => vec![*destination, *source],
            Self::If {
                condition,
                positive,
                negative,
            } => [*condition]
                .into_iter()
                .chain(positive.iter().copied())
                .chain(negative.iter().flatten().copied())
                .collect(),
            Self::While { condition, body } => [*condition]
                .into_iter()
                .chain(body.iter().copied())
                .collect(),
            Self::Call { arguments, .. } => arguments.clone(),
            Self::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Self::Unary { operand, .. } => vec![*operand],
            Self::Index { array, index } => vec![*array, *index],
            Self::Block {
                declarations,
                statements,
                result,
            } => [*declarations]
                .into_iter()
                .chain(statements.iter().copied())
                .chain([*result])
                .collect(),
            Self::New(ty) => vec![*ty],
            Self::Delete(expression) => vec![*expression],
            Self::Cast { expression, ty } => vec![*expression, *ty],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub parameters: Vec<NodeId>,
    pub return_type: NodeId,
    /// Functions without a body are defined elsewhere (e.g. the runtime)
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    /// The lexeme exactly as it appeared in the source
    pub symbol: InternedSymbol,
}

impl Literal {
    /// The value the literal stands for, or `None` if its lexeme is malformed.
    /// Booleans are 1 and 0, characters their code, `none` and `null` 0.
    pub fn value(&self) -> Option<i64> {
        let lexeme = self.symbol.value();

        match self.kind {
            LiteralKind::Integer => lexeme.parse().ok(),
            LiteralKind::Boolean => match lexeme {
                "true" => Some(1),
                "false" => Some(0),
                _ => None,
            },
            LiteralKind::Char => {
                let mut chars = lexeme.strip_prefix('\'')?.strip_suffix('\'')?.chars();

                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c as i64),
                    _ => None,
                }
            }
            LiteralKind::Void => (lexeme == "none").then_some(0),
            LiteralKind::Pointer => (lexeme == "null").then_some(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer, // 42
    Boolean, // true
    Char,    // 'A'
    Void,    // none
    Pointer, // null
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum BinaryOperatorKind {
    #[strum(serialize = "|")]
    Or,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorClass {
    Arithmetic,
    Logical,
    Equality,
    Relational,
}

impl BinaryOperatorKind {
    pub fn class(self) -> BinaryOperatorClass {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulus => {
                BinaryOperatorClass::Arithmetic
            }
            Self::Or | Self::And => BinaryOperatorClass::Logical,
            Self::Equals | Self::NotEquals => BinaryOperatorClass::Equality,
            Self::LessThan
            | Self::GreaterThan
            | Self::LessThanOrEqualTo
            | Self::GreaterThanOrEqualTo => BinaryOperatorClass::Relational,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum UnaryOperatorKind {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "!")]
    LogicalNot,
    #[strum(serialize = "$")]
    AddressOf,
    #[strum(serialize = "@")]
    Deref,
}
