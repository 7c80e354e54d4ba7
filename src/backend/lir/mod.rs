//! LIR (Low-level Intermediate Representation). In this form loops and
//! conditionals are simplified to labels and jumps, and names are turned into
//! the addresses of their storage.

use crate::{
    frontend::{
        ast::{BinaryOperatorKind, UnaryOperatorKind},
        intern::InternedSymbol,
    },
    index::{Index, simple_index},
};

pub mod ast_lowering;
pub mod pretty_print;

simple_index! {
    /// Identifies a temporary virtual register
    pub struct TempId;
}

/// A position in the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    /// Globals, top level functions and runtime functions, printed as `_name`
    Named(InternedSymbol),
    /// Generated for nested functions and control flow, printed as `L<n>`
    Anonymous(u32),
}

impl Label {
    pub fn named(name: &str) -> Self {
        Self::Named(InternedSymbol::new(name))
    }
}

/// Hands out the anonymous labels and temporaries of one compilation, so that
/// running the pipeline twice on the same tree yields the same names
#[derive(Debug, Default)]
pub struct LabelGenerator {
    next_label: u32,
    next_temp: TempId,
}

impl Default for TempId {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_label(&mut self) -> Label {
        let label = Label::Anonymous(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn fresh_temp(&mut self) -> TempId {
        let temp = self.next_temp;
        self.next_temp.increment_by(1);
        temp
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Const(i64),
    /// The address of a label
    Name(Label),
    Temp(TempId),
    Binop {
        operator: BinaryOperatorKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// Only `-` and `!`
    Unop {
        operator: UnaryOperatorKind,
        operand: Box<Expression>,
    },
    /// Reads memory at the address
    Mem(Box<Expression>),
    Call {
        label: Label,
        arguments: Vec<Expression>,
    },
    /// Executes the statement, then evaluates to the expression
    Sexpr {
        statement: Box<Statement>,
        expression: Box<Expression>,
    },
}

impl Expression {
    pub fn mem(address: Expression) -> Self {
        Self::Mem(Box::new(address))
    }

    pub fn binop(operator: BinaryOperatorKind, lhs: Expression, rhs: Expression) -> Self {
        Self::Binop {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unop(operator: UnaryOperatorKind, operand: Expression) -> Self {
        Self::Unop {
            operator,
            operand: Box::new(operand),
        }
    }

    pub fn sexpr(statement: Statement, expression: Expression) -> Self {
        Self::Sexpr {
            statement: Box::new(statement),
            expression: Box::new(expression),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Evaluates an expression for its side effects
    Expression(Expression),
    /// Stores `source` at `destination`, which is a [`Expression::Mem`] or a
    /// [`Expression::Temp`]
    Move {
        destination: Expression,
        source: Expression,
    },
    Seq(Vec<Statement>),
    Label(Label),
    Jump(Label),
    /// Jumps to `positive` if the condition is non-zero, to `negative`
    /// otherwise
    CJump {
        condition: Expression,
        positive: Label,
        negative: Label,
    },
}

impl Statement {
    /// Iterates the statement with nested sequences flattened out
    pub fn flatten(&self) -> Vec<&Statement> {
        match self {
            Statement::Seq(statements) => statements.iter().flat_map(Statement::flatten).collect(),
            statement => vec![statement],
        }
    }
}
