use strum::{EnumIter, EnumString};

use crate::frontend::ast::{BinaryOperatorKind, UnaryOperatorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AtomKind {
    Void,
    Bool,
    Char,
    Int,
}

impl core::fmt::Display for AtomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomKind::Void => write!(f, "void"),
            AtomKind::Bool => write!(f, "bool"),
            AtomKind::Char => write!(f, "char"),
            AtomKind::Int => write!(f, "int"),
        }
    }
}

impl AtomKind {
    /// Whether both operands of `kind` may have this type. Pointer operands
    /// are handled by the type checker.
    pub fn supports_binary_op(&self, kind: BinaryOperatorKind) -> bool {
        match self {
            // Arithmetic and comparison
            AtomKind::Int => match kind {
                BinaryOperatorKind::Add
                | BinaryOperatorKind::Subtract
                | BinaryOperatorKind::Multiply
                | BinaryOperatorKind::Divide
                | BinaryOperatorKind::Modulus
                | BinaryOperatorKind::Equals
                | BinaryOperatorKind::NotEquals
                | BinaryOperatorKind::LessThan
                | BinaryOperatorKind::LessThanOrEqualTo
                | BinaryOperatorKind::GreaterThan
                | BinaryOperatorKind::GreaterThanOrEqualTo => true,
                BinaryOperatorKind::And | BinaryOperatorKind::Or => false,
            },
            // Only comparison
            AtomKind::Char => match kind {
                BinaryOperatorKind::Equals
                | BinaryOperatorKind::NotEquals
                | BinaryOperatorKind::LessThan
                | BinaryOperatorKind::LessThanOrEqualTo
                | BinaryOperatorKind::GreaterThan
                | BinaryOperatorKind::GreaterThanOrEqualTo => true,
                BinaryOperatorKind::Add
                | BinaryOperatorKind::Subtract
                | BinaryOperatorKind::Multiply
                | BinaryOperatorKind::Divide
                | BinaryOperatorKind::Modulus
                | BinaryOperatorKind::And
                | BinaryOperatorKind::Or => false,
            },
            // Only equality and logical
            AtomKind::Bool => match kind {
                BinaryOperatorKind::Equals
                | BinaryOperatorKind::NotEquals
                | BinaryOperatorKind::And
                | BinaryOperatorKind::Or => true,
                BinaryOperatorKind::LessThan
                | BinaryOperatorKind::LessThanOrEqualTo
                | BinaryOperatorKind::GreaterThan
                | BinaryOperatorKind::GreaterThanOrEqualTo
                | BinaryOperatorKind::Add
                | BinaryOperatorKind::Subtract
                | BinaryOperatorKind::Multiply
                | BinaryOperatorKind::Divide
                | BinaryOperatorKind::Modulus => false,
            },
            AtomKind::Void => false,
        }
    }

    /// Address-of and dereference work on any operand and are not atom
    /// operators.
    pub fn supports_unary_op(&self, kind: UnaryOperatorKind) -> bool {
        match self {
            AtomKind::Int => matches!(kind, UnaryOperatorKind::Plus | UnaryOperatorKind::Negate),
            AtomKind::Bool => matches!(kind, UnaryOperatorKind::LogicalNot),
            AtomKind::Char | AtomKind::Void => false,
        }
    }

    pub fn can_be_cast_to(&self, target: Self) -> bool {
        match self {
            AtomKind::Int | AtomKind::Char => match target {
                AtomKind::Int | AtomKind::Char => true,
                AtomKind::Bool | AtomKind::Void => false,
            },
            AtomKind::Bool | AtomKind::Void => false,
        }
    }

    /// Whether values of this kind fit in a register, which is what
    /// parameters, assignments and casts require
    pub fn is_scalar(&self) -> bool {
        !matches!(self, AtomKind::Void)
    }
}
