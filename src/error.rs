use thiserror::Error;

use crate::frontend::{Span, intern::InternedSymbol};

/// A problem with the program being compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// Two declarations in the same scope share a name.
    #[error("`{0}` is already declared in this scope")]
    DuplicateName(InternedSymbol),

    /// A name or type name has no visible declaration.
    #[error("`{0}` is not declared")]
    UndeclaredName(InternedSymbol),

    /// A named type contains itself without going through a pointer.
    #[error("type `{0}` is infinite")]
    InfiniteType(InternedSymbol),

    /// A variable or parameter was declared with type void.
    #[error("`{0}` cannot be of type void")]
    InvalidVoidDeclaration(InternedSymbol),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A call to something which is not a function.
    #[error("`{0}` is not a function")]
    NotCallable(InternedSymbol),

    /// A name used as a value which does not denote a variable or parameter.
    #[error("`{0}` is not a variable or a parameter")]
    NotAValue(InternedSymbol),

    /// A type name which does not denote a type.
    #[error("`{0}` is not a type")]
    NotAType(InternedSymbol),

    /// An expression which must denote a memory location does not.
    #[error("expression is not addressable")]
    NotAddressable,

    #[error("array length must be a positive integer constant")]
    InvalidArrayLength,

    #[error("invalid literal `{0}`")]
    InvalidLiteral(InternedSymbol),

    /// A variable, parameter, frame or allocation larger than memory.
    #[error("object does not fit in memory")]
    ObjectTooLarge,
}

/// A [`SemanticErrorKind`] located in the source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{span}: {kind}")]
pub struct SemanticError {
    pub span: Span,
    pub kind: SemanticErrorKind,
}

impl SemanticError {
    pub fn new(span: Span, kind: SemanticErrorKind) -> Self {
        Self { span, kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("{0}")]
    Semantic(#[from] SemanticError),
    /// A stage found the results of an earlier stage incomplete. This is a bug
    /// in the compiler, never in the program.
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn semantic_kind(&self) -> Option<&SemanticErrorKind> {
        match self {
            CompileError::Semantic(error) => Some(&error.kind),
            CompileError::Internal(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Internal(_))
    }
}

/// Builds a [`CompileError::Internal`] from a format string. With the
/// `error-backtrace` feature the message records where the fault was noticed.
macro_rules! internal_error {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);

        #[cfg(feature = "error-backtrace")]
        let message = format!(
            "{} (at {}, {}:{}:{})",
            message,
            module_path!(),
            file!(),
            line!(),
            column!()
        );

        $crate::error::CompileError::Internal(message)
    }};
}

pub(crate) use internal_error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_errors_are_prefixed_with_their_location() {
        let error = SemanticError::new(
            Span::point(3, 14),
            SemanticErrorKind::UndeclaredName(InternedSymbol::new("missing")),
        );

        assert_eq!(error.to_string(), "3:14: `missing` is not declared");
    }

    #[test]
    fn internal_errors_are_not_semantic() {
        let error = internal_error!("no type for node {}", 7);

        assert!(error.is_internal());
        assert!(error.semantic_kind().is_none());
        assert!(error.to_string().starts_with("internal compiler error: no type for node 7"));
    }
}
