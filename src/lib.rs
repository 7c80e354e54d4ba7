//! Middle and back end of a compiler for PINS, a small imperative language
//! with nested functions, pointers and fixed size arrays.
//!
//! Given an abstract syntax tree, [`compile`] binds names, resolves and
//! checks types, classifies addressable expressions, lays out function frames
//! and lowers every function body into LIR trees.

pub mod backend;
pub mod error;
pub mod frontend;
pub mod index;
pub mod middle;
pub mod options;
pub mod pipeline;

#[cfg(test)]
mod test_utils;

pub use error::{CompileError, SemanticError, SemanticErrorKind};
pub use options::{CompileOptions, StaticLinkStrategy};
pub use pipeline::{Compilation, compile};
