//! Semantic analysis. Names are bound to their declarations, types are
//! resolved and checked and value expressions are classified as addresses or
//! plain values. Each stage records its results in attribute tables keyed by
//! AST node.

pub mod addr;
pub mod attributes;
pub mod primitive;
pub mod resolve;
pub mod symbol_table;
pub mod ty;
pub mod type_check;
