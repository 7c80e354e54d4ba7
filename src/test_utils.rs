//! Helpers shared by the unit tests

use std::fmt::Debug;

use crate::{
    error::{CompileError, SemanticErrorKind},
    frontend::ast::Ast,
    middle::{
        addr::{AddrResolver, Addressability},
        resolve::{NameResolution, Resolver},
        type_check::{TypeChecker, TypeResolution},
    },
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Runs name resolution and type checking
pub fn analyze(ast: &Ast) -> Result<(NameResolution, TypeResolution), CompileError> {
    init_logger();

    let names = Resolver::resolve_names(ast)?;
    let types = TypeChecker::type_check(ast, &names)?;

    Ok((names, types))
}

/// Runs every semantic stage, up to and including address resolution
pub fn analyze_fully(
    ast: &Ast,
) -> Result<(NameResolution, TypeResolution, Addressability), CompileError> {
    let (names, types) = analyze(ast)?;
    let addressability = AddrResolver::resolve_addresses(ast, &types)?;

    Ok((names, types, addressability))
}

/// Unwraps the kind of the semantic error a stage stopped with
pub fn semantic_error_kind<T: Debug>(result: Result<T, CompileError>) -> SemanticErrorKind {
    match result {
        Err(CompileError::Semantic(error)) => error.kind,
        other => panic!("expected a semantic error, got {other:?}"),
    }
}
