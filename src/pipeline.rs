use log::info;

use crate::{
    backend::{
        layout::{Frame, FrameEvaluator, FrameLayout},
        lir::{
            LabelGenerator,
            ast_lowering::{CodeGenerator, IntermediateCode},
            pretty_print,
        },
    },
    error::CompileError,
    frontend::ast::{Ast, NodeId},
    middle::{
        addr::{AddrResolver, Addressability},
        resolve::{NameResolution, Resolver},
        type_check::{TypeChecker, TypeResolution},
    },
    options::CompileOptions,
};

/// Everything the compiler derived from one tree
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub names: NameResolution,
    pub types: TypeResolution,
    pub addressability: Addressability,
    pub layout: FrameLayout,
    pub code: IntermediateCode,
}

impl Compilation {
    pub fn frame(&self, function: NodeId) -> Result<&Frame, CompileError> {
        self.layout.frame(function)
    }

    /// Human readable dump of globals, frames and code
    pub fn format_lir(&self, ast: &Ast) -> String {
        pretty_print::format_lir(ast, &self.layout, &self.code)
    }
}

/// Runs every stage on `ast`, stopping at the first error.
///
/// Labels and temporaries are numbered from zero on every call, so compiling
/// the same tree twice yields equal results.
pub fn compile(ast: &Ast, options: &CompileOptions) -> Result<Compilation, CompileError> {
    info!("resolving names");
    let names = Resolver::resolve_names(ast)?;

    info!("resolving types");
    let types = TypeChecker::type_check(ast, &names)?;

    info!("resolving addresses");
    let addressability = AddrResolver::resolve_addresses(ast, &types)?;

    info!("evaluating frames");
    let mut labels = LabelGenerator::new();
    let layout = FrameEvaluator::evaluate_frames(ast, &types, &mut labels)?;

    info!("generating code with {} static links", options.static_link);
    let code = CodeGenerator::generate_code(
        ast,
        &names,
        &types,
        &addressability,
        &layout,
        options,
        &mut labels,
    )?;

    Ok(Compilation {
        names,
        types,
        addressability,
        layout,
        code,
    })
}
