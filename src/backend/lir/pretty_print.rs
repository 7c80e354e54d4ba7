use colored::Colorize;
use itertools::Itertools;

use crate::{
    backend::{
        layout::{Access, Frame, FrameArea, FrameLayout},
        lir::{self, Expression, Label, Statement, TempId, ast_lowering::IntermediateCode},
    },
    frontend::ast::{Ast, NodeKind},
    index::Index,
};

pub fn pretty_print_lir(ast: &Ast, layout: &FrameLayout, code: &IntermediateCode) {
    print!("{}", format_lir(ast, layout, code));
}

/// Globals, then every function with its frame and code
pub fn format_lir(ast: &Ast, layout: &FrameLayout, code: &IntermediateCode) -> String {
    let mut out = String::new();

    for (_, access) in layout.accesses.iter() {
        if let Access::Absolute { label, size } = access {
            out.push_str(&format!(
                "{} {} ({size} bytes)\n",
                "global".magenta(),
                label.to_string().blue()
            ));
        }
    }

    for (id, frame) in layout.frames.iter() {
        let NodeKind::FunctionDeclaration(function) = &ast[id].kind else {
            continue;
        };

        let mut header = format!("{} {}", "fn".magenta(), frame.label.to_string().blue());
        if let Label::Anonymous(_) = frame.label {
            header.push_str(&format!(" ({})", function.name.symbol));
        }

        match code.function_code.get(id) {
            Some(body) => {
                out.push_str(&format!("{header} {frame} {}\n", "{".white()));
                out.push_str(&format_body(body));
                out.push_str(&format!("{}\n", "}".white()));
            }
            None => {
                out.push_str(&format!("{} {header} {frame}\n", "extern".magenta()));
            }
        }
    }

    out
}

/// One statement per line with labels outdented. The statement part of a
/// function's result is spread over lines as well.
fn format_body(body: &Statement) -> String {
    let result_move;
    let mut statements = Vec::new();

    match body {
        Statement::Move {
            destination,
            source: Expression::Sexpr {
                statement,
                expression,
            },
        } => {
            statements.extend(statement.flatten());
            result_move = Statement::Move {
                destination: destination.clone(),
                source: (**expression).clone(),
            };
            statements.push(&result_move);
        }
        body => statements.extend(body.flatten()),
    }

    statements
        .into_iter()
        .map(|statement| match statement {
            Statement::Label(_) => format!("{statement}\n"),
            _ => format!("    {statement}\n"),
        })
        .collect()
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Label::Named(name) => write!(f, "_{name}"),
            Label::Anonymous(index) => write!(f, "L{index}"),
        }
    }
}

impl core::fmt::Display for TempId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", format!("%{}", self.index()).yellow())
    }
}

impl core::fmt::Display for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[depth {}, locals {}, args {}, fp {}, rv {}]",
            self.depth.to_string().purple(),
            self.locals_size.to_string().purple(),
            self.arguments_size.to_string().purple(),
            self.frame_pointer,
            self.return_value
        )
    }
}

impl core::fmt::Display for Access {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Access::Absolute { label, size } => {
                write!(f, "{} ({size} bytes)", label.to_string().blue())
            }
            Access::Relative {
                offset,
                depth,
                size,
                area,
            } => write!(
                f,
                "fp{depth}{}{} ({size} bytes)",
                match area {
                    FrameArea::Locals => "-",
                    FrameArea::Parameters => "+",
                },
                offset.to_string().purple()
            ),
        }
    }
}

impl core::fmt::Display for lir::Expression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Expression::Const(value) => write!(f, "{}", value.to_string().purple()),
            Expression::Name(label) => write!(f, "{}", label.to_string().blue()),
            Expression::Temp(temp) => write!(f, "{temp}"),
            Expression::Binop { operator, lhs, rhs } => write!(
                f,
                "({lhs} {} {rhs})",
                operator.to_string().white()
            ),
            Expression::Unop { operator, operand } => {
                write!(f, "{}{operand}", operator.to_string().white())
            }
            Expression::Mem(address) => write!(f, "{}[{address}]", "mem".cyan()),
            Expression::Call { label, arguments } => write!(
                f,
                "{} {}({})",
                "call".cyan(),
                label.to_string().blue(),
                arguments.iter().join(", ")
            ),
            Expression::Sexpr {
                statement,
                expression,
            } => {
                let statements = statement.flatten();

                if statements.is_empty() {
                    write!(f, "{{ {expression} }}")
                } else {
                    write!(f, "{{ {}; {expression} }}", statements.iter().join("; "))
                }
            }
        }
    }
}

impl core::fmt::Display for lir::Statement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Statement::Expression(expression) => write!(f, "{expression}"),
            Statement::Move {
                destination,
                source,
            } => write!(
                f,
                "{} {destination} {} {source}",
                "move".cyan(),
                "<-".white()
            ),
            Statement::Seq(_) => write!(f, "{}", self.flatten().iter().join("; ")),
            Statement::Label(label) => write!(f, "{}", format!("{label}:").bright_red()),
            Statement::Jump(label) => write!(f, "{} {}", "jmp".cyan(), label.to_string().blue()),
            Statement::CJump {
                condition,
                positive,
                negative,
            } => write!(
                f,
                "{} {condition} {} {}",
                "br".cyan(),
                positive.to_string().blue(),
                negative.to_string().blue()
            ),
        }
    }
}
