//! Lowering of the analysed AST into LIR trees.

use log::{debug, trace};

use crate::{
    backend::{
        layout::{Access, Bytes, Frame, FrameArea, FrameLayout, size_of},
        lir::{Expression, Label, LabelGenerator, Statement},
    },
    error::{CompileError, SemanticError, SemanticErrorKind, internal_error},
    frontend::ast::{Ast, BinaryOperatorKind, NodeId, NodeKind, UnaryOperatorKind},
    index::Index,
    middle::{
        addr::Addressability,
        attributes::{AttributeMap, AttributeTable},
        primitive::AtomKind,
        resolve::NameResolution,
        type_check::TypeResolution,
    },
    options::{CompileOptions, StaticLinkStrategy},
};

#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateCode {
    /// Statement → its code
    pub stmt_code: AttributeTable<Statement>,
    /// Value expression → its code. For addressable expressions this is the
    /// address, not the value.
    pub expr_code: AttributeTable<Expression>,
    /// Function declaration with a body → the move of the body's value into
    /// the function's return value temporary
    pub function_code: AttributeTable<Statement>,
}

pub struct CodeGenerator<'a> {
    ast: &'a Ast,
    names: &'a NameResolution,
    types: &'a TypeResolution,
    addressability: &'a Addressability,
    layout: &'a FrameLayout,
    options: &'a CompileOptions,
    labels: &'a mut LabelGenerator,
    /// Frames of the functions enclosing the code being lowered
    frames: Vec<&'a Frame>,
    stmt_code: AttributeMap<Statement>,
    expr_code: AttributeMap<Expression>,
    function_code: AttributeMap<Statement>,
}

impl<'a> CodeGenerator<'a> {
    pub fn generate_code(
        ast: &'a Ast,
        names: &'a NameResolution,
        types: &'a TypeResolution,
        addressability: &'a Addressability,
        layout: &'a FrameLayout,
        options: &'a CompileOptions,
        labels: &'a mut LabelGenerator,
    ) -> Result<IntermediateCode, CompileError> {
        let mut generator = Self {
            ast,
            names,
            types,
            addressability,
            layout,
            options,
            labels,
            frames: Vec::new(),
            stmt_code: AttributeMap::new("stmt_code", ast),
            expr_code: AttributeMap::new("expr_code", ast),
            function_code: AttributeMap::new("function_code", ast),
        };

        generator.lower_declarations(ast.root())?;

        let code = IntermediateCode {
            stmt_code: generator.stmt_code.lock(),
            expr_code: generator.expr_code.lock(),
            function_code: generator.function_code.lock(),
        };

        debug!(
            "generated code for {} functions, {} statements and {} expressions",
            code.function_code.len(),
            code.stmt_code.len(),
            code.expr_code.len()
        );

        Ok(code)
    }

    fn lower_declarations(&mut self, group: NodeId) -> Result<(), CompileError> {
        let ast = self.ast;
        let layout = self.layout;

        let NodeKind::Declarations(declarations) = &ast[group].kind else {
            return Err(internal_error!("node {} is not a declaration group", group.index()));
        };

        for &declaration in declarations {
            let NodeKind::FunctionDeclaration(function) = &ast[declaration].kind else {
                continue;
            };

            let Some(body) = function.body else {
                continue;
            };

            let frame = layout.frame(declaration)?;
            trace!("lowering `{}` into {:?}", function.name.symbol, frame.label);

            self.frames.push(frame);
            let value = self.lower_value(body)?;
            self.frames.pop();

            self.function_code.insert(
                declaration,
                Statement::Move {
                    destination: Expression::Temp(frame.return_value),
                    source: value,
                },
            )?;
        }

        Ok(())
    }

    fn current_frame(&self) -> Result<&'a Frame, CompileError> {
        self.frames
            .last()
            .copied()
            .ok_or_else(|| internal_error!("code outside of a function"))
    }

    /// The frame pointer of the enclosing function at `depth`, reached by
    /// following static links out of the current frame
    fn frame_pointer_at(&self, depth: u32) -> Result<Expression, CompileError> {
        let frame = self.current_frame()?;

        if depth > frame.depth {
            return Err(internal_error!(
                "frame at depth {depth} is not visible from depth {}",
                frame.depth
            ));
        }

        let mut pointer = Expression::Temp(frame.frame_pointer);
        for _ in depth..frame.depth {
            pointer = Expression::mem(pointer);
        }

        Ok(pointer)
    }

    fn static_link(&self, callee: &Frame) -> Result<Expression, CompileError> {
        match self.options.static_link {
            StaticLinkStrategy::ConstantZero => Ok(Expression::Const(0)),
            StaticLinkStrategy::Chain if callee.depth <= 1 => Ok(Expression::Const(0)),
            StaticLinkStrategy::Chain => self.frame_pointer_at(callee.depth - 1),
        }
    }

    fn is_addr(&self, id: NodeId) -> Result<bool, CompileError> {
        self.addressability.is_addr.require(id).copied()
    }

    /// Arrays are never loaded, their value is their address
    fn is_array(&self, id: NodeId) -> Result<bool, CompileError> {
        let ty = *self.types.is_of_type.require(id)?;
        Ok(self.types.types.as_array(ty).is_some())
    }

    /// `size` as an operand, or `ObjectTooLarge` at the node `id`
    fn size_operand(&self, size: Bytes, id: NodeId) -> Result<Expression, CompileError> {
        size.to_offset().map(Expression::Const).ok_or_else(|| {
            SemanticError::new(self.ast.span(id), SemanticErrorKind::ObjectTooLarge).into()
        })
    }

    /// The code of an expression as a value, reading memory if the code is the
    /// address of a scalar
    fn lower_value(&mut self, id: NodeId) -> Result<Expression, CompileError> {
        let code = self.lower_expression(id)?;

        if self.is_addr(id)? && !self.is_array(id)? {
            Ok(Expression::mem(code))
        } else {
            Ok(code)
        }
    }

    fn lower_expression(&mut self, id: NodeId) -> Result<Expression, CompileError> {
        let ast = self.ast;
        let layout = self.layout;

        let code = match &ast[id].kind {
            NodeKind::Literal(literal) => {
                let value = literal
                    .value()
                    .ok_or_else(|| internal_error!("malformed literal `{}`", literal.symbol))?;

                Expression::Const(value)
            }
            NodeKind::Name(_) => {
                let declaration = *self.names.declared_at.require(id)?;

                match *layout.accesses.require(declaration)? {
                    Access::Absolute { label, .. } => Expression::Name(label),
                    Access::Relative {
                        offset,
                        depth,
                        area,
                        ..
                    } => Expression::binop(
                        match area {
                            FrameArea::Locals => BinaryOperatorKind::Subtract,
                            FrameArea::Parameters => BinaryOperatorKind::Add,
                        },
                        self.frame_pointer_at(depth)?,
                        Expression::Const(offset),
                    ),
                }
            }
            NodeKind::Call { arguments, .. } => {
                let callee = layout.frame(*self.names.declared_at.require(id)?)?;

                let mut values = vec![self.static_link(callee)?];
                for &argument in arguments {
                    values.push(self.lower_value(argument)?);
                }

                Expression::Call {
                    label: callee.label,
                    arguments: values,
                }
            }
            NodeKind::Binary { lhs, operator, rhs } => {
                let lhs = self.lower_value(*lhs)?;
                let rhs = self.lower_value(*rhs)?;

                Expression::binop(*operator, lhs, rhs)
            }
            NodeKind::Unary { operator, operand } => match operator {
                UnaryOperatorKind::Plus | UnaryOperatorKind::Deref => self.lower_value(*operand)?,
                UnaryOperatorKind::Negate | UnaryOperatorKind::LogicalNot => {
                    Expression::unop(*operator, self.lower_value(*operand)?)
                }
                // The operand is addressable, so its code is the address
                UnaryOperatorKind::AddressOf => self.lower_expression(*operand)?,
            },
            NodeKind::Index { array, index } => {
                let element_type = *self.types.is_of_type.require(id)?;
                let element_size = size_of(&self.types.types, element_type, ast.span(id))?;
                let element_size = self.size_operand(element_size, id)?;

                // The code of an array, addressable or not, is its address
                let base = self.lower_expression(*array)?;
                let index = self.lower_value(*index)?;

                let element = Expression::binop(
                    BinaryOperatorKind::Add,
                    base,
                    Expression::binop(BinaryOperatorKind::Multiply, index, element_size),
                );

                // An element of an array value is a value as well
                if self.is_addr(id)? || self.is_array(id)? {
                    element
                } else {
                    Expression::mem(element)
                }
            }
            NodeKind::Block {
                declarations,
                statements,
                result,
            } => {
                self.lower_declarations(*declarations)?;

                let statements = self.lower_statements(statements)?;
                let result = self.lower_value(*result)?;

                Expression::sexpr(statements, result)
            }
            NodeKind::New(ty) => {
                let allocated = *self.types.is_type.require(*ty)?;
                let size = size_of(&self.types.types, allocated, ast.span(id))?;

                Expression::Call {
                    label: Label::named("new"),
                    arguments: vec![Expression::Const(0), self.size_operand(size, id)?],
                }
            }
            NodeKind::Delete(expression) => Expression::Call {
                label: Label::named("del"),
                arguments: vec![Expression::Const(0), self.lower_value(*expression)?],
            },
            NodeKind::Cast { expression, ty } => {
                let value = self.lower_value(*expression)?;
                let target = *self.types.is_type.require(*ty)?;

                if self.types.types.is_atom(target, AtomKind::Char) {
                    Expression::binop(BinaryOperatorKind::Modulus, value, Expression::Const(256))
                } else {
                    value
                }
            }
            kind => {
                return Err(internal_error!(
                    "node {} is not an expression: {kind:?}",
                    id.index()
                ));
            }
        };

        self.expr_code.insert(id, code.clone())?;

        Ok(code)
    }

    fn lower_statements(&mut self, statements: &[NodeId]) -> Result<Statement, CompileError> {
        statements
            .iter()
            .map(|&statement| self.lower_statement(statement))
            .collect::<Result<Vec<_>, _>>()
            .map(Statement::Seq)
    }

    fn lower_statement(&mut self, id: NodeId) -> Result<Statement, CompileError> {
        let ast = self.ast;

        let code = match &ast[id].kind {
            NodeKind::ExpressionStatement(expression) => {
                Statement::Expression(self.lower_value(*expression)?)
            }
            NodeKind::Assignment {
                destination,
                source,
            } => {
                let destination = Expression::mem(self.lower_expression(*destination)?);
                let source = self.lower_value(*source)?;

                Statement::Move {
                    destination,
                    source,
                }
            }
            NodeKind::If {
                condition,
                positive,
                negative: Some(negative),
            } => {
                let then_label = self.labels.fresh_label();
                let else_label = self.labels.fresh_label();
                let end_label = self.labels.fresh_label();

                Statement::Seq(vec![
                    Statement::CJump {
                        condition: self.lower_value(*condition)?,
                        positive: then_label,
                        negative: else_label,
                    },
                    Statement::Label(then_label),
                    self.lower_statements(positive)?,
                    Statement::Jump(end_label),
                    Statement::Label(else_label),
                    self.lower_statements(negative)?,
                    Statement::Label(end_label),
                ])
            }
            NodeKind::If {
                condition,
                positive,
                negative: None,
            } => {
                let then_label = self.labels.fresh_label();
                let end_label = self.labels.fresh_label();

                Statement::Seq(vec![
                    Statement::CJump {
                        condition: self.lower_value(*condition)?,
                        positive: then_label,
                        negative: end_label,
                    },
                    Statement::Label(then_label),
                    self.lower_statements(positive)?,
                    Statement::Label(end_label),
                ])
            }
            NodeKind::While { condition, body } => {
                let head_label = self.labels.fresh_label();
                let body_label = self.labels.fresh_label();
                let exit_label = self.labels.fresh_label();

                Statement::Seq(vec![
                    Statement::Label(head_label),
                    Statement::CJump {
                        condition: self.lower_value(*condition)?,
                        positive: body_label,
                        negative: exit_label,
                    },
                    Statement::Label(body_label),
                    self.lower_statements(body)?,
                    Statement::Jump(head_label),
                    Statement::Label(exit_label),
                ])
            }
            kind => {
                return Err(internal_error!(
                    "node {} is not a statement: {kind:?}",
                    id.index()
                ));
            }
        };

        self.stmt_code.insert(id, code.clone())?;

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::layout::FrameEvaluator,
        frontend::ast::AstBuilder,
        test_utils::analyze_fully,
    };

    fn generate_with(ast: &Ast, options: &CompileOptions) -> (FrameLayout, IntermediateCode) {
        let (names, types, addressability) = analyze_fully(ast).unwrap();
        let mut labels = LabelGenerator::new();
        let layout = FrameEvaluator::evaluate_frames(ast, &types, &mut labels).unwrap();
        let code = CodeGenerator::generate_code(
            ast,
            &names,
            &types,
            &addressability,
            &layout,
            options,
            &mut labels,
        )
        .unwrap();

        (layout, code)
    }

    fn generate(ast: &Ast) -> (FrameLayout, IntermediateCode) {
        generate_with(ast, &CompileOptions::default())
    }

    fn expr(code: &IntermediateCode, id: NodeId) -> &Expression {
        code.expr_code.get(id).unwrap()
    }

    fn label(n: u32) -> Label {
        Label::Anonymous(n)
    }

    #[test]
    fn globals_are_named_and_top_level_calls_pass_zero() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let x = builder.variable("x", int);
        let use_x = builder.name("x");
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, use_x);
        let call = builder.call("f", vec![]);
        let int = builder.int_type();
        let g = builder.function("g", vec![], int, call);
        let ast = builder.finish(vec![x, f, g]);

        let (layout, code) = generate(&ast);

        assert_eq!(expr(&code, use_x), &Expression::Name(Label::named("x")));
        assert_eq!(
            expr(&code, call),
            &Expression::Call {
                label: Label::named("f"),
                arguments: vec![Expression::Const(0)]
            }
        );

        let frame = layout.frame(f).unwrap();
        assert_eq!(
            code.function_code.get(f),
            Some(&Statement::Move {
                destination: Expression::Temp(frame.return_value),
                source: Expression::mem(Expression::Name(Label::named("x"))),
            })
        );
    }

    #[test]
    fn locals_and_parameters_are_relative_to_the_frame_pointer() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let p = builder.parameter("p", int);
        let int = builder.int_type();
        let local = builder.variable("local", int);
        let use_p = builder.name("p");
        let use_local = builder.name("local");
        let assign = builder.assign(use_local, use_p);
        let result = builder.name("local");
        let block = builder.block(vec![local], vec![assign], result);
        let int = builder.int_type();
        let f = builder.function("f", vec![p], int, block);
        let ast = builder.finish(vec![f]);

        let (layout, code) = generate(&ast);
        let fp = Expression::Temp(layout.frame(f).unwrap().frame_pointer);
        let p_address =
            Expression::binop(BinaryOperatorKind::Add, fp.clone(), Expression::Const(8));
        let local_address =
            Expression::binop(BinaryOperatorKind::Subtract, fp.clone(), Expression::Const(8));

        assert_eq!(expr(&code, use_p), &p_address);
        assert_eq!(
            code.stmt_code.get(assign),
            Some(&Statement::Move {
                destination: Expression::mem(local_address.clone()),
                source: Expression::mem(p_address),
            })
        );
        assert_eq!(
            expr(&code, block),
            &Expression::sexpr(
                Statement::Seq(vec![code.stmt_code.get(assign).unwrap().clone()]),
                Expression::mem(local_address)
            )
        );
    }

    #[test]
    fn while_loops_lower_to_labels_and_jumps() {
        let mut builder = AstBuilder::new();
        let condition = builder.boolean(true);
        let one = builder.integer(1);
        let statement = builder.expression_statement(one);
        let while_loop = builder.while_do(condition, vec![statement]);
        let zero = builder.integer(0);
        let block = builder.block(vec![], vec![while_loop], zero);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);
        let ast = builder.finish(vec![f]);

        let (_, code) = generate(&ast);

        assert_eq!(
            code.stmt_code.get(while_loop),
            Some(&Statement::Seq(vec![
                Statement::Label(label(0)),
                Statement::CJump {
                    condition: Expression::Const(1),
                    positive: label(1),
                    negative: label(2),
                },
                Statement::Label(label(1)),
                Statement::Seq(vec![Statement::Expression(Expression::Const(1))]),
                Statement::Jump(label(0)),
                Statement::Label(label(2)),
            ]))
        );
    }

    #[test]
    fn conditionals_lower_to_labels_and_jumps() {
        let mut builder = AstBuilder::new();
        let condition = builder.boolean(false);
        let one = builder.integer(1);
        let then_statement = builder.expression_statement(one);
        let two = builder.integer(2);
        let else_statement = builder.expression_statement(two);
        let if_else = builder.if_then_else(condition, vec![then_statement], vec![else_statement]);
        let condition = builder.boolean(true);
        let three = builder.integer(3);
        let only_statement = builder.expression_statement(three);
        let if_only = builder.if_then(condition, vec![only_statement]);
        let zero = builder.integer(0);
        let block = builder.block(vec![], vec![if_else, if_only], zero);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);
        let ast = builder.finish(vec![f]);

        let (_, code) = generate(&ast);

        assert_eq!(
            code.stmt_code.get(if_else),
            Some(&Statement::Seq(vec![
                Statement::CJump {
                    condition: Expression::Const(0),
                    positive: label(0),
                    negative: label(1),
                },
                Statement::Label(label(0)),
                Statement::Seq(vec![Statement::Expression(Expression::Const(1))]),
                Statement::Jump(label(2)),
                Statement::Label(label(1)),
                Statement::Seq(vec![Statement::Expression(Expression::Const(2))]),
                Statement::Label(label(2)),
            ]))
        );
        assert_eq!(
            code.stmt_code.get(if_only),
            Some(&Statement::Seq(vec![
                Statement::CJump {
                    condition: Expression::Const(1),
                    positive: label(3),
                    negative: label(4),
                },
                Statement::Label(label(3)),
                Statement::Seq(vec![Statement::Expression(Expression::Const(3))]),
                Statement::Label(label(4)),
            ]))
        );
    }

    /// fun outer(n: int): int = { inner(n) where fun inner(m: int): int = n + inner(m) }
    fn nested_functions() -> (Ast, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let n = builder.parameter("n", int);
        let int = builder.int_type();
        let m = builder.parameter("m", int);
        let use_n = builder.name("n");
        let use_m = builder.name("m");
        let recursive_call = builder.call("inner", vec![use_m]);
        let sum = builder.binary(use_n, BinaryOperatorKind::Add, recursive_call);
        let int = builder.int_type();
        let inner = builder.function("inner", vec![m], int, sum);
        let argument = builder.name("n");
        let outer_call = builder.call("inner", vec![argument]);
        let block = builder.block(vec![inner], vec![], outer_call);
        let int = builder.int_type();
        let outer = builder.function("outer", vec![n], int, block);
        let ast = builder.finish(vec![outer]);

        (ast, outer, inner, use_n, outer_call, recursive_call)
    }

    #[test]
    fn static_links_follow_the_nesting_of_functions() {
        let (ast, outer, inner, use_n, outer_call, recursive_call) = nested_functions();
        let (layout, code) = generate(&ast);

        let outer_fp = Expression::Temp(layout.frame(outer).unwrap().frame_pointer);
        let inner_fp = Expression::Temp(layout.frame(inner).unwrap().frame_pointer);
        let inner_label = layout.frame(inner).unwrap().label;

        // `n` belongs to `outer`, one static link away from `inner`
        assert_eq!(
            expr(&code, use_n),
            &Expression::binop(
                BinaryOperatorKind::Add,
                Expression::mem(inner_fp.clone()),
                Expression::Const(8)
            )
        );

        let Expression::Call { label, arguments } = expr(&code, outer_call) else {
            panic!("expected a call");
        };
        assert_eq!(*label, inner_label);
        assert_eq!(arguments[0], outer_fp);

        let Expression::Call { arguments, .. } = expr(&code, recursive_call) else {
            panic!("expected a call");
        };
        assert_eq!(arguments[0], Expression::mem(inner_fp));
    }

    #[test]
    fn constant_zero_static_links() {
        let (ast, _, _, _, outer_call, recursive_call) = nested_functions();
        let options = CompileOptions::default().with_static_link(StaticLinkStrategy::ConstantZero);
        let (_, code) = generate_with(&ast, &options);

        for call in [outer_call, recursive_call] {
            let Expression::Call { arguments, .. } = expr(&code, call) else {
                panic!("expected a call");
            };
            assert_eq!(arguments[0], Expression::Const(0));
        }
    }

    #[test]
    fn operators_indexing_and_runtime_calls() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let array = builder.array_type(4, int);
        let table = builder.variable("table", array);

        let table_name = builder.name("table");
        let two = builder.integer(2);
        let element = builder.index(table_name, two);
        let negated = builder.unary(UnaryOperatorKind::Negate, element);
        let char_type = builder.char_type();
        let cast = builder.cast(negated, char_type);
        let statement = builder.expression_statement(cast);
        let int = builder.int_type();
        let allocation = builder.new_expression(int);
        let deleted = builder.delete(allocation);
        let delete_statement = builder.expression_statement(deleted);
        let zero = builder.integer(0);
        let block = builder.block(vec![], vec![statement, delete_statement], zero);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);

        let table_name = builder.name("table");
        let zero = builder.integer(0);
        let first = builder.index(table_name, zero);
        let address = builder.unary(UnaryOperatorKind::AddressOf, first);
        let int = builder.int_type();
        let pointer = builder.pointer_type(int);
        let g = builder.function("g", vec![], pointer, address);
        let ast = builder.finish(vec![table, f, g]);

        let (_, code) = generate(&ast);

        let element_address = |index| {
            Expression::binop(
                BinaryOperatorKind::Add,
                Expression::Name(Label::named("table")),
                Expression::binop(
                    BinaryOperatorKind::Multiply,
                    Expression::Const(index),
                    Expression::Const(8),
                ),
            )
        };
        let negated_code =
            Expression::unop(UnaryOperatorKind::Negate, Expression::mem(element_address(2)));

        assert_eq!(expr(&code, element), &element_address(2));
        assert_eq!(expr(&code, negated), &negated_code);
        assert_eq!(
            expr(&code, cast),
            &Expression::binop(
                BinaryOperatorKind::Modulus,
                negated_code,
                Expression::Const(256)
            )
        );
        assert_eq!(
            expr(&code, allocation),
            &Expression::Call {
                label: Label::named("new"),
                arguments: vec![Expression::Const(0), Expression::Const(8)],
            }
        );
        assert_eq!(
            expr(&code, deleted),
            &Expression::Call {
                label: Label::named("del"),
                arguments: vec![Expression::Const(0), expr(&code, allocation).clone()],
            }
        );
        // `$` yields the address itself
        assert_eq!(expr(&code, address), &element_address(0));
    }

    #[test]
    fn indexing_an_array_value_loads_the_element() {
        // fun f(): int = ({ local where var local: arr[2] int })[1]
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let array = builder.array_type(2, int);
        let local = builder.variable("local", array);
        let use_local = builder.name("local");
        let block = builder.block(vec![local], vec![], use_local);
        let one = builder.integer(1);
        let element = builder.index(block, one);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, element);

        // fun g(): int = ({ grid where var grid: arr[2] arr[3] int })[1][2]
        let int = builder.int_type();
        let row = builder.array_type(3, int);
        let rows = builder.array_type(2, row);
        let grid = builder.variable("grid", rows);
        let use_grid = builder.name("grid");
        let grid_block = builder.block(vec![grid], vec![], use_grid);
        let one = builder.integer(1);
        let row_value = builder.index(grid_block, one);
        let two = builder.integer(2);
        let cell = builder.index(row_value, two);
        let int = builder.int_type();
        let g = builder.function("g", vec![], int, cell);
        let ast = builder.finish(vec![f, g]);

        let (layout, code) = generate(&ast);

        let frame = layout.frame(f).unwrap();
        let local_address = Expression::binop(
            BinaryOperatorKind::Subtract,
            Expression::Temp(frame.frame_pointer),
            Expression::Const(16),
        );
        let block_code = Expression::sexpr(Statement::Seq(vec![]), local_address);
        let element_code = Expression::mem(Expression::binop(
            BinaryOperatorKind::Add,
            block_code.clone(),
            Expression::binop(
                BinaryOperatorKind::Multiply,
                Expression::Const(1),
                Expression::Const(8),
            ),
        ));

        // The block yields the address of the array, not a word read from it
        assert_eq!(expr(&code, block), &block_code);
        assert_eq!(expr(&code, element), &element_code);
        assert_eq!(
            code.function_code.get(f),
            Some(&Statement::Move {
                destination: Expression::Temp(frame.return_value),
                source: element_code,
            })
        );

        let frame = layout.frame(g).unwrap();
        let grid_address = Expression::binop(
            BinaryOperatorKind::Subtract,
            Expression::Temp(frame.frame_pointer),
            Expression::Const(48),
        );
        let row_address = Expression::binop(
            BinaryOperatorKind::Add,
            Expression::sexpr(Statement::Seq(vec![]), grid_address),
            Expression::binop(
                BinaryOperatorKind::Multiply,
                Expression::Const(1),
                Expression::Const(24),
            ),
        );
        let cell_code = Expression::mem(Expression::binop(
            BinaryOperatorKind::Add,
            row_address.clone(),
            Expression::binop(
                BinaryOperatorKind::Multiply,
                Expression::Const(2),
                Expression::Const(8),
            ),
        ));

        // Rows of an array value stay addresses, only the scalar is loaded
        assert_eq!(expr(&code, row_value), &row_address);
        assert_eq!(expr(&code, cell), &cell_code);
        assert_eq!(
            code.function_code.get(g),
            Some(&Statement::Move {
                destination: Expression::Temp(frame.return_value),
                source: cell_code,
            })
        );
    }

    #[test]
    fn dereferencing_a_fresh_allocation() {
        // fun f(): int = { @(new int) = 1; @(new int) }
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let stored = builder.new_expression(int);
        let destination = builder.unary(UnaryOperatorKind::Deref, stored);
        let one = builder.integer(1);
        let assign = builder.assign(destination, one);
        let int = builder.int_type();
        let loaded = builder.new_expression(int);
        let result = builder.unary(UnaryOperatorKind::Deref, loaded);
        let block = builder.block(vec![], vec![assign], result);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);
        let ast = builder.finish(vec![f]);

        let (layout, code) = generate(&ast);

        let allocation = Expression::Call {
            label: Label::named("new"),
            arguments: vec![Expression::Const(0), Expression::Const(8)],
        };
        let assign_code = Statement::Move {
            destination: Expression::mem(allocation.clone()),
            source: Expression::Const(1),
        };

        // The pointer itself is the address of the dereference
        assert_eq!(expr(&code, result), &allocation);
        assert_eq!(expr(&code, destination), &allocation);
        assert_eq!(code.stmt_code.get(assign), Some(&assign_code));
        assert_eq!(
            code.function_code.get(f),
            Some(&Statement::Move {
                destination: Expression::Temp(layout.frame(f).unwrap().return_value),
                source: Expression::sexpr(
                    Statement::Seq(vec![assign_code]),
                    Expression::mem(allocation)
                ),
            })
        );
    }
}
