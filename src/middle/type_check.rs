//! Type resolution and checking.
//!
//! Every declaration group is checked in six ordered passes, because the
//! types, variables and functions of one group may depend on each other:
//!
//! 1. declare a fresh named type for each type declaration
//! 2. define each named type from its right hand side
//! 3. reject named types which contain themselves without a pointer
//! 4. resolve variable types, rejecting void variables
//! 5. resolve parameter and return types of every function
//! 6. check function bodies
//!
//! Groups nested in block expressions go through the same passes when the
//! enclosing body is checked.

use log::{debug, trace};

use crate::{
    error::{CompileError, SemanticError, SemanticErrorKind, internal_error},
    frontend::ast::{
        Ast, BinaryOperatorClass, FunctionDeclaration, Identifier, LiteralKind, NodeId, NodeKind,
        UnaryOperatorKind,
    },
    index::Index,
    middle::{
        attributes::{AttributeMap, AttributeTable},
        primitive::AtomKind,
        resolve::NameResolution,
        ty::{TypeContext, TypeId, TypeKind},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeResolution {
    pub types: TypeContext,
    /// Type declaration → the named type it declares
    pub declares_type: AttributeTable<TypeId>,
    /// Type expression → the type it denotes
    pub is_type: AttributeTable<TypeId>,
    /// Value expression → the type of its value
    pub is_of_type: AttributeTable<TypeId>,
}

impl TypeResolution {
    /// The type of a variable or parameter declaration
    pub fn declared_type(&self, ast: &Ast, declaration: NodeId) -> Result<TypeId, CompileError> {
        match &ast[declaration].kind {
            NodeKind::VariableDeclaration { ty, .. } | NodeKind::ParameterDeclaration { ty, .. } => {
                self.is_type.require(*ty).copied()
            }
            _ => Err(internal_error!(
                "node {} is not a variable or a parameter",
                declaration.index()
            )),
        }
    }
}

pub struct TypeChecker<'a> {
    ast: &'a Ast,
    names: &'a NameResolution,
    types: TypeContext,
    declares_type: AttributeMap<TypeId>,
    is_type: AttributeMap<TypeId>,
    is_of_type: AttributeMap<TypeId>,
}

impl<'a> TypeChecker<'a> {
    pub fn type_check(
        ast: &'a Ast,
        names: &'a NameResolution,
    ) -> Result<TypeResolution, CompileError> {
        let mut checker = Self {
            ast,
            names,
            types: TypeContext::new(),
            declares_type: AttributeMap::new("declares_type", ast),
            is_type: AttributeMap::new("is_type", ast),
            is_of_type: AttributeMap::new("is_of_type", ast),
        };

        checker.check_declarations(ast.root())?;

        debug!("type checking created {} types", checker.types.len());

        Ok(TypeResolution {
            types: checker.types,
            declares_type: checker.declares_type.lock(),
            is_type: checker.is_type.lock(),
            is_of_type: checker.is_of_type.lock(),
        })
    }

    fn error(&self, id: NodeId, kind: SemanticErrorKind) -> CompileError {
        SemanticError::new(self.ast.span(id), kind).into()
    }

    fn mismatch(&self, id: NodeId, message: String) -> CompileError {
        self.error(id, SemanticErrorKind::TypeMismatch(message))
    }

    fn check_declarations(&mut self, group: NodeId) -> Result<(), CompileError> {
        let ast = self.ast;

        let NodeKind::Declarations(declarations) = &ast[group].kind else {
            return Err(internal_error!(
                "node {} is not a declaration group",
                group.index()
            ));
        };

        debug!(
            "checking a group of {} declarations at {}",
            declarations.len(),
            ast.span(group)
        );

        let type_declarations = || {
            declarations.iter().filter_map(move |&id| match &ast[id].kind {
                NodeKind::TypeDeclaration { name, ty } => Some((id, *name, *ty)),
                _ => None,
            })
        };

        let functions = || {
            declarations.iter().filter_map(move |&id| match &ast[id].kind {
                NodeKind::FunctionDeclaration(function) => Some((id, function)),
                _ => None,
            })
        };

        // 1. Declare
        for (id, name, _) in type_declarations() {
            let named = self.types.declare_named(name.symbol);
            self.declares_type.insert(id, named)?;
        }

        // 2. Define
        for (id, _, ty) in type_declarations() {
            let named = *self.declares_type.require(id)?;
            let definition = self.resolve_type(ty)?;
            self.types.define_named(named, definition)?;
        }

        // 3. Check
        for (id, name, _) in type_declarations() {
            let named = *self.declares_type.require(id)?;

            if self.types.is_infinite(named) {
                return Err(self.error(id, SemanticErrorKind::InfiniteType(name.symbol)));
            }
        }

        // 4. Var
        for &id in declarations {
            if let NodeKind::VariableDeclaration { name, ty } = &ast[id].kind {
                let ty = self.resolve_type(*ty)?;

                if self.types.is_atom(ty, AtomKind::Void) {
                    return Err(
                        self.error(id, SemanticErrorKind::InvalidVoidDeclaration(name.symbol))
                    );
                }
            }
        }

        // 5. Fun-define
        for (_, function) in functions() {
            self.define_function(function)?;
        }

        // 6. Fun-check
        for (id, function) in functions() {
            let Some(body) = function.body else {
                continue;
            };

            let return_type = *self.is_type.require(function.return_type)?;
            let body_type = self.check_expression(body)?;

            if !self.types.equal(body_type, return_type) {
                return Err(self.mismatch(
                    body,
                    format!(
                        "`{}` returns `{}` but its body is of type `{}`",
                        function.name.symbol,
                        self.types.display(return_type),
                        self.types.display(body_type)
                    ),
                ));
            }

            trace!("checked the body of `{}` (node {})", function.name.symbol, id.index());
        }

        Ok(())
    }

    fn define_function(&mut self, function: &FunctionDeclaration) -> Result<(), CompileError> {
        let ast = self.ast;

        for &parameter in &function.parameters {
            let NodeKind::ParameterDeclaration { name, ty } = &ast[parameter].kind else {
                return Err(internal_error!(
                    "parameter {} of `{}` is not a parameter declaration",
                    parameter.index(),
                    function.name.symbol
                ));
            };

            let ty = self.resolve_type(*ty)?;

            if self.types.is_atom(ty, AtomKind::Void) {
                return Err(self.error(
                    parameter,
                    SemanticErrorKind::InvalidVoidDeclaration(name.symbol),
                ));
            }

            if !self.types.is_scalar(ty) {
                return Err(self.mismatch(
                    parameter,
                    format!(
                        "parameter `{}` must be of a scalar type, found `{}`",
                        name.symbol,
                        self.types.display(ty)
                    ),
                ));
            }
        }

        let return_type = self.resolve_type(function.return_type)?;

        if !self.types.is_scalar(return_type) && !self.types.is_atom(return_type, AtomKind::Void)
        {
            return Err(self.mismatch(
                function.return_type,
                format!(
                    "`{}` must return a scalar type or void, found `{}`",
                    function.name.symbol,
                    self.types.display(return_type)
                ),
            ));
        }

        Ok(())
    }

    fn resolve_type(&mut self, id: NodeId) -> Result<TypeId, CompileError> {
        if let Some(ty) = self.is_type.get(id) {
            return Ok(*ty);
        }

        let ast = self.ast;

        let ty = match &ast[id].kind {
            NodeKind::AtomType(kind) => self.types.atom(*kind),
            NodeKind::PointerType(pointee) => {
                let pointee = self.resolve_type(*pointee)?;
                self.types.pointer(pointee)
            }
            NodeKind::ArrayType { length, element } => {
                let length = self.array_length(*length)?;
                let element = self.resolve_type(*element)?;
                self.types.array(length, element)
            }
            NodeKind::TypeName(name) => {
                let declaration = *self.names.declared_at.require(id)?;

                match &ast[declaration].kind {
                    NodeKind::TypeDeclaration { .. } => *self.declares_type.require(declaration)?,
                    _ => return Err(self.error(id, SemanticErrorKind::NotAType(name.symbol))),
                }
            }
            _ => return Err(internal_error!("node {} is not a type", id.index())),
        };

        self.is_type.insert(id, ty)?;

        Ok(ty)
    }

    fn array_length(&mut self, length: NodeId) -> Result<u64, CompileError> {
        let ast = self.ast;

        let NodeKind::Literal(literal) = &ast[length].kind else {
            return Err(self.error(length, SemanticErrorKind::InvalidArrayLength));
        };

        if literal.kind != LiteralKind::Integer {
            return Err(self.error(length, SemanticErrorKind::InvalidArrayLength));
        }

        self.check_expression(length)?;

        literal
            .value()
            .and_then(|value| u64::try_from(value).ok())
            .filter(|value| *value > 0)
            .ok_or_else(|| self.error(length, SemanticErrorKind::InvalidArrayLength))
    }

    fn check_statement(&mut self, id: NodeId) -> Result<(), CompileError> {
        let ast = self.ast;

        match &ast[id].kind {
            NodeKind::ExpressionStatement(expression) => {
                self.check_expression(*expression)?;
            }
            NodeKind::Assignment {
                destination,
                source,
            } => {
                let destination_type = self.check_expression(*destination)?;
                let source_type = self.check_expression(*source)?;

                if !self.types.is_scalar(destination_type)
                    || !self.types.equal(destination_type, source_type)
                {
                    return Err(self.mismatch(
                        id,
                        format!(
                            "cannot assign `{}` to `{}`",
                            self.types.display(source_type),
                            self.types.display(destination_type)
                        ),
                    ));
                }
            }
            NodeKind::If {
                condition,
                positive,
                negative,
            } => {
                self.check_condition(*condition)?;

                for &statement in positive.iter().chain(negative.iter().flatten()) {
                    self.check_statement(statement)?;
                }
            }
            NodeKind::While { condition, body } => {
                self.check_condition(*condition)?;

                for &statement in body {
                    self.check_statement(statement)?;
                }
            }
            _ => return Err(internal_error!("node {} is not a statement", id.index())),
        }

        Ok(())
    }

    fn check_condition(&mut self, condition: NodeId) -> Result<(), CompileError> {
        let ty = self.check_expression(condition)?;

        if !self.types.is_atom(ty, AtomKind::Bool) {
            return Err(self.mismatch(
                condition,
                format!(
                    "condition must be of type `bool`, found `{}`",
                    self.types.display(ty)
                ),
            ));
        }

        Ok(())
    }

    /// Computes the type of a value expression and records it
    fn check_expression(&mut self, id: NodeId) -> Result<TypeId, CompileError> {
        let ast = self.ast;

        let ty = match &ast[id].kind {
            NodeKind::Literal(literal) => {
                if literal.value().is_none() {
                    return Err(self.error(id, SemanticErrorKind::InvalidLiteral(literal.symbol)));
                }

                match literal.kind {
                    LiteralKind::Integer => self.types.atom(AtomKind::Int),
                    LiteralKind::Boolean => self.types.atom(AtomKind::Bool),
                    LiteralKind::Char => self.types.atom(AtomKind::Char),
                    LiteralKind::Void => self.types.atom(AtomKind::Void),
                    LiteralKind::Pointer => {
                        let void = self.types.atom(AtomKind::Void);
                        self.types.pointer(void)
                    }
                }
            }
            NodeKind::Name(name) => {
                let declaration = *self.names.declared_at.require(id)?;

                match &ast[declaration].kind {
                    NodeKind::VariableDeclaration { ty, .. }
                    | NodeKind::ParameterDeclaration { ty, .. } => *self.is_type.require(*ty)?,
                    _ => return Err(self.error(id, SemanticErrorKind::NotAValue(name.symbol))),
                }
            }
            NodeKind::Call { callee, arguments } => self.check_call(id, *callee, arguments)?,
            NodeKind::Binary { lhs, operator, rhs } => {
                let lhs_type = self.check_expression(*lhs)?;
                let rhs_type = self.check_expression(*rhs)?;
                let class = operator.class();

                let supported = match (
                    self.types.as_atom(lhs_type),
                    self.types.as_atom(rhs_type),
                ) {
                    (Some(lhs_atom), Some(rhs_atom)) => {
                        lhs_atom == rhs_atom && lhs_atom.supports_binary_op(*operator)
                    }
                    // Pointers may be compared but not computed with
                    _ => {
                        self.types.is_pointer(lhs_type)
                            && self.types.equal(lhs_type, rhs_type)
                            && matches!(
                                class,
                                BinaryOperatorClass::Equality | BinaryOperatorClass::Relational
                            )
                    }
                };

                if !supported {
                    return Err(self.mismatch(
                        id,
                        format!(
                            "operator `{operator}` cannot be applied to `{}` and `{}`",
                            self.types.display(lhs_type),
                            self.types.display(rhs_type)
                        ),
                    ));
                }

                match class {
                    BinaryOperatorClass::Arithmetic => self.types.atom(AtomKind::Int),
                    BinaryOperatorClass::Logical
                    | BinaryOperatorClass::Equality
                    | BinaryOperatorClass::Relational => self.types.atom(AtomKind::Bool),
                }
            }
            NodeKind::Unary { operator, operand } => {
                let operand_type = self.check_expression(*operand)?;

                match operator {
                    UnaryOperatorKind::AddressOf => self.types.pointer(operand_type),
                    UnaryOperatorKind::Deref => {
                        self.types.pointee(operand_type).ok_or_else(|| {
                            self.mismatch(
                                id,
                                format!(
                                    "cannot dereference `{}`",
                                    self.types.display(operand_type)
                                ),
                            )
                        })?
                    }
                    UnaryOperatorKind::Plus
                    | UnaryOperatorKind::Negate
                    | UnaryOperatorKind::LogicalNot => match self.types.as_atom(operand_type) {
                        Some(atom) if atom.supports_unary_op(*operator) => self.types.atom(atom),
                        _ => {
                            return Err(self.mismatch(
                                id,
                                format!(
                                    "operator `{operator}` cannot be applied to `{}`",
                                    self.types.display(operand_type)
                                ),
                            ));
                        }
                    },
                }
            }
            NodeKind::Index { array, index } => {
                let array_type = self.check_expression(*array)?;
                let index_type = self.check_expression(*index)?;

                let Some((_, element)) = self.types.as_array(array_type) else {
                    return Err(self.mismatch(
                        *array,
                        format!("`{}` is not an array", self.types.display(array_type)),
                    ));
                };

                if !self.types.is_atom(index_type, AtomKind::Int) {
                    return Err(self.mismatch(
                        *index,
                        format!(
                            "array index must be of type `int`, found `{}`",
                            self.types.display(index_type)
                        ),
                    ));
                }

                element
            }
            NodeKind::Block {
                declarations,
                statements,
                result,
            } => {
                self.check_declarations(*declarations)?;

                for &statement in statements {
                    self.check_statement(statement)?;
                }

                self.check_expression(*result)?
            }
            NodeKind::New(ty) => {
                let ty = self.resolve_type(*ty)?;
                self.types.pointer(ty)
            }
            NodeKind::Delete(expression) => {
                let ty = self.check_expression(*expression)?;

                if !self.types.is_pointer(ty) {
                    return Err(self.mismatch(
                        *expression,
                        format!("cannot delete `{}`", self.types.display(ty)),
                    ));
                }

                self.types.atom(AtomKind::Void)
            }
            NodeKind::Cast { expression, ty } => {
                let from = self.check_expression(*expression)?;
                let to = self.resolve_type(*ty)?;

                if !self.can_cast(from, to) {
                    return Err(self.mismatch(
                        id,
                        format!(
                            "cannot cast `{}` to `{}`",
                            self.types.display(from),
                            self.types.display(to)
                        ),
                    ));
                }

                to
            }
            _ => return Err(internal_error!("node {} is not an expression", id.index())),
        };

        self.is_of_type.insert(id, ty)?;

        Ok(ty)
    }

    fn check_call(
        &mut self,
        id: NodeId,
        callee: Identifier,
        arguments: &[NodeId],
    ) -> Result<TypeId, CompileError> {
        let ast = self.ast;
        let declaration = *self.names.declared_at.require(id)?;

        let NodeKind::FunctionDeclaration(function) = &ast[declaration].kind else {
            return Err(self.error(id, SemanticErrorKind::NotCallable(callee.symbol)));
        };

        if function.parameters.len() != arguments.len() {
            return Err(self.mismatch(
                id,
                format!(
                    "`{}` takes {} arguments but {} were given",
                    callee.symbol,
                    function.parameters.len(),
                    arguments.len()
                ),
            ));
        }

        for (&parameter, &argument) in function.parameters.iter().zip(arguments) {
            let argument_type = self.check_expression(argument)?;
            let parameter_type = self.parameter_type(parameter)?;

            if !self.types.equal(argument_type, parameter_type) {
                return Err(self.mismatch(
                    argument,
                    format!(
                        "expected `{}` but found `{}`",
                        self.types.display(parameter_type),
                        self.types.display(argument_type)
                    ),
                ));
            }
        }

        Ok(*self.is_type.require(function.return_type)?)
    }

    fn parameter_type(&self, parameter: NodeId) -> Result<TypeId, CompileError> {
        match &self.ast[parameter].kind {
            NodeKind::ParameterDeclaration { ty, .. } => Ok(*self.is_type.require(*ty)?),
            _ => Err(internal_error!(
                "node {} is not a parameter declaration",
                parameter.index()
            )),
        }
    }

    /// Casts convert between `int`, `char` and pointers
    fn can_cast(&self, from: TypeId, to: TypeId) -> bool {
        let from = self.types.kind(self.types.actual(from));
        let to = self.types.kind(self.types.actual(to));

        match (from, to) {
            (TypeKind::Atom(from), TypeKind::Atom(to)) => from.can_be_cast_to(to),
            (TypeKind::Pointer(_), TypeKind::Pointer(_)) => true,
            (TypeKind::Atom(atom), TypeKind::Pointer(_))
            | (TypeKind::Pointer(_), TypeKind::Atom(atom)) => atom.can_be_cast_to(AtomKind::Int),
            _ => false,
        }
    }
}
