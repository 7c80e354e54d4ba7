//! Storage layout: type sizes, activation records of functions and the
//! accesses of variables and parameters.

use log::{debug, trace};

use crate::{
    backend::lir::{Label, LabelGenerator, TempId},
    error::{CompileError, SemanticError, SemanticErrorKind, internal_error},
    frontend::{
        Span,
        ast::{
            Ast, NodeId, NodeKind,
            visit::{Visitor, walk_ast, walk_node},
        },
    },
    index::Index,
    middle::{
        attributes::{AttributeMap, AttributeTable},
        primitive::AtomKind,
        ty::{TypeContext, TypeId, TypeKind},
        type_check::TypeResolution,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bytes(pub u64);

impl Bytes {
    pub const ZERO: Self = Self(0);

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// `None` when the sum exceeds [`MAX_OBJECT_SIZE`]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self).filter(|sum| *sum <= MAX_OBJECT_SIZE)
    }

    /// `None` when the product exceeds [`MAX_OBJECT_SIZE`]
    pub fn checked_mul(self, rhs: u64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self).filter(|product| *product <= MAX_OBJECT_SIZE)
    }

    /// The size as an offset or operand of the generated code
    pub fn to_offset(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }
}

impl core::fmt::Display for Bytes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Size of addresses, and of every other scalar
pub const POINTER_SIZE: Bytes = Bytes(8);

/// Largest object, frame part or offset the generated code can address
pub const MAX_OBJECT_SIZE: Bytes = Bytes(i64::MAX as u64);

fn too_large(span: Span) -> CompileError {
    SemanticError::new(span, SemanticErrorKind::ObjectTooLarge).into()
}

/// Size of a value of type `ty`. Objects which do not fit in memory are
/// reported at `span`.
pub fn size_of(types: &TypeContext, ty: TypeId, span: Span) -> Result<Bytes, CompileError> {
    match types.kind(types.actual(ty)) {
        TypeKind::Atom(AtomKind::Void) => Ok(Bytes::ZERO),
        TypeKind::Atom(AtomKind::Bool | AtomKind::Char | AtomKind::Int) => Ok(POINTER_SIZE),
        TypeKind::Pointer(_) => Ok(POINTER_SIZE),
        TypeKind::Array { length, element } => size_of(types, element, span)?
            .checked_mul(length)
            .ok_or_else(|| too_large(span)),
        TypeKind::Named { name, .. } => Err(internal_error!("type `{name}` was never defined")),
    }
}

/// The activation record of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub label: Label,
    /// 1 for top level functions
    pub depth: u32,
    /// Room for local variables, below the frame pointer
    pub locals_size: Bytes,
    /// Room for the static link and arguments of the largest call made
    pub arguments_size: Bytes,
    pub frame_pointer: TempId,
    pub return_value: TempId,
}

/// Where a variable or parameter is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A global at a fixed label
    Absolute { label: Label, size: Bytes },
    /// `offset` bytes from the frame pointer of the function at `depth`,
    /// below it for locals and above it for parameters
    Relative {
        offset: i64,
        depth: u32,
        size: Bytes,
        area: FrameArea,
    },
}

/// The side of the frame pointer a relative access lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameArea {
    /// Below the frame pointer, at `fp - offset`
    Locals,
    /// Above the frame pointer, at `fp + offset`
    Parameters,
}

impl Access {
    pub fn size(&self) -> Bytes {
        match self {
            Access::Absolute { size, .. } | Access::Relative { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    /// Function declaration → its frame
    pub frames: AttributeTable<Frame>,
    /// Variable or parameter declaration → its storage
    pub accesses: AttributeTable<Access>,
}

#[derive(Debug)]
struct FunctionContext {
    depth: u32,
    locals_size: Bytes,
    arguments_size: Bytes,
    parameters_size: Bytes,
}

/// Lays out the frames of all functions, innermost first
pub struct FrameEvaluator<'a> {
    types: &'a TypeResolution,
    labels: &'a mut LabelGenerator,
    contexts: Vec<FunctionContext>,
    frames: AttributeMap<Frame>,
    accesses: AttributeMap<Access>,
}

impl<'a> FrameEvaluator<'a> {
    pub fn evaluate_frames(
        ast: &Ast,
        types: &'a TypeResolution,
        labels: &'a mut LabelGenerator,
    ) -> Result<FrameLayout, CompileError> {
        let mut evaluator = Self {
            types,
            labels,
            contexts: Vec::new(),
            frames: AttributeMap::new("frames", ast),
            accesses: AttributeMap::new("accesses", ast),
        };

        walk_ast(&mut evaluator, ast)?;

        let frames = evaluator.frames.lock();
        let accesses = evaluator.accesses.lock();
        debug!(
            "laid out {} frames and {} accesses",
            frames.len(),
            accesses.len()
        );

        Ok(FrameLayout { frames, accesses })
    }

    fn context(&mut self) -> Result<&mut FunctionContext, CompileError> {
        self.contexts
            .last_mut()
            .ok_or_else(|| internal_error!("no enclosing function"))
    }

    /// Makes room in the enclosing frame for a call with `arguments`
    /// arguments plus the static link
    fn reserve_arguments(&mut self, arguments: usize, span: Span) -> Result<(), CompileError> {
        let context = self.context()?;
        let needed = u64::try_from(arguments)
            .ok()
            .and_then(|arguments| arguments.checked_add(1))
            .and_then(|slots| POINTER_SIZE.checked_mul(slots))
            .ok_or_else(|| too_large(span))?;

        context.arguments_size = context.arguments_size.max(needed);

        Ok(())
    }
}

impl<'ast> Visitor<'ast> for FrameEvaluator<'_> {
    type Error = CompileError;

    fn visit_node(&mut self, ast: &'ast Ast, id: NodeId) -> Result<(), CompileError> {
        match &ast[id].kind {
            NodeKind::FunctionDeclaration(function) => {
                let depth = self.contexts.last().map_or(0, |context| context.depth) + 1;

                self.contexts.push(FunctionContext {
                    depth,
                    locals_size: Bytes::ZERO,
                    arguments_size: POINTER_SIZE,
                    // The static link comes first
                    parameters_size: POINTER_SIZE,
                });

                walk_node(self, ast, id)?;

                let context = self
                    .contexts
                    .pop()
                    .ok_or_else(|| internal_error!("function context was lost"))?;

                let label = if depth == 1 {
                    Label::Named(function.name.symbol)
                } else {
                    self.labels.fresh_label()
                };

                let frame = Frame {
                    label,
                    depth,
                    locals_size: context.locals_size,
                    arguments_size: context.arguments_size,
                    frame_pointer: self.labels.fresh_temp(),
                    return_value: self.labels.fresh_temp(),
                };

                debug!("frame of `{}`: {frame:?}", function.name.symbol);

                self.frames.insert(id, frame)
            }
            NodeKind::VariableDeclaration { name, .. } => {
                let span = ast.span(id);
                let size = size_of(&self.types.types, self.types.declared_type(ast, id)?, span)?;

                let access = match self.contexts.last_mut() {
                    None => Access::Absolute {
                        label: Label::Named(name.symbol),
                        size,
                    },
                    Some(context) => {
                        context.locals_size = context
                            .locals_size
                            .checked_add(size)
                            .ok_or_else(|| too_large(span))?;

                        let offset = context.locals_size.to_offset();

                        Access::Relative {
                            offset: offset.ok_or_else(|| too_large(span))?,
                            depth: context.depth,
                            size,
                            area: FrameArea::Locals,
                        }
                    }
                };

                trace!("access of `{}`: {access:?}", name.symbol);

                self.accesses.insert(id, access)
            }
            NodeKind::ParameterDeclaration { name, .. } => {
                let span = ast.span(id);
                let size = size_of(&self.types.types, self.types.declared_type(ast, id)?, span)?;
                let context = self.context()?;

                let offset = context.parameters_size.to_offset();

                let access = Access::Relative {
                    offset: offset.ok_or_else(|| too_large(span))?,
                    depth: context.depth,
                    size,
                    area: FrameArea::Parameters,
                };

                context.parameters_size = context
                    .parameters_size
                    .checked_add(size)
                    .ok_or_else(|| too_large(span))?;

                trace!("access of parameter `{}`: {access:?}", name.symbol);

                self.accesses.insert(id, access)
            }
            NodeKind::Call { arguments, .. } => {
                self.reserve_arguments(arguments.len(), ast.span(id))?;
                walk_node(self, ast, id)
            }
            // Runtime calls with a single argument
            NodeKind::New(_) | NodeKind::Delete(_) => {
                self.reserve_arguments(1, ast.span(id))?;
                walk_node(self, ast, id)
            }
            // Type expressions never contain declarations or calls
            kind if kind.is_type() => Ok(()),
            _ => walk_node(self, ast, id),
        }
    }
}

impl FrameLayout {
    /// The frame of the function declared at `function`
    pub fn frame(&self, function: NodeId) -> Result<&Frame, CompileError> {
        self.frames.get(function).ok_or_else(|| {
            internal_error!("node {} has no frame", function.index())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::ast::{AstBuilder, BinaryOperatorKind},
        test_utils::analyze,
    };

    fn evaluate(ast: &Ast) -> FrameLayout {
        let (_, types) = analyze(ast).unwrap();
        FrameEvaluator::evaluate_frames(ast, &types, &mut LabelGenerator::new()).unwrap()
    }

    fn relative(accesses: &AttributeTable<Access>, id: NodeId) -> (i64, u32, u64, FrameArea) {
        match accesses.get(id) {
            Some(Access::Relative {
                offset,
                depth,
                size,
                area,
            }) => (*offset, *depth, size.bytes(), *area),
            other => panic!("expected a relative access, got {other:?}"),
        }
    }

    #[test]
    fn sizes() {
        let mut types = TypeContext::new();
        let int = types.atom(AtomKind::Int);
        let void = types.atom(AtomKind::Void);
        let pointer = types.pointer(void);
        let array = types.array(3, int);
        let matrix = types.array(2, array);

        let span = Span::point(1, 1);

        assert_eq!(size_of(&types, int, span).unwrap(), Bytes(8));
        assert_eq!(size_of(&types, void, span).unwrap(), Bytes(0));
        assert_eq!(size_of(&types, pointer, span).unwrap(), POINTER_SIZE);
        assert_eq!(size_of(&types, matrix, span).unwrap(), Bytes(48));
    }

    #[test]
    fn sizes_beyond_the_address_space_are_rejected() {
        let mut types = TypeContext::new();
        let int = types.atom(AtomKind::Int);
        // Wraps around u64
        let huge = types.array(4_000_000_000_000_000_000, int);
        // Fits in u64, but not in an offset
        let wide = types.array(2_000_000_000_000_000_000, int);
        let largest = types.array(i64::MAX as u64 / 8, int);

        let span = Span::point(3, 7);

        for ty in [huge, wide] {
            let error = size_of(&types, ty, span).unwrap_err();
            assert_eq!(
                error,
                CompileError::Semantic(SemanticError::new(span, SemanticErrorKind::ObjectTooLarge))
            );
        }
        assert!(size_of(&types, largest, span).is_ok());
        assert_eq!(Bytes(8).checked_add(MAX_OBJECT_SIZE), None);
        assert_eq!(MAX_OBJECT_SIZE.to_offset(), Some(i64::MAX));
    }

    #[test]
    fn locals_that_overflow_the_frame_are_rejected() {
        // fun f(): int = { 0 where var a: arr[1000000000000000000] int; var b: arr[1000000000000000000] int }
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let array = builder.array_type(1_000_000_000_000_000_000, int);
        let a = builder.variable("a", array);
        let int = builder.int_type();
        let array = builder.array_type(1_000_000_000_000_000_000, int);
        builder.at_position(2, 5);
        let b = builder.variable("b", array);
        let zero = builder.integer(0);
        let block = builder.block(vec![a, b], vec![], zero);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);
        let ast = builder.finish(vec![f]);

        let (_, types) = analyze(&ast).unwrap();
        let error = FrameEvaluator::evaluate_frames(&ast, &types, &mut LabelGenerator::new())
            .unwrap_err();

        assert_eq!(
            error,
            CompileError::Semantic(SemanticError::new(
                Span::point(2, 5),
                SemanticErrorKind::ObjectTooLarge
            ))
        );
    }

    #[test]
    fn globals_are_absolute_and_top_level_functions_are_named() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let x = builder.variable("x", int);
        let use_x = builder.name("x");
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, use_x);
        let ast = builder.finish(vec![x, f]);

        let layout = evaluate(&ast);

        assert_eq!(
            layout.accesses.get(x),
            Some(&Access::Absolute {
                label: Label::named("x"),
                size: Bytes(8)
            })
        );

        let frame = layout.frame(f).unwrap();
        assert_eq!(frame.label, Label::named("f"));
        assert_eq!(frame.depth, 1);
        assert_eq!(frame.locals_size, Bytes::ZERO);
        assert_eq!(frame.arguments_size, POINTER_SIZE);
    }

    #[test]
    fn locals_get_increasing_offsets_below_the_frame_pointer() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let a = builder.variable("a", int);
        let int = builder.int_type();
        let array = builder.array_type(3, int);
        let b = builder.variable("b", array);
        let character = builder.char_type();
        let c = builder.variable("c", character);
        let zero = builder.integer(0);
        let block = builder.block(vec![a, b, c], vec![], zero);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);
        let ast = builder.finish(vec![f]);

        let layout = evaluate(&ast);

        assert_eq!(relative(&layout.accesses, a), (8, 1, 8, FrameArea::Locals));
        assert_eq!(relative(&layout.accesses, b), (32, 1, 24, FrameArea::Locals));
        assert_eq!(relative(&layout.accesses, c), (40, 1, 8, FrameArea::Locals));
        assert_eq!(layout.frame(f).unwrap().locals_size, Bytes(40));
    }

    #[test]
    fn parameters_follow_the_static_link() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let p = builder.parameter("p", int);
        let character = builder.char_type();
        let q = builder.parameter("q", character);
        let use_p = builder.name("p");
        let int = builder.int_type();
        let f = builder.function("f", vec![p, q], int, use_p);
        let ast = builder.finish(vec![f]);

        let layout = evaluate(&ast);

        assert_eq!(relative(&layout.accesses, p), (8, 1, 8, FrameArea::Parameters));
        assert_eq!(relative(&layout.accesses, q), (16, 1, 8, FrameArea::Parameters));
    }

    #[test]
    fn calls_reserve_room_for_the_static_link_and_arguments() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let a = builder.parameter("a", int);
        let int = builder.int_type();
        let b = builder.parameter("b", int);
        let use_a = builder.name("a");
        let int = builder.int_type();
        let g = builder.function("g", vec![a, b], int, use_a);

        let one = builder.integer(1);
        let two = builder.integer(2);
        let call = builder.call("g", vec![one, two]);
        let int = builder.int_type();
        let allocation = builder.new_expression(int);
        let delete = builder.delete(allocation);
        let statement = builder.expression_statement(delete);
        let block = builder.block(vec![], vec![statement], call);
        let int = builder.int_type();
        let f = builder.function("f", vec![], int, block);
        let ast = builder.finish(vec![g, f]);

        let layout = evaluate(&ast);

        assert_eq!(layout.frame(f).unwrap().arguments_size, Bytes(24));
        assert_eq!(layout.frame(g).unwrap().arguments_size, POINTER_SIZE);
    }

    #[test]
    fn nested_functions_get_anonymous_labels_and_deeper_frames() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let local = builder.variable("local", int);
        let use_local = builder.name("local");
        let one = builder.integer(1);
        let sum = builder.binary(use_local, BinaryOperatorKind::Add, one);
        let int = builder.int_type();
        let inner = builder.function("inner", vec![], int, sum);
        let call_inner = builder.call("inner", vec![]);
        let block = builder.block(vec![local, inner], vec![], call_inner);
        let int = builder.int_type();
        let outer = builder.function("outer", vec![], int, block);
        let ast = builder.finish(vec![outer]);

        let layout = evaluate(&ast);
        let inner_frame = layout.frame(inner).unwrap();
        let outer_frame = layout.frame(outer).unwrap();

        assert_eq!(inner_frame.label, Label::Anonymous(0));
        assert_eq!(inner_frame.depth, 2);
        assert_eq!(inner_frame.locals_size, Bytes::ZERO);
        assert_eq!(outer_frame.label, Label::named("outer"));
        assert_eq!(outer_frame.depth, 1);
        assert_eq!(outer_frame.locals_size, Bytes(8));
        assert_ne!(inner_frame.frame_pointer, outer_frame.frame_pointer);
        assert_eq!(relative(&layout.accesses, local), (8, 1, 8, FrameArea::Locals));
    }

    #[test]
    fn external_functions_get_empty_frames() {
        let mut builder = AstBuilder::new();
        let int = builder.int_type();
        let n = builder.parameter("n", int);
        let void = builder.void_type();
        let print = builder.external_function("print", vec![n], void);
        let ast = builder.finish(vec![print]);

        let layout = evaluate(&ast);
        let frame = layout.frame(print).unwrap();

        assert_eq!(frame.locals_size, Bytes::ZERO);
        assert_eq!(frame.arguments_size, POINTER_SIZE);
        assert_eq!(relative(&layout.accesses, n), (8, 1, 8, FrameArea::Parameters));
    }
}
