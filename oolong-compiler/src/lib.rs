mod ast;
mod binder;
mod cache;
mod compiler;
mod diagnostics;
mod engine;
mod eval;
mod lexer;
mod parser;
mod registry;
mod types;
mod value;

pub use crate::ast::{
    BinaryExpression, BinaryOperator, CallExpression, CastExpression, CoalesceExpression,
    ConditionalExpression, Expression, ExpressionKind, IndexExpression, LambdaParameter, Literal,
    MemberExpression, NewExpression, ParsedLambda, SlotUse, UnaryExpression, UnaryOperator,
};
pub use crate::binder::{
    BindError, Binder, BindingContext, BoundParameter, TypedExpression, TypedExpressionKind,
};
pub use crate::cache::{CacheKey, ExpressionCache, DEFAULT_CACHE_CAPACITY};
pub use crate::compiler::{CompileError, CompileOptions, Compiler, Signature};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use crate::engine::{Engine, EvalError};
pub use crate::eval::{CompiledExpression, InvokeError};
pub use crate::lexer::{LexError, Lexer, Token, TokenKind};
pub use crate::parser::{ParseError, Parser};
pub use crate::registry::{
    default_overload_resolution, DispatchFn, Member, MemberKind, OverloadResolution, Registry,
    TypeResolver, INDEXER,
};
pub use crate::types::Type;
pub use crate::value::{ObjectValue, Value};
