//! Host facade over the compiler pipeline: cached compilation plus the
//! convenience entry points for evaluating expressions directly.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheKey, ExpressionCache, DEFAULT_CACHE_CAPACITY};
use crate::compiler::{CompileError, Compiler, Signature};
use crate::eval::{CompiledExpression, InvokeError};
use crate::registry::{Registry, TypeResolver};
use crate::value::Value;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// An engine owns a type resolver, a default namespace list, and the
/// compiled-expression cache. It is immutable after construction and safe
/// to share across threads.
pub struct Engine {
    resolver: Arc<dyn TypeResolver>,
    namespaces: Vec<String>,
    cache: ExpressionCache,
}

impl Engine {
    pub fn new(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            resolver,
            namespaces: vec!["std".to_string()],
            cache: ExpressionCache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    /// Replace the default namespace search list applied to signatures that
    /// declare none of their own.
    pub fn with_namespaces(
        mut self,
        namespaces: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = ExpressionCache::new(capacity);
        self
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Compile without any declared signature; expressions referencing
    /// slots or named parameters need [`Engine::compile_with`].
    pub fn compile(&self, source: &str) -> Result<Arc<CompiledExpression>, CompileError> {
        self.compile_with(source, Signature::default())
    }

    /// Compile against an explicit signature, through the cache.
    pub fn compile_with(
        &self,
        source: &str,
        signature: Signature,
    ) -> Result<Arc<CompiledExpression>, CompileError> {
        let mut signature = signature;
        if signature.namespaces.is_empty() {
            signature.namespaces = self.namespaces.clone();
        }
        let key = CacheKey {
            source: source.to_string(),
            signature: signature.clone(),
        };
        self.cache.get_or_compile(key, || {
            let mut compiler = Compiler::new(self.resolver.clone(), signature.into_options());
            compiler.compile(source)
        })
    }

    /// Positional-argument convenience: parameter types are taken from the
    /// supplied values, then the expression is compiled (cached) and
    /// invoked immediately.
    pub fn eval(&self, source: &str, arguments: &[Value]) -> Result<Value, EvalError> {
        let signature = Signature::with_params(arguments.iter().map(Value::type_of));
        let compiled = self.compile_with(source, signature)?;
        Ok(compiled.invoke(arguments)?)
    }

    /// Execute `source` against `instance`: `$0` is the instance (and its
    /// members are in scope unqualified), `$1..$N` are the arguments.
    pub fn exec(
        &self,
        instance: &Value,
        source: &str,
        arguments: &[Value],
    ) -> Result<Value, EvalError> {
        let mut param_types = Vec::with_capacity(arguments.len() + 1);
        param_types.push(instance.type_of());
        param_types.extend(arguments.iter().map(Value::type_of));

        let signature = Signature {
            default_instance: Some(instance.type_of()),
            ..Signature::with_params(param_types)
        };
        let compiled = self.compile_with(source, signature)?;

        let mut values = Vec::with_capacity(arguments.len() + 1);
        values.push(instance.clone());
        values.extend_from_slice(arguments);
        Ok(compiled.invoke(&values)?)
    }
}

impl Default for Engine {
    /// Engine over the builtin registry with the `std` namespace in scope.
    fn default() -> Self {
        Self::new(Arc::new(Registry::with_builtins()))
    }
}
