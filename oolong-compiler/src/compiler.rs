//! Pipeline driver: text -> tokens -> tree -> binding context -> typed tree
//! -> compiled expression. Each stage fails fast; diagnostics accumulate
//! alongside the typed error so embedding tools can render every failure.

use std::sync::Arc;

use thiserror::Error;

use crate::ast::ParsedLambda;
use crate::binder::{BindError, Binder, BindingContext, BoundParameter};
use crate::diagnostics::Diagnostics;
use crate::eval::CompiledExpression;
use crate::lexer::{LexError, Lexer};
use crate::parser::{ParseError, Parser};
use crate::registry::TypeResolver;
use crate::types::Type;

/// Everything a compile needs besides the source text. Mirrors the original
/// call surface: explicit parameter types, an optional default-instance
/// type implicitly bound to the first parameter, an optional expected
/// result type, and the namespace search list.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub param_types: Vec<Type>,
    pub default_instance: Option<Type>,
    pub result_type: Option<Type>,
    pub namespaces: Vec<String>,
    pub dump_tokens: bool,
}

/// The hashable subset of [`CompileOptions`] that identifies a compiled
/// expression, used as part of the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub param_types: Vec<Type>,
    pub default_instance: Option<Type>,
    pub result_type: Option<Type>,
    pub namespaces: Vec<String>,
}

impl Signature {
    pub fn with_params(param_types: impl IntoIterator<Item = Type>) -> Self {
        Self {
            param_types: param_types.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn into_options(self) -> CompileOptions {
        CompileOptions {
            param_types: self.param_types,
            default_instance: self.default_instance,
            result_type: self.result_type,
            namespaces: self.namespaces,
            dump_tokens: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Bind(#[from] BindError),
}

impl CompileError {
    pub fn offset(&self) -> usize {
        match self {
            CompileError::Lex(error) => error.offset(),
            CompileError::Parse(error) => error.offset(),
            CompileError::Bind(error) => error.offset(),
        }
    }
}

pub struct Compiler {
    resolver: Arc<dyn TypeResolver>,
    options: CompileOptions,
    diagnostics: Diagnostics,
}

impl Compiler {
    pub fn new(resolver: Arc<dyn TypeResolver>, options: CompileOptions) -> Self {
        Self {
            resolver,
            options,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn compile(&mut self, source: &str) -> Result<CompiledExpression, CompileError> {
        let tokens = match Lexer::new(source).tokenize() {
            Ok(tokens) => tokens,
            Err(error) => {
                self.diagnostics
                    .push_error(error.to_string(), Some(error.offset()));
                return Err(error.into());
            }
        };

        if self.options.dump_tokens {
            for token in &tokens {
                println!("{token:?}");
            }
        }

        let parsed = match Parser::new(tokens).parse() {
            Ok(parsed) => parsed,
            Err(error) => {
                self.diagnostics
                    .push_error(error.to_string(), Some(error.offset()));
                return Err(error.into());
            }
        };

        let context = match self.binding_context(&parsed) {
            Ok(context) => context,
            Err(error) => {
                self.diagnostics
                    .push_error(error.to_string(), Some(error.offset()));
                return Err(error.into());
            }
        };

        let binder = Binder::new(&context, self.resolver.as_ref(), &self.options.namespaces);
        let typed = match binder.bind(&parsed.body) {
            Ok(typed) => typed,
            Err(error) => {
                self.diagnostics
                    .push_error(error.to_string(), Some(error.offset()));
                return Err(error.into());
            }
        };

        Ok(CompiledExpression::new(context.parameters, typed))
    }

    /// Build the parameter list the body binds against.
    ///
    /// An explicit parameter list wins outright; without one, the distinct
    /// `$N` slots (and the optional default instance as parameter 0) define
    /// the signature. Every parameter the body can reach must end up with a
    /// declared type.
    fn binding_context(&self, parsed: &ParsedLambda) -> Result<BindingContext, BindError> {
        let options = &self.options;
        let mut parameters = Vec::new();

        match &parsed.parameters {
            Some(names) => {
                if !options.param_types.is_empty() && options.param_types.len() != names.len() {
                    return Err(BindError::TypeMismatch {
                        message: format!(
                            "signature declares {} parameter type(s) but the lambda names {} parameter(s)",
                            options.param_types.len(),
                            names.len()
                        ),
                        offset: names.first().map(|parameter| parameter.offset).unwrap_or(0),
                    });
                }
                self.check_instance_against_first_type()?;
                for (index, parameter) in names.iter().enumerate() {
                    let ty = match options.param_types.get(index) {
                        Some(ty) => ty.clone(),
                        None => match (index, &options.default_instance) {
                            (0, Some(instance)) => instance.clone(),
                            _ => {
                                return Err(BindError::MissingParameterType {
                                    name: parameter.name.clone(),
                                    offset: parameter.offset,
                                });
                            }
                        },
                    };
                    parameters.push(BoundParameter {
                        name: Some(parameter.name.clone()),
                        ty,
                    });
                }
            }
            None => {
                self.check_instance_against_first_type()?;
                let slot_arity = parsed.max_slot().map(|max| max as usize + 1).unwrap_or(0);
                let instance_arity = usize::from(options.default_instance.is_some());
                let arity = options
                    .param_types
                    .len()
                    .max(slot_arity)
                    .max(instance_arity);
                for index in 0..arity {
                    let ty = match (index, &options.default_instance) {
                        (0, Some(instance)) => instance.clone(),
                        _ => match options.param_types.get(index) {
                            Some(ty) => ty.clone(),
                            None => {
                                let offset = parsed
                                    .slots
                                    .iter()
                                    .find(|slot| slot.index as usize == index)
                                    .map(|slot| slot.offset)
                                    .unwrap_or(0);
                                return Err(BindError::MissingParameterType {
                                    name: format!("${index}"),
                                    offset,
                                });
                            }
                        },
                    };
                    parameters.push(BoundParameter { name: None, ty });
                }
            }
        }

        Ok(BindingContext {
            parameters,
            default_instance: self.options.default_instance.is_some(),
            expected_result: self.options.result_type.clone(),
        })
    }

    fn check_instance_against_first_type(&self) -> Result<(), BindError> {
        if let (Some(instance), Some(first)) = (
            &self.options.default_instance,
            self.options.param_types.first(),
        ) {
            if first != instance {
                return Err(BindError::TypeMismatch {
                    message: format!(
                        "default instance type {instance} does not match first parameter type {first}"
                    ),
                    offset: 0,
                });
            }
        }
        Ok(())
    }
}
