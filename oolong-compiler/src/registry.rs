//! Host-type registry: the built-in [`TypeResolver`] implementation.
//!
//! The binder never reflects over anything itself; every identifier, member,
//! and constructor lookup goes through the [`TypeResolver`] seam. `Registry`
//! is a plain table: hosts register types under namespace-qualified names and
//! attach members with typed signatures and dispatch functions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::eval::InvokeError;
use crate::types::Type;
use crate::value::Value;

/// Reserved member name for `receiver[index]` access.
pub const INDEXER: &str = "[]";

pub type DispatchFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Method,
    Indexer,
    StaticProperty,
    StaticMethod,
    Constructor,
}

/// A resolvable member of a registered type. The dispatch function receives
/// the receiver (`Value::Null` for statics and constructors) and arguments
/// already converted to the declared parameter types.
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub dispatch: DispatchFn,
}

impl Member {
    pub fn property(
        name: impl Into<String>,
        return_type: Type,
        dispatch: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            params: Vec::new(),
            return_type,
            dispatch: Arc::new(dispatch),
        }
    }

    pub fn method(
        name: impl Into<String>,
        params: Vec<Type>,
        return_type: Type,
        dispatch: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            params,
            return_type,
            dispatch: Arc::new(dispatch),
        }
    }

    pub fn indexer(
        params: Vec<Type>,
        return_type: Type,
        dispatch: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: INDEXER.to_string(),
            kind: MemberKind::Indexer,
            params,
            return_type,
            dispatch: Arc::new(dispatch),
        }
    }

    pub fn static_property(
        name: impl Into<String>,
        return_type: Type,
        dispatch: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::StaticProperty,
            params: Vec::new(),
            return_type,
            dispatch: Arc::new(dispatch),
        }
    }

    pub fn static_method(
        name: impl Into<String>,
        params: Vec<Type>,
        return_type: Type,
        dispatch: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::StaticMethod,
            params,
            return_type,
            dispatch: Arc::new(dispatch),
        }
    }

    pub fn constructor(
        params: Vec<Type>,
        return_type: Type,
        dispatch: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: "new".to_string(),
            kind: MemberKind::Constructor,
            params,
            return_type,
            dispatch: Arc::new(dispatch),
        }
    }

    /// Parameter list rendered for diagnostics, e.g. `(Int, Int)`.
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(Type::describe)
            .collect::<Vec<_>>()
            .join(", ");
        format!("({params})")
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish()
    }
}

#[derive(Debug)]
pub enum OverloadResolution {
    Match(Arc<Member>),
    Ambiguous(Vec<Arc<Member>>),
    NoMatch,
}

/// Pluggable type lookup consumed by the binder.
pub trait TypeResolver: Send + Sync {
    /// Resolve a bare type name against an ordered namespace list; the first
    /// namespace that yields a type wins.
    fn resolve_type(&self, name: &str, namespaces: &[String]) -> Option<Type>;

    /// Ordered candidate members of `ty` with the given name.
    fn resolve_members(&self, ty: &Type, name: &str) -> Vec<Arc<Member>>;

    fn resolve_constructors(&self, ty: &Type) -> Vec<Arc<Member>>;

    /// Pick the best applicable candidate for the argument types. The
    /// default ranks by total conversion cost and never guesses on a tie.
    fn resolve_overload(
        &self,
        candidates: &[Arc<Member>],
        arguments: &[Type],
    ) -> OverloadResolution {
        default_overload_resolution(candidates, arguments)
    }
}

/// Cost of implicitly converting an argument to a parameter type: exact
/// match is free, numeric widening costs its distance in the lattice,
/// `null` into a nullable parameter costs one step.
fn conversion_cost(argument: &Type, parameter: &Type) -> Option<u32> {
    if argument == parameter {
        return Some(0);
    }
    match (argument.numeric_rank(), parameter.numeric_rank()) {
        (Some(from), Some(to)) if from <= to => Some(u32::from(to - from)),
        _ => {
            (matches!(argument, Type::Null) && parameter.is_nullable()).then_some(1)
        }
    }
}

pub fn default_overload_resolution(
    candidates: &[Arc<Member>],
    arguments: &[Type],
) -> OverloadResolution {
    let mut best_cost = u32::MAX;
    let mut best: Vec<Arc<Member>> = Vec::new();

    for candidate in candidates {
        if candidate.params.len() != arguments.len() {
            continue;
        }
        let mut total = 0u32;
        let mut applicable = true;
        for (argument, parameter) in arguments.iter().zip(&candidate.params) {
            match conversion_cost(argument, parameter) {
                Some(cost) => total += cost,
                None => {
                    applicable = false;
                    break;
                }
            }
        }
        if !applicable {
            continue;
        }
        if total < best_cost {
            best_cost = total;
            best = vec![candidate.clone()];
        } else if total == best_cost {
            best.push(candidate.clone());
        }
    }

    match best.len() {
        0 => OverloadResolution::NoMatch,
        1 => OverloadResolution::Match(best.remove(0)),
        _ => OverloadResolution::Ambiguous(best),
    }
}

#[derive(Default)]
struct TypeEntry {
    members: HashMap<String, Vec<Arc<Member>>>,
    constructors: Vec<Arc<Member>>,
}

/// Table-driven [`TypeResolver`]: the only ambient state an engine carries.
/// Immutable once handed to an [`Engine`](crate::Engine).
#[derive(Default)]
pub struct Registry {
    named_types: HashMap<String, Type>,
    entries: HashMap<Type, TypeEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the standard member set: `to_string` on every
    /// primitive, the string and char members, and the `math` static type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.install_primitive_members();
        registry.install_string_members();
        registry.install_char_members();
        registry.install_math();
        registry
    }

    /// Register a host type under a namespace-qualified name and return the
    /// handle used to attach members.
    pub fn register_type(&mut self, qualified_name: &str) -> Type {
        let ty = Type::Object(qualified_name.to_string());
        self.named_types
            .insert(qualified_name.to_string(), ty.clone());
        self.entries.entry(ty.clone()).or_default();
        ty
    }

    pub fn add_member(&mut self, ty: &Type, member: Member) {
        self.entries
            .entry(ty.clone())
            .or_default()
            .members
            .entry(member.name.clone())
            .or_default()
            .push(Arc::new(member));
    }

    pub fn add_constructor(&mut self, ty: &Type, member: Member) {
        self.entries
            .entry(ty.clone())
            .or_default()
            .constructors
            .push(Arc::new(member));
    }

    fn install_primitive_members(&mut self) {
        for ty in [
            Type::Bool,
            Type::Int,
            Type::Long,
            Type::Float,
            Type::Double,
            Type::Char,
            Type::Str,
        ] {
            self.add_member(
                &ty,
                Member::method("to_string", Vec::new(), Type::Str, |receiver, _| {
                    Ok(Value::from(receiver.to_string()))
                }),
            );
        }
    }

    fn install_string_members(&mut self) {
        let ty = Type::Str;
        self.add_member(
            &ty,
            Member::property("length", Type::Int, |receiver, _| {
                Ok(Value::Int(expect_str(receiver)?.chars().count() as i32))
            }),
        );
        self.add_member(
            &ty,
            Member::method("contains", vec![Type::Str], Type::Bool, |receiver, args| {
                Ok(Value::Bool(
                    expect_str(receiver)?.contains(expect_str(&args[0])?),
                ))
            }),
        );
        self.add_member(
            &ty,
            Member::method(
                "starts_with",
                vec![Type::Str],
                Type::Bool,
                |receiver, args| {
                    Ok(Value::Bool(
                        expect_str(receiver)?.starts_with(expect_str(&args[0])?),
                    ))
                },
            ),
        );
        self.add_member(
            &ty,
            Member::method(
                "ends_with",
                vec![Type::Str],
                Type::Bool,
                |receiver, args| {
                    Ok(Value::Bool(
                        expect_str(receiver)?.ends_with(expect_str(&args[0])?),
                    ))
                },
            ),
        );
        self.add_member(
            &ty,
            Member::method("index_of", vec![Type::Str], Type::Int, |receiver, args| {
                let haystack = expect_str(receiver)?;
                let needle = expect_str(&args[0])?;
                let index = match haystack.find(needle) {
                    Some(byte_index) => haystack[..byte_index].chars().count() as i32,
                    None => -1,
                };
                Ok(Value::Int(index))
            }),
        );
        self.add_member(
            &ty,
            Member::method("to_upper", Vec::new(), Type::Str, |receiver, _| {
                Ok(Value::from(expect_str(receiver)?.to_uppercase()))
            }),
        );
        self.add_member(
            &ty,
            Member::method("to_lower", Vec::new(), Type::Str, |receiver, _| {
                Ok(Value::from(expect_str(receiver)?.to_lowercase()))
            }),
        );
        self.add_member(
            &ty,
            Member::method("trim", Vec::new(), Type::Str, |receiver, _| {
                Ok(Value::from(expect_str(receiver)?.trim()))
            }),
        );
        self.add_member(
            &ty,
            Member::method("substring", vec![Type::Int], Type::Str, |receiver, args| {
                let text = expect_str(receiver)?;
                let start = expect_int(&args[0])?;
                substring(text, start, None)
            }),
        );
        self.add_member(
            &ty,
            Member::method(
                "substring",
                vec![Type::Int, Type::Int],
                Type::Str,
                |receiver, args| {
                    let text = expect_str(receiver)?;
                    let start = expect_int(&args[0])?;
                    let length = expect_int(&args[1])?;
                    substring(text, start, Some(length))
                },
            ),
        );
        self.add_member(
            &ty,
            Member::indexer(vec![Type::Int], Type::Char, |receiver, args| {
                let text = expect_str(receiver)?;
                let index = expect_int(&args[0])?;
                let length = text.chars().count();
                usize::try_from(index)
                    .ok()
                    .and_then(|index| text.chars().nth(index))
                    .map(Value::Char)
                    .ok_or(InvokeError::IndexOutOfBounds {
                        index: i64::from(index),
                        length,
                    })
            }),
        );
    }

    fn install_char_members(&mut self) {
        let ty = Type::Char;
        self.add_member(
            &ty,
            Member::method("is_digit", Vec::new(), Type::Bool, |receiver, _| {
                Ok(Value::Bool(expect_char(receiver)?.is_ascii_digit()))
            }),
        );
        self.add_member(
            &ty,
            Member::method("is_letter", Vec::new(), Type::Bool, |receiver, _| {
                Ok(Value::Bool(expect_char(receiver)?.is_alphabetic()))
            }),
        );
        self.add_member(
            &ty,
            Member::method("to_upper", Vec::new(), Type::Char, |receiver, _| {
                let ch = expect_char(receiver)?;
                Ok(Value::Char(ch.to_uppercase().next().unwrap_or(ch)))
            }),
        );
        self.add_member(
            &ty,
            Member::method("to_lower", Vec::new(), Type::Char, |receiver, _| {
                let ch = expect_char(receiver)?;
                Ok(Value::Char(ch.to_lowercase().next().unwrap_or(ch)))
            }),
        );
    }

    fn install_math(&mut self) {
        let ty = self.register_type("std.math");

        self.add_member(
            &ty,
            Member::static_property("pi", Type::Double, |_, _| {
                Ok(Value::Double(std::f64::consts::PI))
            }),
        );
        self.add_member(
            &ty,
            Member::static_property("e", Type::Double, |_, _| {
                Ok(Value::Double(std::f64::consts::E))
            }),
        );

        self.add_member(
            &ty,
            Member::static_method("min", vec![Type::Int, Type::Int], Type::Int, |_, args| {
                Ok(Value::Int(expect_int(&args[0])?.min(expect_int(&args[1])?)))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("min", vec![Type::Long, Type::Long], Type::Long, |_, args| {
                Ok(Value::Long(
                    expect_long(&args[0])?.min(expect_long(&args[1])?),
                ))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method(
                "min",
                vec![Type::Double, Type::Double],
                Type::Double,
                |_, args| {
                    Ok(Value::Double(
                        expect_double(&args[0])?.min(expect_double(&args[1])?),
                    ))
                },
            ),
        );
        self.add_member(
            &ty,
            Member::static_method("max", vec![Type::Int, Type::Int], Type::Int, |_, args| {
                Ok(Value::Int(expect_int(&args[0])?.max(expect_int(&args[1])?)))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("max", vec![Type::Long, Type::Long], Type::Long, |_, args| {
                Ok(Value::Long(
                    expect_long(&args[0])?.max(expect_long(&args[1])?),
                ))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method(
                "max",
                vec![Type::Double, Type::Double],
                Type::Double,
                |_, args| {
                    Ok(Value::Double(
                        expect_double(&args[0])?.max(expect_double(&args[1])?),
                    ))
                },
            ),
        );
        self.add_member(
            &ty,
            Member::static_method("abs", vec![Type::Int], Type::Int, |_, args| {
                expect_int(&args[0])?
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| InvokeError::Member("integer overflow in abs".to_string()))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("abs", vec![Type::Long], Type::Long, |_, args| {
                expect_long(&args[0])?
                    .checked_abs()
                    .map(Value::Long)
                    .ok_or_else(|| InvokeError::Member("integer overflow in abs".to_string()))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("abs", vec![Type::Double], Type::Double, |_, args| {
                Ok(Value::Double(expect_double(&args[0])?.abs()))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("floor", vec![Type::Double], Type::Double, |_, args| {
                Ok(Value::Double(expect_double(&args[0])?.floor()))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("ceil", vec![Type::Double], Type::Double, |_, args| {
                Ok(Value::Double(expect_double(&args[0])?.ceil()))
            }),
        );
        self.add_member(
            &ty,
            Member::static_method("sqrt", vec![Type::Double], Type::Double, |_, args| {
                Ok(Value::Double(expect_double(&args[0])?.sqrt()))
            }),
        );
    }
}

impl TypeResolver for Registry {
    fn resolve_type(&self, name: &str, namespaces: &[String]) -> Option<Type> {
        if let Some(ty) = self.named_types.get(name) {
            return Some(ty.clone());
        }
        for namespace in namespaces {
            if let Some(ty) = self.named_types.get(&format!("{namespace}.{name}")) {
                return Some(ty.clone());
            }
        }
        None
    }

    fn resolve_members(&self, ty: &Type, name: &str) -> Vec<Arc<Member>> {
        self.entries
            .get(ty)
            .and_then(|entry| entry.members.get(name))
            .cloned()
            .unwrap_or_default()
    }

    fn resolve_constructors(&self, ty: &Type) -> Vec<Arc<Member>> {
        self.entries
            .get(ty)
            .map(|entry| entry.constructors.clone())
            .unwrap_or_default()
    }
}

fn expect_str(value: &Value) -> Result<&str, InvokeError> {
    match value {
        Value::Str(text) => Ok(text),
        other => Err(InvokeError::Member(format!(
            "expected a Str value, received {}",
            other.type_of()
        ))),
    }
}

fn expect_char(value: &Value) -> Result<char, InvokeError> {
    match value {
        Value::Char(ch) => Ok(*ch),
        other => Err(InvokeError::Member(format!(
            "expected a Char value, received {}",
            other.type_of()
        ))),
    }
}

fn expect_int(value: &Value) -> Result<i32, InvokeError> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(InvokeError::Member(format!(
            "expected an Int value, received {}",
            other.type_of()
        ))),
    }
}

fn expect_long(value: &Value) -> Result<i64, InvokeError> {
    match value {
        Value::Long(v) => Ok(*v),
        other => Err(InvokeError::Member(format!(
            "expected a Long value, received {}",
            other.type_of()
        ))),
    }
}

fn expect_double(value: &Value) -> Result<f64, InvokeError> {
    match value {
        Value::Double(v) => Ok(*v),
        other => Err(InvokeError::Member(format!(
            "expected a Double value, received {}",
            other.type_of()
        ))),
    }
}

fn substring(text: &str, start: i32, length: Option<i32>) -> Result<Value, InvokeError> {
    let total = text.chars().count();
    let start = usize::try_from(start).map_err(|_| InvokeError::Member(
        format!("substring start {start} is negative"),
    ))?;
    if start > total {
        return Err(InvokeError::Member(format!(
            "substring start {start} is past the end of a string of length {total}"
        )));
    }
    let taken: String = match length {
        Some(length) => {
            let length = usize::try_from(length).map_err(|_| {
                InvokeError::Member(format!("substring length {} is negative", length))
            })?;
            if start + length > total {
                return Err(InvokeError::Member(format!(
                    "substring range {start}..{} is past the end of a string of length {total}",
                    start + length
                )));
            }
            text.chars().skip(start).take(length).collect()
        }
        None => text.chars().skip(start).collect(),
    };
    Ok(Value::from(taken))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, params: Vec<Type>) -> Arc<Member> {
        Arc::new(Member::method(name, params, Type::Int, |_, _| {
            Ok(Value::Int(0))
        }))
    }

    #[test]
    fn exact_match_beats_widening() {
        let candidates = vec![
            method("min", vec![Type::Int, Type::Int]),
            method("min", vec![Type::Double, Type::Double]),
        ];
        match default_overload_resolution(&candidates, &[Type::Int, Type::Int]) {
            OverloadResolution::Match(member) => {
                assert_eq!(member.params, vec![Type::Int, Type::Int]);
            }
            other => panic!("expected an exact match, got {other:?}"),
        }
    }

    #[test]
    fn widening_finds_the_nearest_candidate() {
        let candidates = vec![
            method("f", vec![Type::Long]),
            method("f", vec![Type::Double]),
        ];
        match default_overload_resolution(&candidates, &[Type::Int]) {
            OverloadResolution::Match(member) => {
                assert_eq!(member.params, vec![Type::Long]);
            }
            other => panic!("expected the Long overload, got {other:?}"),
        }
    }

    #[test]
    fn equally_distant_candidates_are_ambiguous() {
        let candidates = vec![
            method("f", vec![Type::Long, Type::Int]),
            method("f", vec![Type::Int, Type::Long]),
        ];
        match default_overload_resolution(&candidates, &[Type::Int, Type::Int]) {
            OverloadResolution::Ambiguous(members) => assert_eq!(members.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn arity_filters_before_ranking() {
        let candidates = vec![
            method("f", vec![Type::Int]),
            method("f", vec![Type::Int, Type::Int]),
        ];
        match default_overload_resolution(&candidates, &[Type::Int, Type::Int]) {
            OverloadResolution::Match(member) => assert_eq!(member.params.len(), 2),
            other => panic!("expected the two-parameter overload, got {other:?}"),
        }
    }

    #[test]
    fn no_applicable_candidate_is_no_match() {
        let candidates = vec![method("f", vec![Type::Str])];
        assert!(matches!(
            default_overload_resolution(&candidates, &[Type::Int]),
            OverloadResolution::NoMatch
        ));
    }

    #[test]
    fn namespaces_resolve_in_declaration_order() {
        let mut registry = Registry::new();
        registry.register_type("alpha.Widget");
        registry.register_type("beta.Widget");

        let namespaces = vec!["beta".to_string(), "alpha".to_string()];
        assert_eq!(
            registry.resolve_type("Widget", &namespaces),
            Some(Type::Object("beta.Widget".to_string()))
        );

        let namespaces = vec!["alpha".to_string(), "beta".to_string()];
        assert_eq!(
            registry.resolve_type("Widget", &namespaces),
            Some(Type::Object("alpha.Widget".to_string()))
        );
    }
}
