//! Binding: turns the parser's untyped tree into a fully typed tree.
//!
//! The walk is bottom-up and total — every node either receives a resolved
//! type (with implicit numeric promotions made explicit as `Convert` nodes)
//! or the whole bind fails. There is no partial recovery: a tree that comes
//! out of here is evaluatable without further checks.

use std::sync::Arc;

use thiserror::Error;

use oolong_support::describe_candidates;

use crate::ast::{
    BinaryOperator, CallExpression, CastExpression, CoalesceExpression, ConditionalExpression,
    Expression, ExpressionKind, IndexExpression, Literal, MemberExpression, NewExpression,
    UnaryExpression, UnaryOperator,
};
use crate::registry::{Member, MemberKind, OverloadResolution, TypeResolver, INDEXER};
use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("position {offset} near: unresolved identifier '{name}'")]
    UnresolvedIdentifier { name: String, offset: usize },
    #[error("position {offset} near: type not found '{name}'")]
    UnknownType { name: String, offset: usize },
    #[error("position {offset} near: {ty} has no member '{name}'")]
    UnknownMember {
        ty: String,
        name: String,
        offset: usize,
    },
    #[error("position {offset} near: no overload of '{name}' accepts ({arguments})")]
    NoMatchingOverload {
        name: String,
        arguments: String,
        offset: usize,
    },
    #[error("position {offset} near: ambiguous call to '{name}', candidates {candidates} are equally applicable")]
    AmbiguousOverload {
        name: String,
        candidates: String,
        offset: usize,
    },
    #[error("position {offset} near: {message}")]
    TypeMismatch { message: String, offset: usize },
    #[error("position {offset} near: cannot cast {from} to {to}")]
    InvalidCast {
        from: String,
        to: String,
        offset: usize,
    },
    #[error("position {offset} near: parameter '{name}' has no declared type")]
    MissingParameterType { name: String, offset: usize },
    #[error("position {offset} near: slot ${slot} is outside the declared signature of {arity} parameter(s)")]
    SlotOutOfRange {
        slot: u32,
        arity: usize,
        offset: usize,
    },
    #[error("position {offset} near: expression is not callable")]
    NotCallable { offset: usize },
    #[error("position {offset} near: type '{name}' cannot be used as a value")]
    TypeAsValue { name: String, offset: usize },
}

impl BindError {
    pub fn offset(&self) -> usize {
        match self {
            BindError::UnresolvedIdentifier { offset, .. }
            | BindError::UnknownType { offset, .. }
            | BindError::UnknownMember { offset, .. }
            | BindError::NoMatchingOverload { offset, .. }
            | BindError::AmbiguousOverload { offset, .. }
            | BindError::TypeMismatch { offset, .. }
            | BindError::InvalidCast { offset, .. }
            | BindError::MissingParameterType { offset, .. }
            | BindError::SlotOutOfRange { offset, .. }
            | BindError::NotCallable { offset }
            | BindError::TypeAsValue { offset, .. } => *offset,
        }
    }
}

/// A declared parameter of the expression being compiled. Slot-only
/// parameters carry no name.
#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub name: Option<String>,
    pub ty: Type,
}

/// Parameters in scope for one compile, built once by the driver and
/// read-only during binding.
#[derive(Debug, Clone, Default)]
pub struct BindingContext {
    pub parameters: Vec<BoundParameter>,
    /// Parameter 0 is the implicit default instance: bare identifiers may
    /// resolve as its members and `$0` aliases it.
    pub default_instance: bool,
    pub expected_result: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct TypedExpression {
    pub offset: usize,
    pub ty: Type,
    /// Whether evaluation may produce `null` — tracked so `??` and `?.`
    /// bind only where null can actually occur.
    pub nullable: bool,
    pub kind: TypedExpressionKind,
}

#[derive(Debug, Clone)]
pub enum TypedExpressionKind {
    Literal(Value),
    Parameter(usize),
    Convert(Box<TypedExpression>),
    Unary {
        operator: UnaryOperator,
        operand: Box<TypedExpression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<TypedExpression>,
        right: Box<TypedExpression>,
    },
    Concat {
        left: Box<TypedExpression>,
        right: Box<TypedExpression>,
    },
    Conditional {
        condition: Box<TypedExpression>,
        consequent: Box<TypedExpression>,
        alternative: Box<TypedExpression>,
    },
    Coalesce {
        left: Box<TypedExpression>,
        right: Box<TypedExpression>,
    },
    Member {
        receiver: Option<Box<TypedExpression>>,
        member: Arc<Member>,
        null_propagating: bool,
    },
    Index {
        receiver: Box<TypedExpression>,
        member: Arc<Member>,
        index: Box<TypedExpression>,
    },
    Call {
        receiver: Option<Box<TypedExpression>>,
        member: Arc<Member>,
        arguments: Vec<TypedExpression>,
        null_propagating: bool,
    },
    New {
        member: Arc<Member>,
        arguments: Vec<TypedExpression>,
    },
}

/// An operand may be a value or a bare type name awaiting static member
/// access; only member/call positions accept the latter.
enum Bound {
    Value(TypedExpression),
    TypeRef { ty: Type, name: String, offset: usize },
}

pub struct Binder<'a> {
    context: &'a BindingContext,
    resolver: &'a dyn TypeResolver,
    namespaces: &'a [String],
}

impl<'a> Binder<'a> {
    pub fn new(
        context: &'a BindingContext,
        resolver: &'a dyn TypeResolver,
        namespaces: &'a [String],
    ) -> Self {
        Self {
            context,
            resolver,
            namespaces,
        }
    }

    pub fn bind(&self, body: &Expression) -> Result<TypedExpression, BindError> {
        let bound = self.bind_value(body)?;
        match &self.context.expected_result {
            Some(expected) if &bound.ty != expected => {
                if bound.ty.widens_to(expected) {
                    Ok(convert(bound, expected.clone()))
                } else {
                    Err(BindError::TypeMismatch {
                        message: format!(
                            "expression has type {}, expected {}",
                            bound.ty, expected
                        ),
                        offset: body.offset,
                    })
                }
            }
            _ => Ok(bound),
        }
    }

    fn bind_value(&self, expr: &Expression) -> Result<TypedExpression, BindError> {
        match self.bind_operand(expr)? {
            Bound::Value(value) => Ok(value),
            Bound::TypeRef { name, offset, .. } => Err(BindError::TypeAsValue { name, offset }),
        }
    }

    fn bind_operand(&self, expr: &Expression) -> Result<Bound, BindError> {
        match &expr.kind {
            ExpressionKind::Literal(literal) => Ok(Bound::Value(bind_literal(literal, expr.offset))),
            ExpressionKind::Slot(index) => self.bind_slot(*index, expr.offset).map(Bound::Value),
            ExpressionKind::Identifier(name) => self.bind_identifier(name, expr.offset),
            ExpressionKind::Unary(unary) => self.bind_unary(unary, expr.offset).map(Bound::Value),
            ExpressionKind::Binary(binary) => {
                self.bind_binary(binary, expr.offset).map(Bound::Value)
            }
            ExpressionKind::Conditional(conditional) => {
                self.bind_conditional(conditional, expr.offset).map(Bound::Value)
            }
            ExpressionKind::Coalesce(coalesce) => {
                self.bind_coalesce(coalesce, expr.offset).map(Bound::Value)
            }
            ExpressionKind::Member(member) => self.bind_member(member, expr.offset).map(Bound::Value),
            ExpressionKind::Index(index) => self.bind_index(index, expr.offset).map(Bound::Value),
            ExpressionKind::Call(call) => self.bind_call(call, expr.offset).map(Bound::Value),
            ExpressionKind::Cast(cast) => self.bind_cast(cast, expr.offset).map(Bound::Value),
            ExpressionKind::New(new) => self.bind_new(new, expr.offset).map(Bound::Value),
        }
    }

    fn bind_slot(&self, index: u32, offset: usize) -> Result<TypedExpression, BindError> {
        let position = index as usize;
        match self.context.parameters.get(position) {
            Some(parameter) => Ok(parameter_expression(position, parameter.ty.clone(), offset)),
            None => Err(BindError::SlotOutOfRange {
                slot: index,
                arity: self.context.parameters.len(),
                offset,
            }),
        }
    }

    /// Resolution order: declared parameter, member of the implicit default
    /// instance, then a static type name.
    fn bind_identifier(&self, name: &str, offset: usize) -> Result<Bound, BindError> {
        if let Some(position) = self
            .context
            .parameters
            .iter()
            .position(|parameter| parameter.name.as_deref() == Some(name))
        {
            let ty = self.context.parameters[position].ty.clone();
            return Ok(Bound::Value(parameter_expression(position, ty, offset)));
        }

        if let Some(instance) = self.default_instance_parameter() {
            let candidates = self.resolver.resolve_members(&instance.ty, name);
            if let Some(property) = candidates
                .iter()
                .find(|member| member.kind == MemberKind::Property)
            {
                let receiver = parameter_expression(0, instance.ty.clone(), offset);
                return Ok(Bound::Value(member_access(
                    Some(receiver),
                    property.clone(),
                    false,
                    offset,
                )));
            }
        }

        if let Some(ty) = self.resolver.resolve_type(name, self.namespaces) {
            return Ok(Bound::TypeRef {
                ty,
                name: name.to_string(),
                offset,
            });
        }

        Err(BindError::UnresolvedIdentifier {
            name: name.to_string(),
            offset,
        })
    }

    fn default_instance_parameter(&self) -> Option<&BoundParameter> {
        self.context
            .default_instance
            .then(|| self.context.parameters.first())
            .flatten()
    }

    fn bind_unary(
        &self,
        unary: &UnaryExpression,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        let operand = self.bind_value(&unary.operand)?;
        match unary.operator {
            UnaryOperator::Not => {
                if operand.ty != Type::Bool {
                    return Err(BindError::TypeMismatch {
                        message: format!("operator '!' requires Bool, found {}", operand.ty),
                        offset,
                    });
                }
            }
            UnaryOperator::Negative | UnaryOperator::Positive => {
                if !operand.ty.is_numeric() {
                    return Err(BindError::TypeMismatch {
                        message: format!(
                            "unary '{}' requires a numeric operand, found {}",
                            if unary.operator == UnaryOperator::Negative { "-" } else { "+" },
                            operand.ty
                        ),
                        offset,
                    });
                }
            }
        }
        Ok(TypedExpression {
            offset,
            ty: operand.ty.clone(),
            nullable: false,
            kind: TypedExpressionKind::Unary {
                operator: unary.operator,
                operand: Box::new(operand),
            },
        })
    }

    fn bind_binary(
        &self,
        binary: &crate::ast::BinaryExpression,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        let left = self.bind_value(&binary.left)?;
        let right = self.bind_value(&binary.right)?;
        let operator = binary.operator;

        match operator {
            BinaryOperator::Add if left.ty == Type::Str || right.ty == Type::Str => {
                Ok(TypedExpression {
                    offset,
                    ty: Type::Str,
                    nullable: false,
                    kind: TypedExpressionKind::Concat {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                })
            }
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => {
                let (left, right, ty) = self.promote_pair(left, right, operator, offset)?;
                Ok(TypedExpression {
                    offset,
                    ty,
                    nullable: false,
                    kind: TypedExpressionKind::Binary {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                })
            }
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                self.bind_equality(left, right, operator, offset)
            }
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => {
                if left.ty == Type::Char && right.ty == Type::Char {
                    return Ok(comparison(operator, left, right, offset));
                }
                let (left, right, _) = self.promote_pair(left, right, operator, offset)?;
                Ok(comparison(operator, left, right, offset))
            }
            BinaryOperator::And | BinaryOperator::Or => {
                if left.ty != Type::Bool || right.ty != Type::Bool {
                    return Err(BindError::TypeMismatch {
                        message: format!(
                            "operator '{}' requires Bool operands, found {} and {}",
                            operator.symbol(),
                            left.ty,
                            right.ty
                        ),
                        offset,
                    });
                }
                Ok(comparison(operator, left, right, offset))
            }
        }
    }

    fn bind_equality(
        &self,
        left: TypedExpression,
        right: TypedExpression,
        operator: BinaryOperator,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        if left.ty.is_numeric() && right.ty.is_numeric() {
            let (left, right, _) = self.promote_pair(left, right, operator, offset)?;
            return Ok(comparison(operator, left, right, offset));
        }
        let comparable = left.ty == right.ty
            || (left.ty == Type::Null && (right.ty.is_nullable() || right.nullable))
            || (right.ty == Type::Null && (left.ty.is_nullable() || left.nullable));
        if !comparable {
            return Err(BindError::TypeMismatch {
                message: format!(
                    "operator '{}' cannot compare {} to {}",
                    operator.symbol(),
                    left.ty,
                    right.ty
                ),
                offset,
            });
        }
        Ok(comparison(operator, left, right, offset))
    }

    fn promote_pair(
        &self,
        left: TypedExpression,
        right: TypedExpression,
        operator: BinaryOperator,
        offset: usize,
    ) -> Result<(TypedExpression, TypedExpression, Type), BindError> {
        let ty = Type::promote(&left.ty, &right.ty).ok_or_else(|| BindError::TypeMismatch {
            message: format!(
                "operator '{}' requires numeric operands, found {} and {}",
                operator.symbol(),
                left.ty,
                right.ty
            ),
            offset,
        })?;
        Ok((convert(left, ty.clone()), convert(right, ty.clone()), ty))
    }

    fn bind_conditional(
        &self,
        conditional: &ConditionalExpression,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        let condition = self.bind_value(&conditional.condition)?;
        if condition.ty != Type::Bool {
            return Err(BindError::TypeMismatch {
                message: format!(
                    "conditional operator requires a Bool condition, found {}",
                    condition.ty
                ),
                offset: condition.offset,
            });
        }
        let consequent = self.bind_value(&conditional.consequent)?;
        let alternative = self.bind_value(&conditional.alternative)?;
        let ty = self.common_type(&consequent, &alternative).ok_or_else(|| {
            BindError::TypeMismatch {
                message: format!(
                    "conditional branches have incompatible types {} and {}",
                    consequent.ty, alternative.ty
                ),
                offset,
            }
        })?;
        let nullable = consequent.nullable || alternative.nullable;
        let consequent = convert(consequent, ty.clone());
        let alternative = convert(alternative, ty.clone());
        Ok(TypedExpression {
            offset,
            ty,
            nullable,
            kind: TypedExpressionKind::Conditional {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternative: Box::new(alternative),
            },
        })
    }

    fn bind_coalesce(
        &self,
        coalesce: &CoalesceExpression,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        let left = self.bind_value(&coalesce.left)?;
        if !left.nullable && !left.ty.is_nullable() {
            return Err(BindError::TypeMismatch {
                message: format!("left operand of '??' has type {} and is never null", left.ty),
                offset,
            });
        }
        let right = self.bind_value(&coalesce.right)?;
        let ty = if left.ty == Type::Null {
            right.ty.clone()
        } else {
            self.common_type(&left, &right)
                .ok_or_else(|| BindError::TypeMismatch {
                    message: format!(
                        "operator '??' requires compatible operands, found {} and {}",
                        left.ty, right.ty
                    ),
                    offset,
                })?
        };
        let nullable = right.nullable;
        // The left operand stays unconverted: its conversion to the common
        // type must only happen once it is known to be non-null, so the
        // evaluator converts after the null check.
        let right = convert(right, ty.clone());
        Ok(TypedExpression {
            offset,
            ty,
            nullable,
            kind: TypedExpressionKind::Coalesce {
                left: Box::new(left),
                right: Box::new(right),
            },
        })
    }

    /// Common type of two branches: identical, numeric promotion, or `null`
    /// against a nullable branch.
    fn common_type(&self, a: &TypedExpression, b: &TypedExpression) -> Option<Type> {
        if a.ty == b.ty {
            return Some(a.ty.clone());
        }
        if let Some(ty) = Type::promote(&a.ty, &b.ty) {
            return Some(ty);
        }
        if a.ty == Type::Null && b.ty.is_nullable() {
            return Some(b.ty.clone());
        }
        if b.ty == Type::Null && a.ty.is_nullable() {
            return Some(a.ty.clone());
        }
        None
    }

    fn bind_member(
        &self,
        member: &MemberExpression,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        match self.bind_operand(&member.receiver)? {
            Bound::TypeRef { ty, name, .. } => {
                let candidates = self.resolver.resolve_members(&ty, &member.name);
                let found = candidates
                    .iter()
                    .find(|candidate| candidate.kind == MemberKind::StaticProperty);
                match found {
                    Some(property) => Ok(member_access(
                        None,
                        property.clone(),
                        false,
                        member.name_offset,
                    )),
                    None => Err(BindError::UnknownMember {
                        ty: name,
                        name: member.name.clone(),
                        offset: member.name_offset,
                    }),
                }
            }
            Bound::Value(receiver) => {
                if member.null_propagating && !receiver.nullable && !receiver.ty.is_nullable() {
                    return Err(BindError::TypeMismatch {
                        message: format!(
                            "operator '?.' requires a nullable receiver, found {}",
                            receiver.ty
                        ),
                        offset,
                    });
                }
                let candidates = self.resolver.resolve_members(&receiver.ty, &member.name);
                let found = candidates
                    .iter()
                    .find(|candidate| candidate.kind == MemberKind::Property);
                match found {
                    Some(property) => Ok(member_access(
                        Some(receiver),
                        property.clone(),
                        member.null_propagating,
                        member.name_offset,
                    )),
                    None => Err(BindError::UnknownMember {
                        ty: receiver.ty.describe(),
                        name: member.name.clone(),
                        offset: member.name_offset,
                    }),
                }
            }
        }
    }

    fn bind_index(
        &self,
        index: &IndexExpression,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        let receiver = self.bind_value(&index.receiver)?;
        let index_value = self.bind_value(&index.index)?;
        let candidates: Vec<_> = self
            .resolver
            .resolve_members(&receiver.ty, INDEXER)
            .into_iter()
            .filter(|candidate| candidate.kind == MemberKind::Indexer)
            .collect();
        if candidates.is_empty() {
            return Err(BindError::UnknownMember {
                ty: receiver.ty.describe(),
                name: INDEXER.to_string(),
                offset: index.open_offset,
            });
        }
        let member = self.pick_overload(&candidates, std::slice::from_ref(&index_value), INDEXER, index.open_offset)?;
        let index_value = convert(index_value, member.params[0].clone());
        Ok(TypedExpression {
            offset,
            ty: member.return_type.clone(),
            nullable: member.return_type.is_nullable(),
            kind: TypedExpressionKind::Index {
                receiver: Box::new(receiver),
                member,
                index: Box::new(index_value),
            },
        })
    }

    fn bind_call(&self, call: &CallExpression, offset: usize) -> Result<TypedExpression, BindError> {
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.bind_value(argument))
            .collect::<Result<Vec<_>, _>>()?;

        match &call.callee.kind {
            ExpressionKind::Member(member) => {
                self.bind_member_call(member, arguments, offset)
            }
            ExpressionKind::Identifier(name) => {
                if self
                    .context
                    .parameters
                    .iter()
                    .any(|parameter| parameter.name.as_deref() == Some(name))
                {
                    return Err(BindError::NotCallable {
                        offset: call.callee.offset,
                    });
                }
                // A bare call can only be a method of the default instance.
                if let Some(instance) = self.default_instance_parameter() {
                    let candidates: Vec<_> = self
                        .resolver
                        .resolve_members(&instance.ty, name)
                        .into_iter()
                        .filter(|candidate| candidate.kind == MemberKind::Method)
                        .collect();
                    if !candidates.is_empty() {
                        let member =
                            self.pick_overload(&candidates, &arguments, name, call.callee.offset)?;
                        let receiver =
                            parameter_expression(0, instance.ty.clone(), call.callee.offset);
                        return Ok(call_member(
                            Some(receiver),
                            member,
                            arguments,
                            false,
                            offset,
                        ));
                    }
                }
                Err(BindError::UnresolvedIdentifier {
                    name: name.clone(),
                    offset: call.callee.offset,
                })
            }
            _ => Err(BindError::NotCallable {
                offset: call.callee.offset,
            }),
        }
    }

    fn bind_member_call(
        &self,
        member: &MemberExpression,
        arguments: Vec<TypedExpression>,
        offset: usize,
    ) -> Result<TypedExpression, BindError> {
        match self.bind_operand(&member.receiver)? {
            Bound::TypeRef { ty, name, .. } => {
                let candidates: Vec<_> = self
                    .resolver
                    .resolve_members(&ty, &member.name)
                    .into_iter()
                    .filter(|candidate| candidate.kind == MemberKind::StaticMethod)
                    .collect();
                if candidates.is_empty() {
                    return Err(BindError::UnknownMember {
                        ty: name,
                        name: member.name.clone(),
                        offset: member.name_offset,
                    });
                }
                let chosen =
                    self.pick_overload(&candidates, &arguments, &member.name, member.name_offset)?;
                Ok(call_member(None, chosen, arguments, false, offset))
            }
            Bound::Value(receiver) => {
                if member.null_propagating && !receiver.nullable && !receiver.ty.is_nullable() {
                    return Err(BindError::TypeMismatch {
                        message: format!(
                            "operator '?.' requires a nullable receiver, found {}",
                            receiver.ty
                        ),
                        offset,
                    });
                }
                let candidates: Vec<_> = self
                    .resolver
                    .resolve_members(&receiver.ty, &member.name)
                    .into_iter()
                    .filter(|candidate| candidate.kind == MemberKind::Method)
                    .collect();
                if candidates.is_empty() {
                    return Err(BindError::UnknownMember {
                        ty: receiver.ty.describe(),
                        name: member.name.clone(),
                        offset: member.name_offset,
                    });
                }
                let chosen =
                    self.pick_overload(&candidates, &arguments, &member.name, member.name_offset)?;
                Ok(call_member(
                    Some(receiver),
                    chosen,
                    arguments,
                    member.null_propagating,
                    offset,
                ))
            }
        }
    }

    fn pick_overload(
        &self,
        candidates: &[Arc<Member>],
        arguments: &[TypedExpression],
        name: &str,
        offset: usize,
    ) -> Result<Arc<Member>, BindError> {
        let argument_types: Vec<Type> =
            arguments.iter().map(|argument| argument.ty.clone()).collect();
        match self.resolver.resolve_overload(candidates, &argument_types) {
            OverloadResolution::Match(member) => Ok(member),
            OverloadResolution::Ambiguous(members) => Err(BindError::AmbiguousOverload {
                name: name.to_string(),
                candidates: describe_candidates(
                    &members.iter().map(|member| member.signature()).collect::<Vec<_>>(),
                ),
                offset,
            }),
            OverloadResolution::NoMatch => Err(BindError::NoMatchingOverload {
                name: name.to_string(),
                arguments: argument_types
                    .iter()
                    .map(Type::describe)
                    .collect::<Vec<_>>()
                    .join(", "),
                offset,
            }),
        }
    }

    fn bind_cast(&self, cast: &CastExpression, offset: usize) -> Result<TypedExpression, BindError> {
        let target = Type::from_name(&cast.type_name)
            .or_else(|| self.resolver.resolve_type(&cast.type_name, self.namespaces))
            .ok_or_else(|| BindError::UnknownType {
                name: cast.type_name.clone(),
                offset: cast.type_offset,
            })?;
        let operand = self.bind_value(&cast.operand)?;

        if operand.ty == target {
            return Ok(operand);
        }
        let castable = (operand.ty.is_numeric() || operand.ty == Type::Char)
            && (target.is_numeric() || target == Type::Char)
            || (operand.ty == Type::Null && target.is_nullable());
        if !castable {
            return Err(BindError::InvalidCast {
                from: operand.ty.describe(),
                to: target.describe(),
                offset,
            });
        }
        Ok(TypedExpression {
            offset,
            ty: target.clone(),
            nullable: operand.nullable && target.is_nullable(),
            kind: TypedExpressionKind::Convert(Box::new(operand)),
        })
    }

    fn bind_new(&self, new: &NewExpression, offset: usize) -> Result<TypedExpression, BindError> {
        let ty = self
            .resolver
            .resolve_type(&new.type_name, self.namespaces)
            .ok_or_else(|| BindError::UnknownType {
                name: new.type_name.clone(),
                offset: new.name_offset,
            })?;
        let arguments = new
            .arguments
            .iter()
            .map(|argument| self.bind_value(argument))
            .collect::<Result<Vec<_>, _>>()?;
        let candidates = self.resolver.resolve_constructors(&ty);
        if candidates.is_empty() {
            return Err(BindError::NoMatchingOverload {
                name: new.type_name.clone(),
                arguments: arguments
                    .iter()
                    .map(|argument| argument.ty.describe())
                    .collect::<Vec<_>>()
                    .join(", "),
                offset: new.name_offset,
            });
        }
        let member = self.pick_overload(&candidates, &arguments, &new.type_name, new.name_offset)?;
        let arguments = convert_arguments(arguments, &member);
        Ok(TypedExpression {
            offset,
            ty: member.return_type.clone(),
            nullable: false,
            kind: TypedExpressionKind::New { member, arguments },
        })
    }
}

fn bind_literal(literal: &Literal, offset: usize) -> TypedExpression {
    let value = match literal {
        Literal::Int(v) => Value::Int(*v),
        Literal::Long(v) => Value::Long(*v),
        Literal::Float(v) => Value::Float(*v),
        Literal::Double(v) => Value::Double(*v),
        Literal::Str(v) => Value::from(v.as_str()),
        Literal::Char(v) => Value::Char(*v),
        Literal::Bool(v) => Value::Bool(*v),
        Literal::Null => Value::Null,
    };
    TypedExpression {
        offset,
        ty: value.type_of(),
        nullable: value.is_null(),
        kind: TypedExpressionKind::Literal(value),
    }
}

fn parameter_expression(position: usize, ty: Type, offset: usize) -> TypedExpression {
    TypedExpression {
        offset,
        nullable: ty.is_nullable(),
        ty,
        kind: TypedExpressionKind::Parameter(position),
    }
}

fn member_access(
    receiver: Option<TypedExpression>,
    member: Arc<Member>,
    null_propagating: bool,
    offset: usize,
) -> TypedExpression {
    TypedExpression {
        offset,
        ty: member.return_type.clone(),
        nullable: null_propagating || member.return_type.is_nullable(),
        kind: TypedExpressionKind::Member {
            receiver: receiver.map(Box::new),
            member,
            null_propagating,
        },
    }
}

fn call_member(
    receiver: Option<TypedExpression>,
    member: Arc<Member>,
    arguments: Vec<TypedExpression>,
    null_propagating: bool,
    offset: usize,
) -> TypedExpression {
    let arguments = convert_arguments(arguments, &member);
    TypedExpression {
        offset,
        ty: member.return_type.clone(),
        nullable: null_propagating || member.return_type.is_nullable(),
        kind: TypedExpressionKind::Call {
            receiver: receiver.map(Box::new),
            member,
            arguments,
            null_propagating,
        },
    }
}

/// Convert each argument to its declared parameter type; overload
/// resolution already guaranteed the conversions exist.
fn convert_arguments(arguments: Vec<TypedExpression>, member: &Arc<Member>) -> Vec<TypedExpression> {
    arguments
        .into_iter()
        .zip(&member.params)
        .map(|(argument, parameter)| convert(argument, parameter.clone()))
        .collect()
}

fn comparison(
    operator: BinaryOperator,
    left: TypedExpression,
    right: TypedExpression,
    offset: usize,
) -> TypedExpression {
    TypedExpression {
        offset,
        ty: Type::Bool,
        nullable: false,
        kind: TypedExpressionKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

/// Wrap in a `Convert` node unless the expression already has the target
/// type. A runtime `null` passes through a conversion to a nullable target
/// and faults on any other.
fn convert(expr: TypedExpression, target: Type) -> TypedExpression {
    if expr.ty == target {
        return expr;
    }
    TypedExpression {
        offset: expr.offset,
        nullable: expr.nullable && target.is_nullable(),
        ty: target,
        kind: TypedExpressionKind::Convert(Box::new(expr)),
    }
}
