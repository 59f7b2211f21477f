//! Tree-walking evaluation of a bound expression.
//!
//! The compiled artifact owns its typed tree and signature and holds no
//! mutable state, so one instance can be invoked concurrently from any
//! number of threads.

use thiserror::Error;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::binder::{BoundParameter, TypedExpression, TypedExpressionKind};
use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("expected {expected} argument(s), received {received}")]
    ArityMismatch { expected: usize, received: usize },
    #[error("argument {index} expects {expected}, received {received}")]
    ArgumentType {
        index: usize,
        expected: String,
        received: String,
    },
    #[error("position {offset} near: member access on null receiver")]
    NullReceiver { offset: usize },
    #[error("position {offset} near: null value in expression")]
    NullValue { offset: usize },
    #[error("position {offset} near: {message}")]
    Arithmetic { message: String, offset: usize },
    #[error("position {offset} near: cannot convert {from} to {to}")]
    Conversion {
        from: String,
        to: String,
        offset: usize,
    },
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },
    #[error("{0}")]
    Member(String),
}

impl InvokeError {
    /// Source offset of the failing node, for faults that occur inside the
    /// expression body rather than at the call boundary.
    pub fn offset(&self) -> Option<usize> {
        match self {
            InvokeError::NullReceiver { offset }
            | InvokeError::NullValue { offset }
            | InvokeError::Arithmetic { offset, .. }
            | InvokeError::Conversion { offset, .. } => Some(*offset),
            InvokeError::ArityMismatch { .. }
            | InvokeError::ArgumentType { .. }
            | InvokeError::IndexOutOfBounds { .. }
            | InvokeError::Member(_) => None,
        }
    }
}

/// The output artifact of a compile: an invokable function object plus its
/// declared signature.
#[derive(Debug)]
pub struct CompiledExpression {
    parameters: Vec<BoundParameter>,
    return_type: Type,
    root: TypedExpression,
}

impl CompiledExpression {
    pub(crate) fn new(parameters: Vec<BoundParameter>, root: TypedExpression) -> Self {
        Self {
            parameters,
            return_type: root.ty.clone(),
            root,
        }
    }

    pub fn parameters(&self) -> &[BoundParameter] {
        &self.parameters
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Validate the arguments against the declared signature (applying
    /// implicit widening), then evaluate.
    pub fn invoke(&self, arguments: &[Value]) -> Result<Value, InvokeError> {
        if arguments.len() != self.parameters.len() {
            return Err(InvokeError::ArityMismatch {
                expected: self.parameters.len(),
                received: arguments.len(),
            });
        }

        let mut coerced = Vec::with_capacity(arguments.len());
        for (index, (argument, parameter)) in
            arguments.iter().zip(&self.parameters).enumerate()
        {
            let supplied = argument.type_of();
            if !supplied.widens_to(&parameter.ty) {
                return Err(InvokeError::ArgumentType {
                    index,
                    expected: parameter.ty.describe(),
                    received: supplied.describe(),
                });
            }
            let value = argument
                .convert_to(&parameter.ty)
                .unwrap_or_else(|| argument.clone());
            coerced.push(value);
        }

        eval(&self.root, &coerced)
    }
}

fn eval(expr: &TypedExpression, arguments: &[Value]) -> Result<Value, InvokeError> {
    match &expr.kind {
        TypedExpressionKind::Literal(value) => Ok(value.clone()),
        TypedExpressionKind::Parameter(position) => Ok(arguments[*position].clone()),
        TypedExpressionKind::Convert(operand) => {
            let value = eval(operand, arguments)?;
            if value.is_null() && !expr.ty.is_nullable() {
                return Err(InvokeError::NullValue {
                    offset: expr.offset,
                });
            }
            value
                .convert_to(&expr.ty)
                .ok_or_else(|| InvokeError::Conversion {
                    from: value.type_of().describe(),
                    to: expr.ty.describe(),
                    offset: expr.offset,
                })
        }
        TypedExpressionKind::Unary { operator, operand } => {
            let value = eval(operand, arguments)?;
            eval_unary(*operator, value, expr.offset)
        }
        TypedExpressionKind::Binary {
            operator,
            left,
            right,
        } => eval_binary(*operator, left, right, arguments, expr.offset),
        TypedExpressionKind::Concat { left, right } => {
            let left = eval(left, arguments)?;
            let right = eval(right, arguments)?;
            let mut text = String::new();
            if !left.is_null() {
                text.push_str(&left.to_string());
            }
            if !right.is_null() {
                text.push_str(&right.to_string());
            }
            Ok(Value::from(text))
        }
        TypedExpressionKind::Conditional {
            condition,
            consequent,
            alternative,
        } => {
            let condition = eval(condition, arguments)?;
            if expect_bool(&condition, expr.offset)? {
                eval(consequent, arguments)
            } else {
                eval(alternative, arguments)
            }
        }
        TypedExpressionKind::Coalesce { left, right } => {
            let value = eval(left, arguments)?;
            if value.is_null() {
                eval(right, arguments)
            } else {
                value
                    .convert_to(&expr.ty)
                    .ok_or_else(|| InvokeError::Conversion {
                        from: value.type_of().describe(),
                        to: expr.ty.describe(),
                        offset: expr.offset,
                    })
            }
        }
        TypedExpressionKind::Member {
            receiver,
            member,
            null_propagating,
        } => match receiver {
            Some(receiver) => {
                let value = eval(receiver, arguments)?;
                if value.is_null() {
                    if *null_propagating {
                        return Ok(Value::Null);
                    }
                    return Err(InvokeError::NullReceiver {
                        offset: expr.offset,
                    });
                }
                (member.dispatch)(&value, &[])
            }
            None => (member.dispatch)(&Value::Null, &[]),
        },
        TypedExpressionKind::Index {
            receiver,
            member,
            index,
        } => {
            let value = eval(receiver, arguments)?;
            if value.is_null() {
                return Err(InvokeError::NullReceiver {
                    offset: expr.offset,
                });
            }
            let index = eval(index, arguments)?;
            (member.dispatch)(&value, &[index])
        }
        TypedExpressionKind::Call {
            receiver,
            member,
            arguments: call_arguments,
            null_propagating,
        } => {
            let receiver_value = match receiver {
                Some(receiver) => {
                    let value = eval(receiver, arguments)?;
                    if value.is_null() {
                        if *null_propagating {
                            return Ok(Value::Null);
                        }
                        return Err(InvokeError::NullReceiver {
                            offset: expr.offset,
                        });
                    }
                    value
                }
                None => Value::Null,
            };
            let mut values = Vec::with_capacity(call_arguments.len());
            for argument in call_arguments {
                values.push(eval(argument, arguments)?);
            }
            (member.dispatch)(&receiver_value, &values)
        }
        TypedExpressionKind::New {
            member,
            arguments: call_arguments,
        } => {
            let mut values = Vec::with_capacity(call_arguments.len());
            for argument in call_arguments {
                values.push(eval(argument, arguments)?);
            }
            (member.dispatch)(&Value::Null, &values)
        }
    }
}

fn eval_unary(operator: UnaryOperator, value: Value, offset: usize) -> Result<Value, InvokeError> {
    match operator {
        UnaryOperator::Not => Ok(Value::Bool(!expect_bool(&value, offset)?)),
        UnaryOperator::Positive => Ok(value),
        UnaryOperator::Negative => match value {
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| overflow("negation", offset)),
            Value::Long(v) => v
                .checked_neg()
                .map(Value::Long)
                .ok_or_else(|| overflow("negation", offset)),
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Double(v) => Ok(Value::Double(-v)),
            Value::Null => Err(InvokeError::NullValue { offset }),
            other => Err(InvokeError::Member(format!(
                "cannot negate a {} value",
                other.type_of()
            ))),
        },
    }
}

fn eval_binary(
    operator: BinaryOperator,
    left: &TypedExpression,
    right: &TypedExpression,
    arguments: &[Value],
    offset: usize,
) -> Result<Value, InvokeError> {
    // Short-circuit forms never evaluate the right operand eagerly.
    if matches!(operator, BinaryOperator::And | BinaryOperator::Or) {
        let left = eval(left, arguments)?;
        let left = expect_bool(&left, offset)?;
        return match operator {
            BinaryOperator::And if !left => Ok(Value::Bool(false)),
            BinaryOperator::Or if left => Ok(Value::Bool(true)),
            _ => {
                let right = eval(right, arguments)?;
                Ok(Value::Bool(expect_bool(&right, offset)?))
            }
        };
    }

    let left = eval(left, arguments)?;
    let right = eval(right, arguments)?;

    match operator {
        BinaryOperator::Equal => Ok(Value::Bool(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => compare_ordering(operator, &left, &right, offset),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => eval_arithmetic(operator, &left, &right, offset),
        BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
    }
}

fn compare_ordering(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    offset: usize,
) -> Result<Value, InvokeError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Long(a), Value::Long(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
        (Value::Null, _) | (_, Value::Null) => {
            return Err(InvokeError::NullValue { offset });
        }
        (a, b) => {
            return Err(InvokeError::Member(format!(
                "cannot order {} against {}",
                a.type_of(),
                b.type_of()
            )));
        }
    };
    let result = match ordering {
        Some(ordering) => match operator {
            BinaryOperator::Less => ordering.is_lt(),
            BinaryOperator::LessEqual => ordering.is_le(),
            BinaryOperator::Greater => ordering.is_gt(),
            BinaryOperator::GreaterEqual => ordering.is_ge(),
            _ => unreachable!("not an ordering operator"),
        },
        // NaN comparisons are false, matching host float semantics.
        None => false,
    };
    Ok(Value::Bool(result))
}

fn eval_arithmetic(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    offset: usize,
) -> Result<Value, InvokeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(operator, i64::from(*a), i64::from(*b), offset)
            .map(|v| Value::Int(v as i32)),
        (Value::Long(a), Value::Long(b)) => {
            long_arithmetic(operator, *a, *b, offset).map(Value::Long)
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match operator {
            BinaryOperator::Add => a + b,
            BinaryOperator::Subtract => a - b,
            BinaryOperator::Multiply => a * b,
            BinaryOperator::Divide => a / b,
            BinaryOperator::Modulo => a % b,
            _ => unreachable!("not an arithmetic operator"),
        })),
        (Value::Double(a), Value::Double(b)) => {
            Ok(Value::Double(float_arithmetic(operator, *a, *b)))
        }
        (Value::Null, _) | (_, Value::Null) => Err(InvokeError::NullValue { offset }),
        (a, b) => Err(InvokeError::Member(format!(
            "cannot apply '{}' to {} and {}",
            operator.symbol(),
            a.type_of(),
            b.type_of()
        ))),
    }
}

/// Int arithmetic runs in 64 bits and is checked back into 32 on the way
/// out, so `Int` overflow surfaces as an error rather than a silent wrap.
fn int_arithmetic(
    operator: BinaryOperator,
    a: i64,
    b: i64,
    offset: usize,
) -> Result<i64, InvokeError> {
    let wide = long_arithmetic(operator, a, b, offset)?;
    if i32::try_from(wide).is_err() {
        return Err(overflow(operator.symbol(), offset));
    }
    Ok(wide)
}

fn long_arithmetic(
    operator: BinaryOperator,
    a: i64,
    b: i64,
    offset: usize,
) -> Result<i64, InvokeError> {
    let result = match operator {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        BinaryOperator::Divide => {
            if b == 0 {
                return Err(InvokeError::Arithmetic {
                    message: "division by zero".to_string(),
                    offset,
                });
            }
            a.checked_div(b)
        }
        BinaryOperator::Modulo => {
            if b == 0 {
                return Err(InvokeError::Arithmetic {
                    message: "division by zero".to_string(),
                    offset,
                });
            }
            a.checked_rem(b)
        }
        _ => unreachable!("not an arithmetic operator"),
    };
    result.ok_or_else(|| overflow(operator.symbol(), offset))
}

fn float_arithmetic(operator: BinaryOperator, a: f64, b: f64) -> f64 {
    match operator {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn expect_bool(value: &Value, offset: usize) -> Result<bool, InvokeError> {
    match value {
        Value::Bool(v) => Ok(*v),
        Value::Null => Err(InvokeError::NullValue { offset }),
        other => Err(InvokeError::Member(format!(
            "expected a Bool value, received {}",
            other.type_of()
        ))),
    }
}

fn overflow(operation: &str, offset: usize) -> InvokeError {
    InvokeError::Arithmetic {
        message: format!("integer overflow in '{operation}'"),
        offset,
    }
}
