use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::Type;

/// A host object registered with the type registry, tagged with the
/// qualified name it was registered under.
#[derive(Clone)]
pub struct ObjectValue {
    type_name: Arc<str>,
    data: Arc<dyn Any + Send + Sync>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<Arc<str>>, data: impl Any + Send + Sync) -> Self {
        Self {
            type_name: type_name.into(),
            data: Arc::new(data),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectValue({})", self.type_name)
    }
}

/// Runtime value. Cheap to clone; strings and host objects are shared.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(Arc<str>),
    Object(ObjectValue),
}

impl Value {
    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Long(_) => Type::Long,
            Value::Float(_) => Type::Float,
            Value::Double(_) => Type::Double,
            Value::Char(_) => Type::Char,
            Value::Str(_) => Type::Str,
            Value::Object(object) => Type::Object(object.type_name().to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert toward `target`: identity, numeric conversion (widening or
    /// cast-style narrowing), char/code-point conversion, or `null` into a
    /// nullable type. Returns `None` when no conversion exists.
    pub fn convert_to(&self, target: &Type) -> Option<Value> {
        if &self.type_of() == target {
            return Some(self.clone());
        }
        if self.is_null() {
            return target.is_nullable().then_some(Value::Null);
        }
        match target {
            Type::Int => Some(Value::Int(match self {
                Value::Long(v) => *v as i32,
                Value::Float(v) => *v as i32,
                Value::Double(v) => *v as i32,
                Value::Char(v) => *v as u32 as i32,
                _ => return None,
            })),
            Type::Long => Some(Value::Long(match self {
                Value::Int(v) => i64::from(*v),
                Value::Float(v) => *v as i64,
                Value::Double(v) => *v as i64,
                Value::Char(v) => i64::from(*v as u32),
                _ => return None,
            })),
            Type::Float => Some(Value::Float(match self {
                Value::Int(v) => *v as f32,
                Value::Long(v) => *v as f32,
                Value::Double(v) => *v as f32,
                _ => return None,
            })),
            Type::Double => Some(Value::Double(match self {
                Value::Int(v) => f64::from(*v),
                Value::Long(v) => *v as f64,
                Value::Float(v) => f64::from(*v),
                _ => return None,
            })),
            Type::Char => match self {
                Value::Int(v) => u32::try_from(*v).ok().and_then(char::from_u32).map(Value::Char),
                Value::Long(v) => u32::try_from(*v).ok().and_then(char::from_u32).map(Value::Char),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Long(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Char(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value}"),
            Value::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.type_name == b.type_name && Arc::ptr_eq(&a.data, &b.data)
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_follows_the_lattice() {
        assert_eq!(Value::Int(7).convert_to(&Type::Long), Some(Value::Long(7)));
        assert_eq!(
            Value::Int(7).convert_to(&Type::Double),
            Some(Value::Double(7.0))
        );
        assert_eq!(Value::Double(2.9).convert_to(&Type::Int), Some(Value::Int(2)));
        assert_eq!(Value::Bool(true).convert_to(&Type::Int), None);
    }

    #[test]
    fn null_converts_only_into_nullable_types() {
        assert_eq!(Value::Null.convert_to(&Type::Str), Some(Value::Null));
        assert_eq!(Value::Null.convert_to(&Type::Int), None);
    }

    #[test]
    fn char_round_trips_through_code_points() {
        assert_eq!(Value::Char('A').convert_to(&Type::Int), Some(Value::Int(65)));
        assert_eq!(Value::Int(65).convert_to(&Type::Char), Some(Value::Char('A')));
        assert_eq!(Value::Int(-1).convert_to(&Type::Char), None);
    }
}
