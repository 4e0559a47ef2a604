//! Runtime values passed through member invocations
//!
//! Domain instances are carried as [`ManagedObject`]s: a class name plus a
//! shared, type-erased payload. Member handles downcast the payload back to
//! the concrete domain type they were written for.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A domain instance together with the name of its class
#[derive(Clone)]
pub struct ManagedObject {
    class_name: Arc<str>,
    pojo: Arc<dyn Any + Send + Sync>,
}

impl ManagedObject {
    /// Wrap a domain value
    pub fn new<T: Any + Send + Sync>(class_name: &str, pojo: T) -> Self {
        Self {
            class_name: Arc::from(class_name),
            pojo: Arc::new(pojo),
        }
    }

    /// Wrap an already shared domain value
    pub fn from_arc(class_name: &str, pojo: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            class_name: Arc::from(class_name),
            pojo,
        }
    }

    /// Name of the instance's class
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Borrow the payload as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.pojo.downcast_ref::<T>()
    }

    /// Whether both handles point at the same instance
    pub fn same_instance(&self, other: &ManagedObject) -> bool {
        Arc::ptr_eq(&self.pojo, &other.pojo)
    }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("class", &self.class_name)
            .finish()
    }
}

impl PartialEq for ManagedObject {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

/// A value passed to or returned from a member
///
/// `Empty` is the result of a method with no return value; it is distinct
/// from `Null`, which is an absent argument or property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (void result)
    #[default]
    Empty,
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
    /// Domain object
    Object(ManagedObject),
    /// Collection of values
    List(Vec<Value>),
}

impl Value {
    /// Text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Whether this is the void result
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Whether this is an absent value (null or void)
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Empty)
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float payload (integers widen)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Domain object payload
    pub fn as_object(&self) -> Option<&ManagedObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Collection payload
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ManagedObject> for Value {
    fn from(obj: ManagedObject) -> Self {
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Customer {
        name: String,
    }

    #[test]
    fn test_managed_object_downcast() {
        let obj = ManagedObject::new(
            "Customer",
            Customer {
                name: "Ada".to_string(),
            },
        );
        assert_eq!(obj.class_name(), "Customer");
        assert_eq!(obj.downcast_ref::<Customer>().map(|c| c.name.as_str()), Some("Ada"));
        assert!(obj.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_managed_object_identity_equality() {
        let a = ManagedObject::new("Customer", 1_i64);
        let b = a.clone();
        let c = ManagedObject::new("Customer", 1_i64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_is_distinct_from_null() {
        assert!(Value::Empty.is_empty());
        assert!(!Value::Null.is_empty());
        assert!(Value::Null.is_null());
        assert_eq!(Value::default(), Value::Empty);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(3_i64).as_int(), Some(3));
        assert_eq!(Value::from(3_i64).as_float(), Some(3.0));
        assert_eq!(Value::from("x").as_text(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::List(vec![Value::Null]).as_list().map(|l| l.len()), Some(1));
    }
}
