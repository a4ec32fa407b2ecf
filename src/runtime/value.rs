//! Frozen values
//!
//! Deeply immutable. Struct fields and array items sit behind `Rc`, so cloning
//! a value never copies a subtree.

use std::fmt;
use std::rc::Rc;

use super::enums::EnumValue;
use super::keyed::FrozenArray;
use super::mutable::MutableStruct;
use crate::codegen::spec::StructSpec;
use crate::error::{CodegenError, Result};

/// A frozen value of any schema type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent optional
    Null,
    Bool(bool),
    /// int32 and int64
    Int(i64),
    Uint(u64),
    /// float32 and float64
    Float(f64),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    String(String),
    Bytes(Vec<u8>),
    Array(FrozenArray),
    Struct(FrozenStruct),
    Enum(EnumValue),
}

impl Value {
    /// An unkeyed array; keys are attached when the value is stored in a field
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(FrozenArray::new(items.into_iter().collect(), None))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_struct(&self) -> Option<&FrozenStruct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&FrozenArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Uint(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<FrozenArray> for Value {
    fn from(a: FrozenArray) -> Self {
        Value::Array(a)
    }
}

impl From<FrozenStruct> for Value {
    fn from(s: FrozenStruct) -> Self {
        Value::Struct(s)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Frozen Struct
// =============================================================================

/// An immutable struct instance; field order follows its descriptor
#[derive(Clone)]
pub struct FrozenStruct {
    spec: Rc<StructSpec>,
    fields: Rc<Vec<Value>>,
}

impl FrozenStruct {
    pub(crate) fn new(spec: Rc<StructSpec>, fields: Vec<Value>) -> Self {
        Self {
            spec,
            fields: Rc::new(fields),
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &Rc<StructSpec> {
        &self.spec
    }

    /// Read a field by declared name
    pub fn get(&self, name: &str) -> Result<&Value> {
        let index = field_index(&self.spec, name)?;
        Ok(&self.fields[index])
    }

    /// `(declared name, value)` pairs in descriptor order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.spec
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.fields.iter())
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.fields
    }

    /// Shallow: every slot starts out holding the current frozen value
    pub fn to_mutable(&self) -> MutableStruct {
        MutableStruct::from_frozen(self)
    }

    pub fn to_frozen(&self) -> FrozenStruct {
        self.clone()
    }

    /// True when both share the same field storage
    pub fn ptr_eq(&self, other: &FrozenStruct) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }
}

impl PartialEq for FrozenStruct {
    fn eq(&self, other: &Self) -> bool {
        self.spec.id == other.spec.id && self.fields == other.fields
    }
}

impl fmt::Debug for FrozenStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(&self.spec.id);
        for (name, value) in self.fields() {
            out.field(name, value);
        }
        out.finish()
    }
}

pub(crate) fn field_index(spec: &StructSpec, name: &str) -> Result<usize> {
    spec.fields
        .iter()
        .position(|f| f.name == name)
        .ok_or_else(|| CodegenError::UnknownField {
            record: spec.id.clone(),
            field: name.to_string(),
        })
}
