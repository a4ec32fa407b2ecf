//! Frozen arrays and keyed lookup
//!
//! A keyed array indexes its items by the value found at the end of its key
//! chain. The index is built on the first `find` and shared by every clone of
//! the array. On a duplicate key the last item wins.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::Value;
use crate::error::{CodegenError, Result};

/// A hashable lookup key; enum keys compare by their `kind`.
///
/// Integers of every width and timestamps share one numeric domain, so a
/// `uint64` key of 5 is found by `5`, `5i64` or `5u64`. Floats are
/// normalized: `-0.0` equals `0.0` and every NaN is the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Bool(bool),
    Int(i128),
    /// Bit pattern of the normalized float
    Float(u64),
    String(String),
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// Key form of a frozen value, if it has one
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int(i) => Some(Self::from(*i)),
            Value::Uint(u) => Some(Self::from(*u)),
            Value::Float(f) => Some(Self::from(*f)),
            Value::Timestamp(t) => Some(Self::from(*t)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Bytes(b) => Some(Self::Bytes(b.clone())),
            Value::Enum(e) => Some(Self::String(e.kind().to_string())),
            Value::Null | Value::Array(_) | Value::Struct(_) => None,
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for KeyValue {
    fn from(i: i32) -> Self {
        Self::Int(i128::from(i))
    }
}

impl From<i64> for KeyValue {
    fn from(i: i64) -> Self {
        Self::Int(i128::from(i))
    }
}

impl From<u64> for KeyValue {
    fn from(u: u64) -> Self {
        Self::Int(i128::from(u))
    }
}

impl From<f64> for KeyValue {
    fn from(f: f64) -> Self {
        let normalized = if f == 0.0 {
            0.0
        } else if f.is_nan() {
            f64::NAN
        } else {
            f
        };
        Self::Float(normalized.to_bits())
    }
}

impl From<bool> for KeyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An immutable, optionally keyed, sequence
#[derive(Clone)]
pub struct FrozenArray {
    items: Rc<[Value]>,
    key_chain: Option<Rc<[String]>>,
    index: Rc<OnceCell<HashMap<KeyValue, usize>>>,
}

impl FrozenArray {
    pub fn new(items: Vec<Value>, key_chain: Option<Vec<String>>) -> Self {
        Self {
            items: items.into(),
            key_chain: key_chain.map(Into::into),
            index: Rc::new(OnceCell::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Value> {
        self.items.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn key_chain(&self) -> Option<&[String]> {
        self.key_chain.as_deref()
    }

    /// Whether the lookup index has been built yet
    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    /// Item whose key equals `key`; `None` is the default-element marker
    pub fn find(&self, key: impl Into<KeyValue>) -> Result<Option<&Value>> {
        let chain = self.key_chain.as_deref().ok_or(CodegenError::NotKeyed)?;
        let index = self.index.get_or_init(|| self.build_index(chain));
        Ok(index.get(&key.into()).map(|&i| &self.items[i]))
    }

    fn build_index(&self, chain: &[String]) -> HashMap<KeyValue, usize> {
        let mut index = HashMap::with_capacity(self.items.len());
        for (i, item) in self.items.iter().enumerate() {
            if let Some(key) = extract_key(item, chain) {
                index.insert(key, i);
            }
        }
        index
    }
}

/// Walk `chain` through struct fields and take the key form of the result
pub fn extract_key(item: &Value, chain: &[String]) -> Option<KeyValue> {
    let mut current = item;
    for name in chain {
        current = current.as_struct()?.get(name).ok()?;
    }
    KeyValue::of(current)
}

impl PartialEq for FrozenArray {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items && self.key_chain == other.key_chain
    }
}

impl fmt::Debug for FrozenArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unkeyed_find_fails() {
        let array = FrozenArray::new(vec![Value::from(1)], None);
        assert!(matches!(array.find(1), Err(CodegenError::NotKeyed)));
    }

    #[test]
    fn test_key_of_value() {
        assert_eq!(KeyValue::of(&Value::from("a")), Some(KeyValue::from("a")));
        assert_eq!(KeyValue::of(&Value::Null), None);
        assert_eq!(KeyValue::of(&Value::from(3)), Some(KeyValue::Int(3)));
    }

    #[test]
    fn test_integer_widths_share_keys() {
        assert_eq!(KeyValue::of(&Value::Uint(5)), Some(KeyValue::from(5)));
        assert_eq!(KeyValue::from(5_u64), KeyValue::from(5_i64));
        assert_eq!(KeyValue::of(&Value::Timestamp(-7)), Some(KeyValue::from(-7)));
        assert_ne!(KeyValue::from(u64::MAX), KeyValue::from(-1));

        let array = FrozenArray::new(vec![Value::Uint(5), Value::Uint(u64::MAX)], Some(vec![]));
        assert_eq!(array.find(5).unwrap(), Some(&Value::Uint(5)));
        assert_eq!(array.find(u64::MAX).unwrap(), Some(&Value::Uint(u64::MAX)));
    }

    #[test]
    fn test_float_keys_are_normalized() {
        assert_eq!(KeyValue::from(-0.0), KeyValue::from(0.0));
        assert_eq!(KeyValue::from(f64::NAN), KeyValue::from(-f64::NAN));
        assert_ne!(KeyValue::from(1.0), KeyValue::from(-1.0));

        let array = FrozenArray::new(vec![Value::from(-0.0), Value::from(2.5)], Some(vec![]));
        assert_eq!(array.find(0.0).unwrap(), Some(&Value::Float(-0.0)));
        assert_eq!(array.find(2.5).unwrap(), Some(&Value::from(2.5)));
    }

    #[test]
    fn test_clones_share_index() {
        // An empty chain keys items by themselves
        let array = FrozenArray::new(
            vec![Value::from("x"), Value::from("y"), Value::from("x")],
            Some(vec![]),
        );
        let copy = array.clone();
        assert!(!copy.is_indexed());
        assert_eq!(array.find("y").unwrap(), Some(&Value::from("y")));
        assert!(copy.is_indexed());
        assert_eq!(copy.find("z").unwrap(), None);
    }
}
