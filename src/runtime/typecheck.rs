//! Type Checking
//!
//! Checks values and mutable slots against descriptor types before they are
//! stored. An array is always re-tagged with the key chain of the position it
//! lands in, so a keyed field never holds an unkeyed array.

use super::keyed::FrozenArray;
use super::mutable::Slot;
use super::value::Value;
use crate::codegen::spec::TypeSpec;
use crate::error::{CodegenError, Result};
use crate::graph::PrimitiveKind;

/// Check `value` against `ty`, attaching key chains to arrays
pub(crate) fn coerce(ty: &TypeSpec, value: Value) -> Result<Value> {
    match (ty, value) {
        (TypeSpec::Primitive { primitive }, value) => coerce_primitive(*primitive, value),
        (TypeSpec::Optional { .. }, Value::Null) => Ok(Value::Null),
        (TypeSpec::Optional { inner }, value) => coerce(inner, value),
        (TypeSpec::Array { item, key_chain }, Value::Array(array)) => {
            let items = array
                .iter()
                .map(|v| coerce(item, v.clone()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(FrozenArray::new(items, key_chain.clone())))
        }
        (TypeSpec::Record { id }, Value::Struct(s)) if s.id() == id.as_str() => Ok(Value::Struct(s)),
        (TypeSpec::Record { id }, Value::Enum(e)) if e.id() == id.as_str() => Ok(Value::Enum(e)),
        (ty, value) => Err(CodegenError::mismatch(describe(ty), value)),
    }
}

/// Check a mutable-side slot against `ty`.
///
/// A mutable list is bound to the item type and key chain of `ty`; from then
/// on every `push`/`set` on it is checked too.
pub(crate) fn check_slot(ty: &TypeSpec, slot: Slot) -> Result<Slot> {
    match slot {
        Slot::Frozen(value) => Ok(Slot::Frozen(coerce(ty, value)?)),
        Slot::Struct(handle) => match without_optional(ty) {
            TypeSpec::Record { id } if handle.id() == *id => Ok(Slot::Struct(handle)),
            other => Err(CodegenError::mismatch(describe(other), handle)),
        },
        Slot::List(list) => match without_optional(ty) {
            TypeSpec::Array { item, key_chain } => {
                list.bind(item, key_chain.clone())?;
                Ok(Slot::List(list))
            }
            other => Err(CodegenError::mismatch(describe(other), list)),
        },
    }
}

/// Item type and key chain of an array position, looking through `Optional`
pub(crate) fn array_parts(ty: &TypeSpec) -> Option<(&TypeSpec, Option<&Vec<String>>)> {
    match without_optional(ty) {
        TypeSpec::Array { item, key_chain } => Some((item, key_chain.as_ref())),
        _ => None,
    }
}

fn without_optional(ty: &TypeSpec) -> &TypeSpec {
    match ty {
        TypeSpec::Optional { inner } => without_optional(inner),
        other => other,
    }
}

fn coerce_primitive(kind: PrimitiveKind, value: Value) -> Result<Value> {
    match (kind, value) {
        (PrimitiveKind::Bool, v @ Value::Bool(_)) => Ok(v),
        (PrimitiveKind::Int32, Value::Int(i)) if i32::try_from(i).is_ok() => Ok(Value::Int(i)),
        (PrimitiveKind::Int64, v @ Value::Int(_)) => Ok(v),
        (PrimitiveKind::Uint64, v @ Value::Uint(_)) => Ok(v),
        (PrimitiveKind::Uint64, Value::Int(i)) if i >= 0 => Ok(Value::Uint(i as u64)),
        (PrimitiveKind::Float32 | PrimitiveKind::Float64, v @ Value::Float(_)) => Ok(v),
        (PrimitiveKind::Float32 | PrimitiveKind::Float64, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (PrimitiveKind::Timestamp, v @ Value::Timestamp(_)) => Ok(v),
        (PrimitiveKind::String, v @ Value::String(_)) => Ok(v),
        (PrimitiveKind::Bytes, v @ Value::Bytes(_)) => Ok(v),
        (kind, value) => Err(CodegenError::mismatch(kind.as_str(), value)),
    }
}

fn describe(ty: &TypeSpec) -> String {
    match ty {
        TypeSpec::Primitive { primitive } => primitive.to_string(),
        TypeSpec::Array { .. } => "array".to_string(),
        TypeSpec::Optional { .. } => "optional".to_string(),
        TypeSpec::Record { id } => id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings() -> TypeSpec {
        TypeSpec::Primitive {
            primitive: PrimitiveKind::String,
        }
    }

    #[test]
    fn test_array_takes_key_chain_of_position() {
        let ty = TypeSpec::Array {
            item: Box::new(strings()),
            key_chain: Some(vec![]),
        };
        let stored = coerce(&ty, Value::array([Value::from("a")])).unwrap();
        let array = stored.as_array().unwrap();
        assert_eq!(array.key_chain(), Some(&[][..]));
        assert_eq!(array.find("a").unwrap(), Some(&Value::from("a")));
    }

    #[test]
    fn test_primitive_mismatch() {
        assert!(coerce(&strings(), Value::from(1)).is_err());
        let uint = TypeSpec::Primitive {
            primitive: PrimitiveKind::Uint64,
        };
        assert_eq!(coerce(&uint, Value::from(4)).unwrap(), Value::Uint(4));
        assert!(coerce(&uint, Value::from(-4)).is_err());
    }

    #[test]
    fn test_array_parts_look_through_optional() {
        let ty = TypeSpec::Optional {
            inner: Box::new(TypeSpec::Array {
                item: Box::new(strings()),
                key_chain: None,
            }),
        };
        let (item, chain) = array_parts(&ty).unwrap();
        assert_eq!(item, &strings());
        assert_eq!(chain, None);
        assert!(array_parts(&strings()).is_none());
    }
}
