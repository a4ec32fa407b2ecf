//! Enum values
//!
//! A closed tagged union of the declared members plus one unknown member. The
//! unknown member cannot be constructed by callers; it only comes out of the
//! decode path for an unrecognized number, or as the enum's default.

use std::fmt;
use std::rc::Rc;

use super::value::Value;
use crate::codegen::hints::UNKNOWN_TAG;
use crate::codegen::spec::EnumSpec;

#[derive(Debug, Clone, PartialEq)]
enum Member {
    Unknown,
    /// Index into `constant_fields`
    Constant(usize),
    /// Index into `value_fields`, with the frozen payload
    Variant(usize, Box<Value>),
}

/// A frozen enum value
#[derive(Clone)]
pub struct EnumValue {
    spec: Rc<EnumSpec>,
    member: Member,
}

/// Narrow, discriminant-exhaustive view of an enum value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnumView<'v> {
    Unknown,
    Constant { kind: &'v str },
    Variant { kind: &'v str, value: &'v Value },
}

impl EnumValue {
    pub(crate) fn unknown(spec: Rc<EnumSpec>) -> Self {
        Self {
            spec,
            member: Member::Unknown,
        }
    }

    pub(crate) fn constant(spec: Rc<EnumSpec>, index: usize) -> Self {
        Self {
            spec,
            member: Member::Constant(index),
        }
    }

    pub(crate) fn variant(spec: Rc<EnumSpec>, index: usize, value: Value) -> Self {
        Self {
            spec,
            member: Member::Variant(index, Box::new(value)),
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// Declared member name, or the unknown tag
    pub fn kind(&self) -> &str {
        match &self.member {
            Member::Unknown => UNKNOWN_TAG,
            Member::Constant(i) => &self.spec.constant_fields[*i].name,
            Member::Variant(i, _) => &self.spec.value_fields[*i].name,
        }
    }

    /// Wire number; the unknown member has none
    pub fn number(&self) -> Option<u32> {
        match &self.member {
            Member::Unknown => None,
            Member::Constant(i) => Some(self.spec.constant_fields[*i].number),
            Member::Variant(i, _) => Some(self.spec.value_fields[*i].number),
        }
    }

    /// Payload of a data variant; absent for constants and the unknown member
    pub fn value(&self) -> Option<&Value> {
        match &self.member {
            Member::Variant(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.member, Member::Unknown)
    }

    pub fn union(&self) -> EnumView<'_> {
        match &self.member {
            Member::Unknown => EnumView::Unknown,
            Member::Constant(_) => EnumView::Constant { kind: self.kind() },
            Member::Variant(_, value) => EnumView::Variant {
                kind: self.kind(),
                value,
            },
        }
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.spec.id == other.spec.id && self.member == other.member
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{}::{}({:?})", self.spec.id, self.kind(), value),
            None => write!(f, "{}::{}", self.spec.id, self.kind()),
        }
    }
}
