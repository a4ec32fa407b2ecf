//! Mutable twins
//!
//! A mutable struct owns one slot per field. A slot holds either a frozen
//! value or a mutable handle; handles are shared (`Rc<RefCell<_>>`) so a
//! promoted field can be mutated through the handle the accessor returned.
//!
//! Fields without a mutable accessor (primitives, enums and recursive
//! positions) only ever hold frozen values: anything assigned there is
//! frozen first, which keeps `to_frozen` well-founded.
//!
//! Every assignment is checked against the field or item type. A list stored
//! at a typed position is bound to that position's item type and key chain.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::enums::EnumValue;
use super::keyed::FrozenArray;
use super::typecheck::{array_parts, check_slot};
use super::value::{field_index, FrozenStruct, Value};
use super::TypeRegistry;
use crate::codegen::spec::{StructSpec, TypeSpec};
use crate::error::{CodegenError, Result};

// =============================================================================
// Slot
// =============================================================================

/// The content of a mutable field or list element
#[derive(Debug, Clone)]
pub enum Slot {
    Frozen(Value),
    Struct(MutableStruct),
    List(MutableList),
}

impl Slot {
    /// Deep freeze; frozen values pass through unchanged
    pub fn freeze(&self) -> Value {
        match self {
            Slot::Frozen(value) => value.clone(),
            Slot::Struct(handle) => Value::Struct(handle.to_frozen()),
            Slot::List(list) => Value::Array(list.to_frozen()),
        }
    }

    pub fn is_mutable(&self) -> bool {
        !matches!(self, Slot::Frozen(_))
    }

    pub fn as_struct(&self) -> Option<&MutableStruct> {
        match self {
            Slot::Struct(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&MutableList> {
        match self {
            Slot::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_frozen(&self) -> Option<&Value> {
        match self {
            Slot::Frozen(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Frozen(value)
    }
}

impl From<FrozenStruct> for Slot {
    fn from(frozen: FrozenStruct) -> Self {
        Slot::Frozen(Value::Struct(frozen))
    }
}

impl From<FrozenArray> for Slot {
    fn from(array: FrozenArray) -> Self {
        Slot::Frozen(Value::Array(array))
    }
}

impl From<EnumValue> for Slot {
    fn from(value: EnumValue) -> Self {
        Slot::Frozen(Value::Enum(value))
    }
}

impl From<MutableStruct> for Slot {
    fn from(handle: MutableStruct) -> Self {
        Slot::Struct(handle)
    }
}

impl From<MutableList> for Slot {
    fn from(list: MutableList) -> Self {
        Slot::List(list)
    }
}

// =============================================================================
// Mutable Struct
// =============================================================================

struct MutableState {
    spec: Rc<StructSpec>,
    slots: Vec<Slot>,
}

/// Handle to a mutable struct; clones share state
#[derive(Clone)]
pub struct MutableStruct(Rc<RefCell<MutableState>>);

impl MutableStruct {
    pub(crate) fn from_frozen(frozen: &FrozenStruct) -> Self {
        let slots = frozen.values().iter().cloned().map(Slot::Frozen).collect();
        Self(Rc::new(RefCell::new(MutableState {
            spec: frozen.spec().clone(),
            slots,
        })))
    }

    pub fn id(&self) -> String {
        self.0.borrow().spec.id.clone()
    }

    /// Current slot content; mutable handles are shared, not copied
    pub fn get(&self, name: &str) -> Result<Slot> {
        let state = self.0.borrow();
        let index = field_index(&state.spec, name)?;
        Ok(state.slots[index].clone())
    }

    /// Assign a field. Fields without a mutable form store the frozen value.
    pub fn set(&self, name: &str, slot: impl Into<Slot>) -> Result<()> {
        let (index, ty, has_getter) = {
            let state = self.0.borrow();
            let index = field_index(&state.spec, name)?;
            let field = &state.spec.fields[index];
            (index, field.ty.clone(), field.has_mutable_getter)
        };
        let mut slot: Slot = slot.into();
        if slot.is_mutable() && !has_getter {
            slot = Slot::Frozen(slot.freeze());
        }
        let slot = check_slot(&ty, slot)?;
        self.0.borrow_mut().slots[index] = slot;
        Ok(())
    }

    /// Mutable-promoting accessor.
    ///
    /// Returns the mutable handle already in the slot, or replaces a frozen
    /// value with a fresh shallow mutable copy and returns that. An absent
    /// optional is promoted from the default of its inner type.
    pub fn mutable_field(&self, registry: &TypeRegistry, name: &str) -> Result<Slot> {
        let (index, ty, current) = {
            let state = self.0.borrow();
            let index = field_index(&state.spec, name)?;
            let field = &state.spec.fields[index];
            if !field.has_mutable_getter {
                return Err(CodegenError::NoMutableAccessor {
                    record: state.spec.id.clone(),
                    field: name.to_string(),
                });
            }
            (index, field.ty.clone(), state.slots[index].clone())
        };

        let promoted = match current {
            Slot::Struct(_) | Slot::List(_) => return Ok(current),
            Slot::Frozen(Value::Struct(s)) => Slot::Struct(s.to_mutable()),
            Slot::Frozen(Value::Array(a)) => match array_parts(&ty) {
                Some((item, _)) => Slot::List(MutableList::from_frozen(&a, item)),
                None => return Err(CodegenError::mismatch("an array", &ty)),
            },
            Slot::Frozen(Value::Null) => promote_absent(registry, &ty)?,
            Slot::Frozen(other) => {
                return Err(CodegenError::mismatch("a struct or an array", other));
            }
        };

        self.0.borrow_mut().slots[index] = promoted.clone();
        Ok(promoted)
    }

    /// Deep freeze
    pub fn to_frozen(&self) -> FrozenStruct {
        let state = self.0.borrow();
        let values = state.slots.iter().map(Slot::freeze).collect();
        FrozenStruct::new(state.spec.clone(), values)
    }

    pub fn ptr_eq(&self, other: &MutableStruct) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

fn promote_absent(registry: &TypeRegistry, ty: &TypeSpec) -> Result<Slot> {
    let TypeSpec::Optional { inner } = ty else {
        return Err(CodegenError::mismatch("an optional", ty));
    };
    match inner.as_ref() {
        TypeSpec::Record { id } => Ok(Slot::Struct(registry.default_struct(id)?.to_mutable())),
        TypeSpec::Array { item, key_chain } => Ok(Slot::List(MutableList::typed(
            item.as_ref().clone(),
            key_chain.clone(),
            Vec::new(),
        ))),
        other => Err(CodegenError::mismatch("an optional struct or array", other)),
    }
}

impl fmt::Debug for MutableStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        let mut out = f.debug_struct(&format!("{}.Mutable", state.spec.id));
        for (field, slot) in state.spec.fields.iter().zip(&state.slots) {
            out.field(&field.name, slot);
        }
        out.finish()
    }
}

// =============================================================================
// Mutable List
// =============================================================================

struct ListState {
    items: Vec<Slot>,
    /// Item type, once the list belongs to a typed position
    item: Option<TypeSpec>,
    key_chain: Option<Vec<String>>,
}

/// Handle to a growable list of slots; clones share state
#[derive(Clone)]
pub struct MutableList(Rc<RefCell<ListState>>);

impl MutableList {
    /// An empty list with no item type yet. Storing it in a field binds it to
    /// the field's item type and key chain.
    pub fn new() -> Self {
        Self::from_state(None, None, Vec::new())
    }

    pub(crate) fn typed(item: TypeSpec, key_chain: Option<Vec<String>>, items: Vec<Slot>) -> Self {
        Self::from_state(Some(item), key_chain, items)
    }

    pub(crate) fn from_frozen(array: &FrozenArray, item: &TypeSpec) -> Self {
        let items = array.iter().cloned().map(Slot::Frozen).collect();
        Self::typed(item.clone(), array.key_chain().map(<[String]>::to_vec), items)
    }

    fn from_state(item: Option<TypeSpec>, key_chain: Option<Vec<String>>, items: Vec<Slot>) -> Self {
        Self(Rc::new(RefCell::new(ListState {
            items,
            item,
            key_chain,
        })))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Slot> {
        self.0.borrow().items.get(i).cloned()
    }

    pub fn key_chain(&self) -> Option<Vec<String>> {
        self.0.borrow().key_chain.clone()
    }

    pub fn push(&self, slot: impl Into<Slot>) -> Result<()> {
        let slot = self.check(slot.into())?;
        self.0.borrow_mut().items.push(slot);
        Ok(())
    }

    /// Replace item `i`; `false` when out of range
    pub fn set(&self, i: usize, slot: impl Into<Slot>) -> Result<bool> {
        if i >= self.len() {
            return Ok(false);
        }
        let slot = self.check(slot.into())?;
        self.0.borrow_mut().items[i] = slot;
        Ok(true)
    }

    fn check(&self, slot: Slot) -> Result<Slot> {
        let item = self.0.borrow().item.clone();
        match item {
            Some(ty) => check_slot(&ty, slot),
            None => Ok(slot),
        }
    }

    /// Adopt the item type and key chain of the position the list is stored
    /// at. Current items are checked first; nothing changes on failure.
    pub(crate) fn bind(&self, item: &TypeSpec, key_chain: Option<Vec<String>>) -> Result<()> {
        let current = self.0.borrow().items.clone();
        let checked = current
            .into_iter()
            .map(|slot| check_slot(item, slot))
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.0.borrow_mut();
        state.items = checked;
        state.item = Some(item.clone());
        state.key_chain = key_chain;
        Ok(())
    }

    /// Deep freeze, keeping the key chain
    pub fn to_frozen(&self) -> FrozenArray {
        let state = self.0.borrow();
        let items = state.items.iter().map(Slot::freeze).collect();
        FrozenArray::new(items, state.key_chain.clone())
    }

    pub fn ptr_eq(&self, other: &MutableList) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for MutableList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MutableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().items.iter()).finish()
    }
}
