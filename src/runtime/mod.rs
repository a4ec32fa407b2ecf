//! Reference Runtime
//!
//! Interprets reflection descriptors the way the `soia` runtime interprets the
//! registration payload of a generated module: struct construction, copy-on-
//! write `replace`, frozen/mutable conversion, keyed lookup and enum values.
//!
//! The registry is built from [`ModuleSpec`]s and is single-threaded; default
//! instances are computed once per record and cached.

pub mod enums;
pub mod keyed;
pub mod mutable;
mod typecheck;
pub mod value;

pub use enums::{EnumValue, EnumView};
pub use keyed::{FrozenArray, KeyValue};
pub use mutable::{MutableList, MutableStruct, Slot};
pub use value::{FrozenStruct, Value};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::codegen::spec::{EnumSpec, ModuleSpec, RecordSpec, StructSpec, TypeSpec};
use crate::error::{CodegenError, Result};
use crate::graph::PrimitiveKind;
use typecheck::coerce;
use value::field_index;

// =============================================================================
// Type Registry
// =============================================================================

/// Every registered record, by identity string
#[derive(Default)]
pub struct TypeRegistry {
    structs: HashMap<String, Rc<StructSpec>>,
    enums: HashMap<String, Rc<EnumSpec>>,
    defaults: RefCell<HashMap<String, FrozenStruct>>,
    in_progress: RefCell<HashSet<String>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_modules(modules: impl IntoIterator<Item = ModuleSpec>) -> Self {
        let mut registry = Self::new();
        for module in modules {
            registry.register(module);
        }
        registry
    }

    pub fn register(&mut self, module: ModuleSpec) {
        debug!(module = %module.path, records = module.records.len(), "Registering module");
        for record in module.records {
            match record {
                RecordSpec::Struct(s) => {
                    self.structs.insert(s.id.clone(), Rc::new(s));
                }
                RecordSpec::Enum(e) => {
                    self.enums.insert(e.id.clone(), Rc::new(e));
                }
            }
        }
    }

    /// Register the JSON payload embedded in a generated module
    pub fn register_json(&mut self, json: &str) -> Result<()> {
        let module: ModuleSpec = serde_json::from_str(json)?;
        self.register(module);
        Ok(())
    }

    pub fn struct_spec(&self, id: &str) -> Result<Rc<StructSpec>> {
        self.structs
            .get(id)
            .cloned()
            .ok_or_else(|| CodegenError::UnresolvedRecord { key: id.to_string() })
    }

    pub fn enum_spec(&self, id: &str) -> Result<Rc<EnumSpec>> {
        self.enums
            .get(id)
            .cloned()
            .ok_or_else(|| CodegenError::UnresolvedRecord { key: id.to_string() })
    }

    // =========================================================================
    // Structs
    // =========================================================================

    /// `Record.whole(...)`: every field must be given
    pub fn whole<'k, S: Into<Slot>>(
        &self,
        id: &str,
        fields: impl IntoIterator<Item = (&'k str, S)>,
    ) -> Result<FrozenStruct> {
        let spec = self.struct_spec(id)?;
        let values = self.collect_fields(&spec, fields)?;
        let mut out = Vec::with_capacity(values.len());
        for (field, value) in spec.fields.iter().zip(values) {
            out.push(value.ok_or_else(|| CodegenError::MissingField {
                record: spec.id.clone(),
                field: field.name.clone(),
            })?);
        }
        Ok(FrozenStruct::new(spec, out))
    }

    /// `Record(...)`: missing fields take their zero value
    pub fn construct<'k, S: Into<Slot>>(
        &self,
        id: &str,
        fields: impl IntoIterator<Item = (&'k str, S)>,
    ) -> Result<FrozenStruct> {
        let spec = self.struct_spec(id)?;
        let values = self.collect_fields(&spec, fields)?;
        let mut out = Vec::with_capacity(values.len());
        for (field, value) in spec.fields.iter().zip(values) {
            out.push(match value {
                Some(value) => value,
                None => self.default_value(&field.ty)?,
            });
        }
        Ok(FrozenStruct::new(spec, out))
    }

    /// Copy-on-write update; fields not given keep their current value
    pub fn replace<'k, S: Into<Slot>>(
        &self,
        target: &FrozenStruct,
        overrides: impl IntoIterator<Item = (&'k str, S)>,
    ) -> Result<FrozenStruct> {
        let spec = target.spec().clone();
        let values = self.collect_fields(&spec, overrides)?;
        let out = values
            .into_iter()
            .zip(target.values())
            .map(|(new, current)| new.unwrap_or_else(|| current.clone()))
            .collect();
        Ok(FrozenStruct::new(spec, out))
    }

    /// The process-lifetime default instance of a struct
    pub fn default_struct(&self, id: &str) -> Result<FrozenStruct> {
        if let Some(cached) = self.defaults.borrow().get(id) {
            return Ok(cached.clone());
        }
        if !self.in_progress.borrow_mut().insert(id.to_string()) {
            return Err(CodegenError::CyclicDefault(id.to_string()));
        }

        let result = self.construct(id, std::iter::empty::<(&str, Value)>());
        self.in_progress.borrow_mut().remove(id);

        let value = result?;
        self.defaults
            .borrow_mut()
            .insert(id.to_string(), value.clone());
        Ok(value)
    }

    /// Zero value of a type
    pub fn default_value(&self, ty: &TypeSpec) -> Result<Value> {
        match ty {
            TypeSpec::Primitive { primitive } => Ok(match primitive {
                PrimitiveKind::Bool => Value::Bool(false),
                PrimitiveKind::Int32 | PrimitiveKind::Int64 => Value::Int(0),
                PrimitiveKind::Uint64 => Value::Uint(0),
                PrimitiveKind::Float32 | PrimitiveKind::Float64 => Value::Float(0.0),
                PrimitiveKind::Timestamp => Value::Timestamp(0),
                PrimitiveKind::String => Value::String(String::new()),
                PrimitiveKind::Bytes => Value::Bytes(Vec::new()),
            }),
            TypeSpec::Array { key_chain, .. } => {
                Ok(Value::Array(FrozenArray::new(Vec::new(), key_chain.clone())))
            }
            TypeSpec::Optional { .. } => Ok(Value::Null),
            TypeSpec::Record { id } => {
                if self.enums.contains_key(id) {
                    Ok(Value::Enum(self.unknown(id)?))
                } else {
                    Ok(Value::Struct(self.default_struct(id)?))
                }
            }
        }
    }

    /// Freeze and type-check each given field; `None` where not given
    fn collect_fields<'k, S: Into<Slot>>(
        &self,
        spec: &StructSpec,
        fields: impl IntoIterator<Item = (&'k str, S)>,
    ) -> Result<Vec<Option<Value>>> {
        let mut values: Vec<Option<Value>> = vec![None; spec.fields.len()];
        for (name, slot) in fields {
            let index = field_index(spec, name)?;
            let slot: Slot = slot.into();
            let frozen = slot.freeze();
            values[index] = Some(coerce(&spec.fields[index].ty, frozen)?);
        }
        Ok(values)
    }

    // =========================================================================
    // Enums
    // =========================================================================

    /// The unknown member, also the enum's default
    pub fn unknown(&self, id: &str) -> Result<EnumValue> {
        Ok(EnumValue::unknown(self.enum_spec(id)?))
    }

    /// A constant member by declared name
    pub fn constant(&self, id: &str, name: &str) -> Result<EnumValue> {
        let spec = self.enum_spec(id)?;
        let index = spec
            .constant_fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| CodegenError::UnknownField {
                record: id.to_string(),
                field: name.to_string(),
            })?;
        Ok(EnumValue::constant(spec, index))
    }

    /// `wrap_<variant>`: tag a payload with a data variant
    pub fn wrap(&self, id: &str, variant: &str, payload: impl Into<Slot>) -> Result<EnumValue> {
        let spec = self.enum_spec(id)?;
        let index = variant_index(&spec, variant)?;
        let payload: Slot = payload.into();
        let value = coerce(&spec.value_fields[index].ty, payload.freeze())?;
        Ok(EnumValue::variant(spec, index, value))
    }

    /// `create_<variant>`: build a struct payload from fields and wrap it
    pub fn create<'k, S: Into<Slot>>(
        &self,
        id: &str,
        variant: &str,
        fields: impl IntoIterator<Item = (&'k str, S)>,
    ) -> Result<EnumValue> {
        let spec = self.enum_spec(id)?;
        let index = variant_index(&spec, variant)?;
        let TypeSpec::Record { id: payload_id } = &spec.value_fields[index].ty else {
            return Err(CodegenError::mismatch("a struct payload", &spec.value_fields[index].ty));
        };
        let payload = self.whole(payload_id, fields)?;
        Ok(EnumValue::variant(spec.clone(), index, Value::Struct(payload)))
    }

    /// Decode path: an unrecognized number yields the unknown member
    pub fn decode_enum(&self, id: &str, number: u32, payload: Option<Value>) -> Result<EnumValue> {
        let spec = self.enum_spec(id)?;
        if let Some(index) = spec.constant_fields.iter().position(|f| f.number == number) {
            return Ok(EnumValue::constant(spec, index));
        }
        if let Some(index) = spec.value_fields.iter().position(|f| f.number == number) {
            let ty = &spec.value_fields[index].ty;
            let value = match payload {
                Some(value) => coerce(ty, value)?,
                None => self.default_value(ty)?,
            };
            return Ok(EnumValue::variant(spec, index, value));
        }
        debug!(record = id, number, "Unrecognized enum number");
        Ok(EnumValue::unknown(spec))
    }
}

fn variant_index(spec: &EnumSpec, variant: &str) -> Result<usize> {
    spec.value_fields
        .iter()
        .position(|f| f.name == variant)
        .ok_or_else(|| CodegenError::UnknownField {
            record: spec.id.clone(),
            field: variant.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::spec::module_spec;
    use crate::codegen::{NameResolver, TypeProjector};
    use crate::graph::{RecordMap, SchemaGraph};

    const SCHEMA: &str = r#"{
        "modules": [{
            "path": "main.soia",
            "records": [
                {"kind": "struct", "name": "Pair", "fields": [
                    {"name": "name", "number": 0, "type": {"kind": "primitive", "primitive": "string"}},
                    {"name": "value", "number": 1, "type": {"kind": "primitive", "primitive": "int32"}}
                ]},
                {"kind": "enum", "name": "Weekday", "fields": [
                    {"name": "MONDAY", "number": 1},
                    {"name": "TUESDAY", "number": 2}
                ]},
                {"kind": "struct", "name": "Day", "fields": [
                    {"name": "weekday", "number": 0, "type": {"kind": "record", "key": "main.soia:Weekday"}},
                    {"name": "label", "number": 1, "type": {"kind": "primitive", "primitive": "string"}}
                ]},
                {"kind": "struct", "name": "Holder", "fields": [
                    {"name": "pair", "number": 0, "type": {"kind": "record", "key": "main.soia:Pair"}},
                    {"name": "maybe", "number": 1, "type": {"kind": "optional", "inner": {"kind": "record", "key": "main.soia:Pair"}}},
                    {"name": "days", "number": 2, "type": {"kind": "array",
                        "item": {"kind": "record", "key": "main.soia:Day"}, "key": ["weekday"]}},
                    {"name": "count", "number": 3, "type": {"kind": "primitive", "primitive": "uint64"}}
                ]},
                {"kind": "struct", "name": "Tree", "fields": [
                    {"name": "children", "number": 0, "recursive": true,
                     "type": {"kind": "array", "item": {"kind": "record", "key": "main.soia:Tree"}}}
                ]},
                {"kind": "enum", "name": "Shape", "fields": [
                    {"name": "EMPTY", "number": 1},
                    {"name": "pair", "number": 2, "type": {"kind": "record", "key": "main.soia:Pair"}},
                    {"name": "label", "number": 3, "type": {"kind": "primitive", "primitive": "string"}}
                ]},
                {"kind": "struct", "name": "Loop", "fields": [
                    {"name": "again", "number": 0, "recursive": true, "type": {"kind": "record", "key": "main.soia:Loop"}}
                ]},
                {"kind": "struct", "name": "Reading", "fields": [
                    {"name": "serial", "number": 0, "type": {"kind": "primitive", "primitive": "uint64"}},
                    {"name": "at", "number": 1, "type": {"kind": "primitive", "primitive": "timestamp"}}
                ]},
                {"kind": "struct", "name": "Log", "fields": [
                    {"name": "by_serial", "number": 0, "type": {"kind": "array",
                        "item": {"kind": "record", "key": "main.soia:Reading"}, "key": ["serial"]}},
                    {"name": "by_time", "number": 1, "type": {"kind": "array",
                        "item": {"kind": "record", "key": "main.soia:Reading"}, "key": ["at"]}}
                ]}
            ]
        }]
    }"#;

    fn registry() -> TypeRegistry {
        let graph = SchemaGraph::from_json_str(SCHEMA).unwrap();
        let records = RecordMap::build(&graph);
        let projector = TypeProjector::new(&records, NameResolver::new("main.soia"));
        TypeRegistry::from_modules([module_spec(&projector, &graph.modules[0]).unwrap()])
    }

    fn pair(r: &TypeRegistry, name: &str, value: i32) -> FrozenStruct {
        r.whole(
            "main.soia:Pair",
            [("name", Value::from(name)), ("value", Value::from(value))],
        )
        .unwrap()
    }

    fn day(r: &TypeRegistry, weekday: &str, label: &str) -> FrozenStruct {
        r.whole(
            "main.soia:Day",
            [
                ("weekday", Value::Enum(r.constant("main.soia:Weekday", weekday).unwrap())),
                ("label", Value::from(label)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_replace_updates_one_field() {
        let r = registry();
        let original = pair(&r, "a", 1);
        let replaced = r.replace(&original, [("value", Value::from(2))]).unwrap();

        assert_eq!(replaced, pair(&r, "a", 2));
        assert_eq!(replaced.get("name").unwrap(), &Value::from("a"));
        assert_eq!(original.get("value").unwrap(), &Value::from(1));
    }

    #[test]
    fn test_whole_construction_requires_every_field() {
        let r = registry();
        let err = r.whole("main.soia:Pair", [("name", Value::from("a"))]).unwrap_err();
        assert!(matches!(err, CodegenError::MissingField { .. }));

        let err = r.whole("main.soia:Pair", [("nope", Value::from(1))]).unwrap_err();
        assert!(matches!(err, CodegenError::UnknownField { .. }));

        let err = r
            .whole("main.soia:Pair", [("name", Value::from(1)), ("value", Value::from(1))])
            .unwrap_err();
        assert!(matches!(err, CodegenError::ValueMismatch { .. }));
    }

    #[test]
    fn test_construct_uses_defaults() {
        let r = registry();
        let holder = r.construct("main.soia:Holder", std::iter::empty::<(&str, Value)>()).unwrap();
        assert_eq!(holder.get("pair").unwrap(), &Value::Struct(pair(&r, "", 0)));
        assert!(holder.get("maybe").unwrap().is_null());
        assert_eq!(holder.get("count").unwrap(), &Value::Uint(0));
        assert!(holder.get("days").unwrap().as_array().unwrap().is_empty());

        let day = r.default_struct("main.soia:Day").unwrap();
        assert!(day.get("weekday").unwrap().as_enum().unwrap().is_unknown());
    }

    #[test]
    fn test_default_is_a_singleton() {
        let r = registry();
        let a = r.default_struct("main.soia:Pair").unwrap();
        let b = r.default_struct("main.soia:Pair").unwrap();
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_cyclic_default_is_reported() {
        let r = registry();
        let err = r.default_struct("main.soia:Loop").unwrap_err();
        assert!(matches!(err, CodegenError::CyclicDefault(_)));
    }

    #[test]
    fn test_mutable_round_trip() {
        let r = registry();
        let holder = r
            .construct(
                "main.soia:Holder",
                [("pair", Value::Struct(pair(&r, "x", 5))), ("count", Value::from(3))],
            )
            .unwrap();
        let mutable = holder.to_mutable();
        assert_eq!(mutable.to_frozen(), holder);
        assert_eq!(holder.to_frozen(), holder);
    }

    #[test]
    fn test_mutable_promotion_is_idempotent() {
        let r = registry();
        let holder = r.default_struct("main.soia:Holder").unwrap();
        let mutable = holder.to_mutable();

        let first = mutable.mutable_field(&r, "pair").unwrap();
        let second = mutable.mutable_field(&r, "pair").unwrap();
        assert!(first.as_struct().unwrap().ptr_eq(second.as_struct().unwrap()));

        first.as_struct().unwrap().set("value", Value::from(9)).unwrap();
        let frozen = mutable.to_frozen();
        let inner = frozen.get("pair").unwrap().as_struct().unwrap();
        assert_eq!(inner.get("value").unwrap(), &Value::from(9));

        // Reassigning a frozen value ends the old promotion
        mutable.set("pair", pair(&r, "y", 1)).unwrap();
        let third = mutable.mutable_field(&r, "pair").unwrap();
        assert!(!third.as_struct().unwrap().ptr_eq(first.as_struct().unwrap()));
    }

    #[test]
    fn test_absent_optional_promotes_to_default() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        let promoted = mutable.mutable_field(&r, "maybe").unwrap();
        assert_eq!(promoted.as_struct().unwrap().to_frozen(), pair(&r, "", 0));
    }

    #[test]
    fn test_no_accessor_for_primitives_and_recursive_fields() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        assert!(matches!(
            mutable.mutable_field(&r, "count"),
            Err(CodegenError::NoMutableAccessor { .. })
        ));

        let tree = r.default_struct("main.soia:Tree").unwrap().to_mutable();
        assert!(tree.mutable_field(&r, "children").is_err());

        // A mutable value assigned at a recursive position is frozen on entry
        let list = MutableList::new();
        tree.set("children", list).unwrap();
        assert!(!tree.get("children").unwrap().is_mutable());

        // Still type checked once frozen
        let wrong = MutableList::new();
        wrong.push(Value::from(1)).unwrap();
        assert!(matches!(
            tree.set("children", wrong),
            Err(CodegenError::ValueMismatch { .. })
        ));
    }

    #[test]
    fn test_keyed_find() {
        let r = registry();
        let monday = r.constant("main.soia:Weekday", "MONDAY").unwrap();
        let tuesday = r.constant("main.soia:Weekday", "TUESDAY").unwrap();
        let day = |w: &EnumValue, label: &str| {
            Value::Struct(
                r.whole(
                    "main.soia:Day",
                    [("weekday", Value::Enum(w.clone())), ("label", Value::from(label))],
                )
                .unwrap(),
            )
        };
        let holder = r
            .construct(
                "main.soia:Holder",
                [(
                    "days",
                    Value::array([day(&monday, "first"), day(&tuesday, "second"), day(&monday, "third")]),
                )],
            )
            .unwrap();

        let days = holder.get("days").unwrap().as_array().unwrap();
        assert!(!days.is_indexed());
        let found = days.find("TUESDAY").unwrap().unwrap();
        assert!(days.is_indexed());
        assert_eq!(found.as_struct().unwrap().get("label").unwrap(), &Value::from("second"));

        // Last element wins on duplicate keys
        let monday_day = days.find("MONDAY").unwrap().unwrap();
        assert_eq!(monday_day.as_struct().unwrap().get("label").unwrap(), &Value::from("third"));

        assert_eq!(days.find("WEDNESDAY").unwrap(), None);
    }

    #[test]
    fn test_keyed_list_keeps_key_after_freeze() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        let days = mutable.mutable_field(&r, "days").unwrap();
        let day = r
            .whole(
                "main.soia:Day",
                [
                    ("weekday", Value::Enum(r.constant("main.soia:Weekday", "TUESDAY").unwrap())),
                    ("label", Value::from("t")),
                ],
            )
            .unwrap();
        days.as_list().unwrap().push(day.clone()).unwrap();

        let frozen = mutable.to_frozen();
        let found = frozen.get("days").unwrap().as_array().unwrap().find("TUESDAY").unwrap();
        assert_eq!(found, Some(&Value::Struct(day)));
    }

    #[test]
    fn test_enum_wrap_and_kind() {
        let r = registry();
        let label = r.wrap("main.soia:Shape", "label", Value::from("hi")).unwrap();
        assert_eq!(label.kind(), "label");
        assert_eq!(label.value(), Some(&Value::from("hi")));
        assert_eq!(label.number(), Some(3));

        let created = r
            .create(
                "main.soia:Shape",
                "pair",
                [("name", Value::from("a")), ("value", Value::from(1))],
            )
            .unwrap();
        assert_eq!(created, r.wrap("main.soia:Shape", "pair", pair(&r, "a", 1)).unwrap());

        let empty = r.constant("main.soia:Shape", "EMPTY").unwrap();
        assert_eq!(empty.kind(), "EMPTY");
        assert_eq!(empty.value(), None);

        let err = r.wrap("main.soia:Shape", "label", Value::from(3)).unwrap_err();
        assert!(matches!(err, CodegenError::ValueMismatch { .. }));
    }

    #[test]
    fn test_unknown_member() {
        let r = registry();
        let unknown = r.unknown("main.soia:Shape").unwrap();
        assert_eq!(unknown.kind(), "?");
        assert_eq!(unknown.value(), None);
        assert_eq!(unknown.union(), EnumView::Unknown);

        let decoded = r.decode_enum("main.soia:Shape", 42, None).unwrap();
        assert!(decoded.is_unknown());
        assert_eq!(decoded, unknown);

        let known = r.decode_enum("main.soia:Shape", 3, Some(Value::from("x"))).unwrap();
        assert_eq!(known.kind(), "label");
    }

    #[test]
    fn test_enum_view_is_exhaustive() {
        let r = registry();
        let values = [
            r.unknown("main.soia:Shape").unwrap(),
            r.constant("main.soia:Shape", "EMPTY").unwrap(),
            r.wrap("main.soia:Shape", "label", Value::from("hi")).unwrap(),
        ];
        let described: Vec<String> = values
            .iter()
            .map(|v| match v.union() {
                EnumView::Unknown => "unknown".to_string(),
                EnumView::Constant { kind } => format!("constant {}", kind),
                EnumView::Variant { kind, value } => format!("{} = {:?}", kind, value),
            })
            .collect();
        assert_eq!(described, vec!["unknown", "constant EMPTY", "label = String(\"hi\")"]);
    }

    #[test]
    fn test_member_kinds_are_distinct() {
        let r = registry();
        let spec = r.enum_spec("main.soia:Shape").unwrap();
        let mut kinds: Vec<&str> = spec
            .constant_fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(spec.value_fields.iter().map(|f| f.name.as_str()))
            .collect();
        kinds.push("?");
        let unique: HashSet<&str> = kinds.iter().copied().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn test_set_array_into_keyed_field_attaches_key() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        let tuesday = day(&r, "TUESDAY", "t");
        mutable.set("days", Value::array([Value::Struct(tuesday.clone())])).unwrap();

        let frozen = mutable.to_frozen();
        let days = frozen.get("days").unwrap().as_array().unwrap();
        assert_eq!(days.find("TUESDAY").unwrap(), Some(&Value::Struct(tuesday)));
    }

    #[test]
    fn test_set_untyped_list_into_keyed_field() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        let list = MutableList::new();
        list.push(day(&r, "MONDAY", "m")).unwrap();
        mutable.set("days", list.clone()).unwrap();

        // The stored handle is the caller's list, now keyed and typed
        assert!(mutable.get("days").unwrap().as_list().unwrap().ptr_eq(&list));
        assert_eq!(list.key_chain(), Some(vec!["weekday".to_string()]));
        assert!(matches!(
            list.push(pair(&r, "a", 1)),
            Err(CodegenError::ValueMismatch { .. })
        ));
        assert_eq!(list.len(), 1);

        list.push(day(&r, "TUESDAY", "t")).unwrap();
        let frozen = mutable.to_frozen();
        let days = frozen.get("days").unwrap().as_array().unwrap();
        let found = days.find("TUESDAY").unwrap().unwrap();
        assert_eq!(found.as_struct().unwrap().get("label").unwrap(), &Value::from("t"));
    }

    #[test]
    fn test_set_rejects_wrong_types() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        let before = mutable.to_frozen();

        assert!(matches!(
            mutable.set("count", Value::from("not an int")),
            Err(CodegenError::ValueMismatch { .. })
        ));
        assert!(matches!(
            mutable.set("days", Value::from(7)),
            Err(CodegenError::ValueMismatch { .. })
        ));
        assert!(matches!(
            mutable.set("pair", r.default_struct("main.soia:Day").unwrap().to_mutable()),
            Err(CodegenError::ValueMismatch { .. })
        ));

        // A list whose items do not fit is rejected and left untyped
        let wrong = MutableList::new();
        wrong.push(Value::from(1)).unwrap();
        assert!(mutable.set("days", wrong.clone()).is_err());
        assert_eq!(wrong.key_chain(), None);

        assert_eq!(mutable.to_frozen(), before);
        mutable.set("count", Value::from(7)).unwrap();
        assert_eq!(mutable.get("count").unwrap().as_frozen(), Some(&Value::Uint(7)));
    }

    #[test]
    fn test_promoted_list_checks_push_and_set() {
        let r = registry();
        let mutable = r.default_struct("main.soia:Holder").unwrap().to_mutable();
        let days = mutable.mutable_field(&r, "days").unwrap();
        let days = days.as_list().unwrap();

        assert!(days.push(Value::from("monday")).is_err());
        days.push(day(&r, "MONDAY", "m")).unwrap();
        assert!(days.set(0, Value::from(3)).is_err());
        assert!(days.set(0, day(&r, "MONDAY", "m2")).unwrap());
        assert!(!days.set(5, day(&r, "MONDAY", "x")).unwrap());

        // A mutable struct of the item type is accepted as is
        let handle = day(&r, "TUESDAY", "t").to_mutable();
        days.push(handle.clone()).unwrap();
        handle.set("label", Value::from("t2")).unwrap();

        let frozen = days.to_frozen();
        let tuesday = frozen.find("TUESDAY").unwrap().unwrap().as_struct().unwrap();
        assert_eq!(tuesday.get("label").unwrap(), &Value::from("t2"));
        assert_eq!(frozen.len(), 2);
    }

    #[test]
    fn test_uint64_and_timestamp_keys() {
        let r = registry();
        let reading = |serial: u64, at: i64| {
            Value::Struct(
                r.whole(
                    "main.soia:Reading",
                    [("serial", Value::Uint(serial)), ("at", Value::Timestamp(at))],
                )
                .unwrap(),
            )
        };
        let readings = Value::array([reading(5, 1_000), reading(u64::MAX, -2_000)]);
        let log = r
            .construct(
                "main.soia:Log",
                [("by_serial", readings.clone()), ("by_time", readings)],
            )
            .unwrap();

        let by_serial = log.get("by_serial").unwrap().as_array().unwrap();
        assert!(by_serial.find(5).unwrap().is_some());
        assert!(by_serial.find(5_u64).unwrap().is_some());
        assert!(by_serial.find(5_i64).unwrap().is_some());
        assert!(by_serial.find(u64::MAX).unwrap().is_some());
        assert_eq!(by_serial.find(-5).unwrap(), None);

        let by_time = log.get("by_time").unwrap().as_array().unwrap();
        let found = by_time.find(-2_000_i64).unwrap().unwrap();
        assert_eq!(found.as_struct().unwrap().get("serial").unwrap(), &Value::Uint(u64::MAX));
        assert_eq!(by_time.find(1_000).unwrap(), Some(&reading(5, 1_000)));
    }
}
