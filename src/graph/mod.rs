//! Resolved Schema Graph
//!
//! The input of the backend: modules holding struct/enum records, their typed
//! fields, methods and constants, as produced by the upstream frontend.
//!
//! The graph and the [`RecordMap`] built from it are immutable for the whole
//! run. Every resolution and projection call borrows the map explicitly; there
//! is no process-wide registry.

pub mod analysis;

pub use analysis::{validate_recursion_markers, RecursionAnalysis};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{CodegenError, Result};

// =============================================================================
// Type Expressions
// =============================================================================

/// Primitive kinds of the schema language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    Int32,
    Int64,
    Uint64,
    Float32,
    Float64,
    Timestamp,
    String,
    Bytes,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        Self::Bool,
        Self::Int32,
        Self::Int64,
        Self::Uint64,
        Self::Float32,
        Self::Float64,
        Self::Timestamp,
        Self::String,
        Self::Bytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Timestamp => "timestamp",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a record: `<module-path>:<Outer.Inner>` built from
/// declared (never escaped) names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub String);

impl RecordKey {
    pub fn new(module_path: &str, declared_names: &[&str]) -> Self {
        Self(format!("{}:{}", module_path, declared_names.join(".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed type algebra: exactly four kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    Primitive {
        primitive: PrimitiveKind,
    },
    Array {
        item: Box<TypeExpr>,
        /// Field names walked from the item to its lookup key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<Vec<String>>,
    },
    Optional {
        inner: Box<TypeExpr>,
    },
    Record {
        key: RecordKey,
    },
}

impl TypeExpr {
    pub fn primitive(primitive: PrimitiveKind) -> Self {
        Self::Primitive { primitive }
    }

    pub fn array(item: TypeExpr) -> Self {
        Self::Array {
            item: Box::new(item),
            key: None,
        }
    }

    pub fn keyed_array(item: TypeExpr, key: &[&str]) -> Self {
        Self::Array {
            item: Box::new(item),
            key: Some(key.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn optional(inner: TypeExpr) -> Self {
        Self::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn record(key: impl Into<String>) -> Self {
        Self::Record {
            key: RecordKey(key.into()),
        }
    }

    /// Short name of the kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive { .. } => "primitive",
            Self::Array { .. } => "array",
            Self::Optional { .. } => "optional",
            Self::Record { .. } => "record",
        }
    }

    /// Every record key mentioned anywhere inside this type
    pub fn record_refs(&self) -> Vec<&RecordKey> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a RecordKey>) {
        match self {
            Self::Primitive { .. } => {}
            Self::Array { item, .. } => item.collect_refs(out),
            Self::Optional { inner } => inner.collect_refs(out),
            Self::Record { key } => out.push(key),
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// Struct or enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Struct,
    Enum,
}

/// A struct field or an enum member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Wire number, independent of declaration order and name
    pub number: u32,
    /// Absent for enum constant members
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeExpr>,
    /// The type closes a cycle back to an enclosing record
    #[serde(default)]
    pub recursive: bool,
}

/// A struct or enum declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Records declared inside this one
    #[serde(default)]
    pub nested: Vec<Record>,
    /// Retired field numbers, kept for wire compatibility
    #[serde(default)]
    pub removed_numbers: Vec<u32>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_struct(&self) -> bool {
        self.kind == RecordKind::Struct
    }
}

/// A remote method declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub number: u32,
    pub request: TypeExpr,
    pub response: TypeExpr,
}

/// A constant declaration; the value is already in dense JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    pub value: serde_json::Value,
}

/// One schema module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// e.g. `geometry/shapes.soia`
    pub path: String,
    /// Paths of the modules this one imports
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub constants: Vec<Constant>,
}

/// The complete resolved input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaGraph {
    pub modules: Vec<Module>,
}

impl SchemaGraph {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn module(&self, path: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.path == path)
    }
}

// =============================================================================
// Record Map
// =============================================================================

/// Where a record lives: its module and the chain of records enclosing it
#[derive(Debug, Clone)]
pub struct RecordLocation<'a> {
    pub key: RecordKey,
    pub record: &'a Record,
    pub module_path: &'a str,
    /// Outermost first, ending with `record` itself
    pub ancestors: Vec<&'a Record>,
}

impl<'a> RecordLocation<'a> {
    /// Declared names from the outermost ancestor down to this record
    pub fn declared_names(&self) -> Vec<&'a str> {
        self.ancestors.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn is_top_level(&self) -> bool {
        self.ancestors.len() == 1
    }
}

/// Read-only table from record key to location, built once per run
#[derive(Debug, Default)]
pub struct RecordMap<'a> {
    locations: HashMap<RecordKey, RecordLocation<'a>>,
}

impl<'a> RecordMap<'a> {
    pub fn build(graph: &'a SchemaGraph) -> Self {
        let mut locations = HashMap::new();
        for module in &graph.modules {
            for record in &module.records {
                insert_record(&mut locations, module.path.as_str(), &[], record);
            }
        }
        Self { locations }
    }

    pub fn get(&self, key: &RecordKey) -> Option<&RecordLocation<'a>> {
        self.locations.get(key)
    }

    /// Resolve a reference; the map is total for a valid graph
    pub fn resolve(&self, key: &RecordKey) -> Result<&RecordLocation<'a>> {
        self.locations
            .get(key)
            .ok_or_else(|| CodegenError::UnresolvedRecord {
                key: key.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &RecordLocation<'a>)> {
        self.locations.iter()
    }
}

fn insert_record<'a>(
    locations: &mut HashMap<RecordKey, RecordLocation<'a>>,
    module_path: &'a str,
    parents: &[&'a Record],
    record: &'a Record,
) {
    let mut ancestors = parents.to_vec();
    ancestors.push(record);
    let names: Vec<&str> = ancestors.iter().map(|r| r.name.as_str()).collect();
    let key = RecordKey::new(module_path, &names);

    for nested in &record.nested {
        insert_record(locations, module_path, &ancestors, nested);
    }

    locations.insert(
        key.clone(),
        RecordLocation {
            key,
            record,
            module_path,
            ancestors,
        },
    );
}

/// Walk a module's records depth-first in declaration order (parents first)
pub fn walk_records<'a>(module: &'a Module) -> Vec<(Vec<&'a Record>, &'a Record)> {
    fn walk<'a>(
        parents: &[&'a Record],
        record: &'a Record,
        out: &mut Vec<(Vec<&'a Record>, &'a Record)>,
    ) {
        let mut ancestors = parents.to_vec();
        ancestors.push(record);
        out.push((ancestors.clone(), record));
        for nested in &record.nested {
            walk(&ancestors, nested, out);
        }
    }

    let mut out = Vec::new();
    for record in &module.records {
        walk(&[], record, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> SchemaGraph {
        SchemaGraph::from_json_str(
            r#"{
                "modules": [{
                    "path": "shapes.soia",
                    "records": [{
                        "kind": "struct",
                        "name": "Foo",
                        "fields": [
                            {"name": "bar", "number": 0, "type": {"kind": "record", "key": "shapes.soia:Foo.Bar"}}
                        ],
                        "nested": [{
                            "kind": "struct",
                            "name": "Bar",
                            "fields": [
                                {"name": "x", "number": 0, "type": {"kind": "primitive", "primitive": "int32"}}
                            ]
                        }]
                    }]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_record_key_format() {
        let key = RecordKey::new("a/b.soia", &["Outer", "Inner"]);
        assert_eq!(key.as_str(), "a/b.soia:Outer.Inner");
    }

    #[test]
    fn test_record_map_includes_nested() {
        let graph = sample_graph();
        let map = RecordMap::build(&graph);
        assert_eq!(map.len(), 2);

        let bar = map.resolve(&RecordKey("shapes.soia:Foo.Bar".into())).unwrap();
        assert_eq!(bar.declared_names(), vec!["Foo", "Bar"]);
        assert_eq!(bar.module_path, "shapes.soia");
        assert!(!bar.is_top_level());
    }

    #[test]
    fn test_unresolved_key() {
        let graph = sample_graph();
        let map = RecordMap::build(&graph);
        let err = map.resolve(&RecordKey("shapes.soia:Nope".into())).unwrap_err();
        assert!(matches!(err, CodegenError::UnresolvedRecord { .. }));
    }

    #[test]
    fn test_type_expr_serde_shape() {
        let ty = TypeExpr::keyed_array(TypeExpr::record("m.soia:Item"), &["weekday"]);
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["kind"], "array");
        assert_eq!(json["key"][0], "weekday");
        assert_eq!(json["item"]["key"], "m.soia:Item");

        let prim: TypeExpr = serde_json::from_str(r#"{"kind":"primitive","primitive":"uint64"}"#).unwrap();
        assert_eq!(prim, TypeExpr::primitive(PrimitiveKind::Uint64));
    }

    #[test]
    fn test_walk_records_parents_first() {
        let graph = sample_graph();
        let order: Vec<&str> = walk_records(&graph.modules[0])
            .into_iter()
            .map(|(_, r)| r.name.as_str())
            .collect();
        assert_eq!(order, vec!["Foo", "Bar"]);
    }
}
