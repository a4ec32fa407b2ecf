//! Reflection Descriptor
//!
//! Structural metadata embedded in every generated module and consumed by the
//! runtime serializer. Identity comes from declared names and wire numbers;
//! escaped class and attribute names are carried only when escaping changed
//! them.
//!
//! Field order mirrors the emitted class exactly.

use serde::{Deserialize, Serialize};

use super::names::{escaped_if_changed, Scope};
use super::project::TypeProjector;
use crate::error::{CodegenError, Result};
use crate::graph::{walk_records, Constant, Method, Module, PrimitiveKind, Record, RecordKey, RecordKind, TypeExpr};

// =============================================================================
// Descriptor Types
// =============================================================================

/// A type expression with record references resolved to identity strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpec {
    Primitive {
        primitive: PrimitiveKind,
    },
    Array {
        item: Box<TypeSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_chain: Option<Vec<String>>,
    },
    Optional {
        inner: Box<TypeSpec>,
    },
    Record {
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub number: u32,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_mutable_getter: bool,
    /// Emitted attribute, present only when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl FieldSpec {
    /// The attribute as it appears on the generated class
    pub fn attribute_name(&self) -> &str {
        self.attribute.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructSpec {
    pub id: String,
    /// Emitted class name, present only when it differs from the declared name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_numbers: Vec<u32>,
}

impl StructSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantFieldSpec {
    pub name: String,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueFieldSpec {
    pub name: String,
    pub number: u32,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub constant_fields: Vec<ConstantFieldSpec>,
    pub value_fields: Vec<ValueFieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_numbers: Vec<u32>,
}

impl EnumSpec {
    pub fn constant(&self, name: &str) -> Option<&ConstantFieldSpec> {
        self.constant_fields.iter().find(|f| f.name == name)
    }

    pub fn variant(&self, name: &str) -> Option<&ValueFieldSpec> {
        self.value_fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordSpec {
    Struct(StructSpec),
    Enum(EnumSpec),
}

impl RecordSpec {
    pub fn id(&self) -> &str {
        match self {
            RecordSpec::Struct(s) => &s.id,
            RecordSpec::Enum(e) => &e.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub number: u32,
    pub request: TypeSpec,
    pub response: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// The full descriptor of one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub path: String,
    pub records: Vec<RecordSpec>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub constants: Vec<ConstantSpec>,
}

impl ModuleSpec {
    /// Pretty JSON, as embedded in the registration call
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// Descriptor Builder
// =============================================================================

/// Encode a type expression, resolving every record reference
pub fn type_spec(projector: &TypeProjector<'_, '_>, ty: &TypeExpr) -> Result<TypeSpec> {
    match ty {
        TypeExpr::Primitive { primitive } => Ok(TypeSpec::Primitive {
            primitive: *primitive,
        }),
        TypeExpr::Array { item, key } => {
            if let Some(chain) = key {
                projector.key_hint(item, chain)?;
            }
            Ok(TypeSpec::Array {
                item: Box::new(type_spec(projector, item)?),
                key_chain: key.clone(),
            })
        }
        TypeExpr::Optional { inner } => Ok(TypeSpec::Optional {
            inner: Box::new(type_spec(projector, inner)?),
        }),
        TypeExpr::Record { key } => {
            let location = projector.records().resolve(key)?;
            Ok(TypeSpec::Record {
                id: location.key.to_string(),
            })
        }
    }
}

/// Describe one record (not its nested records)
pub fn record_spec(projector: &TypeProjector<'_, '_>, id: &RecordKey, record: &Record) -> Result<RecordSpec> {
    let location = projector.records().resolve(id)?;
    let class = projector.names().record_name(location);
    let class_name = (class != record.name).then_some(class);

    match record.kind {
        RecordKind::Struct => {
            let attributes = projector.field_attributes(record)?;
            let mut fields = Vec::with_capacity(record.fields.len());
            for (field, attribute) in record.fields.iter().zip(attributes) {
                let Some(ty) = &field.ty else {
                    return Err(CodegenError::UntypedStructField {
                        record: id.to_string(),
                        field: field.name.clone(),
                    });
                };
                fields.push(FieldSpec {
                    name: field.name.clone(),
                    number: field.number,
                    ty: type_spec(projector, ty)?,
                    has_mutable_getter: projector.has_mutable_getter(field)?,
                    attribute: (attribute != field.name).then_some(attribute),
                });
            }
            Ok(RecordSpec::Struct(StructSpec {
                id: id.to_string(),
                class_name,
                fields,
                removed_numbers: record.removed_numbers.clone(),
            }))
        }
        RecordKind::Enum => {
            let mut constant_fields = Vec::new();
            let mut value_fields = Vec::new();
            for field in &record.fields {
                let attribute = escaped_if_changed(&field.name, Scope::Enum);
                match &field.ty {
                    None => constant_fields.push(ConstantFieldSpec {
                        name: field.name.clone(),
                        number: field.number,
                        attribute,
                    }),
                    Some(ty) => value_fields.push(ValueFieldSpec {
                        name: field.name.clone(),
                        number: field.number,
                        ty: type_spec(projector, ty)?,
                        attribute,
                    }),
                }
            }
            Ok(RecordSpec::Enum(EnumSpec {
                id: id.to_string(),
                class_name,
                constant_fields,
                value_fields,
                removed_numbers: record.removed_numbers.clone(),
            }))
        }
    }
}

pub fn method_spec(projector: &TypeProjector<'_, '_>, method: &Method) -> Result<MethodSpec> {
    Ok(MethodSpec {
        name: method.name.clone(),
        number: method.number,
        request: type_spec(projector, &method.request)?,
        response: type_spec(projector, &method.response)?,
        attribute: escaped_if_changed(&method.name, Scope::Module),
    })
}

pub fn constant_spec(projector: &TypeProjector<'_, '_>, constant: &Constant) -> Result<ConstantSpec> {
    Ok(ConstantSpec {
        name: constant.name.clone(),
        ty: type_spec(projector, &constant.ty)?,
        value: constant.value.clone(),
        attribute: escaped_if_changed(&constant.name, Scope::Module),
    })
}

/// Describe a whole module: records pre-order (parents before nested), then
/// methods and constants, all in declaration order
pub fn module_spec(projector: &TypeProjector<'_, '_>, module: &Module) -> Result<ModuleSpec> {
    let mut records = Vec::new();
    for (ancestors, record) in walk_records(module) {
        let names: Vec<&str> = ancestors.iter().map(|r| r.name.as_str()).collect();
        let id = RecordKey::new(&module.path, &names);
        records.push(record_spec(projector, &id, record)?);
    }

    let methods = module
        .methods
        .iter()
        .map(|m| method_spec(projector, m))
        .collect::<Result<Vec<_>>>()?;
    let constants = module
        .constants
        .iter()
        .map(|c| constant_spec(projector, c))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModuleSpec {
        path: module.path.clone(),
        records,
        methods,
        constants,
    })
}
