//! Type Projection
//!
//! Maps a schema type expression to its Python annotation under one of five
//! flavors. Frozen and mutable twins, constructors and enum keys all ask the
//! projector instead of deciding types themselves.
//!
//! Recursion cut: a field marked recursive is projected with
//! `all_records_frozen`. Under that flag nothing is independently mutable:
//! `Mutable` is bottom and `MaybeMutable` equals `Frozen`, so a cyclic field
//! can never hold a mutable alias and deep freezing stays well-founded.

use std::fmt;

use super::hints::{union, TypeHint, UNKNOWN_TAG};
use super::names::{field_attribute_among, NameResolver, MUTABLE_ACCESSOR_PREFIX};
use crate::error::{CodegenError, Result};
use crate::graph::{Field, PrimitiveKind, Record, RecordKind, RecordLocation, RecordMap, TypeExpr};

// =============================================================================
// Flavor
// =============================================================================

/// Representation requested from the projector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Deeply immutable
    Frozen,
    /// Independently mutable; bottom when the type has no mutable form
    Mutable,
    /// Frozen or mutable: slot type of a mutable twin
    MaybeMutable,
    /// Accepted by constructors
    Initializer,
    /// Discriminant only, for lookup keys
    Kind,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flavor::Frozen => "frozen",
            Flavor::Mutable => "mutable",
            Flavor::MaybeMutable => "maybe-mutable",
            Flavor::Initializer => "initializer",
            Flavor::Kind => "kind",
        };
        f.write_str(name)
    }
}

/// Python annotation of a primitive (identical for every non-mutable flavor)
pub fn primitive_hint(kind: PrimitiveKind) -> TypeHint {
    let name = match kind {
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::Int32 | PrimitiveKind::Int64 | PrimitiveKind::Uint64 => "int",
        PrimitiveKind::Float32 | PrimitiveKind::Float64 => "float",
        PrimitiveKind::Timestamp => "soia.Timestamp",
        PrimitiveKind::String => "str",
        PrimitiveKind::Bytes => "bytes",
    };
    TypeHint::builtin(name)
}

// =============================================================================
// Projector
// =============================================================================

/// Pure projection over the shared record map
#[derive(Debug, Clone, Copy)]
pub struct TypeProjector<'m, 'a> {
    records: &'m RecordMap<'a>,
    names: NameResolver<'m>,
}

impl<'m, 'a> TypeProjector<'m, 'a> {
    pub fn new(records: &'m RecordMap<'a>, names: NameResolver<'m>) -> Self {
        Self { records, names }
    }

    pub fn records(&self) -> &'m RecordMap<'a> {
        self.records
    }

    pub fn names(&self) -> NameResolver<'m> {
        self.names
    }

    /// Project `ty` under `flavor`.
    ///
    /// `all_records_frozen` is set for fields that close a recursive cycle.
    pub fn project(&self, ty: &TypeExpr, flavor: Flavor, all_records_frozen: bool) -> Result<TypeHint> {
        if all_records_frozen {
            match flavor {
                Flavor::Mutable => return Ok(TypeHint::Never),
                Flavor::MaybeMutable => return self.project(ty, Flavor::Frozen, true),
                _ => {}
            }
        }

        match ty {
            TypeExpr::Primitive { primitive } => match flavor {
                Flavor::Mutable => Ok(TypeHint::Never),
                Flavor::Kind => Err(CodegenError::unreachable(ty.kind_name(), flavor)),
                _ => Ok(primitive_hint(*primitive)),
            },
            TypeExpr::Optional { inner } => match flavor {
                // A promoting accessor always hands back a concrete handle
                Flavor::Mutable => self.project(inner, Flavor::Mutable, all_records_frozen),
                _ => Ok(TypeHint::optional(self.project(inner, flavor, all_records_frozen)?)),
            },
            TypeExpr::Array { item, key } => {
                self.project_array(item, key.as_deref(), flavor, all_records_frozen)
            }
            TypeExpr::Record { key } => {
                let location = self.records.resolve(key)?;
                self.project_record(location, flavor, all_records_frozen)
            }
        }
    }

    fn project_array(
        &self,
        item: &TypeExpr,
        key: Option<&[String]>,
        flavor: Flavor,
        all_records_frozen: bool,
    ) -> Result<TypeHint> {
        match flavor {
            Flavor::Frozen => {
                let frozen_item = self.project(item, Flavor::Frozen, all_records_frozen)?;
                match key {
                    None => Ok(TypeHint::generic(
                        "tuple",
                        vec![frozen_item, TypeHint::builtin("...")],
                    )),
                    Some(chain) => {
                        let key_hint = self.key_hint(item, chain)?;
                        Ok(TypeHint::generic("soia.KeyedItems", vec![frozen_item, key_hint]))
                    }
                }
            }
            Flavor::Mutable => {
                let slot = self.project(item, Flavor::MaybeMutable, all_records_frozen)?;
                Ok(TypeHint::generic("list", vec![slot]))
            }
            Flavor::MaybeMutable => Ok(union([
                self.project_array(item, key, Flavor::Frozen, all_records_frozen)?,
                self.project_array(item, key, Flavor::Mutable, all_records_frozen)?,
            ])),
            Flavor::Initializer => {
                let slot = self.project(item, Flavor::MaybeMutable, all_records_frozen)?;
                Ok(TypeHint::generic("typing.Iterable", vec![slot]))
            }
            Flavor::Kind => Err(CodegenError::unreachable("array", flavor)),
        }
    }

    fn project_record(
        &self,
        location: &RecordLocation<'_>,
        flavor: Flavor,
        all_records_frozen: bool,
    ) -> Result<TypeHint> {
        let qualified = self.names.qualified_name(location);
        match location.record.kind {
            RecordKind::Struct => match flavor {
                Flavor::Frozen => Ok(TypeHint::class(qualified)),
                Flavor::Mutable => Ok(TypeHint::class(format!("{}.Mutable", qualified))),
                Flavor::MaybeMutable | Flavor::Initializer => {
                    if all_records_frozen {
                        Ok(TypeHint::class(qualified))
                    } else {
                        Ok(union([
                            TypeHint::class(qualified.clone()),
                            TypeHint::class(format!("{}.Mutable", qualified)),
                        ]))
                    }
                }
                Flavor::Kind => Err(CodegenError::unreachable("struct record", flavor)),
            },
            RecordKind::Enum => match flavor {
                Flavor::Mutable => Ok(TypeHint::Never),
                Flavor::Frozen | Flavor::MaybeMutable | Flavor::Initializer => {
                    Ok(TypeHint::class(qualified))
                }
                Flavor::Kind => Ok(enum_kind_hint(location)),
            },
        }
    }

    /// A struct field gets a mutable-promoting accessor iff its type has an
    /// independent mutable form at that position
    pub fn has_mutable_getter(&self, field: &Field) -> Result<bool> {
        match &field.ty {
            Some(ty) => Ok(!self.project(ty, Flavor::Mutable, field.recursive)?.is_never()),
            None => Ok(false),
        }
    }

    /// Emitted attribute of every field of a struct, in declaration order
    pub fn field_attributes(&self, record: &Record) -> Result<Vec<String>> {
        let mut accessors = Vec::new();
        for field in &record.fields {
            if self.has_mutable_getter(field)? {
                accessors.push(format!("{}{}", MUTABLE_ACCESSOR_PREFIX, field.name));
            }
        }
        Ok(record
            .fields
            .iter()
            .map(|field| field_attribute_among(&field.name, &accessors))
            .collect())
    }

    /// Annotation of the lookup key of an array of `item` keyed by `chain`
    pub fn key_hint(&self, item: &TypeExpr, chain: &[String]) -> Result<TypeHint> {
        let key_type = self.key_type(item, chain)?;
        match key_type {
            TypeExpr::Primitive { primitive } => Ok(primitive_hint(*primitive)),
            TypeExpr::Record { key } => {
                let location = self.records.resolve(key)?;
                self.project_record(location, Flavor::Kind, false)
            }
            _ => Err(self.key_error(item, chain, "key must be a primitive or an enum")),
        }
    }

    /// Type of the last field reached by walking `chain` from `item`
    pub fn key_type<'t>(&self, item: &'t TypeExpr, chain: &[String]) -> Result<&'t TypeExpr>
    where
        'a: 't,
    {
        if chain.is_empty() {
            return Err(self.key_error(item, chain, "empty key chain"));
        }

        let mut current: &'t TypeExpr = item;
        for name in chain {
            let TypeExpr::Record { key } = current else {
                return Err(self.key_error(item, chain, "key chain walks through a non-struct"));
            };
            let location = self.records.resolve(key)?;
            if location.record.kind != RecordKind::Struct {
                return Err(self.key_error(item, chain, "key chain walks through an enum"));
            }
            let record: &'a Record = location.record;
            let field = record
                .field(name)
                .ok_or_else(|| self.key_error(item, chain, &format!("no field `{}`", name)))?;
            current = field
                .ty
                .as_ref()
                .ok_or_else(|| self.key_error(item, chain, "key field has no type"))?;
        }
        Ok(current)
    }

    fn key_error(&self, item: &TypeExpr, chain: &[String], reason: &str) -> CodegenError {
        let record = match item {
            TypeExpr::Record { key } => key.to_string(),
            other => other.kind_name().to_string(),
        };
        CodegenError::InvalidKeyChain {
            record,
            chain: chain.join("."),
            reason: reason.to_string(),
        }
    }
}

/// Every declared member name plus the unknown tag
pub fn enum_kind_hint(location: &RecordLocation<'_>) -> TypeHint {
    let mut tags = vec![UNKNOWN_TAG.to_string()];
    tags.extend(location.record.fields.iter().map(|f| f.name.clone()));
    TypeHint::Literal(tags)
}
