//! Record Emitter
//!
//! Emits the class surface of every struct and enum, recursively through
//! nested records. Every annotation is obtained from the [`TypeProjector`];
//! this module only decides which flavor each position needs.
//!
//! Struct: frozen class, nested `Mutable` twin, `OrMutable` alias, `DEFAULT`
//! and `SERIALIZER` singletons. `__init__` fills omitted fields with their
//! defaults; `whole` requires every field.
//! Enum: constant singletons, `wrap_*`/`create_*` factories, the `Kind`
//! alias, `kind`/`value`/`union` accessors and one narrow view per member.

use tracing::debug;

use super::code::Code;
use super::hints::{union, TypeHint, UNKNOWN_TAG};
use super::names::MUTABLE_ACCESSOR_PREFIX;
use super::project::{enum_kind_hint, Flavor, TypeProjector};
use crate::error::{CodegenError, Result};
use crate::graph::{Field, PrimitiveKind, RecordKey, RecordKind, RecordLocation, TypeExpr};

/// Receiver name of generated methods; `self` stays free for field names
const RECEIVER: &str = "_self";

/// A struct field with its type and emitted attribute
struct TypedField<'r> {
    field: &'r Field,
    ty: &'r TypeExpr,
    attribute: String,
}

/// Emits class definitions for the module the projector is bound to
pub struct RecordEmitter<'p, 'm, 'a> {
    projector: &'p TypeProjector<'m, 'a>,
    /// Builtins declared by the module; annotations qualify them
    shadowed: &'p [&'static str],
}

impl<'p, 'm, 'a> RecordEmitter<'p, 'm, 'a> {
    pub fn new(projector: &'p TypeProjector<'m, 'a>, shadowed: &'p [&'static str]) -> Self {
        Self { projector, shadowed }
    }

    /// Emit the class of `location` with all nested classes inside it
    pub fn emit(&self, location: &RecordLocation<'_>) -> Result<Code> {
        debug!(record = %location.key, kind = ?location.record.kind, "Emitting record");
        match location.record.kind {
            RecordKind::Struct => self.emit_struct(location),
            RecordKind::Enum => self.emit_enum(location),
        }
    }

    fn emit_nested(&self, location: &RecordLocation<'_>, body: &mut Vec<Code>) -> Result<()> {
        let mut names = location.declared_names();
        for nested in &location.record.nested {
            names.push(nested.name.as_str());
            let key = RecordKey::new(location.module_path, &names);
            names.pop();

            let nested_location = self.projector.records().resolve(&key)?;
            body.push(Code::Blank);
            body.push(self.emit(nested_location)?);
        }
        Ok(())
    }

    fn project(&self, ty: &TypeExpr, flavor: Flavor, recursive: bool) -> Result<TypeHint> {
        Ok(self
            .projector
            .project(ty, flavor, recursive)?
            .shield_builtins(self.shadowed))
    }

    fn hint(&self, field: &TypedField<'_>, flavor: Flavor) -> Result<TypeHint> {
        self.project(field.ty, flavor, field.field.recursive)
    }

    fn typed_fields<'r>(&self, location: &RecordLocation<'r>) -> Result<Vec<TypedField<'r>>> {
        let attributes = self.projector.field_attributes(location.record)?;
        location
            .record
            .fields
            .iter()
            .zip(attributes)
            .map(|(field, attribute)| {
                let ty = field.ty.as_ref().ok_or_else(|| CodegenError::UntypedStructField {
                    record: location.key.to_string(),
                    field: field.name.clone(),
                })?;
                Ok(TypedField { field, ty, attribute })
            })
            .collect()
    }

    /// Zero value of a type, as a Python expression
    fn default_value(&self, ty: &TypeExpr) -> Result<String> {
        let value = match ty {
            TypeExpr::Primitive { primitive } => match primitive {
                PrimitiveKind::Bool => "False".to_string(),
                PrimitiveKind::Int32 | PrimitiveKind::Int64 | PrimitiveKind::Uint64 => "0".to_string(),
                PrimitiveKind::Float32 | PrimitiveKind::Float64 => "0.0".to_string(),
                PrimitiveKind::Timestamp => "soia.Timestamp.EPOCH".to_string(),
                PrimitiveKind::String => "\"\"".to_string(),
                PrimitiveKind::Bytes => "b\"\"".to_string(),
            },
            TypeExpr::Array { .. } => "()".to_string(),
            TypeExpr::Optional { .. } => "None".to_string(),
            TypeExpr::Record { key } => {
                let location = self.projector.records().resolve(key)?;
                format!("{}.DEFAULT", self.projector.names().qualified_name(location))
            }
        };
        Ok(value)
    }

    /// Default of a mutable twin slot. An array slot defaults to an empty
    /// list where the slot admits one, else to the empty frozen form.
    fn mutable_default_value(&self, field: &TypedField<'_>) -> Result<String> {
        let TypeExpr::Array { key, .. } = field.ty else {
            return self.default_value(field.ty);
        };
        if !self.hint(field, Flavor::Mutable)?.is_never() {
            Ok("[]".to_string())
        } else if key.is_none() {
            Ok("()".to_string())
        } else {
            // No literal of soia.KeyedItems exists
            Ok("...".to_string())
        }
    }

    // =========================================================================
    // Struct
    // =========================================================================

    fn emit_struct(&self, location: &RecordLocation<'_>) -> Result<Code> {
        let names = self.projector.names();
        let qualified = names.qualified_name(location);
        let frozen = TypeHint::class(qualified.clone());
        let mutable = TypeHint::class(format!("{}.Mutable", qualified));
        let fields = self.typed_fields(location)?;

        let mut body = Vec::new();

        let mut params = receiver_and_star(&fields);
        for f in &fields {
            params.push(format!(
                "{}: {} = {}",
                f.attribute,
                self.hint(f, Flavor::Initializer)?,
                self.default_value(f.ty)?
            ));
        }
        body.push(Code::group("def __init__(", params, ") -> None: ..."));

        // Every field required
        let mut params = star(&fields);
        for f in &fields {
            params.push(format!("{}: {}", f.attribute, self.hint(f, Flavor::Initializer)?));
        }
        body.push(Code::line("@staticmethod"));
        body.push(Code::group("def whole(", params, format!(") -> {}: ...", frozen)));

        let keep = TypeHint::builtin("soia.Keep");
        let mut params = receiver_and_star(&fields);
        for f in &fields {
            let hint = union([self.hint(f, Flavor::Initializer)?, keep.clone()]);
            params.push(format!("{}: {} = soia.KEEP", f.attribute, hint));
        }
        body.push(Code::group("def replace(", params, format!(") -> {}: ...", frozen)));

        for f in &fields {
            body.push(Code::line("@property"));
            body.push(Code::line(format!(
                "def {}({}) -> {}: ...",
                f.attribute,
                RECEIVER,
                self.hint(f, Flavor::Frozen)?
            )));
        }
        body.push(Code::line(format!("def to_mutable({}) -> {}: ...", RECEIVER, mutable)));
        body.push(Code::line(format!("def to_frozen({}) -> {}: ...", RECEIVER, frozen)));

        body.push(Code::Blank);
        body.push(self.emit_mutable_twin(location, &fields, &frozen)?);

        body.push(Code::Blank);
        body.push(Code::line(format!(
            "OrMutable: typing.TypeAlias = {}",
            union([frozen.clone(), mutable])
        )));
        body.push(Code::line(format!("DEFAULT: {}", final_of(frozen.clone()))));
        body.push(Code::line(format!(
            "SERIALIZER: {}",
            final_of(TypeHint::generic("soia.Serializer", vec![frozen]))
        )));

        self.emit_nested(location, &mut body)?;

        Ok(Code::block(format!("class {}", names.record_name(location)), body))
    }

    fn emit_mutable_twin(
        &self,
        location: &RecordLocation<'_>,
        fields: &[TypedField<'_>],
        frozen: &TypeHint,
    ) -> Result<Code> {
        let mut body = Vec::new();

        let mut params = receiver_and_star(fields);
        for f in fields {
            params.push(format!(
                "{}: {} = {}",
                f.attribute,
                self.hint(f, Flavor::MaybeMutable)?,
                self.mutable_default_value(f)?
            ));
        }
        body.push(Code::group("def __init__(", params, ") -> None: ..."));

        for f in fields {
            body.push(Code::line(format!(
                "{}: {}",
                f.attribute,
                self.hint(f, Flavor::MaybeMutable)?
            )));
        }

        for f in fields {
            let promoted = self.hint(f, Flavor::Mutable)?;
            if promoted.is_never() {
                continue;
            }
            debug!(record = %location.key, field = %f.field.name, "Mutable accessor");
            body.push(Code::line(format!(
                "def {}{}({}) -> {}: ...",
                MUTABLE_ACCESSOR_PREFIX, f.field.name, RECEIVER, promoted
            )));
        }

        body.push(Code::line(format!("def to_frozen({}) -> {}: ...", RECEIVER, frozen)));

        Ok(Code::block("class Mutable", body))
    }

    // =========================================================================
    // Enum
    // =========================================================================

    fn emit_enum(&self, location: &RecordLocation<'_>) -> Result<Code> {
        let names = self.projector.names();
        let qualified = names.qualified_name(location);
        let this = TypeHint::class(qualified.clone());
        let record = location.record;

        let mut body = Vec::new();

        body.push(Code::line(format!("UNKNOWN: {}", final_of(this.clone()))));
        for member in record.fields.iter().filter(|f| f.ty.is_none()) {
            body.push(Code::line(format!(
                "{}: {}",
                names.enum_constant_attribute(&member.name),
                final_of(this.clone())
            )));
        }

        for member in &record.fields {
            let Some(ty) = &member.ty else { continue };
            let payload = self.project(ty, Flavor::Initializer, member.recursive)?;
            body.push(Code::line("@staticmethod"));
            body.push(Code::line(format!(
                "def wrap_{}(value: {}) -> {}: ...",
                member.name, payload, this
            )));
            if let Some(create) = self.emit_create(member, ty, &this)? {
                body.push(Code::line("@staticmethod"));
                body.push(create);
            }
        }

        body.push(Code::Blank);
        body.push(Code::line(format!(
            "Kind: typing.TypeAlias = {}",
            enum_kind_hint(location)
        )));
        body.push(Code::line("@property"));
        body.push(Code::line(format!(
            "def kind({}) -> {}: ...",
            RECEIVER,
            TypeHint::class(format!("{}.Kind", qualified))
        )));

        let mut values = Vec::new();
        for member in &record.fields {
            if let Some(ty) = &member.ty {
                values.push(self.project(ty, Flavor::Frozen, member.recursive)?);
            }
        }
        values.push(TypeHint::none());
        body.push(Code::line("@property"));
        body.push(Code::line(format!(
            "def value({}) -> {}: ...",
            RECEIVER,
            union(values)
        )));

        let mut views = vec![(view_class_name("UNKNOWN"), UNKNOWN_TAG.to_string(), TypeHint::none())];
        for member in &record.fields {
            let value = match &member.ty {
                Some(ty) => self.project(ty, Flavor::Frozen, member.recursive)?,
                None => TypeHint::none(),
            };
            let attribute = names.enum_constant_attribute(&member.name);
            views.push((view_class_name(&attribute), member.name.clone(), value));
        }

        let view_union = union(
            views
                .iter()
                .map(|(class, _, _)| TypeHint::class(format!("{}.{}", qualified, class))),
        );
        body.push(Code::line("@property"));
        body.push(Code::line(format!("def union({}) -> {}: ...", RECEIVER, view_union)));

        for (class, tag, value) in views {
            body.push(Code::Blank);
            body.push(Code::block(
                format!("class {}", class),
                vec![
                    Code::line("@property"),
                    Code::line(format!(
                        "def kind({}) -> {}: ...",
                        RECEIVER,
                        TypeHint::Literal(vec![tag])
                    )),
                    Code::line("@property"),
                    Code::line(format!("def value({}) -> {}: ...", RECEIVER, value)),
                ],
            ));
        }

        body.push(Code::Blank);
        body.push(Code::line(format!("DEFAULT: {}", final_of(this.clone()))));
        body.push(Code::line(format!(
            "SERIALIZER: {}",
            final_of(TypeHint::generic("soia.Serializer", vec![this]))
        )));

        self.emit_nested(location, &mut body)?;

        Ok(Code::block(format!("class {}", names.record_name(location)), body))
    }

    /// `create_<member>(**fields)` when the payload is a struct
    fn emit_create(&self, member: &Field, ty: &TypeExpr, this: &TypeHint) -> Result<Option<Code>> {
        let TypeExpr::Record { key } = ty else {
            return Ok(None);
        };
        let payload = self.projector.records().resolve(key)?;
        if payload.record.kind != RecordKind::Struct {
            return Ok(None);
        }

        let fields = self.typed_fields(payload)?;
        let mut params = star(&fields);
        for f in &fields {
            params.push(format!("{}: {}", f.attribute, self.hint(f, Flavor::Initializer)?));
        }
        Ok(Some(Code::group(
            format!("def create_{}(", member.name),
            params,
            format!(") -> {}: ...", this),
        )))
    }
}

fn final_of(hint: TypeHint) -> TypeHint {
    TypeHint::generic("typing.Final", vec![hint])
}

fn view_class_name(attribute: &str) -> String {
    format!("_{}_View", attribute)
}

fn star(fields: &[TypedField<'_>]) -> Vec<String> {
    if fields.is_empty() {
        Vec::new()
    } else {
        vec!["*".to_string()]
    }
}

fn receiver_and_star(fields: &[TypedField<'_>]) -> Vec<String> {
    let mut params = vec![RECEIVER.to_string()];
    params.extend(star(fields));
    params
}
