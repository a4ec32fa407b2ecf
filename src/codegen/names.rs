//! Name Resolution
//!
//! Maps declared record/field names to the Python symbols the emitter writes,
//! and computes cross-module qualified names.
//!
//! Escaping appends [`ESCAPE_SUFFIX`] when a declared name collides with a
//! Python keyword or with a symbol the generator itself introduces in the same
//! scope. The declared name is never lost: the reflection descriptor carries
//! it next to the escaped attribute.
//!
//! Builtins are not escaped. A member named `float` keeps its name, and the
//! annotations of its module refer to `builtins.float` instead (see
//! [`shadowed_builtins`]).

use super::hints::PROJECTED_BUILTINS;
use crate::graph::{walk_records, Module, RecordKind, RecordLocation};

/// Appended to colliding names
pub const ESCAPE_SUFFIX: &str = "_";

/// Prefix of mutable-promoting accessors
pub const MUTABLE_ACCESSOR_PREFIX: &str = "mutable_";

/// Root package of the generated code
pub const GENERATED_PACKAGE: &str = "soiagen";

/// Source extension of schema modules
pub const SCHEMA_EXTENSION: &str = ".soia";

// =============================================================================
// Scopes
// =============================================================================

/// The Python namespace a symbol is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Module globals
    Module,
    /// Body of a generated struct class
    Struct,
    /// Body of a generated enum class
    Enum,
}

impl Scope {
    /// Scope introduced by a record's class body
    pub fn of_record(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Struct => Scope::Struct,
            RecordKind::Enum => Scope::Enum,
        }
    }

    fn generated_symbols(&self) -> &'static [&'static str] {
        match self {
            Scope::Module => MODULE_SYMBOLS,
            Scope::Struct => STRUCT_SYMBOLS,
            Scope::Enum => ENUM_SYMBOLS,
        }
    }
}

/// Escape `name` for declaration in `scope`
pub fn escape(name: &str, scope: Scope) -> String {
    let reserved = PYTHON_KEYWORDS.contains(&name) || scope.generated_symbols().contains(&name);
    if reserved {
        format!("{}{}", name, ESCAPE_SUFFIX)
    } else {
        name.to_string()
    }
}

/// `Some(escaped)` only when escaping changed the name
pub fn escaped_if_changed(name: &str, scope: Scope) -> Option<String> {
    let escaped = escape(name, scope);
    (escaped != name).then_some(escaped)
}

/// Attribute of a struct field, given the mutable accessor names of its struct.
///
/// The accessors share the twin's class body with the field attributes, so an
/// attribute equal to one of them is escaped further.
pub fn field_attribute_among(field_name: &str, accessors: &[String]) -> String {
    let mut attribute = escape(field_name, Scope::Struct);
    while accessors.contains(&attribute) {
        attribute.push_str(ESCAPE_SUFFIX);
    }
    attribute
}

/// Projected builtins that some declaration of `module` shadows.
///
/// Covers top-level records, struct fields, enum constants, methods and
/// constants. Every annotation of the module qualifies these through the
/// `builtins` module.
pub fn shadowed_builtins(module: &Module) -> Vec<&'static str> {
    let mut declared: Vec<&str> = Vec::new();
    declared.extend(module.records.iter().map(|r| r.name.as_str()));
    for (_, record) in walk_records(module) {
        declared.extend(record.nested.iter().map(|r| r.name.as_str()));
        declared.extend(
            record
                .fields
                .iter()
                .filter(|f| record.is_struct() || f.ty.is_none())
                .map(|f| f.name.as_str()),
        );
    }
    declared.extend(module.methods.iter().map(|m| m.name.as_str()));
    declared.extend(module.constants.iter().map(|c| c.name.as_str()));

    PROJECTED_BUILTINS
        .iter()
        .copied()
        .filter(|builtin| declared.contains(builtin))
        .collect()
}

// =============================================================================
// Module Paths
// =============================================================================

fn strip_extension(module_path: &str) -> &str {
    module_path
        .strip_suffix(SCHEMA_EXTENSION)
        .unwrap_or(module_path)
}

/// `geometry/shapes.soia` -> `soiagen.geometry.shapes`
pub fn python_module(module_path: &str) -> String {
    format!(
        "{}.{}",
        GENERATED_PACKAGE,
        strip_extension(module_path).replace('/', ".")
    )
}

/// `geometry/shapes.soia` -> `_geometry__shapes`
///
/// `/` becomes a double underscore so that `a_b/c` and `a/b_c` stay distinct.
pub fn module_alias(module_path: &str) -> String {
    let mut alias = String::from("_");
    for (i, segment) in strip_extension(module_path).split('/').enumerate() {
        if i > 0 {
            alias.push_str("__");
        }
        alias.extend(
            segment
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
        );
    }
    alias
}

/// `geometry/shapes.soia` -> `geometry/shapes.py`
pub fn output_path(module_path: &str) -> String {
    format!("{}.py", strip_extension(module_path))
}

// =============================================================================
// Name Resolver
// =============================================================================

/// Resolves record names as seen from the module being emitted
#[derive(Debug, Clone, Copy)]
pub struct NameResolver<'a> {
    /// Path of the module currently being emitted
    current_module: &'a str,
}

impl<'a> NameResolver<'a> {
    pub fn new(current_module: &'a str) -> Self {
        Self { current_module }
    }

    pub fn current_module(&self) -> &'a str {
        self.current_module
    }

    /// Escaped names of the whole ancestor chain, outermost first
    pub fn escaped_chain(&self, location: &RecordLocation<'_>) -> Vec<String> {
        let mut scope = Scope::Module;
        let mut chain = Vec::with_capacity(location.ancestors.len());
        for record in &location.ancestors {
            chain.push(escape(&record.name, scope));
            scope = Scope::of_record(record.kind);
        }
        chain
    }

    /// Short display name: the last escaped segment
    pub fn record_name(&self, location: &RecordLocation<'_>) -> String {
        self.escaped_chain(location).pop().unwrap_or_default()
    }

    /// Dot-joined escaped chain, behind the module alias when the record lives
    /// in another module
    pub fn qualified_name(&self, location: &RecordLocation<'_>) -> String {
        let chain = self.escaped_chain(location).join(".");
        if location.module_path == self.current_module {
            chain
        } else {
            format!("{}.{}", module_alias(location.module_path), chain)
        }
    }

    /// Attribute name of an enum constant member
    pub fn enum_constant_attribute(&self, member_name: &str) -> String {
        escape(member_name, Scope::Enum)
    }

    /// Variable name of a method or constant
    pub fn module_variable(&self, name: &str) -> String {
        escape(name, Scope::Module)
    }
}

// =============================================================================
// Reserved Names
// =============================================================================

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break",
    "class", "continue", "def", "del", "elif", "else", "except", "finally",
    "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const MODULE_SYMBOLS: &[&str] = &["builtins", "soia", "typing"];

const STRUCT_SYMBOLS: &[&str] = &[
    "Mutable", "OrMutable", "DEFAULT", "SERIALIZER", "whole", "replace",
    "to_mutable", "to_frozen",
];

const ENUM_SYMBOLS: &[&str] = &[
    "Kind", "UNKNOWN", "DEFAULT", "SERIALIZER", "kind", "value", "union",
];
