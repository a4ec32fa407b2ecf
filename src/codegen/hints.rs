//! Type Hints and Union Construction
//!
//! A `TypeHint` is the structural form of a Python annotation. Projection
//! builds hints; rendering happens once, at emission time, so that quoting is
//! decided for the whole annotation rather than piecewise.
//!
//! Rendering rules:
//! - Any hint mentioning a forward reference renders as ONE quoted string with
//!   nothing quoted inside it.
//! - A union with a parameterized member uses `typing.Union[...]`, otherwise
//!   plain `a | b`.

use std::fmt;

/// The annotation of an absent optional
pub const NONE: &str = "None";

/// Unknown-member discriminant of every enum
pub const UNKNOWN_TAG: &str = "?";

/// Builtins the projector writes into annotations. A class body declaring a
/// member with one of these names shadows it for the rest of that body.
pub const PROJECTED_BUILTINS: &[&str] = &["bool", "int", "float", "str", "bytes", "tuple", "list"];

/// Module the shadowed builtins are qualified with
pub const BUILTINS_MODULE: &str = "builtins";

// =============================================================================
// TypeHint
// =============================================================================

/// A Python type annotation
#[derive(Debug, Clone)]
pub enum TypeHint {
    /// Uninhabited: `typing.Never`
    Never,
    /// A plain name; `forward` when it names a generated class
    Name { path: String, forward: bool },
    /// `typing.Literal["a", "b"]`
    Literal(Vec<String>),
    /// `base[arg, ...]`
    Generic { base: String, args: Vec<TypeHint> },
    /// Deduplicated, flattened, at least two members. Build with [`union`].
    Union(Vec<TypeHint>),
}

impl TypeHint {
    /// A builtin or runtime-library name (never quoted)
    pub fn builtin(path: impl Into<String>) -> Self {
        Self::Name {
            path: path.into(),
            forward: false,
        }
    }

    /// A generated class name (always a forward reference)
    pub fn class(path: impl Into<String>) -> Self {
        Self::Name {
            path: path.into(),
            forward: true,
        }
    }

    pub fn none() -> Self {
        Self::builtin(NONE)
    }

    pub fn generic(base: impl Into<String>, args: Vec<TypeHint>) -> Self {
        Self::Generic {
            base: base.into(),
            args,
        }
    }

    /// `T | None`
    pub fn optional(inner: TypeHint) -> Self {
        union([inner, Self::none()])
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }

    /// True when the hint takes type arguments
    pub fn is_parameterized(&self) -> bool {
        matches!(self, Self::Generic { .. } | Self::Literal(_))
    }

    /// True when any name inside is a forward reference
    pub fn has_forward_ref(&self) -> bool {
        match self {
            Self::Never | Self::Literal(_) => false,
            Self::Name { forward, .. } => *forward,
            Self::Generic { args, .. } => args.iter().any(TypeHint::has_forward_ref),
            Self::Union(members) => members.iter().any(TypeHint::has_forward_ref),
        }
    }

    /// Members of a union, or the hint itself
    pub fn members(&self) -> Vec<&TypeHint> {
        match self {
            Self::Union(members) => members.iter().collect(),
            Self::Never => Vec::new(),
            other => vec![other],
        }
    }

    /// Qualify every builtin in `shadowed` as `builtins.<name>`
    pub fn shield_builtins(self, shadowed: &[&str]) -> TypeHint {
        if shadowed.is_empty() {
            return self;
        }
        let qualify = |name: String| {
            if shadowed.contains(&name.as_str()) {
                format!("{}.{}", BUILTINS_MODULE, name)
            } else {
                name
            }
        };
        match self {
            Self::Name {
                path,
                forward: false,
            } => Self::builtin(qualify(path)),
            Self::Generic { base, args } => Self::Generic {
                base: qualify(base),
                args: args.into_iter().map(|a| a.shield_builtins(shadowed)).collect(),
            },
            Self::Union(members) => {
                Self::Union(members.into_iter().map(|m| m.shield_builtins(shadowed)).collect())
            }
            other => other,
        }
    }

    /// Render as it appears after `:` or `->`
    pub fn render(&self) -> String {
        let quoted = self.has_forward_ref();
        let mut out = String::new();
        self.write_bare(&mut out, quoted);
        if quoted {
            format!("\"{}\"", out)
        } else {
            out
        }
    }

    fn write_bare(&self, out: &mut String, quoted: bool) {
        match self {
            Self::Never => out.push_str("typing.Never"),
            Self::Name { path, .. } => out.push_str(path),
            Self::Literal(values) => {
                let q = if quoted { '\'' } else { '"' };
                out.push_str("typing.Literal[");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push(q);
                    out.push_str(value);
                    out.push(q);
                }
                out.push(']');
            }
            Self::Generic { base, args } => {
                out.push_str(base);
                out.push('[');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.write_bare(out, quoted);
                }
                out.push(']');
            }
            Self::Union(members) => {
                if members.iter().any(TypeHint::is_parameterized) {
                    out.push_str("typing.Union[");
                    for (i, member) in members.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        member.write_bare(out, quoted);
                    }
                    out.push(']');
                } else {
                    for (i, member) in members.iter().enumerate() {
                        if i > 0 {
                            out.push_str(" | ");
                        }
                        member.write_bare(out, quoted);
                    }
                }
            }
        }
    }
}

/// Structural equality; unions compare as sets
impl PartialEq for TypeHint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Never, Self::Never) => true,
            (
                Self::Name { path: a, forward: fa },
                Self::Name { path: b, forward: fb },
            ) => a == b && fa == fb,
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (
                Self::Generic { base: a, args: xs },
                Self::Generic { base: b, args: ys },
            ) => a == b && xs == ys,
            (Self::Union(a), Self::Union(b)) => {
                a.len() == b.len() && a.iter().all(|m| b.contains(m))
            }
            _ => false,
        }
    }
}

impl Eq for TypeHint {}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// =============================================================================
// Union Builder
// =============================================================================

/// Build a union from candidate hints.
///
/// Nested unions are flattened and bottom members dropped; structurally equal
/// candidates collapse, keeping first-seen order. No survivors yields
/// `Never`, one survivor is returned unwrapped.
pub fn union(candidates: impl IntoIterator<Item = TypeHint>) -> TypeHint {
    let mut members: Vec<TypeHint> = Vec::new();
    for candidate in candidates {
        match candidate {
            TypeHint::Never => {}
            TypeHint::Union(inner) => {
                for member in inner {
                    push_unique(&mut members, member);
                }
            }
            other => push_unique(&mut members, other),
        }
    }

    match members.len() {
        0 => TypeHint::Never,
        1 => members.pop().unwrap_or(TypeHint::Never),
        _ => TypeHint::Union(members),
    }
}

fn push_unique(members: &mut Vec<TypeHint>, hint: TypeHint) {
    if !members.contains(&hint) {
        members.push(hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeHint {
        TypeHint::builtin("int")
    }

    fn point() -> TypeHint {
        TypeHint::class("Point")
    }

    #[test]
    fn test_union_empty_is_never() {
        assert_eq!(union(Vec::<TypeHint>::new()), TypeHint::Never);
        assert_eq!(union([TypeHint::Never, TypeHint::Never]), TypeHint::Never);
    }

    #[test]
    fn test_union_single_unwrapped() {
        assert_eq!(union([int()]), int());
        assert_eq!(union([int(), int()]), int());
        assert_eq!(union([int(), TypeHint::Never]), int());
    }

    #[test]
    fn test_union_flattens_and_ignores_order() {
        let a = TypeHint::builtin("str");
        let nested = union([union([int(), a.clone()]), point()]);
        let flat = union([int(), a.clone(), point()]);
        assert_eq!(nested, flat);
        assert_eq!(union([a.clone(), int()]), union([int(), a]));
        assert_eq!(nested.members().len(), 3);
    }

    #[test]
    fn test_union_idempotent() {
        let u = union([int(), point()]);
        assert_eq!(union([u.clone(), u.clone()]), u);
        assert_eq!(union([u.clone(), int()]), u);
    }

    #[test]
    fn test_render_plain_union() {
        assert_eq!(TypeHint::optional(int()).render(), "int | None");
    }

    #[test]
    fn test_render_quotes_whole_union() {
        let hint = union([point(), TypeHint::class("Point.Mutable"), TypeHint::none()]);
        assert_eq!(hint.render(), "\"Point | Point.Mutable | None\"");
    }

    #[test]
    fn test_render_generic_union_syntax() {
        let tuple = TypeHint::generic("tuple", vec![point(), TypeHint::builtin("...")]);
        let list = TypeHint::generic("list", vec![point()]);
        assert_eq!(
            union([tuple, list]).render(),
            "\"typing.Union[tuple[Point, ...], list[Point]]\""
        );
    }

    #[test]
    fn test_shield_builtins() {
        let hint = union([
            TypeHint::generic("list", vec![int(), TypeHint::builtin("str")]),
            TypeHint::class("int"),
            TypeHint::none(),
        ]);
        assert_eq!(
            hint.shield_builtins(&["int", "list"]).render(),
            "\"typing.Union[builtins.list[builtins.int, str], int, None]\""
        );
        assert_eq!(int().shield_builtins(&[]).render(), "int");
    }

    #[test]
    fn test_render_literal_quoting() {
        let lit = TypeHint::Literal(vec!["?".into(), "RED".into()]);
        assert_eq!(lit.render(), "typing.Literal[\"?\", \"RED\"]");

        let keyed = TypeHint::generic("soia.KeyedItems", vec![point(), lit]);
        assert_eq!(
            keyed.render(),
            "\"soia.KeyedItems[Point, typing.Literal['?', 'RED']]\""
        );
    }

    #[test]
    fn test_render_never() {
        assert_eq!(TypeHint::Never.render(), "typing.Never");
    }
}
