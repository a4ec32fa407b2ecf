//! Module Emitter
//!
//! Sequences one generated Python module: header, imports, class stubs for
//! every record in declaration order, methods, constants, and the final
//! registration call carrying the reflection descriptor.
//!
//! Class bodies live under `if typing.TYPE_CHECKING:`; at runtime the classes
//! are built by `soia._module_initializer.init_module` from the descriptor.
//!
//! `import builtins` is added only when a declaration of the module shadows
//! a builtin its annotations use.

use super::code::{render, Code};
use super::hints::{TypeHint, BUILTINS_MODULE};
use super::names::{module_alias, python_module, shadowed_builtins};
use super::project::{Flavor, TypeProjector};
use super::records::RecordEmitter;
use super::spec::ModuleSpec;
use crate::error::Result;
use crate::graph::{Module, RecordKey};

/// Emit the full text of `module`; `spec` is its already-built descriptor
pub fn emit_module(projector: &TypeProjector<'_, '_>, module: &Module, spec: &ModuleSpec) -> Result<String> {
    let names = projector.names();
    let shadowed = shadowed_builtins(module);
    let mut nodes = vec![
        Code::line(format!("# Generated from {} - DO NOT EDIT", module.path)),
        Code::Blank,
    ];
    if !shadowed.is_empty() {
        nodes.push(Code::line(format!("import {}", BUILTINS_MODULE)));
    }
    nodes.extend([
        Code::line("import typing"),
        Code::Blank,
        Code::line("import soia"),
        Code::line("import soia._module_initializer"),
    ]);

    let mut imported: Vec<&str> = Vec::new();
    for path in &module.imports {
        if path == &module.path || imported.contains(&path.as_str()) {
            continue;
        }
        imported.push(path.as_str());
    }
    if !imported.is_empty() {
        nodes.push(Code::Blank);
        for path in imported {
            nodes.push(Code::line(format!(
                "import {} as {}",
                python_module(path),
                module_alias(path)
            )));
        }
    }

    let emitter = RecordEmitter::new(projector, &shadowed);
    let mut stubs = Vec::new();
    for record in &module.records {
        let key = RecordKey::new(&module.path, &[record.name.as_str()]);
        let location = projector.records().resolve(&key)?;
        if !stubs.is_empty() {
            stubs.push(Code::Blank);
        }
        stubs.push(emitter.emit(location)?);
    }

    if !module.methods.is_empty() {
        stubs.push(Code::Blank);
    }
    for method in &module.methods {
        let request = projector.project(&method.request, Flavor::Frozen, false)?;
        let response = projector.project(&method.response, Flavor::Frozen, false)?;
        let hint = TypeHint::generic(
            "typing.Final",
            vec![TypeHint::generic("soia.Method", vec![request, response])],
        )
        .shield_builtins(&shadowed);
        stubs.push(Code::line(format!("{}: {}", names.module_variable(&method.name), hint)));
    }

    if !module.constants.is_empty() {
        stubs.push(Code::Blank);
    }
    for constant in &module.constants {
        let ty = projector.project(&constant.ty, Flavor::Frozen, false)?;
        let hint = TypeHint::generic("typing.Final", vec![ty]).shield_builtins(&shadowed);
        stubs.push(Code::line(format!("{}: {}", names.module_variable(&constant.name), hint)));
    }

    nodes.push(Code::Blank);
    nodes.push(Code::block("if typing.TYPE_CHECKING", stubs));

    // JSON never contains three consecutive quotes, so a raw triple-quoted
    // literal holds it verbatim
    nodes.push(Code::Blank);
    nodes.push(Code::line(
        "soia._module_initializer.init_module(globals(), r\"\"\"",
    ));
    nodes.push(Code::Verbatim(spec.to_json_pretty()?));
    nodes.push(Code::line("\"\"\")"));

    Ok(render(&nodes))
}
