//! Schema Python Generator
//!
//! Turns a resolved schema graph (modules of struct and enum records, methods
//! and constants) into typed Python modules for the `soia` runtime.
//!
//! ## Features
//!
//! - **Type Projection**: Every schema type projects to four Python views
//!   (frozen, mutable, maybe-mutable, initializer)
//! - **Recursion Cut**: Fields closing a cycle never expose a mutable view
//! - **Name Escaping**: Identifiers that collide with Python keywords or
//!   generated members get a trailing underscore; builtins a module shadows
//!   are written as `builtins.<name>` in its annotations
//! - **Reflection Descriptor**: Each module embeds the JSON metadata its
//!   runtime registers at import time
//! - **Reference Runtime**: [`runtime`] interprets the same descriptor to
//!   check copy-on-write, promotion and keyed-lookup semantics
//!
//! ## Output Layout
//!
//! ```text
//! soiagen/
//! ├── geometry/
//! │   └── shapes.py      <- geometry/shapes.soia
//! └── app.py             <- app.soia
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod graph;
pub mod runtime;

pub use codegen::{
    generate_from_path, CodegenContext, GeneratedModule, GenerationReport, ModuleFailure,
    ModuleSpec,
};
pub use config::{GeneratorConfig, PygenConfig};
pub use error::{CodegenError, Result};
pub use graph::{RecordKey, RecordMap, SchemaGraph};
pub use runtime::{EnumValue, FrozenStruct, MutableStruct, TypeRegistry, Value};
