//! Code Generation
//!
//! Generates Python modules from a resolved schema graph.
//!
//! Architecture:
//! - CodegenContext: Immutable after build() - holds the record map and the
//!   recursion analysis
//! - TypeProjector: Pure projection of a type expression under a flavor
//! - Emitters: Record, descriptor and module emitters that only consume the
//!   projector and the record map
//!
//! Modules are generated independently; a failing module never blocks another.

pub mod code;
pub mod hints;
pub mod module;
pub mod names;
pub mod project;
pub mod records;
pub mod spec;

pub use hints::{union, TypeHint};
pub use names::NameResolver;
pub use project::{Flavor, TypeProjector};
pub use spec::ModuleSpec;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::{CodegenError, Result};
use crate::graph::{validate_recursion_markers, Module, RecordMap, RecursionAnalysis, SchemaGraph};

// =============================================================================
// CodegenContext
// =============================================================================

/// Immutable codegen context - frozen after build().
///
/// The record map must be complete before any module is emitted, since
/// cross-module references resolve into sibling modules.
pub struct CodegenContext<'g> {
    graph: &'g SchemaGraph,
    records: RecordMap<'g>,
    analysis: RecursionAnalysis,
    config: GeneratorConfig,
}

impl<'g> CodegenContext<'g> {
    /// Build the record map and recursion analysis for `graph`
    pub fn build(graph: &'g SchemaGraph, config: GeneratorConfig) -> Self {
        let records = RecordMap::build(graph);
        let analysis = RecursionAnalysis::compute(&records);
        debug!(
            modules = graph.modules.len(),
            records = records.len(),
            cycles = analysis.cyclic_group_count(),
            "Built codegen context"
        );
        Self {
            graph,
            records,
            analysis,
            config,
        }
    }

    pub fn graph(&self) -> &'g SchemaGraph {
        self.graph
    }

    pub fn records(&self) -> &RecordMap<'g> {
        &self.records
    }

    pub fn analysis(&self) -> &RecursionAnalysis {
        &self.analysis
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Total record count, nested records included
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    fn projector<'s>(&'s self, module: &'s Module) -> TypeProjector<'s, 'g> {
        TypeProjector::new(&self.records, NameResolver::new(&module.path))
    }

    /// Validate one module and build its reflection descriptor
    pub fn module_spec(&self, module: &Module) -> Result<ModuleSpec> {
        validate_recursion_markers(module, &self.analysis)?;
        spec::module_spec(&self.projector(module), module)
    }

    /// Generate one module; any contract violation abandons the whole module
    pub fn generate_module(&self, module: &Module) -> Result<GeneratedModule> {
        debug!(module = %module.path, "Generating module");
        let descriptor = self.module_spec(module)?;
        let code = self::module::emit_module(&self.projector(module), module, &descriptor)?;
        Ok(GeneratedModule {
            source_path: module.path.clone(),
            output_path: names::output_path(&module.path),
            code,
            record_count: descriptor.records.len(),
        })
    }

    /// Generate every module, collecting failures per module
    pub fn generate_all(&self) -> GenerationReport {
        let mut report = GenerationReport::default();
        for module in &self.graph.modules {
            match self.generate_module(module) {
                Ok(generated) => report.modules.push(generated),
                Err(error) => {
                    warn!(module = %module.path, error = %error, "Module generation failed");
                    report.failures.push(ModuleFailure {
                        source_path: module.path.clone(),
                        error,
                    });
                }
            }
        }
        report
    }
}

// =============================================================================
// Generated Output
// =============================================================================

/// Output for one schema module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    /// e.g. `geometry/shapes.soia`
    pub source_path: String,
    /// e.g. `geometry/shapes.py`, relative to the output root
    pub output_path: String,
    /// Generated Python source
    pub code: String,
    /// Number of classes generated, nested included
    pub record_count: usize,
}

/// A module that could not be generated
#[derive(Debug)]
pub struct ModuleFailure {
    pub source_path: String,
    pub error: CodegenError,
}

/// Result of [`CodegenContext::generate_all`]
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub modules: Vec<GeneratedModule>,
    pub failures: Vec<ModuleFailure>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.modules.iter().map(|m| m.record_count).sum()
    }

    /// Write every generated module under `root`, creating directories
    pub fn write_to(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.modules.len());
        for module in &self.modules {
            let path = root.join(&module.output_path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &module.code)?;
            debug!(path = %path.display(), "Wrote module");
            written.push(path);
        }
        Ok(written)
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Generate every module of the graph stored at `path`
pub fn generate_from_path(path: &Path, config: GeneratorConfig) -> Result<GenerationReport> {
    let graph = SchemaGraph::from_path(path)?;
    let ctx = CodegenContext::build(&graph, config);
    Ok(ctx.generate_all())
}
