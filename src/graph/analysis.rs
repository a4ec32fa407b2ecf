//! Record Graph Analysis
//!
//! Computes strongly connected components (SCCs) of the record reference graph
//! and checks that every field marked recursive actually points back into its
//! owner's cycle. Markers are trusted, not recomputed: a field that closes a
//! cycle without being marked is the frontend's responsibility.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::{walk_records, Module, RecordKey, RecordMap};
use crate::error::{CodegenError, Result};

// =============================================================================
// Analysis Result
// =============================================================================

/// SCC membership for every record
#[derive(Debug, Clone, Default)]
pub struct RecursionAnalysis {
    /// record -> SCC id
    scc_of: HashMap<RecordKey, usize>,
    /// Number of SCCs with more than one member or a self-edge
    cyclic_groups: usize,
}

impl RecursionAnalysis {
    /// Build the reference graph over every record in the map and group it
    pub fn compute(records: &RecordMap<'_>) -> Self {
        let mut graph: DiGraph<RecordKey, ()> = DiGraph::new();
        let mut nodes: HashMap<&RecordKey, NodeIndex> = HashMap::new();

        let mut keys: Vec<&RecordKey> = records.iter().map(|(k, _)| k).collect();
        keys.sort();
        for key in &keys {
            nodes.insert(*key, graph.add_node((*key).clone()));
        }

        for key in &keys {
            let Some(location) = records.get(key) else {
                continue;
            };
            let from = nodes[*key];
            for field in &location.record.fields {
                let Some(ty) = &field.ty else { continue };
                for target in ty.record_refs() {
                    // Dangling references surface later as UnresolvedRecord
                    if let Some(&to) = nodes.get(target) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        let mut scc_of = HashMap::new();
        let mut cyclic_groups = 0;
        for (scc_id, scc) in kosaraju_scc(&graph).into_iter().enumerate() {
            let self_loop = scc.len() == 1 && graph.contains_edge(scc[0], scc[0]);
            if scc.len() > 1 || self_loop {
                cyclic_groups += 1;
            }
            for idx in scc {
                if let Some(key) = graph.node_weight(idx) {
                    scc_of.insert(key.clone(), scc_id);
                }
            }
        }

        Self {
            scc_of,
            cyclic_groups,
        }
    }

    pub fn same_cycle(&self, a: &RecordKey, b: &RecordKey) -> bool {
        match (self.scc_of.get(a), self.scc_of.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn cyclic_group_count(&self) -> usize {
        self.cyclic_groups
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Fail if a field of `module` is marked recursive but cannot reach its owner
pub fn validate_recursion_markers(module: &Module, analysis: &RecursionAnalysis) -> Result<()> {
    for (ancestors, record) in walk_records(module) {
        let names: Vec<&str> = ancestors.iter().map(|r| r.name.as_str()).collect();
        let owner = RecordKey::new(&module.path, &names);

        for field in record.fields.iter().filter(|f| f.recursive) {
            let closes_cycle = field
                .ty
                .as_ref()
                .map(|ty| {
                    ty.record_refs()
                        .into_iter()
                        .any(|target| analysis.same_cycle(&owner, target))
                })
                .unwrap_or(false);
            if !closes_cycle {
                return Err(CodegenError::InconsistentRecursionMarker {
                    record: owner.to_string(),
                    field: field.name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SchemaGraph;

    fn graph(json: &str) -> SchemaGraph {
        SchemaGraph::from_json_str(json).unwrap()
    }

    const MUTUAL: &str = r#"{
        "modules": [{
            "path": "m.soia",
            "records": [
                {"kind": "struct", "name": "A", "fields": [
                    {"name": "b", "number": 0, "recursive": true,
                     "type": {"kind": "optional", "inner": {"kind": "record", "key": "m.soia:B"}}}
                ]},
                {"kind": "struct", "name": "B", "fields": [
                    {"name": "a", "number": 0, "recursive": true,
                     "type": {"kind": "array", "item": {"kind": "record", "key": "m.soia:A"}}}
                ]},
                {"kind": "struct", "name": "C", "fields": [
                    {"name": "a", "number": 0, "type": {"kind": "record", "key": "m.soia:A"}}
                ]}
            ]
        }]
    }"#;

    #[test]
    fn test_mutual_recursion_groups() {
        let g = graph(MUTUAL);
        let map = RecordMap::build(&g);
        let analysis = RecursionAnalysis::compute(&map);

        let a = RecordKey("m.soia:A".into());
        let b = RecordKey("m.soia:B".into());
        let c = RecordKey("m.soia:C".into());
        assert!(analysis.same_cycle(&a, &b));
        assert!(!analysis.same_cycle(&a, &c));
        assert_eq!(analysis.cyclic_group_count(), 1);

        validate_recursion_markers(&g.modules[0], &analysis).unwrap();
    }

    #[test]
    fn test_bogus_marker_rejected() {
        let g = graph(
            r#"{
            "modules": [{
                "path": "m.soia",
                "records": [
                    {"kind": "struct", "name": "Leaf", "fields": []},
                    {"kind": "struct", "name": "Node", "fields": [
                        {"name": "leaf", "number": 0, "recursive": true,
                         "type": {"kind": "record", "key": "m.soia:Leaf"}}
                    ]}
                ]
            }]
        }"#,
        );
        let map = RecordMap::build(&g);
        let analysis = RecursionAnalysis::compute(&map);

        let err = validate_recursion_markers(&g.modules[0], &analysis).unwrap_err();
        match err {
            CodegenError::InconsistentRecursionMarker { record, field } => {
                assert_eq!(record, "m.soia:Node");
                assert_eq!(field, "leaf");
            }
            other => panic!("Expected InconsistentRecursionMarker, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_cyclic() {
        let g = graph(
            r#"{
            "modules": [{
                "path": "m.soia",
                "records": [
                    {"kind": "struct", "name": "Tree", "fields": [
                        {"name": "children", "number": 0, "recursive": true,
                         "type": {"kind": "array", "item": {"kind": "record", "key": "m.soia:Tree"}}}
                    ]}
                ]
            }]
        }"#,
        );
        let map = RecordMap::build(&g);
        let analysis = RecursionAnalysis::compute(&map);
        assert_eq!(analysis.cyclic_group_count(), 1);
        validate_recursion_markers(&g.modules[0], &analysis).unwrap();
    }
}
