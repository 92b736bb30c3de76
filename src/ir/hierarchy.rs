use super::scope::Scope;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// The inheritance lattice of a scope
///
/// One directed graph holds both relations: a superclass edge from parent
/// to subclass, and an interface edge from interface to implementor.
/// Transitive queries run a DFS from the named type, so malformed cyclic
/// chains in the input terminate at a revisited node instead of looping.
/// Nodes exist for every descriptor mentioned as a type, superclass or
/// interface, so queries against external framework types (which host no
/// class in the scope) still see their program-side subtypes.
#[derive(Debug)]
pub struct ClassHierarchy {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl ClassHierarchy {
    pub fn build(scope: &Scope) -> Self {
        let mut hierarchy = Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };

        for class in scope.classes() {
            let child = hierarchy.node(&class.name);
            if let Some(super_name) = &class.super_class {
                let parent = hierarchy.node(super_name);
                hierarchy.graph.update_edge(parent, child, ());
            }
            for interface in &class.interfaces {
                let parent = hierarchy.node(interface);
                hierarchy.graph.update_edge(parent, child, ());
            }
        }

        hierarchy
    }

    fn node(&mut self, descriptor: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(descriptor) {
            return idx;
        }
        let idx = self.graph.add_node(descriptor.to_string());
        self.nodes.insert(descriptor.to_string(), idx);
        idx
    }

    /// Transitive subtypes of `descriptor`, excluding the type itself
    pub fn get_all_children(&self, descriptor: &str) -> HashSet<String> {
        self.descendants(descriptor)
    }

    /// Transitive subtypes whose interface closure includes `interface`
    pub fn get_all_implementors(&self, interface: &str) -> HashSet<String> {
        self.descendants(interface)
    }

    fn descendants(&self, descriptor: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let Some(&start) = self.nodes.get(descriptor) else {
            return result;
        };

        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                result.insert(self.graph[node].clone());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DexClass;

    fn scope() -> Scope {
        [
            DexClass::new("La;"),
            DexClass::new("Lb;").extending("La;"),
            DexClass::new("Lc;").extending("Lb;"),
            DexClass::new("Ld;").implementing("Li;"),
            DexClass::new("Le;").extending("Ld;"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_children_are_transitive() {
        let hierarchy = ClassHierarchy::build(&scope());
        let children = hierarchy.get_all_children("La;");

        assert!(children.contains("Lb;"));
        assert!(children.contains("Lc;"));
        assert!(!children.contains("La;"));
        assert!(!children.contains("Ld;"));
    }

    #[test]
    fn test_implementors_include_subtypes() {
        let hierarchy = ClassHierarchy::build(&scope());
        let implementors = hierarchy.get_all_implementors("Li;");

        assert!(implementors.contains("Ld;"));
        assert!(implementors.contains("Le;"));
        assert!(!implementors.contains("La;"));
    }

    #[test]
    fn test_unknown_type_has_no_children() {
        let hierarchy = ClassHierarchy::build(&scope());
        assert!(hierarchy.get_all_children("Lmissing;").is_empty());
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let scope: Scope = [
            DexClass::new("La;").extending("Lb;"),
            DexClass::new("Lb;").extending("La;"),
        ]
        .into_iter()
        .collect();

        let hierarchy = ClassHierarchy::build(&scope);
        let children = hierarchy.get_all_children("La;");
        assert!(children.contains("Lb;"));
    }
}
