//! Resource graph construction, reference checking and topological order.
//!
//! Nodes are registered on a [`GraphBuilder`]; sealing it checks every
//! reference and explicit dependency against the registered ids and computes
//! the creation order with Kahn's algorithm using alphabetical tie-breaking.
//! The sealed [`ResourceGraph`] is immutable: a new configuration produces a
//! new graph.

use super::error::{PlanError, Result};
use super::hasher;
use super::resource::{LogicalId, RemovalPolicy, Resource, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// One resource plus its plan-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub resource: Resource,
    pub removal_policy: RemovalPolicy,
    /// Ordering constraints not implied by any reference
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    /// Annotations rendered as the resource's `Metadata`
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Value>,
}

impl GraphNode {
    /// Union of referenced and explicitly ordered ids, sorted.
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.resource
            .references()
            .into_iter()
            .chain(self.metadata.values().flat_map(Value::references))
            .chain(self.depends_on.iter().map(String::as_str))
            .collect()
    }
}

/// Why one node must be created before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The dependent consumes an attribute of the dependency.
    Reference,
    /// Declared ordering with no attribute consumed.
    Explicit,
}

/// A directed edge: `from` must exist before `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: LogicalId,
    pub to: LogicalId,
    pub kind: EdgeKind,
}

/// Mutable registry used while sub-builders run.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    nodes: IndexMap<LogicalId, GraphNode>,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: IndexMap::new(),
        }
    }

    /// Register a resource with the default (destroy) removal policy.
    pub fn add(&mut self, id: &str, resource: Resource) -> Result<()> {
        self.add_with_policy(id, resource, RemovalPolicy::Destroy)
    }

    pub fn add_with_policy(
        &mut self,
        id: &str,
        resource: Resource,
        removal_policy: RemovalPolicy,
    ) -> Result<()> {
        if self.nodes.contains_key(id) {
            return Err(PlanError::DuplicateResource(id.to_string()));
        }
        tracing::trace!(id, kind = resource.type_name(), "registered resource");
        self.nodes.insert(
            id.to_string(),
            GraphNode {
                resource,
                removal_policy,
                depends_on: Vec::new(),
                metadata: IndexMap::new(),
            },
        );
        Ok(())
    }

    /// Declare that `dependent` must be created after `dependency`.
    /// Both ids must already be registered.
    pub fn depend(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        if !self.nodes.contains_key(dependency) {
            return Err(PlanError::Reference {
                from: dependent.to_string(),
                to: dependency.to_string(),
            });
        }
        if dependent == dependency {
            return Err(PlanError::Cycle(vec![dependent.to_string()]));
        }
        let node = self
            .nodes
            .get_mut(dependent)
            .ok_or_else(|| PlanError::UnknownResource(dependent.to_string()))?;
        if !node.depends_on.iter().any(|d| d == dependency) {
            node.depends_on.push(dependency.to_string());
        }
        Ok(())
    }

    /// Attach a metadata entry to a registered resource. References inside
    /// the value count as dependencies.
    pub fn annotate(&mut self, id: &str, key: &str, value: Value) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| PlanError::UnknownResource(id.to_string()))?;
        node.metadata.insert(key.to_string(), value);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check every reference and compute creation order.
    pub fn seal(self) -> Result<ResourceGraph> {
        for (id, node) in &self.nodes {
            for dep in node.dependencies() {
                if !self.nodes.contains_key(dep) {
                    return Err(PlanError::Reference {
                        from: id.clone(),
                        to: dep.to_string(),
                    });
                }
            }
        }
        let order = topological_order(&self.nodes)?;
        Ok(ResourceGraph {
            name: self.name,
            nodes: self.nodes,
            order,
        })
    }
}

/// Sealed, reference-checked, acyclic resource graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGraph {
    name: String,
    nodes: IndexMap<LogicalId, GraphNode>,
    #[serde(skip)]
    order: Vec<LogicalId>,
}

impl ResourceGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.nodes.get(id).map(|n| &n.resource)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&LogicalId, &GraphNode)> {
        self.nodes.iter()
    }

    /// Creation order: every node appears after all of its dependencies.
    pub fn execution_order(&self) -> &[LogicalId] {
        &self.order
    }

    /// All edges, sorted.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (id, node) in &self.nodes {
            let referenced = node
                .resource
                .references()
                .into_iter()
                .chain(node.metadata.values().flat_map(Value::references));
            for dep in referenced {
                edges.push(Edge {
                    from: dep.to_string(),
                    to: id.clone(),
                    kind: EdgeKind::Reference,
                });
            }
            for dep in &node.depends_on {
                edges.push(Edge {
                    from: dep.clone(),
                    to: id.clone(),
                    kind: EdgeKind::Explicit,
                });
            }
        }
        edges.sort();
        edges.dedup();
        edges
    }

    /// Ids `id` must wait for, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.nodes
            .get(id)
            .map(|n| n.dependencies().into_iter().collect())
            .unwrap_or_default()
    }

    /// Ids that wait for `id`, sorted.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let mut dependents: Vec<&str> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.dependencies().contains(id))
            .map(|(k, _)| k.as_str())
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// True when `to` depends on `from` directly.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.nodes
            .get(to)
            .is_some_and(|n| n.dependencies().contains(from))
    }

    /// Ids of every node with the given platform type, in registration order.
    pub fn ids_of_type(&self, type_name: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.resource.type_name() == type_name)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Hash of one node: type, properties, policy and dependencies.
    pub fn node_hash(&self, id: &str) -> Result<Option<String>> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(None);
        };
        let deps: Vec<&str> = node.dependencies().into_iter().collect();
        let hash = hasher::hash_json(&(id, node.resource.type_name(), node, deps))?;
        Ok(Some(hash))
    }

    /// Hash of the whole graph, independent of registration order.
    pub fn fingerprint(&self) -> Result<String> {
        let mut ids: Vec<&LogicalId> = self.nodes.keys().collect();
        ids.sort();
        let mut hashes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(h) = self.node_hash(id)? {
                hashes.push(h);
            }
        }
        let parts: Vec<&str> = hashes.iter().map(String::as_str).collect();
        Ok(hasher::composite_hash(&parts))
    }
}

/// Kahn's algorithm with sorted tie-breaking for determinism.
fn topological_order(nodes: &IndexMap<LogicalId, GraphNode>) -> Result<Vec<LogicalId>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for id in nodes.keys() {
        in_degree.insert(id.as_str(), 0);
        adjacency.insert(id.as_str(), Vec::new());
    }

    for (id, node) in nodes {
        for dep in node.dependencies() {
            if let Some(list) = adjacency.get_mut(dep) {
                list.push(id.as_str());
            }
            if let Some(degree) = in_degree.get_mut(id.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut zero_degree: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| *id)
        .collect();
    zero_degree.sort_unstable();
    let mut queue: VecDeque<&str> = zero_degree.into_iter().collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());

        let mut next_ready: Vec<&str> = Vec::new();
        if let Some(neighbors) = adjacency.get(current) {
            for &neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(neighbor);
                    }
                }
            }
        }
        next_ready.sort_unstable();
        queue.extend(next_ready);
    }

    if order.len() != nodes.len() {
        let mut cycle_members: Vec<String> = nodes
            .keys()
            .filter(|id| !order.contains(*id))
            .cloned()
            .collect();
        cycle_members.sort();
        return Err(PlanError::Cycle(cycle_members));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::{LogGroup, Parameter, Value};

    fn log_group() -> Resource {
        Resource::LogGroup(LogGroup {
            retention_days: 731,
        })
    }

    fn param(value: Value) -> Resource {
        Resource::Parameter(Parameter {
            name: "/p".to_string(),
            value,
            description: String::new(),
        })
    }

    #[test]
    fn test_graph_linear_order() {
        let mut b = GraphBuilder::new("t");
        b.add("c", param(Value::reference("b"))).unwrap();
        b.add("b", param(Value::reference("a"))).unwrap();
        b.add("a", log_group()).unwrap();
        let g = b.seal().unwrap();
        assert_eq!(g.execution_order(), ["a", "b", "c"]);
    }

    #[test]
    fn test_graph_alphabetical_tie_break() {
        let mut b = GraphBuilder::new("t");
        b.add("beta", log_group()).unwrap();
        b.add("alpha", log_group()).unwrap();
        let g = b.seal().unwrap();
        assert_eq!(g.execution_order(), ["alpha", "beta"]);
    }

    #[test]
    fn test_graph_diamond() {
        let mut b = GraphBuilder::new("t");
        b.add("top", log_group()).unwrap();
        b.add("left", param(Value::reference("top"))).unwrap();
        b.add("right", param(Value::attr("top", "Arn"))).unwrap();
        b.add("bottom", param(Value::sub("${left}-${right}"))).unwrap();
        let g = b.seal().unwrap();
        assert_eq!(g.execution_order(), ["top", "left", "right", "bottom"]);
        assert_eq!(g.dependencies_of("bottom"), vec!["left", "right"]);
        assert_eq!(g.dependents_of("top"), vec!["left", "right"]);
    }

    #[test]
    fn test_graph_explicit_edges() {
        let mut b = GraphBuilder::new("t");
        b.add("logs", log_group()).unwrap();
        b.add("app", log_group()).unwrap();
        b.depend("app", "logs").unwrap();
        b.depend("app", "logs").unwrap();
        let g = b.seal().unwrap();
        assert_eq!(g.get("app").unwrap().depends_on, vec!["logs"]);
        assert_eq!(
            g.edges(),
            vec![Edge {
                from: "logs".to_string(),
                to: "app".to_string(),
                kind: EdgeKind::Explicit,
            }]
        );
        assert!(g.has_edge("logs", "app"));
        assert!(!g.has_edge("app", "logs"));
    }

    #[test]
    fn test_graph_dangling_reference_fails_at_seal() {
        let mut b = GraphBuilder::new("t");
        b.add("p", param(Value::reference("ghost"))).unwrap();
        match b.seal() {
            Err(PlanError::Reference { from, to }) => {
                assert_eq!(from, "p");
                assert_eq!(to, "ghost");
            }
            other => panic!("expected reference error, got {:?}", other),
        }
    }

    #[test]
    fn test_graph_depend_on_unregistered() {
        let mut b = GraphBuilder::new("t");
        b.add("a", log_group()).unwrap();
        assert!(matches!(
            b.depend("a", "ghost"),
            Err(PlanError::Reference { .. })
        ));
        match b.depend("a", "ghost") {
            Err(PlanError::Reference { from, to }) => {
                assert_eq!(from, "a");
                assert_eq!(to, "ghost");
            }
            other => panic!("expected reference error, got {:?}", other),
        }
        match b.depend("ghost", "a") {
            Err(PlanError::UnknownResource(id)) => assert_eq!(id, "ghost"),
            other => panic!("expected unknown resource, got {:?}", other),
        }
        assert!(matches!(b.depend("a", "a"), Err(PlanError::Cycle(_))));
    }

    #[test]
    fn test_graph_annotate() {
        let mut b = GraphBuilder::new("t");
        b.add("logs", log_group()).unwrap();
        b.add("app", log_group()).unwrap();
        b.annotate("app", "Source", Value::reference("logs")).unwrap();
        b.annotate("app", "Note", Value::literal("x")).unwrap();
        assert!(matches!(
            b.annotate("ghost", "Note", Value::literal("x")),
            Err(PlanError::UnknownResource(id)) if id == "ghost"
        ));
        let g = b.seal().unwrap();
        assert_eq!(g.get("app").unwrap().metadata.len(), 2);
        assert_eq!(g.dependencies_of("app"), vec!["logs"]);
        assert_eq!(g.execution_order(), ["logs", "app"]);
        assert_eq!(
            g.edges(),
            vec![Edge {
                from: "logs".to_string(),
                to: "app".to_string(),
                kind: EdgeKind::Reference,
            }]
        );
    }

    #[test]
    fn test_graph_annotate_dangling_reference_fails_at_seal() {
        let mut b = GraphBuilder::new("t");
        b.add("app", log_group()).unwrap();
        b.annotate("app", "Source", Value::reference("ghost")).unwrap();
        assert!(matches!(b.seal(), Err(PlanError::Reference { .. })));
    }

    #[test]
    fn test_graph_duplicate_id() {
        let mut b = GraphBuilder::new("t");
        b.add("a", log_group()).unwrap();
        assert!(matches!(
            b.add("a", log_group()),
            Err(PlanError::DuplicateResource(id)) if id == "a"
        ));
    }

    #[test]
    fn test_graph_cycle() {
        let mut b = GraphBuilder::new("t");
        b.add("a", param(Value::reference("b"))).unwrap();
        b.add("b", param(Value::reference("a"))).unwrap();
        b.add("c", log_group()).unwrap();
        match b.seal() {
            Err(PlanError::Cycle(members)) => assert_eq!(members, vec!["a", "b"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_graph_fingerprint_ignores_registration_order() {
        let mut b1 = GraphBuilder::new("t");
        b1.add("a", log_group()).unwrap();
        b1.add("b", param(Value::reference("a"))).unwrap();
        let mut b2 = GraphBuilder::new("t");
        b2.add("b", param(Value::reference("a"))).unwrap();
        b2.add("a", log_group()).unwrap();
        let f1 = b1.seal().unwrap().fingerprint().unwrap();
        let f2 = b2.seal().unwrap().fingerprint().unwrap();
        assert_eq!(f1, f2);
    }

    #[test]
    fn test_graph_node_hash_tracks_changes() {
        let mut b1 = GraphBuilder::new("t");
        b1.add("a", log_group()).unwrap();
        let mut b2 = GraphBuilder::new("t");
        b2.add_with_policy("a", log_group(), RemovalPolicy::Retain)
            .unwrap();
        let h1 = b1.seal().unwrap().node_hash("a").unwrap().unwrap();
        let h2 = b2.seal().unwrap().node_hash("a").unwrap().unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_graph_node_hash_missing() {
        let g = GraphBuilder::new("t").seal().unwrap();
        assert!(g.node_hash("nope").unwrap().is_none());
        assert!(g.is_empty());
    }
}
