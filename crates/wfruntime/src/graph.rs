//! Dependency graph construction and deterministic topological ordering.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use wfcore::{FlowError, Result};

/// A node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
}

/// Runnables and the edges between them.
///
/// An edge `a -> b` means `a` depends on `b`.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from `(id, name)` pairs and a dependent -> dependencies
    /// map.
    ///
    /// Every node is present even without edges. Ids in `dependencies` that
    /// do not resolve to a node are skipped, so building never fails;
    /// cycles are only detected when sorting.
    pub fn build<'a, I>(nodes: I, dependencies: &HashMap<String, Vec<String>>) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for (id, name) in nodes {
            if index.contains_key(id) {
                continue;
            }
            let idx = graph.add_node(GraphNode {
                id: id.to_string(),
                name: name.to_string(),
            });
            index.insert(id.to_string(), idx);
        }

        for (dependent_id, dependency_ids) in dependencies {
            let Some(&dependent) = index.get(dependent_id) else {
                continue;
            };
            for dependency_id in dependency_ids {
                if let Some(&dependency) = index.get(dependency_id) {
                    graph.add_edge(dependent, dependency, ());
                }
            }
        }

        Self { graph, index }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Direct dependencies of `id`, one entry per edge.
    pub fn dependencies_of(&self, id: &str) -> Vec<&GraphNode> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<&GraphNode> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|dep| &self.graph[dep])
            .collect();
        // petgraph yields the most recently added edge first
        deps.reverse();
        deps
    }
}

/// Order the graph so that every node comes after all of its dependencies.
///
/// Cycles are found with a depth-first walk that keeps a temporary mark on
/// the nodes of the current path; meeting one of those again aborts with
/// [`FlowError::CyclicDependency`] and no order at all. The walk's result is
/// then made deterministic: among the nodes whose dependencies are already
/// placed, the one with the smallest id goes next.
pub fn topological_sort(graph: &DependencyGraph) -> Result<Vec<GraphNode>> {
    let order = depth_first_order(graph)?;
    Ok(stabilize(graph, &order)
        .into_iter()
        .map(|idx| graph.graph[idx].clone())
        .collect())
}

/// Post-order of an iterative DFS over dependency edges, dependencies first.
fn depth_first_order(graph: &DependencyGraph) -> Result<Vec<NodeIndex>> {
    let g = &graph.graph;
    let mut visited: HashSet<NodeIndex> = HashSet::with_capacity(g.node_count());
    let mut in_progress: HashSet<NodeIndex> = HashSet::new();
    let mut order = Vec::with_capacity(g.node_count());

    for start in g.node_indices() {
        if visited.contains(&start) {
            continue;
        }

        in_progress.insert(start);
        let mut stack = vec![(start, g.neighbors_directed(start, Direction::Outgoing))];

        while let Some((node, children)) = stack.last_mut() {
            let node = *node;
            match children.next() {
                Some(child) => {
                    if in_progress.contains(&child) {
                        tracing::debug!(
                            "Cycle detected between {} and {}",
                            g[node].id,
                            g[child].id
                        );
                        return Err(FlowError::CyclicDependency);
                    }
                    if visited.contains(&child) {
                        continue;
                    }
                    in_progress.insert(child);
                    stack.push((child, g.neighbors_directed(child, Direction::Outgoing)));
                }
                None => {
                    stack.pop();
                    in_progress.remove(&node);
                    visited.insert(node);
                    order.push(node);
                }
            }
        }
    }

    Ok(order)
}

/// Re-sort a valid order so that ties between independent nodes break by
/// ascending id.
fn stabilize(graph: &DependencyGraph, order: &[NodeIndex]) -> Vec<NodeIndex> {
    let g = &graph.graph;

    // outstanding dependency edges per node
    let mut pending: HashMap<NodeIndex, usize> = order
        .iter()
        .map(|&idx| (idx, g.neighbors_directed(idx, Direction::Outgoing).count()))
        .collect();

    // ids are unique once built, so name and index never decide anything
    let key = |idx: NodeIndex| Reverse((g[idx].id.as_str(), g[idx].name.as_str(), idx));

    let mut ready: BinaryHeap<_> = order
        .iter()
        .copied()
        .filter(|idx| pending[idx] == 0)
        .map(key)
        .collect();

    let mut result = Vec::with_capacity(order.len());
    while let Some(Reverse((_, _, idx))) = ready.pop() {
        result.push(idx);
        for dependent in g.neighbors_directed(idx, Direction::Incoming) {
            if let Some(count) = pending.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push(key(dependent));
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn depth_first_order_puts_dependencies_first() {
        let graph = DependencyGraph::build(
            [("c", "C"), ("b", "B"), ("a", "A")],
            &deps(&[("c", &["b"]), ("b", &["a"])]),
        );
        let order: Vec<&str> = depth_first_order(&graph)
            .unwrap()
            .into_iter()
            .map(|idx| graph.graph[idx].id.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_edges_do_not_stall_the_sort() {
        let graph = DependencyGraph::build(
            [("a", ""), ("b", "")],
            &deps(&[("b", &["a", "a"])]),
        );
        assert_eq!(graph.edge_count(), 2);
        let ids: Vec<String> = topological_sort(&graph)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
