//! Dependency graph over tables and views
//!
//! An edge `A -> B` means "A depends on B and must be created after it". Tables get an edge
//! to every table they reference, through a relationship record or a field's foreign key
//! reference. Views get an edge to every table they read. Self references are left out:
//! they constrain nothing about creation order.

use crate::error::{EntityKind, SchemaError};
use crate::models::Project;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Node of the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub id: String,
    pub kind: EntityKind,
    /// Position in the project's collection, used to break ordering ties
    pub order: usize,
}

/// What produced a dependency edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOrigin {
    Relationship(String),
    ForeignKey { table_id: String, field_id: String },
    ViewSource,
}

/// Directed dependency graph of a project
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, DependencyOrigin>,
    index: HashMap<(EntityKind, String), NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph for a project.
    ///
    /// References to missing entities are skipped; integrity checks report them.
    pub fn build(project: &Project) -> Self {
        let mut dependency_graph = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        };

        // Tables, then metric views, then traditional views; node order follows insertion
        let mut order = 0;
        for table in &project.tables {
            dependency_graph.add_node(&table.id, EntityKind::Table, order);
            order += 1;
        }
        for view in &project.metric_views {
            dependency_graph.add_node(&view.id, EntityKind::MetricView, order);
            order += 1;
        }
        for view in &project.traditional_views {
            dependency_graph.add_node(&view.id, EntityKind::TraditionalView, order);
            order += 1;
        }

        for relationship in &project.relationships {
            let (dependent, _) = relationship.dependent_location();
            dependency_graph.add_table_edge(
                dependent,
                &relationship.source_table_id,
                DependencyOrigin::Relationship(relationship.id.clone()),
            );
        }
        for table in &project.tables {
            for field in &table.fields {
                if let Some(reference) = &field.foreign_key_reference {
                    dependency_graph.add_table_edge(
                        &table.id,
                        &reference.referenced_table_id,
                        DependencyOrigin::ForeignKey {
                            table_id: table.id.clone(),
                            field_id: field.id.clone(),
                        },
                    );
                }
            }
        }

        for view in &project.metric_views {
            for table_id in view.dependency_table_ids() {
                dependency_graph.add_view_edge(EntityKind::MetricView, &view.id, table_id);
            }
        }
        for view in &project.traditional_views {
            for table_id in &view.referenced_table_ids {
                dependency_graph.add_view_edge(EntityKind::TraditionalView, &view.id, table_id);
            }
        }

        dependency_graph
    }

    fn add_node(&mut self, id: &str, kind: EntityKind, order: usize) {
        let key = (kind, id.to_string());
        if self.index.contains_key(&key) {
            return;
        }
        let node = self.graph.add_node(DependencyNode {
            id: id.to_string(),
            kind,
            order,
        });
        self.index.insert(key, node);
    }

    fn node(&self, kind: EntityKind, id: &str) -> Option<NodeIndex> {
        self.index.get(&(kind, id.to_string())).copied()
    }

    fn add_table_edge(&mut self, dependent: &str, dependency: &str, origin: DependencyOrigin) {
        if dependent == dependency {
            return;
        }
        if let (Some(from), Some(to)) = (
            self.node(EntityKind::Table, dependent),
            self.node(EntityKind::Table, dependency),
        ) && self.graph.find_edge(from, to).is_none()
        {
            self.graph.add_edge(from, to, origin);
        }
    }

    fn add_view_edge(&mut self, kind: EntityKind, view_id: &str, table_id: &str) {
        if let (Some(from), Some(to)) = (self.node(kind, view_id), self.node(EntityKind::Table, table_id))
            && self.graph.find_edge(from, to).is_none()
        {
            self.graph.add_edge(from, to, DependencyOrigin::ViewSource);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ids of the tables `table_id` directly depends on, in project order
    pub fn dependencies_of(&self, table_id: &str) -> Vec<&str> {
        let Some(node) = self.node(EntityKind::Table, table_id) else {
            return Vec::new();
        };
        let mut deps: Vec<&DependencyNode> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| &self.graph[n])
            .collect();
        deps.sort_by_key(|n| n.order);
        deps.into_iter().map(|n| n.id.as_str()).collect()
    }

    /// Every cycle among tables, as table id lists in project order.
    ///
    /// Uses Tarjan's strongly connected components; each component with more than one
    /// table is a cycle. Views only have outgoing edges and never appear here.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<&DependencyNode>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut nodes: Vec<&DependencyNode> = component
                    .into_iter()
                    .map(|n| &self.graph[n])
                    .filter(|n| n.kind == EntityKind::Table)
                    .collect();
                nodes.sort_by_key(|n| n.order);
                nodes
            })
            .filter(|nodes| nodes.len() > 1)
            .collect();
        cycles.sort_by_key(|nodes| nodes.first().map(|n| n.order));
        cycles
            .into_iter()
            .map(|nodes| nodes.into_iter().map(|n| n.id.clone()).collect())
            .collect()
    }

    /// Cycle errors, one per strongly connected component
    pub fn cycle_errors(&self) -> Vec<SchemaError> {
        self.cycles()
            .into_iter()
            .map(|table_ids| SchemaError::CyclicDependency { table_ids })
            .collect()
    }

    /// Stable topological order of every node: dependencies first, ties broken by project
    /// order (tables, then metric views, then traditional views).
    ///
    /// Returns the cycle errors when the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<&DependencyNode>, Vec<SchemaError>> {
        let mut remaining: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(usize, NodeIndex)>> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(n, _)| Reverse((self.graph[*n].order, *n)))
            .collect();

        let mut ordered = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, node))) = ready.pop() {
            ordered.push(&self.graph[node]);
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                if let Some(count) = remaining.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse((self.graph[dependent].order, dependent)));
                    }
                }
            }
        }

        if ordered.len() < self.graph.node_count() {
            return Err(self.cycle_errors());
        }
        Ok(ordered)
    }

    /// Shortest dependency path from one table to another, if any
    pub fn find_path(&self, from_table: &str, to_table: &str) -> Option<Vec<String>> {
        let from = self.node(EntityKind::Table, from_table)?;
        let to = self.node(EntityKind::Table, to_table)?;

        let mut visited = HashSet::from([from]);
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![self.graph[to].id.clone()];
                let mut current = to;
                while let Some(&previous) = parent.get(&current) {
                    path.push(self.graph[previous].id.clone());
                    current = previous;
                }
                path.reverse();
                return Some(path);
            }
            for neighbor in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if visited.insert(neighbor) {
                    parent.insert(neighbor, node);
                    queue.push_back(neighbor);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field, MetricView, Relationship, Table};

    fn table(id: &str) -> Table {
        Table::new(id.to_lowercase())
            .with_id(id)
            .with_field(Field::new("id", DataType::Int).with_id(format!("{}_pk", id)).primary_key())
    }

    fn reference(project: &mut Project, from: &str, to: &str) {
        let field = Field::new(format!("{}_id", to.to_lowercase()), DataType::Int)
            .with_id(format!("{}_{}", from, to))
            .references(to, format!("{}_pk", to));
        if let Some(t) = project.table_mut(from) {
            t.fields.push(field);
        }
    }

    #[test]
    fn orders_dependencies_first_with_stable_ties() {
        let mut project = Project::new("p", "main", "sales");
        for id in ["C", "A", "B", "D"] {
            project.tables.push(table(id));
        }
        reference(&mut project, "C", "B");
        reference(&mut project, "B", "A");
        project.metric_views.push(MetricView::new("mv", "C").with_id("MV"));

        let graph = DependencyGraph::build(&project);
        let order: Vec<&str> = graph
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["A", "B", "C", "D", "MV"]);
    }

    #[test]
    fn relationship_and_reference_edges_are_deduplicated() {
        let mut project = Project::new("p", "main", "sales");
        project.tables.push(table("A"));
        project.tables.push(table("B"));
        reference(&mut project, "B", "A");
        project
            .relationships
            .push(Relationship::new("A", "A_pk", "B", "B_A"));
        let graph = DependencyGraph::build(&project);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependencies_of("B"), vec!["A"]);
    }

    #[test]
    fn self_reference_is_not_a_cycle() {
        let mut project = Project::new("p", "main", "sales");
        project.tables.push(table("A"));
        reference(&mut project, "A", "A");
        let graph = DependencyGraph::build(&project);
        assert!(graph.cycles().is_empty());
        assert_eq!(graph.topological_order().unwrap().len(), 1);
    }

    #[test]
    fn reports_each_cycle_in_project_order() {
        let mut project = Project::new("p", "main", "sales");
        for id in ["A", "B", "C", "X", "Y"] {
            project.tables.push(table(id));
        }
        reference(&mut project, "A", "B");
        reference(&mut project, "B", "C");
        reference(&mut project, "C", "A");
        reference(&mut project, "Y", "X");
        reference(&mut project, "X", "Y");

        let graph = DependencyGraph::build(&project);
        assert_eq!(
            graph.cycles(),
            vec![
                vec!["A".to_string(), "B".to_string(), "C".to_string()],
                vec!["X".to_string(), "Y".to_string()],
            ]
        );
        assert_eq!(graph.topological_order().unwrap_err().len(), 2);
        assert_eq!(
            graph.find_path("A", "C"),
            Some(vec!["A".to_string(), "B".to_string(), "C".to_string()])
        );
    }
}
