use std::collections::HashMap;
use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};
use tracing::debug;

use crate::catalog::TableName;

/// Foreign key graph: an edge `a -> b` means table `a` references table `b`
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: Graph<TableName, ()>,
    node_map: HashMap<TableName, NodeIndex>,
}

/// A chain of references that leads back to its first table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub tables: Vec<TableName>,
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            write!(f, "{} -> ", table)?;
        }
        match self.tables.first() {
            Some(first) => write!(f, "{}", first),
            None => Ok(()),
        }
    }
}

/// Emission order plus every cycle met while computing it
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub order: Vec<TableName>,
    pub cycles: Vec<Cycle>,
}

impl Resolution {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn describe_cycles(&self) -> String {
        self.cycles
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

struct Frame {
    node: NodeIndex,
    dependencies: Vec<NodeIndex>,
    next: usize,
}

impl DependencyGraph {
    /// Create a graph with one node per table, in the given order
    pub fn new(tables: &[TableName]) -> Self {
        let mut graph = Self::default();
        for table in tables {
            graph.add_node(table.clone());
        }
        graph
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, table: TableName) -> NodeIndex {
        if let Some(&node_id) = self.node_map.get(&table) {
            node_id
        } else {
            let node_id = self.graph.add_node(table.clone());
            self.node_map.insert(table, node_id);
            node_id
        }
    }

    /// Record that `table` references `referenced`
    ///
    /// Returns false when `referenced` is not one of the graph's tables; such
    /// references do not take part in ordering.
    pub fn add_dependency(&mut self, table: &TableName, referenced: &str) -> bool {
        let Some(&from) = self.node_map.get(table) else {
            return false;
        };
        let target = TableName::parse(referenced)
            .ok()
            .and_then(|name| self.node_map.get(&name).copied());

        match target {
            Some(to) => {
                self.graph.update_edge(from, to, ());
                true
            }
            None => {
                debug!("Ignoring reference from {} to unknown table {}", table, referenced);
                false
            }
        }
    }

    /// Referenced tables of `table`, sorted by name
    pub fn dependencies_of(&self, table: &TableName) -> Vec<TableName> {
        match self.node_map.get(table) {
            Some(&node) => self
                .sorted_dependencies(node)
                .into_iter()
                .map(|n| self.graph[n].clone())
                .collect(),
            None => vec![],
        }
    }

    fn sorted_dependencies(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        deps.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        deps.dedup();
        deps
    }

    /// Linearize the graph so every table follows the tables it references
    ///
    /// Iterative depth-first post-order over the tables in insertion order. A
    /// reference to a table that is still in progress closes a cycle: it is
    /// recorded and skipped, so every table is still emitted exactly once.
    /// Self references never affect the order.
    pub fn resolve(&self) -> Resolution {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut resolution = Resolution::default();

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }

            marks[root.index()] = Mark::InProgress;
            let mut stack = vec![Frame {
                node: root,
                dependencies: self.sorted_dependencies(root),
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                if frame.next == frame.dependencies.len() {
                    marks[frame.node.index()] = Mark::Done;
                    resolution.order.push(self.graph[frame.node].clone());
                    stack.pop();
                    continue;
                }

                let current = frame.node;
                let dep = frame.dependencies[frame.next];
                frame.next += 1;

                if dep == current {
                    continue;
                }

                match marks[dep.index()] {
                    Mark::Unvisited => {
                        marks[dep.index()] = Mark::InProgress;
                        stack.push(Frame {
                            node: dep,
                            dependencies: self.sorted_dependencies(dep),
                            next: 0,
                        });
                    }
                    Mark::InProgress => {
                        let start = stack.iter().position(|f| f.node == dep).unwrap_or(0);
                        let cycle = Cycle {
                            tables: stack[start..]
                                .iter()
                                .map(|f| self.graph[f.node].clone())
                                .collect(),
                        };
                        debug!("Foreign key cycle: {}", cycle);
                        resolution.cycles.push(cycle);
                    }
                    Mark::Done => {}
                }
            }
        }

        resolution
    }

    /// Get the number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Output the dependency graph in Graphviz DOT format
    pub fn to_graphviz(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph foreign_keys {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=rounded];\n\n");

        for node_index in self.graph.node_indices() {
            output.push_str(&format!("  \"{}\";\n", self.graph[node_index]));
        }

        output.push('\n');

        for edge_index in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge_index) {
                let style = if source == target { "dashed" } else { "solid" };
                output.push_str(&format!(
                    "  \"{}\" -> \"{}\" [style={}];\n",
                    self.graph[source], self.graph[target], style
                ));
            }
        }

        output.push_str("}\n");
        output
    }
}
