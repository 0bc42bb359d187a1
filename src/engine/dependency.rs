// ABOUTME: Dependency graph management and execution planning
// ABOUTME: Handles topological ordering and parallel execution levels for workflow tasks

use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};
use std::collections::{HashMap, HashSet};

use crate::parser::{ValidationError, Workflow};

pub struct DependencyGraph {
    graph: Graph<String, ()>,
    task_indices: HashMap<String, NodeIndex>,
    declaration_order: Vec<String>,
}

/// Tasks grouped into levels; every task in a level only depends on earlier levels
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub levels: Vec<Vec<String>>,
    pub total_tasks: usize,
}

impl DependencyGraph {
    /// Create a dependency graph from a workflow
    pub fn from_workflow(workflow: &Workflow) -> Result<Self, ValidationError> {
        let mut graph = Graph::new();
        let mut task_indices = HashMap::new();
        let mut declaration_order = Vec::with_capacity(workflow.tasks.len());

        for task in &workflow.tasks {
            if task_indices.contains_key(&task.id) {
                return Err(ValidationError::DuplicateTask {
                    task: task.id.clone(),
                });
            }
            let node_index = graph.add_node(task.id.clone());
            task_indices.insert(task.id.clone(), node_index);
            declaration_order.push(task.id.clone());
        }

        for task in &workflow.tasks {
            let task_node = task_indices[&task.id];

            for dependency in &task.depends_on {
                if dependency == &task.id {
                    return Err(ValidationError::SelfDependency {
                        task: task.id.clone(),
                    });
                }
                match task_indices.get(dependency) {
                    // Edge runs from dependency to dependent
                    Some(&dep_node) => {
                        graph.add_edge(dep_node, task_node, ());
                    }
                    None => {
                        return Err(ValidationError::UnknownDependency {
                            task: task.id.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                }
            }
        }

        let dependency_graph = Self {
            graph,
            task_indices,
            declaration_order,
        };
        dependency_graph.validate()?;

        Ok(dependency_graph)
    }

    /// Reject cycles
    pub fn validate(&self) -> Result<(), ValidationError> {
        toposort(&self.graph, None).map_err(|cycle| ValidationError::CircularDependency {
            tasks: vec![self.graph[cycle.node_id()].clone()],
        })?;
        Ok(())
    }

    /// Group tasks into levels that could run in parallel, keeping declaration order within a level
    pub fn create_execution_plan(&self) -> ExecutionPlan {
        let mut levels = Vec::new();
        let mut placed: HashSet<NodeIndex> = HashSet::new();
        let mut remaining: Vec<NodeIndex> = self
            .declaration_order
            .iter()
            .map(|id| self.task_indices[id])
            .collect();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<NodeIndex>, Vec<NodeIndex>) =
                remaining.into_iter().partition(|&node| {
                    self.graph
                        .neighbors_directed(node, Direction::Incoming)
                        .all(|dep| placed.contains(&dep))
                });

            // Only reachable on a cyclic graph, which validate() rejects
            if ready.is_empty() {
                break;
            }

            placed.extend(ready.iter().copied());
            levels.push(ready.iter().map(|&node| self.graph[node].clone()).collect());
            remaining = blocked;
        }

        ExecutionPlan {
            levels,
            total_tasks: self.task_indices.len(),
        }
    }

    /// Deterministic topological order: level by level, declaration order within a level
    pub fn topological_order(&self) -> Vec<String> {
        self.create_execution_plan()
            .levels
            .into_iter()
            .flatten()
            .collect()
    }

    /// Get all tasks that directly depend on the given task
    pub fn get_dependents(&self, task_id: &str) -> Vec<String> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    /// Get all tasks that the given task directly depends on
    pub fn get_dependencies(&self, task_id: &str) -> Vec<String> {
        self.neighbors(task_id, Direction::Incoming)
    }

    fn neighbors(&self, task_id: &str, direction: Direction) -> Vec<String> {
        let mut found: Vec<String> = match self.task_indices.get(task_id) {
            Some(&node_idx) => self
                .graph
                .neighbors_directed(node_idx, direction)
                .map(|node| self.graph[node].clone())
                .collect(),
            None => Vec::new(),
        };
        found.sort();
        found.dedup();
        found
    }

    /// Get tasks that have no dependencies, in declaration order
    pub fn get_root_tasks(&self) -> Vec<String> {
        self.declaration_order
            .iter()
            .filter(|id| {
                self.graph
                    .neighbors_directed(self.task_indices[*id], Direction::Incoming)
                    .next()
                    .is_none()
            })
            .cloned()
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.task_indices.len()
    }
}

impl ExecutionPlan {
    /// Largest number of tasks that can be in flight at once
    pub fn max_parallelism(&self) -> usize {
        self.levels.iter().map(|level| level.len()).max().unwrap_or(0)
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}
