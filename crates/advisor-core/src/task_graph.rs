//! Directed acyclic graph of tasks with declared data dependencies.
//!
//! A task names its predecessors up front and, when run, can read only their
//! outputs. Tasks execute one at a time in topological order; among tasks
//! that are ready together, the one added first runs first.

use std::collections::HashMap;

use crate::error::{Error, Result};

type TaskFn<V> = Box<dyn Fn(&TaskInputs<'_, V>) -> anyhow::Result<V> + Send + Sync>;

struct TaskNode<V> {
    name: String,
    deps: Vec<String>,
    run: TaskFn<V>,
}

/// Read access to the outputs of a task's declared predecessors.
pub struct TaskInputs<'a, V> {
    task: &'a str,
    outputs: HashMap<&'a str, &'a V>,
}

impl<'a, V> TaskInputs<'a, V> {
    pub fn get(&self, dep: &str) -> anyhow::Result<&'a V> {
        self.outputs
            .get(dep)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("task '{}' did not declare '{}' as an input", self.task, dep))
    }

    pub fn len(&self) -> usize { self.outputs.len() }
    pub fn is_empty(&self) -> bool { self.outputs.is_empty() }
}

pub struct TaskGraph<V> {
    nodes: Vec<TaskNode<V>>,
}

impl<V> Default for TaskGraph<V> {
    fn default() -> Self { Self { nodes: Vec::new() } }
}

impl<V> TaskGraph<V> {
    pub fn new() -> Self { Self::default() }

    pub fn add_task<F>(&mut self, name: &str, deps: &[&str], run: F) -> Result<()>
    where
        F: Fn(&TaskInputs<'_, V>) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(Error::InvalidConfig(format!("duplicate task '{name}'")));
        }
        if deps.contains(&name) {
            return Err(Error::InvalidConfig(format!("task '{name}' depends on itself")));
        }
        self.nodes.push(TaskNode {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            run: Box::new(run),
        });
        Ok(())
    }

    /// Task names in execution order. Fails on unknown dependencies and cycles.
    pub fn execution_order(&self) -> Result<Vec<&str>> {
        let position: HashMap<&str, usize> = self.nodes.iter().enumerate().map(|(i, n)| (n.name.as_str(), i)).collect();
        let mut pending = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.deps {
                let &d = position
                    .get(dep.as_str())
                    .ok_or_else(|| Error::InvalidConfig(format!("task '{}' depends on unknown task '{}'", node.name, dep)))?;
                pending[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut done = vec![false; self.nodes.len()];
        while order.len() < self.nodes.len() {
            let next = (0..self.nodes.len()).find(|&i| !done[i] && pending[i] == 0);
            let Some(i) = next else {
                let stuck: Vec<&str> = (0..self.nodes.len()).filter(|&i| !done[i]).map(|i| self.nodes[i].name.as_str()).collect();
                return Err(Error::InvalidConfig(format!("task graph has a cycle among: {}", stuck.join(", "))));
            };
            done[i] = true;
            order.push(self.nodes[i].name.as_str());
            for &j in &dependents[i] {
                pending[j] -= 1;
            }
        }
        Ok(order)
    }

    /// Runs every task and returns all outputs keyed by task name.
    /// Stops at the first failing task.
    pub fn run(&self) -> Result<HashMap<String, V>> {
        let order: Vec<String> = self.execution_order()?.into_iter().map(str::to_string).collect();
        let mut outputs: HashMap<String, V> = HashMap::new();
        for name in order {
            let Some(node) = self.nodes.iter().find(|n| n.name == name) else { continue };
            let inputs = TaskInputs {
                task: node.name.as_str(),
                outputs: node
                    .deps
                    .iter()
                    .filter_map(|d| outputs.get(d).map(|v| (d.as_str(), v)))
                    .collect(),
            };
            let value = (node.run)(&inputs).map_err(|e| Error::Operation(format!("task '{}' failed: {}", node.name, e)))?;
            outputs.insert(name, value);
        }
        Ok(outputs)
    }
}
