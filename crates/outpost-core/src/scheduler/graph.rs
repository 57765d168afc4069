//! Dependency graph with in-degree bookkeeping.
//!
//! Nodes are dense indices. Edges point from a dependency to its dependents,
//! so completing a node touches only its outgoing edges: O(V+E) over a whole run.
use std::collections::{HashMap, VecDeque};

use crate::{error::SchedulerError, scheduler::TaskId};

#[derive(Debug)]
pub(crate) struct DependencyGraph {
    dependents: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

impl DependencyGraph {
    /// Builds the graph for `nodes` given as `(id, description, deps)` in index order.
    ///
    /// Fails on a dependency that is not among `nodes` and on any cycle.
    pub(crate) fn build<'a, I>(nodes: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = (&'a TaskId, &'a str, &'a [TaskId])>,
        I::IntoIter: Clone,
    {
        let nodes = nodes.into_iter();
        let index: HashMap<&TaskId, usize> = nodes
            .clone()
            .enumerate()
            .map(|(i, (id, _, _))| (id, i))
            .collect();

        let len = index.len();
        let mut dependents = vec![Vec::new(); len];
        let mut in_degree = vec![0; len];
        let mut names = Vec::with_capacity(len);

        for (i, (_, description, deps)) in nodes.enumerate() {
            names.push(description);
            for dep in deps {
                let Some(&d) = index.get(dep) else {
                    return Err(SchedulerError::UnknownDependency {
                        task: description.to_string(),
                        dependency: dep.clone(),
                    });
                };
                dependents[d].push(i);
                in_degree[i] += 1;
            }
        }

        let graph = Self {
            dependents,
            in_degree,
        };
        graph.check_acyclic(&names)?;
        Ok(graph)
    }

    /// Kahn's algorithm on a scratch copy of the in-degrees.
    fn check_acyclic(&self, names: &[&str]) -> Result<(), SchedulerError> {
        let mut in_degree = self.in_degree.clone();
        let mut queue: VecDeque<usize> = self.roots().collect();
        let mut visited = 0;

        while let Some(n) = queue.pop_front() {
            visited += 1;
            for &m in &self.dependents[n] {
                in_degree[m] -= 1;
                if in_degree[m] == 0 {
                    queue.push_back(m);
                }
            }
        }

        if visited == self.len() {
            return Ok(());
        }
        let stuck = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0)
            .map(|(i, _)| names[i].to_string())
            .collect();
        Err(SchedulerError::Cycle(stuck))
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.in_degree.len()
    }

    /// Nodes without dependencies.
    pub(crate) fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
    }

    /// Records completion of `node`; returns the dependents that became ready.
    pub(crate) fn complete(&mut self, node: usize) -> Vec<usize> {
        let mut ready = Vec::new();
        for &m in &self.dependents[node] {
            self.in_degree[m] -= 1;
            if self.in_degree[m] == 0 {
                ready.push(m);
            }
        }
        ready
    }
}
