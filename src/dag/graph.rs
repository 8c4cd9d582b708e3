// src/dag/graph.rs

use std::collections::BTreeSet;

use thiserror::Error;

/// Errors raised by [`DirectedGraph`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("vertex {vertex} is out of range for a graph of {size} vertices")]
    VertexOutOfRange { vertex: usize, size: usize },
}

/// Colour of a vertex during the cycle search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Fixed-size directed graph over dense task indices.
///
/// An edge `from -> to` means "`from` depends on `to`". The vertex set never
/// changes after construction; edges are only ever added while the plan is
/// built and removed while the run progresses, so a graph that starts
/// acyclic stays acyclic.
///
/// Both directions are stored as ordered sets, so every scan visits vertices
/// in index order and a duplicate edge is a no-op.
#[derive(Debug, Clone)]
pub struct DirectedGraph {
    /// `dependencies[v]`: vertices `v` still points to.
    dependencies: Vec<BTreeSet<usize>>,
    /// `dependents[v]`: vertices that still point to `v`.
    dependents: Vec<BTreeSet<usize>>,
}

impl DirectedGraph {
    /// Create a graph with `size` vertices and no edges.
    pub fn new(size: usize) -> Self {
        Self {
            dependencies: vec![BTreeSet::new(); size],
            dependents: vec![BTreeSet::new(); size],
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Total number of edges currently present.
    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(BTreeSet::len).sum()
    }

    /// Record that `from` depends on `to`.
    ///
    /// Self-loops are accepted (they make the graph cyclic); adding an edge
    /// that already exists does nothing.
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<(), GraphError> {
        self.check(from)?;
        self.check(to)?;
        self.dependencies[from].insert(to);
        self.dependents[to].insert(from);
        Ok(())
    }

    /// Whether the edge `from -> to` is present.
    pub fn has_edge(&self, from: usize, to: usize) -> Result<bool, GraphError> {
        self.check(from)?;
        self.check(to)?;
        Ok(self.dependencies[from].contains(&to))
    }

    /// The unresolved dependencies of `vertex`, in index order.
    pub fn successors(&self, vertex: usize) -> Result<Vec<usize>, GraphError> {
        self.check(vertex)?;
        Ok(self.dependencies[vertex].iter().copied().collect())
    }

    /// Vertices that still depend on `vertex`, in index order.
    pub fn dependents(&self, vertex: usize) -> Result<Vec<usize>, GraphError> {
        self.check(vertex)?;
        Ok(self.dependents[vertex].iter().copied().collect())
    }

    /// True iff `vertex` has at least one unresolved dependency.
    pub fn has_outgoing_edges(&self, vertex: usize) -> Result<bool, GraphError> {
        self.check(vertex)?;
        Ok(!self.dependencies[vertex].is_empty())
    }

    /// Clear every edge pointing at `dependency`.
    ///
    /// Returns the former dependents in index order.
    pub fn remove_edges_into(&mut self, dependency: usize) -> Result<Vec<usize>, GraphError> {
        self.check(dependency)?;
        let dependents = std::mem::take(&mut self.dependents[dependency]);
        for &dependent in &dependents {
            self.dependencies[dependent].remove(&dependency);
        }
        Ok(dependents.into_iter().collect())
    }

    /// Whole-graph acyclicity check.
    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    /// Three-colour depth-first search over dependency edges.
    ///
    /// Returns a vertex that lies on a cycle, if any. The traversal keeps an
    /// explicit stack of `(vertex, successors still to visit)` frames, so its
    /// depth is bounded by heap memory rather than the thread stack.
    pub fn find_cycle(&self) -> Option<usize> {
        let mut marks = vec![Mark::White; self.len()];

        for root in 0..self.len() {
            if marks[root] != Mark::White {
                continue;
            }

            marks[root] = Mark::Gray;
            let mut stack = vec![(root, self.dependencies[root].iter())];

            while let Some((vertex, successors)) = stack.last_mut() {
                let vertex = *vertex;
                match successors.next() {
                    Some(&next) => match marks[next] {
                        Mark::Gray => return Some(next),
                        Mark::Black => {}
                        Mark::White => {
                            marks[next] = Mark::Gray;
                            stack.push((next, self.dependencies[next].iter()));
                        }
                    },
                    None => {
                        marks[vertex] = Mark::Black;
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    fn check(&self, vertex: usize) -> Result<(), GraphError> {
        if vertex < self.len() {
            Ok(())
        } else {
            Err(GraphError::VertexOutOfRange {
                vertex,
                size: self.len(),
            })
        }
    }
}
