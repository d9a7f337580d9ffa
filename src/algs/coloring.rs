//! Greedy colouring of the element dual graph.
//!
//! Elements of one colour share no dual edge at the chosen commonality. At
//! node-level commonality that means they share no node, so they never write
//! the same entry of the assembled matrix and a colour can be evaluated in
//! one parallel batch.

use serde::{Deserialize, Serialize};

use crate::algs::dual_graph::{Adjacency, Commonality, dual};
use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

pub type Color = usize;

/// Sequential greedy vertex colouring.
///
/// Vertices are visited in index order; each takes the smallest colour not
/// already used by a coloured neighbour. `edges` may list a pair in either
/// orientation and more than once. Self-loops are ignored.
///
/// # Panics
///
/// Panics if an edge endpoint is not below `n`.
pub fn sequential_vertex_coloring(n: usize, edges: &[(usize, usize)]) -> Vec<Color> {
    let mut neighbours = vec![Vec::new(); n];
    for &(a, b) in edges {
        if a != b {
            neighbours[a].push(b);
            neighbours[b].push(a);
        }
    }

    let mut colors = vec![usize::MAX; n];
    // mark[c] == v means colour c is taken by a neighbour of v
    let mut mark = vec![usize::MAX; n.max(1)];
    for v in 0..n {
        for &u in &neighbours[v] {
            let c = colors[u];
            if c != usize::MAX {
                mark[c] = v;
            }
        }
        let c = (0..).find(|&c| mark[c] != v).unwrap_or(0);
        colors[v] = c;
    }
    colors
}

/// A colour per element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colors {
    colors: Vec<Color>,
}

impl Colors {
    #[inline]
    pub fn color(&self, element: usize) -> Color {
        self.colors[element]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Color] {
        &self.colors
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Number of distinct colours used.
    pub fn count(&self) -> usize {
        self.colors.iter().max().map_or(0, |&c| c + 1)
    }

    /// Element indices per colour, colours ascending, elements ascending.
    pub fn batches(&self) -> Vec<Vec<usize>> {
        let mut batches = vec![Vec::new(); self.count()];
        for (e, &c) in self.colors.iter().enumerate() {
            batches[c].push(e);
        }
        batches
    }

    /// True when no edge of `adjacency` joins two elements of one colour.
    pub fn is_proper(&self, adjacency: &Adjacency) -> bool {
        adjacency
            .iter()
            .all(|(a, ns)| ns.iter().all(|&b| a == b || self.colors[a] != self.colors[b]))
    }
}

/// Colour the elements so that dual-adjacent elements (at `common`) differ.
pub fn build<T: Copy>(mesh: &Mesh<T>, common: Commonality) -> Result<Colors, MeshError> {
    let adjacency = dual(mesh, common)?;
    let edges = adjacency.edges();
    let colors = Colors {
        colors: sequential_vertex_coloring(adjacency.len(), &edges),
    };
    log::debug!(
        "coloured {} elements with {} colours ({} dual edges, common = {})",
        colors.len(),
        colors.count(),
        edges.len(),
        common.get()
    );
    Ok(colors)
}
