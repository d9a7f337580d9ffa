//! Structural non-zeros of the assembled matrix, derived from nodal adjacency.
//!
//! Row `n` holds the diagonal `(n, n)` followed by `(n, m)` for every
//! neighbour `m` of `n`, in adjacency order. Isolated nodes still own their
//! diagonal. The same traversal fixes the slot numbering of the flat value
//! array that assembly writes into.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::algs::dual_graph::{Adjacency, nodal};
use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

/// `(row, col)` of one matrix entry.
pub type Coordinate = (usize, usize);

/// Compressed-row sparsity pattern: `cols[rows[i]..rows[i+1]]` are the
/// columns of row `i`, diagonal first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparsePattern {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl SparsePattern {
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len() - 1
    }

    #[inline]
    pub fn nonzeros(&self) -> usize {
        self.cols.len()
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[usize] {
        &self.cols[self.rows[i]..self.rows[i + 1]]
    }
}

/// Stable bijection between coordinates and slots of the value array.
///
/// Slots are handed out in first-seen order; a coordinate seen again keeps
/// the slot it already has.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coordinates {
    slots: HashMap<Coordinate, usize>,
    order: Vec<Coordinate>,
}

impl Coordinates {
    fn with_capacity(n: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(n),
            order: Vec::with_capacity(n),
        }
    }

    fn insert(&mut self, at: Coordinate) -> usize {
        let next = self.order.len();
        let slot = *self.slots.entry(at).or_insert(next);
        if slot == next {
            self.order.push(at);
        }
        slot
    }

    /// Slot of `(row, col)`, if that entry is structurally non-zero.
    #[inline]
    pub fn slot(&self, row: usize, col: usize) -> Option<usize> {
        self.slots.get(&(row, col)).copied()
    }

    /// Coordinate stored in `slot`.
    #[inline]
    pub fn coordinate(&self, slot: usize) -> Option<Coordinate> {
        self.order.get(slot).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(coordinate, slot)` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, usize)> + '_ {
        self.order.iter().enumerate().map(|(slot, &c)| (c, slot))
    }
}

fn row_entries(adjacency: &Adjacency) -> impl Iterator<Item = Coordinate> + '_ {
    adjacency
        .iter()
        .flat_map(|(n, ns)| std::iter::once((n, n)).chain(ns.iter().map(move |&m| (n, m))))
}

/// Sum over nodes of `1 + degree`.
pub fn nonzeros(adjacency: &Adjacency) -> usize {
    adjacency.len() + adjacency.adjncy().len()
}

pub fn csr(adjacency: &Adjacency) -> SparsePattern {
    let mut rows = Vec::with_capacity(adjacency.len() + 1);
    let mut cols = Vec::with_capacity(nonzeros(adjacency));
    rows.push(0);
    for (n, ns) in adjacency.iter() {
        cols.push(n);
        cols.extend_from_slice(ns);
        rows.push(cols.len());
    }
    SparsePattern { rows, cols }
}

pub fn coordinates(adjacency: &Adjacency) -> Coordinates {
    let mut table = Coordinates::with_capacity(nonzeros(adjacency));
    for at in row_entries(adjacency) {
        table.insert(at);
    }
    table
}

pub fn nonzeros_of<T: Copy>(mesh: &Mesh<T>) -> Result<usize, MeshError> {
    Ok(nonzeros(&nodal(mesh)?))
}

pub fn csr_of<T: Copy>(mesh: &Mesh<T>) -> Result<SparsePattern, MeshError> {
    let pattern = csr(&nodal(mesh)?);
    log::debug!(
        "sparsity pattern: {} rows, {} non-zeros",
        pattern.row_count(),
        pattern.nonzeros()
    );
    Ok(pattern)
}

pub fn coordinates_of<T: Copy>(mesh: &Mesh<T>) -> Result<Coordinates, MeshError> {
    Ok(coordinates(&nodal(mesh)?))
}
