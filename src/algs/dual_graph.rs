//! Dual (element↔element) and nodal (node↔node) adjacency of a mesh.
//
// Both graphs are produced by METIS from the flattened element→node
// incidence and returned in CSR form:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of entity *i*
// * `adjncy`                 = concatenated neighbour indices
//
// Every entity of the mesh owns a row, including isolated ones (empty row).
// The graphs are symmetric and self-free.

use std::num::NonZeroUsize;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::algs::metis;
use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

/// Minimum number of shared nodes for two elements to be dual-adjacent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commonality(NonZeroUsize);

impl Commonality {
    /// Any shared node.
    pub const NODE: Self = Self(NonZeroUsize::MIN);
    /// A shared edge (two nodes).
    pub const EDGE: Self = Self(match NonZeroUsize::new(2) {
        Some(n) => n,
        None => unreachable!(),
    });
    /// A shared face (three nodes).
    pub const FACE: Self = Self(match NonZeroUsize::new(3) {
        Some(n) => n,
        None => unreachable!(),
    });

    pub fn new(shared_nodes: usize) -> Result<Self, MeshError> {
        NonZeroUsize::new(shared_nodes)
            .map(Self)
            .ok_or(MeshError::ZeroCommonality)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Commonality {
    fn default() -> Self {
        Commonality::EDGE
    }
}

/// CSR adjacency over entities `0..len()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacency {
    xadj: Vec<usize>,
    adjncy: Vec<usize>,
}

impl Adjacency {
    /// Adopt a CSR pair after checking that it is well formed for `n` entities.
    pub fn from_csr(n: usize, xadj: Vec<usize>, adjncy: Vec<usize>) -> Result<Self, MeshError> {
        if xadj.len() != n + 1 {
            return Err(MeshError::MalformedAdjacency(format!(
                "expected {} offsets, got {}",
                n + 1,
                xadj.len()
            )));
        }
        if xadj[0] != 0 || xadj.windows(2).any(|w| w[0] > w[1]) {
            return Err(MeshError::MalformedAdjacency(
                "offsets are not non-decreasing from zero".into(),
            ));
        }
        if xadj[n] != adjncy.len() {
            return Err(MeshError::MalformedAdjacency(format!(
                "last offset {} does not match {} neighbours",
                xadj[n],
                adjncy.len()
            )));
        }
        if let Some(&bad) = adjncy.iter().find(|&&v| v >= n) {
            return Err(MeshError::MalformedAdjacency(format!(
                "neighbour {bad} is out of range for {n} entities"
            )));
        }
        Ok(Self { xadj, adjncy })
    }

    /// Number of entities (rows), isolated ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.xadj.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjncy[self.xadj[i]..self.xadj[i + 1]]
    }

    #[inline]
    pub fn degree(&self, i: usize) -> usize {
        self.xadj[i + 1] - self.xadj[i]
    }

    #[inline]
    pub fn xadj(&self) -> &[usize] {
        &self.xadj
    }

    #[inline]
    pub fn adjncy(&self) -> &[usize] {
        &self.adjncy
    }

    /// `(entity, neighbours)` in entity order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        (0..self.len()).map(move |i| (i, self.neighbors(i)))
    }

    /// Undirected edges `(a, b)` with `a < b`, each listed once, sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.iter()
            .flat_map(|(a, ns)| ns.iter().map(move |&b| (a.min(b), a.max(b))))
            .filter(|&(a, b)| a != b)
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Copy into one neighbour vector per entity.
    pub fn to_nested(&self) -> Vec<Vec<usize>> {
        self.iter().map(|(_, ns)| ns.to_vec()).collect()
    }
}

/// Element→element adjacency at the given commonality.
pub fn dual<T: Copy>(mesh: &Mesh<T>, common: Commonality) -> Result<Adjacency, MeshError> {
    let (eptr, eind) = mesh.incidence();
    let (xadj, adjncy) = metis::mesh_to_dual(mesh.node_count(), &eptr, &eind, common.get())?;
    let adjacency = Adjacency::from_csr(mesh.element_count(), xadj, adjncy)?;
    log::debug!(
        "dual adjacency: {} elements, {} directed edges (common = {})",
        adjacency.len(),
        adjacency.adjncy.len(),
        common.get()
    );
    Ok(adjacency)
}

/// Node→node adjacency: two nodes are neighbours when some element lists both.
pub fn nodal<T: Copy>(mesh: &Mesh<T>) -> Result<Adjacency, MeshError> {
    let (eptr, eind) = mesh.incidence();
    let (xadj, adjncy) = metis::mesh_to_nodal(mesh.node_count(), &eptr, &eind)?;
    let adjacency = Adjacency::from_csr(mesh.node_count(), xadj, adjncy)?;
    log::debug!(
        "nodal adjacency: {} nodes, {} directed edges",
        adjacency.len(),
        adjacency.adjncy.len()
    );
    Ok(adjacency)
}

/// A dual adjacency computed once and reused for repeated partitioning.
#[derive(Clone, Debug)]
pub struct Dual {
    common: Commonality,
    adjacency: Adjacency,
}

impl Dual {
    pub fn new<T: Copy>(mesh: &Mesh<T>, common: Commonality) -> Result<Self, MeshError> {
        Ok(Self {
            common,
            adjacency: dual(mesh, common)?,
        })
    }

    #[inline]
    pub fn commonality(&self) -> Commonality {
        self.common
    }

    #[inline]
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::mesh::{Element, Node};

    fn square() -> Mesh<f32> {
        let nodes = vec![
            Node::new(0.0, 0.0, 0.0),
            Node::new(1.0, 0.0, 0.0),
            Node::new(1.0, 1.0, 0.0),
            Node::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(
            nodes,
            vec![Element::triangle(0, 1, 2), Element::triangle(0, 2, 3)],
        )
        .unwrap()
    }

    fn sorted(xs: &[usize]) -> Vec<usize> {
        let mut v = xs.to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn commonality_rejects_zero() {
        assert!(matches!(
            Commonality::new(0),
            Err(MeshError::ZeroCommonality)
        ));
        assert_eq!(Commonality::new(2).unwrap(), Commonality::EDGE);
        assert_eq!(Commonality::FACE.get(), 3);
    }

    #[test]
    fn from_csr_rejects_inconsistent_offsets() {
        assert!(Adjacency::from_csr(2, vec![0, 2, 1], vec![1]).is_err());
        assert!(Adjacency::from_csr(2, vec![0, 1, 2], vec![1, 2]).is_err());
        assert!(Adjacency::from_csr(2, vec![0, 1], vec![1]).is_err());
        assert!(Adjacency::from_csr(2, vec![0, 1, 2], vec![1, 0]).is_ok());
    }

    #[test]
    fn edges_are_deduplicated_and_ordered() {
        let adj = Adjacency::from_csr(3, vec![0, 2, 3, 4], vec![1, 2, 0, 0]).unwrap();
        assert_eq!(adj.edges(), vec![(0, 1), (0, 2)]);
        assert_eq!(adj.degree(0), 2);
        assert_eq!(adj.to_nested(), vec![vec![1, 2], vec![0], vec![0]]);
    }

    #[test]
    fn square_nodal_and_dual() {
        let mesh = square();
        let n = nodal(&mesh).unwrap();
        assert_eq!(n.len(), 4);
        assert_eq!(sorted(n.neighbors(0)), vec![1, 2, 3]);
        assert_eq!(sorted(n.neighbors(1)), vec![0, 2]);

        let d = dual(&mesh, Commonality::EDGE).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.neighbors(0), &[1]);
        assert_eq!(d.neighbors(1), &[0]);
    }

    #[test]
    fn isolated_entities_keep_empty_rows() {
        let nodes = vec![Node::new(0.0f32, 0.0, 0.0); 7];
        let mesh = Mesh::new(
            nodes,
            vec![Element::triangle(0, 1, 2), Element::triangle(3, 4, 5)],
        )
        .unwrap();
        let d = dual(&mesh, Commonality::NODE).unwrap();
        assert_eq!(d.len(), 2);
        assert!(d.neighbors(0).is_empty() && d.neighbors(1).is_empty());
        let n = nodal(&mesh).unwrap();
        assert_eq!(n.len(), 7);
        assert!(n.neighbors(6).is_empty());
    }
}
