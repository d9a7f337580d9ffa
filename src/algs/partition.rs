//! k-way element partitioning over the dual graph (METIS `PartGraphKway`).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::algs::dual_graph::{Adjacency, Commonality, Dual};
use crate::algs::metis;
use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

pub type PartitionId = usize;

/// Part id per element, for a requested part count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMap {
    parts: Vec<PartitionId>,
    nparts: usize,
}

impl PartitionMap {
    /// Every element in part 0.
    pub fn single(elements: usize) -> Self {
        Self {
            parts: vec![0; elements],
            nparts: 1,
        }
    }

    /// Number of parts that were requested.
    #[inline]
    pub fn nparts(&self) -> usize {
        self.nparts
    }

    /// Number of elements covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    #[inline]
    pub fn part_of(&self, element: usize) -> PartitionId {
        self.parts[element]
    }

    #[inline]
    pub fn parts(&self) -> &[PartitionId] {
        &self.parts
    }

    /// Element indices of every part, ascending, one entry per part id in
    /// `0..nparts` (parts METIS left empty stay empty).
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.nparts];
        for (e, &p) in self.parts.iter().enumerate() {
            groups[p].push(e);
        }
        groups
    }

    /// Number of parts holding at least one element.
    pub fn non_empty(&self) -> usize {
        self.parts.iter().collect::<BTreeSet<_>>().len()
    }

    /// Distinct node count touched by each part.
    pub fn footprints<T: Copy>(&self, mesh: &Mesh<T>) -> Vec<usize> {
        self.groups()
            .iter()
            .map(|group| footprint(mesh, group))
            .collect()
    }
}

/// Distinct node count referenced by a set of elements.
pub(crate) fn footprint<T: Copy>(mesh: &Mesh<T>, elements: &[usize]) -> usize {
    elements
        .iter()
        .flat_map(|&e| mesh.elements()[e].nodes().iter().copied())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Split the vertices of a dual adjacency into `k` parts.
///
/// `k == 1` is answered without calling METIS; `k == 0` is rejected.
pub fn partition_adjacency(dual: &Adjacency, k: usize) -> Result<PartitionMap, MeshError> {
    match k {
        0 => Err(MeshError::ZeroPartitions),
        1 => Ok(PartitionMap::single(dual.len())),
        _ => {
            let parts = metis::part_graph_kway(dual.xadj(), dual.adjncy(), k)?;
            if let Some(&bad) = parts.iter().find(|&&p| p >= k) {
                return Err(MeshError::MalformedAdjacency(format!(
                    "partitioner returned part {bad} for k = {k}"
                )));
            }
            Ok(PartitionMap { parts, nparts: k })
        }
    }
}

impl Dual {
    /// Partition the elements behind this dual graph into `k` parts.
    pub fn partition(&self, k: usize) -> Result<PartitionMap, MeshError> {
        partition_adjacency(self.adjacency(), k)
    }
}

/// Build the dual graph at `common` and partition it into `k` parts.
pub fn partition<T: Copy>(
    mesh: &Mesh<T>,
    common: Commonality,
    k: usize,
) -> Result<PartitionMap, MeshError> {
    if k == 0 {
        return Err(MeshError::ZeroPartitions);
    }
    Dual::new(mesh, common)?.partition(k)
}
