//! Smallest partition count whose parts each touch at most `limit` nodes.
//!
//! The search probes `k = 2, 4, 8, …` until a partition is valid, then
//! bisects between the last invalid and the first valid count. It assumes
//! validity is monotone in `k`. METIS balances element counts, not node
//! footprints, so that assumption can fail and the answer is then only a
//! local minimum.

use std::collections::BTreeSet;

use crate::algs::dual_graph::{Commonality, Dual};
use crate::algs::partition::{PartitionMap, footprint};
use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

/// True when every part of `pm` references at most `limit` distinct nodes.
///
/// Stops at the first part over the limit.
pub fn valid<T: Copy>(mesh: &Mesh<T>, pm: &PartitionMap, limit: usize) -> bool {
    for (p, group) in pm.groups().iter().enumerate() {
        let nodes = footprint(mesh, group);
        if nodes > limit {
            log::trace!("part {p} touches {nodes} nodes (limit {limit})");
            return false;
        }
    }
    true
}

/// [`optimal_with`] over the edge-sharing dual graph.
pub fn optimal<T: Copy>(mesh: &Mesh<T>, limit: usize) -> Result<usize, MeshError> {
    optimal_with(mesh, Commonality::EDGE, limit)
}

/// Smallest `k` such that the k-way partition of the dual graph at `common`
/// keeps every part's node footprint at or below `limit`.
pub fn optimal_with<T: Copy>(
    mesh: &Mesh<T>,
    common: Commonality,
    limit: usize,
) -> Result<usize, MeshError> {
    let ne = mesh.element_count();
    if ne == 0 {
        return Err(MeshError::EmptyMesh);
    }
    if mesh.node_count() <= limit {
        return Ok(1);
    }
    let largest = mesh
        .elements()
        .iter()
        .map(|e| e.nodes().iter().collect::<BTreeSet<_>>().len())
        .max()
        .unwrap_or(0);
    if largest > limit {
        return Err(MeshError::UnreachableLimit {
            limit,
            footprint: largest,
        });
    }
    if ne == 1 {
        // the lone element fits, and there is nothing to split
        return Ok(1);
    }

    let dual = Dual::new(mesh, common)?;
    let probe = |k: usize| -> Result<(bool, PartitionMap), MeshError> {
        let pm = dual.partition(k)?;
        let ok = valid(mesh, &pm, limit);
        if log::log_enabled!(log::Level::Debug) {
            let worst = pm.footprints(mesh).into_iter().max().unwrap_or(0);
            log::debug!(
                "partition probe k = {k}: {} (largest part touches {worst} nodes)",
                if ok { "valid" } else { "invalid" }
            );
        }
        Ok((ok, pm))
    };

    // exponential probe
    let mut lo = 1;
    let mut k = 2;
    let hi = loop {
        let (ok, pm) = probe(k)?;
        if ok {
            break k;
        }
        if k == ne {
            let worst = pm.footprints(mesh).into_iter().max().unwrap_or(0);
            return Err(MeshError::UnreachableLimit {
                limit,
                footprint: worst,
            });
        }
        lo = k;
        k = (2 * k).min(ne);
    };

    // binary narrowing
    let mut hi = hi;
    while hi - lo > 1 && lo < hi {
        let mid = (lo + hi) / 2;
        if probe(mid)?.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    log::info!("optimal partition count for limit {limit}: {hi}");
    Ok(hi)
}
