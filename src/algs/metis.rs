//! Thin, owning wrappers around the METIS mesh and graph routines.
//!
//! `METIS_MeshToDual` and `METIS_MeshToNodal` allocate their CSR outputs on
//! the C side; those buffers are held by [`MetisBuffer`] guards and released
//! with `METIS_Free` on every exit path. Callers only ever see owned
//! `Vec<usize>` data.

use std::os::raw::c_int;
use std::ptr;

use metis_sys::idx_t;

use crate::mesh_error::MeshError;

/// `rstatus_et::METIS_OK`.
const METIS_OK: c_int = 1;

/// C-style (zero-based) numbering for every call.
const NUMFLAG_C: idx_t = 0;

/// Owned CSR pair as returned by METIS: `adjncy[xadj[i]..xadj[i+1]]`.
pub(crate) type RawCsr = (Vec<usize>, Vec<usize>);

/// A METIS-allocated index array, freed on drop.
struct MetisBuffer {
    ptr: *mut idx_t,
    len: usize,
}

impl MetisBuffer {
    fn as_slice(&self) -> &[idx_t] {
        if self.ptr.is_null() || self.len == 0 {
            return &[];
        }
        // SAFETY: METIS allocated at least `len` entries behind `ptr`; `len`
        // is only ever set from the offsets METIS itself reported.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for MetisBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the pointer came from a METIS allocation and is freed once.
            unsafe {
                metis_sys::METIS_Free(self.ptr.cast());
            }
        }
    }
}

fn to_idx(v: usize) -> Result<idx_t, MeshError> {
    idx_t::try_from(v).map_err(|_| MeshError::IndexOverflow(v))
}

fn from_idx(v: idx_t) -> Result<usize, MeshError> {
    usize::try_from(v).map_err(|_| MeshError::MalformedAdjacency(format!("negative index {v}")))
}

fn to_idx_vec(xs: &[usize]) -> Result<Vec<idx_t>, MeshError> {
    xs.iter().map(|&x| to_idx(x)).collect()
}

fn check(routine: &'static str, status: c_int) -> Result<(), MeshError> {
    if status == METIS_OK {
        Ok(())
    } else {
        Err(MeshError::Metis {
            routine,
            code: status as i32,
        })
    }
}

/// Reject an incidence METIS would read out of bounds: offsets must start at
/// zero, never decrease and end at `eind.len()`, and every node id must be
/// below `nn`.
fn check_incidence(nn: usize, eptr: &[usize], eind: &[usize]) -> Result<(), MeshError> {
    if eptr.first() != Some(&0) || eptr.last() != Some(&eind.len()) {
        return Err(MeshError::MalformedAdjacency(format!(
            "element offsets do not span the {} incidence entries",
            eind.len()
        )));
    }
    for (e, w) in eptr.windows(2).enumerate() {
        if w[1] < w[0] {
            return Err(MeshError::MalformedAdjacency(format!(
                "element offsets decrease at element {e}"
            )));
        }
        if let Some(&node) = eind[w[0]..w[1]].iter().find(|&&v| v >= nn) {
            return Err(MeshError::NodeOutOfRange {
                element: e,
                node,
                nodes: nn,
            });
        }
    }
    Ok(())
}

/// Copy a METIS-owned CSR pair for `n` vertices into owned vectors; the
/// guards free the originals when they go out of scope.
fn take_csr(n: usize, mut xadj: MetisBuffer, mut adjncy: MetisBuffer) -> Result<RawCsr, MeshError> {
    if xadj.ptr.is_null() {
        return Err(MeshError::MalformedAdjacency(
            "METIS returned no offset array".into(),
        ));
    }
    xadj.len = n + 1;
    let offsets = xadj
        .as_slice()
        .iter()
        .map(|&o| from_idx(o))
        .collect::<Result<Vec<_>, _>>()?;
    adjncy.len = offsets[n];
    let neighbours = adjncy
        .as_slice()
        .iter()
        .map(|&v| from_idx(v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((offsets, neighbours))
}

/// Element→element adjacency: an edge joins two elements that share at
/// least `ncommon` nodes.
pub(crate) fn mesh_to_dual(
    nn: usize,
    eptr: &[usize],
    eind: &[usize],
    ncommon: usize,
) -> Result<RawCsr, MeshError> {
    let ne = eptr.len().saturating_sub(1);
    if ne == 0 {
        return Ok((vec![0], Vec::new()));
    }
    check_incidence(nn, eptr, eind)?;
    let mut c_ne = to_idx(ne)?;
    let mut c_nn = to_idx(nn)?;
    let mut c_eptr = to_idx_vec(eptr)?;
    let mut c_eind = to_idx_vec(eind)?;
    let mut c_ncommon = to_idx(ncommon)?;
    let mut numflag = NUMFLAG_C;
    let mut xadj: *mut idx_t = ptr::null_mut();
    let mut adjncy: *mut idx_t = ptr::null_mut();

    // SAFETY: all input arrays are live for the call and sized as METIS
    // expects (`ne + 1` offsets, `eptr[ne]` node ids, each below `nn`).
    let status = unsafe {
        metis_sys::METIS_MeshToDual(
            &mut c_ne,
            &mut c_nn,
            c_eptr.as_mut_ptr(),
            c_eind.as_mut_ptr(),
            &mut c_ncommon,
            &mut numflag,
            &mut xadj,
            &mut adjncy,
        )
    };
    // Wrap first so the outputs are released even when the status is bad.
    let xadj = MetisBuffer { ptr: xadj, len: 0 };
    let adjncy = MetisBuffer { ptr: adjncy, len: 0 };
    check("METIS_MeshToDual", status)?;
    take_csr(ne, xadj, adjncy)
}

/// Node→node adjacency: an edge joins two nodes that appear in a common element.
pub(crate) fn mesh_to_nodal(nn: usize, eptr: &[usize], eind: &[usize]) -> Result<RawCsr, MeshError> {
    let ne = eptr.len().saturating_sub(1);
    if ne == 0 {
        return Ok((vec![0; nn + 1], Vec::new()));
    }
    check_incidence(nn, eptr, eind)?;
    let mut c_ne = to_idx(ne)?;
    let mut c_nn = to_idx(nn)?;
    let mut c_eptr = to_idx_vec(eptr)?;
    let mut c_eind = to_idx_vec(eind)?;
    let mut numflag = NUMFLAG_C;
    let mut xadj: *mut idx_t = ptr::null_mut();
    let mut adjncy: *mut idx_t = ptr::null_mut();

    // SAFETY: as for `mesh_to_dual`.
    let status = unsafe {
        metis_sys::METIS_MeshToNodal(
            &mut c_ne,
            &mut c_nn,
            c_eptr.as_mut_ptr(),
            c_eind.as_mut_ptr(),
            &mut numflag,
            &mut xadj,
            &mut adjncy,
        )
    };
    let xadj = MetisBuffer { ptr: xadj, len: 0 };
    let adjncy = MetisBuffer { ptr: adjncy, len: 0 };
    check("METIS_MeshToNodal", status)?;
    take_csr(nn, xadj, adjncy)
}

/// Balanced k-way partition of a CSR graph (one constraint, default options).
///
/// Returns the part id of every vertex exactly as METIS assigned it.
pub(crate) fn part_graph_kway(
    xadj: &[usize],
    adjncy: &[usize],
    nparts: usize,
) -> Result<Vec<usize>, MeshError> {
    let n = xadj.len().saturating_sub(1);
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut nvtxs = to_idx(n)?;
    let mut ncon: idx_t = 1;
    let mut c_xadj = to_idx_vec(xadj)?;
    let mut c_adjncy = to_idx_vec(adjncy)?;
    let mut c_nparts = to_idx(nparts)?;
    let mut options = [0 as idx_t; metis_sys::METIS_NOPTIONS as usize];
    let mut objval: idx_t = 0;
    let mut part = vec![0 as idx_t; n];

    // SAFETY: `options` has METIS_NOPTIONS slots; the graph arrays are sized
    // `n + 1` and `xadj[n]`; `part` has one slot per vertex. Null weights
    // request unit weights.
    let status = unsafe {
        check(
            "METIS_SetDefaultOptions",
            metis_sys::METIS_SetDefaultOptions(options.as_mut_ptr()),
        )?;
        metis_sys::METIS_PartGraphKway(
            &mut nvtxs,
            &mut ncon,
            c_xadj.as_mut_ptr(),
            c_adjncy.as_mut_ptr(),
            ptr::null_mut(), // vwgt
            ptr::null_mut(), // vsize
            ptr::null_mut(), // adjwgt
            &mut c_nparts,
            ptr::null_mut(), // tpwgts
            ptr::null_mut(), // ubvec
            options.as_mut_ptr(),
            &mut objval,
            part.as_mut_ptr(),
        )
    };
    check("METIS_PartGraphKway", status)?;
    log::debug!("METIS k-way: {n} vertices into {nparts} parts, edge cut {objval}");
    part.into_iter().map(from_idx).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_skip_the_library() {
        assert_eq!(mesh_to_dual(4, &[0], &[], 2).unwrap(), (vec![0], vec![]));
        assert_eq!(
            mesh_to_nodal(3, &[0], &[]).unwrap(),
            (vec![0, 0, 0, 0], vec![])
        );
        assert!(part_graph_kway(&[0], &[], 4).unwrap().is_empty());
    }

    #[test]
    fn dual_of_two_triangles_sharing_an_edge() {
        let (xadj, adjncy) = mesh_to_dual(4, &[0, 3, 6], &[0, 1, 2, 0, 2, 3], 2).unwrap();
        assert_eq!(xadj, vec![0, 1, 2]);
        assert_eq!(adjncy, vec![1, 0]);
    }

    #[test]
    fn out_of_range_incidence_never_reaches_the_library() {
        assert!(matches!(
            mesh_to_nodal(3, &[0, 3], &[0, 1, 500_000]),
            Err(MeshError::NodeOutOfRange {
                element: 0,
                node: 500_000,
                nodes: 3
            })
        ));
        assert!(matches!(
            mesh_to_dual(4, &[0, 3, 2], &[0, 1, 2], 2),
            Err(MeshError::MalformedAdjacency(_))
        ));
    }

    #[test]
    fn index_overflow_is_reported() {
        if std::mem::size_of::<idx_t>() < std::mem::size_of::<usize>() {
            assert!(matches!(
                to_idx(usize::MAX),
                Err(MeshError::IndexOverflow(_))
            ));
        }
    }
}
