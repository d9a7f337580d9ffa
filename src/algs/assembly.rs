//! Colour-scheduled assembly of element contributions into the flat
//! non-zero array.
//!
//! # Steps
//! 1. Number the structural non-zeros from nodal adjacency ([`sparse`]).
//! 2. Colour elements at node-level commonality, so elements of one colour
//!    share no node and therefore no slot.
//! 3. Per colour, in ascending order, hand the batch with its precomputed
//!    local→global slot vectors to an [`AssemblyBackend`], which evaluates and
//!    accumulates it before the next colour is issued.
//!
//! Any backend failure aborts the whole assembly; nothing partial is returned.

use hashbrown::HashSet;
use num_traits::AsPrimitive;
use rayon::prelude::*;

use crate::algs::coloring::{self, Color, Colors};
use crate::algs::dual_graph::{Commonality, nodal};
use crate::algs::sparse::{self, Coordinates};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementType;
use crate::topology::mesh::Mesh;

/// Elements of one colour together with their slot vectors.
///
/// `slots[offsets[k]..offsets[k+1]]` belongs to `elements[k]`; for an element
/// with `n` nodes it has `n*n` entries, position `i*n + j` holding the slot of
/// `(node_i, node_j)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorBatch {
    pub color: Color,
    pub elements: Vec<usize>,
    pub offsets: Vec<usize>,
    pub slots: Vec<usize>,
}

impl ColorBatch {
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Slot vector of the `k`-th element of the batch.
    #[inline]
    pub fn element_slots(&self, k: usize) -> &[usize] {
        &self.slots[self.offsets[k]..self.offsets[k + 1]]
    }

    /// `(element, slots)` pairs in batch order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.elements
            .iter()
            .enumerate()
            .map(move |(k, &e)| (e, self.element_slots(k)))
    }
}

/// Everything assembly needs that depends on topology only.
#[derive(Clone, Debug)]
pub struct AssemblyPlan {
    nonzeros: usize,
    coordinates: Coordinates,
    colors: Colors,
    batches: Vec<ColorBatch>,
}

impl AssemblyPlan {
    pub fn new<T: Copy>(mesh: &Mesh<T>) -> Result<Self, MeshError> {
        let adjacency = nodal(mesh)?;
        let nonzeros = sparse::nonzeros(&adjacency);
        let coordinates = sparse::coordinates(&adjacency);
        let colors = coloring::build(mesh, Commonality::NODE)?;

        let width = mesh.max_nodes_per_element();
        let mut batches = Vec::with_capacity(colors.count());
        for (color, elements) in colors.batches().into_iter().enumerate() {
            let mut offsets = Vec::with_capacity(elements.len() + 1);
            let mut slots = Vec::with_capacity(elements.len() * width * width);
            offsets.push(0);
            for &e in &elements {
                let nodes = mesh.elements()[e].nodes();
                for &a in nodes {
                    for &b in nodes {
                        let slot = coordinates.slot(a, b).ok_or_else(|| {
                            MeshError::MalformedAdjacency(format!(
                                "element {e} couples nodes {a} and {b}, which are not adjacent"
                            ))
                        })?;
                        slots.push(slot);
                    }
                }
                offsets.push(slots.len());
            }
            log::debug!("colour {color}: {} elements", elements.len());
            batches.push(ColorBatch {
                color,
                elements,
                offsets,
                slots,
            });
        }

        Ok(Self {
            nonzeros,
            coordinates,
            colors,
            batches,
        })
    }

    /// Length of the value array.
    #[inline]
    pub fn nonzeros(&self) -> usize {
        self.nonzeros
    }

    #[inline]
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    #[inline]
    pub fn colors(&self) -> &Colors {
        &self.colors
    }

    /// Batches in ascending colour order.
    #[inline]
    pub fn batches(&self) -> &[ColorBatch] {
        &self.batches
    }

    /// Check that no slot is written twice within one batch.
    pub fn verify(&self) -> Result<(), MeshError> {
        for batch in &self.batches {
            let mut seen = HashSet::with_capacity(batch.slots.len());
            for (e, slots) in batch.iter() {
                // an element touches its own slots several times only when it
                // repeats a node, which is still a single writer
                let mine: HashSet<usize> = slots.iter().copied().collect();
                if let Some(&slot) = mine.iter().find(|&&s| !seen.insert(s)) {
                    return Err(MeshError::Dispatch(format!(
                        "colour {} writes slot {slot} from element {e} and another element",
                        batch.color
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Evaluates colour batches and accumulates them into a value array it owns.
pub trait AssemblyBackend {
    /// Allocate and zero a value array of `nonzeros` entries.
    fn prepare(&mut self, nonzeros: usize) -> Result<(), MeshError>;
    /// Evaluate and accumulate one batch; must complete before returning.
    fn dispatch(&mut self, batch: &ColorBatch) -> Result<(), MeshError>;
    /// Values indexed by slot.
    fn read_back(&mut self) -> Result<Vec<f32>, MeshError>;
}

/// Run a prepared plan through `backend`.
pub fn assemble_plan<B: AssemblyBackend + ?Sized>(
    plan: &AssemblyPlan,
    backend: &mut B,
) -> Result<Vec<f32>, MeshError> {
    backend.prepare(plan.nonzeros())?;
    for batch in plan.batches() {
        log::debug!("dispatching colour {} ({} elements)", batch.color, batch.len());
        backend.dispatch(batch)?;
    }
    backend.read_back()
}

/// Assemble `mesh` into one value per structural non-zero.
pub fn assemble<T: Copy, B: AssemblyBackend + ?Sized>(
    mesh: &Mesh<T>,
    backend: &mut B,
) -> Result<Vec<f32>, MeshError> {
    let plan = AssemblyPlan::new(mesh)?;
    assemble_plan(&plan, backend)
}

pub(crate) fn triangle_area(p: [[f64; 2]; 3]) -> f64 {
    0.5 * ((p[1][0] - p[0][0]) * (p[2][1] - p[0][1]) - (p[2][0] - p[0][0]) * (p[1][1] - p[0][1]))
        .abs()
}

/// Error for a triangle whose stiffness is undefined.
pub(crate) fn zero_area(e: usize) -> MeshError {
    MeshError::Dispatch(format!("element {e} has zero area"))
}

/// Element stiffness of a linear triangle for the operator
/// `-div(resistivity * grad u)`, row-major `3x3`.
///
/// `None` for a degenerate triangle.
pub fn triangle_stiffness(p: [[f64; 2]; 3], resistivity: f64) -> Option<[f64; 9]> {
    let b = [p[1][1] - p[2][1], p[2][1] - p[0][1], p[0][1] - p[1][1]];
    let c = [p[2][0] - p[1][0], p[0][0] - p[2][0], p[1][0] - p[0][0]];
    let area = triangle_area(p);
    if area <= f64::EPSILON {
        return None;
    }
    let mut k = [0.0; 9];
    for i in 0..3 {
        for j in 0..3 {
            k[i * 3 + j] = resistivity * (b[i] * b[j] + c[i] * c[j]) / (4.0 * area);
        }
    }
    Some(k)
}

/// CPU reference backend: evaluates triangle stiffness with rayon.
pub struct HostBackend<'m, T> {
    mesh: &'m Mesh<T>,
    resistivity: f64,
    values: Vec<f32>,
}

impl<'m, T> HostBackend<'m, T>
where
    T: AsPrimitive<f64> + Send + Sync,
{
    pub fn new(mesh: &'m Mesh<T>, resistivity: f64) -> Self {
        Self {
            mesh,
            resistivity,
            values: Vec::new(),
        }
    }

    fn local(&self, e: usize) -> Result<[f64; 9], MeshError> {
        let element = &self.mesh.elements()[e];
        if element.kind() != ElementType::Triangle3 {
            return Err(MeshError::UnsupportedElement {
                element: e,
                kind: element.kind(),
            });
        }
        let nodes = self.mesh.nodes();
        let p = [0, 1, 2].map(|i| {
            let n = &nodes[element.nodes()[i]];
            [n.x().as_(), n.y().as_()]
        });
        triangle_stiffness(p, self.resistivity).ok_or_else(|| zero_area(e))
    }
}

impl<T> AssemblyBackend for HostBackend<'_, T>
where
    T: AsPrimitive<f64> + Send + Sync,
{
    fn prepare(&mut self, nonzeros: usize) -> Result<(), MeshError> {
        self.values = vec![0.0; nonzeros];
        Ok(())
    }

    fn dispatch(&mut self, batch: &ColorBatch) -> Result<(), MeshError> {
        let contributions = batch
            .elements
            .par_iter()
            .map(|&e| self.local(e))
            .collect::<Result<Vec<_>, _>>()?;
        for (k, local) in contributions.iter().enumerate() {
            for (&slot, &v) in batch.element_slots(k).iter().zip(local) {
                self.values[slot] += v as f32;
            }
        }
        Ok(())
    }

    fn read_back(&mut self) -> Result<Vec<f32>, MeshError> {
        Ok(std::mem::take(&mut self.values))
    }
}
