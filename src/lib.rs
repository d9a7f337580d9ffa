#![cfg_attr(docsrs, feature(doc_cfg))]
//! # tomos
//!
//! tomos turns a finite-element mesh into the addressing and scheduling data
//! needed to assemble a global sparse matrix in parallel, and drives that
//! assembly on a compute device.
//!
//! ## Pipeline
//! - [`topology::Mesh`]: nodes and elements addressed by position
//! - [`algs::dual_graph`]: element↔element (dual) and node↔node (nodal)
//!   adjacency through METIS
//! - [`algs::partition`] / [`algs::partition_size`]: k-way partitioning and
//!   the smallest `k` whose parts fit a per-part node limit
//! - [`algs::coloring`]: greedy colouring, so that elements of one colour
//!   never write the same matrix entry
//! - [`algs::sparse`]: non-zero count, CSR pattern and the slot numbering of
//!   the flat value array
//! - [`algs::assembly`]: colour batches dispatched in order to an
//!   [`algs::AssemblyBackend`] (CPU reference, or the wgpu [`engine`])
//!
//! ## Determinism
//!
//! Every derived structure is a pure function of the mesh (given the
//! deterministic METIS routines); calling a query twice on the same mesh
//! yields identical results.
//!
//! ## Features
//! - `wgpu` (default): the GPU [`engine`] and its kernels
//!   (`shaders/tomos.wgsl`).
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! tomos = "0.3"
//! # CPU only:
//! # tomos = { version = "0.3", default-features = false }
//! ```

pub mod algs;
#[cfg(feature = "wgpu")]
#[cfg_attr(docsrs, doc(cfg(feature = "wgpu")))]
pub mod engine;
pub mod io;
pub mod mesh_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::assembly::{
        AssemblyBackend, AssemblyPlan, ColorBatch, HostBackend, assemble,
    };
    pub use crate::algs::coloring::Colors;
    pub use crate::algs::dual_graph::{Adjacency, Commonality, Dual, dual, nodal};
    pub use crate::algs::partition::{PartitionMap, partition};
    pub use crate::algs::partition_size::{optimal, optimal_with, valid};
    pub use crate::algs::sparse::{Coordinates, SparsePattern};
    #[cfg(feature = "wgpu")]
    pub use crate::engine::{DeviceMemory, Engine, EngineConfig};
    pub use crate::io::MeshReader;
    pub use crate::io::gmsh::GmshReader;
    pub use crate::mesh_error::MeshError;
    pub use crate::topology::{Element, ElementType, Mesh, Node};
}
