//! MeshError: unified error type for tomos public APIs
//!
//! Every derived structure (adjacency, partition, colouring, sparse topology,
//! assembled values) is all-or-nothing: a failure anywhere in the pipeline
//! surfaces as one of these variants and no partial result is returned.

use std::path::PathBuf;

use thiserror::Error;

use crate::topology::cell_type::ElementType;

/// Unified error type for tomos operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// An element references a node position outside `[0, nodes)`.
    #[error("element {element} references node {node}, but the mesh only has {nodes} nodes")]
    NodeOutOfRange {
        element: usize,
        node: usize,
        nodes: usize,
    },
    /// An element carries a node list whose length does not match its kind.
    #[error("element {element} is a {kind} but lists {found} nodes (expected {expected})")]
    WrongNodeCount {
        element: usize,
        kind: ElementType,
        expected: usize,
        found: usize,
    },
    /// A METIS routine returned a status other than `METIS_OK`.
    #[error("METIS routine {routine} failed with status {code}")]
    Metis { routine: &'static str, code: i32 },
    /// The CSR structure handed back by an external primitive is inconsistent.
    #[error("malformed adjacency: {0}")]
    MalformedAdjacency(String),
    /// A count or index does not fit the index type of the external primitive.
    #[error("index {0} does not fit the partitioner index type")]
    IndexOverflow(usize),

    /// Partitioning into zero parts was requested.
    #[error("partition count must be at least 1")]
    ZeroPartitions,
    /// The operation needs at least one element.
    #[error("mesh has no elements")]
    EmptyMesh,
    /// Adjacency needs at least one shared node to form an edge.
    #[error("commonality must be at least 1 shared node")]
    ZeroCommonality,
    /// No partition count can keep every footprint under the limit.
    #[error("node limit {limit} cannot be met (best footprint found is {footprint})")]
    UnreachableLimit { limit: usize, footprint: usize },

    /// Mesh file contents could not be decoded.
    #[error("mesh parse error: {0}")]
    MeshIoParse(String),
    /// Underlying I/O failure while reading a mesh or kernel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No compute adapter is available on this machine.
    #[error("could not find a suitable compute adapter")]
    NoAdapter,
    /// The adapter refused to create a device.
    #[error("device request failed: {0}")]
    DeviceRequest(String),
    /// The kernel program could not be read from disk.
    #[error("could not load compute kernel {path:?}: {reason}")]
    KernelLoad { path: PathBuf, reason: String },
    /// The kernel program failed to compile or a pipeline could not be built.
    #[error("compute kernel failed to build: {0}")]
    KernelBuild(String),

    /// A compute dispatch failed at runtime.
    #[error("compute dispatch failed: {0}")]
    Dispatch(String),
    /// Mapping a GPU buffer for read-back failed.
    #[error("failed to map GPU buffer for read-back")]
    GpuMappingFailed,
    /// The compute kernels only evaluate 3-node triangles.
    #[error("element {element} is a {kind}; only 3-node triangles can be evaluated")]
    UnsupportedElement { element: usize, kind: ElementType },
    /// A batch needs more workgroups than a single dispatch dimension allows.
    #[error("dispatch of {0} work items exceeds the device workgroup limit")]
    DispatchTooLarge(usize),
}
