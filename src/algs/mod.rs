//! Re-export public algorithms.

pub mod assembly;
pub mod coloring;
pub mod dual_graph;
pub(crate) mod metis;
pub mod partition;
pub mod partition_size;
pub mod sparse;

pub use assembly::{AssemblyBackend, AssemblyPlan, ColorBatch, HostBackend, assemble};
pub use coloring::Colors;
pub use dual_graph::{Adjacency, Commonality, Dual, dual, nodal};
pub use partition::{PartitionMap, partition};
pub use partition_size::{optimal, valid};
pub use sparse::{Coordinates, SparsePattern};
