//! Mesh readers.
//!
//! Decoders produce a validated [`Mesh`] with `f64` coordinates; use
//! [`Mesh::cast`] for another precision.

pub mod gmsh;

use std::io::Read;

use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

/// Trait for mesh readers.
pub trait MeshReader {
    /// Parse a mesh from a reader.
    fn read<R: Read>(&self, reader: R) -> Result<Mesh<f64>, MeshError>;
}
