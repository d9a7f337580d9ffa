//! Mesh model: element kinds plus the position-addressed [`Mesh`].

pub mod cell_type;
pub mod mesh;

pub use cell_type::ElementType;
pub use mesh::{Element, Mesh, Node};
