//! Element type metadata for mesh cells.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The standard cell kinds, numbered as in the gmsh element-type table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Line2,
    Triangle3,
    Quadrangle4,
    Tetrahedron4,
    Hexahedron8,
    Prism6,
    Pyramid5,
    Line3,
    Triangle6,
    Quadrangle9,
    Tetrahedron10,
    Hexahedron27,
    Prism18,
    Pyramid14,
    Point1,
    Quadrangle8,
    Hexahedron20,
    Prism15,
    Pyramid13,
}

impl Default for ElementType {
    fn default() -> Self {
        ElementType::Triangle3
    }
}

impl ElementType {
    /// Every kind, in gmsh code order.
    pub const ALL: [ElementType; 19] = [
        ElementType::Line2,
        ElementType::Triangle3,
        ElementType::Quadrangle4,
        ElementType::Tetrahedron4,
        ElementType::Hexahedron8,
        ElementType::Prism6,
        ElementType::Pyramid5,
        ElementType::Line3,
        ElementType::Triangle6,
        ElementType::Quadrangle9,
        ElementType::Tetrahedron10,
        ElementType::Hexahedron27,
        ElementType::Prism18,
        ElementType::Pyramid14,
        ElementType::Point1,
        ElementType::Quadrangle8,
        ElementType::Hexahedron20,
        ElementType::Prism15,
        ElementType::Pyramid13,
    ];

    /// Number of nodes an element of this kind lists.
    pub const fn node_count(self) -> usize {
        match self {
            ElementType::Point1 => 1,
            ElementType::Line2 => 2,
            ElementType::Line3 | ElementType::Triangle3 => 3,
            ElementType::Quadrangle4 | ElementType::Tetrahedron4 => 4,
            ElementType::Pyramid5 => 5,
            ElementType::Triangle6 | ElementType::Prism6 => 6,
            ElementType::Hexahedron8 | ElementType::Quadrangle8 => 8,
            ElementType::Quadrangle9 => 9,
            ElementType::Tetrahedron10 => 10,
            ElementType::Pyramid13 => 13,
            ElementType::Pyramid14 => 14,
            ElementType::Prism15 => 15,
            ElementType::Prism18 => 18,
            ElementType::Hexahedron20 => 20,
            ElementType::Hexahedron27 => 27,
        }
    }

    /// Topological dimension of the cell.
    pub const fn dimension(self) -> u8 {
        match self {
            ElementType::Point1 => 0,
            ElementType::Line2 | ElementType::Line3 => 1,
            ElementType::Triangle3
            | ElementType::Triangle6
            | ElementType::Quadrangle4
            | ElementType::Quadrangle8
            | ElementType::Quadrangle9 => 2,
            _ => 3,
        }
    }

    /// The gmsh element-type code (1..=19).
    pub fn gmsh_code(self) -> u32 {
        // ALL is in code order, so the position is the code minus one.
        Self::ALL
            .iter()
            .position(|&k| k == self)
            .map_or(0, |i| i as u32 + 1)
    }

    /// Look up a kind by its gmsh element-type code.
    pub fn from_gmsh(code: u32) -> Option<Self> {
        let idx = usize::try_from(code).ok()?.checked_sub(1)?;
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            ElementType::Point1 => "point",
            ElementType::Line2 | ElementType::Line3 => "line",
            ElementType::Triangle3 | ElementType::Triangle6 => "triangle",
            ElementType::Quadrangle4 | ElementType::Quadrangle8 | ElementType::Quadrangle9 => {
                "quadrangle"
            }
            ElementType::Tetrahedron4 | ElementType::Tetrahedron10 => "tetrahedron",
            ElementType::Hexahedron8 | ElementType::Hexahedron20 | ElementType::Hexahedron27 => {
                "hexahedron"
            }
            ElementType::Prism6 | ElementType::Prism15 | ElementType::Prism18 => "prism",
            ElementType::Pyramid5 | ElementType::Pyramid13 | ElementType::Pyramid14 => "pyramid",
        };
        write!(f, "{}-node {}", self.node_count(), shape)
    }
}
