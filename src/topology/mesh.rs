//! In-memory mesh: nodes and elements addressed by position.
//!
//! A node or element *is* its index. Every derived structure in the crate
//! (adjacency, partitions, colours, sparse slots) is keyed by these positions,
//! so a [`Mesh`] is immutable once constructed.

use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementType;

/// A 3D point with coordinates of precision `T`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node<T> {
    pub coords: [T; 3],
}

impl<T: Copy> Node<T> {
    #[inline]
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { coords: [x, y, z] }
    }

    #[inline]
    pub fn x(&self) -> T {
        self.coords[0]
    }

    #[inline]
    pub fn y(&self) -> T {
        self.coords[1]
    }

    #[inline]
    pub fn z(&self) -> T {
        self.coords[2]
    }

    /// Convert the coordinates to another precision.
    pub fn cast<U>(&self) -> Node<U>
    where
        T: AsPrimitive<U>,
        U: Copy + 'static,
    {
        Node {
            coords: self.coords.map(|c| c.as_()),
        }
    }
}

/// A cell: its kind plus the ordered node positions it connects.
///
/// The order of `nodes` fixes the local numbering used for element matrices.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    kind: ElementType,
    nodes: Vec<usize>,
}

impl Element {
    pub fn new(kind: ElementType, nodes: impl Into<Vec<usize>>) -> Self {
        Self {
            kind,
            nodes: nodes.into(),
        }
    }

    /// Shorthand for a linear triangle.
    pub fn triangle(a: usize, b: usize, c: usize) -> Self {
        Self::new(ElementType::Triangle3, vec![a, b, c])
    }

    #[inline]
    pub fn kind(&self) -> ElementType {
        self.kind
    }

    #[inline]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Ordered nodes plus ordered elements.
///
/// Deserialization goes through [`Mesh::new`], so a decoded mesh upholds the
/// same invariants as a constructed one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawMesh<T>",
    bound(deserialize = "T: Copy + Deserialize<'de>")
)]
pub struct Mesh<T = f32> {
    nodes: Vec<Node<T>>,
    elements: Vec<Element>,
}

/// Unchecked wire form of a [`Mesh`].
#[derive(Deserialize)]
struct RawMesh<T> {
    nodes: Vec<Node<T>>,
    elements: Vec<Element>,
}

impl<T: Copy> TryFrom<RawMesh<T>> for Mesh<T> {
    type Error = MeshError;

    fn try_from(raw: RawMesh<T>) -> Result<Self, Self::Error> {
        Mesh::new(raw.nodes, raw.elements)
    }
}

impl<T: Copy> Mesh<T> {
    /// Build a mesh, checking that every element lists the node count of its
    /// kind and only references existing nodes.
    pub fn new(nodes: Vec<Node<T>>, elements: Vec<Element>) -> Result<Self, MeshError> {
        let n = nodes.len();
        for (e, element) in elements.iter().enumerate() {
            let expected = element.kind.node_count();
            if element.len() != expected {
                return Err(MeshError::WrongNodeCount {
                    element: e,
                    kind: element.kind,
                    expected,
                    found: element.len(),
                });
            }
            if let Some(&node) = element.nodes.iter().find(|&&v| v >= n) {
                return Err(MeshError::NodeOutOfRange {
                    element: e,
                    node,
                    nodes: n,
                });
            }
        }
        Ok(Self { nodes, elements })
    }

    #[inline]
    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Largest node list of any element (0 for an element-free mesh).
    pub fn max_nodes_per_element(&self) -> usize {
        self.elements.iter().map(Element::len).max().unwrap_or(0)
    }

    /// Flattened element→node incidence in CSR form: `eind[eptr[e]..eptr[e+1]]`
    /// lists the nodes of element `e`.
    pub fn incidence(&self) -> (Vec<usize>, Vec<usize>) {
        let mut eptr = Vec::with_capacity(self.elements.len() + 1);
        let mut eind = Vec::with_capacity(self.elements.iter().map(Element::len).sum());
        eptr.push(0);
        for element in &self.elements {
            eind.extend_from_slice(&element.nodes);
            eptr.push(eind.len());
        }
        (eptr, eind)
    }

    /// Same topology with coordinates converted to another precision.
    pub fn cast<U>(&self) -> Mesh<U>
    where
        T: AsPrimitive<U>,
        U: Copy + 'static,
    {
        Mesh {
            nodes: self.nodes.iter().map(Node::cast).collect(),
            elements: self.elements.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> (Vec<Node<f32>>, Vec<Element>) {
        let nodes = vec![
            Node::new(0.0, 0.0, 0.0),
            Node::new(1.0, 0.0, 0.0),
            Node::new(1.0, 1.0, 0.0),
            Node::new(0.0, 1.0, 0.0),
        ];
        let elements = vec![Element::triangle(0, 1, 2), Element::triangle(0, 2, 3)];
        (nodes, elements)
    }

    #[test]
    fn incidence_is_flattened_in_element_order() {
        let (nodes, elements) = square();
        let mesh = Mesh::new(nodes, elements).unwrap();
        let (eptr, eind) = mesh.incidence();
        assert_eq!(eptr, vec![0, 3, 6]);
        assert_eq!(eind, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.max_nodes_per_element(), 3);
    }

    #[test]
    fn out_of_range_node_is_rejected() {
        let (nodes, _) = square();
        let err = Mesh::new(nodes, vec![Element::triangle(0, 1, 4)]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::NodeOutOfRange {
                element: 0,
                node: 4,
                nodes: 4
            }
        ));
    }

    #[test]
    fn node_count_must_match_kind() {
        let (nodes, _) = square();
        let bad = Element::new(ElementType::Quadrangle4, vec![0, 1, 2]);
        let err = Mesh::new(nodes, vec![bad]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::WrongNodeCount {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn deserializing_validates_the_mesh() {
        let out_of_range = r#"{
            "nodes": [{"coords": [0.0, 0.0, 0.0]}, {"coords": [1.0, 0.0, 0.0]}, {"coords": [0.0, 1.0, 0.0]}],
            "elements": [{"kind": "Triangle3", "nodes": [0, 1, 500000]}]
        }"#;
        let err = serde_json::from_str::<Mesh<f64>>(out_of_range).unwrap_err();
        assert!(err.to_string().contains("500000"), "{err}");

        let short = r#"{
            "nodes": [{"coords": [0.0, 0.0, 0.0]}, {"coords": [1.0, 0.0, 0.0]}],
            "elements": [{"kind": "Triangle3", "nodes": [0, 1]}]
        }"#;
        let err = serde_json::from_str::<Mesh<f64>>(short).unwrap_err();
        assert!(err.to_string().contains("lists 2 nodes"), "{err}");
    }

    #[test]
    fn serialized_mesh_reads_back() {
        let (nodes, elements) = square();
        let mesh = Mesh::new(nodes, elements).unwrap();
        let text = serde_json::to_string(&mesh).unwrap();
        assert_eq!(serde_json::from_str::<Mesh<f32>>(&text).unwrap(), mesh);
    }

    #[test]
    fn cast_preserves_topology() {
        let (nodes, elements) = square();
        let mesh = Mesh::new(nodes, elements).unwrap();
        let wide: Mesh<f64> = mesh.cast();
        assert_eq!(wide.elements(), mesh.elements());
        assert_eq!(wide.nodes()[2].coords, [1.0f64, 1.0, 0.0]);
    }
}
