#![allow(dead_code)]
use tomos::topology::{Element, Mesh, Node};

/// Unit square split along the (0,2) diagonal.
pub fn square() -> Mesh<f32> {
    let nodes = vec![
        Node::new(0.0, 0.0, 0.0),
        Node::new(1.0, 0.0, 0.0),
        Node::new(1.0, 1.0, 0.0),
        Node::new(0.0, 1.0, 0.0),
    ];
    Mesh::new(
        nodes,
        vec![Element::triangle(0, 1, 2), Element::triangle(0, 2, 3)],
    )
    .unwrap()
}

/// 3x3 nodes, 8 triangles, every diagonal through the centre node 4.
pub fn grid3() -> Mesh<f32> {
    let mut nodes = Vec::new();
    for j in 0..3 {
        for i in 0..3 {
            nodes.push(Node::new(i as f32, j as f32, 0.0));
        }
    }
    let elements = vec![
        Element::triangle(0, 4, 3),
        Element::triangle(0, 1, 4),
        Element::triangle(1, 2, 4),
        Element::triangle(2, 5, 4),
        Element::triangle(3, 4, 6),
        Element::triangle(6, 4, 7),
        Element::triangle(4, 8, 7),
        Element::triangle(4, 5, 8),
    ];
    Mesh::new(nodes, elements).unwrap()
}

/// `nx` by `ny` unit cells, each split into two triangles along the same
/// diagonal.
pub fn grid(nx: usize, ny: usize) -> Mesh<f64> {
    let at = |i: usize, j: usize| j * (nx + 1) + i;
    let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            nodes.push(Node::new(i as f64, j as f64, 0.0));
        }
    }
    let mut elements = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let (a, b, c, d) = (at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
            elements.push(Element::triangle(a, b, c));
            elements.push(Element::triangle(a, c, d));
        }
    }
    Mesh::new(nodes, elements).unwrap()
}

/// A skewed single triangle and its stiffness matrix, row-major by node.
pub fn oracle() -> (Mesh<f32>, [[f32; 3]; 3]) {
    let nodes = vec![
        Node::new(-0.997_032_1, -0.076_986_69, 0.0),
        Node::new(-0.916_143_1, -0.047_148_96, 0.0),
        Node::new(-1.0, 0.0, 0.0),
    ];
    let mesh = Mesh::new(nodes, vec![Element::triangle(0, 1, 2)]).unwrap();
    let expected = [
        [0.732_671_4, -0.307_058_33, -0.425_613_1],
        [-0.307_058_33, 0.469_903_44, -0.162_845_1],
        [-0.425_613_1, -0.162_845_1, 0.588_458_2],
    ];
    (mesh, expected)
}

pub fn sorted(xs: &[usize]) -> Vec<usize> {
    let mut v = xs.to_vec();
    v.sort_unstable();
    v
}

pub fn assert_close(got: f32, want: f32, tol: f32) {
    assert!(
        (got - want).abs() <= tol,
        "got {got}, want {want} (tolerance {tol})"
    );
}
