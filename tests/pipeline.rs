mod util;
use tomos::algs::assembly::{AssemblyPlan, HostBackend, assemble, assemble_plan};
use tomos::algs::coloring;
use tomos::algs::dual_graph::{Commonality, Dual, dual, nodal};
use tomos::algs::partition::partition;
use tomos::algs::partition_size::{optimal, optimal_with, valid};
use tomos::algs::sparse::{coordinates_of, csr_of, nonzeros_of};
use tomos::mesh_error::MeshError;
use util::*;

#[test]
fn square_end_to_end() {
    let mesh = square();

    let n = nodal(&mesh).unwrap();
    assert_eq!(sorted(n.neighbors(0)), vec![1, 2, 3]);
    let d = dual(&mesh, Commonality::EDGE).unwrap();
    assert_eq!(d.neighbors(0), &[1]);

    let colors = coloring::build(&mesh, Commonality::EDGE).unwrap();
    assert_ne!(colors.color(0), colors.color(1));
    assert!(colors.is_proper(&d));

    assert_eq!(nonzeros_of(&mesh).unwrap(), 14);
    assert_eq!(csr_of(&mesh).unwrap().rows, vec![0, 4, 7, 11, 14]);
}

#[test]
fn square_host_stiffness() {
    let mesh = square();
    let plan = AssemblyPlan::new(&mesh).unwrap();
    plan.verify().unwrap();
    let values = assemble_plan(&plan, &mut HostBackend::new(&mesh, 1.0)).unwrap();
    assert_eq!(values.len(), 14);

    let expected = [
        ((0, 0), 1.0),
        ((0, 1), -0.5),
        ((0, 2), 0.0),
        ((0, 3), -0.5),
        ((1, 1), 1.0),
        ((1, 0), -0.5),
        ((1, 2), -0.5),
        ((2, 2), 1.0),
        ((2, 0), 0.0),
        ((2, 1), -0.5),
        ((2, 3), -0.5),
        ((3, 3), 1.0),
        ((3, 0), -0.5),
        ((3, 2), -0.5),
    ];
    for ((r, c), want) in expected {
        let slot = plan.coordinates().slot(r, c).unwrap();
        assert_close(values[slot], want, 1e-6);
    }
}

#[test]
fn oracle_triangle_host_stiffness() {
    let (mesh, expected) = oracle();
    let coords = coordinates_of(&mesh).unwrap();
    let values = assemble(&mesh, &mut HostBackend::new(&mesh, 1.0)).unwrap();
    assert_eq!(values.len(), 9);
    for (r, row) in expected.iter().enumerate() {
        for (c, &want) in row.iter().enumerate() {
            assert_close(values[coords.slot(r, c).unwrap()], want, 1e-4);
        }
    }
}

#[test]
fn resistivity_scales_stiffness() {
    let mesh = square();
    let unit = assemble(&mesh, &mut HostBackend::new(&mesh, 1.0)).unwrap();
    let scaled = assemble(&mesh, &mut HostBackend::new(&mesh, 2.5)).unwrap();
    for (a, b) in unit.iter().zip(&scaled) {
        assert_close(*b, 2.5 * a, 1e-6);
    }
}

#[test]
fn grid3_partition_and_sizing() {
    let mesh = grid3();
    let pm = partition(&mesh, Commonality::EDGE, 2).unwrap();
    assert_eq!(pm.non_empty(), 2);
    let mut all = pm.groups().concat();
    all.sort_unstable();
    assert_eq!(all, (0..8).collect::<Vec<_>>());

    let k = optimal(&mesh, 6).unwrap();
    assert!(k > 1);
    let d = Dual::new(&mesh, Commonality::EDGE).unwrap();
    assert!(valid(&mesh, &d.partition(k).unwrap(), 6));
    assert!(!valid(&mesh, &d.partition(k - 1).unwrap(), 6));
}

#[test]
fn grid3_sparse_pattern() {
    let mesh = grid3();
    let pattern = csr_of(&mesh).unwrap();
    assert_eq!(pattern.rows, vec![0, 4, 8, 12, 16, 25, 29, 33, 37, 41]);
    assert_eq!(pattern.row(4)[0], 4);
    assert_eq!(sorted(&pattern.row(4)[1..]), vec![0, 1, 2, 3, 5, 6, 7, 8]);
    assert_eq!(nonzeros_of(&mesh).unwrap(), 41);
    assert_eq!(coordinates_of(&mesh).unwrap().len(), 41);
}

#[test]
fn grid3_colour_batches_are_node_disjoint() {
    let mesh = grid3();
    let plan = AssemblyPlan::new(&mesh).unwrap();
    // every triangle touches the centre node
    assert_eq!(plan.colors().count(), 8);
    plan.verify().unwrap();
    for batch in plan.batches() {
        assert_eq!(batch.len(), 1);
    }
}

#[test]
fn queries_are_idempotent() {
    let mesh = grid(4, 3);
    assert_eq!(
        dual(&mesh, Commonality::EDGE).unwrap(),
        dual(&mesh, Commonality::EDGE).unwrap()
    );
    assert_eq!(nodal(&mesh).unwrap(), nodal(&mesh).unwrap());
    assert_eq!(csr_of(&mesh).unwrap(), csr_of(&mesh).unwrap());
    assert_eq!(coordinates_of(&mesh).unwrap(), coordinates_of(&mesh).unwrap());
}

#[test]
fn sizing_errors() {
    let empty = tomos::topology::Mesh::<f32>::new(vec![], vec![]).unwrap();
    assert!(matches!(optimal(&empty, 4), Err(MeshError::EmptyMesh)));
    assert!(matches!(
        optimal_with(&grid3(), Commonality::NODE, 2),
        Err(MeshError::UnreachableLimit { .. })
    ));
    assert!(matches!(
        partition(&grid3(), Commonality::EDGE, 0),
        Err(MeshError::ZeroPartitions)
    ));
}

#[test]
fn derived_structures_serialize() {
    let mesh = square();
    let pattern = csr_of(&mesh).unwrap();
    let json = serde_json::to_value(&pattern).unwrap();
    assert_eq!(json["rows"], serde_json::json!([0, 4, 7, 11, 14]));

    let pm = partition(&mesh, Commonality::EDGE, 1).unwrap();
    let text = serde_json::to_string(&pm).unwrap();
    let back: tomos::algs::partition::PartitionMap = serde_json::from_str(&text).unwrap();
    assert_eq!(back, pm);
}

#[test]
fn invalid_serialized_mesh_is_rejected_before_adjacency() {
    let text = r#"{
        "nodes": [{"coords": [0.0, 0.0, 0.0]}, {"coords": [1.0, 0.0, 0.0]}, {"coords": [0.0, 1.0, 0.0]}],
        "elements": [{"kind": "Triangle3", "nodes": [0, 1, 500000]}]
    }"#;
    let err = serde_json::from_str::<tomos::topology::Mesh<f64>>(text).unwrap_err();
    assert!(err.to_string().contains("references node 500000"), "{err}");

    let round = serde_json::to_string(&square()).unwrap();
    let back: tomos::topology::Mesh<f64> = serde_json::from_str(&round).unwrap();
    assert_eq!(nodal(&back).unwrap(), nodal(&square()).unwrap());
}
