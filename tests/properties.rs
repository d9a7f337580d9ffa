mod util;
use proptest::prelude::*;
use tomos::algs::assembly::AssemblyPlan;
use tomos::algs::coloring;
use tomos::algs::dual_graph::{Commonality, Dual, dual, nodal};
use tomos::algs::partition::partition;
use tomos::algs::partition_size::{optimal, valid};
use tomos::algs::sparse::{coordinates, csr, nonzeros};
use tomos::mesh_error::MeshError;
use util::*;

fn commonality() -> impl Strategy<Value = Commonality> {
    prop_oneof![
        Just(Commonality::NODE),
        Just(Commonality::EDGE),
        Just(Commonality::FACE),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_entity_owns_a_row(nx in 1usize..6, ny in 1usize..6, common in commonality()) {
        let mesh = grid(nx, ny);
        prop_assert_eq!(dual(&mesh, common).unwrap().len(), mesh.element_count());
        prop_assert_eq!(nodal(&mesh).unwrap().len(), mesh.node_count());
    }

    #[test]
    fn partition_is_a_set_partition(nx in 1usize..6, ny in 1usize..6, k in 1usize..6) {
        let mesh = grid(nx, ny);
        let k = k.min(mesh.element_count());
        let pm = partition(&mesh, Commonality::EDGE, k).unwrap();
        prop_assert_eq!(pm.groups().len(), k);
        let mut all = pm.groups().concat();
        all.sort_unstable();
        prop_assert_eq!(all, (0..mesh.element_count()).collect::<Vec<_>>());
    }

    #[test]
    fn colouring_is_proper(nx in 1usize..6, ny in 1usize..6, common in commonality()) {
        let mesh = grid(nx, ny);
        let adjacency = dual(&mesh, common).unwrap();
        let colors = coloring::build(&mesh, common).unwrap();
        prop_assert_eq!(colors.len(), mesh.element_count());
        for (a, b) in adjacency.edges() {
            prop_assert_ne!(colors.color(a), colors.color(b));
        }
    }

    #[test]
    fn csr_shape(nx in 1usize..6, ny in 1usize..6) {
        let mesh = grid(nx, ny);
        let adjacency = nodal(&mesh).unwrap();
        let pattern = csr(&adjacency);
        let expected: usize = adjacency.iter().map(|(_, ns)| 1 + ns.len()).sum();
        prop_assert_eq!(nonzeros(&adjacency), expected);
        prop_assert_eq!(pattern.rows.len(), mesh.node_count() + 1);
        prop_assert!(pattern.rows.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(pattern.rows[mesh.node_count()], expected);
        prop_assert_eq!(coordinates(&adjacency).len(), expected);
    }

    #[test]
    fn colour_batches_never_share_a_slot(nx in 1usize..6, ny in 1usize..6) {
        let plan = AssemblyPlan::new(&grid(nx, ny)).unwrap();
        prop_assert!(plan.verify().is_ok());
    }

    #[test]
    fn optimal_count_is_tight(nx in 1usize..6, ny in 1usize..6, spare in 0usize..12) {
        let mesh = grid(nx, ny);
        let limit = 3 + spare;
        let k = match optimal(&mesh, limit) {
            Ok(k) => k,
            Err(MeshError::UnreachableLimit { .. }) => return Ok(()),
            Err(e) => panic!("optimal failed: {e}"),
        };
        prop_assert!(k >= 1);
        let d = Dual::new(&mesh, Commonality::EDGE).unwrap();
        prop_assert!(valid(&mesh, &d.partition(k).unwrap(), limit));
        if k > 1 {
            prop_assert!(!valid(&mesh, &d.partition(k - 1).unwrap(), limit));
        }
    }
}
