use quickcheck::{quickcheck, Arbitrary, Gen};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rstest::rstest;

use digraph_iso::random::{random_digraph, shuffled};
use digraph_iso::state::{Problem, PropagationState};
use digraph_iso::{solve, Digraph, Morphism, SearchError, Solver, SolverConfig};

fn digraph(adj: &[&[usize]]) -> Digraph {
    Digraph::try_from(adj.iter().map(|a| a.to_vec()).collect::<Vec<_>>()).unwrap()
}

/// A small graph (loops and duplicate edges included) plus a permutation of its vertices.
#[derive(Clone, Debug)]
struct Relabeling {
    graph: Digraph,
    morphism: Morphism,
}

impl Arbitrary for Relabeling {
    fn arbitrary(g: &mut Gen) -> Self {
        let order = usize::arbitrary(g) % 9;
        let mut graph = Digraph::with_order(order);
        for a in 0..order {
            for b in 0..order {
                match u8::arbitrary(g) % 16 {
                    0 => {
                        graph.add_directed_edge(a, b).unwrap();
                        graph.add_directed_edge(a, b).unwrap();
                    }
                    1..=4 => graph.add_directed_edge(a, b).unwrap(),
                    _ => (),
                }
            }
        }
        let keys: Vec<u32> = (0..order).map(|_| u32::arbitrary(g)).collect();
        let mut values: Vec<usize> = (0..order).collect();
        values.sort_by_key(|&i| (keys[i], i));
        Relabeling { graph, morphism: Morphism::try_from(values).unwrap() }
    }
}

quickcheck! {
    fn prop_relabeled_copy_is_found(case: Relabeling) -> bool {
        let relabeled = case.graph.relabel(&case.morphism);
        match solve(&case.graph, &relabeled) {
            Some(found) => case.graph.verify_mapping(&relabeled, &found) && case.graph.relabel(&found).edge_set_eq(&relabeled),
            None => false,
        }
    }

    fn prop_automorphism_is_found(case: Relabeling) -> bool {
        let g = &case.graph;
        solve(g, g).map_or(false, |found| g.verify_mapping(g, &found))
    }

    fn prop_propagation_is_idempotent(case: Relabeling) -> bool {
        let relabeled = case.graph.relabel(&case.morphism);
        let problem = Problem::new(&case.graph, &relabeled).unwrap();
        let state = PropagationState::new(&problem);
        let mut again = state.clone();
        again.propagate();
        if again != state { return false; }

        // one level down as well
        let child = match state.select_branch_variable() {
            Some(v) => {
                let to = *state.domain(v).unwrap().iter().next().unwrap();
                state.branch(v, to)
            }
            None => return true,
        };
        let mut again = child.clone();
        again.propagate();
        again == child
    }

    fn prop_extra_edge_breaks_degrees(case: Relabeling) -> bool {
        if case.graph.is_empty() { return true; }
        let mut more = case.graph.relabel(&case.morphism);
        more.add_directed_edge(0, 0).unwrap();
        solve(&case.graph, &more).is_none()
    }
}

#[rstest]
#[case::sample(
    "[[0,1,5,7],[0,5],[2,1,4],[0,4],[6],[7,4],[7],[6,5,1]]",
    "[[1,5],[1,2,3,6],[6,5],[2,1],[6],[4],[4,2,3],[7,3,5]]",
    true
)]
#[case::single_vertex("[[]]", "[[]]", true)]
#[case::single_loop("[[0]]", "[[0]]", true)]
#[case::loop_moved("[[0],[]]", "[[],[1]]", true)]
#[case::loop_against_edge("[[0],[]]", "[[1],[]]", false)]
#[case::disjoint_degrees("[[1,2],[0,2],[0,1]]", "[[1],[2],[0]]", false)]
#[case::same_degrees("[[1],[0],[3],[2]]", "[[1],[2],[3],[0]]", false)]
#[case::reversed_path("[[1],[2],[]]", "[[],[0],[1]]", true)]
#[case::different_orders("[[],[]]", "[[]]", false)]
fn test_scenarios(#[case] a: &str, #[case] b: &str, #[case] isomorphic: bool) {
    let a: Digraph = serde_json::from_str(a).unwrap();
    let b: Digraph = serde_json::from_str(b).unwrap();
    let found = solve(&a, &b);
    assert_eq!(found.is_some(), isomorphic);
    if let Some(m) = found {
        assert!(a.verify_mapping(&b, &m));
        assert_eq!(a.get_isomorphism(&b), Some(m));
    }
}

#[rstest]
fn test_random_pairs(#[values(1, 6, 15, 40)] order: usize, #[values(0.1, 0.25, 0.5)] ratio: f64) {
    let mut rng = Pcg64Mcg::seed_from_u64(order as u64);
    let a = random_digraph(&mut rng, order, ratio);
    let (b, _) = shuffled(&mut rng, &a);
    let mut solver = Solver::default();
    let m = solver.solve(&a, &b).unwrap().unwrap();
    assert!(a.verify_mapping(&b, &m));
    assert!(solver.stats().states >= 1);
    assert!(solver.stats().dead_ends <= solver.stats().states);
}

#[test]
fn test_bounded_search_is_not_exhaustion() {
    let two_cycles = digraph(&[&[1], &[0], &[3], &[2]]);
    let four_cycle = digraph(&[&[1], &[2], &[3], &[0]]);

    let mut bounded = Solver::new(SolverConfig::new().max_states(2));
    assert_eq!(bounded.solve(&two_cycles, &four_cycle), Err(SearchError::StateLimit(2)));

    let mut unbounded = Solver::default();
    assert_eq!(unbounded.solve(&two_cycles, &four_cycle), Ok(None));
    assert!(unbounded.stats().states > 2);
}

#[test]
fn test_verify_rejects_wrong_mapping() {
    let path = digraph(&[&[1], &[2], &[]]);
    let reversed = digraph(&[&[], &[0], &[1]]);
    assert!(!path.verify_mapping(&reversed, &Morphism::identity(3)));
    assert!(path.verify_mapping(&reversed, &Morphism::try_from(vec![2, 1, 0]).unwrap()));
}
