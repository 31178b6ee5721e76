//! Random graphs and relabelings, mostly for benchmarking and testing the solver.
//!
//! Every function takes the generator as a parameter, so runs can be reproduced with a seeded generator like
//! [`rand_pcg::Pcg64Mcg`].

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Digraph, Morphism};

#[cfg(test)]
use rand::SeedableRng;
#[cfg(test)]
use rand_pcg::Pcg64Mcg;

/// Samples a graph with `order` vertices where each ordered pair `(i, j)`, loops included,
/// is an edge independently with probability `ratio`.
/// Adjacency lists come out sorted.
///
/// Panics if `ratio` is not in `0.0..=1.0`.
pub fn random_digraph<R: Rng + ?Sized>(rng: &mut R, order: usize, ratio: f64) -> Digraph {
    let mut g = Digraph::with_order(order);
    for adj in g.0.iter_mut() {
        adj.extend((0..order).filter(|_| rng.gen_bool(ratio)));
    }
    g
}

/// Samples a uniformly random permutation of `0..order`.
pub fn random_morphism<R: Rng + ?Sized>(rng: &mut R, order: usize) -> Morphism {
    let mut values: Vec<usize> = (0..order).collect();
    values.shuffle(rng);
    Morphism(values)
}

/// Relabels `g` by a random permutation, returning the relabeled graph together with the permutation used.
/// The result is isomorphic to `g` by construction.
pub fn shuffled<R: Rng + ?Sized>(rng: &mut R, g: &Digraph) -> (Digraph, Morphism) {
    let morphism = random_morphism(rng, g.order());
    (g.relabel(&morphism), morphism)
}

#[test]
fn test_extreme_ratios() {
    let mut rng = Pcg64Mcg::seed_from_u64(7);
    assert_eq!(random_digraph(&mut rng, 6, 0.0), Digraph::with_order(6));
    let full = random_digraph(&mut rng, 6, 1.0);
    assert_eq!(full.size(), 36);
    assert!((0..6).all(|v| full.has_loop(v)));
}
#[test]
fn test_seeded() {
    let a = random_digraph(&mut Pcg64Mcg::seed_from_u64(42), 30, 0.25);
    let b = random_digraph(&mut Pcg64Mcg::seed_from_u64(42), 30, 0.25);
    assert_eq!(a, b);
    for adj in a.adjacencies() {
        let neighbors: Vec<_> = adj.neighbors().collect();
        assert!(neighbors.windows(2).all(|w| w[0] < w[1]));
    }
}
#[test]
fn test_shuffled() {
    let mut rng = Pcg64Mcg::seed_from_u64(3);
    let g = random_digraph(&mut rng, 20, 0.3);
    let (h, m) = shuffled(&mut rng, &g);
    assert_eq!(m.order(), 20);
    assert!(Morphism::try_from(m.iter().collect::<Vec<_>>()).is_ok());
    assert!(g.verify_mapping(&h, &m));
    assert_eq!(h.relabel(&m.inverse()), {
        let mut sorted = g.clone();
        sorted.apply_morphism(&Morphism::identity(20)).unwrap();
        sorted
    });
}
