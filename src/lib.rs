#![forbid(unsafe_code)]

//! digraph-iso is a crate for deciding whether two directed graphs are isomorphic.
//!
//! Given two graphs with the same number of vertices, the solver looks for a relabeling (a [`Morphism`]) of the first graph
//! which carries every edge onto an edge of the second.
//! The search is a constraint-propagation engine: every unmapped vertex keeps a *domain* of candidate targets,
//! forced assignments are committed eagerly, and the remaining choices are explored depth-first (see [`search`]).
//!
//! ```
//! use digraph_iso::{Digraph, Morphism};
//!
//! let g = Digraph::try_from(vec![vec![1, 2], vec![2], vec![0]]).unwrap();
//! let h = g.relabel(&Morphism::try_from(vec![2, 0, 1]).unwrap());
//! let found = g.get_isomorphism(&h).unwrap();
//! assert!(g.verify_mapping(&h, &found));
//! ```

use std::ops::Index;
use std::{fmt, fmt::Debug, mem};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use superslice::Ext;
use thiserror::Error;

pub mod random;
pub mod search;
pub mod state;

pub use search::{solve, SearchError, SearchStats, Solver, SolverConfig};

/// Error type for constructing a [`Morphism`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MorphismError {
    /// The input had out of bounds values.
    /// This could also be consider a `NotSurjective` error, but is differentiated for convenience.
    #[error("morphism maps a vertex out of bounds")]
    OutOfBounds,
    /// The input had duplicate values.
    #[error("morphism maps two vertices to the same target")]
    NotInjective,
    /// The input did not cover all values.
    #[error("morphism does not cover every vertex")]
    NotSurjective,
}
/// Error type for applying a [`Morphism`] to a [`Digraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MorphismUsageError {
    /// The items were defined for different domains (different number of vertices).
    #[error("morphism and graph have different orders")]
    DifferentOrder,
}

/// A morphism (relabeling rule) on a labeled graph.
///
/// A morphism is a vertex label permutation, which in this library is formally defined as a bijection `Zn -> Zn` where `n` is the number of vertices.
/// In essence, vertex `i` will be mapped to `morphism[i]`.
///
/// Arbitrary morphisms can be constructed directly via [`Morphism::try_from`], which checks the bijection constraints.
/// The solver also returns its answers in this form.
///
/// [`Eq`] is implemented to check that both the order (number of vertices) and mappings are equivalent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Morphism(pub(crate) Vec<usize>);
impl Morphism {
    /// Returns the morphism which maps every vertex of `0..order` to itself.
    pub fn identity(order: usize) -> Self {
        Self((0..order).collect())
    }
    /// Returns the number of vertices the morphism is defined over, being `0..order()`.
    pub fn order(&self) -> usize {
        self.0.len()
    }
    /// Iterates over all the output values of the morphism function.
    /// To get the input values as well, wrap it in `enumerate()`.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
    /// Returns the morphism which undoes this one.
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.order()];
        for (i, v) in self.iter().enumerate() {
            inv[v] = i;
        }
        Self(inv)
    }
}
impl Index<usize> for Morphism {
    type Output = usize;
    fn index(&self, index: usize) -> &usize {
        &self.0[index]
    }
}
impl TryFrom<Vec<usize>> for Morphism {
    type Error = MorphismError;
    fn try_from(val: Vec<usize>) -> Result<Self, Self::Error> {
        let mut flags = vec![false; val.len()];
        for &v in val.iter() {
            if v >= val.len() { return Err(MorphismError::OutOfBounds); }
            if flags[v] { return Err(MorphismError::NotInjective); }
            flags[v] = true;
        }
        if flags.into_iter().any(|v| !v) { return Err(MorphismError::NotSurjective); }
        Ok(Self(val))
    }
}
impl From<Morphism> for Vec<usize> {
    fn from(morphism: Morphism) -> Self {
        morphism.0
    }
}
impl fmt::Debug for Morphism {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Error type for adding an edge to a [`Digraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EdgeError {
    /// One of the vertices was invalid (out of bounds).
    #[error("edge endpoint is not a vertex of the graph")]
    OutOfBounds,
}

/// Represents the adjacency list of a vertex in a graph.
///
/// This is the ordered list of outgoing neighbors exactly as it was built.
/// Note that depending on the graph, this could include duplicate edges or loops.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Adjacency<'a>(&'a [usize]);
impl<'a> Adjacency<'a> {
    /// Returns all the outgoing neighbors of this vertex, in stored order.
    pub fn neighbors(&self) -> impl Iterator<Item = usize> + 'a {
        self.0.iter().copied()
    }
    /// Returns the number of outgoing edges (the out-degree), counting duplicates.
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// Checks if this vertex has no outgoing edges.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Checks if there is at least one edge to `dest`.
    pub fn contains(&self, dest: usize) -> bool {
        self.0.contains(&dest)
    }
}
impl<'a> Debug for Adjacency<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            [a, b @ ..] => {
                write!(f, "{{{}", a)?;
                for e in b {
                    write!(f, ", {}", e)?;
                }
                write!(f, "}}")
            }
            [] => write!(f, "{{}}"),
        }
    }
}

/// Sorted copies of every adjacency list of a graph, for logarithmic edge lookups.
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) struct SortedAdjacencies(Vec<Vec<usize>>);
impl SortedAdjacencies {
    pub(crate) fn new(g: &Digraph) -> Self {
        Self(g.0.iter().map(|adj| adj.iter().copied().sorted().collect()).collect())
    }
    /// Checks for an edge `a -> b`. `a` must be a vertex.
    pub(crate) fn contains(&self, a: usize, b: usize) -> bool {
        let adj = &self.0[a];
        !adj[adj.equal_range(&b)].is_empty()
    }
}

/// A directed graph, stored as one adjacency list per vertex.
///
/// Vertices are labeled `0..order`. Duplicate edges and loops are permitted, and adjacency lists keep the order they were built in;
/// comparisons like [`Self::edge_subset_eq`] treat each list as a set.
/// Every stored neighbor is guaranteed to be a valid vertex.
///
/// This type implements [`Eq`] to test equivalence as a labeled graph (not isomorpic equivalence).
/// If you want to compare graphs based on isomorphism, use [`Self::get_isomorphism`].
///
/// With serde, a graph is represented as an array of adjacency lists, e.g. `[[1, 2], [2], []]`.
#[derive(PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<usize>>", into = "Vec<Vec<usize>>")]
pub struct Digraph(Vec<Vec<usize>>);
impl Digraph {
    /// Returns a new, empty graph.
    pub fn new() -> Self {
        Self(vec![])
    }
    /// Returns a disconnected graph with the specified number of vertices (labeled `0..order`).
    /// This is equivalent to repeatedly calling [`Self::add_vertex`].
    pub fn with_order(order: usize) -> Self {
        Self(vec![vec![]; order])
    }
    /// Returns the graph order, the number of vertices.
    pub fn order(&self) -> usize {
        self.0.len()
    }
    /// Returns the number of edges, counting duplicates.
    pub fn size(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }
    /// Checks if this is an empty graph (no vertices).
    pub fn is_empty(&self) -> bool {
        self.order() == 0
    }

    /// Adds a new (disconnected) vertex to the graph and returns its index (used for other operations).
    /// The returned indices simply start at 0 and increment by 1; they are only returned for convenience.
    pub fn add_vertex(&mut self) -> usize {
        self.0.push(vec![]);
        self.0.len() - 1
    }
    /// Adds a directed edge `a -> b` at the end of `a`'s adjacency list.
    /// Note that this will create a duplicate (multi) edge if such an edge already existed.
    /// Fails if `a` or `b` is not a valid vertex index.
    pub fn add_directed_edge(&mut self, a: usize, b: usize) -> Result<(), EdgeError> {
        if a >= self.order() || b >= self.order() { return Err(EdgeError::OutOfBounds); }
        self.0[a].push(b);
        Ok(())
    }

    /// Gets the adjacency list for the specified vertex.
    /// Returns `None` if the vertex index is invalid.
    pub fn adjacency(&self, vert: usize) -> Option<Adjacency> {
        self.0.get(vert).map(|e| Adjacency(e))
    }
    /// Iterates through all the vertices in order, as if by calling [`Self::adjacency`] repeatedly.
    /// To get the vertex index as well, you can wrap this in `enumerate()`.
    pub fn adjacencies(&self) -> impl Iterator<Item = Adjacency> {
        self.0.iter().map(|e| Adjacency(e))
    }
    /// Returns the out-degree of a vertex (duplicate edges are counted).
    /// Panics if the vertex index is invalid.
    pub fn degree(&self, vert: usize) -> usize {
        self.0[vert].len()
    }
    /// Checks if the graph contains the edge `a -> b`.
    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.0.get(a).map_or(false, |adj| adj.contains(&b))
    }
    /// Checks if the vertex has a loop (an edge to itself).
    pub fn has_loop(&self, vert: usize) -> bool {
        self.has_edge(vert, vert)
    }

    /// Applies the morphism to the current graph.
    /// Vertex `i` becomes vertex `morphism[i]`, and every adjacency list is sorted afterwards to give a canonical form.
    /// Fails if the graph and morphism have different orders.
    pub fn apply_morphism(&mut self, morphism: &Morphism) -> Result<(), MorphismUsageError> {
        if morphism.order() != self.order() { return Err(MorphismUsageError::DifferentOrder); }
        let old = mem::take(&mut self.0);
        self.0.resize_with(old.len(), Default::default);
        for (v, adj) in morphism.iter().zip(old) {
            self.0[v] = adj;
        }
        for adj in self.0.iter_mut() {
            for w in adj.iter_mut() {
                *w = morphism[*w];
            }
            adj.sort_unstable();
        }
        Ok(())
    }
    /// Returns a copy of this graph relabeled by the morphism (see [`Self::apply_morphism`]).
    ///
    /// # Panics
    ///
    /// Panics if the morphism is not defined over exactly this graph's vertices.
    pub fn relabel(&self, morphism: &Morphism) -> Self {
        assert_eq!(morphism.order(), self.order(), "relabeling a graph of order {} with a morphism of order {}", self.order(), morphism.order());
        let mut g = Self::with_order(self.order());
        for (v, adj) in self.0.iter().enumerate() {
            let target = &mut g.0[morphism[v]];
            target.extend(adj.iter().map(|&w| morphism[w]));
            target.sort_unstable();
        }
        g
    }

    /// Checks that both graphs have the same order and that every edge of this graph is also an edge of `other`.
    ///
    /// Note that this is a one-directional containment check, not set equality:
    /// `other` may have strictly more edges and still compare equal.
    /// Use [`Self::edge_set_eq`] for the symmetric check.
    pub fn edge_subset_eq(&self, other: &Self) -> bool {
        if self.order() != other.order() { return false; }
        let other = SortedAdjacencies::new(other);
        self.0.iter().enumerate().all(|(v, adj)| adj.iter().all(|&w| other.contains(v, w)))
    }
    /// Checks that both graphs have the same order and the same edge set (adjacency lists compared as sets).
    pub fn edge_set_eq(&self, other: &Self) -> bool {
        self.edge_subset_eq(other) && other.edge_subset_eq(self)
    }
    /// Checks that relabeling this graph by `morphism` yields a graph whose edges are all present in `other`
    /// (as by [`Self::edge_subset_eq`]).
    /// Returns `false` if the morphism is not defined over this graph's vertices.
    pub fn verify_mapping(&self, other: &Self, morphism: &Morphism) -> bool {
        if morphism.order() != self.order() { return false; }
        self.relabel(morphism).edge_subset_eq(other)
    }

    /// Checks if this graph is isomorphic to another graph.
    /// If they are isomorphic, returns a morphism such that relabeling this graph by it yields the other graph.
    /// If they are not isomorphic (including graphs of different order), returns `None`.
    pub fn get_isomorphism(&self, other: &Self) -> Option<Morphism> {
        solve(self, other)
    }

    /// Flips all the (directed) edges in the graph.
    /// Afterwards, each adjacency list holds the former in-neighbors of its vertex, sorted.
    pub fn transpose(&mut self) {
        let old = mem::take(&mut self.0);
        self.0.resize_with(old.len(), Default::default);

        for (a, adj) in old.into_iter().enumerate() {
            for b in adj {
                self.0[b].push(a); // reverse all the edges
            }
        }
        for n in self.0.iter_mut() {
            n.sort_unstable();
        }
    }
}
impl TryFrom<Vec<Vec<usize>>> for Digraph {
    type Error = EdgeError;
    fn try_from(val: Vec<Vec<usize>>) -> Result<Self, Self::Error> {
        let order = val.len();
        if val.iter().flatten().any(|&v| v >= order) { return Err(EdgeError::OutOfBounds); }
        Ok(Self(val))
    }
}
impl From<Digraph> for Vec<Vec<usize>> {
    fn from(g: Digraph) -> Self {
        g.0
    }
}
impl Debug for Digraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut adj = self.adjacencies();
        match adj.next() {
            None => write!(f, "[]"),
            Some(first) => {
                write!(f, "[{:?}", first)?;
                for n in adj {
                    write!(f, ", {:?}", n)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
fn digraph(adj: &[&[usize]]) -> Digraph {
    Digraph::try_from(adj.iter().map(|a| a.to_vec()).collect::<Vec<_>>()).unwrap()
}

#[test]
fn test_morphism() {
    assert_eq!(Morphism::try_from(vec![2, 0, 1]).map(|m| m.order()), Ok(3));
    assert_eq!(Morphism::try_from(Vec::<usize>::new()), Ok(Morphism::identity(0)));
    assert_eq!(Morphism::try_from(vec![0, 3, 1]), Err(MorphismError::OutOfBounds));
    assert_eq!(Morphism::try_from(vec![0, 1, 1]), Err(MorphismError::NotInjective));

    let m = Morphism::try_from(vec![3, 0, 2, 1]).unwrap();
    let inv = m.inverse();
    for i in 0..4 {
        assert_eq!(inv[m[i]], i);
    }
    assert_eq!(inv.inverse(), m);
}
#[test]
fn test_build() {
    let mut g = Digraph::with_order(3);
    assert_eq!(g.order(), 3);
    assert_eq!(g, Digraph::with_order(3));
    assert_ne!(g, Digraph::with_order(2));
    g.add_directed_edge(0, 2).unwrap();
    g.add_directed_edge(0, 1).unwrap();
    g.add_directed_edge(0, 1).unwrap();
    g.add_directed_edge(2, 2).unwrap();
    assert_eq!(g.add_directed_edge(0, 3), Err(EdgeError::OutOfBounds));
    assert_eq!(g.add_vertex(), 3);

    assert_eq!(g.adjacency(0).unwrap().neighbors().collect::<Vec<_>>(), vec![2, 1, 1]);
    assert_eq!(g.degree(0), 3);
    assert_eq!(g.size(), 4);
    assert!(g.has_loop(2));
    assert!(!g.has_loop(0));
    assert!(g.adjacency(3).unwrap().is_empty());
    assert!(g.adjacency(4).is_none());
    assert_eq!(format!("{:?}", g), "[{2, 1, 1}, {}, {2}, {}]");

    assert_eq!(Digraph::try_from(vec![vec![1], vec![2]]), Err(EdgeError::OutOfBounds));
}
#[test]
fn test_relabel() {
    let g = digraph(&[&[2, 1], &[2], &[0]]);
    let m = Morphism::try_from(vec![2, 0, 1]).unwrap();
    let h = g.relabel(&m);
    assert_eq!(h, digraph(&[&[1], &[2], &[0, 1]]));

    let mut gg = g.clone();
    gg.apply_morphism(&m).unwrap();
    assert_eq!(gg, h);
    assert_eq!(gg.apply_morphism(&Morphism::identity(2)), Err(MorphismUsageError::DifferentOrder));

    assert!(g.verify_mapping(&h, &m));
    assert!(!g.verify_mapping(&h, &Morphism::identity(3)));
    assert!(!g.verify_mapping(&h, &Morphism::identity(2)));
    assert!(h.verify_mapping(&g, &m.inverse()));
}
#[test]
#[should_panic]
fn test_relabel_wrong_order() {
    digraph(&[&[1], &[0]]).relabel(&Morphism::identity(3));
}
#[test]
fn test_edge_subset_eq() {
    let small = digraph(&[&[1], &[], &[0]]);
    let big = digraph(&[&[1, 2], &[0], &[0]]);
    assert!(small.edge_subset_eq(&big)); // containment only
    assert!(!big.edge_subset_eq(&small));
    assert!(!small.edge_set_eq(&big));
    assert!(!small.edge_subset_eq(&Digraph::with_order(2)));

    // adjacency lists compare as sets
    let dup = digraph(&[&[2, 1, 2], &[0], &[0, 0]]);
    assert!(dup.edge_set_eq(&big));
    assert_ne!(dup, big);
}
#[test]
fn test_transpose() {
    let mut g = digraph(&[&[1, 2], &[2], &[0, 2]]);
    g.transpose();
    assert_eq!(g, digraph(&[&[2], &[0], &[0, 1, 2]]));
}
#[test]
fn test_serde() {
    let g: Digraph = serde_json::from_str("[[1,2],[2],[]]").unwrap();
    assert_eq!(g, digraph(&[&[1, 2], &[2], &[]]));
    assert_eq!(serde_json::to_string(&g).unwrap(), "[[1,2],[2],[]]");
    assert!(serde_json::from_str::<Digraph>("[[3]]").is_err());
    assert!(serde_json::from_str::<Morphism>("[1,1]").is_err());
}
