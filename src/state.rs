//! Partial mappings between two graphs, and the propagation rule that narrows them.
//!
//! A [`PropagationState`] maps some vertices of graph `a` onto vertices of graph `b`.
//! Every vertex of `a` which is not yet mapped has a *domain*: the vertices of `b` it could still be mapped to.
//! Values taken by a mapping are removed from every domain, so the mapping stays injective.
//!
//! Propagation only acts on forced values: whenever a domain shrinks to a single candidate, that candidate is committed,
//! and whenever a domain becomes empty the state is marked invalid.
//! A domain which shrinks to two or more candidates does not trigger anything, which is why the [`search`](crate::search)
//! module has to branch on the remaining choices.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::trace;

use crate::{Digraph, Morphism, SortedAdjacencies};

/// The read-only side of a search: both graphs plus the lookup tables every state shares.
#[derive(PartialEq, Eq, Debug)]
pub struct Problem<'a> {
    a: &'a Digraph,
    b: &'a Digraph,
    a_in: Digraph, // transpose of a
    b_out: SortedAdjacencies,
    b_in: SortedAdjacencies,
}
impl<'a> Problem<'a> {
    /// Prepares the lookup tables for mapping `a` onto `b`.
    /// Returns `None` if the graphs have different orders, since no mapping can exist.
    pub fn new(a: &'a Digraph, b: &'a Digraph) -> Option<Self> {
        if a.order() != b.order() { return None; }
        let a_in = { let mut t = a.clone(); t.transpose(); t };
        let b_in = { let mut t = b.clone(); t.transpose(); SortedAdjacencies::new(&t) };
        Some(Self { a, b, a_in, b_out: SortedAdjacencies::new(b), b_in })
    }
    /// The graph being mapped from.
    pub fn source(&self) -> &'a Digraph {
        self.a
    }
    /// The graph being mapped onto.
    pub fn target(&self) -> &'a Digraph {
        self.b
    }
}

/// A partial, injective mapping from the vertices of [`Problem::source`] to those of [`Problem::target`],
/// together with the candidate domain of every unmapped vertex.
///
/// States are plain values: [`Self::branch`] returns an independent copy and never touches `self`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PropagationState<'a> {
    problem: &'a Problem<'a>,
    mapping: Vec<Option<usize>>,
    reverse: Vec<Option<usize>>,
    domains: BTreeMap<usize, BTreeSet<usize>>,
    invalid: bool,
}
impl<'a> PropagationState<'a> {
    /// Builds the initial state and propagates it.
    ///
    /// Each vertex starts with every vertex of the target graph having the same out-degree.
    /// If no such vertex exists the domain is empty, and propagation marks the state invalid.
    pub fn new(problem: &'a Problem<'a>) -> Self {
        let (a, b) = (problem.a, problem.b);
        let buckets = (0..b.order()).map(|v| (b.degree(v), v)).into_group_map();
        let domains: BTreeMap<usize, BTreeSet<usize>> = (0..a.order()).map(|v| {
            let domain = buckets.get(&a.degree(v)).map(|ids| ids.iter().copied().collect()).unwrap_or_default();
            (v, domain)
        }).collect();

        let mut state = Self {
            problem,
            mapping: vec![None; a.order()],
            reverse: vec![None; b.order()],
            domains,
            invalid: false,
        };
        state.propagate();
        state
    }

    /// Checks if this state has been proven to be a dead end.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }
    /// Checks if every vertex is mapped without contradiction.
    pub fn is_solved(&self) -> bool {
        !self.invalid && self.domains.is_empty()
    }
    /// Returns the vertex that `vert` is currently mapped to, if any.
    pub fn mapping(&self, vert: usize) -> Option<usize> {
        self.mapping.get(vert).copied().flatten()
    }
    /// Returns the vertex currently mapped onto `vert` of the target graph, if any.
    pub fn preimage(&self, vert: usize) -> Option<usize> {
        self.reverse.get(vert).copied().flatten()
    }
    /// Returns the remaining candidates for `vert`, or `None` if it is already mapped.
    pub fn domain(&self, vert: usize) -> Option<&BTreeSet<usize>> {
        self.domains.get(&vert)
    }
    /// Iterates over the unmapped vertices in ascending order.
    pub fn unmapped(&self) -> impl Iterator<Item = usize> + '_ {
        self.domains.keys().copied()
    }

    /// Converts a solved state into the mapping it found.
    /// Returns `None` if the state is not solved.
    pub fn into_morphism(self) -> Option<Morphism> {
        if !self.is_solved() { return None; }
        self.mapping.into_iter().collect::<Option<Vec<_>>>().map(Morphism)
    }

    /// Maps `id` to `to` and narrows the affected domains.
    ///
    /// `to` is removed from every other domain.
    /// An edge `id -> n` must become an edge `to -> mapping(n)`, so out-neighbors of `id` keep only out-neighbors of `to`;
    /// likewise in-neighbors of `id` keep only in-neighbors of `to`.
    ///
    /// Panics if `id` is already mapped or `to` is not in its domain.
    fn commit(&mut self, id: usize, to: usize) {
        let domain = match self.domains.remove(&id) {
            Some(domain) => domain,
            None => panic!("vertex {} has already been mapped", id),
        };
        assert!(domain.contains(&to), "{} is not a candidate for vertex {}", to, id);
        trace!(id, to, "commit");

        self.mapping[id] = Some(to);
        self.reverse[to] = Some(id);
        for domain in self.domains.values_mut() {
            domain.remove(&to);
        }

        let problem = self.problem;
        if problem.a.has_loop(id) && !problem.b_out.contains(to, to) {
            self.invalid = true;
            return;
        }
        for &n in problem.a.0[id].iter() {
            if let Some(domain) = self.domains.get_mut(&n) {
                domain.retain(|&c| problem.b_out.contains(to, c));
            }
        }
        for &p in problem.a_in.0[id].iter() {
            if let Some(domain) = self.domains.get_mut(&p) {
                domain.retain(|&c| problem.b_in.contains(to, c));
            }
        }
    }

    /// Commits forced values until nothing is forced any more.
    ///
    /// Scanning in ascending vertex order, an empty domain marks the state invalid and stops,
    /// and the first singleton domain is committed before scanning again.
    /// Running this on a state which is already at its fixpoint changes nothing.
    pub fn propagate(&mut self) {
        while !self.invalid {
            let mut forced = None;
            for (&v, domain) in self.domains.iter() {
                match domain.len() {
                    0 => {
                        trace!(v, "empty domain");
                        self.invalid = true;
                        return;
                    }
                    1 => {
                        forced = domain.iter().next().map(|&to| (v, to));
                        break;
                    }
                    _ => (),
                }
            }
            match forced {
                Some((v, to)) => self.commit(v, to),
                None => return,
            }
        }
    }

    /// Picks the unmapped vertex with the fewest candidates, breaking ties by the smallest vertex.
    /// Returns `None` if the state is invalid or solved.
    pub fn select_branch_variable(&self) -> Option<usize> {
        if self.invalid { return None; }
        self.domains.iter().min_by_key(|&(&v, domain)| (domain.len(), v)).map(|(&v, _)| v)
    }

    /// Returns a copy of this state with `id` mapped to `to`, propagated to its fixpoint.
    ///
    /// Panics if `id` is already mapped or `to` is not in its domain.
    pub fn branch(&self, id: usize, to: usize) -> Self {
        let mut next = self.clone();
        next.commit(id, to);
        next.propagate();
        next
    }
}

#[cfg(test)]
fn digraph(adj: &[&[usize]]) -> Digraph {
    Digraph::try_from(adj.iter().map(|a| a.to_vec()).collect::<Vec<_>>()).unwrap()
}

#[cfg(test)]
fn assert_consistent(state: &PropagationState) {
    for (v, to) in state.mapping.iter().enumerate() {
        match to {
            Some(to) => {
                assert_eq!(state.reverse[*to], Some(v));
                assert!(state.domain(v).is_none());
                assert!(state.domains.values().all(|d| !d.contains(to)));
            }
            None => assert!(state.domain(v).is_some()),
        }
    }
    assert_eq!(state.reverse.iter().flatten().count(), state.mapping.iter().flatten().count());
}

#[test]
fn test_initial_domains() {
    let cycle = digraph(&[&[1], &[2], &[3], &[0]]);
    let problem = Problem::new(&cycle, &cycle).unwrap();
    let state = PropagationState::new(&problem);
    assert!(!state.is_invalid());
    assert!(!state.is_solved());
    assert_eq!(state.unmapped().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(state.domain(2).unwrap().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(state.select_branch_variable(), Some(0));
    assert_consistent(&state);

    // degrees 2, 1, 0 each appear once, so everything is forced
    let a = digraph(&[&[1, 2], &[2], &[]]);
    let b = digraph(&[&[], &[0, 2], &[0]]);
    let problem = Problem::new(&a, &b).unwrap();
    let state = PropagationState::new(&problem);
    assert!(state.is_solved());
    assert_eq!(state.select_branch_variable(), None);
    assert_eq!(state.preimage(0), Some(2));
    assert_eq!(state.into_morphism(), Some(Morphism(vec![1, 2, 0])));
}
#[test]
fn test_missing_degree_bucket() {
    let a = digraph(&[&[1, 2], &[], &[]]);
    let b = digraph(&[&[1], &[2], &[]]);
    let problem = Problem::new(&a, &b).unwrap();
    let state = PropagationState::new(&problem);
    assert!(state.is_invalid());
    assert!(!state.is_solved());
    assert_eq!(state.select_branch_variable(), None);
    assert_eq!(state.into_morphism(), None);

    assert!(std::ptr::eq(problem.source(), &a));
    assert!(std::ptr::eq(problem.target(), &b));
    assert!(Problem::new(&a, &Digraph::with_order(2)).is_none());
}
#[test]
fn test_commit_narrows_both_directions() {
    let cycle = digraph(&[&[1], &[2], &[3], &[0]]);
    let problem = Problem::new(&cycle, &cycle).unwrap();
    let mut state = PropagationState::new(&problem);
    state.commit(0, 2);
    assert_eq!(state.mapping(0), Some(2));
    assert_eq!(state.preimage(2), Some(0));
    assert_eq!(state.domain(1).unwrap().iter().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(state.domain(2).unwrap().iter().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(state.domain(3).unwrap().iter().copied().collect::<Vec<_>>(), vec![1]);
    assert_consistent(&state);

    state.propagate();
    assert!(state.is_solved());
    assert_consistent(&state);
    assert_eq!(state.into_morphism(), Some(Morphism(vec![2, 3, 0, 1])));
}
#[test]
fn test_branch_leaves_parent() {
    let cycle = digraph(&[&[1], &[2], &[3], &[0]]);
    let problem = Problem::new(&cycle, &cycle).unwrap();
    let state = PropagationState::new(&problem);
    let before = state.clone();
    let child = state.branch(0, 1);
    assert_eq!(state, before);
    assert!(child.is_solved());
    assert_eq!(child.mapping(3), Some(0));
}
#[test]
fn test_propagate_idempotent() {
    let a = digraph(&[&[1, 2], &[0], &[0], &[4], &[3]]);
    let problem = Problem::new(&a, &a).unwrap();
    let state = PropagationState::new(&problem);
    let mut again = state.clone();
    again.propagate();
    assert_eq!(state, again);

    let child = state.branch(1, 1);
    let mut again = child.clone();
    again.propagate();
    assert_eq!(child, again);
    assert_consistent(&child);
}
#[test]
fn test_loop_mismatch() {
    let a = digraph(&[&[0], &[0]]);
    let b = digraph(&[&[1], &[1]]);
    let problem = Problem::new(&a, &b).unwrap();
    let state = PropagationState::new(&problem);
    assert!(!state.is_invalid());
    assert!(state.branch(0, 0).is_invalid());
    assert!(!state.branch(0, 1).is_invalid());
}
#[test]
fn test_smallest_domain_first() {
    // vertices 2 and 3 share degree 2, the rest share degree 1
    let a = digraph(&[&[1], &[0], &[3, 4], &[2, 4], &[3]]);
    let problem = Problem::new(&a, &a).unwrap();
    let state = PropagationState::new(&problem);
    assert_eq!(state.domain(2).map(|d| d.len()), Some(2));
    assert_eq!(state.domain(0).map(|d| d.len()), Some(3));
    assert_eq!(state.select_branch_variable(), Some(2));
}
#[test]
#[should_panic(expected = "already been mapped")]
fn test_commit_twice() {
    let cycle = digraph(&[&[1], &[2], &[0]]);
    let problem = Problem::new(&cycle, &cycle).unwrap();
    let mut state = PropagationState::new(&problem);
    state.commit(0, 0);
    state.commit(0, 1);
}
#[test]
#[should_panic(expected = "is not a candidate")]
fn test_commit_outside_domain() {
    let cycle = digraph(&[&[1], &[2], &[3], &[0]]);
    let problem = Problem::new(&cycle, &cycle).unwrap();
    let mut state = PropagationState::new(&problem);
    state.commit(0, 2);
    state.commit(1, 0);
}
