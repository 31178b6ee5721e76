//! Depth-first search over [`PropagationState`]s.
//!
//! The work list is an explicit stack of pending records.
//! A branch record only holds a shared handle to its parent state plus the assignment to try;
//! the child is materialized when the record is popped, so at most one live state per depth level is kept
//! besides the parents that still have queued siblings.

use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace};

use crate::state::{Problem, PropagationState};
use crate::{Digraph, Morphism};

/// Error type for a bounded search which gave up before deciding.
///
/// This is distinct from `Ok(None)`, which means the whole search space was explored and no mapping exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    /// [`SolverConfig::max_states`] states were materialized without an answer.
    #[error("gave up after materializing {0} states")]
    StateLimit(usize),
    /// [`SolverConfig::time_limit`] elapsed without an answer.
    #[error("gave up after {0:?}")]
    TimeLimit(Duration),
}

/// Limits for a single call to [`Solver::solve`]. The default is unbounded.
///
/// Limits are checked once per popped work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// Maximum number of states to materialize.
    pub max_states: Option<usize>,
    /// Maximum wall-clock time.
    pub time_limit: Option<Duration>,
}
impl SolverConfig {
    /// Returns an unbounded configuration.
    pub fn new() -> Self {
        Self::default()
    }
    /// Sets the maximum number of states to materialize.
    pub fn max_states(mut self, max: usize) -> Self {
        self.max_states = Some(max);
        self
    }
    /// Sets the maximum wall-clock time.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Counters describing the most recent run of a [`Solver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// States materialized, including the initial one.
    pub states: usize,
    /// Materialized states which turned out invalid.
    pub dead_ends: usize,
    /// Branch records pushed onto the work list.
    pub branches: usize,
    /// Longest the work list got.
    pub peak_pending: usize,
}

enum Pending<'a> {
    Initial,
    Branch { parent: Rc<PropagationState<'a>>, vertex: usize, candidate: usize },
}

/// A reusable isomorphism solver carrying its limits and the statistics of its last run.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
    stats: SearchStats,
}
impl Solver {
    /// Returns a solver with the given limits.
    pub fn new(config: SolverConfig) -> Self {
        Self { config, stats: Default::default() }
    }
    /// The limits this solver runs with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
    /// Statistics of the most recent call to [`Self::solve`].
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Searches for a morphism `m` such that `a.verify_mapping(b, &m)` holds, returning the first one found.
    ///
    /// Returns `Ok(None)` if the graphs have different orders (no state is materialized)
    /// or if the search space is exhausted.
    /// Fails only if one of the configured limits is exceeded first.
    ///
    /// Branch variables are chosen by [`PropagationState::select_branch_variable`],
    /// and the candidates of a variable are tried in ascending order.
    #[tracing::instrument(level = "debug", skip_all, fields(order = a.order(), edges = a.size()))]
    pub fn solve(&mut self, a: &Digraph, b: &Digraph) -> Result<Option<Morphism>, SearchError> {
        self.stats = Default::default();
        let problem = match Problem::new(a, b) {
            Some(problem) => problem,
            None => {
                debug!(other = b.order(), "vertex counts differ");
                return Ok(None);
            }
        };

        let started = Instant::now();
        let mut pending = vec![Pending::Initial];
        while let Some(next) = pending.pop() {
            self.check_limits(started)?;

            let state = match next {
                Pending::Initial => PropagationState::new(&problem),
                Pending::Branch { parent, vertex, candidate } => {
                    trace!(vertex, candidate, "branch");
                    parent.branch(vertex, candidate)
                }
            };
            self.stats.states += 1;

            if state.is_invalid() {
                self.stats.dead_ends += 1;
                continue;
            }
            if state.is_solved() {
                debug!(stats = ?self.stats, "found mapping");
                return Ok(state.into_morphism());
            }

            let vertex = match state.select_branch_variable() {
                Some(vertex) => vertex,
                None => continue,
            };
            let parent = Rc::new(state);
            if let Some(domain) = parent.domain(vertex) {
                for &candidate in domain.iter().rev() { // last pushed is tried first
                    pending.push(Pending::Branch { parent: Rc::clone(&parent), vertex, candidate });
                }
                self.stats.branches += domain.len();
            }
            self.stats.peak_pending = self.stats.peak_pending.max(pending.len());
        }

        debug!(stats = ?self.stats, "search space exhausted");
        Ok(None)
    }

    fn check_limits(&self, started: Instant) -> Result<(), SearchError> {
        if let Some(max) = self.config.max_states {
            if self.stats.states >= max { return Err(SearchError::StateLimit(max)); }
        }
        if let Some(limit) = self.config.time_limit {
            if started.elapsed() >= limit { return Err(SearchError::TimeLimit(limit)); }
        }
        Ok(())
    }
}

/// Searches for an isomorphism from `a` onto `b` without any limits (see [`Solver::solve`]).
pub fn solve(a: &Digraph, b: &Digraph) -> Option<Morphism> {
    Solver::default().solve(a, b).ok().flatten()
}

#[cfg(test)]
fn digraph(adj: &[&[usize]]) -> Digraph {
    Digraph::try_from(adj.iter().map(|a| a.to_vec()).collect::<Vec<_>>()).unwrap()
}

#[test]
fn test_sample_pair() {
    let a = digraph(&[&[0, 1, 5, 7], &[0, 5], &[2, 1, 4], &[0, 4], &[6], &[7, 4], &[7], &[6, 5, 1]]);
    let b = digraph(&[&[1, 5], &[1, 2, 3, 6], &[6, 5], &[2, 1], &[6], &[4], &[4, 2, 3], &[7, 3, 5]]);
    let mut solver = Solver::default();
    let m = solver.solve(&a, &b).unwrap().unwrap();
    assert_eq!(m, Morphism(vec![1, 3, 7, 0, 5, 2, 4, 6])); // the only one
    assert!(a.verify_mapping(&b, &m));
    assert!(a.relabel(&m).edge_set_eq(&b));
    assert!(solver.stats().states >= 1);
}
#[test]
fn test_different_orders() {
    let mut solver = Solver::default();
    assert_eq!(solver.solve(&Digraph::with_order(3), &Digraph::with_order(2)), Ok(None));
    assert_eq!(solver.stats().states, 0);
}
#[test]
fn test_trivial() {
    let single = digraph(&[&[]]);
    assert_eq!(solve(&single, &single), Some(Morphism::identity(1)));
    assert_eq!(solve(&Digraph::new(), &Digraph::new()), Some(Morphism::identity(0)));
}
#[test]
fn test_disjoint_degrees() {
    let a = digraph(&[&[1, 2], &[0, 2], &[0, 1]]);
    let b = digraph(&[&[1], &[2], &[0]]);
    let mut solver = Solver::default();
    assert_eq!(solver.solve(&a, &b), Ok(None));
    assert_eq!(solver.stats().states, 1);
    assert_eq!(solver.stats().dead_ends, 1);
}
#[test]
fn test_same_degrees_not_isomorphic() {
    let two_cycles = digraph(&[&[1], &[0], &[3], &[2]]);
    let four_cycle = digraph(&[&[1], &[2], &[3], &[0]]);
    let mut solver = Solver::default();
    assert_eq!(solver.solve(&two_cycles, &four_cycle), Ok(None));
    assert!(solver.stats().dead_ends > 0);
    assert_eq!(solver.stats().branches, 4); // every vertex has out-degree 1
    assert_eq!(solver.stats().peak_pending, 4);
    assert_eq!(solve(&four_cycle, &two_cycles), None);
}
#[test]
fn test_limits() {
    let two_cycles = digraph(&[&[1], &[0], &[3], &[2]]);
    let four_cycle = digraph(&[&[1], &[2], &[3], &[0]]);

    let mut solver = Solver::new(SolverConfig::new().max_states(1));
    assert_eq!(solver.solve(&two_cycles, &four_cycle), Err(SearchError::StateLimit(1)));
    assert_eq!(solver.stats().states, 1);

    let mut solver = Solver::new(SolverConfig::new().max_states(0));
    assert_eq!(solver.solve(&four_cycle, &four_cycle), Err(SearchError::StateLimit(0)));

    let mut solver = Solver::new(SolverConfig::new().time_limit(Duration::from_secs(60)));
    assert_eq!(solver.config().time_limit, Some(Duration::from_secs(60)));
    assert!(solver.solve(&four_cycle, &four_cycle).unwrap().is_some());
}
#[test]
fn test_time_limit() {
    let two_cycles = digraph(&[&[1], &[0], &[3], &[2]]);
    let four_cycle = digraph(&[&[1], &[2], &[3], &[0]]);

    let mut solver = Solver::new(SolverConfig::new().time_limit(Duration::ZERO));
    assert_eq!(solver.solve(&two_cycles, &four_cycle), Err(SearchError::TimeLimit(Duration::ZERO)));
    assert_eq!(solver.stats().states, 0);

    let mut solver = Solver::default();
    assert_eq!(solver.config(), &SolverConfig::new());
    assert_eq!(solver.solve(&two_cycles, &four_cycle), Ok(None));
}
#[test]
fn test_smallest_candidate_first() {
    let cycle = digraph(&[&[1], &[2], &[3], &[0]]);
    assert_eq!(solve(&cycle, &cycle), Some(Morphism::identity(4)));
}
