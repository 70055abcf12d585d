//! Bounded multi-path best-trust BFS over the committed trust registry.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use quidnet_core::constants::{
    DEFAULT_TRUST_MAX_DEPTH, MAX_TRUST_QUEUE_SIZE, MAX_TRUST_VISITED_SIZE,
};
use quidnet_core::{QuidId, QuidnetError};

/// Adjacency view of the trust registry: truster → trustee → level.
pub type TrustGraphView = HashMap<QuidId, HashMap<QuidId, f64>>;

/// The outcome of a relational trust computation.
///
/// `graph_too_large` is data, not control flow: when set, the traversal
/// hit its resource caps and `level`/`path` are the best found so far.
/// Callers (notably block acceptance) use the partial value rather than
/// treating it as zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustResult {
    pub level: f64,
    pub path: Vec<QuidId>,
    pub graph_too_large: bool,
}

impl TrustResult {
    fn none() -> Self {
        Self {
            level: 0.0,
            path: Vec::new(),
            graph_too_large: false,
        }
    }

    /// Error view of a partial result, for surfaces that report it.
    pub fn error(&self) -> Option<QuidnetError> {
        self.graph_too_large.then_some(QuidnetError::TrustGraphTooLarge)
    }
}

/// Resolve a caller-supplied depth: absent means the protocol default.
pub fn effective_depth(max_depth: Option<usize>) -> usize {
    max_depth.unwrap_or(DEFAULT_TRUST_MAX_DEPTH)
}

struct QueueItem {
    node: QuidId,
    cumulative: f64,
    path: Vec<QuidId>,
}

/// Best-trust BFS from `observer` toward `target`.
///
/// Semantics of "best": the maximum over acyclic paths of at most
/// `max_depth` hops of the product of edge levels along the path. Ties go
/// to the first-discovered path, which in BFS order means shorter paths
/// win equal products. Cycle avoidance is per path prefix: a node may be
/// reached again through a different prefix.
pub fn compute_trust(
    graph: &TrustGraphView,
    observer: &QuidId,
    target: &QuidId,
    max_depth: Option<usize>,
) -> Result<TrustResult, QuidnetError> {
    if observer.is_empty() || target.is_empty() {
        return Err(QuidnetError::ObserverOrTargetEmpty);
    }
    if observer == target {
        return Ok(TrustResult {
            level: 1.0,
            path: vec![observer.clone()],
            graph_too_large: false,
        });
    }
    let max_depth = effective_depth(max_depth);

    let mut best = TrustResult::none();
    let mut queue: VecDeque<QueueItem> = VecDeque::new();
    queue.push_back(QueueItem {
        node: observer.clone(),
        cumulative: 1.0,
        path: vec![observer.clone()],
    });
    let mut enqueued: usize = 1;
    let mut capped = false;

    'bfs: while let Some(item) = queue.pop_front() {
        // Hop limit: a node at depth max_depth may still *be* the target
        // (handled at enqueue time) but is not expanded further.
        if item.path.len() - 1 >= max_depth {
            continue;
        }
        let Some(edges) = graph.get(&item.node) else {
            continue;
        };
        for (trustee, level) in edges {
            if item.path.contains(trustee) {
                continue; // per-path cycle avoidance
            }
            let new_trust = item.cumulative * level;
            if new_trust <= 0.0 {
                continue; // zero-product prefixes cannot improve best
            }
            if trustee == target {
                if new_trust > best.level {
                    best.level = new_trust;
                    best.path = item.path.clone();
                    best.path.push(trustee.clone());
                }
                continue;
            }
            let mut path = item.path.clone();
            path.push(trustee.clone());
            queue.push_back(QueueItem {
                node: trustee.clone(),
                cumulative: new_trust,
                path,
            });
            enqueued += 1;
            if queue.len() > MAX_TRUST_QUEUE_SIZE || enqueued > MAX_TRUST_VISITED_SIZE {
                capped = true;
                break 'bfs;
            }
        }
    }

    if capped {
        warn!(
            observer = %observer,
            target = %target,
            best = best.level,
            "trust graph traversal capped; returning partial result"
        );
        best.graph_too_large = true;
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> QuidId {
        // Tests use short mnemonic ids; the validator enforces the
        // 16-hex shape, not the graph engine.
        QuidId::new(s)
    }

    fn graph(edges: &[(&str, &str, f64)]) -> TrustGraphView {
        let mut g: TrustGraphView = HashMap::new();
        for (a, b, l) in edges {
            g.entry(q(a)).or_default().insert(q(b), *l);
        }
        g
    }

    #[test]
    fn self_trust_is_always_one() {
        let g = graph(&[]);
        let r = compute_trust(&g, &q("a"), &q("a"), Some(5)).unwrap();
        assert_eq!(r.level, 1.0);
        assert_eq!(r.path, vec![q("a")]);
    }

    #[test]
    fn empty_observer_or_target_is_an_error() {
        let g = graph(&[]);
        assert!(matches!(
            compute_trust(&g, &q(""), &q("a"), Some(5)),
            Err(QuidnetError::ObserverOrTargetEmpty)
        ));
        assert!(matches!(
            compute_trust(&g, &q("a"), &q(""), Some(5)),
            Err(QuidnetError::ObserverOrTargetEmpty)
        ));
    }

    #[test]
    fn transitive_trust_multiplies_along_the_path() {
        // a→b = 0.8, b→c = 0.5 ⇒ trust(a,c) = 0.40 over [a,b,c].
        let g = graph(&[("a", "b", 0.8), ("b", "c", 0.5)]);
        let r = compute_trust(&g, &q("a"), &q("c"), Some(5)).unwrap();
        assert!((r.level - 0.40).abs() < 1e-12);
        assert_eq!(r.path, vec![q("a"), q("b"), q("c")]);
        assert!(!r.graph_too_large);
    }

    #[test]
    fn best_of_two_paths_wins() {
        let g = graph(&[
            ("a", "b", 0.5),
            ("b", "d", 0.5),
            ("a", "c", 0.9),
            ("c", "d", 0.9),
        ]);
        let r = compute_trust(&g, &q("a"), &q("d"), Some(5)).unwrap();
        assert!((r.level - 0.81).abs() < 1e-12);
        assert_eq!(r.path, vec![q("a"), q("c"), q("d")]);
    }

    #[test]
    fn cycles_do_not_prevent_termination() {
        let g = graph(&[
            ("a", "b", 0.8),
            ("b", "c", 0.6),
            ("c", "a", 0.7),
            ("b", "d", 0.9),
        ]);
        let r = compute_trust(&g, &q("a"), &q("d"), Some(5)).unwrap();
        assert!((r.level - 0.72).abs() < 1e-12);
        assert_eq!(r.path, vec![q("a"), q("b"), q("d")]);
    }

    #[test]
    fn depth_zero_reaches_nothing_but_self() {
        let g = graph(&[("a", "b", 0.9)]);
        let r = compute_trust(&g, &q("a"), &q("b"), Some(0)).unwrap();
        assert_eq!(r.level, 0.0);
        assert!(r.path.is_empty());
    }

    #[test]
    fn depth_limits_the_hop_count() {
        let g = graph(&[("a", "b", 0.9), ("b", "c", 0.9), ("c", "d", 0.9)]);
        let r = compute_trust(&g, &q("a"), &q("d"), Some(2)).unwrap();
        assert_eq!(r.level, 0.0);
        let r = compute_trust(&g, &q("a"), &q("d"), Some(3)).unwrap();
        assert!(r.level > 0.0);
        assert_eq!(r.path.len() - 1, 3);
    }

    #[test]
    fn absent_depth_defaults_to_protocol_depth() {
        let g = graph(&[("a", "b", 0.9)]);
        let r = compute_trust(&g, &q("a"), &q("b"), None).unwrap();
        assert!((r.level - 0.9).abs() < 1e-12);
    }

    #[test]
    fn level_stays_within_unit_interval() {
        let g = graph(&[("a", "b", 1.0), ("b", "c", 1.0), ("a", "c", 0.5)]);
        let r = compute_trust(&g, &q("a"), &q("c"), Some(5)).unwrap();
        assert_eq!(r.level, 1.0);
        assert_eq!(r.path, vec![q("a"), q("b"), q("c")]);
    }

    #[test]
    fn dense_graph_returns_partial_result_with_cap_flag() {
        // 200 nodes, 50 out-edges each; observer's direct trustee is the
        // target so a partial best exists before the caps trip.
        let mut g: TrustGraphView = HashMap::new();
        let id = |i: usize| QuidId::new(format!("{i:016x}"));
        for i in 0..200usize {
            let edges = g.entry(id(i)).or_default();
            for k in 1..=50usize {
                edges.insert(id((i + k) % 200), 0.9);
            }
        }
        let r = compute_trust(&g, &id(0), &id(1), Some(5)).unwrap();
        assert!(r.graph_too_large);
        assert!(r.level > 0.0, "partial best should have been found");
        assert!(matches!(r.error(), Some(QuidnetError::TrustGraphTooLarge)));
    }
}
