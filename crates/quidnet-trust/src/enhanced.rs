//! Dual-layer trust computation over the provenance-tracked edge stores.
//!
//! Verified edges (extracted from blocks this observer accepted as
//! Trusted) carry their full weight. Unverified edges (extracted from any
//! crypto-valid block) are discounted by the observer's own relational
//! trust in the validator that recorded them; a validator the observer
//! does not trust at all contributes nothing.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use quidnet_core::constants::{
    MAX_TRUST_QUEUE_SIZE, MAX_TRUST_VISITED_SIZE, MEDIUM_CONFIDENCE_VALIDATOR_TRUST,
};
use quidnet_core::{QuidId, QuidnetError, TrustEdge};

use crate::graph::effective_depth;

/// Adjacency view of an edge store: truster → trustee → edge.
pub type EdgeStoreView = HashMap<QuidId, HashMap<QuidId, TrustEdge>>;

/// How much of the returned path rests on unverified recordings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Every hop on the best path is verified.
    High,
    /// Exactly one unverified hop, recorded by a validator the observer
    /// trusts non-trivially.
    Medium,
    /// Two or more unverified hops, or a barely-trusted recorder.
    Low,
}

/// One unverified hop on the returned path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationGap {
    pub from: QuidId,
    pub to: QuidId,
    pub validator_quid: QuidId,
    /// The observer's relational trust in the recording validator.
    pub validator_trust: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnhancedTrustResult {
    pub level: f64,
    pub path: Vec<QuidId>,
    pub unverified_hops: usize,
    pub verification_gaps: Vec<VerificationGap>,
    pub confidence: Confidence,
    pub graph_too_large: bool,
}

impl EnhancedTrustResult {
    fn none() -> Self {
        Self {
            level: 0.0,
            path: Vec::new(),
            unverified_hops: 0,
            verification_gaps: Vec::new(),
            confidence: Confidence::High,
            graph_too_large: false,
        }
    }
}

struct QueueItem {
    node: QuidId,
    cumulative: f64,
    path: Vec<QuidId>,
    gaps: Vec<VerificationGap>,
}

/// One traversable edge out of a node, after discounting.
struct Candidate<'a> {
    trustee: &'a QuidId,
    multiplier: f64,
    gap: Option<VerificationGap>,
}

fn candidates<'a>(
    node: &QuidId,
    verified: &'a EdgeStoreView,
    unverified: Option<&'a EdgeStoreView>,
    validator_trust: &HashMap<QuidId, f64>,
    out: &mut Vec<Candidate<'a>>,
) {
    out.clear();
    if let Some(edges) = verified.get(node) {
        for (trustee, edge) in edges {
            out.push(Candidate {
                trustee,
                multiplier: edge.trust_level,
                gap: None,
            });
        }
    }
    if let Some(store) = unverified {
        if let Some(edges) = store.get(node) {
            for (trustee, edge) in edges {
                let recorder_trust = validator_trust
                    .get(&edge.validator_quid)
                    .copied()
                    .unwrap_or(0.0);
                let discounted = edge.trust_level * recorder_trust;
                if discounted <= 0.0 {
                    continue; // untrusted recorder: the edge contributes zero
                }
                out.push(Candidate {
                    trustee,
                    multiplier: discounted,
                    gap: Some(VerificationGap {
                        from: node.clone(),
                        to: trustee.clone(),
                        validator_quid: edge.validator_quid.clone(),
                        validator_trust: recorder_trust,
                    }),
                });
            }
        }
    }
}

fn classify(gaps: &[VerificationGap]) -> Confidence {
    match gaps {
        [] => Confidence::High,
        [only] if only.validator_trust >= MEDIUM_CONFIDENCE_VALIDATOR_TRUST => Confidence::Medium,
        _ => Confidence::Low,
    }
}

/// Best-trust BFS over the verified edge store, plus the unverified store
/// when `unverified` is supplied. `validator_trust` is the precomputed
/// observer→recorder trust for every validator appearing in the
/// unverified store (computed by the caller over the committed registry,
/// outside any edge-store lock).
pub fn compute_trust_enhanced(
    verified: &EdgeStoreView,
    unverified: Option<&EdgeStoreView>,
    validator_trust: &HashMap<QuidId, f64>,
    observer: &QuidId,
    target: &QuidId,
    max_depth: Option<usize>,
) -> Result<EnhancedTrustResult, QuidnetError> {
    if observer.is_empty() || target.is_empty() {
        return Err(QuidnetError::ObserverOrTargetEmpty);
    }
    if observer == target {
        return Ok(EnhancedTrustResult {
            level: 1.0,
            path: vec![observer.clone()],
            ..EnhancedTrustResult::none()
        });
    }
    let max_depth = effective_depth(max_depth);

    let mut best = EnhancedTrustResult::none();
    let mut queue: VecDeque<QueueItem> = VecDeque::new();
    queue.push_back(QueueItem {
        node: observer.clone(),
        cumulative: 1.0,
        path: vec![observer.clone()],
        gaps: Vec::new(),
    });
    let mut enqueued: usize = 1;
    let mut capped = false;
    let mut scratch: Vec<Candidate<'_>> = Vec::new();

    'bfs: while let Some(item) = queue.pop_front() {
        if item.path.len() - 1 >= max_depth {
            continue;
        }
        candidates(&item.node, verified, unverified, validator_trust, &mut scratch);
        for cand in scratch.drain(..) {
            if item.path.contains(cand.trustee) {
                continue;
            }
            let new_trust = item.cumulative * cand.multiplier;
            if new_trust <= 0.0 {
                continue;
            }
            let mut gaps = item.gaps.clone();
            if let Some(gap) = cand.gap {
                gaps.push(gap);
            }
            if cand.trustee == target {
                if new_trust > best.level {
                    best.level = new_trust;
                    best.path = item.path.clone();
                    best.path.push(cand.trustee.clone());
                    best.unverified_hops = gaps.len();
                    best.verification_gaps = gaps;
                }
                continue;
            }
            let mut path = item.path.clone();
            path.push(cand.trustee.clone());
            queue.push_back(QueueItem {
                node: cand.trustee.clone(),
                cumulative: new_trust,
                path,
                gaps,
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
            "enhanced trust traversal capped; returning partial result"
        );
        best.graph_too_large = true;
    }
    best.confidence = classify(&best.verification_gaps);
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> QuidId {
        QuidId::new(s)
    }

    fn edge(truster: &str, trustee: &str, level: f64, validator: &str, verified: bool) -> TrustEdge {
        TrustEdge {
            truster: q(truster),
            trustee: q(trustee),
            trust_level: level,
            source_block: "00".repeat(32),
            validator_quid: q(validator),
            verified,
            timestamp: 1_700_000_000,
        }
    }

    fn store(edges: Vec<TrustEdge>) -> EdgeStoreView {
        let mut s: EdgeStoreView = HashMap::new();
        for e in edges {
            s.entry(e.truster.clone())
                .or_default()
                .insert(e.trustee.clone(), e);
        }
        s
    }

    #[test]
    fn verified_edges_carry_full_weight() {
        let verified = store(vec![edge("a", "b", 0.8, "v", true)]);
        let r = compute_trust_enhanced(
            &verified,
            None,
            &HashMap::new(),
            &q("a"),
            &q("b"),
            Some(5),
        )
        .unwrap();
        assert!((r.level - 0.8).abs() < 1e-12);
        assert_eq!(r.unverified_hops, 0);
        assert_eq!(r.confidence, Confidence::High);
    }

    #[test]
    fn untrusted_recorder_contributes_zero() {
        // Only an unverified a→b edge recorded by v, and no observer
        // trust in v: the edge must not move the result off zero.
        let verified = store(vec![]);
        let unverified = store(vec![edge("a", "b", 1.0, "v", false)]);
        let r = compute_trust_enhanced(
            &verified,
            Some(&unverified),
            &HashMap::new(),
            &q("a"),
            &q("b"),
            Some(5),
        )
        .unwrap();
        assert_eq!(r.level, 0.0);
        assert!(r.path.is_empty());
    }

    #[test]
    fn unverified_edges_are_discounted_by_recorder_trust() {
        let verified = store(vec![]);
        let unverified = store(vec![edge("a", "b", 0.8, "v", false)]);
        let mut discounts = HashMap::new();
        discounts.insert(q("v"), 0.5);
        let r = compute_trust_enhanced(
            &verified,
            Some(&unverified),
            &discounts,
            &q("a"),
            &q("b"),
            Some(5),
        )
        .unwrap();
        assert!((r.level - 0.4).abs() < 1e-12);
        assert_eq!(r.unverified_hops, 1);
        assert_eq!(r.verification_gaps.len(), 1);
        let gap = &r.verification_gaps[0];
        assert_eq!(gap.from, q("a"));
        assert_eq!(gap.to, q("b"));
        assert_eq!(gap.validator_quid, q("v"));
        assert_eq!(r.confidence, Confidence::Medium);
    }

    #[test]
    fn low_confidence_for_multiple_gaps_or_weak_recorders() {
        let verified = store(vec![]);
        let unverified = store(vec![
            edge("a", "b", 0.9, "v", false),
            edge("b", "c", 0.9, "v", false),
        ]);
        let mut discounts = HashMap::new();
        discounts.insert(q("v"), 0.9);
        let r = compute_trust_enhanced(
            &verified,
            Some(&unverified),
            &discounts,
            &q("a"),
            &q("c"),
            Some(5),
        )
        .unwrap();
        assert_eq!(r.unverified_hops, 2);
        assert_eq!(r.confidence, Confidence::Low);

        // Single gap, barely-trusted recorder.
        let mut weak = HashMap::new();
        weak.insert(q("v"), 0.05);
        let r = compute_trust_enhanced(
            &verified,
            Some(&unverified),
            &weak,
            &q("a"),
            &q("b"),
            Some(5),
        )
        .unwrap();
        assert_eq!(r.unverified_hops, 1);
        assert_eq!(r.confidence, Confidence::Low);
    }

    #[test]
    fn unverified_layer_is_ignored_unless_requested() {
        let verified = store(vec![]);
        let unverified = store(vec![edge("a", "b", 1.0, "v", false)]);
        let mut discounts = HashMap::new();
        discounts.insert(q("v"), 1.0);
        // include_unverified = false ⇒ the caller passes no unverified view.
        let r = compute_trust_enhanced(
            &verified,
            None,
            &discounts,
            &q("a"),
            &q("b"),
            Some(5),
        )
        .unwrap();
        assert_eq!(r.level, 0.0);
        let _ = unverified; // the store exists; it simply was not offered
    }

    #[test]
    fn mixed_path_prefers_the_better_product() {
        // Verified a→b→d at 0.25 versus a→c (verified) → d (unverified,
        // well-trusted recorder) at 0.81·0.9.
        let verified = store(vec![
            edge("a", "b", 0.5, "v", true),
            edge("b", "d", 0.5, "v", true),
            edge("a", "c", 0.9, "v", true),
        ]);
        let unverified = store(vec![edge("c", "d", 0.9, "w", false)]);
        let mut discounts = HashMap::new();
        discounts.insert(q("w"), 0.9);
        let r = compute_trust_enhanced(
            &verified,
            Some(&unverified),
            &discounts,
            &q("a"),
            &q("d"),
            Some(5),
        )
        .unwrap();
        assert!((r.level - 0.9 * 0.9 * 0.9).abs() < 1e-12);
        assert_eq!(r.path, vec![q("a"), q("c"), q("d")]);
        assert_eq!(r.unverified_hops, 1);
    }
}
