//! quidnet-trust
//!
//! The relational trust graph engine: observer-specific transitive trust
//! computed on demand as the best product of edge weights along any
//! acyclic path, bounded by hop depth and hard resource caps.
//!
//! Two entry points:
//!   compute_trust          — over the committed trust registry
//!   compute_trust_enhanced — over the verified/unverified edge stores,
//!                            discounting unverified edges by the
//!                            observer's trust in the recording validator
//!
//! Both are pure functions over snapshots of the graph; callers hold (or
//! clone out of) the registry locks and never re-enter them from here.

pub mod cache;
pub mod enhanced;
pub mod graph;

pub use cache::TrustCache;
pub use enhanced::{compute_trust_enhanced, Confidence, EnhancedTrustResult, VerificationGap};
pub use graph::{compute_trust, TrustResult};
