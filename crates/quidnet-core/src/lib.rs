pub mod block;
pub mod constants;
pub mod domain;
pub mod edge;
pub mod error;
pub mod transaction;
pub mod types;

pub use block::{Block, BlockVerdict, TrustProof};
pub use constants::*;
pub use domain::TrustDomain;
pub use edge::TrustEdge;
pub use error::QuidnetError;
pub use transaction::{
    EventTransaction, IdentityTransaction, Ownership, SubjectType, TitleTransaction, Transaction,
    TrustTransaction,
};
pub use types::{NodeEntry, QuidId};
