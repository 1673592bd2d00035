//! Hop Core - frecency-ranked directory history
//!
//! This library maintains a persistent, ranked history of visited
//! directories and resolves partial multi-token queries against it by rank,
//! recency, or a blended frecency score.

pub mod config;
pub mod error;
pub mod matcher;
pub mod persist;
pub mod reduce;
pub mod store;
pub mod visit;

pub use config::Config;
pub use error::HopError;
pub use matcher::{run_query, CaseMode, Match, MatchKind, MatchOutcome, QueryMatcher, RankMode};
pub use store::{Entry, Store};
pub use visit::{record_visit, remove_path, Session};

/// Result type alias for hop operations
pub type Result<T> = std::result::Result<T, HopError>;
