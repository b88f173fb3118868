//! Persistence layer (§3, §5): repository traits describing the eight
//! persisted entities, plus a `sqlx`/SQLite implementation gated behind the
//! `database` feature, following the teacher's own feature-gating pattern
//! for its database module.

pub mod manager;
pub mod repositories;

#[cfg(feature = "database")]
pub mod sqlite;

pub use manager::{init_database, shutdown_database};
pub use repositories::{
    AuditTrailRepository, DriftCandidateRepository, EvidenceBundleRepository,
    PatchProposalRepository, PolicyPackRepository, SignalEventRepository,
    SuppressionRuleRepository, WorkspaceRepository,
};

#[cfg(feature = "database")]
pub use sqlite::{
    SqliteAuditTrailRepository, SqliteDriftCandidateRepository, SqliteEvidenceBundleRepository,
    SqlitePatchProposalRepository, SqlitePolicyPackRepository, SqliteSignalEventRepository,
    SqliteSuppressionRuleRepository, SqliteWorkspaceRepository,
};
