pub mod audit_trail;
pub mod drift_candidate;
pub mod evidence_bundle;
pub mod patch_proposal;
pub mod policy_pack;
pub mod signal_event;
pub mod suppression_rule;
pub mod workspace;

pub use audit_trail::AuditTrailRow;
pub use drift_candidate::{DriftCandidate, DriftState, DriftType, ClassificationMethod};
pub use evidence_bundle::{EvidenceBundle, ImpactBand};
pub use patch_proposal::{PatchProposal, PatchStatus, PatchStyle};
pub use policy_pack::{PolicyPack, PolicyPackStatus};
pub use signal_event::{SignalEvent, SourceType};
pub use suppression_rule::{FingerprintLevel, SuppressionRule};
pub use workspace::Workspace;
