pub mod comparators;
pub mod composition;
pub mod conditions;
pub mod evaluator;
pub mod pack;

pub use comparators::{ComparatorRegistry, ComparisonContext};
pub use evaluator::{evaluate_pack, ObligationResult, RuleResult};
pub use pack::{canonicalize, parse, version_hash, ParsedPolicyPack};
