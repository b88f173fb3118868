pub mod generator;
pub mod planner;
pub mod validation;

pub use generator::{generate, MAX_REGENERATE_ATTEMPTS};
pub use planner::{plan_style, TargetSystem};
pub use validation::{allowed_ranges, validate_patch, AllowedEditRange};
