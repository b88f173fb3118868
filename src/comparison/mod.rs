pub mod engine;
pub mod keywords;
pub mod result;

pub use engine::compare;
pub use result::{ComparisonResult, Recommendation};
