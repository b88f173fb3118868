pub mod normalize;
pub mod raw;
pub mod validate;

pub use normalize::normalize;
pub use validate::validate_required_fields;
