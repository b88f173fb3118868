pub mod context;
pub mod extractor;

pub use context::DocContext;
pub use extractor::{extract_claims, ExtractedDocument, ExtractedSection, OwnerBlock};
