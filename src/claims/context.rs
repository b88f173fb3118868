use super::{ExtractedDocument, ExtractedSection};

/// Bounded, deterministic slice of a document handed to the patch generator
/// (§4.5). Built by truncating `ExtractedDocument` against the configured
/// `maxSections` / `maxSectionChars` / `maxDocCharsSentToLlm` budgets so the
/// same document always produces the same context, regardless of its size.
#[derive(Debug, Clone, PartialEq)]
pub struct DocContext {
    pub outline: Vec<String>,
    pub sections: Vec<ContextSection>,
    pub truncated: bool,
    pub normalized_fulltext_sha256: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSection {
    pub heading: String,
    pub text: String,
    pub truncated: bool,
}

impl DocContext {
    /// Selects sections in document order, truncating each section's text to
    /// `max_section_chars`, up to `max_sections` sections, stopping early if
    /// `max_doc_chars_sent_to_llm` total would be exceeded.
    pub fn build(
        doc: &ExtractedDocument,
        full_text: &str,
        max_doc_chars_sent_to_llm: usize,
        max_sections: usize,
        max_section_chars: usize,
    ) -> Self {
        let mut sections = Vec::new();
        let mut total_chars = 0usize;
        let mut truncated = false;

        for section in doc.sections.iter().take(max_sections) {
            let raw = section_text(full_text, section);
            let (text, section_truncated) = truncate_chars(raw, max_section_chars);
            let would_use = total_chars + text.len();
            if would_use > max_doc_chars_sent_to_llm {
                truncated = true;
                break;
            }
            total_chars = would_use;
            truncated = truncated || section_truncated;
            sections.push(ContextSection {
                heading: section.heading.clone(),
                text,
                truncated: section_truncated,
            });
        }

        if doc.sections.len() > sections.len() {
            truncated = true;
        }

        DocContext {
            outline: doc.outline.clone(),
            sections,
            truncated,
            normalized_fulltext_sha256: doc.normalized_fulltext_sha256.clone(),
        }
    }
}

fn section_text<'a>(full_text: &'a str, section: &ExtractedSection) -> &'a str {
    full_text.get(section.start..section.end).unwrap_or("")
}

fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    (text.chars().take(max_chars).collect(), true)
}
