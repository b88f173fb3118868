use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})\s+(.+)$").unwrap());
static OWNER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^owner[s]?:\s*(.+)$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSection {
    pub heading: String,
    pub level: u8,
    pub start: usize,
    pub end: usize,
    pub extraction_reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnerBlock {
    pub raw: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub sections: Vec<ExtractedSection>,
    pub owner_block: Option<OwnerBlock>,
    pub outline: Vec<String>,
    pub normalized_fulltext_sha256: String,
}

fn normalize_for_hash(content: &str) -> String {
    content
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a fetched document into headed sections with char-ranges, an
/// optional owner block, a deterministic heading outline, and a hash of
/// the whitespace-normalized fulltext (§4.5). Section boundaries run to the
/// start of the next heading of equal-or-lesser depth, or end of document.
pub fn extract_claims(content: &str) -> ExtractedDocument {
    let headings: Vec<(usize, u8, String)> = HEADING
        .captures_iter(content)
        .map(|c| {
            let m = c.get(0).unwrap();
            let level = c[1].len() as u8;
            let title = c[2].trim().to_string();
            (m.start(), level, title)
        })
        .collect();

    let mut sections = Vec::new();
    for (i, (start, level, heading)) in headings.iter().enumerate() {
        let end = headings[i + 1..]
            .iter()
            .find(|(_, lvl, _)| lvl <= level)
            .map(|(s, _, _)| *s)
            .unwrap_or(content.len());
        sections.push(ExtractedSection {
            heading: heading.clone(),
            level: *level,
            start: *start,
            end,
            extraction_reason: "heading_boundary".to_string(),
        });
    }

    let owner_block = OWNER_BLOCK.captures(content).map(|c| {
        let m = c.get(0).unwrap();
        OwnerBlock {
            raw: c[1].trim().to_string(),
            start: m.start(),
            end: m.end(),
        }
    });

    let outline = headings.into_iter().map(|(_, _, title)| title).collect();

    let mut hasher = Sha256::new();
    hasher.update(normalize_for_hash(content).as_bytes());
    let normalized_fulltext_sha256 = format!("{:x}", hasher.finalize());

    ExtractedDocument {
        sections,
        owner_block,
        outline,
        normalized_fulltext_sha256,
    }
}
