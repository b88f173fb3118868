use crate::adapters::managed_region;
use crate::claims::{ExtractedDocument, ExtractedSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedEditRange {
    pub start: usize,
    pub end: usize,
}

impl AllowedEditRange {
    fn contains_span(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Computes the edit window a generated patch may touch (§4.5): the
/// document's managed region when one is declared, otherwise the owner
/// block plus every extracted section (so a generator constrained to one
/// heading can't spill into unrelated text).
pub fn allowed_ranges(doc: &ExtractedDocument, full_text: &str) -> Vec<AllowedEditRange> {
    if let Some((start, end)) = managed_region(full_text) {
        return vec![AllowedEditRange { start, end }];
    }

    let mut ranges: Vec<AllowedEditRange> = doc
        .sections
        .iter()
        .map(|s: &ExtractedSection| AllowedEditRange {
            start: s.start,
            end: s.end,
        })
        .collect();

    if let Some(owner) = &doc.owner_block {
        ranges.push(AllowedEditRange {
            start: owner.start,
            end: owner.end,
        });
    }

    ranges
}

const SECRET_MARKERS: &[&str] = &["-----BEGIN", "AKIA", "sk-"];

fn contains_secret(text: &str) -> bool {
    SECRET_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Smallest [start, end) span in which `original` and `proposed` differ,
/// found by trimming the common prefix and common suffix. `None` means the
/// two are identical.
fn changed_span(original: &str, proposed: &str) -> Option<(usize, usize)> {
    let orig_bytes = original.as_bytes();
    let new_bytes = proposed.as_bytes();

    let prefix_len = orig_bytes
        .iter()
        .zip(new_bytes.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if prefix_len == orig_bytes.len() && prefix_len == new_bytes.len() {
        return None;
    }

    let orig_suffix_max = orig_bytes.len() - prefix_len;
    let new_suffix_max = new_bytes.len() - prefix_len;
    let suffix_len = orig_bytes[prefix_len..]
        .iter()
        .rev()
        .zip(new_bytes[prefix_len..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
        .min(orig_suffix_max)
        .min(new_suffix_max);

    Some((prefix_len, orig_bytes.len() - suffix_len))
}

/// Validates a proposed document body against the allowed edit ranges,
/// secret-reintroduction, and managed-region preservation rules (§4.7).
/// Returns a human-readable reason on failure so the generator can fold it
/// back into the next regeneration prompt.
pub fn validate_patch(
    original: &str,
    proposed: &str,
    allowed: &[AllowedEditRange],
) -> Result<(), String> {
    if contains_secret(proposed) && !contains_secret(original) {
        return Err("proposed content introduces a secret-shaped token".to_string());
    }

    if let Some((orig_start, orig_end)) = managed_region(original) {
        match managed_region(proposed) {
            Some(_) => {}
            None => {
                return Err("managed region markers were removed".to_string());
            }
        }
        let _ = (orig_start, orig_end);
    }

    let Some((start, end)) = changed_span(original, proposed) else {
        return Ok(());
    };

    if allowed.iter().any(|r| r.contains_span(start, end)) {
        Ok(())
    } else {
        Err(format!(
            "edit at byte range {start}..{end} falls outside every allowed edit range"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::extract_claims;

    #[test]
    fn an_edit_inside_a_section_is_allowed() {
        let original = "# A\nold body\n# B\nother\n";
        let doc = extract_claims(original);
        let ranges = allowed_ranges(&doc, original);
        let proposed = "# A\nnew body\n# B\nother\n";
        assert!(validate_patch(original, proposed, &ranges).is_ok());
    }

    #[test]
    fn an_edit_outside_every_section_is_rejected() {
        let original = "preamble\n# A\nbody\n";
        let doc = extract_claims(original);
        let ranges = allowed_ranges(&doc, original);
        let proposed = "changed preamble\n# A\nbody\n";
        assert!(validate_patch(original, proposed, &ranges).is_err());
    }

    #[test]
    fn introducing_a_secret_is_rejected_even_inside_an_allowed_range() {
        let original = "# A\nbody\n";
        let doc = extract_claims(original);
        let ranges = allowed_ranges(&doc, original);
        let proposed = "# A\nAKIAFAKEACCESSKEY000\n";
        assert!(validate_patch(original, proposed, &ranges).is_err());
    }

    #[test]
    fn removing_managed_region_markers_is_rejected() {
        let original = "<!-- DRIFT_AGENT_MANAGED_START -->\nbody\n<!-- DRIFT_AGENT_MANAGED_END -->\n";
        let doc = extract_claims(original);
        let ranges = allowed_ranges(&doc, original);
        let proposed = "just body now\n";
        assert!(validate_patch(original, proposed, &ranges).is_err());
    }

    #[test]
    fn identical_content_always_validates() {
        let original = "# A\nbody\n";
        let doc = extract_claims(original);
        let ranges = allowed_ranges(&doc, original);
        assert!(validate_patch(original, original, &ranges).is_ok());
    }
}
