use crate::domain::drift_candidate::DriftType;

/// Source-specific positive/negative hint words used to nudge confidence
/// after the per-type comparators have run (§4.3). Not a classifier on their
/// own; the comparators decide whether drift exists at all.
fn hints(drift_type: DriftType) -> (&'static [&'static str], &'static [&'static str]) {
    match drift_type {
        DriftType::Instruction => (
            &["deprecated", "replace", "instead of", "now use", "renamed"],
            &["no change", "unchanged", "still applies", "equivalent"],
        ),
        DriftType::Process => (
            &["new step", "additional approval", "now requires", "updated flow"],
            &["same process", "no process change"],
        ),
        DriftType::Ownership => (
            &["transferred", "new owner", "reassigned", "handed off"],
            &["same team", "unchanged owner"],
        ),
        DriftType::Environment => (
            &["new variable", "renamed variable", "port changed", "moved to"],
            &["same environment", "no env change"],
        ),
        DriftType::Coverage => (&[], &[]),
    }
}

fn count_hits(text: &str, words: &[&str]) -> usize {
    let lower = text.to_lowercase();
    words.iter().filter(|w| lower.contains(*w)).count()
}

/// `+0.10` for >= 3 positive hits and zero negative hits; `-0.15` for >= 2
/// negative hits; otherwise no adjustment. Result is not clamped here, the
/// caller clamps the final confidence to [0, 1].
pub fn adjustment(drift_type: DriftType, text: &str) -> f64 {
    let (positive, negative) = hints(drift_type);
    let positive_hits = count_hits(text, positive);
    let negative_hits = count_hits(text, negative);

    if negative_hits >= 2 {
        -0.15
    } else if positive_hits >= 3 {
        0.10
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_positive_hints_boost_confidence() {
        let text = "This step is deprecated, replace it, now use the new CLI instead of the old one.";
        assert_eq!(adjustment(DriftType::Instruction, text), 0.10);
    }

    #[test]
    fn two_negative_hints_penalize_confidence() {
        let text = "The process is unchanged and the same process applies.";
        assert_eq!(adjustment(DriftType::Process, text), -0.15);
    }

    #[test]
    fn mixed_or_sparse_hints_do_not_adjust() {
        assert_eq!(adjustment(DriftType::Environment, "nothing notable here"), 0.0);
    }
}
