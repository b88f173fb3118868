use crate::domain::drift_candidate::DriftType;
use crate::domain::patch_proposal::PatchStyle;
use crate::domain::signal_event::SourceType;

/// The documentation system a patch targets, each constraining which
/// `PatchStyle`s are legal output (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSystem {
    Wiki,
    Readme,
    SwaggerOpenapi,
    BackstageCatalog,
    GitBook,
}

impl TargetSystem {
    fn is_git_backed(self) -> bool {
        !matches!(self, TargetSystem::Wiki)
    }

    fn allowed_styles(self) -> &'static [PatchStyle] {
        match self {
            TargetSystem::Wiki => &[
                PatchStyle::ReplaceSteps,
                PatchStyle::AddNote,
                PatchStyle::ReorderSteps,
                PatchStyle::UpdateOwnerBlock,
                PatchStyle::AddSection,
            ],
            TargetSystem::SwaggerOpenapi => &[
                PatchStyle::UpdateDescription,
                PatchStyle::UpdateParam,
                PatchStyle::UpdatePath,
                PatchStyle::AddExample,
                PatchStyle::CreatePr,
            ],
            TargetSystem::BackstageCatalog => &[
                PatchStyle::UpdateOwnerBlock,
                PatchStyle::UpdateDescription,
                PatchStyle::CreatePr,
            ],
            TargetSystem::Readme | TargetSystem::GitBook => &[
                PatchStyle::ReplaceSteps,
                PatchStyle::AddNote,
                PatchStyle::ReorderSteps,
                PatchStyle::UpdateOwnerBlock,
                PatchStyle::AddSection,
                PatchStyle::UpdateJsdoc,
                PatchStyle::CreatePr,
            ],
        }
    }

    /// Fallback when the planned style is not in this target's allowed set
    /// (§4.7): wiki systems fall back to a note, git systems to a PR.
    fn fallback_style(self) -> PatchStyle {
        if self.is_git_backed() {
            PatchStyle::CreatePr
        } else {
            PatchStyle::AddNote
        }
    }
}

fn source_category(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::GithubPr | SourceType::GithubIac | SourceType::GithubCodeowners => "github",
        SourceType::PagerdutyIncident => "pagerduty",
        SourceType::SlackCluster => "slack",
        SourceType::DatadogAlert | SourceType::GrafanaAlert => "alert",
    }
}

/// Picks a base style from the `(driftType, source)` + confidence decision
/// table (§4.7), before constraining it to what the target system allows.
fn base_style(drift_type: DriftType, source_type: SourceType, confidence: f64) -> PatchStyle {
    let source = source_category(source_type);
    match (drift_type, source) {
        (DriftType::Instruction, "github") => {
            if confidence >= 0.85 {
                PatchStyle::ReplaceSteps
            } else {
                PatchStyle::AddNote
            }
        }
        (DriftType::Process, "pagerduty") => {
            if confidence >= 0.75 {
                PatchStyle::ReorderSteps
            } else {
                PatchStyle::AddNote
            }
        }
        (DriftType::Ownership, "pagerduty") | (DriftType::Ownership, _) => {
            PatchStyle::UpdateOwnerBlock
        }
        (DriftType::Coverage, _) => PatchStyle::AddSection,
        (DriftType::Environment, _) => PatchStyle::AddNote,
        (DriftType::Instruction, _) => PatchStyle::AddNote,
        (DriftType::Process, _) => PatchStyle::AddNote,
    }
}

/// Full planning decision: base style from the drift-type/source/confidence
/// table, constrained to the target system's allowed set, falling back per
/// system when the planned style doesn't fit.
pub fn plan_style(
    drift_type: DriftType,
    source_type: SourceType,
    confidence: f64,
    target: TargetSystem,
) -> PatchStyle {
    let planned = base_style(drift_type, source_type, confidence);
    if target.allowed_styles().contains(&planned) {
        planned
    } else {
        target.fallback_style()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_confidence_instruction_drift_from_github_replaces_steps() {
        let style = plan_style(
            DriftType::Instruction,
            SourceType::GithubPr,
            0.9,
            TargetSystem::Readme,
        );
        assert_eq!(style, PatchStyle::ReplaceSteps);
    }

    #[test]
    fn low_confidence_instruction_drift_falls_back_to_a_note() {
        let style = plan_style(
            DriftType::Instruction,
            SourceType::GithubPr,
            0.5,
            TargetSystem::Readme,
        );
        assert_eq!(style, PatchStyle::AddNote);
    }

    #[test]
    fn ownership_drift_always_updates_the_owner_block() {
        let style = plan_style(
            DriftType::Ownership,
            SourceType::PagerdutyIncident,
            0.1,
            TargetSystem::BackstageCatalog,
        );
        assert_eq!(style, PatchStyle::UpdateOwnerBlock);
    }

    #[test]
    fn swagger_targets_reject_replace_steps_and_fall_back_to_create_pr() {
        let style = plan_style(
            DriftType::Instruction,
            SourceType::GithubPr,
            0.95,
            TargetSystem::SwaggerOpenapi,
        );
        assert_eq!(style, PatchStyle::CreatePr);
    }

    #[test]
    fn wiki_targets_reject_create_pr_and_fall_back_to_a_note() {
        let style = plan_style(
            DriftType::Coverage,
            SourceType::SlackCluster,
            0.5,
            TargetSystem::Wiki,
        );
        assert_eq!(style, PatchStyle::AddSection);
    }
}
