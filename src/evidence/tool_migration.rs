use crate::domain::signal_event::ChangedFile;

/// File-type migrations recognized by the extractor (§4.2): old path
/// pattern, new path pattern, canonical tool aliases.
const KNOWN_MIGRATIONS: &[(&str, &str, &str, &str)] = &[
    (".circleci/", ".github/workflows/", "circleci", "github_actions"),
    ("package-lock.json", "yarn.lock", "npm", "yarn"),
    ("yarn.lock", "pnpm-lock.yaml", "yarn", "pnpm"),
    ("Jenkinsfile", ".github/workflows/", "jenkins", "github_actions"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ToolMigration {
    pub from_tool: String,
    pub to_tool: String,
    pub confidence: f64,
    pub old_removed: bool,
    pub old_modified: bool,
    pub new_added_count: usize,
}

/// Tool-migration confidence derived from which of {old-removed,
/// old-modified, multiple-new-added} are present (§4.2): base 0.5; +0.3 if
/// old removed; +0.1 if several new. `modified` alone contributes nothing
/// beyond the base, matching the source behavior exactly even for a file
/// that is simultaneously modified with a sibling added (§9 open question).
pub fn detect_tool_migration(changed_files: &[ChangedFile]) -> Option<ToolMigration> {
    use crate::domain::signal_event::ChangeStatus;

    for (old_pattern, new_pattern, from_tool, to_tool) in KNOWN_MIGRATIONS {
        let old_removed = changed_files.iter().any(|f| {
            f.path.contains(old_pattern) && f.status == ChangeStatus::Removed
        });
        let old_modified = changed_files.iter().any(|f| {
            f.path.contains(old_pattern) && f.status == ChangeStatus::Modified
        });
        let new_added: Vec<_> = changed_files
            .iter()
            .filter(|f| f.path.contains(new_pattern) && f.status == ChangeStatus::Added)
            .collect();

        if !old_removed && !old_modified && new_added.is_empty() {
            continue;
        }

        let mut confidence: f64 = 0.5;
        if old_removed {
            confidence += 0.3;
        }
        if new_added.len() > 1 {
            confidence += 0.1;
        }

        return Some(ToolMigration {
            from_tool: from_tool.to_string(),
            to_tool: to_tool.to_string(),
            confidence: confidence.min(1.0),
            old_removed,
            old_modified,
            new_added_count: new_added.len(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal_event::ChangeStatus;

    fn file(path: &str, status: ChangeStatus) -> ChangedFile {
        ChangedFile {
            path: path.to_string(),
            status,
            additions: 1,
            deletions: 1,
        }
    }

    #[test]
    fn circleci_to_github_actions_with_removed_old_hits_high_confidence() {
        let files = vec![
            file(".circleci/config.yml", ChangeStatus::Removed),
            file(".github/workflows/deploy.yml", ChangeStatus::Added),
        ];
        let migration = detect_tool_migration(&files).expect("migration detected");
        assert_eq!(migration.from_tool, "circleci");
        assert_eq!(migration.to_tool, "github_actions");
        assert!(migration.confidence >= 0.8);
    }

    #[test]
    fn modified_old_file_alone_does_not_add_bonus() {
        let files = vec![
            file(".circleci/config.yml", ChangeStatus::Modified),
            file(".github/workflows/deploy.yml", ChangeStatus::Added),
        ];
        let migration = detect_tool_migration(&files).expect("migration detected");
        assert!((migration.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn multiple_new_files_add_small_bonus() {
        let files = vec![
            file(".circleci/config.yml", ChangeStatus::Removed),
            file(".github/workflows/deploy.yml", ChangeStatus::Added),
            file(".github/workflows/test.yml", ChangeStatus::Added),
        ];
        let migration = detect_tool_migration(&files).expect("migration detected");
        assert!((migration.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn unrelated_changes_detect_no_migration() {
        let files = vec![file("src/main.rs", ChangeStatus::Modified)];
        assert!(detect_tool_migration(&files).is_none());
    }
}
