use serde::{Deserialize, Serialize};

/// A struct of optional string-slices, never a free-form map (§9). Every
/// field is independently optional because not every source or document
/// populates every artifact kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaselineArtifacts {
    pub commands: Option<Vec<String>>,
    pub config_keys: Option<Vec<String>>,
    pub endpoints: Option<Vec<String>>,
    pub tools: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub decisions: Option<Vec<String>>,
    pub sequences: Option<Vec<String>>,
    pub teams: Option<Vec<String>>,
    pub owners: Option<Vec<String>>,
    pub paths: Option<Vec<String>>,
    pub channels: Option<Vec<String>>,
    pub platforms: Option<Vec<String>>,
    pub versions: Option<Vec<String>>,
    pub dependencies: Option<Vec<String>>,
    pub scenarios: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

impl BaselineArtifacts {
    pub fn is_empty(&self) -> bool {
        fn field_empty(field: &Option<Vec<String>>) -> bool {
            match field {
                Some(v) => v.is_empty(),
                None => true,
            }
        }
        field_empty(&self.commands)
            && field_empty(&self.config_keys)
            && field_empty(&self.endpoints)
            && field_empty(&self.tools)
            && field_empty(&self.steps)
            && field_empty(&self.decisions)
            && field_empty(&self.sequences)
            && field_empty(&self.teams)
            && field_empty(&self.owners)
            && field_empty(&self.paths)
            && field_empty(&self.channels)
            && field_empty(&self.platforms)
            && field_empty(&self.versions)
            && field_empty(&self.dependencies)
            && field_empty(&self.scenarios)
            && field_empty(&self.features)
            && field_empty(&self.errors)
    }

    /// All non-empty token sets flattened, used by the fingerprinter (§4.6)
    /// and by keyword-hint confidence adjustment (§4.3).
    pub fn all_tokens(&self) -> Vec<&str> {
        let fields = [
            &self.commands,
            &self.config_keys,
            &self.endpoints,
            &self.tools,
            &self.steps,
            &self.decisions,
            &self.sequences,
            &self.teams,
            &self.owners,
            &self.paths,
            &self.channels,
            &self.platforms,
            &self.versions,
            &self.dependencies,
            &self.scenarios,
            &self.features,
            &self.errors,
        ];
        fields
            .into_iter()
            .flatten()
            .flat_map(|v| v.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_artifacts_are_empty() {
        assert!(BaselineArtifacts::default().is_empty());
    }

    #[test]
    fn populated_field_is_not_empty() {
        let artifacts = BaselineArtifacts {
            tools: Some(vec!["kubectl".to_string()]),
            ..Default::default()
        };
        assert!(!artifacts.is_empty());
        assert_eq!(artifacts.all_tokens(), vec!["kubectl"]);
    }
}
