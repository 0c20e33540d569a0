//! Project saving
//!
//! Writes the canonical project representation. Timestamps are always emitted in RFC 3339
//! UTC form, so a project loaded from a legacy file is rewritten in the current shape.

use super::ProjectFormat;
use crate::models::Project;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// Error raised while saving a project document
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Serializes projects
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectSaver;

impl ProjectSaver {
    pub fn new() -> Self {
        Self
    }

    pub fn to_value(&self, project: &Project) -> Result<Value, SaveError> {
        Ok(serde_json::to_value(project)?)
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self, project: &Project) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(project)?)
    }

    pub fn to_yaml_string(&self, project: &Project) -> Result<String, SaveError> {
        Ok(serde_yaml::to_string(project)?)
    }

    pub fn render(&self, project: &Project, format: ProjectFormat) -> Result<String, SaveError> {
        match format {
            ProjectFormat::Json => self.to_json_string(project),
            ProjectFormat::Yaml => self.to_yaml_string(project),
        }
    }

    /// Write a project file in the format implied by its extension
    pub fn save_file(&self, project: &Project, path: &Path) -> Result<(), SaveError> {
        let content = self.render(project, ProjectFormat::from_path(path))?;
        std::fs::write(path, content).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved project '{}' to {}", project.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectLoader;
    use crate::models::{DataType, Field, Table};
    use tempfile::tempdir;

    fn project() -> Project {
        let mut project = Project::new("shop", "main", "sales");
        project.tables.push(
            Table::new("orders")
                .with_id("T1")
                .with_field(Field::new("order_id", DataType::Int).with_id("F1").primary_key()),
        );
        project
    }

    #[test]
    fn json_uses_canonical_casing() {
        let json = ProjectSaver::new().to_json_string(&project()).unwrap();
        assert!(json.contains("\"data_type\": \"INT\""));
        assert!(json.contains("\"table_kind\": \"MANAGED\""));
    }

    #[test]
    fn saved_files_load_back() {
        let dir = tempdir().unwrap();
        let saver = ProjectSaver::new();
        let loader = ProjectLoader::new();
        let project = project();

        for name in ["project.json", "project.yaml"] {
            let path = dir.path().join(name);
            saver.save_file(&project, &path).unwrap();
            let loaded = loader.load_file(&path).unwrap();
            assert_eq!(loaded.project, project);
            assert!(loaded.warnings.is_empty());
        }
    }
}
