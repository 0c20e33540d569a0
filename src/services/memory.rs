//! In-memory persistence

use super::{PersistenceService, ProjectFormat, ServiceError, ServiceResult, StoredProject};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence service keeping project documents in memory
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    projects: RwLock<HashMap<String, StoredProject>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the stored projects, sorted
    pub async fn project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.projects.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait(?Send)]
impl PersistenceService for MemoryPersistence {
    async fn save(
        &self,
        project_name: &str,
        format: ProjectFormat,
        document: serde_json::Value,
        overwrite: bool,
    ) -> ServiceResult<StoredProject> {
        let mut projects = self.projects.write().await;
        if !overwrite && projects.contains_key(project_name) {
            return Err(ServiceError::AlreadyExists(project_name.to_string()));
        }
        let stored = StoredProject {
            name: project_name.to_string(),
            format,
            document,
            saved_at: Utc::now(),
        };
        projects.insert(project_name.to_string(), stored.clone());
        Ok(stored)
    }

    async fn load(&self, project_name: &str) -> ServiceResult<StoredProject> {
        self.projects
            .read()
            .await
            .get(project_name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("project '{}'", project_name)))
    }
}
