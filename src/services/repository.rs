//! Bridges from collaborator services to the loader, the saver and the store

use super::{CatalogService, PersistenceService, ProjectFormat, ServiceResult, StoredProject};
use crate::model::{ProjectLoadResult, ProjectLoader, ProjectSaver};
use crate::models::Project;
use crate::store::{ImportSummary, SchemaGraph};
use std::collections::HashSet;
use tracing::{debug, info};

/// Saves and loads projects through a persistence service
///
/// Projects are handed over in canonical form and pass through the loader again on the
/// way back, so a document edited or written by an older client is normalized before the
/// store sees it.
pub struct ProjectRepository<P: PersistenceService> {
    persistence: P,
    loader: ProjectLoader,
    saver: ProjectSaver,
}

impl<P: PersistenceService> ProjectRepository<P> {
    pub fn new(persistence: P) -> Self {
        Self {
            persistence,
            loader: ProjectLoader::new(),
            saver: ProjectSaver::new(),
        }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Save a project under its own name
    pub async fn save(
        &self,
        project: &Project,
        format: ProjectFormat,
        overwrite: bool,
    ) -> ServiceResult<StoredProject> {
        let document = self.saver.to_value(project)?;
        let stored = self
            .persistence
            .save(&project.name, format, document, overwrite)
            .await?;
        info!("Saved project '{}' as {}", project.name, format);
        Ok(stored)
    }

    /// Load a project by name, normalizing it on the way in
    pub async fn load(&self, project_name: &str) -> ServiceResult<ProjectLoadResult> {
        let stored = self.persistence.load(project_name).await?;
        let result = self.loader.from_value(stored.document)?;
        debug!(
            "Loaded project '{}' ({} warnings)",
            project_name,
            result.warnings.len()
        );
        Ok(result)
    }
}

/// Imports catalog tables into an editing session
pub struct CatalogImporter<C: CatalogService> {
    catalog: C,
}

impl<C: CatalogService> CatalogImporter<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Fetch tables from the catalog and merge them into `graph`.
    ///
    /// Tables the service returns more than once (same name, ignoring case) are kept once.
    /// Collisions with tables already in the project reject the whole import.
    pub async fn import_into(
        &self,
        graph: &mut SchemaGraph,
        catalog: &str,
        schema: &str,
        table_names: &[String],
    ) -> ServiceResult<ImportSummary> {
        let mut import = self
            .catalog
            .import_tables(catalog, schema, table_names)
            .await?;

        let mut seen = HashSet::new();
        let before = import.tables.len();
        import.tables.retain(|t| seen.insert(t.name.to_lowercase()));
        if import.tables.len() < before {
            debug!(
                "Dropped {} duplicate table(s) from catalog import",
                before - import.tables.len()
            );
        }

        let summary = graph.merge_import(import)?;
        info!(
            "Imported {} table(s) from {}.{}",
            summary.tables_added.len(),
            catalog,
            schema
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field, Table};
    use crate::services::MemoryPersistence;

    #[tokio::test]
    async fn save_then_load() {
        let repository = ProjectRepository::new(MemoryPersistence::new());
        let mut project = Project::new("shop", "main", "sales");
        project.tables.push(
            Table::new("orders")
                .with_field(Field::new("order_id", DataType::Int).primary_key()),
        );

        repository.save(&project, ProjectFormat::Json, false).await.unwrap();
        let loaded = repository.load("shop").await.unwrap();
        assert_eq!(loaded.project, project);
        assert!(loaded.orphaned_relationships.is_empty());
    }
}
