//! Metric view, traditional view and metric relationship mutations

use super::SchemaGraph;
use super::patch::{MetricViewPatch, TraditionalViewPatch};
use crate::error::{EntityKind, SchemaError, SchemaResult};
use crate::models::{MetricRelationship, MetricView, Project, TraditionalView};
use crate::validation::input::validate_table_name;
use crate::validation::resolve_referenced_tables;
use tracing::{debug, info};

impl SchemaGraph {
    /// Add a metric view. Its source and joined tables must exist.
    pub fn add_metric_view(&mut self, view: MetricView) -> SchemaResult<MetricView> {
        self.apply(|project, now| {
            let mut view = view;
            check_view_name(project, &view.id, &view.name)?;
            check_metric_sources(project, &view)?;
            view.created_at = now;
            view.updated_at = now;

            info!("Adding metric view {} ({})", view.name, view.id);
            project.metric_views.push(view.clone());
            Ok(view)
        })
    }

    pub fn update_metric_view(
        &mut self,
        view_id: &str,
        patch: MetricViewPatch,
    ) -> SchemaResult<MetricView> {
        self.apply(|project, now| {
            let mut view = project
                .metric_view(view_id)
                .cloned()
                .ok_or_else(|| SchemaError::not_found(EntityKind::MetricView, view_id))?;
            patch.apply(&mut view);
            if patch.name.is_some() {
                validate_table_name(&view.name).map_err(|e| e.for_entity(view_id))?;
            }
            check_metric_sources(project, &view)?;
            view.updated_at = now;

            if let Some(slot) = project.metric_views.iter_mut().find(|v| v.id == view_id) {
                *slot = view.clone();
            }
            debug!("Updated metric view {}", view_id);
            Ok(view)
        })
    }

    /// Delete a metric view together with its metric relationships.
    pub fn delete_metric_view(&mut self, view_id: &str) -> SchemaResult<MetricView> {
        self.apply(|project, _| {
            let position = project
                .metric_views
                .iter()
                .position(|v| v.id == view_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::MetricView, view_id))?;
            let view = project.metric_views.remove(position);
            project
                .metric_relationships
                .retain(|m| m.metric_view_id != view_id);
            info!("Deleted metric view {} ({})", view.name, view.id);
            Ok(view)
        })
    }

    /// Add a traditional view.
    ///
    /// When the view lists no referenced tables, they are detected from the FROM and JOIN
    /// clauses of its query.
    pub fn add_traditional_view(&mut self, view: TraditionalView) -> SchemaResult<TraditionalView> {
        self.apply(|project, now| {
            let mut view = view;
            check_view_name(project, &view.id, &view.name)?;
            if view.referenced_table_ids.is_empty() {
                view.referenced_table_ids = resolve_referenced_tables(project, &view.sql_query);
            }
            view.created_at = now;
            view.updated_at = now;

            info!(
                "Adding view {} ({}) reading {} table(s)",
                view.name,
                view.id,
                view.referenced_table_ids.len()
            );
            project.traditional_views.push(view.clone());
            Ok(view)
        })
    }

    pub fn update_traditional_view(
        &mut self,
        view_id: &str,
        patch: TraditionalViewPatch,
    ) -> SchemaResult<TraditionalView> {
        self.apply(|project, now| {
            let mut view = project
                .traditional_view(view_id)
                .cloned()
                .ok_or_else(|| SchemaError::not_found(EntityKind::TraditionalView, view_id))?;
            patch.apply(&mut view);
            if patch.name.is_some() {
                validate_table_name(&view.name).map_err(|e| e.for_entity(view_id))?;
            }
            if patch.sql_query.is_some() && patch.referenced_table_ids.is_none() {
                view.referenced_table_ids = resolve_referenced_tables(project, &view.sql_query);
            }
            view.updated_at = now;

            if let Some(slot) = project.traditional_views.iter_mut().find(|v| v.id == view_id) {
                *slot = view.clone();
            }
            debug!("Updated view {}", view_id);
            Ok(view)
        })
    }

    pub fn delete_traditional_view(&mut self, view_id: &str) -> SchemaResult<TraditionalView> {
        self.apply(|project, _| {
            let position = project
                .traditional_views
                .iter()
                .position(|v| v.id == view_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::TraditionalView, view_id))?;
            let view = project.traditional_views.remove(position);
            info!("Deleted view {} ({})", view.name, view.id);
            Ok(view)
        })
    }

    /// Link a source table to a metric view.
    pub fn add_metric_relationship(
        &mut self,
        source_table_id: &str,
        metric_view_id: &str,
    ) -> SchemaResult<MetricRelationship> {
        self.apply(|project, now| {
            if project.table(source_table_id).is_none() {
                return Err(SchemaError::not_found(EntityKind::Table, source_table_id));
            }
            if project.metric_view(metric_view_id).is_none() {
                return Err(SchemaError::not_found(EntityKind::MetricView, metric_view_id));
            }
            if let Some(existing) = project
                .metric_relationships
                .iter()
                .find(|m| m.source_table_id == source_table_id && m.metric_view_id == metric_view_id)
            {
                return Err(SchemaError::duplicate(
                    &existing.id,
                    "table is already linked to this metric view",
                ));
            }

            let mut link = MetricRelationship::new(source_table_id, metric_view_id);
            link.created_at = now;
            project.metric_relationships.push(link.clone());
            Ok(link)
        })
    }

    pub fn delete_metric_relationship(&mut self, id: &str) -> SchemaResult<MetricRelationship> {
        self.apply(|project, _| {
            let position = project
                .metric_relationships
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::MetricRelationship, id))?;
            Ok(project.metric_relationships.remove(position))
        })
    }
}

fn check_view_name(project: &Project, view_id: &str, name: &str) -> SchemaResult<()> {
    validate_table_name(name).map_err(|e| e.for_entity(view_id))?;
    let taken = project.metric_views.iter().any(|v| v.id == view_id)
        || project.traditional_views.iter().any(|v| v.id == view_id);
    if taken {
        return Err(SchemaError::duplicate(view_id, "view id already exists"));
    }
    Ok(())
}

fn check_metric_sources(project: &Project, view: &MetricView) -> SchemaResult<()> {
    for table_id in view.dependency_table_ids() {
        if project.table(table_id).is_none() {
            return Err(SchemaError::integrity(
                &view.id,
                format!("metric view '{}' reads missing table {}", view.name, table_id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field};
    use crate::store::TableSpec;

    fn graph() -> SchemaGraph {
        let mut graph = SchemaGraph::empty("p", "main", "sales");
        graph
            .add_table(
                TableSpec::new("orders")
                    .with_id("T1")
                    .with_field(Field::new("order_id", DataType::Int).with_id("F1")),
            )
            .unwrap();
        graph
    }

    #[test]
    fn traditional_view_detects_tables() {
        let mut graph = graph();
        let view = graph
            .add_traditional_view(TraditionalView::new("recent", "SELECT * FROM main.sales.orders"))
            .unwrap();
        assert_eq!(view.referenced_table_ids, vec!["T1"]);

        let view = graph
            .update_traditional_view(
                &view.id,
                TraditionalViewPatch {
                    sql_query: Some("SELECT 1".into()),
                    ..TraditionalViewPatch::default()
                },
            )
            .unwrap();
        assert!(view.referenced_table_ids.is_empty());
    }

    #[test]
    fn metric_view_requires_existing_source() {
        let mut graph = graph();
        assert!(graph.add_metric_view(MetricView::new("m", "T404")).is_err());
        assert!(graph.project().metric_views.is_empty());
    }

    #[test]
    fn deleting_metric_view_drops_its_links() {
        let mut graph = graph();
        let view = graph.add_metric_view(MetricView::new("m", "T1").with_id("MV1")).unwrap();
        graph.add_metric_relationship("T1", &view.id).unwrap();
        assert!(graph.add_metric_relationship("T1", &view.id).is_err());

        graph.delete_metric_view("MV1").unwrap();
        assert!(graph.project().metric_relationships.is_empty());
    }

    #[test]
    fn deleting_table_drops_metric_links() {
        let mut graph = graph();
        graph.add_metric_view(MetricView::new("m", "T1").with_id("MV1")).unwrap();
        graph.add_metric_relationship("T1", "MV1").unwrap();
        let _ = graph.delete_table("T1").unwrap();
        assert!(graph.project().metric_relationships.is_empty());
        assert_eq!(graph.project().metric_views.len(), 1);
    }
}
