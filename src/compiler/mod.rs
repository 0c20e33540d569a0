//! Dependency resolution and DDL compilation
//!
//! [`DdlCompiler::compile`] turns a project into an ordered list of statements:
//! - every validation problem in the project is collected first; any problem aborts
//!   compilation and nothing is emitted
//! - tables are created in dependency order, each followed by its tag statements
//! - foreign key constraints are added once every table exists
//! - metric views and plain views come last
//!
//! Compilation is a pure function of the project, so compiling an unchanged project twice
//! yields identical statements.

pub mod ddl;
pub mod graph;
pub mod metric_view;

use crate::error::{CompileErrors, EntityKind, SchemaError};
use crate::models::{Project, Table};
use crate::validation::input::validate_table_name;
use crate::validation::{IntegrityValidator, TableValidator, validate_view_query};
use ddl::DdlRenderer;
pub use graph::{DependencyGraph, DependencyNode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How `CREATE` statements treat existing objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    Create,
    #[default]
    CreateOrReplace,
    IfNotExists,
}

impl FromStr for CreateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "create" => Ok(CreateMode::Create),
            "create_or_replace" | "replace" => Ok(CreateMode::CreateOrReplace),
            "if_not_exists" => Ok(CreateMode::IfNotExists),
            other => Err(format!("Unknown create mode: {}", other)),
        }
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CreateMode::Create => "create",
            CreateMode::CreateOrReplace => "create_or_replace",
            CreateMode::IfNotExists => "if_not_exists",
        })
    }
}

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub create_mode: CreateMode,
    /// Emit `SET TAGS` statements for tags and logical names
    pub include_tags: bool,
    /// Overrides the project's catalog
    pub catalog_name: Option<String>,
    /// Overrides the project's schema
    pub schema_name: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            create_mode: CreateMode::default(),
            include_tags: true,
            catalog_name: None,
            schema_name: None,
        }
    }
}

/// What a statement does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    CreateTable,
    SetTag,
    AddConstraint,
    CreateView,
    CreateMetricView,
}

/// One statement of a compiled script, tagged with the entity it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedStatement {
    /// 1-based position in the script
    pub sequence: usize,
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub kind: StatementKind,
    /// Qualified name of the object the statement creates or alters
    pub object_name: String,
    pub sql: String,
}

/// DDL compiler
#[derive(Debug, Clone, Default)]
pub struct DdlCompiler {
    options: CompileOptions,
}

struct ScriptBuilder {
    statements: Vec<OrderedStatement>,
}

impl ScriptBuilder {
    fn push(
        &mut self,
        entity_id: &str,
        entity_kind: EntityKind,
        kind: StatementKind,
        object_name: String,
        sql: String,
    ) {
        self.statements.push(OrderedStatement {
            sequence: self.statements.len() + 1,
            entity_id: entity_id.to_string(),
            entity_kind,
            kind,
            object_name,
            sql,
        });
    }
}

impl DdlCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn renderer(&self, project: &Project) -> DdlRenderer {
        DdlRenderer::new(
            self.options
                .catalog_name
                .as_deref()
                .unwrap_or(&project.catalog_name),
            self.options
                .schema_name
                .as_deref()
                .unwrap_or(&project.schema_name),
            self.options.create_mode,
        )
    }

    /// Collect every problem that would prevent compilation.
    ///
    /// Covers referential integrity, table structure, type parameters, duplicate names,
    /// view definitions and dependency cycles. An empty result means `compile` succeeds.
    pub fn validate(&self, project: &Project) -> Vec<SchemaError> {
        let integrity = IntegrityValidator::new();
        let tables = TableValidator::new();

        let mut errors = integrity.check_project(project);
        errors.extend(integrity.check_view_sources(project));
        for table in &project.tables {
            errors.extend(tables.validate_table(table));
        }
        errors.extend(tables.detect_duplicate_names(project));

        for view in &project.metric_views {
            if let Err(e) = validate_table_name(&view.name) {
                errors.push(e.for_entity(&view.id));
            }
            let has_sql = view
                .source_sql
                .as_deref()
                .is_some_and(|sql| !sql.trim().is_empty());
            if view.source_table_id.is_none() && !has_sql {
                errors.push(SchemaError::validation(
                    &view.id,
                    format!("metric view '{}' has no source table or source SQL", view.name),
                ));
            }
        }
        for view in &project.traditional_views {
            if let Err(e) = validate_table_name(&view.name) {
                errors.push(e.for_entity(&view.id));
            }
            if let Err(message) = validate_view_query(&view.sql_query) {
                errors.push(SchemaError::validation(
                    &view.id,
                    format!("view '{}': {}", view.name, message),
                ));
            }
        }

        errors.extend(DependencyGraph::build(project).cycle_errors());

        // The integrity and table checks overlap on duplicate field ids
        let mut unique: Vec<SchemaError> = Vec::with_capacity(errors.len());
        for error in errors {
            if !unique.contains(&error) {
                unique.push(error);
            }
        }
        unique
    }

    /// Compile a project into dependency-ordered statements.
    ///
    /// # Errors
    ///
    /// Returns every validation problem found, cycles included. No statements are returned
    /// when any problem exists.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::compiler::{DdlCompiler, StatementKind};
    /// use schema_graph_sdk::models::{DataType, Field, Project, Table};
    ///
    /// let mut project = Project::new("shop", "main", "sales");
    /// project.tables.push(
    ///     Table::new("orders").with_id("T1").with_field(Field::new("order_id", DataType::Int).with_id("F1").primary_key()),
    /// );
    /// project.tables.push(
    ///     Table::new("line_items")
    ///         .with_id("T2")
    ///         .with_field(Field::new("order_id", DataType::Int).with_id("F2").references("T1", "F1")),
    /// );
    ///
    /// let statements = DdlCompiler::default().compile(&project).unwrap();
    /// let kinds: Vec<StatementKind> = statements.iter().map(|s| s.kind).collect();
    /// assert_eq!(
    ///     kinds,
    ///     vec![StatementKind::CreateTable, StatementKind::CreateTable, StatementKind::AddConstraint]
    /// );
    /// ```
    pub fn compile(&self, project: &Project) -> Result<Vec<OrderedStatement>, CompileErrors> {
        let errors = self.validate(project);
        if !errors.is_empty() {
            warn!(
                "Compilation of project '{}' failed with {} error(s)",
                project.name,
                errors.len()
            );
            return Err(CompileErrors::new(errors));
        }

        let graph = DependencyGraph::build(project);
        let order = graph.topological_order().map_err(CompileErrors::new)?;
        let tables: Vec<&Table> = order
            .iter()
            .filter(|node| node.kind == EntityKind::Table)
            .filter_map(|node| project.table(&node.id))
            .collect();

        let renderer = self.renderer(project);
        let mut script = ScriptBuilder {
            statements: Vec::new(),
        };

        for table in &tables {
            let object_name = renderer.qualified(&table.name);
            script.push(
                &table.id,
                EntityKind::Table,
                StatementKind::CreateTable,
                object_name.clone(),
                renderer.create_table(table),
            );
            if self.options.include_tags {
                for sql in renderer.table_tags(table) {
                    script.push(
                        &table.id,
                        EntityKind::Table,
                        StatementKind::SetTag,
                        object_name.clone(),
                        sql,
                    );
                }
            }
        }
        debug!("Emitted table statements for {} table(s)", tables.len());

        for table in &tables {
            self.push_foreign_keys(project, table, &renderer, &mut script);
        }

        for view in &project.metric_views {
            let sql = metric_view::create_metric_view(view, project, &renderer)
                .map_err(|e| CompileErrors::new(vec![e]))?;
            let object_name = renderer.qualified(&view.name);
            script.push(
                &view.id,
                EntityKind::MetricView,
                StatementKind::CreateMetricView,
                object_name.clone(),
                sql,
            );
            if self.options.include_tags
                && let Some(sql) = renderer.view_tags(&view.name, &view.tags, None)
            {
                script.push(&view.id, EntityKind::MetricView, StatementKind::SetTag, object_name, sql);
            }
        }
        for view in &project.traditional_views {
            let object_name = renderer.qualified(&view.name);
            script.push(
                &view.id,
                EntityKind::TraditionalView,
                StatementKind::CreateView,
                object_name.clone(),
                renderer.create_view(view, project),
            );
            if self.options.include_tags
                && let Some(sql) =
                    renderer.view_tags(&view.name, &view.tags, view.logical_name.as_deref())
            {
                script.push(
                    &view.id,
                    EntityKind::TraditionalView,
                    StatementKind::SetTag,
                    object_name,
                    sql,
                );
            }
        }

        info!(
            "Compiled project '{}' into {} statement(s)",
            project.name,
            script.statements.len()
        );
        Ok(script.statements)
    }

    fn push_foreign_keys(
        &self,
        project: &Project,
        table: &Table,
        renderer: &DdlRenderer,
        script: &mut ScriptBuilder,
    ) {
        for field in &table.fields {
            let Some(reference) = &field.foreign_key_reference else {
                continue;
            };
            let Some(referenced_table) = project.table(&reference.referenced_table_id) else {
                continue;
            };
            let Some(referenced_field) = referenced_table.field(&reference.referenced_field_id)
            else {
                continue;
            };

            let relationship = project.relationships.iter().find(|r| {
                r.dependent_location() == (table.id.as_str(), field.id.as_str())
                    && r.source_location()
                        == (
                            reference.referenced_table_id.as_str(),
                            reference.referenced_field_id.as_str(),
                        )
            });
            let (entity_id, entity_kind) = match relationship {
                Some(r) => (r.id.as_str(), EntityKind::Relationship),
                None => (field.id.as_str(), EntityKind::Field),
            };

            let sql = renderer.foreign_key(
                table,
                field,
                reference,
                (referenced_table, referenced_field),
                relationship.and_then(|r| r.constraint_name.as_deref()),
            );
            script.push(
                entity_id,
                entity_kind,
                StatementKind::AddConstraint,
                renderer.qualified(&table.name),
                sql,
            );
        }
    }

    /// Join statements into one script, each terminated by `;`
    pub fn render_script(statements: &[OrderedStatement]) -> String {
        let mut script = statements
            .iter()
            .map(|s| s.sql.as_str())
            .collect::<Vec<_>>()
            .join(";\n\n");
        if !script.is_empty() {
            script.push_str(";\n");
        }
        script
    }
}
