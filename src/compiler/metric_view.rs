//! Metric view YAML definitions
//!
//! Metric views are created with `WITH METRICS LANGUAGE YAML AS $$ ... $$`. The body is
//! built as a typed document and serialized with `serde_yaml`, so quoting inside
//! expressions is never done by hand.

use super::ddl::DdlRenderer;
use crate::error::{SchemaError, SchemaResult};
use crate::models::{JoinType, MetricView, MetricViewJoin, Project};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MEASURE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MEASURE\(([^)]+)\)").expect("Invalid regex"));

/// YAML body of a metric view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricViewDefinition {
    pub version: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<NamedExpression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<NamedExpression>,
}

/// Join entry; `on` and `using` are mutually exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDefinition {
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub using: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExpression {
    pub name: String,
    pub expr: String,
}

/// Measure name as the catalog expects it: spaces removed
pub fn measure_name(name: &str) -> String {
    name.chars().filter(|c| *c != ' ').collect()
}

/// Rewrite `MEASURE(x)` references to the cleaned measure names
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::compiler::metric_view::normalize_measure_references;
///
/// assert_eq!(
///     normalize_measure_references(r#"MEASURE("Total Revenue") / MEASURE(`Order Count`)"#),
///     "MEASURE(TotalRevenue) / MEASURE(OrderCount)"
/// );
/// ```
pub fn normalize_measure_references(expr: &str) -> String {
    MEASURE_REFERENCE
        .replace_all(expr, |captures: &regex::Captures| {
            let cleaned: String = captures[1]
                .trim()
                .trim_matches(|c| c == '"' || c == '`' || c == '\'')
                .chars()
                .filter(|c| *c != ' ')
                .collect();
            format!("MEASURE({})", cleaned)
        })
        .into_owned()
}

/// Build the YAML document for a metric view.
///
/// Fails with a validation error when the view has neither a source table nor source SQL.
pub fn build_definition(
    view: &MetricView,
    project: &Project,
    renderer: &DdlRenderer,
) -> SchemaResult<MetricViewDefinition> {
    let source_table = view.source_table_id.as_deref().and_then(|id| project.table(id));
    let source = match (source_table, view.source_sql.as_deref()) {
        (Some(table), _) => renderer.qualified(&table.name),
        (None, Some(sql)) if !sql.trim().is_empty() => sql.trim().to_string(),
        _ => {
            return Err(SchemaError::validation(
                &view.id,
                format!("metric view '{}' has no source table or source SQL", view.name),
            ));
        }
    };
    let source_name = source_table.map(|t| t.name.as_str());

    Ok(MetricViewDefinition {
        version: view.version.clone(),
        source,
        filter: view.filter.clone().filter(|f| !f.trim().is_empty()),
        joins: view
            .joins
            .iter()
            .map(|join| build_join(join, project, renderer, source_name))
            .collect(),
        dimensions: view
            .dimensions
            .iter()
            .map(|d| NamedExpression {
                name: d.name.clone(),
                expr: d.expr.clone(),
            })
            .collect(),
        measures: view
            .measures
            .iter()
            .map(|m| NamedExpression {
                name: measure_name(&m.name),
                expr: normalize_measure_references(&m.expression()),
            })
            .collect(),
    })
}

fn build_join(
    join: &MetricViewJoin,
    project: &Project,
    renderer: &DdlRenderer,
    source_name: Option<&str>,
) -> JoinDefinition {
    let source = match join.joined_table_id.as_deref().and_then(|id| project.table(id)) {
        Some(table) => renderer.qualified(&table.name),
        None => match join.joined_table_name.as_deref() {
            // keep at most catalog.schema.table
            Some(name) if !name.trim().is_empty() => {
                let parts: Vec<&str> = name.trim().split('.').collect();
                parts[parts.len().saturating_sub(3)..].join(".")
            }
            _ => renderer.qualified(&join.name),
        },
    };

    let on = if join.using.is_empty() {
        join.sql_on
            .as_deref()
            .filter(|on| !on.trim().is_empty())
            .map(|on| source_aliased(on.trim(), source_name))
    } else {
        None
    };

    JoinDefinition {
        name: join.name.clone(),
        source,
        on,
        using: join.using.clone(),
        join_type: (join.join_type != JoinType::Left).then(|| join.join_type.as_lowercase().to_string()),
        joins: join
            .joins
            .iter()
            .map(|nested| build_join(nested, project, renderer, source_name))
            .collect(),
    }
}

// Join conditions refer to the metric view source as `source`
fn source_aliased(condition: &str, source_name: Option<&str>) -> String {
    let mut aliases = vec!["base".to_string()];
    if let Some(name) = source_name {
        aliases.push(regex::escape(name));
    }
    match Regex::new(&format!(r"\b(?:{})\.", aliases.join("|"))) {
        Ok(pattern) => pattern.replace_all(condition, "source.").into_owned(),
        Err(_) => condition.to_string(),
    }
}

/// Full `CREATE VIEW ... WITH METRICS` statement for a metric view
pub fn create_metric_view(
    view: &MetricView,
    project: &Project,
    renderer: &DdlRenderer,
) -> SchemaResult<String> {
    let definition = build_definition(view, project, renderer)?;
    let yaml = serde_yaml::to_string(&definition).map_err(|e| {
        SchemaError::validation(&view.id, format!("failed to serialize metric view: {}", e))
    })?;
    Ok(format!("{} $$\n{}$$", renderer.metric_view_header(&view.name), yaml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CreateMode;
    use crate::models::{DataType, Dimension, Field, Measure, Table, WindowType};

    fn setup() -> (Project, DdlRenderer) {
        let mut project = Project::new("p", "main", "sales");
        project.tables.push(
            Table::new("orders")
                .with_id("T1")
                .with_field(Field::new("order_id", DataType::Int)),
        );
        project.tables.push(
            Table::new("customers")
                .with_id("T2")
                .with_field(Field::new("id", DataType::Int)),
        );
        (project, DdlRenderer::new("main", "sales", CreateMode::CreateOrReplace))
    }

    #[test]
    fn renders_source_joins_and_measures() {
        let (project, renderer) = setup();
        let mut view = MetricView::new("order_metrics", "T1").with_id("MV1");
        view.dimensions.push(Dimension::new("Order Date", "order_date"));
        view.measures.push(Measure::new("Total Revenue", "SUM(amount)"));
        view.joins.push(MetricViewJoin {
            id: "J1".into(),
            name: "customers".into(),
            joined_table_id: Some("T2".into()),
            joined_table_name: None,
            sql_on: Some("orders.customer_id = customers.id".into()),
            using: Vec::new(),
            join_type: JoinType::Inner,
            joins: Vec::new(),
        });

        let definition = build_definition(&view, &project, &renderer).unwrap();
        assert_eq!(definition.source, "main.sales.orders");
        assert_eq!(definition.joins[0].source, "main.sales.customers");
        assert_eq!(definition.joins[0].on.as_deref(), Some("source.customer_id = customers.id"));
        assert_eq!(definition.joins[0].join_type.as_deref(), Some("inner"));
        assert_eq!(definition.measures[0].name, "TotalRevenue");

        let sql = create_metric_view(&view, &project, &renderer).unwrap();
        assert!(sql.starts_with("CREATE OR REPLACE VIEW main.sales.order_metrics\nWITH METRICS\nLANGUAGE YAML\nAS $$\n"));
        assert!(sql.ends_with("$$"));
        assert!(sql.contains("type: inner"));
        assert!(sql.contains("name: Order Date"));
    }

    #[test]
    fn window_measures_render_expressions() {
        let (project, renderer) = setup();
        let mut view = MetricView::new("m", "T1");
        let mut measure = Measure::new("Running", "amount");
        measure.is_window_measure = true;
        measure.window_type = Some(WindowType::RunningTotal);
        measure.order_by = Some("order_date".into());
        view.measures.push(measure);

        let definition = build_definition(&view, &project, &renderer).unwrap();
        assert_eq!(
            definition.measures[0].expr,
            "SUM(amount) OVER (ORDER BY order_date ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
        );
    }

    #[test]
    fn requires_a_source() {
        let (project, renderer) = setup();
        let mut view = MetricView::new("m", "T404");
        view.source_table_id = None;
        assert!(build_definition(&view, &project, &renderer).is_err());

        view.source_sql = Some("SELECT * FROM main.sales.orders".into());
        let definition = build_definition(&view, &project, &renderer).unwrap();
        assert_eq!(definition.source, "SELECT * FROM main.sales.orders");
    }

    #[test]
    fn joined_names_keep_last_three_parts() {
        let (project, renderer) = setup();
        let join = MetricViewJoin {
            id: "J1".into(),
            name: "dim".into(),
            joined_table_id: None,
            joined_table_name: Some("a.b.c.d.dim_customer".into()),
            sql_on: None,
            using: vec!["customer_id".into()],
            join_type: JoinType::Left,
            joins: Vec::new(),
        };
        let definition = build_join(&join, &project, &renderer, None);
        assert_eq!(definition.source, "c.d.dim_customer");
        assert_eq!(definition.join_type, None);
        assert_eq!(definition.on, None);
    }
}
