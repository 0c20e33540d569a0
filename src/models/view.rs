//! Metric view and traditional view models
//!
//! Views are sinks of the dependency graph: they depend on tables but nothing depends on
//! them, so they never take part in a cycle.

use super::enums::{JoinType, WindowType};
use super::table::{Position, Size};
use super::tag::TagMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_version() -> String {
    "0.1".to_string()
}

/// Grouping attribute of a metric view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            expr: expr.into(),
            description: None,
            data_type: None,
        }
    }
}

/// Aggregated value of a metric view, optionally computed over a window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measure {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_type: Option<String>,
    #[serde(default)]
    pub is_window_measure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_type: Option<WindowType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_periods: Option<u32>,
    /// Raw frame clause for `custom` windows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_frame: Option<String>,
}

impl Measure {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            expr: expr.into(),
            description: None,
            aggregation_type: None,
            is_window_measure: false,
            window_type: None,
            window_size: None,
            partition_by: Vec::new(),
            order_by: None,
            offset_periods: None,
            window_frame: None,
        }
    }

    /// Expression emitted for this measure
    ///
    /// Plain measures return `expr` unchanged. Window measures wrap it in the matching
    /// analytic function.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::models::{Measure, WindowType};
    ///
    /// let mut measure = Measure::new("rolling", "revenue");
    /// measure.is_window_measure = true;
    /// measure.window_type = Some(WindowType::MovingAverage);
    /// measure.window_size = Some(7);
    /// measure.order_by = Some("order_date".to_string());
    ///
    /// assert_eq!(
    ///     measure.expression(),
    ///     "AVG(revenue) OVER (ORDER BY order_date ROWS BETWEEN 6 PRECEDING AND CURRENT ROW)"
    /// );
    /// ```
    pub fn expression(&self) -> String {
        let window_type = match (self.is_window_measure, self.window_type) {
            (true, Some(window_type)) => window_type,
            _ => return self.expr.clone(),
        };
        let base = &self.expr;
        let running = "ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW";

        match window_type {
            WindowType::MovingAverage => {
                let frame = self
                    .window_size
                    .map(|size| format!("ROWS BETWEEN {} PRECEDING AND CURRENT ROW", size.saturating_sub(1)));
                format!("AVG({}) {}", base, self.over(frame.as_deref()))
            }
            WindowType::RunningTotal | WindowType::CumulativeSum => {
                format!("SUM({}) {}", base, self.over(Some(running)))
            }
            WindowType::PeriodOverPeriod => {
                let offset = self.offset_periods.unwrap_or(1);
                let over = self.over(None);
                format!(
                    "({base} - LAG({base}, {offset}) {over}) / LAG({base}, {offset}) {over} * 100"
                )
            }
            WindowType::Rank => format!("RANK() {}", self.over(None)),
            WindowType::RowNumber => format!("ROW_NUMBER() {}", self.over(None)),
            WindowType::PercentOfTotal => {
                format!("{} / SUM({}) {} * 100", base, base, self.over(None))
            }
            WindowType::Custom => {
                format!("{} {}", base, self.over(self.window_frame.as_deref()))
            }
        }
    }

    fn over(&self, frame: Option<&str>) -> String {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            parts.push(format!("PARTITION BY {}", self.partition_by.join(", ")));
        }
        if let Some(order_by) = self.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
            parts.push(format!("ORDER BY {}", order_by));
        }
        if let Some(frame) = frame.filter(|f| !f.trim().is_empty()) {
            parts.push(frame.to_string());
        }
        format!("OVER ({})", parts.join(" "))
    }
}

/// Join from the metric view source to another table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricViewJoin {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_table_id: Option<String>,
    /// Qualified name used when the joined table is not part of the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_on: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub using: Vec<String>,
    #[serde(default)]
    pub join_type: JoinType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<MetricViewJoin>,
}

impl MetricViewJoin {
    /// Ids of every project table joined here or in nested joins
    pub fn joined_table_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.joined_table_id.iter().map(String::as_str).collect();
        for nested in &self.joins {
            ids.extend(nested.joined_table_ids());
        }
        ids
    }
}

/// Metric view defined by a YAML body over a source table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricView {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_table_id: Option<String>,
    /// Free SQL source used instead of a project table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub joins: Vec<MetricViewJoin>,
    #[serde(default)]
    pub tags: TagMap,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetricView {
    pub fn new(name: impl Into<String>, source_table_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            version: default_version(),
            source_table_id: Some(source_table_id.into()),
            source_sql: None,
            filter: None,
            dimensions: Vec::new(),
            measures: Vec::new(),
            joins: Vec::new(),
            tags: TagMap::new(),
            position: Position::default(),
            size: Size::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Project tables this view reads: the source table first, then joined tables
    pub fn dependency_table_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.source_table_id.iter().map(String::as_str).collect();
        for join in &self.joins {
            for id in join.joined_table_ids() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// View defined by a SELECT statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraditionalView {
    pub id: String,
    pub name: String,
    pub sql_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,
    #[serde(default)]
    pub referenced_table_ids: Vec<String>,
    #[serde(default)]
    pub tags: TagMap,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TraditionalView {
    pub fn new(name: impl Into<String>, sql_query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            sql_query: sql_query.into(),
            description: None,
            logical_name: None,
            referenced_table_ids: Vec::new(),
            tags: TagMap::new(),
            position: Position::default(),
            size: Size::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
