//! Tests for the schema graph store

use schema_graph_sdk::compiler::DdlCompiler;
use schema_graph_sdk::error::{EntityKind, SchemaError};
use schema_graph_sdk::models::{
    DataType, Field, ForeignKeyOrigin, MetricView, Project, Relationship, Table, TraditionalView,
};
use schema_graph_sdk::store::{
    CatalogImport, FieldPatch, RelationshipSpec, SchemaGraph, TablePatch, TableSpec,
};
use schema_graph_sdk::validation::integrity::IntegrityValidator;

fn graph() -> SchemaGraph {
    let mut graph = SchemaGraph::empty("shop", "main", "sales");
    graph
        .add_table(
            TableSpec::new("orders")
                .with_id("T1")
                .with_field(Field::new("order_id", DataType::Bigint).with_id("F1").primary_key())
                .with_field(Field::new("placed_at", DataType::Timestamp).with_id("F2")),
        )
        .unwrap();
    graph
        .add_table(
            TableSpec::new("shipments")
                .with_id("T2")
                .with_field(Field::new("shipment_id", DataType::Int).with_id("F3").primary_key())
                .with_field(Field::new("order_ref", DataType::Bigint).with_id("F4")),
        )
        .unwrap();
    graph
}

#[test]
fn test_failed_mutation_leaves_project_unchanged() {
    let mut graph = graph();
    let before = graph.project().clone();

    let err = graph
        .update_field(
            "T1",
            "F2",
            FieldPatch {
                name: Some("   ".to_string()),
                ..FieldPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SchemaError::Validation { .. }));
    assert_eq!(graph.project(), &before);
}

#[test]
fn test_unknown_entities_are_not_found() {
    let mut graph = graph();
    assert_eq!(
        graph.delete_table("T9").unwrap_err(),
        SchemaError::not_found(EntityKind::Table, "T9")
    );
    assert_eq!(
        graph
            .update_field("T1", "F9", FieldPatch::default())
            .unwrap_err(),
        SchemaError::not_found(EntityKind::Field, "F9")
    );
    assert!(matches!(
        graph.delete_metric_view("MV9"),
        Err(SchemaError::NotFound {
            entity: EntityKind::MetricView,
            ..
        })
    ));
}

#[test]
fn test_relationship_then_compile() {
    let mut graph = graph();
    graph
        .add_relationship(RelationshipSpec::new("T1", "F1", "T2", "F4").with_id("R1"))
        .unwrap();

    let fk = graph.project().table("T2").unwrap().field("F4").unwrap();
    assert_eq!(fk.foreign_key_origin, Some(ForeignKeyOrigin::Independent));

    let statements = DdlCompiler::default().compile(graph.project()).unwrap();
    assert_eq!(statements.len(), 3);
    assert!(statements[2].sql.contains("FOREIGN KEY (order_ref) REFERENCES main.sales.orders (order_id)"));
}

#[test]
fn test_every_mutation_keeps_invariants() {
    let mut graph = graph();
    graph.connect_primary_key("T1", "F1", "T2").unwrap();
    graph
        .add_field("T1", Field::new("total", DataType::Double).with_id("F5"))
        .unwrap();
    graph
        .update_field(
            "T1",
            "F1",
            FieldPatch {
                name: Some("id".to_string()),
                ..FieldPatch::default()
            },
        )
        .unwrap();
    graph.delete_field("T1", "F2").unwrap();

    assert!(IntegrityValidator::new()
        .check_project(graph.project())
        .is_empty());
    let shipments = graph.project().table("T2").unwrap();
    assert!(shipments.field_by_name("id").is_some());
}

#[test]
fn test_replacing_field_list_drops_relationships() {
    let mut graph = graph();
    graph
        .add_relationship(RelationshipSpec::new("T1", "F1", "T2", "F4").with_id("R1"))
        .unwrap();

    let kept = vec![graph.project().table("T2").unwrap().fields[0].clone()];
    let table = graph
        .update_table(
            "T2",
            TablePatch {
                comment: Some(Some("outbound".to_string())),
                ..TablePatch::fields(kept)
            },
        )
        .unwrap();

    assert_eq!(table.fields.len(), 1);
    assert_eq!(table.comment.as_deref(), Some("outbound"));
    assert!(graph.project().relationships.is_empty());
}

#[test]
fn test_composite_primary_key() {
    let mut graph = graph();
    graph
        .update_field(
            "T1",
            "F2",
            FieldPatch {
                is_primary_key: Some(true),
                nullable: Some(false),
                ..FieldPatch::default()
            },
        )
        .unwrap();

    let statements = DdlCompiler::default().compile(graph.project()).unwrap();
    assert!(statements[0]
        .sql
        .contains("CONSTRAINT pk_orders PRIMARY KEY (order_id, placed_at)"));
}

#[test]
fn test_views_resolve_their_tables() {
    let mut graph = graph();
    let view = graph
        .add_traditional_view(
            TraditionalView::new(
                "late_orders",
                "SELECT o.* FROM main.sales.orders o JOIN shipments s ON s.order_ref = o.order_id",
            )
            .with_id("V1"),
        )
        .unwrap();
    assert_eq!(view.referenced_table_ids, vec!["T1", "T2"]);

    let err = graph
        .add_metric_view(MetricView::new("m", "T404").with_id("MV1"))
        .unwrap_err();
    assert!(matches!(err, SchemaError::ReferentialIntegrity { .. }));

    graph
        .add_metric_view(MetricView::new("order_metrics", "T1").with_id("MV2"))
        .unwrap();
    let link = graph.add_metric_relationship("T1", "MV2").unwrap();
    assert!(matches!(
        graph.add_metric_relationship("T1", "MV2"),
        Err(SchemaError::DuplicateEntity { .. })
    ));

    graph.delete_metric_view("MV2").unwrap();
    assert!(graph.project().metric_relationships.is_empty());
    assert!(matches!(
        graph.delete_metric_relationship(&link.id),
        Err(SchemaError::NotFound { .. })
    ));
}

#[test]
fn test_import_merges_tables_and_links_keys() {
    let mut graph = graph();
    let import = CatalogImport {
        tables: vec![
            Table::new("refunds")
                .with_id("T3")
                .with_field(Field::new("refund_id", DataType::Int).with_id("F6").primary_key())
                .with_field(Field::new("order_id", DataType::Bigint).with_id("F7")),
        ],
        relationships: vec![Relationship::new("T1", "F1", "T3", "F7").with_id("R9")],
    };

    let summary = graph.merge_import(import).unwrap();
    assert_eq!(summary.tables_added, vec!["T3"]);
    assert_eq!(summary.relationships_added, vec!["R9"]);

    let fk = graph.project().table("T3").unwrap().field("F7").unwrap();
    assert!(fk.references_field("T1", "F1"));
    assert_eq!(fk.foreign_key_origin, Some(ForeignKeyOrigin::Linked));
}

#[test]
fn test_import_name_collision_is_rejected() {
    let mut graph = graph();
    let before = graph.project().clone();
    let import = CatalogImport {
        tables: vec![Table::new("ORDERS")
            .with_id("T7")
            .with_field(Field::new("x", DataType::Int))],
        relationships: Vec::new(),
    };
    assert!(matches!(
        graph.merge_import(import),
        Err(SchemaError::DuplicateEntity { .. })
    ));
    assert_eq!(graph.project(), &before);
}

#[test]
fn test_opening_inconsistent_project_fails() {
    let mut project = Project::new("broken", "main", "sales");
    project.tables.push(
        Table::new("shipments")
            .with_id("T2")
            .with_field(Field::new("order_ref", DataType::Int).references("T1", "F1")),
    );
    assert!(matches!(
        SchemaGraph::new(project),
        Err(SchemaError::ReferentialIntegrity { .. })
    ));

    let mut graph = graph();
    let replacement = Project::new("fresh", "main", "sales");
    graph.reset(replacement.clone()).unwrap();
    assert_eq!(graph.into_project(), replacement);
}
