//! Tests for the collaborator service bridges

use async_trait::async_trait;
use schema_graph_sdk::compiler::{DdlCompiler, OrderedStatement, StatementKind};
use schema_graph_sdk::error::SchemaError;
use schema_graph_sdk::models::{DataType, Field, Relationship, Table};
use schema_graph_sdk::services::{
    CatalogImport, CatalogImporter, CatalogService, ExecutionService, MemoryPersistence,
    PersistenceService, ProjectFormat, ProjectRepository, ServiceError, ServiceResult,
    StatementResult,
};
use schema_graph_sdk::store::{SchemaGraph, TableSpec};
use serde_json::json;
use std::cell::RefCell;

/// Catalog returning a fixed set of tables, one of them twice
struct FakeCatalog;

#[async_trait(?Send)]
impl CatalogService for FakeCatalog {
    async fn list_catalogs(&self) -> ServiceResult<Vec<String>> {
        Ok(vec!["main".to_string()])
    }

    async fn list_schemas(&self, catalog: &str) -> ServiceResult<Vec<String>> {
        match catalog {
            "main" => Ok(vec!["sales".to_string()]),
            other => Err(ServiceError::NotFound(format!("catalog '{}'", other))),
        }
    }

    async fn list_tables(&self, _catalog: &str, _schema: &str) -> ServiceResult<Vec<String>> {
        Ok(vec!["customers".to_string(), "orders".to_string()])
    }

    async fn import_tables(
        &self,
        _catalog: &str,
        _schema: &str,
        table_names: &[String],
    ) -> ServiceResult<CatalogImport> {
        let mut tables = Vec::new();
        for name in table_names {
            let table = match name.as_str() {
                "customers" => Table::new("customers").with_id("C1").with_field(
                    Field::new("customer_id", DataType::Bigint)
                        .with_id("C1F1")
                        .primary_key(),
                ),
                "orders" => Table::new("orders")
                    .with_id("O1")
                    .with_field(Field::new("order_id", DataType::Bigint).with_id("O1F1").primary_key())
                    .with_field(Field::new("customer_id", DataType::Bigint).with_id("O1F2")),
                other => return Err(ServiceError::NotFound(format!("table '{}'", other))),
            };
            tables.push(table);
        }
        // the catalog reports customers twice under different casing
        if table_names.iter().any(|n| n == "customers") {
            tables.push(Table::new("CUSTOMERS").with_id("C2").with_field(
                Field::new("customer_id", DataType::Bigint).with_id("C2F1"),
            ));
        }
        Ok(CatalogImport {
            tables,
            relationships: vec![Relationship::new("C1", "C1F1", "O1", "O1F2").with_id("R1")],
        })
    }
}

/// Executor that records statements and fails every constraint
#[derive(Default)]
struct RecordingExecutor {
    executed: RefCell<Vec<usize>>,
}

#[async_trait(?Send)]
impl ExecutionService for RecordingExecutor {
    async fn execute(&self, statements: &[OrderedStatement]) -> ServiceResult<Vec<StatementResult>> {
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            self.executed.borrow_mut().push(statement.sequence);
            if statement.kind == StatementKind::AddConstraint {
                results.push(StatementResult::failed(statement, "constraints disabled"));
            } else {
                results.push(StatementResult::succeeded(statement));
            }
        }
        Ok(results)
    }
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_import_dedupes_and_links() {
    let importer = CatalogImporter::new(FakeCatalog);
    let mut graph = SchemaGraph::empty("shop", "main", "sales");

    let summary = importer
        .import_into(&mut graph, "main", "sales", &names(&["customers", "orders"]))
        .await
        .unwrap();

    assert_eq!(summary.tables_added, vec!["C1", "O1"]);
    assert_eq!(graph.project().tables.len(), 2);
    let fk = graph.project().table("O1").unwrap().field("O1F2").unwrap();
    assert!(fk.references_field("C1", "C1F1"));
    assert_eq!(importer.catalog().list_catalogs().await.unwrap(), vec!["main"]);
}

#[tokio::test]
async fn test_import_collision_keeps_graph() {
    let importer = CatalogImporter::new(FakeCatalog);
    let mut graph = SchemaGraph::empty("shop", "main", "sales");
    graph
        .add_table(TableSpec::new("Orders").with_field(Field::new("id", DataType::Int)))
        .unwrap();
    let before = graph.project().clone();

    let err = importer
        .import_into(&mut graph, "main", "sales", &names(&["customers", "orders"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Schema(SchemaError::DuplicateEntity { .. })
    ));
    assert_eq!(graph.project(), &before);
}

#[tokio::test]
async fn test_catalog_errors_pass_through() {
    let importer = CatalogImporter::new(FakeCatalog);
    let mut graph = SchemaGraph::empty("shop", "main", "sales");
    let err = importer
        .import_into(&mut graph, "main", "sales", &names(&["returns"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert!(graph.project().tables.is_empty());
}

#[tokio::test]
async fn test_compiled_statements_execute_in_sequence() {
    let importer = CatalogImporter::new(FakeCatalog);
    let mut graph = SchemaGraph::empty("shop", "main", "sales");
    importer
        .import_into(&mut graph, "main", "sales", &names(&["orders", "customers"]))
        .await
        .unwrap();

    let statements = DdlCompiler::default().compile(graph.project()).unwrap();
    let executor = RecordingExecutor::default();
    let results = executor.execute(&statements).await.unwrap();

    assert_eq!(*executor.executed.borrow(), vec![1, 2, 3]);
    assert!(results[0].success);
    assert_eq!(statements[0].object_name, "main.sales.customers");
    assert!(!results[2].success);
    assert_eq!(results[2].entity_id, "R1");
    assert_eq!(results[2].message.as_deref(), Some("constraints disabled"));
}

#[tokio::test]
async fn test_repository_normalizes_stored_documents() {
    let persistence = MemoryPersistence::new();
    persistence
        .save(
            "legacy",
            ProjectFormat::Json,
            json!({
                "id": "P1",
                "name": "legacy",
                "catalog_name": "main",
                "schema_name": "sales",
                "tables": [
                    {"name": "orders", "fields": [
                        {"name": "order_id", "data_type": "integer", "is_primary_key": true}
                    ]}
                ]
            }),
            false,
        )
        .await
        .unwrap();

    let repository = ProjectRepository::new(persistence);
    let loaded = repository.load("legacy").await.unwrap();
    let orders = loaded.project.table_by_name("orders").unwrap();
    assert_eq!(orders.fields[0].data_type, DataType::Int);

    let err = repository
        .save(&loaded.project, ProjectFormat::Yaml, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));

    repository
        .save(&loaded.project, ProjectFormat::Yaml, true)
        .await
        .unwrap();
    let stored = repository.persistence().load("legacy").await.unwrap();
    assert_eq!(stored.format, ProjectFormat::Yaml);
    assert_eq!(stored.document["tables"][0]["fields"][0]["data_type"], "INT");
    assert!(matches!(
        repository.load("missing").await,
        Err(ServiceError::NotFound(_))
    ));
}
