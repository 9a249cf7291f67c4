use std::sync::Arc;

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use igloo_common::{ConnectorId, Error, SchemaTableName, TransactionId};
use igloo_connector::{
    drain_splits, into_stream, ColumnHandle, Connector, ConnectorSession,
    ConnectorTransactionHandle, IsolationLevel, Split, TableHandle,
};
use igloo_coordinator::{Coordinator, CoordinatorError, EncodedHandle, Settings};

fn settings(expose_system_tables: bool) -> Settings {
    Settings::from_toml_str(&format!(
        "node_id = \"c1\"\n\
         expose_system_tables = {expose_system_tables}\n\
         [memory]\n\
         rows_per_split = 2\n\
         rows_per_page = 1\n"
    ))
    .unwrap()
}

fn session() -> ConnectorSession {
    ConnectorSession::new("query-1", "tester")
}

/// Scans every split of `name` in `connector_id`, sending splits and column
/// handles through their encoded form as a worker would receive them.
async fn scan(
    coordinator: &Coordinator,
    tx: TransactionId,
    connector_id: &ConnectorId,
    name: &SchemaTableName,
    columns: &[&str],
) -> Vec<RecordBatch> {
    let connectors = coordinator.connectors();
    let connector = connectors.get(connector_id).unwrap();
    let handle: ConnectorTransactionHandle = coordinator
        .transactions()
        .connector_transaction(tx, connector_id)
        .unwrap();
    let metadata = coordinator
        .transactions()
        .metadata(tx, connector_id)
        .unwrap();
    let table: TableHandle = metadata
        .get_table_handle(&session(), name)
        .unwrap()
        .unwrap();
    let handles = metadata.get_column_handles(&session(), &table).unwrap();

    let mut source = connector
        .split_manager()
        .unwrap()
        .get_splits(&handle, &session(), &table)
        .await
        .unwrap();
    let splits = drain_splits(source.as_mut(), 16).await.unwrap();

    let provider = connector.page_source_provider().unwrap();
    let mut pages = Vec::new();
    for split in splits {
        let wire: Vec<EncodedHandle> = columns
            .iter()
            .map(|c| connectors.resolvers().encode(&handles[*c]).unwrap())
            .collect();
        let projection: Vec<ColumnHandle> = wire
            .iter()
            .map(|e| connectors.resolvers().decode::<ColumnHandle>(e).unwrap())
            .collect();
        let split: Split = connectors
            .resolvers()
            .decode(&connectors.resolvers().encode(&split).unwrap())
            .unwrap();

        let source = provider
            .create_page_source(&handle, &session(), &split, &projection)
            .await
            .unwrap();
        let batches: Vec<RecordBatch> = into_stream(source).try_collect().await.unwrap();
        pages.extend(batches);
    }
    pages
}

#[test]
fn test_bootstrap_registers_system_and_memory() {
    let coordinator = Coordinator::bootstrap(&settings(false)).unwrap();
    let ids: Vec<String> = coordinator
        .connectors()
        .connector_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, vec!["memory".to_string(), "system".to_string()]);

    let tables = coordinator.system_tables();
    let names: Vec<String> = tables.iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, vec!["catalogs".to_string(), "nodes".to_string()]);

    let catalogs = tables[0].records(&session()).unwrap();
    assert_eq!(catalogs.num_rows(), 2);
    let nodes = tables[1].records(&session()).unwrap();
    let node_ids = nodes
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(node_ids.value(0), "c1");
}

#[test]
fn test_bootstrap_rejects_clashing_connector_ids() {
    let settings = Settings::from_toml_str("system_connector_id = \"memory\"").unwrap();
    assert!(Coordinator::bootstrap(&settings).is_err());
}

#[tokio::test]
async fn test_one_transaction_spans_memory_and_exposed_system_tables() {
    let coordinator = Coordinator::bootstrap(&settings(true)).unwrap();
    let memory = coordinator.memory();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("node_id", DataType::Utf8, false),
    ]));
    memory.create_schema("default").unwrap();
    memory
        .create_table("default", "events", schema.clone())
        .unwrap();
    memory
        .append(
            "default",
            "events",
            &RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(Int64Array::from(vec![1, 2, 3])),
                    Arc::new(StringArray::from(vec!["c1", "c1", "c1"])),
                ],
            )
            .unwrap(),
        )
        .unwrap();

    let tx = coordinator
        .transactions()
        .begin(IsolationLevel::ReadCommitted, true);
    let memory_id = memory.connector_id().clone();
    let system_id = coordinator.system().connector_id().clone();

    let events_name = SchemaTableName::new("default", "events");
    let columns = ["node_id", "id"];
    let events = scan(&coordinator, tx, &memory_id, &events_name, &columns).await;
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|p| p.num_rows() == 1 && p.schema().field(0).name() == "node_id"));

    let nodes_name = SchemaTableName::unqualified("nodes");
    let nodes = scan(&coordinator, tx, &system_id, &nodes_name, &["node_id"]).await;
    assert_eq!(nodes.len(), 1);
    let scanned = nodes[0]
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(scanned.value(0), "c1");

    assert_eq!(memory.active_transactions(), 1);
    coordinator.transactions().commit(tx).unwrap();
    assert_eq!(memory.active_transactions(), 0);
    assert!(coordinator.transactions().active_transactions().is_empty());
}

#[tokio::test]
async fn test_encoded_handle_from_other_connector_is_rejected() {
    let coordinator = Coordinator::bootstrap(&settings(true)).unwrap();
    let tx = coordinator
        .transactions()
        .begin(IsolationLevel::ReadCommitted, true);
    let system_id = coordinator.system().connector_id().clone();
    let metadata = coordinator
        .transactions()
        .metadata(tx, &system_id)
        .unwrap();
    let table = metadata
        .get_table_handle(&session(), &SchemaTableName::unqualified("nodes"))
        .unwrap()
        .unwrap();

    let mut encoded = coordinator
        .connectors()
        .resolvers()
        .encode(&table)
        .unwrap();
    let memory_tx = coordinator
        .transactions()
        .connector_transaction(tx, coordinator.memory().connector_id())
        .unwrap();
    encoded.transaction = memory_tx;
    assert!(coordinator
        .connectors()
        .resolvers()
        .decode::<TableHandle>(&encoded)
        .is_err());

    coordinator.transactions().rollback(tx).unwrap();
}

#[test]
fn test_transactions_begin_at_configured_isolation_level() {
    let settings = Settings::from_toml_str("default_isolation_level = \"SERIALIZABLE\"").unwrap();
    let coordinator = Coordinator::bootstrap(&settings).unwrap();
    assert_eq!(
        coordinator.transactions().default_isolation_level(),
        IsolationLevel::Serializable
    );
    let memory_id = coordinator.memory().connector_id().clone();

    let tx = coordinator.begin_transaction(false);
    let err = coordinator
        .transactions()
        .connector_transaction(tx, &memory_id)
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Connector(Error::InvalidIsolationLevel { .. })
    ));
    coordinator.transactions().rollback(tx).unwrap();

    let tx = coordinator.begin_transaction(true);
    coordinator
        .transactions()
        .connector_transaction(tx, &memory_id)
        .unwrap();
    assert_eq!(coordinator.memory().active_transactions(), 1);
    coordinator.transactions().commit(tx).unwrap();
    assert_eq!(coordinator.memory().active_transactions(), 0);
}
