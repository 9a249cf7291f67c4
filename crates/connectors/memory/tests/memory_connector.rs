use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use igloo_common::{ConnectorId, Error, SchemaTableName, SchemaTablePrefix, TransactionId};
use igloo_connector::{
    drain_splits, into_stream, Connector, ConnectorKind, ConnectorSession,
    ConnectorTransactionHandle, IsolationLevel, Split, TableHandle,
};
use igloo_connector_memory::{MemoryConfig, MemoryConnector, MemorySplit};

fn users_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]))
}

fn users(ids: std::ops::Range<i64>) -> RecordBatch {
    let names: Vec<String> = ids.clone().map(|i| format!("user-{i}")).collect();
    RecordBatch::try_new(
        users_schema(),
        vec![
            Arc::new(Int64Array::from(ids.collect::<Vec<_>>())),
            Arc::new(StringArray::from(names)),
        ],
    )
    .unwrap()
}

fn connector(rows_per_split: usize, rows_per_page: usize) -> MemoryConnector {
    let connector = MemoryConnector::new(
        ConnectorId::new("memory").unwrap(),
        MemoryConfig {
            rows_per_split,
            rows_per_page,
        },
    );
    connector.create_schema("default").unwrap();
    connector.create_schema("sales").unwrap();
    connector
        .create_table("default", "users", users_schema())
        .unwrap();
    connector
        .create_table(
            "sales",
            "orders",
            Arc::new(Schema::new(vec![Field::new(
                "order_id",
                DataType::Int64,
                false,
            )])),
        )
        .unwrap();
    connector
}

fn session() -> ConnectorSession {
    ConnectorSession::new("query-1", "tester")
}

fn begin(connector: &MemoryConnector) -> ConnectorTransactionHandle {
    connector
        .begin_transaction(TransactionId::create(), IsolationLevel::ReadCommitted, true)
        .unwrap()
}

fn users_handle(connector: &MemoryConnector, tx: &ConnectorTransactionHandle) -> TableHandle {
    connector
        .metadata(tx)
        .unwrap()
        .get_table_handle(&session(), &SchemaTableName::new("default", "users"))
        .unwrap()
        .unwrap()
}

async fn splits(
    connector: &MemoryConnector,
    tx: &ConnectorTransactionHandle,
    table: &TableHandle,
    batch_size: usize,
) -> Vec<Split> {
    let mut source = connector
        .split_manager()
        .unwrap()
        .get_splits(tx, &session(), table)
        .await
        .unwrap();
    drain_splits(source.as_mut(), batch_size).await.unwrap()
}

async fn scan_ids(
    connector: &MemoryConnector,
    tx: &ConnectorTransactionHandle,
    table: &TableHandle,
) -> Vec<i64> {
    let metadata = connector.metadata(tx).unwrap();
    let columns = metadata.get_column_handles(&session(), table).unwrap();
    let splits = splits(connector, tx, table, 2).await;

    let provider = connector.page_source_provider().unwrap();
    let mut ids = Vec::new();
    for split in &splits {
        let source = provider
            .create_page_source(tx, &session(), split, &[columns["id"].clone()])
            .await
            .unwrap();
        let pages: Vec<RecordBatch> = into_stream(source).try_collect().await.unwrap();
        for page in pages {
            let column = page
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            ids.extend(column.values().iter().copied());
        }
    }
    ids
}

#[test]
fn test_connector_kind_is_read_only() {
    let connector = connector(10, 10);
    assert_eq!(connector.kind(), ConnectorKind::ReadOnly);
    assert!(connector.capabilities().can_scan());
}

#[tokio::test]
async fn test_splits_cover_every_row_exactly_once() {
    let connector = connector(7, 3);
    connector.append("default", "users", &users(0..50)).unwrap();
    let tx = begin(&connector);
    let table = users_handle(&connector, &tx);

    assert_eq!(splits(&connector, &tx, &table, 3).await.len(), 8);

    let mut ids = scan_ids(&connector, &tx, &table).await;
    assert_eq!(ids.len(), 50);
    ids.sort();
    assert_eq!(ids, (0..50).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_unbounded_split_size_yields_one_split() {
    let connector = connector(usize::MAX, 4);
    connector.append("default", "users", &users(0..10)).unwrap();
    let tx = begin(&connector);
    let table = users_handle(&connector, &tx);

    let splits = splits(&connector, &tx, &table, 10).await;
    assert_eq!(splits.len(), 1);
    let split: MemorySplit = splits[0].decode(&tx).unwrap();
    assert_eq!((split.start, split.end), (0, 10));
    assert_eq!(
        scan_ids(&connector, &tx, &table).await,
        (0..10).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_empty_table_yields_one_empty_split() {
    let connector = connector(7, 3);
    let tx = begin(&connector);
    let table = users_handle(&connector, &tx);

    let splits = splits(&connector, &tx, &table, 10).await;
    assert_eq!(splits.len(), 1);
    let split: MemorySplit = splits[0].decode(&tx).unwrap();
    assert_eq!((split.start, split.end), (0, 0));
    assert!(scan_ids(&connector, &tx, &table).await.is_empty());
}

#[tokio::test]
async fn test_handles_from_one_transaction_fail_in_another() {
    let connector = connector(10, 10);
    let t1 = begin(&connector);
    let t2 = begin(&connector);
    let table = users_handle(&connector, &t1);

    let m2 = connector.metadata(&t2).unwrap();
    assert!(matches!(
        m2.get_table_metadata(&session(), &table).unwrap_err(),
        Error::UnknownTableHandle(_)
    ));
    assert!(matches!(
        m2.get_column_handles(&session(), &table).unwrap_err(),
        Error::UnknownTableHandle(_)
    ));
    let err = connector
        .split_manager()
        .unwrap()
        .get_splits(&t2, &session(), &table)
        .await
        .unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_table_metadata_columns_match_column_handles() {
    let connector = connector(10, 10);
    let tx = begin(&connector);
    let metadata = connector.metadata(&tx).unwrap();
    let table = users_handle(&connector, &tx);

    let table_metadata = metadata.get_table_metadata(&session(), &table).unwrap();
    let handles = metadata.get_column_handles(&session(), &table).unwrap();
    let columns: HashSet<&str> = table_metadata
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    let keys: HashSet<&str> = handles.keys().map(String::as_str).collect();
    assert_eq!(columns, keys);

    let name = metadata
        .get_column_metadata(&session(), &table, &handles["name"])
        .unwrap();
    assert_eq!(name.data_type, DataType::Utf8);
    assert!(name.nullable);
}

#[test]
fn test_list_tables_without_schema_is_union_of_schemas() {
    let connector = connector(10, 10);
    let tx = begin(&connector);
    let metadata = connector.metadata(&tx).unwrap();

    let mut union = Vec::new();
    for schema in metadata.list_schema_names(&session()).unwrap() {
        union.extend(metadata.list_tables(&session(), Some(&schema)).unwrap());
    }
    let all = metadata.list_tables(&session(), None).unwrap();
    assert_eq!(all.len(), union.len());
    assert_eq!(all.iter().collect::<HashSet<_>>().len(), all.len());
    assert_eq!(
        all.into_iter().collect::<HashSet<_>>(),
        union.into_iter().collect::<HashSet<_>>()
    );

    assert!(metadata
        .list_tables(&session(), Some("missing"))
        .unwrap()
        .is_empty());
    assert!(metadata
        .get_table_handle(&session(), &SchemaTableName::unqualified("users"))
        .unwrap()
        .is_none());
}

#[test]
fn test_list_table_columns_honours_prefix() {
    let connector = connector(10, 10);
    let tx = begin(&connector);
    let metadata = connector.metadata(&tx).unwrap();

    let sales = metadata
        .list_table_columns(&session(), &SchemaTablePrefix::schema("sales"))
        .unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(
        sales[&SchemaTableName::new("sales", "orders")][0].name,
        "order_id"
    );

    let all = metadata
        .list_table_columns(&session(), &SchemaTablePrefix::all())
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_column_from_other_table_is_rejected() {
    let connector = connector(10, 10);
    let tx = begin(&connector);
    let metadata = connector.metadata(&tx).unwrap();
    let users = users_handle(&connector, &tx);
    let orders = metadata
        .get_table_handle(&session(), &SchemaTableName::new("sales", "orders"))
        .unwrap()
        .unwrap();
    let handles = metadata.get_column_handles(&session(), &orders).unwrap();
    let order_id = handles["order_id"].clone();

    assert!(matches!(
        metadata
            .get_column_metadata(&session(), &users, &order_id)
            .unwrap_err(),
        Error::UnknownColumnHandle(_)
    ));

    let splits = splits(&connector, &tx, &users, 10).await;
    let err = connector
        .page_source_provider()
        .unwrap()
        .create_page_source(&tx, &session(), &splits[0], &[order_id])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedColumn(_)));
    assert_eq!(connector.open_page_sources(), 0);
}

#[tokio::test]
async fn test_transaction_keeps_its_snapshot_after_append() {
    let connector = connector(10, 4);
    connector.append("default", "users", &users(0..5)).unwrap();
    let t1 = begin(&connector);
    let t1_table = users_handle(&connector, &t1);

    connector.append("default", "users", &users(5..8)).unwrap();
    let t2 = begin(&connector);
    let t2_table = users_handle(&connector, &t2);

    assert_eq!(
        scan_ids(&connector, &t1, &t1_table).await,
        (0..5).collect::<Vec<_>>()
    );
    assert_eq!(
        scan_ids(&connector, &t2, &t2_table).await,
        (0..8).collect::<Vec<_>>()
    );

    connector.drop_table("default", "users").unwrap();
    assert_eq!(scan_ids(&connector, &t1, &t1_table).await.len(), 5);
}

#[tokio::test]
async fn test_handles_are_invalid_after_commit() {
    let connector = connector(10, 10);
    connector.append("default", "users", &users(0..3)).unwrap();
    let tx = begin(&connector);
    let table = users_handle(&connector, &tx);
    let splits = splits(&connector, &tx, &table, 10).await;

    connector.commit(&tx).unwrap();
    assert_eq!(connector.active_transactions(), 0);

    let err = connector
        .split_manager()
        .unwrap()
        .get_splits(&tx, &session(), &table)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TableNotFound(_)));
    let err = connector
        .page_source_provider()
        .unwrap()
        .create_page_source(&tx, &session(), &splits[0], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TableNotFound(_)));
    assert!(matches!(
        connector.metadata(&tx).unwrap_err(),
        Error::UnknownTransaction(_)
    ));
}

#[test]
fn test_metadata_kept_past_commit_stops_working() {
    let connector = connector(10, 10);
    connector.append("default", "users", &users(0..3)).unwrap();
    let tx = begin(&connector);
    let metadata = connector.metadata(&tx).unwrap();
    let table = users_handle(&connector, &tx);
    let name = SchemaTableName::new("default", "users");
    let found = metadata.get_table_handle(&session(), &name).unwrap();
    assert!(found.is_some());

    connector.commit(&tx).unwrap();

    assert!(matches!(
        metadata.get_table_metadata(&session(), &table).unwrap_err(),
        Error::UnknownTransaction(_)
    ));
    assert!(matches!(
        metadata.get_table_handle(&session(), &name).unwrap_err(),
        Error::UnknownTransaction(_)
    ));
    assert!(matches!(
        metadata.list_tables(&session(), None).unwrap_err(),
        Error::UnknownTransaction(_)
    ));
    assert!(matches!(
        metadata.list_schema_names(&session()).unwrap_err(),
        Error::UnknownTransaction(_)
    ));
    assert!(matches!(
        metadata.get_column_handles(&session(), &table).unwrap_err(),
        Error::UnknownTransaction(_)
    ));
}

#[test]
fn test_metadata_kept_past_rollback_stops_working() {
    let connector = connector(10, 10);
    let tx = begin(&connector);
    let metadata = connector.metadata(&tx).unwrap();

    connector.rollback(&tx).unwrap();

    let prefix = SchemaTablePrefix::all();
    let err = metadata
        .list_table_columns(&session(), &prefix)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTransaction(_)));
}

#[tokio::test]
async fn test_abandoned_page_source_releases_resources() {
    let connector = connector(100, 2);
    connector.append("default", "users", &users(0..10)).unwrap();
    let tx = begin(&connector);
    let table = users_handle(&connector, &tx);
    let columns = connector
        .metadata(&tx)
        .unwrap()
        .get_column_handles(&session(), &table)
        .unwrap();
    let splits = splits(&connector, &tx, &table, 10).await;
    let provider = connector.page_source_provider().unwrap();

    let mut closed = provider
        .create_page_source(&tx, &session(), &splits[0], &[columns["name"].clone()])
        .await
        .unwrap();
    let dropped = provider
        .create_page_source(&tx, &session(), &splits[0], &[columns["id"].clone()])
        .await
        .unwrap();
    assert_eq!(connector.open_page_sources(), 2);

    let page = closed.next_page().await.unwrap().unwrap();
    assert_eq!(page.num_rows(), 2);
    assert_eq!(page.schema().field(0).name(), "name");
    closed.close();
    assert!(closed.is_finished());
    assert_eq!(closed.completed_rows(), 2);
    assert!(closed.next_page().await.unwrap().is_none());
    assert_eq!(connector.open_page_sources(), 1);

    drop(dropped);
    assert_eq!(connector.open_page_sources(), 0);
}

#[tokio::test]
async fn test_exhausted_page_source_closes_itself() {
    let connector = connector(100, 4);
    connector.append("default", "users", &users(0..10)).unwrap();
    let tx = begin(&connector);
    let table = users_handle(&connector, &tx);
    let splits = splits(&connector, &tx, &table, 10).await;

    let mut source = connector
        .page_source_provider()
        .unwrap()
        .create_page_source(&tx, &session(), &splits[0], &[])
        .await
        .unwrap();
    let mut sizes = Vec::new();
    while let Some(page) = source.next_page().await.unwrap() {
        sizes.push(page.num_rows());
    }
    assert_eq!(sizes, vec![4, 4, 2]);
    assert!(source.is_finished());
    assert_eq!(connector.open_page_sources(), 0);
}

#[test]
fn test_isolation_level_above_support_is_rejected() {
    let connector = connector(10, 10);
    let err = connector
        .begin_transaction(TransactionId::create(), IsolationLevel::Serializable, false)
        .unwrap_err();
    match err {
        Error::InvalidIsolationLevel {
            connector,
            requested,
            supported,
        } => {
            assert_eq!(connector, "memory");
            assert_eq!(requested, IsolationLevel::Serializable.to_string());
            assert_eq!(supported, IsolationLevel::RepeatableRead.to_string());
        }
        other => panic!("unexpected error: {other}"),
    }
}
