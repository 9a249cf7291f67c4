use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use igloo_common::{Error, Result};
use igloo_connector::{
    ColumnHandle, ConnectorSession, ConnectorTransactionHandle, PageSource, PageSourceProvider,
    Split, SplitManager, SplitSource, TableHandle,
};
use tracing::debug;

use crate::catalog::MemoryTable;
use crate::{MemoryColumnHandle, MemorySplit, MemoryTableHandle, Shared};

/// Splits a pinned table version into contiguous row ranges.
#[derive(Debug)]
pub struct MemorySplitManager {
    shared: Arc<Shared>,
}

impl MemorySplitManager {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl SplitManager for MemorySplitManager {
    async fn get_splits(
        &self,
        transaction: &ConnectorTransactionHandle,
        _session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<Box<dyn SplitSource>> {
        let state = self.shared.live_transaction(transaction)?;
        let handle: MemoryTableHandle = table.decode(transaction)?;
        let pinned = state
            .snapshot
            .table(&handle.schema, &handle.table)
            .filter(|t| t.version == handle.version)
            .ok_or_else(|| {
                Error::TableNotFound(format!("{}.{}", handle.schema, handle.table))
            })?;

        Ok(Box::new(MemorySplitSource::new(
            transaction.clone(),
            handle,
            pinned.num_rows(),
            self.shared.config.rows_per_split,
        )))
    }
}

/// Produces row-range splits on demand. Ranges are disjoint and cover
/// `[0, total_rows)`; an empty table yields a single empty split.
#[derive(Debug)]
pub struct MemorySplitSource {
    transaction: ConnectorTransactionHandle,
    table: MemoryTableHandle,
    total_rows: usize,
    rows_per_split: usize,
    next_start: usize,
    emitted: usize,
    closed: bool,
}

impl MemorySplitSource {
    fn new(
        transaction: ConnectorTransactionHandle,
        table: MemoryTableHandle,
        total_rows: usize,
        rows_per_split: usize,
    ) -> Self {
        Self {
            transaction,
            table,
            total_rows,
            rows_per_split: rows_per_split.max(1),
            next_start: 0,
            emitted: 0,
            closed: false,
        }
    }

    fn next_split(&mut self) -> Result<Split> {
        let start = self.next_start;
        let end = start
            .saturating_add(self.rows_per_split)
            .min(self.total_rows);
        self.next_start = end;
        self.emitted += 1;
        let split = MemorySplit {
            schema: self.table.schema.clone(),
            table: self.table.table.clone(),
            version: self.table.version,
            start,
            end,
        };
        Split::new(&self.transaction, &split)
    }
}

#[async_trait]
impl SplitSource for MemorySplitSource {
    async fn next_batch(&mut self, max_size: usize) -> Result<Vec<Split>> {
        let mut splits = Vec::new();
        while splits.len() < max_size && !self.is_finished() {
            splits.push(self.next_split()?);
        }
        Ok(splits)
    }

    fn is_finished(&self) -> bool {
        self.closed || (self.emitted > 0 && self.next_start >= self.total_rows)
    }

    fn close(&mut self) {
        if !self.closed {
            debug!(
                table = %self.table.table,
                splits = self.emitted,
                "closed split source"
            );
        }
        self.closed = true;
    }
}

#[derive(Debug)]
pub struct MemoryPageSourceProvider {
    shared: Arc<Shared>,
}

impl MemoryPageSourceProvider {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl PageSourceProvider for MemoryPageSourceProvider {
    async fn create_page_source(
        &self,
        transaction: &ConnectorTransactionHandle,
        _session: &ConnectorSession,
        split: &Split,
        columns: &[ColumnHandle],
    ) -> Result<Box<dyn PageSource>> {
        let state = self.shared.live_transaction(transaction)?;
        let split: MemorySplit = split.decode(transaction)?;
        let table = state
            .snapshot
            .table(&split.schema, &split.table)
            .filter(|t| t.version == split.version && split.end <= t.num_rows())
            .cloned()
            .ok_or_else(|| {
                Error::TableNotFound(format!("{}.{}", split.schema, split.table))
            })?;

        let mut projection = Vec::with_capacity(columns.len());
        for column in columns {
            let column: MemoryColumnHandle = column.decode(transaction)?;
            let ordinal_name = table.metadata.columns.get(column.ordinal).map(|c| &c.name);
            let belongs = column.schema == split.schema
                && column.table == split.table
                && ordinal_name == Some(&column.column);
            if !belongs {
                return Err(Error::UnsupportedColumn(format!(
                    "{}.{}.{} on split of {}.{}",
                    column.schema, column.table, column.column, split.schema, split.table
                )));
            }
            projection.push(column.ordinal);
        }

        Ok(Box::new(MemoryPageSource::new(
            table,
            projection,
            split.start,
            split.end,
            self.shared.config.rows_per_page,
            OpenGuard::new(self.shared.open_page_sources.clone()),
        )))
    }
}

/// Counts a page source as open until it is closed or dropped.
#[derive(Debug)]
struct OpenGuard(Arc<AtomicUsize>);

impl OpenGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Slices one split's row range into pages, one page per pull.
#[derive(Debug)]
pub struct MemoryPageSource {
    table: Option<Arc<MemoryTable>>,
    projection: Vec<usize>,
    position: usize,
    end: usize,
    rows_per_page: usize,
    completed_rows: usize,
    _open: Option<OpenGuard>,
}

impl MemoryPageSource {
    fn new(
        table: Arc<MemoryTable>,
        projection: Vec<usize>,
        start: usize,
        end: usize,
        rows_per_page: usize,
        guard: OpenGuard,
    ) -> Self {
        Self {
            table: Some(table),
            projection,
            position: start,
            end,
            rows_per_page: rows_per_page.max(1),
            completed_rows: 0,
            _open: Some(guard),
        }
    }
}

#[async_trait]
impl PageSource for MemoryPageSource {
    async fn next_page(&mut self) -> Result<Option<RecordBatch>> {
        let Some(table) = &self.table else {
            return Ok(None);
        };
        if self.position >= self.end {
            self.close();
            return Ok(None);
        }
        let len = self.rows_per_page.min(self.end - self.position);
        let page = table
            .data()
            .slice(self.position, len)
            .project(&self.projection)?;
        self.position += len;
        self.completed_rows += len;
        Ok(Some(page))
    }

    fn is_finished(&self) -> bool {
        self.table.is_none()
    }

    fn completed_rows(&self) -> usize {
        self.completed_rows
    }

    fn close(&mut self) {
        if let Some(table) = self.table.take() {
            debug!(
                table = %table.name,
                rows = self.completed_rows,
                "closed page source"
            );
        }
        self._open = None;
    }
}
