use std::collections::VecDeque;
use std::fmt::Debug;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use igloo_common::Result;

use crate::handle::ColumnHandle;
use crate::session::ConnectorSession;
use crate::split::Split;
use crate::transaction::ConnectorTransactionHandle;

/// A lazy stream of row batches for one split.
///
/// The consumer pulls at its own pace. Stopping early is not an error: the
/// consumer calls `close` (or drops the source) and the source releases
/// whatever it holds.
#[async_trait]
pub trait PageSource: Debug + Send {
    /// Next page, or `None` once the split is exhausted.
    async fn next_page(&mut self) -> Result<Option<RecordBatch>>;

    fn is_finished(&self) -> bool;

    /// Rows handed out so far.
    fn completed_rows(&self) -> usize;

    fn close(&mut self);
}

/// Creates page sources for splits.
///
/// Pages contain exactly the requested columns, in the requested order, and
/// the split's rows in their intrinsic order.
#[async_trait]
pub trait PageSourceProvider: Debug + Send + Sync {
    async fn create_page_source(
        &self,
        transaction: &ConnectorTransactionHandle,
        session: &ConnectorSession,
        split: &Split,
        columns: &[ColumnHandle],
    ) -> Result<Box<dyn PageSource>>;
}

/// Adapts a page source into a stream. The source is closed once it is
/// exhausted or fails; dropping the stream early drops the source.
pub fn into_stream(source: Box<dyn PageSource>) -> BoxStream<'static, Result<RecordBatch>> {
    stream::unfold(Some(source), |state| async move {
        let mut source = state?;
        match source.next_page().await {
            Ok(Some(page)) => Some((Ok(page), Some(source))),
            Ok(None) => {
                source.close();
                None
            }
            Err(e) => {
                source.close();
                Some((Err(e), None))
            }
        }
    })
    .boxed()
}

/// One-shot page source over batches that were computed up front.
#[derive(Debug)]
pub struct MaterializedPageSource {
    pages: VecDeque<RecordBatch>,
    completed_rows: usize,
    closed: bool,
}

impl MaterializedPageSource {
    pub fn new(pages: Vec<RecordBatch>) -> Self {
        Self {
            pages: pages.into(),
            completed_rows: 0,
            closed: false,
        }
    }

    /// Projects every page onto `indices` before handing them out.
    pub fn projected(pages: Vec<RecordBatch>, indices: &[usize]) -> Result<Self> {
        let pages = pages
            .iter()
            .map(|page| page.project(indices))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(pages))
    }
}

#[async_trait]
impl PageSource for MaterializedPageSource {
    async fn next_page(&mut self) -> Result<Option<RecordBatch>> {
        if self.closed {
            return Ok(None);
        }
        let page = self.pages.pop_front();
        match &page {
            Some(page) => self.completed_rows += page.num_rows(),
            None => self.closed = true,
        }
        Ok(page)
    }

    fn is_finished(&self) -> bool {
        self.closed || self.pages.is_empty()
    }

    fn completed_rows(&self) -> usize {
        self.completed_rows
    }

    fn close(&mut self) {
        self.closed = true;
        self.pages.clear();
    }
}
