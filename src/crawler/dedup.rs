//! Pre-flight duplicate check against the record sink

use crate::storage::{RecordSink, SinkResult};

/// Answers "is this product URL already stored?"
///
/// Every call goes to the sink. Nothing is cached between candidates, so a
/// record saved earlier in the same crawl is seen immediately.
pub struct DedupGuard<'a, S: RecordSink + ?Sized> {
    sink: &'a S,
}

impl<'a, S: RecordSink + ?Sized> DedupGuard<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink }
    }

    pub fn exists(&self, product_url: &str) -> SinkResult<bool> {
        Ok(self.sink.find_by_product_url(product_url)?.is_some())
    }
}
