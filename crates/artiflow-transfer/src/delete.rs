//! Deleting searched items.

use artiflow_fetch::{Body, Endpoint, HttpClient, Method};
use artiflow_query::{FileSpec, ReduceStrategy, ResultItem, SearchExecutor, SpecKind, reduce};

use crate::error::{Error, Result};
use crate::options::TransferOptions;
use crate::pool::{Handler, Runner, Worker, log_prefix};
use crate::summary::TransferSummary;

pub struct DeleteService<'a, C> {
    endpoint: &'a Endpoint<C>,
    options:  TransferOptions,
}

impl<'a, C: HttpClient> DeleteService<'a, C> {
    pub fn new(endpoint: &'a Endpoint<C>, options: TransferOptions) -> Self { Self { endpoint, options } }

    /// Items `spec` would delete. Pattern specs also match folders and keep
    /// only the outermost of nested results; AQL specs are taken as found.
    pub async fn paths_to_delete(&self, spec: &FileSpec) -> Result<Vec<ResultItem>> {
        tracing::info!("Searching artifacts...");
        let search = SearchExecutor::new(self.endpoint);
        let items = match spec.kind() {
            SpecKind::Aql => search.search(spec).await?,
            _ => reduce(search.search(&spec.clone().include_dirs(true)).await?, ReduceStrategy::TopChain),
        };
        Ok(items)
    }

    pub async fn delete_files(&self, items: Vec<ResultItem>) -> TransferSummary {
        let runner = Runner::new(self.options.threads).fail_fast(self.options.fail_fast);
        let report = runner
            .run(self, async {
                for item in items {
                    runner.queue().push(item)?;
                }
                Ok::<(), Error>(())
            })
            .await;
        let summary = TransferSummary::from(report);
        tracing::info!(deleted = summary.succeeded, failed = summary.failed, "delete finished");
        summary
    }

    /// Searches with `spec` and deletes the results.
    pub async fn delete(&self, spec: &FileSpec) -> Result<TransferSummary> {
        let items = self.paths_to_delete(spec).await?;
        Ok(self.delete_files(items).await)
    }
}

impl<C: HttpClient> Handler for DeleteService<'_, C> {
    type Task = ResultItem;
    type Slot = ();

    async fn handle(&self, item: ResultItem, worker: &mut Worker<'_, ResultItem, ()>) -> Result<()> {
        let prefix = log_prefix(worker.id(), self.options.dry_run);
        let relative = item.relative_path();
        tracing::info!("{prefix}Deleting: {relative}");
        if self.options.dry_run {
            return Ok(());
        }
        let url = self.endpoint.url(&relative)?;
        let response = self
            .endpoint
            .request_expecting(Method::Delete, &url, Body::Empty, &[204])
            .await?;
        tracing::debug!(status = response.status, "{prefix}delete responded");
        Ok(())
    }

    fn is_fatal(&self, error: &Error) -> bool { !error.is_status() }
}
