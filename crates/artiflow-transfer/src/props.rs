//! Setting and removing properties on searched items.

use artiflow_fetch::{Endpoint, HttpClient};
use artiflow_query::{CommaMode, Properties, ResultItem, encode_delete_keys};

use crate::deploy::{delete_properties, set_properties};
use crate::error::{Error, Result};
use crate::options::TransferOptions;
use crate::pool::{Handler, Runner, Worker, log_prefix};
use crate::summary::TransferSummary;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Change {
    Set(Properties),
    /// Comma-joined, escaped keys.
    Delete(String),
}

/// Applies one property change to every item it is given. The first failure
/// stops the run; items already queued are dropped.
pub struct PropsService<'a, C> {
    endpoint: &'a Endpoint<C>,
    options:  TransferOptions,
}

impl<'a, C: HttpClient> PropsService<'a, C> {
    pub fn new(endpoint: &'a Endpoint<C>, options: TransferOptions) -> Self { Self { endpoint, options } }

    /// Sets `props` (`k=v[,v2];k2=v`) on `items`.
    pub async fn set_props(&self, items: Vec<ResultItem>, props: &str) -> Result<TransferSummary> {
        tracing::info!("Setting properties...");
        let change = Change::Set(Properties::parse(props, CommaMode::Join)?);
        let summary = self.apply(items, change).await;
        if summary.is_success() {
            tracing::info!("Done setting properties.");
        }
        Ok(summary)
    }

    /// Removes the comma-separated `keys` from `items`.
    pub async fn delete_props(&self, items: Vec<ResultItem>, keys: &str) -> Result<TransferSummary> {
        tracing::info!("Deleting properties...");
        let summary = self.apply(items, Change::Delete(encode_delete_keys(keys))).await;
        if summary.is_success() {
            tracing::info!("Done deleting properties.");
        }
        Ok(summary)
    }

    async fn apply(&self, items: Vec<ResultItem>, change: Change) -> TransferSummary {
        let handler = ChangeHandler {
            endpoint: self.endpoint,
            change,
            dry_run: self.options.dry_run,
        };
        let runner = Runner::new(self.options.threads).fail_fast(true);
        let report = runner
            .run(&handler, async {
                for item in items {
                    runner.queue().push(item)?;
                }
                Ok::<(), Error>(())
            })
            .await;
        TransferSummary::from(report)
    }
}

struct ChangeHandler<'a, C> {
    endpoint: &'a Endpoint<C>,
    change:   Change,
    dry_run:  bool,
}

impl<C: HttpClient> Handler for ChangeHandler<'_, C> {
    type Task = ResultItem;
    type Slot = ();

    async fn handle(&self, item: ResultItem, worker: &mut Worker<'_, ResultItem, ()>) -> Result<()> {
        let prefix = log_prefix(worker.id(), self.dry_run);
        let relative = item.relative_path();
        match &self.change {
            Change::Set(props) => {
                tracing::info!("{prefix}Setting properties on: {relative}");
                if !self.dry_run {
                    set_properties(self.endpoint, &relative, props).await?;
                }
            }
            Change::Delete(keys) => {
                tracing::info!("{prefix}Deleting properties on: {relative}");
                if !self.dry_run {
                    delete_properties(self.endpoint, &relative, keys).await?;
                }
            }
        }
        Ok(())
    }
}
