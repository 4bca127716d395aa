//! Server-side move and copy of searched items.

use artiflow_fetch::{Body, Endpoint, HttpClient, Method};
use artiflow_query::{
    FileSpec, ReduceStrategy, ResultItem, SearchExecutor, SpecKind, file_and_dir, reduce, substitute_groups, trim_path,
};
use regex::Regex;

use crate::error::{Error, Result};
use crate::summary::TransferSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveType {
    Move,
    Copy,
}

impl MoveType {
    fn api(self) -> &'static str {
        match self {
            Self::Move => "api/move",
            Self::Copy => "api/copy",
        }
    }

    fn moving(self) -> &'static str {
        match self {
            Self::Move => "Moving",
            Self::Copy => "Copying",
        }
    }

    pub fn moved(self) -> &'static str {
        match self {
            Self::Move => "Moved",
            Self::Copy => "Copied",
        }
    }
}

/// Where `item` goes when moved to `target`.
///
/// Unless `flat`, the item's path is inserted between the target's directory
/// and file parts. `{i}` placeholders take the capture groups of `regex`;
/// a destination ending in `/` receives the item's name when it is a file.
///
/// ```
/// use artiflow_query::ResultItem;
/// use artiflow_transfer::move_destination;
///
/// let item = ResultItem { repo: "libs".into(), path: "a/b".into(), name: "x.jar".into(), ..Default::default() };
/// assert_eq!(move_destination(&item, "dest/", false, None), "dest/a/b/x.jar");
/// assert_eq!(move_destination(&item, "dest/", true, None), "dest/x.jar");
/// ```
pub fn move_destination(item: &ResultItem, target: &str, flat: bool, regex: Option<&Regex>) -> String {
    let mut dest = if flat {
        target.to_string()
    } else if target.contains('/') {
        let (file, dir) = file_and_dir(target);
        trim_path(&format!("{dir}/{}/{file}", item.path))
    } else {
        trim_path(&format!("{target}/{}/", item.path))
    };
    if let Some(regex) = regex {
        dest = substitute_groups(regex, &item.relative_path(), &dest);
    }
    if dest.ends_with('/') && !item.is_folder() {
        dest.push_str(&item.name);
    }
    dest
}

/// Moves or copies everything a spec matches, one request at a time.
pub struct MoveCopyService<'a, C> {
    endpoint:  &'a Endpoint<C>,
    move_type: MoveType,
    dry_run:   bool,
}

impl<'a, C: HttpClient> MoveCopyService<'a, C> {
    pub fn new(endpoint: &'a Endpoint<C>, move_type: MoveType) -> Self {
        Self {
            endpoint,
            move_type,
            dry_run: false,
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Counts are returned even when some items failed; the summary's error
    /// then reports how many.
    pub async fn move_files(&self, spec: &FileSpec) -> Result<TransferSummary> {
        tracing::info!("Searching artifacts...");
        let search = SearchExecutor::new(self.endpoint);
        let (items, regex) = match spec.kind() {
            SpecKind::Aql => (search.search(spec).await?, None),
            _ => {
                let spec = spec.clone().include_dirs(true);
                (search.search(&spec).await?, Some(spec.pattern_regex()?))
            }
        };
        let strategy = if spec.flat { ReduceStrategy::BottomChain } else { ReduceStrategy::TopChain };
        let items = reduce(items, strategy);
        tracing::info!(count = items.len(), "reduced search results");

        let mut summary = TransferSummary::default();
        for item in &items {
            let dest = move_destination(item, &spec.target, spec.flat, regex.as_ref());
            if item.is_folder() && dest.ends_with('/') {
                self.create_path(&dest).await;
            }
            match self.move_file(&item.relative_path(), &dest).await {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    tracing::error!("{e}");
                    summary.failed += 1;
                }
            }
        }

        tracing::debug!("{} {} artifacts.", self.move_type.moved(), summary.succeeded);
        if summary.failed > 0 {
            summary.error = Some(Error::Failed {
                operation: match self.move_type {
                    MoveType::Move => "moving",
                    MoveType::Copy => "copying",
                },
                count:     summary.failed,
            });
        }
        Ok(summary)
    }

    async fn move_file(&self, source: &str, dest: &str) -> Result<bool> {
        let message = format!("{} artifact: {source} to: {dest}", self.move_type.moving());
        let mut query = vec![("to", dest)];
        if self.dry_run {
            tracing::info!("[Dry run] {message}");
            query.push(("dry", "1"));
        } else {
            tracing::info!("{message}");
        }

        let url = self
            .endpoint
            .url_with_query(&format!("{}/{source}", self.move_type.api()), &query)?;
        let response = self.endpoint.request(Method::Post, &url, &[], Body::Empty).await?;
        tracing::debug!(status = response.status, "move responded");
        if response.status != 200 {
            tracing::error!(status = response.status, "{}", response.text());
        }
        Ok(response.status == 200)
    }

    /// Creating the destination folder is best effort; the move itself
    /// reports whether it worked.
    async fn create_path(&self, dest: &str) {
        if self.dry_run {
            tracing::info!("[Dry run] Create path: {dest}");
            return;
        }
        let created = match self.endpoint.url(dest) {
            Ok(url) => self.endpoint.request(Method::Put, &url, &[], Body::Empty).await,
            Err(e) => Err(e),
        };
        match created {
            Ok(response) if response.status == 201 => {}
            Ok(response) => tracing::error!(status = response.status, "{}", response.text()),
            Err(e) => tracing::error!("{e}"),
        }
    }
}
