//! File specs and their translation into repository searches.
//!
//! A [`FileSpec`] names remote items with a wildcard (`repo/dir/*.jar`), a
//! regular expression, or raw AQL criteria. [`translate`] turns it into an
//! `items.find(...)` query, [`SearchExecutor`] runs it, and [`reduce`] trims
//! results that are implied by their parents or children.
//!
//! ```
//! use artiflow_query::{FileSpec, translate};
//!
//! let query = translate(&FileSpec::new("libs-release/org/*.pom").recursive(false)).unwrap();
//! assert!(query.starts_with(r#"items.find({"repo": "libs-release","path": {"$ne": "."},"#));
//! ```

mod aql;
mod build;
mod error;
mod item;
mod pattern;
mod props;
mod reduce;
mod search;
mod spec;

pub use aql::{
    build_artifacts_query, build_query, criteria_for_spec, directory_query, props_query, return_fields,
    spec_criteria, translate,
};
pub use build::{BuildId, LAST_RELEASE, LATEST, filter_by_build, resolve_build};
pub use error::{Error, Result};
pub use item::{AqlResponse, ItemType, ResultItem, SYMLINK_DEST, SYMLINK_SHA1};
pub use pattern::{
    PathFilePair, compile, file_and_dir, is_wildcard_pattern, join_clean, local_path_and_file, path_file_pairs,
    path_folder_pairs, path_to_regexp, prepare_local_path_for_upload, prepare_search_pattern, reformat_target,
    root_path, split_with_escape, substitute_groups, trim_path, wildcard_to_regexp,
};
pub use props::{CommaMode, Properties, Property, encode_delete_keys};
pub use reduce::{ReduceStrategy, reduce};
pub use search::SearchExecutor;
pub use spec::{FileSpec, SortOrder, SpecFiles, SpecKind};
