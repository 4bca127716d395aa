use std::path::PathBuf;

use anyhow::{Context, Result};
use artiflow_query::{FileSpec, SortOrder, SpecFiles};
use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "artiflow", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Configuration file [default: ~/.artiflow/config.toml]
    #[arg(long, global = true)]
    pub config:    Option<PathBuf>,
    /// Server to talk to, by its id in the configuration
    #[arg(long, global = true)]
    pub server_id: Option<String>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose:   bool,
    #[command(subcommand)]
    pub cmd:       Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "s", name = "search", about = "List remote items matching a pattern")]
    Search(SearchArg),
    #[command(alias = "u", name = "upload", about = "Deploy local files")]
    Upload(UploadArg),
    #[command(alias = "dl", name = "download", about = "Fetch remote items")]
    Download(DownloadArg),
    #[command(alias = "mv", name = "move", allow_missing_positional = true, about = "Move items within the server")]
    Move(MoveArg),
    #[command(alias = "cp", name = "copy", allow_missing_positional = true, about = "Copy items within the server")]
    Copy(MoveArg),
    #[command(alias = "del", name = "delete", about = "Delete remote items")]
    Delete(DeleteArg),
    #[command(alias = "sp", name = "set-props", allow_missing_positional = true, about = "Set properties on remote items")]
    SetProps(PropsArg),
    #[command(alias = "delp", name = "delete-props", allow_missing_positional = true, about = "Delete properties from remote items")]
    DeleteProps(PropsArg),
    #[command(name = "sync", about = "Copy a repository to another server")]
    Sync(SyncArg),
}

/// Which items a command acts on, given inline or as a JSON spec file.
#[derive(Args, Clone, Debug)]
pub struct SpecArg {
    /// Pattern such as `libs-release/org/*.jar`, or a local path for uploads
    #[arg(required_unless_present_any = ["spec", "aql"])]
    pub pattern:    Option<String>,
    /// JSON file of the form {"files": [...]}
    #[arg(long, conflicts_with_all = ["pattern", "aql"])]
    pub spec:       Option<PathBuf>,
    /// Raw `items.find` criteria
    #[arg(long, conflicts_with = "pattern")]
    pub aql:        Option<String>,
    /// Only items carrying these properties, e.g. `env=prod;team=core`
    #[arg(long)]
    pub props:      Option<String>,
    /// Patterns to leave out, separated by `;`
    #[arg(long, value_delimiter = ';')]
    pub exclusions: Vec<String>,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub recursive:  bool,
    /// Treat the pattern as a regular expression
    #[arg(long)]
    pub regexp:     bool,
    /// Only artifacts of a build, as `name[/number]`
    #[arg(long)]
    pub build:      Option<String>,
    /// Fields to sort by, separated by `;`
    #[arg(long, value_delimiter = ';')]
    pub sort_by:    Vec<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(["asc", "desc"]), default_value = "asc")]
    pub sort_order: String,
    #[arg(long, default_value_t = 0)]
    pub offset:     u32,
    #[arg(long, default_value_t = 0)]
    pub limit:      u32,
}

impl SpecArg {
    /// The specs to run. `customize` applies command flags to an inline
    /// pattern or AQL spec; a spec file is taken as written.
    pub fn specs(&self, customize: impl Fn(FileSpec) -> FileSpec) -> Result<Vec<FileSpec>> {
        if let Some(path) = &self.spec {
            let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let specs = SpecFiles::from_json(&text).with_context(|| format!("Invalid spec file {}", path.display()))?;
            return Ok(specs.files);
        }

        let mut spec = match &self.aql {
            Some(criteria) => FileSpec::from_aql(criteria.as_str()),
            None => FileSpec::new(self.pattern.clone().unwrap_or_default()),
        };
        spec = spec.recursive(self.recursive).regexp(self.regexp).offset(self.offset).limit(self.limit);
        if let Some(props) = &self.props {
            spec = spec.props(props.as_str());
        }
        if let Some(build) = &self.build {
            spec = spec.build(build.as_str());
        }
        for exclusion in &self.exclusions {
            spec = spec.exclude(exclusion.as_str());
        }
        if !self.sort_by.is_empty() {
            let order = if self.sort_order == "desc" { SortOrder::Desc } else { SortOrder::Asc };
            spec = spec.sort_by(self.sort_by.iter().cloned(), order);
        }
        let spec = customize(spec);
        spec.validate()?;
        Ok(vec![spec])
    }
}

/// Knobs shared by the batch commands.
#[derive(Args, Clone, Debug)]
pub struct TransferArg {
    /// Log what would happen without changing anything
    #[arg(long)]
    pub dry_run:   bool,
    /// Worker count [default: from the configuration]
    #[arg(long)]
    pub threads:   Option<usize>,
    /// Stop scheduling after the first failure
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args, Clone, Debug)]
pub struct SearchArg {
    #[command(flatten)]
    pub spec:         SpecArg,
    /// Include folders in the results
    #[arg(long)]
    pub include_dirs: bool,
    /// Print only the number of matches
    #[arg(long)]
    pub count:        bool,
}

#[derive(Args, Clone, Debug)]
pub struct UploadArg {
    #[command(flatten)]
    pub spec:         SpecArg,
    /// Target path in the repository, e.g. `libs-release/org/`
    pub target:       Option<String>,
    #[command(flatten)]
    pub transfer:     TransferArg,
    /// Drop the local directory layout
    #[arg(long)]
    pub flat:         bool,
    /// Upload empty directories too
    #[arg(long)]
    pub include_dirs: bool,
    /// Ask the server to extract uploaded archives
    #[arg(long)]
    pub explode:      bool,
    /// Upload symlinks as links instead of following them
    #[arg(long)]
    pub symlinks:     bool,
}

#[derive(Args, Clone, Debug)]
pub struct DownloadArg {
    #[command(flatten)]
    pub spec:              SpecArg,
    /// Local directory or path template
    pub target:            Option<String>,
    #[command(flatten)]
    pub transfer:          TransferArg,
    /// Drop the remote directory layout
    #[arg(long)]
    pub flat:              bool,
    /// Recreate empty folders too
    #[arg(long)]
    pub include_dirs:      bool,
    /// Extract downloaded archives
    #[arg(long)]
    pub explode:           bool,
    /// Recreate symlinks recorded on upload
    #[arg(long)]
    pub symlinks:          bool,
    /// Check the content a recreated symlink points at
    #[arg(long, requires = "symlinks")]
    pub validate_symlinks: bool,
    /// Parallel ranges per file [default: from the configuration]
    #[arg(long)]
    pub split_count:       Option<u32>,
    /// Smallest file worth splitting, in KB [default: from the configuration]
    #[arg(long)]
    pub min_split:         Option<u64>,
}

#[derive(Args, Clone, Debug)]
pub struct MoveArg {
    #[command(flatten)]
    pub spec:    SpecArg,
    /// Destination, e.g. `libs-staging/org/`
    pub target:  String,
    /// Drop the source directory layout
    #[arg(long)]
    pub flat:    bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DeleteArg {
    #[command(flatten)]
    pub spec:     SpecArg,
    #[command(flatten)]
    pub transfer: TransferArg,
}

#[derive(Args, Clone, Debug)]
pub struct PropsArg {
    #[command(flatten)]
    pub spec:         SpecArg,
    /// `key=value;...` for set-props, `key,...` for delete-props
    #[arg(value_name = "PROPERTIES")]
    pub properties:   String,
    #[arg(long)]
    pub include_dirs: bool,
    #[command(flatten)]
    pub transfer:     TransferArg,
}

#[derive(Args, Clone, Debug)]
pub struct SyncArg {
    /// Repository to copy; it must exist on both servers
    pub repo:                String,
    /// Destination server id
    #[arg(long)]
    pub target_server:       String,
    /// Worker count [default: 16]
    #[arg(long)]
    pub threads:             Option<usize>,
    /// Smallest file to try a checksum deploy for, in KB [default: 1]
    #[arg(long)]
    pub min_checksum_deploy: Option<u64>,
}

#[cfg(test)]
mod tests {
    use artiflow_query::SpecKind;
    use clap::CommandFactory;

    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_command_definition() { App::command().debug_assert(); }

    #[test]
    fn test_upload_flags() -> TestResult {
        let app = App::try_parse_from([
            "artiflow", "upload", "build/*.jar", "libs-release/org/", "--flat", "--threads", "8", "--dry-run",
        ])?;
        let Commands::Upload(arg) = app.cmd else { panic!("expected upload") };
        assert_eq!(arg.target.as_deref(), Some("libs-release/org/"));
        assert!(arg.flat);
        assert_eq!(arg.transfer.threads, Some(8));
        assert!(arg.transfer.dry_run);

        let specs = arg.spec.specs(|spec| spec.target("libs-release/org/"))?;
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].pattern, "build/*.jar");
        assert_eq!(specs[0].target, "libs-release/org/");
        assert!(specs[0].recursive);
        Ok(())
    }

    #[test]
    fn test_search_spec_from_flags() -> TestResult {
        let app = App::try_parse_from([
            "artiflow", "search", "libs/*.pom", "--recursive", "false", "--exclusions", "*.md5;*.sha1",
            "--sort-by", "name", "--sort-order", "desc", "--limit", "5",
        ])?;
        let Commands::Search(arg) = app.cmd else { panic!("expected search") };
        let spec = arg.spec.specs(|spec| spec)?.remove(0);
        assert!(!spec.recursive);
        assert_eq!(spec.exclusions, vec!["*.md5", "*.sha1"]);
        assert_eq!(spec.sort_by, vec!["name"]);
        assert_eq!(spec.sort_order, SortOrder::Desc);
        assert_eq!(spec.limit, 5);
        Ok(())
    }

    #[test]
    fn test_aql_spec() -> TestResult {
        let app = App::try_parse_from(["artiflow", "delete", "--aql", r#"{"repo":"libs"}"#])?;
        let Commands::Delete(arg) = app.cmd else { panic!("expected delete") };
        let spec = arg.spec.specs(|spec| spec)?.remove(0);
        assert_eq!(spec.kind(), SpecKind::Aql);
        Ok(())
    }

    #[test]
    fn test_spec_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("spec.json");
        std::fs::write(&path, r#"{"files":[{"pattern":"libs/a/*","target":"out/"},{"pattern":"libs/b/*"}]}"#)?;

        let app = App::try_parse_from(["artiflow", "download", "--spec", path.to_str().unwrap_or_default()])?;
        let Commands::Download(arg) = app.cmd else { panic!("expected download") };
        let specs = arg.spec.specs(|spec| spec.flat(true))?;
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].target, "out/");
        assert!(!specs[0].flat);
        Ok(())
    }

    #[test]
    fn test_pattern_or_spec_is_required() {
        assert!(App::try_parse_from(["artiflow", "delete"]).is_err());
        assert!(App::try_parse_from(["artiflow", "set-props", "libs/*"]).is_err());
    }

    #[test]
    fn test_empty_pattern_is_rejected() -> TestResult {
        let app = App::try_parse_from(["artiflow", "search", " "])?;
        let Commands::Search(arg) = app.cmd else { panic!("expected search") };
        assert!(arg.spec.specs(|spec| spec).is_err());
        Ok(())
    }
}
