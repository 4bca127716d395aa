use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use artiflow_fetch::{Credentials, DEFAULT_MIN_SPLIT_SIZE, DEFAULT_SPLIT_COUNT};
use artiflow_transfer::options::{DEFAULT_MIN_CHECKSUM_DEPLOY, DEFAULT_THREADS};
use home::home_dir;
use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";

/// Settings read from `~/.artiflow/config.toml`; every field is optional.
///
/// ```toml
/// default_server = "main"
/// threads = 8
///
/// [[servers]]
/// id = "main"
/// url = "https://repo.example.com/artifactory"
/// access_token = "..."
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub servers:                Vec<ServerConfig>,
    pub default_server:         Option<String>,
    pub threads:                usize,
    pub split_count:            u32,
    pub min_split_size_kb:      u64,
    pub min_checksum_deploy_kb: u64,
    pub retries:                u32,
    pub retry_wait_ms:          u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers:                Vec::new(),
            default_server:         None,
            threads:                DEFAULT_THREADS,
            split_count:            DEFAULT_SPLIT_COUNT,
            min_split_size_kb:      DEFAULT_MIN_SPLIT_SIZE / 1000,
            min_checksum_deploy_kb: DEFAULT_MIN_CHECKSUM_DEPLOY / 1024,
            retries:                3,
            retry_wait_ms:          100,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub id:           String,
    pub url:          String,
    pub user:         Option<String>,
    pub password:     Option<String>,
    pub access_token: Option<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ServerConfig {
    /// A token wins over a user and password.
    pub fn credentials(&self) -> Credentials {
        match (&self.access_token, &self.user, &self.password) {
            (Some(token), _, _) if !token.is_empty() => Credentials::Bearer(token.clone()),
            (_, Some(user), password) if !user.is_empty() => Credentials::Basic {
                user:     user.clone(),
                password: password.clone().unwrap_or_default(),
            },
            _ => Credentials::None,
        }
    }
}

impl Config {
    /// `$ARTIFLOW_HOME/config.toml`, falling back to `~/.artiflow/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("ARTIFLOW_HOME") {
            return Ok(PathBuf::from(root).join(CONFIG_FILE));
        }
        let home = home_dir().context("Failed to get home directory")?;
        Ok(home.join(".artiflow").join(CONFIG_FILE))
    }

    /// Reads `path`, or the default location when `None`. A missing default
    /// file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };
        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid configuration {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        for server in &mut config.servers {
            if server.url.trim().is_empty() {
                bail!("server '{}' has no url", server.id);
            }
            if !server.url.ends_with('/') {
                server.url.push('/');
            }
        }
        if config.threads == 0 {
            bail!("threads must be at least 1");
        }
        Ok(config)
    }

    /// The server named `id`, else the default server, else the only one.
    pub fn server(&self, id: Option<&str>) -> Result<&ServerConfig> {
        let wanted = id.or(self.default_server.as_deref());
        match wanted {
            Some(wanted) => self
                .servers
                .iter()
                .find(|server| server.id == wanted)
                .with_context(|| format!("No server with id '{wanted}' is configured")),
            None => match self.servers.as_slice() {
                [only] => Ok(only),
                [] => bail!("No server is configured"),
                _ => bail!("Several servers are configured; pick one with --server-id"),
            },
        }
    }

    pub fn min_split_size(&self) -> Option<u64> { Some(self.min_split_size_kb * 1000) }

    pub fn min_checksum_deploy(&self) -> u64 { self.min_checksum_deploy_kb * 1024 }

    pub fn retry_wait(&self) -> Duration { Duration::from_millis(self.retry_wait_ms) }
}
