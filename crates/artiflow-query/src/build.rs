//! Restricting search results to the artifacts of one build.

use std::collections::{HashMap, HashSet};

use artiflow_fetch::{Body, Endpoint, HttpClient, Method};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::item::ResultItem;

pub const LATEST: &str = "LATEST";
pub const LAST_RELEASE: &str = "LAST_RELEASE";

const BUILD_NAME_PROP: &str = "build.name";
const BUILD_NUMBER_PROP: &str = "build.number";

/// Build name and number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildId {
    #[serde(rename = "buildName")]
    pub name:   String,
    #[serde(rename = "buildNumber")]
    pub number: String,
}

impl BuildId {
    /// Parses `name/number`. The last `/` not preceded by `\` splits the two;
    /// without one the whole string is the name and the number is
    /// [`LATEST`]. `\/` is unescaped in both parts.
    ///
    /// ```
    /// use artiflow_query::BuildId;
    ///
    /// assert_eq!(BuildId::parse("app/12").number, "12");
    /// assert_eq!(BuildId::parse("app").number, "LATEST");
    /// assert_eq!(BuildId::parse(r"my\/app/1\/2").name, "my/app");
    /// ```
    pub fn parse(identifier: &str) -> Self {
        let parts: Vec<&str> = identifier.split('/').collect();
        let mut split = None;
        for i in (1..parts.len()).rev() {
            if !parts[i - 1].ends_with('\\') {
                split = Some(i);
                break;
            }
        }

        let (name, number) = match split {
            Some(i) => (parts[..i].join("/"), parts[i..].join("/")),
            None => (identifier.to_string(), LATEST.to_string()),
        };
        Self {
            name:   name.replace("\\/", "/"),
            number: number.replace("\\/", "/"),
        }
    }

    pub fn needs_resolution(&self) -> bool { self.number == LATEST || self.number == LAST_RELEASE }
}

/// Turns `LATEST` / `LAST_RELEASE` into a concrete build number.
pub async fn resolve_build<C: HttpClient>(endpoint: &Endpoint<C>, build: BuildId) -> Result<BuildId> {
    if !build.needs_resolution() {
        return Ok(build);
    }
    let url = endpoint.url("api/build/patternArtifacts")?;
    let body = serde_json::to_string(&[&build]).map_err(|e| artiflow_fetch::Error::Decode(e.to_string()))?;
    tracing::debug!(name = %build.name, number = %build.number, "resolving build number");

    let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    let response = endpoint
        .request(Method::Post, &url, &headers, Body::from(body))
        .await?
        .expect_status(&url, &[200])?;
    let found: Vec<BuildId> = response.json()?;

    match found.into_iter().next() {
        Some(resolved) if !resolved.number.is_empty() => {
            tracing::debug!(number = %resolved.number, "found build number");
            Ok(BuildId {
                name:   build.name,
                number: resolved.number,
            })
        }
        _ => Err(Error::BuildNotFound(format!("{}/{}", build.name, build.number))),
    }
}

fn build_from_props(item: &ResultItem) -> (Option<&str>, Option<&str>) {
    (item.property(BUILD_NAME_PROP), item.property(BUILD_NUMBER_PROP))
}

/// Keeps items whose sha1 the build produced, preferring per sha1 the items
/// stamped with the same build name and number, then the same name, then
/// any. Input order is preserved.
pub fn filter_by_build(items: Vec<ResultItem>, build_sha1s: &HashSet<String>, build: &BuildId) -> Vec<ResultItem> {
    let rank = |item: &ResultItem| -> u8 {
        match build_from_props(item) {
            (Some(name), Some(number)) if name == build.name && number == build.number => 0,
            (Some(name), _) if name == build.name => 1,
            _ => 2,
        }
    };

    let mut best: HashMap<&str, u8> = HashMap::new();
    for item in items.iter().filter(|i| build_sha1s.contains(&i.actual_sha1)) {
        let level = rank(item);
        best.entry(item.actual_sha1.as_str())
            .and_modify(|b| *b = (*b).min(level))
            .or_insert(level);
    }
    let best: HashMap<String, u8> = best.into_iter().map(|(k, v)| (k.to_string(), v)).collect();

    items
        .into_iter()
        .filter(|item| best.get(&item.actual_sha1).is_some_and(|level| *level == rank(item)))
        .collect()
}
