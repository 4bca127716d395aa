use std::collections::{HashMap, HashSet};

use artiflow_fetch::{Body, Endpoint, HttpClient, Method};

use crate::aql::{build_artifacts_query, build_query, props_query, spec_criteria};
use crate::build::{BuildId, filter_by_build, resolve_build};
use crate::error::Result;
use crate::item::{AqlResponse, ResultItem, SYMLINK_DEST};
use crate::pattern::{compile, strip_parentheses, wildcard_to_regexp};
use crate::spec::{FileSpec, SpecKind};

const AQL_PATH: &str = "api/search/aql";

/// Runs spec searches against one server.
pub struct SearchExecutor<'a, C> {
    endpoint: &'a Endpoint<C>,
}

impl<'a, C: HttpClient> SearchExecutor<'a, C> {
    pub fn new(endpoint: &'a Endpoint<C>) -> Self { Self { endpoint } }

    /// Sends a raw query and parses the `results` array.
    pub async fn exec_aql(&self, query: &str) -> Result<Vec<ResultItem>> {
        let url = self.endpoint.url(AQL_PATH)?;
        tracing::debug!(query, "searching with AQL");
        let headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        let response = self
            .endpoint
            .request(Method::Post, &url, &headers, Body::from(query.to_string()))
            .await?
            .expect_status(&url, &[200])?;
        tracing::debug!(status = response.status, "search responded");
        let parsed: AqlResponse = response.json()?;
        Ok(parsed.results)
    }

    /// Every item `spec` matches.
    ///
    /// Pattern specs are translated to AQL; raw specs run verbatim. A build
    /// filter intersects the results with the build's artifacts. When the
    /// spec sorts or limits, properties are not part of the main response
    /// and symlink markers are fetched by a second, narrower query.
    pub async fn search(&self, spec: &FileSpec) -> Result<Vec<ResultItem>> {
        spec.validate()?;
        let criteria = spec_criteria(spec)?;
        let mut items = self.exec_aql(&build_query(&criteria, spec)).await?;

        if spec.kind() != SpecKind::Aql && !spec.regexp {
            let before = items.len();
            items = retain_matching(items, &spec.pattern)?;
            if items.len() != before {
                tracing::debug!(dropped = before - items.len(), "discarded over-matched items");
            }
        }

        if let Some(build) = spec.build.as_deref().filter(|_| !items.is_empty()) {
            items = self.filter_by_build(&criteria, items, BuildId::parse(build)).await?;
        }
        if spec.has_sort_or_limit() && !items.is_empty() {
            self.add_props(&criteria, &mut items, SYMLINK_DEST, "*").await?;
        }
        tracing::info!(count = items.len(), "found {}", plural(items.len()));
        Ok(items)
    }

    /// Copies the properties of items matching `key=value` onto `items`.
    pub async fn add_props(&self, criteria: &str, items: &mut [ResultItem], key: &str, value: &str) -> Result<()> {
        let with_props = self.exec_aql(&props_query(criteria, key, value)).await?;
        merge_properties(items, with_props);
        Ok(())
    }

    async fn filter_by_build(&self, criteria: &str, mut items: Vec<ResultItem>, build: BuildId) -> Result<Vec<ResultItem>> {
        let build = resolve_build(self.endpoint, build).await?;
        let build_query = build_artifacts_query(&build.name, &build.number);
        let props_query = props_query(criteria, "build.name", &build.name);

        let (props, artifacts) = futures_util::join!(self.exec_aql(&props_query), self.exec_aql(&build_query));
        let artifacts = artifacts?;
        merge_properties(&mut items, props?);

        let sha1s: HashSet<String> = artifacts.into_iter().map(|a| a.actual_sha1).collect();
        Ok(filter_by_build(items, &sha1s, &build))
    }
}

fn merge_properties(items: &mut [ResultItem], with_props: Vec<ResultItem>) {
    let mut by_identity: HashMap<String, _> = with_props
        .into_iter()
        .map(|item| (item.identity(), item.properties))
        .collect();
    for item in items {
        if let Some(properties) = by_identity.remove(&item.identity()) {
            item.properties = properties;
        }
    }
}

/// Re-tests each candidate against the wildcard itself; the path/name
/// alternatives sent to the server may match more than the pattern does.
fn retain_matching(items: Vec<ResultItem>, pattern: &str) -> Result<Vec<ResultItem>> {
    let mut normalized = strip_parentheses(pattern);
    if !normalized.contains('/') {
        normalized.push('/');
    }
    let regex = compile(&wildcard_to_regexp(&normalized))?;
    Ok(items
        .into_iter()
        .filter(|item| {
            let path = item.relative_path();
            regex.is_match(&path) || regex.is_match(path.trim_end_matches('/'))
        })
        .collect())
}

fn plural(count: usize) -> &'static str { if count == 1 { "artifact" } else { "artifacts" } }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    fn item(path: &str, name: &str) -> ResultItem {
        ResultItem {
            repo: "r".into(),
            path: path.into(),
            name: name.into(),
            item_type: ItemType::File,
            ..Default::default()
        }
    }

    #[test]
    fn test_retain_matching() {
        let items = vec![item("a", "x.jar"), item("a/b", "y.jar"), item("a", "x.zip"), item(".", "x.jar")];
        let kept = retain_matching(items, "r/a/*.jar").unwrap();
        let names: Vec<String> = kept.iter().map(ResultItem::relative_path).collect();
        assert_eq!(names, vec!["r/a/x.jar", "r/a/b/y.jar"]);

        let everything = retain_matching(vec![item(".", "x"), item("d", "y")], "r").unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn test_retain_matching_keeps_regex_metacharacters_literal() {
        for (name, pattern) in [
            ("lib[1].jar", "r/a/lib[1].jar"),
            ("v{2}.txt", "r/a/v{2}.txt"),
            ("a?b", "r/a/a?b"),
            ("x|y(1)", "r/a/x|y*"),
        ] {
            let kept = retain_matching(vec![item("a", name)], pattern).unwrap();
            assert_eq!(kept.len(), 1, "{pattern} dropped r/a/{name}");
        }

        let kept = retain_matching(vec![item("a", "lib1.jar")], "r/a/lib[1].jar").unwrap();
        assert!(kept.is_empty());
        let kept = retain_matching(vec![item("a", "ab")], "r/a/a?b").unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn test_retain_matching_ignores_capture_groups() {
        let kept = retain_matching(vec![item("a/b", "c.zip")], "r/(*)/(*).zip").unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_merge_properties_by_identity() {
        let mut items = vec![item("a", "x"), item("a", "y")];
        let mut found = item("a", "y");
        found.properties = vec![crate::props::Property::new(SYMLINK_DEST, "t")];
        merge_properties(&mut items, vec![found]);
        assert!(items[0].properties.is_empty());
        assert_eq!(items[1].symlink_target(), Some("t"));
    }
}
