use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::pattern::{compile, is_wildcard_pattern, path_to_regexp};
use crate::props::{CommaMode, Properties};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// How a [`FileSpec`] is turned into a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecKind {
    /// Pattern with `*`, a trailing `/`, a bare repository, or a build filter.
    Wildcard,
    /// Pattern naming exactly one item.
    Simple,
    /// Raw `items.find` criteria supplied by the user.
    Aql,
}

/// One unit of a transfer command.
///
/// Deserialises from the usual spec-file layout, where booleans may be given
/// either as JSON booleans or as the strings `"true"` / `"false"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    #[serde(default)]
    pub pattern:      String,
    #[serde(default, deserialize_with = "deserialize_aql", skip_serializing_if = "Option::is_none")]
    pub aql:          Option<String>,
    #[serde(default)]
    pub target:       String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props:        Option<String>,
    #[serde(default, alias = "excludePatterns")]
    pub exclusions:   Vec<String>,
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub recursive:    bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub flat:         bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub regexp:       bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_dirs: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub explode:      bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build:        Option<String>,
    #[serde(default)]
    pub sort_by:      Vec<String>,
    #[serde(default)]
    pub sort_order:   SortOrder,
    #[serde(default)]
    pub offset:       u32,
    #[serde(default)]
    pub limit:        u32,
}

impl Default for FileSpec {
    fn default() -> Self {
        Self {
            pattern:      String::new(),
            aql:          None,
            target:       String::new(),
            props:        None,
            exclusions:   Vec::new(),
            recursive:    true,
            flat:         false,
            regexp:       false,
            include_dirs: false,
            explode:      false,
            build:        None,
            sort_by:      Vec::new(),
            sort_order:   SortOrder::Asc,
            offset:       0,
            limit:        0,
        }
    }
}

impl FileSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Spec backed by raw `items.find` criteria.
    pub fn from_aql(criteria: impl Into<String>) -> Self {
        Self {
            aql: Some(criteria.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[must_use]
    pub fn props(mut self, props: impl Into<String>) -> Self {
        self.props = Some(props.into()).filter(|p: &String| !p.is_empty());
        self
    }

    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclusions.push(pattern.into());
        self
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }

    #[must_use]
    pub fn regexp(mut self, regexp: bool) -> Self {
        self.regexp = regexp;
        self
    }

    #[must_use]
    pub fn include_dirs(mut self, include_dirs: bool) -> Self {
        self.include_dirs = include_dirs;
        self
    }

    #[must_use]
    pub fn explode(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }

    #[must_use]
    pub fn build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into()).filter(|b: &String| !b.is_empty());
        self
    }

    #[must_use]
    pub fn sort_by(mut self, fields: impl IntoIterator<Item = impl Into<String>>, order: SortOrder) -> Self {
        self.sort_by = fields.into_iter().map(Into::into).collect();
        self.sort_order = order;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn kind(&self) -> SpecKind {
        if !self.pattern.is_empty() {
            if is_wildcard_pattern(&self.pattern) || self.build.is_some() {
                SpecKind::Wildcard
            } else {
                SpecKind::Simple
            }
        } else {
            SpecKind::Aql
        }
    }

    pub fn has_sort_or_limit(&self) -> bool { !self.sort_by.is_empty() || self.limit > 0 }

    /// Parsed property filter, empty when none was given.
    pub fn properties(&self) -> Result<Properties> {
        match &self.props {
            Some(props) => Properties::parse(props, CommaMode::Join),
            None => Ok(Properties::default()),
        }
    }

    /// Regex the pattern compiles to: the pattern itself with `regexp`,
    /// its wildcard translation otherwise.
    pub fn pattern_regex(&self) -> Result<regex::Regex> {
        if self.regexp {
            compile(&self.pattern)
        } else {
            compile(&path_to_regexp(&self.pattern))
        }
    }

    /// Rejects specs that cannot be searched before anything is sent.
    pub fn validate(&self) -> Result<()> {
        match (self.pattern.trim().is_empty(), self.aql.as_deref().is_some_and(|a| !a.trim().is_empty())) {
            (true, false) => return Err(Error::EmptyPattern),
            (false, true) => return Err(Error::AmbiguousSpec),
            _ => {}
        }
        if !self.pattern.is_empty() {
            self.pattern_regex()?;
        }
        if self.exclusions.iter().any(|e| e.trim().is_empty()) {
            return Err(Error::invalid_pattern("", "exclusion patterns must not be empty"));
        }
        self.properties()?;
        Ok(())
    }
}

/// `{"files": [...]}` document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecFiles {
    pub files: Vec<FileSpec>,
}

impl SpecFiles {
    pub fn from_json(input: &str) -> Result<Self> {
        let specs: Self =
            serde_json::from_str(input).map_err(|e| Error::invalid_pattern("<spec file>", e))?;
        for spec in &specs.files {
            spec.validate()?;
        }
        Ok(specs)
    }
}

fn default_true() -> bool { true }

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("expected true or false, got '{other}'"))),
        },
    }
}

/// Accepts `{"items.find": {...}}` or a criteria string.
fn deserialize_aql<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Object(mut map)) => match map.remove("items.find") {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(criteria) => Some(criteria.to_string()),
            None => Some(serde_json::Value::Object(map).to_string()),
        },
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(FileSpec::new("repo/a/*.jar").kind(), SpecKind::Wildcard);
        assert_eq!(FileSpec::new("repo").kind(), SpecKind::Wildcard);
        assert_eq!(FileSpec::new("repo/dir/").kind(), SpecKind::Wildcard);
        assert_eq!(FileSpec::new("repo/a/b.jar").kind(), SpecKind::Simple);
        assert_eq!(FileSpec::new("repo/a/b.jar").build("b/1").kind(), SpecKind::Wildcard);
        assert_eq!(FileSpec::from_aql(r#"{"repo":"r"}"#).kind(), SpecKind::Aql);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(FileSpec::new("").validate(), Err(Error::EmptyPattern)));
        assert!(matches!(
            FileSpec::from_aql("{}").validate(),
            Ok(())
        ));
        let mut both = FileSpec::new("r/a");
        both.aql = Some("{}".into());
        assert!(matches!(both.validate(), Err(Error::AmbiguousSpec)));
        assert!(matches!(
            FileSpec::new("r/(a").regexp(true).validate(),
            Err(Error::InvalidPattern { .. })
        ));
        assert!(matches!(
            FileSpec::new("r/a").props("novalue").validate(),
            Err(Error::InvalidProperty(_))
        ));
    }

    #[test]
    fn test_spec_file_parsing() {
        let json = r#"{
            "files": [
                {"pattern": "libs/*.jar", "target": "out/", "recursive": "false", "flat": true,
                 "excludePatterns": ["*.md5"], "sortBy": ["created"], "sortOrder": "desc", "limit": 2},
                {"aql": {"items.find": {"repo": "libs"}}, "target": "out2/"}
            ]
        }"#;
        let specs = SpecFiles::from_json(json).unwrap();
        let first = &specs.files[0];
        assert!(!first.recursive);
        assert!(first.flat);
        assert_eq!(first.exclusions, vec!["*.md5"]);
        assert_eq!(first.sort_order, SortOrder::Desc);
        assert!(first.has_sort_or_limit());

        let second = &specs.files[1];
        assert!(second.recursive);
        assert_eq!(second.aql.as_deref(), Some(r#"{"repo":"libs"}"#));
        assert_eq!(second.kind(), SpecKind::Aql);
    }
}
