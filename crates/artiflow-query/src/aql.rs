//! Translation of file specs into `items.find(...)` queries.

use crate::error::Result;
use crate::pattern::{PathFilePair, path_file_pairs, prepare_search_pattern};
use crate::spec::FileSpec;

const DEFAULT_FIELDS: [&str; 7] = ["name", "repo", "path", "actual_md5", "actual_sha1", "size", "type"];

/// Fields returned by a directory listing.
const LISTING_FIELDS: [&str; 15] = [
    "repo",
    "path",
    "name",
    "created",
    "modified",
    "updated",
    "created_by",
    "modified_by",
    "type",
    "actual_md5",
    "actual_sha1",
    "sha256",
    "size",
    "property",
    "stat",
];

/// Criteria object for a pattern spec, i.e. the argument of `items.find`.
///
/// ```
/// use artiflow_query::{FileSpec, criteria_for_spec};
///
/// let criteria = criteria_for_spec(&FileSpec::new("repo/a.zip").recursive(false)).unwrap();
/// assert_eq!(
///     criteria,
///     r#"{"repo": "repo","$or": [{"$and":[{"path": {"$match": "."},"name": {"$match": "a.zip"}}]}]}"#
/// );
/// ```
pub fn criteria_for_spec(spec: &FileSpec) -> Result<String> {
    let search = prepare_search_pattern(&spec.pattern, true);
    let (repo, rest) = search.split_once('/').unwrap_or((search.as_str(), ""));

    let pairs = path_file_pairs(rest, spec.recursive);
    let include_root = !rest.contains('/');

    let mut json = format!(r#"{{"repo": "{repo}","#);
    for property in spec.properties()?.iter() {
        json.push_str(&key_value_part(&property.key, &property.value));
        json.push(',');
    }
    if spec.include_dirs {
        json.push_str(r#""type": {"$eq": "any"},"#);
    }
    if !pairs.is_empty() && !include_root {
        json.push_str(r#""path": {"$ne": "."},"#);
    }
    json.push_str(&exclude_part(&spec.exclusions, pairs.is_empty() || spec.recursive, spec.recursive));

    json.push_str(r#""$or": ["#);
    let inner: Vec<String> = if pairs.is_empty() {
        vec![inner_part(".", rest)]
    } else {
        pairs.iter().map(|p| inner_part(&p.path, &p.file)).collect()
    };
    json.push_str(&inner.join(","));
    json.push_str("]}");
    Ok(json)
}

fn key_value_part(key: &str, value: &str) -> String { format!(r#""@{key}": {{"$match" : "{value}"}}"#) }

fn inner_part(path: &str, name: &str) -> String {
    format!(r#"{{"$and":[{{"path": {{"$match": "{path}"}},"name": {{"$match": "{name}"}}}}]}}"#)
}

fn exclude_part(exclusions: &[String], use_local_path: bool, recursive: bool) -> String {
    let pairs: Vec<PathFilePair> = exclusions
        .iter()
        .flat_map(|pattern| path_file_pairs(&prepare_search_pattern(pattern, false), recursive))
        .collect();

    pairs
        .into_iter()
        .map(|pair| {
            let path = if !use_local_path && pair.path == "." { "*" } else { pair.path.as_str() };
            format!(
                r#""$or": [{{"path": {{"$nmatch": "{path}"}}, "name": {{"$nmatch": "{}"}}}}],"#,
                pair.file
            )
        })
        .collect()
}

fn include_part(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| format!(r#""{f}""#)).collect();
    format!(".include({})", quoted.join(","))
}

/// Fields a spec search returns: the defaults plus `property`, or the
/// sort fields instead when the spec sorts or limits.
pub fn return_fields(spec: &FileSpec) -> Vec<&str> {
    let mut fields: Vec<&str> = DEFAULT_FIELDS.to_vec();
    if spec.has_sort_or_limit() {
        for field in &spec.sort_by {
            if !fields.contains(&field.as_str()) {
                fields.push(field.as_str());
            }
        }
    } else {
        fields.push("property");
    }
    fields
}

/// Full query for `criteria`, with the spec's include, sort, offset and limit.
pub fn build_query(criteria: &str, spec: &FileSpec) -> String {
    let mut query = format!("items.find({criteria}){}", include_part(&return_fields(spec)));
    if !spec.sort_by.is_empty() {
        let fields: Vec<String> = spec.sort_by.iter().map(|f| format!(r#""{f}""#)).collect();
        query.push_str(&format!(r#".sort({{"${}":[{}]}})"#, spec.sort_order.as_str(), fields.join(",")));
    }
    if spec.offset > 0 {
        query.push_str(&format!(".offset({})", spec.offset));
    }
    if spec.limit > 0 {
        query.push_str(&format!(".limit({})", spec.limit));
    }
    query
}

/// Criteria of `spec`, whether generated from its pattern or given raw.
pub fn spec_criteria(spec: &FileSpec) -> Result<String> {
    match (&spec.aql, spec.pattern.is_empty()) {
        (Some(aql), true) => Ok(aql.clone()),
        _ => criteria_for_spec(spec),
    }
}

/// Complete query text for a spec.
pub fn translate(spec: &FileSpec) -> Result<String> {
    spec.validate()?;
    Ok(build_query(&spec_criteria(spec)?, spec))
}

/// Same items as `criteria`, restricted to those carrying `key` matching `value`.
pub fn props_query(criteria: &str, key: &str, value: &str) -> String {
    format!(
        r#"items.find({{"$and" :[{criteria},{{{}}}]}}){}"#,
        key_value_part(key, value),
        include_part(&["name", "repo", "path", "actual_sha1", "property"])
    )
}

/// Artifacts recorded in a build's module list.
pub fn build_artifacts_query(build_name: &str, build_number: &str) -> String {
    format!(
        r#"items.find({{"$and" : [{{"artifact.module.build.name": {{"$eq": "{build_name}"}}}},{{"artifact.module.build.number": {{"$eq": "{build_number}"}}}}]}}){}"#,
        include_part(&["name", "repo", "path", "actual_sha1"])
    )
}

/// Immediate children of `repo/path`, with timestamps and properties.
pub fn directory_query(repo: &str, path: &str) -> String {
    format!(
        r#"items.find({{"type":"any","$or":[{{"$and":[{{"repo":"{repo}","path":{{"$match":"{path}"}},"name":{{"$match":"*"}}}}]}}]}}){}"#,
        include_part(&LISTING_FIELDS)
    )
}
