//! Wildcard pattern helpers shared by searches, uploads and downloads.
//!
//! Remote items are indexed by `path` and `name` separately, so a single
//! wildcard such as `a/*b` has to be expanded into every `(path, name)`
//! alternative it could denote once the `*` swallows further separators.

use regex::Regex;

use crate::error::{Error, Result};

/// One `(directory pattern, name pattern)` alternative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathFilePair {
    pub path: String,
    pub file: String,
}

impl PathFilePair {
    pub fn new(path: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: file.into(),
        }
    }
}

/// Expands a repository-relative pattern into path/name alternatives.
///
/// ```
/// use artiflow_query::{PathFilePair, path_file_pairs};
///
/// assert_eq!(path_file_pairs("a/b.zip", false), vec![PathFilePair::new("a", "b.zip")]);
/// assert_eq!(
///     path_file_pairs("a/*", true),
///     vec![PathFilePair::new("a", "*"), PathFilePair::new("a/*", "*")]
/// );
/// ```
pub fn path_file_pairs(pattern: &str, recursive: bool) -> Vec<PathFilePair> {
    let default_path = if recursive { "*" } else { "." };
    if pattern == "*" {
        return vec![PathFilePair::new(default_path, "*")];
    }

    let (path, name, first) = match pattern.rfind('/') {
        Some(idx) => (&pattern[..idx], &pattern[idx + 1..], &pattern[..idx]),
        None => ("", pattern, "."),
    };
    let mut pairs = vec![PathFilePair::new(first, name)];
    if !recursive {
        return pairs;
    }
    if name == "*" {
        pairs.push(PathFilePair::new(format!("{path}/*"), "*"));
        return pairs;
    }

    let prefix = if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    };
    let sections: Vec<&str> = name.split('*').collect();
    // Each `*` may itself cover "dir/": move everything before it into the path.
    for i in 0..sections.len().saturating_sub(1) {
        let head = sections[..=i].join("*");
        let tail = sections[i + 1..].join("*");
        let file = if tail.is_empty() { "*".to_string() } else { format!("*{tail}") };
        pairs.push(PathFilePair::new(format!("{prefix}{head}*"), file));
    }
    pairs
}

/// Pairs used to find folders matching a pattern that ends with `/`.
/// The leading repository segment is dropped.
pub fn path_folder_pairs(pattern: &str) -> Vec<PathFilePair> {
    let trimmed = pattern.strip_suffix('/').unwrap_or(pattern);
    let cleaned = strip_parentheses(trimmed);
    let without_repo = match cleaned.find('/') {
        Some(idx) => &cleaned[idx + 1..],
        None => cleaned.as_str(),
    };

    let (path, last) = match without_repo.rfind('/') {
        Some(idx) => (&without_repo[..idx], &without_repo[idx + 1..]),
        None => (".", without_repo),
    };

    let mut pairs = vec![PathFilePair::new(path, last)];
    for (i, _) in last.match_indices('*') {
        let dir = &last[..=i];
        let joined = if path == "." { dir.to_string() } else { format!("{path}/{dir}") };
        pairs.push(PathFilePair::new(joined, &last[i..]));
    }
    pairs
}

pub(crate) fn strip_parentheses(pattern: &str) -> String { pattern.replace(['(', ')'], "") }

/// Normalises a search pattern: a bare repository becomes `repo/*`, a
/// trailing `/` matches everything below it and capture parentheses go away.
///
/// ```
/// use artiflow_query::prepare_search_pattern;
///
/// assert_eq!(prepare_search_pattern("libs", true), "libs/*");
/// assert_eq!(prepare_search_pattern("libs/(a)*/", true), "libs/a*/*");
/// ```
pub fn prepare_search_pattern(pattern: &str, repository_exists: bool) -> String {
    let mut pattern = pattern.to_string();
    if repository_exists && !pattern.contains('/') {
        pattern.push('/');
    }
    if pattern.ends_with('/') {
        pattern.push('*');
    }
    strip_parentheses(&pattern)
}

/// Whether a remote pattern needs a wildcard search rather than a single
/// item lookup.
pub fn is_wildcard_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.ends_with('/') || !pattern.contains('/')
}

/// Converts a wildcard path into an anchored regular expression.
///
/// ```
/// use artiflow_query::path_to_regexp;
///
/// assert_eq!(path_to_regexp("a/*.zip"), r"^a/.*\.zip$");
/// assert_eq!(path_to_regexp("dir/"), "^dir/.*$");
/// ```
pub fn path_to_regexp(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        match c {
            '.' | '^' | '$' | '+' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push_str(".*"),
            _ => escaped.push(c),
        }
    }
    if path.ends_with('/') || path.ends_with('\\') {
        escaped.push_str(".*");
    }
    format!("^{escaped}$")
}

/// Anchored regex matching exactly the paths a wildcard matches: `*` spans
/// any run of characters and everything else is literal. A trailing `/`
/// matches everything below it.
///
/// ```
/// use artiflow_query::wildcard_to_regexp;
///
/// assert_eq!(wildcard_to_regexp("a/*[1].jar"), r"^a/.*\[1\]\.jar$");
/// ```
pub fn wildcard_to_regexp(pattern: &str) -> String {
    let mut regex = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
    if pattern.ends_with('/') {
        regex.push_str(".*");
    }
    format!("^{regex}$")
}

/// Regex a local upload path is matched with.
pub fn prepare_local_path_for_upload(local_path: &str, regexp: bool) -> String {
    if local_path == "./" || local_path == ".\\" {
        return "^.*$".to_string();
    }
    let local_path = local_path
        .strip_prefix("./")
        .or_else(|| local_path.strip_prefix(".\\"))
        .unwrap_or(local_path);
    if regexp {
        local_path.to_string()
    } else {
        path_to_regexp(local_path)
    }
}

pub fn compile(pattern: &str) -> Result<Regex> { Regex::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e)) }

/// Replaces each `{i}` in `target` with the i-th capture group of `pattern`
/// matched against `found`. With `ignore_repo` the first path segment of
/// both sides is ignored.
///
/// ```
/// use artiflow_query::reformat_target;
///
/// let target = reformat_target("repoA/1(*)234", "repoB/1hello234", "{1}", true).unwrap();
/// assert_eq!(target, "hello");
/// ```
pub fn reformat_target(pattern: &str, found: &str, target: &str, ignore_repo: bool) -> Result<String> {
    let (pattern, found) = if ignore_repo {
        (without_repo(pattern), without_repo(found))
    } else {
        (pattern, found)
    };
    let regex = compile(&path_to_regexp(pattern))?;
    Ok(substitute_groups(&regex, found, target))
}

/// Same as [`reformat_target`] for an already compiled regex.
pub fn substitute_groups(regex: &Regex, found: &str, target: &str) -> String {
    let mut result = target.to_string();
    if let Some(captures) = regex.captures(found) {
        for (i, group) in captures.iter().enumerate().skip(1) {
            let value = group.map(|m| m.as_str().replace('\\', "/")).unwrap_or_default();
            result = result.replace(&format!("{{{i}}}"), &value);
        }
    }
    result
}

fn without_repo(path: &str) -> &str {
    match path.find('/') {
        Some(idx) => &path[idx..],
        None => path,
    }
}

/// Normalises separators and strips relative segments from a remote path.
pub fn trim_path(path: &str) -> String {
    path.replace('\\', "/")
        .replace("//", "/")
        .replace("../", "")
        .replace("./", "")
}

/// Longest leading run of a local pattern that contains no wildcard (or no
/// capture group when `regexp`); `.` when there is none.
///
/// ```
/// use artiflow_query::root_path;
///
/// assert_eq!(root_path("out/lib/*.jar", false), "out/lib");
/// assert_eq!(root_path("/abs/(.*)/x", true), "/abs");
/// assert_eq!(root_path("*.jar", false), ".");
/// ```
pub fn root_path(path: &str, regexp: bool) -> String {
    let mut separator = '/';
    let mut sections: Vec<&str> = path.split(separator).collect();
    if sections.len() == 1 {
        separator = '\\';
        sections = path.split(separator).collect();
    }

    let stop = if regexp { '(' } else { '*' };
    let mut root = Vec::new();
    for section in sections.iter().filter(|s| !s.is_empty()) {
        if section.contains(stop) {
            break;
        }
        if *section == "~" {
            root.push(home_dir());
        } else {
            root.push((*section).to_string());
        }
    }

    let mut root = root.join(&separator.to_string());
    if sections.first().is_some_and(|s| s.is_empty()) {
        root.insert(0, separator);
    }
    if root.is_empty() { ".".to_string() } else { root }
}

fn home_dir() -> String {
    home::home_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "~".to_string())
}

/// Splits on `separator`; a backslash escapes the next character.
///
/// ```
/// use artiflow_query::split_with_escape;
///
/// assert_eq!(split_with_escape(r"a=1\;2;b=3", ';'), vec!["a=1;2", "b=3"]);
/// ```
pub fn split_with_escape(value: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Splits at the last `/` (or `\`) into `(file, dir)`.
pub fn file_and_dir(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(idx) => (&path[idx + 1..], &path[..idx]),
        None => (path, ""),
    }
}

/// Local directory and file name a remote item lands at.
///
/// The target's directory part is the base; unless `flat`, the item's
/// remote path is appended. A target ending in a file name renames the item.
pub fn local_path_and_file(name: &str, remote_path: &str, target: &str, flat: bool) -> (String, String) {
    let (target_file, target_dir) = file_and_dir(target);
    let dir = if flat {
        target_dir.to_string()
    } else {
        join_clean(target_dir, remote_path)
    };
    let file = if target_file.is_empty() { name } else { target_file };
    (dir, file.to_string())
}

/// Joins two slash paths, dropping empty and `.` segments and resolving `..`.
pub fn join_clean(base: &str, rest: &str) -> String {
    let absolute = base.starts_with('/') || (base.is_empty() && rest.starts_with('/'));
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rest.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }
    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => String::new(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<PathFilePair> {
        items.iter().map(|(p, f)| PathFilePair::new(*p, *f)).collect()
    }

    #[test]
    fn test_path_file_pairs_recursive() {
        assert_eq!(path_file_pairs("a", true), pairs(&[(".", "a")]));
        assert_eq!(path_file_pairs("a/*", true), pairs(&[("a", "*"), ("a/*", "*")]));
        assert_eq!(path_file_pairs("*", true), pairs(&[("*", "*")]));
        assert_eq!(path_file_pairs("*/*", true), pairs(&[("*", "*"), ("*/*", "*")]));
        assert_eq!(path_file_pairs("a/b*", true), pairs(&[("a", "b*"), ("a/b*", "*")]));
        assert_eq!(
            path_file_pairs("a/a*b*", true),
            pairs(&[("a", "a*b*"), ("a/a*", "*b*"), ("a/a*b*", "*")])
        );
        assert_eq!(
            path_file_pairs("a*b*c", true),
            pairs(&[(".", "a*b*c"), ("a*", "*b*c"), ("a*b*", "*c")])
        );
    }

    /// `repo-relative path` split into `(dir, name)`, `.` for the root.
    fn dir_and_name(path: &str) -> (&str, &str) {
        match path.rfind('/') {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => (".", path),
        }
    }

    #[test]
    fn test_path_file_pairs_cover_every_glob_match() {
        let patterns = ["a*b*c", "a/*b", "*/x*", "a/b*", "*"];
        let paths = [
            "abc", "a/bc", "ab/c", "a/x/b/c", "a/b/c/dc", "ab/xc", "a/b", "a/xb", "a/x/yb", "a/xb/b", "a/b/c/xb",
            "r/x1", "r/s/x1", "r/x/y", "q/r/xx/z/w", "a/b1", "a/b/c", "x/y",
        ];
        for pattern in patterns {
            let glob = compile(&wildcard_to_regexp(pattern)).unwrap();
            let generated: Vec<(Regex, Regex)> = path_file_pairs(pattern, true)
                .iter()
                .map(|pair| {
                    (
                        compile(&wildcard_to_regexp(&pair.path)).unwrap(),
                        compile(&wildcard_to_regexp(&pair.file)).unwrap(),
                    )
                })
                .collect();

            let mut matched = 0;
            for path in paths.iter().filter(|p| glob.is_match(p)) {
                matched += 1;
                let (dir, name) = dir_and_name(path);
                assert!(
                    generated.iter().any(|(d, n)| d.is_match(dir) && n.is_match(name)),
                    "{pattern} matches {path} but no path/name pair does"
                );
            }
            assert!(matched > 0, "no sample path matches {pattern}");
        }
    }

    #[test]
    fn test_wildcard_to_regexp() {
        assert_eq!(wildcard_to_regexp("a/*.zip"), r"^a/.*\.zip$");
        assert_eq!(wildcard_to_regexp("dir/"), "^dir/.*$");
        let regex = compile(&wildcard_to_regexp("v{2}?|x+*")).unwrap();
        assert!(regex.is_match("v{2}?|x+tail"));
        assert!(!regex.is_match("vv?|x+"));
    }

    #[test]
    fn test_path_file_pairs_non_recursive() {
        assert_eq!(path_file_pairs("*", false), pairs(&[(".", "*")]));
        assert_eq!(path_file_pairs("a/*", false), pairs(&[("a", "*")]));
        assert_eq!(path_file_pairs("a*b*c/dd/*", false), pairs(&[("a*b*c/dd", "*")]));
    }

    #[test]
    fn test_path_folder_pairs() {
        assert_eq!(path_folder_pairs("repo/a/b/"), pairs(&[("a", "b")]));
        assert_eq!(
            path_folder_pairs("repo/a/(*)b*/"),
            pairs(&[("a", "*b*"), ("a/*", "*b*"), ("a/*b*", "*")])
        );
        assert_eq!(path_folder_pairs("repo/x*/"), pairs(&[(".", "x*"), ("x*", "*")]));
    }

    #[test]
    fn test_regexp_conversion() {
        assert_eq!(path_to_regexp("a+b^c$d.e"), r"^a\+b\^c\$d\.e$");
        assert_eq!(prepare_local_path_for_upload("./", false), "^.*$");
        assert_eq!(prepare_local_path_for_upload("./out/*.jar", false), r"^out/.*\.jar$");
        assert_eq!(prepare_local_path_for_upload("./out/(.*)", true), "out/(.*)");
    }

    #[test]
    fn test_reformat_target() {
        assert_eq!(
            reformat_target("repoA/1(*)234", "repoA/1hello234", "{1}", false).unwrap(),
            "hello"
        );
        assert_eq!(
            reformat_target("r/(*)/(*).zip", "r/a/b/c.zip", "t/{2}-{1}/", false).unwrap(),
            "t/c-a/b/"
        );
        assert_eq!(reformat_target("r/a", "r/b", "{1}", false).unwrap(), "{1}");
    }

    #[test]
    fn test_trim_and_split() {
        assert_eq!(trim_path(r"a\\b//c/../d/./e"), "a/b/c/d/e");
        assert_eq!(split_with_escape("a,b", ','), vec!["a", "b"]);
        assert_eq!(split_with_escape(r"a\,b,c\\", ','), vec!["a,b", r"c\"]);
    }

    #[test]
    fn test_root_path() {
        assert_eq!(root_path("a/b/c", false), "a/b/c");
        assert_eq!(root_path("/a/b*/c", false), "/a");
        assert_eq!(root_path(r"c:\a\(b)\c", true), r"c:\a");
        assert_eq!(root_path("(a)/b", true), ".");
    }

    #[test]
    fn test_local_path_and_file() {
        assert_eq!(
            local_path_and_file("f.jar", "a/b", "out/", false),
            ("out/a/b".to_string(), "f.jar".to_string())
        );
        assert_eq!(
            local_path_and_file("f.jar", "a/b", "out/", true),
            ("out".to_string(), "f.jar".to_string())
        );
        assert_eq!(
            local_path_and_file("f.jar", "a/b", "out/renamed.jar", true),
            ("out".to_string(), "renamed.jar".to_string())
        );
        assert_eq!(
            local_path_and_file("f.jar", ".", "", false),
            (String::new(), "f.jar".to_string())
        );
    }

    #[test]
    fn test_join_clean() {
        assert_eq!(join_clean("out", "./a//b"), "out/a/b");
        assert_eq!(join_clean("/out", "../x"), "/x");
        assert_eq!(join_clean("", "."), "");
    }
}
