use serde::{Deserialize, Serialize};

use crate::props::Property;

/// Property holding the target of an uploaded symlink.
pub const SYMLINK_DEST: &str = "symlink.dest";
/// Property holding the sha1 of the content a symlink pointed at.
pub const SYMLINK_SHA1: &str = "symlink.destsha1";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Folder,
    /// Unknown item types are read as files.
    #[default]
    #[serde(other)]
    File,
}

/// One item of a search response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultItem {
    pub repo:        String,
    pub path:        String,
    pub name:        String,
    #[serde(rename = "type")]
    pub item_type:   ItemType,
    pub size:        u64,
    pub actual_md5:  String,
    pub actual_sha1: String,
    pub sha256:      String,
    pub properties:  Vec<Property>,
    pub created:     String,
    pub modified:    String,
    pub updated:     String,
}

impl ResultItem {
    pub fn is_folder(&self) -> bool { self.item_type == ItemType::Folder }

    /// `repo/path/name`, with a root path of `.` collapsed and a trailing
    /// `/` on folders.
    ///
    /// ```
    /// use artiflow_query::ResultItem;
    ///
    /// let item = ResultItem { repo: "r".into(), path: ".".into(), name: "a.jar".into(), ..Default::default() };
    /// assert_eq!(item.relative_path(), "r/a.jar");
    /// ```
    pub fn relative_path(&self) -> String {
        if self.path == "." {
            return format!("{}/{}", self.repo, self.name);
        }
        let mut url = [self.repo.as_str(), self.path.as_str(), self.name.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if self.is_folder() && !url.ends_with('/') {
            url.push('/');
        }
        url
    }

    /// Path within the repository, without the repository segment.
    pub fn path_in_repo(&self) -> String {
        match self.path.as_str() {
            "." | "" => self.name.clone(),
            path => format!("{path}/{}", self.name),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn symlink_target(&self) -> Option<&str> { self.property(SYMLINK_DEST).filter(|v| !v.is_empty()) }

    pub fn symlink_sha1(&self) -> Option<&str> { self.property(SYMLINK_SHA1).filter(|v| !v.is_empty()) }

    /// Key used to match the same item across two searches.
    pub(crate) fn identity(&self) -> String {
        format!("{}{}{}{}", self.repo, self.path, self.name, self.actual_sha1)
    }
}

/// Envelope of the search endpoint's response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AqlResponse {
    #[serde(default)]
    pub results: Vec<ResultItem>,
}
