use std::collections::BTreeMap;

use crate::item::ResultItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceStrategy {
    /// Keep outermost items; anything nested under a kept folder goes.
    TopChain,
    /// Keep innermost items; any folder with a surviving descendant goes.
    BottomChain,
}

/// Drops items implied by others under `strategy`.
///
/// Items named `.` (the repository root) are ignored. Folder keys carry a
/// trailing `/`, so in sorted order every descendant of a folder sits right
/// after it and one comparison against the neighbour is enough.
pub fn reduce(items: Vec<ResultItem>, strategy: ReduceStrategy) -> Vec<ResultItem> {
    let by_path: BTreeMap<String, ResultItem> = items
        .into_iter()
        .filter(|item| item.name != ".")
        .map(|item| (sort_key(&item), item))
        .collect();

    match strategy {
        ReduceStrategy::TopChain => top_chain(by_path),
        ReduceStrategy::BottomChain => bottom_chain(by_path),
    }
}

fn sort_key(item: &ResultItem) -> String {
    let mut key = item.relative_path();
    if item.is_folder() && !key.ends_with('/') {
        key.push('/');
    }
    key
}

fn top_chain(by_path: BTreeMap<String, ResultItem>) -> Vec<ResultItem> {
    let mut kept: Vec<(String, ResultItem)> = Vec::with_capacity(by_path.len());
    for (key, item) in by_path {
        let nested = kept
            .last()
            .is_some_and(|(parent, _)| parent.ends_with('/') && key.starts_with(parent.as_str()));
        if !nested {
            kept.push((key, item));
        }
    }
    kept.into_iter().map(|(_, item)| item).collect()
}

fn bottom_chain(by_path: BTreeMap<String, ResultItem>) -> Vec<ResultItem> {
    let mut kept = Vec::with_capacity(by_path.len());
    let mut previous: Option<String> = None;
    for (key, item) in by_path.into_iter().rev() {
        let mut prefix = key.clone();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        let is_parent = previous.as_deref().is_some_and(|p| p.starts_with(&prefix));
        if !is_parent {
            kept.push(item);
        }
        previous = Some(key);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    fn item(path: &str, name: &str, item_type: ItemType) -> ResultItem {
        ResultItem {
            repo: "r".into(),
            path: path.into(),
            name: name.into(),
            item_type,
            ..Default::default()
        }
    }

    fn paths(items: &[ResultItem]) -> Vec<String> { items.iter().map(ResultItem::relative_path).collect() }

    #[test]
    fn test_folder_and_nested_file() {
        let items = vec![item("a/b/c", "d", ItemType::File), item("a", "b", ItemType::Folder)];
        assert_eq!(paths(&reduce(items.clone(), ReduceStrategy::TopChain)), vec!["r/a/b/"]);
        assert_eq!(paths(&reduce(items, ReduceStrategy::BottomChain)), vec!["r/a/b/c/d"]);
    }

    #[test]
    fn test_top_chain_sibling_with_shared_prefix() {
        let items = vec![
            item(".", "b", ItemType::Folder),
            item(".", "b-x", ItemType::File),
            item("b", "c", ItemType::File),
            item("b/c2", "d", ItemType::File),
            item(".", ".", ItemType::Folder),
        ];
        assert_eq!(paths(&reduce(items, ReduceStrategy::TopChain)), vec!["r/b-x", "r/b"]);
    }

    #[test]
    fn test_bottom_chain_keeps_leaves() {
        let items = vec![
            item(".", "a", ItemType::Folder),
            item("a", "b", ItemType::Folder),
            item("a/b", "f1", ItemType::File),
            item("a", "c", ItemType::Folder),
            item(".", "z", ItemType::File),
        ];
        assert_eq!(
            paths(&reduce(items, ReduceStrategy::BottomChain)),
            vec!["r/z", "r/a/c/", "r/a/b/f1"]
        );
    }
}
