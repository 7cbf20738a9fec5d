use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{PATH_SEPARATOR, fold};

/// One completion offered for a partial key path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCompletion {
    /// The segment name.
    pub name: String,

    /// Path from the root up to and including this segment.
    pub full_path: String,

    /// Whether the segment has segments below it.
    pub has_children: bool,
}

/// A node in the key path trie.
///
/// The root node has an empty name. Children are indexed by their folded
/// name and keep the spelling of the last path that touched them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPathNode {
    name: String,
    full_path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, KeyPathNode>,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
}

impl KeyPathNode {
    fn child(name: &str, full_path: String) -> Self {
        Self {
            name: name.to_string(),
            full_path,
            children: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Direct children in folded-name order.
    pub fn children(&self) -> impl Iterator<Item = &KeyPathNode> {
        self.children.values()
    }

    /// Inserts every segment of `path`, linking intermediate nodes.
    pub fn insert(&mut self, path: &str) {
        let mut node = self;
        let mut full_path = String::new();

        for segment in segments(path) {
            if !full_path.is_empty() {
                full_path.push(PATH_SEPARATOR);
            }
            full_path.push_str(segment);

            let child = node
                .children
                .entry(fold(segment))
                .or_insert_with(|| KeyPathNode::child(segment, full_path.clone()));
            child.name = segment.to_string();
            child.full_path = full_path.clone();
            node = child;
        }
    }

    /// Removes the node addressed by `path` if it is a leaf.
    ///
    /// Returns true if a node was removed. Ancestors are never pruned.
    pub fn remove_leaf(&mut self, path: &str) -> bool {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            return false;
        };

        let Some(parent) = self.descend(parents.iter().copied()) else {
            return false;
        };
        let key = fold(last);
        match parent.children.get(&key) {
            Some(leaf) if !leaf.has_children() => parent.children.remove(&key).is_some(),
            _ => false,
        }
    }

    /// Finds the node addressed by `path`, ignoring case.
    pub fn find(&self, path: &str) -> Option<&KeyPathNode> {
        let mut node = self;
        for segment in segments(path) {
            node = node.children.get(&fold(segment))?;
        }
        Some(node)
    }

    fn descend<'a>(&mut self, parts: impl Iterator<Item = &'a str>) -> Option<&mut KeyPathNode> {
        let mut node = self;
        for segment in parts {
            node = node.children.get_mut(&fold(segment))?;
        }
        Some(node)
    }

    /// Completes a partial path.
    ///
    /// Completed segments descend case-insensitively. If the last segment
    /// names an existing node its children are returned, otherwise the
    /// siblings whose names start with it. A trailing separator always
    /// returns the children of the named node. Results are ordered by name.
    pub fn complete(&self, partial_path: &str) -> Vec<KeyCompletion> {
        let parts: Vec<&str> = segments(partial_path).collect();
        let wants_children = partial_path.is_empty() || partial_path.ends_with(PATH_SEPARATOR);

        let candidates: Vec<&KeyPathNode> = match parts.split_last() {
            None => self.children().collect(),
            Some(_) if wants_children => match self.find(partial_path) {
                Some(node) => node.children().collect(),
                None => Vec::new(),
            },
            Some((last, parents)) => {
                let Some(parent) = self.find(&parents.join("/")) else {
                    return Vec::new();
                };
                let folded = fold(last);
                match parent.children.get(&folded) {
                    Some(exact) => exact.children().collect(),
                    None => parent
                        .children()
                        .filter(|child| fold(&child.name).starts_with(&folded))
                        .collect(),
                }
            }
        };

        let mut completions: Vec<KeyCompletion> = candidates
            .into_iter()
            .map(|node| KeyCompletion {
                name: node.name.clone(),
                full_path: node.full_path.clone(),
                has_children: node.has_children(),
            })
            .collect();
        completions.sort_by(|a, b| a.name.cmp(&b.name));
        completions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(paths: &[&str]) -> KeyPathNode {
        let mut root = KeyPathNode::default();
        for path in paths {
            root.insert(path);
        }
        root
    }

    fn names(completions: &[KeyCompletion]) -> Vec<&str> {
        completions.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn completes_children_of_exact_node() {
        let root = trie(&["Foo", "Foo/Bar", "Foo/Bar/Baz"]);

        let completions = root.complete("Foo/Bar");
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].name, "Baz");
        assert_eq!(completions[0].full_path, "Foo/Bar/Baz");
        assert!(!completions[0].has_children);

        let top = root.complete("");
        assert_eq!(names(&top), vec!["Foo"]);
        assert!(top[0].has_children);
    }

    #[test]
    fn completes_siblings_by_prefix_ignoring_case() {
        let root = trie(&["App/Port", "App/Path", "App/Host"]);

        assert_eq!(names(&root.complete("app/p")), vec!["Path", "Port"]);
        assert_eq!(names(&root.complete("App/")), vec!["Host", "Path", "Port"]);
        assert!(root.complete("Nope/x").is_empty());
    }

    #[test]
    fn insert_updates_spelling() {
        let root = trie(&["foo/bar", "FOO/Baz"]);
        let node = root.find("Foo").unwrap();
        assert_eq!(node.name(), "FOO");
        assert_eq!(node.children().count(), 2);
    }

    #[test]
    fn remove_leaf_only_removes_childless_nodes() {
        let mut root = trie(&["A/B/C"]);
        assert!(!root.remove_leaf("A/B"));
        assert!(root.remove_leaf("a/b/c"));
        assert!(root.find("A/B").is_some());
        assert!(!root.remove_leaf("A/X"));
    }
}
