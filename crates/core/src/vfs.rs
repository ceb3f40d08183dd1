//! A directory tree keyed by `/`-separated path segments, generic over the payload stored at each
//! leaf.
//!
//! This backs the pack container reader's enumeration requirement (a tree kept in sync alongside a
//! flat digest-keyed map), but it has no Godot-specific knowledge: it just organizes `res://a/b/c`
//! style paths into nested folders.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

use hashbrown::HashMap;

/// A single entry in a [`PathTree`]: either a leaf payload or a nested folder.
#[derive(Debug)]
enum Node<T> {
    Leaf(T),
    Folder(PathTree<T>),
}

/// Organizes values keyed by path into segments, so callers can enumerate a pack's contents
/// folder-by-folder instead of only by flat path.
#[derive(Debug)]
pub struct PathTree<T> {
    children: HashMap<String, Node<T>>,
}

impl<T> Default for PathTree<T> {
    #[inline]
    fn default() -> Self {
        Self { children: HashMap::new() }
    }
}

impl<T> PathTree<T> {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` at `path`, creating intermediate folders as needed. Returns the previous
    /// leaf at that exact path, if one existed.
    pub fn insert(&mut self, path: &str, value: T) -> Option<T> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty()).peekable();
        self.insert_inner(&mut segments, value)
    }

    fn insert_inner<'a, I: Iterator<Item = &'a str>>(
        &mut self,
        segments: &mut std::iter::Peekable<I>,
        value: T,
    ) -> Option<T> {
        let segment = segments.next().expect("path must contain at least one segment");
        if segments.peek().is_none() {
            match self.children.insert(segment.to_owned(), Node::Leaf(value)) {
                Some(Node::Leaf(previous)) => Some(previous),
                _ => None,
            }
        } else {
            let folder = match self.children.entry(segment.to_owned()).or_insert_with(|| Node::Folder(PathTree::new())) {
                Node::Folder(folder) => folder,
                Node::Leaf(_) => {
                    // A leaf previously occupied a path that is now used as a folder; replace it.
                    self.children.insert(segment.to_owned(), Node::Folder(PathTree::new()));
                    match self.children.get_mut(segment).unwrap() {
                        Node::Folder(folder) => folder,
                        Node::Leaf(_) => unreachable!(),
                    }
                }
            };
            folder.insert_inner(segments, value)
        }
    }

    /// Looks up the leaf stored at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&T> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let mut node = &self.children;
        let mut segment = segments.next()?;
        loop {
            match node.get(segment)? {
                Node::Leaf(value) => return if segments.next().is_none() { Some(value) } else { None },
                Node::Folder(folder) => {
                    node = &folder.children;
                    segment = segments.next()?;
                }
            }
        }
    }

    /// Depth-first iterator over every leaf, yielding its full path and value.
    pub fn iter(&self) -> impl Iterator<Item = (String, &T)> {
        let mut results = Vec::new();
        self.collect_into(String::new(), &mut results);
        results.into_iter()
    }

    fn collect_into<'a>(&'a self, prefix: String, results: &mut Vec<(String, &'a T)>) {
        for (name, node) in &self.children {
            let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
            match node {
                Node::Leaf(value) => results.push((path, value)),
                Node::Folder(folder) => folder.collect_into(path, results),
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::PathTree;

    #[test]
    fn insert_and_lookup_nested_paths() {
        let mut tree = PathTree::new();
        tree.insert("res://scenes/main.tscn", 1u32);
        tree.insert("res://scripts/player.gd", 2u32);
        tree.insert("res://scripts/enemy/ai.gd", 3u32);

        assert_eq!(tree.get("res://scenes/main.tscn"), Some(&1));
        assert_eq!(tree.get("res://scripts/player.gd"), Some(&2));
        assert_eq!(tree.get("res://scripts/enemy/ai.gd"), Some(&3));
        assert_eq!(tree.get("res://missing.gd"), None);
    }

    #[test]
    fn iter_visits_every_leaf() {
        let mut tree = PathTree::new();
        tree.insert("a/b", 1u32);
        tree.insert("a/c", 2u32);
        tree.insert("d", 3u32);

        let mut paths: Vec<_> = tree.iter().map(|(path, _)| path).collect();
        paths.sort();
        assert_eq!(paths, vec!["a/b", "a/c", "d"]);
    }
}
