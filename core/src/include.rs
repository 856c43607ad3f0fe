//! Relationship include paths.
//!
//! # Design
//! `IncludePathSet` keeps only the most specific path on each branch, so
//! `user` followed by `user.company` leaves a single `user.company` entry and
//! the reverse order is a no-op for `user`. A path supersedes another only at
//! a segment boundary: `user.company` supersedes `user`, `username` does not.
//!
//! `IncludeTree` is the nested form the normalizer walks. Children keep
//! insertion order so normalized objects list relationships in the order the
//! caller asked for them.

use crate::case;
use crate::http::Flavor;

/// Ordered set of dotted include paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludePathSet {
    paths: Vec<String>,
}

impl IncludePathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path`, dropping any retained path it supersedes. Does nothing if
    /// an equally or more specific path is already present.
    ///
    /// Supersession is checked per dotted segment, not as a raw string
    /// prefix: `user.company` replaces `user`, but `username` and `user`
    /// are kept side by side.
    pub fn add(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        self.paths.retain(|existing| !is_branch_prefix(existing, path));
        if !self.paths.iter().any(|existing| is_branch_prefix(path, existing)) {
            self.paths.push(path.to_string());
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn to_tree(&self) -> IncludeTree {
        IncludeTree::from_paths(&self.paths)
    }

    /// Render the paths for the query string. JSON:API joins kebab-cased
    /// paths with commas; the plain flavor repeats one snake-cased value per
    /// path.
    pub fn to_query_value(&self, flavor: Flavor) -> IncludeQuery {
        match flavor {
            Flavor::JsonApi => IncludeQuery::Joined(
                self.paths
                    .iter()
                    .map(|path| path.split('.').map(case::kebab).collect::<Vec<_>>().join("."))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Flavor::Plain => IncludeQuery::Repeated(self.paths.iter().map(|path| case::snake(path)).collect()),
        }
    }
}

/// `prefix` names `path` itself or one of its ancestors.
fn is_branch_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Include paths ready for the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeQuery {
    /// `include=a.b,c`
    Joined(String),
    /// `include[]=a.b&include[]=c`
    Repeated(Vec<String>),
}

impl IncludeQuery {
    pub fn into_pairs(self) -> Vec<(String, String)> {
        match self {
            IncludeQuery::Joined(value) => vec![("include".to_string(), value)],
            IncludeQuery::Repeated(values) => values
                .into_iter()
                .map(|value| ("include[]".to_string(), value))
                .collect(),
        }
    }
}

/// Nested relationship names. An empty node is a leaf: include the
/// relationship, resolve nothing below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: Vec<(String, IncludeTree)>,
}

impl IncludeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    /// Insert a dotted path, creating missing levels and leaving existing
    /// siblings untouched.
    pub fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let index = match node.children.iter().position(|(name, _)| name == segment) {
                Some(index) => index,
                None => {
                    node.children.push((segment.to_string(), IncludeTree::new()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index].1;
        }
    }

    pub fn get(&self, name: &str) -> Option<&IncludeTree> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, subtree)| subtree)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IncludeTree)> {
        self.children.iter().map(|(name, subtree)| (name.as_str(), subtree))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Rename every node, e.g. to match camel-cased response keys. Names
    /// that collide after renaming are merged.
    pub fn map_names<F>(&self, rename: F) -> IncludeTree
    where
        F: Fn(&str) -> String,
    {
        self.map_names_with(&rename)
    }

    fn map_names_with<F>(&self, rename: &F) -> IncludeTree
    where
        F: Fn(&str) -> String,
    {
        let mut out = IncludeTree::new();
        for (name, subtree) in &self.children {
            let renamed = rename(name);
            let mapped = subtree.map_names_with(rename);
            match out.children.iter_mut().find(|(existing, _)| *existing == renamed) {
                Some((_, existing)) => existing.merge(mapped),
                None => out.children.push((renamed, mapped)),
            }
        }
        out
    }

    fn merge(&mut self, other: IncludeTree) {
        for (name, subtree) in other.children {
            match self.children.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, existing)) => existing.merge(subtree),
                None => self.children.push((name, subtree)),
            }
        }
    }
}
