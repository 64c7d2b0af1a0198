//! Directory-tree preview built from archive entry names.
//!
//! Entry names are split on `/` and inserted segment by segment, so every path
//! prefix that appears becomes a key at its depth. The tree does not
//! distinguish files from directories: a leaf segment is just a key with no
//! children. Key order is first-occurrence order, never sorted.

use std::io::{self, Write};

use indexmap::IndexMap;
use serde::Serialize;

/// Separator used to split entry names into segments.
pub const SEGMENT_SEPARATOR: char = '/';
/// Spaces of indentation per depth level.
pub const INDENT_WIDTH: usize = 4;
/// Prefix placed before every non-root segment.
pub const BRANCH_PREFIX: &str = "├── ";

/// Insertion-ordered nested mapping from path segment to sub-tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Hierarchy {
    children: IndexMap<String, Hierarchy>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entry name, creating every missing level along its path.
    pub fn insert_path(&mut self, entry: &str) {
        let mut level = self;
        for segment in entry.split(SEGMENT_SEPARATOR) {
            level = level.children.entry(segment.to_string()).or_default();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of keys directly below this level.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn get(&self, segment: &str) -> Option<&Hierarchy> {
        self.children.get(segment)
    }

    /// Iterate over `(segment, sub-tree)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Hierarchy)> {
        self.children.iter().map(|(name, child)| (name.as_str(), child))
    }

    /// Visit every key depth-first, pre-order, with its depth.
    fn walk<'a>(&'a self, depth: usize, visit: &mut impl FnMut(usize, &'a str)) {
        for (name, child) in &self.children {
            visit(depth, name);
            child.walk(depth + 1, visit);
        }
    }
}

/// Build the hierarchy implied by a sequence of archive entry names.
pub fn build_hierarchy<I, S>(entries: I) -> Hierarchy
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tree = Hierarchy::new();
    for entry in entries {
        tree.insert_path(entry.as_ref());
    }
    tree
}

/// Format a single outline line for `name` at `depth`.
pub fn render_line(depth: usize, name: &str) -> String {
    let indent = " ".repeat(depth * INDENT_WIDTH);
    let prefix = if depth > 0 { BRANCH_PREFIX } else { "" };
    format!("{indent}{prefix}{name}")
}

/// Render the tree as an indented outline, one line per key.
pub fn render_hierarchy(tree: &Hierarchy) -> Vec<String> {
    let mut lines = Vec::new();
    tree.walk(0, &mut |depth, name| lines.push(render_line(depth, name)));
    lines
}

/// Emit the outline line by line to `out` as it is produced.
pub fn write_hierarchy<W: Write>(out: &mut W, tree: &Hierarchy) -> io::Result<()> {
    let mut result = Ok(());
    tree.walk(0, &mut |depth, name| {
        if result.is_ok() {
            result = writeln!(out, "{}", render_line(depth, name));
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entries_yield_empty_tree_and_no_lines() {
        let tree = build_hierarchy(Vec::<String>::new());
        assert!(tree.is_empty());
        assert!(render_hierarchy(&tree).is_empty());
    }

    #[test]
    fn siblings_render_in_first_occurrence_order() {
        let tree = build_hierarchy(["a/b.py", "a/c.py"]);
        assert_eq!(
            render_hierarchy(&tree),
            vec!["a", "    ├── b.py", "    ├── c.py"]
        );
    }

    #[test]
    fn top_level_keys_are_not_sorted() {
        let tree = build_hierarchy(["zeta.py", "alpha.py", "mid/x.py"]);
        let top: Vec<&str> = tree.iter().map(|(name, _)| name).collect();
        assert_eq!(top, vec!["zeta.py", "alpha.py", "mid"]);
    }

    #[test]
    fn deep_paths_indent_four_spaces_per_level() {
        let tree = build_hierarchy(["proj/src/jobs/gold.py"]);
        assert_eq!(
            render_hierarchy(&tree),
            vec![
                "proj",
                "    ├── src",
                "        ├── jobs",
                "            ├── gold.py",
            ]
        );
    }

    #[test]
    fn one_line_per_distinct_prefix() {
        let entries = [
            "sales/common.py",
            "sales/bronze.py",
            "sales/common.py",
            "generated_script.py",
            "sales/data/raw.json",
        ];
        let lines = render_hierarchy(&build_hierarchy(entries));
        // sales, common.py, bronze.py, data, raw.json, generated_script.py
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "sales");
        assert_eq!(lines[3], "    ├── data");
        assert_eq!(lines[4], "        ├── raw.json");
        assert_eq!(lines[5], "generated_script.py");
    }

    #[test]
    fn files_and_directories_share_one_representation() {
        let tree = build_hierarchy(["a", "a/b"]);
        let a = tree.get("a").expect("a present");
        assert_eq!(a.len(), 1);
        assert!(a.get("b").expect("b present").is_empty());
    }

    #[test]
    fn write_hierarchy_matches_render() {
        let tree = build_hierarchy(["x/y.py", "z.py"]);
        let mut out = Vec::new();
        write_hierarchy(&mut out, &tree).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "x\n    ├── y.py\nz.py\n");
    }

    #[test]
    fn serializes_as_nested_objects() {
        let tree = build_hierarchy(["a/b.py"]);
        let json = serde_json::to_string(&tree).expect("json");
        assert_eq!(json, r#"{"a":{"b.py":{}}}"#);
    }
}
