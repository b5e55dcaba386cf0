//! In-memory virtual file system.
//!
//! The store is an owned value: each session or build context holds its own
//! instance and hands immutable [`Snapshot`]s to the build pipeline. File
//! contents are reference-counted, so taking a snapshot clones the path index
//! but never the file bodies.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::VfsError;
use crate::path::{self, normalize_path, resolve_dot_segments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One file or directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub path: String,
    pub kind: NodeKind,
    /// Present for files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Arc<str>>,
    /// Child segment names, directories only.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub children: BTreeSet<String>,
}

impl FileNode {
    fn file(path: String, content: &str) -> Self {
        Self {
            path,
            kind: NodeKind::File,
            content: Some(Arc::from(content)),
            children: BTreeSet::new(),
        }
    }

    fn directory(path: String) -> Self {
        Self {
            path,
            kind: NodeKind::Directory,
            content: None,
            children: BTreeSet::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn name(&self) -> &str {
        path::file_name(&self.path)
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Validates a caller-supplied path and returns its canonical form.
fn checked_path(raw: &str) -> Result<String, VfsError> {
    if !raw.starts_with('/') {
        return Err(VfsError::invalid(raw, "path must start with '/'"));
    }
    if raw.contains('\0') {
        return Err(VfsError::invalid(raw, "path contains a NUL byte"));
    }
    resolve_dot_segments(raw).ok_or_else(|| VfsError::invalid(raw, "path escapes the root"))
}

#[derive(Debug, Clone)]
pub struct VirtualFileStore {
    nodes: BTreeMap<String, FileNode>,
}

impl Default for VirtualFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFileStore {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), FileNode::directory("/".to_string()));
        Self { nodes }
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn get(&self, path: &str) -> Option<&FileNode> {
        self.nodes.get(&normalize_path(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn read_file(&self, path: &str) -> Result<&str, VfsError> {
        match self.get(path) {
            Some(node) if node.is_file() => Ok(node.text()),
            _ => Err(VfsError::not_found(path)),
        }
    }

    /// Children of a directory in name order.
    pub fn list_directory(&self, path: &str) -> Result<Vec<&FileNode>, VfsError> {
        let dir = match self.get(path) {
            Some(node) if node.is_directory() => node,
            _ => return Err(VfsError::not_found(path)),
        };
        Ok(dir
            .children
            .iter()
            .filter_map(|name| self.nodes.get(&path::join(&dir.path, name)))
            .collect())
    }

    /// All file nodes in path order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values().filter(|node| node.is_file())
    }

    /// Creates a file, creating any missing parent directories.
    pub fn create_file(&mut self, path: &str, content: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        match self.nodes.get(&path) {
            Some(node) if node.is_directory() => {
                return Err(VfsError::invalid(&path, "a directory exists at this path"))
            }
            Some(_) => return Err(VfsError::conflict(&path)),
            None => {}
        }
        self.ensure_parents(&path)?;
        self.link(&path);
        self.nodes.insert(path.clone(), FileNode::file(path, content));
        Ok(())
    }

    /// Creates a directory (and its parents). Existing directories are left alone.
    pub fn create_directory(&mut self, path: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        match self.nodes.get(&path) {
            Some(node) if node.is_directory() => return Ok(()),
            Some(_) => return Err(VfsError::invalid(&path, "a file exists at this path")),
            None => {}
        }
        self.ensure_parents(&path)?;
        self.link(&path);
        self.nodes.insert(path.clone(), FileNode::directory(path));
        Ok(())
    }

    pub fn update_file(&mut self, path: &str, content: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        match self.nodes.get_mut(&path) {
            Some(node) if node.is_file() => {
                node.content = Some(Arc::from(content));
                Ok(())
            }
            _ => Err(VfsError::not_found(&path)),
        }
    }

    /// Creates or overwrites a file.
    pub fn write_file(&mut self, path: &str, content: &str) -> Result<(), VfsError> {
        let canonical = checked_path(path)?;
        if self.nodes.get(&canonical).is_some_and(|n| n.is_file()) {
            self.update_file(&canonical, content)
        } else {
            self.create_file(&canonical, content)
        }
    }

    pub fn delete_file(&mut self, path: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        if !self.nodes.get(&path).is_some_and(|node| node.is_file()) {
            return Err(VfsError::not_found(&path));
        }
        self.remove_subtree(&path)
    }

    /// Removes a directory and everything below it.
    pub fn delete_directory(&mut self, path: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        if !self.nodes.get(&path).is_some_and(|node| node.is_directory()) {
            return Err(VfsError::not_found(&path));
        }
        self.remove_subtree(&path)
    }

    /// Removes a file or a directory tree.
    pub fn delete(&mut self, path: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        if !self.nodes.contains_key(&path) {
            return Err(VfsError::not_found(&path));
        }
        self.remove_subtree(&path)
    }

    /// Moves a node, rewriting the prefix of every descendant.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), VfsError> {
        let old_path = checked_path(old_path)?;
        let new_path = checked_path(new_path)?;

        if old_path == "/" {
            return Err(VfsError::invalid(&old_path, "the root cannot be renamed"));
        }
        if !self.nodes.contains_key(&old_path) {
            return Err(VfsError::not_found(&old_path));
        }
        if self.nodes.contains_key(&new_path) {
            return Err(VfsError::conflict(&new_path));
        }
        if path::is_within(&new_path, &old_path) {
            return Err(VfsError::invalid(
                &new_path,
                "cannot move a directory into itself",
            ));
        }

        self.ensure_parents(&new_path)?;

        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| path::is_within(key, &old_path))
            .cloned()
            .collect();

        self.unlink(&old_path);
        for key in moved {
            if let Some(mut node) = self.nodes.remove(&key) {
                let rewritten = format!("{}{}", new_path, &key[old_path.len()..]);
                node.path = rewritten.clone();
                self.nodes.insert(rewritten, node);
            }
        }
        self.link(&new_path);
        Ok(())
    }

    /// Replaces every literal occurrence of `search` and returns how many were replaced.
    ///
    /// With `expected_occurrences` set, the file is left untouched unless the
    /// occurrence count matches exactly.
    pub fn replace_in_file(
        &mut self,
        path: &str,
        search: &str,
        replacement: &str,
        expected_occurrences: Option<usize>,
    ) -> Result<usize, VfsError> {
        let path = checked_path(path)?;
        let node = match self.nodes.get_mut(&path) {
            Some(node) if node.is_file() => node,
            _ => return Err(VfsError::not_found(&path)),
        };

        let found = if search.is_empty() {
            0
        } else {
            node.text().matches(search).count()
        };
        if let Some(expected) = expected_occurrences {
            if expected != found {
                return Err(VfsError::AmbiguousMatch {
                    path,
                    expected,
                    found,
                });
            }
        }
        if found > 0 {
            let updated = node.text().replace(search, replacement);
            node.content = Some(Arc::from(updated.as_str()));
        }
        Ok(found)
    }

    /// Inserts `text` as new line(s) after line `line` (0 inserts at the top).
    pub fn insert_at_line(&mut self, path: &str, line: usize, text: &str) -> Result<(), VfsError> {
        let path = checked_path(path)?;
        let node = match self.nodes.get_mut(&path) {
            Some(node) if node.is_file() => node,
            _ => return Err(VfsError::not_found(&path)),
        };

        let mut lines: Vec<&str> = if node.text().is_empty() {
            Vec::new()
        } else {
            node.text().split('\n').collect()
        };
        if line > lines.len() {
            return Err(VfsError::LineOutOfRange {
                path,
                line,
                line_count: lines.len(),
            });
        }
        lines.insert(line, text);
        let updated = lines.join("\n");
        node.content = Some(Arc::from(updated.as_str()));
        Ok(())
    }

    /// Immutable view for the build pipeline.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: Arc::new(self.nodes.clone()),
        }
    }

    fn ensure_parents(&mut self, path: &str) -> Result<(), VfsError> {
        let mut ancestors = Vec::new();
        let mut current = path::parent(path);
        while let Some(dir) = current {
            ancestors.push(dir.to_string());
            current = path::parent(dir);
        }

        for dir in ancestors.into_iter().rev() {
            match self.nodes.get(&dir) {
                Some(node) if node.is_directory() => {}
                Some(_) => {
                    return Err(VfsError::invalid(
                        path,
                        &format!("{} is a file, not a directory", dir),
                    ))
                }
                None => {
                    self.link(&dir);
                    self.nodes.insert(dir.clone(), FileNode::directory(dir));
                }
            }
        }
        Ok(())
    }

    fn link(&mut self, path: &str) {
        if let Some(parent) = path::parent(path) {
            if let Some(dir) = self.nodes.get_mut(parent) {
                dir.children.insert(path::file_name(path).to_string());
            }
        }
    }

    fn unlink(&mut self, path: &str) {
        if let Some(parent) = path::parent(path) {
            if let Some(dir) = self.nodes.get_mut(parent) {
                dir.children.remove(path::file_name(path));
            }
        }
    }

    fn remove_subtree(&mut self, path: &str) -> Result<(), VfsError> {
        if path == "/" {
            return Err(VfsError::invalid(path, "the root cannot be deleted"));
        }
        self.unlink(path);
        self.nodes.retain(|key, _| !path::is_within(key, path));
        Ok(())
    }
}

/// Immutable point-in-time view of every node in a store.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: Arc<BTreeMap<String, FileNode>>,
}

impl Snapshot {
    /// Builds a snapshot from `(path, content)` pairs, normalizing each path
    /// and creating directories implicitly.
    pub fn from_files<I, P, C>(files: I) -> Result<Self, VfsError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<str>,
    {
        let mut store = VirtualFileStore::new();
        for (path, content) in files {
            store.write_file(&normalize_path(path.as_ref()), content.as_ref())?;
        }
        Ok(store.snapshot())
    }

    pub fn get(&self, path: &str) -> Option<&FileNode> {
        self.nodes.get(path)
    }

    /// File content, or `None` for directories and missing paths.
    pub fn read(&self, path: &str) -> Option<&str> {
        self.nodes
            .get(path)
            .filter(|node| node.is_file())
            .map(|node| node.text())
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.nodes.get(path).is_some_and(|node| node.is_file())
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.nodes.get(path).is_some_and(|node| node.is_directory())
    }

    /// `(path, content)` for every file, in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes
            .values()
            .filter(|node| node.is_file())
            .map(|node| (node.path.as_str(), node.text()))
    }

    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    /// SHA-256 over every file path and body, independent of insertion order.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in self.files() {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(content.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
