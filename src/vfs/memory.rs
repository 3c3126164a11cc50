//! In-memory backend
//!
//! A complete [`FileSystem`] over an in-process tree. Directories are
//! created implicitly by writes, object-store style, and explicitly by
//! `mkdirs`. Used as the interchangeability proof for the backend seam and
//! as the hermetic test double.

use crate::vfs::{FileSystem, VfsError, VfsResult, WalkEntry, WalkErrorHandler};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Storage backend over an in-memory tree.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemState>,
}

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The root is the empty path; all other paths are relative to it.
fn norm(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = path;
    while let Some((parent, _)) = current.rsplit_once('/') {
        out.push(parent.to_string());
        current = parent;
    }
    out
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

fn name_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((_, name)) => name,
        None => path,
    }
}

impl MemState {
    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    fn exists(&self, path: &str) -> bool {
        path.is_empty() || self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn children(&self, dir: &str) -> (Vec<String>, Vec<String>) {
        let subdirs: Vec<String> = self
            .dirs
            .iter()
            .filter(|d| parent_of(d) == dir && !d.is_empty())
            .map(|d| name_of(d).to_string())
            .collect();
        let files: Vec<String> = self
            .files
            .keys()
            .filter(|f| parent_of(f) == dir)
            .map(|f| name_of(f).to_string())
            .collect();
        // BTree iteration keeps both lists sorted
        (subdirs, files)
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = format!("{dir}/");
        self.files.keys().any(|f| f.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        let path = norm(path);
        self.lock()
            .files
            .get(&path)
            .cloned()
            .ok_or(VfsError::NotFound(path))
    }

    async fn write(&self, path: &str, data: &[u8]) -> VfsResult<()> {
        let path = norm(path);
        if path.is_empty() {
            return Err(VfsError::InvalidPath(path));
        }
        let mut state = self.lock();
        if state.dirs.contains(&path) {
            return Err(VfsError::AlreadyExists(path));
        }
        for ancestor in ancestors(&path) {
            if !ancestor.is_empty() {
                state.dirs.insert(ancestor);
            }
        }
        state.files.insert(path, data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> VfsResult<bool> {
        Ok(self.lock().exists(&norm(path)))
    }

    async fn is_dir(&self, path: &str) -> VfsResult<bool> {
        Ok(self.lock().is_dir(&norm(path)))
    }

    async fn mkdirs(&self, path: &str, exist_ok: bool) -> VfsResult<()> {
        let path = norm(path);
        let mut state = self.lock();
        if state.files.contains_key(&path) {
            return Err(VfsError::AlreadyExists(path));
        }
        if !exist_ok && state.exists(&path) {
            return Err(VfsError::AlreadyExists(path));
        }
        if !path.is_empty() {
            for ancestor in ancestors(&path) {
                if !ancestor.is_empty() {
                    state.dirs.insert(ancestor);
                }
            }
            state.dirs.insert(path);
        }
        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> VfsResult<()> {
        let path = norm(path);
        let mut state = self.lock();
        if state.files.remove(&path).is_some() {
            return Ok(());
        }
        if !state.is_dir(&path) {
            return Err(VfsError::NotFound(path));
        }
        if state.has_children(&path) && !recursive {
            return Err(VfsError::DirectoryNotEmpty(path));
        }
        if path.is_empty() {
            state.files.clear();
            state.dirs.clear();
        } else {
            let prefix = format!("{path}/");
            state.files.retain(|f, _| !f.starts_with(&prefix));
            state.dirs.retain(|d| d != &path && !d.starts_with(&prefix));
        }
        Ok(())
    }

    async fn walk(&self, root: &str, on_error: WalkErrorHandler<'_>) -> Vec<WalkEntry> {
        let root = norm(root);
        let state = self.lock();
        if !state.is_dir(&root) {
            if state.files.contains_key(&root) {
                on_error(&VfsError::NotADirectory(root));
            } else {
                on_error(&VfsError::NotFound(root));
            }
            return Vec::new();
        }

        let mut entries = Vec::new();
        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            let (subdirs, files) = state.children(&dir);
            for subdir in subdirs.iter().rev() {
                stack.push(if dir.is_empty() {
                    subdir.clone()
                } else {
                    format!("{dir}/{subdir}")
                });
            }
            entries.push(WalkEntry {
                dir,
                subdirs,
                files,
            });
        }
        entries
    }
}
