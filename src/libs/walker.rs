use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/**
 * One level of siblings during traversal. The cursor starts at 1 because
 * index 0 was already consumed when the walk descended into it.
 */
struct SiblingFrame {
    dirs: Vec<PathBuf>,
    cursor: usize,
}

impl SiblingFrame {
    fn new(dirs: Vec<PathBuf>) -> Self {
        SiblingFrame { dirs, cursor: 1 }
    }

    fn advance(&mut self) -> Option<PathBuf> {
        let next = self.dirs.get(self.cursor).cloned();
        if next.is_some() {
            self.cursor += 1;
        }
        next
    }
}

/**
 * Lazy pre-order walk of one directory tree, driven by an explicit frame
 * stack instead of recursion so depth is bounded and each directory can be
 * consumed before the next one is even listed.
 *
 * The starting directory is always emitted first. A directory that cannot
 * be listed (permission denied, deleted mid-scan) counts as having no
 * subdirectories; the walk backtracks and no error surfaces.
 */
pub struct DirectoryWalker {
    start: Option<PathBuf>,
    current: PathBuf,
    stack: Vec<SiblingFrame>,
    visited: HashSet<PathBuf>,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        DirectoryWalker {
            current: root.clone(),
            start: Some(root),
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Immediate subdirectories in a stable order. Anything whose canonical
    /// path was already visited is dropped, so a symlink cycle cannot make
    /// the walk run forever.
    fn subdirectories(&mut self, dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        dirs.retain(|path| match fs::canonicalize(path) {
            Ok(canonical) => self.visited.insert(canonical),
            Err(_) => true,
        });
        dirs
    }
}

impl Iterator for DirectoryWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if let Some(root) = self.start.take() {
            if let Ok(canonical) = fs::canonicalize(&root) {
                self.visited.insert(canonical);
            }
            return Some(root);
        }

        // Descend into the first subdirectory of the last emitted directory.
        let current = self.current.clone();
        let children = self.subdirectories(&current);
        if let Some(first) = children.first().cloned() {
            self.stack.push(SiblingFrame::new(children));
            self.current = first.clone();
            return Some(first);
        }

        // Backtrack: discard exhausted frames until a sibling remains.
        while let Some(frame) = self.stack.last_mut() {
            if let Some(sibling) = frame.advance() {
                self.current = sibling.clone();
                return Some(sibling);
            }
            self.stack.pop();
        }

        None
    }
}
