//! File system lookups used when expanding includes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File system operations the includer needs to perform.
///
/// These operations are extracted to a trait so that they can be mocked out in unit testing.
pub trait FileSystem {
    /// Read the entire contents of a file into a string.
    ///
    /// This is implemented by [std::fs::read_to_string].
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Return whether the path points at a regular file.
    ///
    /// This is implemented by [Path::is_file].
    fn is_file(&self, path: &Path) -> bool;
}

/// Implementation of the file system trait that uses the real file system.
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory file system for use in unit tests.
///
/// Files are added relative to a root directory before the test runs:
/// ```
/// # use texpack::fs::*;
/// # use std::path::Path;
/// let mut fs = InMemoryFileSystem::new("/project");
/// fs.add_file("chapters/one.tex", "content");
/// assert!(fs.is_file(Path::new("/project/chapters/one.tex")));
/// ```
#[derive(Default)]
pub struct InMemoryFileSystem {
    root: PathBuf,
    files: HashMap<PathBuf, String>,
}

impl InMemoryFileSystem {
    /// Create a new in-memory file system rooted at the provided directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            files: Default::default(),
        }
    }

    /// Add a file to the in-memory file system.
    ///
    /// The provided path is relative to the root directory.
    pub fn add_file(&mut self, relative_path: &str, content: &str) {
        self.files
            .insert(self.root.join(relative_path), content.to_string());
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        match self.files.get(path) {
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not found",
            )),
            Some(content) => Ok(content.clone()),
        }
    }
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
