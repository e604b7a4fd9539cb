//! Candidate image discovery.
//!
//! # Overview
//!
//! [`Walker`] lists the files under a root directory whose extension is one
//! of [`IMAGE_EXTENSIONS`] (case-insensitive). Only the top level is read
//! unless recursion is enabled. Entries are visited in file-name order so a
//! run over an unchanged tree always yields the same encounter order.
//!
//! Nothing is decoded here; a file with an image extension but bad content
//! is reported later by the hash engine.
//!
//! # Example
//!
//! ```no_run
//! use imgsieve::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default().with_recursive(true));
//! for path in walker.walk().filter_map(Result::ok) {
//!     println!("{}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

/// Extensions treated as images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// Whether `path` has an image extension.
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing an entry.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Traversal options.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories.
    pub skip_hidden: bool,
}

impl WalkerConfig {
    /// Set recursion.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set symlink following.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set hidden-entry skipping.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }
}

/// Image file enumerator.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a walker rooted at `root`.
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Stop yielding entries once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check the root before walking.
    ///
    /// # Errors
    ///
    /// [`ScanError::NotFound`] or [`ScanError::NotADirectory`].
    pub fn validate(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ScanError::NotFound(self.root.clone()))
            }
            Err(e) => Err(map_io_error(&self.root, e)),
        }
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Lazily yield image paths in traversal order.
    ///
    /// Unreadable entries are yielded as errors; the walk carries on past
    /// them.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let skip_hidden = self.config.skip_hidden;
        let follow_symlinks = self.config.follow_symlinks;

        WalkDir::new(&self.root)
            .follow_links(follow_symlinks)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry)))
            .take_while(move |_| !self.is_shutdown_requested())
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    // With follow_links set, walkdir reports the target's type.
                    let file_type = entry.file_type();
                    if file_type.is_symlink() && !follow_symlinks {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }
                    let path = entry.into_path();
                    (file_type.is_file() && is_image_path(&path)).then_some(Ok(path))
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    Some(Err(map_io_error(&path, source)))
                }
            })
    }

    /// Collect every image path, separating entry errors.
    ///
    /// # Errors
    ///
    /// Fails only if the root itself is invalid.
    pub fn collect(&self) -> Result<(Vec<PathBuf>, Vec<ScanError>), ScanError> {
        self.validate()?;
        let mut paths = Vec::new();
        let mut errors = Vec::new();
        for item in self.walk() {
            match item {
                Ok(path) => {
                    log::trace!("Candidate: {}", path.display());
                    paths.push(path);
                }
                Err(e) => errors.push(e),
            }
        }
        log::info!(
            "Found {} candidate image(s) under {}",
            paths.len(),
            self.root.display()
        );
        Ok((paths, errors))
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn map_io_error(path: &Path, error: std::io::Error) -> ScanError {
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
        std::io::ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_is_image_path_case_insensitive() {
        assert!(is_image_path(Path::new("a.jpg")));
        assert!(is_image_path(Path::new("a.JPEG")));
        assert!(is_image_path(Path::new("dir/b.Png")));
        assert!(is_image_path(Path::new("c.gif")));
        assert!(is_image_path(Path::new("d.bmp")));
        assert!(!is_image_path(Path::new("e.tiff")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("png")));
    }

    #[test]
    fn test_walk_top_level_only_by_default() {
        let dir = TempDir::new().unwrap();
        let b = touch(dir.path(), "b.png");
        let a = touch(dir.path(), "a.jpg");
        touch(dir.path(), "readme.txt");
        touch(dir.path(), "sub/c.png");

        let walker = Walker::new(dir.path(), WalkerConfig::default());
        let (paths, errors) = walker.collect().unwrap();
        assert_eq!(paths, vec![a, b]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_walk_recursive() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.png");
        let c = touch(dir.path(), "sub/c.png");
        let d = touch(dir.path(), "sub/deeper/d.gif");

        let walker = Walker::new(dir.path(), WalkerConfig::default().with_recursive(true));
        let (paths, _) = walker.collect().unwrap();
        assert_eq!(paths, vec![a, c, d]);
    }

    #[test]
    fn test_skip_hidden() {
        let dir = TempDir::new().unwrap();
        let visible = touch(dir.path(), "v.png");
        touch(dir.path(), ".hidden.png");
        touch(dir.path(), ".cache/x.png");

        let config = WalkerConfig::default()
            .with_recursive(true)
            .with_skip_hidden(true);
        let (paths, _) = Walker::new(dir.path(), config).collect().unwrap();
        assert_eq!(paths, vec![visible]);
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let walker = Walker::new(&dir.path().join("nope"), WalkerConfig::default());
        match walker.collect() {
            Err(ScanError::NotFound(p)) => assert!(p.ends_with("nope")),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_root_is_file() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "a.png");
        match Walker::new(&file, WalkerConfig::default()).collect() {
            Err(ScanError::NotADirectory(p)) => assert_eq!(p, file),
            other => panic!("Expected NotADirectory, got: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_unless_followed() {
        let dir = TempDir::new().unwrap();
        let real = touch(dir.path(), "b.png");
        let link = dir.path().join("a.png");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let (paths, errors) = Walker::new(dir.path(), WalkerConfig::default())
            .collect()
            .unwrap();
        assert_eq!(paths, vec![real.clone()]);
        assert!(errors.is_empty());

        let config = WalkerConfig::default().with_follow_symlinks(true);
        let (paths, _) = Walker::new(dir.path(), config).collect().unwrap();
        assert_eq!(paths, vec![link, real]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_entered_unless_followed() {
        let dir = TempDir::new().unwrap();
        let real = touch(dir.path(), "photos/a.png");
        std::os::unix::fs::symlink(dir.path().join("photos"), dir.path().join("mirror")).unwrap();

        let config = WalkerConfig::default().with_recursive(true);
        let (paths, _) = Walker::new(dir.path(), config.clone()).collect().unwrap();
        assert_eq!(paths, vec![real.clone()]);

        let (paths, _) = Walker::new(dir.path(), config.with_follow_symlinks(true))
            .collect()
            .unwrap();
        assert_eq!(paths, vec![dir.path().join("mirror/a.png"), real]);
    }

    #[test]
    fn test_shutdown_stops_walk() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.png");
        let flag = Arc::new(AtomicBool::new(true));
        let walker = Walker::new(dir.path(), WalkerConfig::default()).with_shutdown_flag(flag);
        assert_eq!(walker.walk().count(), 0);
    }
}
