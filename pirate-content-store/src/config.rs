use std::path::PathBuf;

/// Configuration for a [`crate::FsContentStore`].
#[derive(Debug, Clone)]
pub struct ContentStoreConfig {
    /// Root directory content is sharded under (`<root>/<aa>/<bb>/<hash>.json`).
    pub root: PathBuf,
}

impl ContentStoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}
