use std::path::PathBuf;

/// Root of the dated output tree: `<root>/daily/...`, `<root>/latest/...`,
/// `<root>/archive/...`.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub root: PathBuf,
}

impl RecorderConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}
