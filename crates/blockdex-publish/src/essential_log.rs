//! Local recovery files for events that could not be delivered.

use std::path::{Path, PathBuf};

use blockdex_types::{MessageFamily, Result};

/// Directory of `{height}_{family}.log` files.
#[derive(Debug, Clone)]
pub struct EssentialLog {
    dir: PathBuf,
}

impl EssentialLog {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if missing. Called once at startup so a bad path
    /// fails early instead of during an outage.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    #[must_use]
    pub fn path_for(&self, height: i64, family: MessageFamily) -> PathBuf {
        self.dir.join(format!("{height}_{family}.log"))
    }

    /// Write `content` for `(height, family)`. Empty content writes nothing.
    ///
    /// Returns the file path when written. Failures are logged; there is no
    /// further fallback.
    pub async fn write(&self, height: i64, family: MessageFamily, content: &str) -> Option<PathBuf> {
        if content.is_empty() {
            tracing::debug!(height, family = %family, "Essential message empty; nothing to log");
            return None;
        }
        let path = self.path_for(height, family);
        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                tracing::warn!(height, family = %family, path = %path.display(), "Wrote essential log");
                Some(path)
            }
            Err(e) => {
                tracing::error!(
                    height,
                    family = %family,
                    path = %path.display(),
                    error = %e,
                    "Failed to write essential log"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = EssentialLog::new(dir.path().join("essential"));
        log.ensure_dir().unwrap();

        let path = log.write(42, MessageFamily::ExecutionResults, "height:42\n").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "42_ExecutionResults.log");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "height:42\n");
    }

    #[tokio::test]
    async fn empty_content_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = EssentialLog::new(dir.path());
        assert!(log.write(1, MessageFamily::Books, "").await.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unwritable_dir_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let log = EssentialLog::new(dir.path().join("missing"));
        assert!(log.write(1, MessageFamily::Books, "x").await.is_none());
    }
}
