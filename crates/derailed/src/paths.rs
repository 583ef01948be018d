//! Location of the CLI's on-disk state.

use crate::error::AppError;
use std::path::{Path, PathBuf};

/// Directory created under the platform data directory.
const APP_DIR_NAME: &str = "derailed";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Paths of the data directory and the files inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Uses `root` as the data directory as-is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the data directory from `--data-dir` or the platform default
    /// (`$XDG_DATA_HOME/derailed`, `~/Library/Application Support/derailed`,
    /// `%APPDATA%\derailed`).
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self, AppError> {
        match override_dir {
            Some(dir) => Ok(Self::new(dir)),
            None => dirs_next::data_dir()
                .map(|base| Self::new(base.join(APP_DIR_NAME)))
                .ok_or(AppError::NoDataDir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Creates the data directory and any missing parents.
    pub async fn create(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn is_set_up(&self) -> bool {
        self.root.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        let paths = DataPaths::resolve(Some(PathBuf::from("/tmp/derailed-test"))).unwrap();
        assert_eq!(paths.root(), Path::new("/tmp/derailed-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/derailed-test/config.toml"));
    }

    #[tokio::test]
    async fn create_makes_nested_directories() {
        let temp = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(temp.path().join("a").join("b"));
        assert!(!paths.is_set_up());

        paths.create().await.unwrap();
        assert!(paths.is_set_up());
    }
}
