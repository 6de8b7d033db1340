use std::path::{Path, PathBuf};

pub const WORKFLOW_SNAPSHOT_FILE_NAME: &str = "workflow-state.json";
pub const SETTINGS_FILE_NAME: &str = "config.yaml";

/// Well-known file locations under the client state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPaths {
    pub root: PathBuf,
}

impl ClientPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workflow_snapshot_path(&self) -> PathBuf {
        self.root.join(WORKFLOW_SNAPSHOT_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    pub fn client_log_path(&self) -> PathBuf {
        self.root.join("logs/client.log")
    }
}
