use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{
    ARCHIVE_DIR, ARCHIVE_NAME, HMM_DATABASE, INDEX_MARKER_SUFFIX, MODEL_FILES, SetupPaths,
};
use crate::error::SetupError;

#[derive(Debug, Clone)]
pub struct ModelStore {
    dest_root: Utf8PathBuf,
    tmp_root: Utf8PathBuf,
}

impl ModelStore {
    pub fn new(paths: &SetupPaths) -> Self {
        Self::new_with_paths(
            Utf8PathBuf::from(paths.dest_dir.as_str()),
            Utf8PathBuf::from(paths.tmp_dir.as_str()),
        )
    }

    pub fn new_with_paths(dest_root: Utf8PathBuf, tmp_root: Utf8PathBuf) -> Self {
        Self {
            dest_root,
            tmp_root,
        }
    }

    pub fn dest_root(&self) -> &Utf8Path {
        &self.dest_root
    }

    pub fn tmp_root(&self) -> &Utf8Path {
        &self.tmp_root
    }

    pub fn hmm_database_path(&self) -> Utf8PathBuf {
        self.dest_root.join(HMM_DATABASE)
    }

    pub fn index_marker_path(&self) -> Utf8PathBuf {
        self.dest_root
            .join(format!("{HMM_DATABASE}{INDEX_MARKER_SUFFIX}"))
    }

    pub fn model_path(&self, file: &str) -> Utf8PathBuf {
        self.dest_root.join(file)
    }

    pub fn model_paths(&self) -> Vec<Utf8PathBuf> {
        MODEL_FILES.iter().map(|file| self.model_path(file)).collect()
    }

    pub fn archive_path(&self) -> Utf8PathBuf {
        self.tmp_root.join(ARCHIVE_NAME)
    }

    pub fn extracted_dir(&self) -> Utf8PathBuf {
        self.tmp_root.join(ARCHIVE_DIR)
    }

    /// True when the pressed database and the first model are both regular files.
    /// Contents are not inspected.
    pub fn is_present(&self) -> bool {
        self.index_marker_path().as_std_path().is_file()
            && self.model_path(MODEL_FILES[0]).as_std_path().is_file()
    }

    pub fn ensure_roots(&self) -> Result<(), SetupError> {
        for root in [&self.dest_root, &self.tmp_root] {
            fs::create_dir_all(root.as_std_path()).map_err(|err| {
                SetupError::Filesystem(format!("create directory {root}: {err}"))
            })?;
        }
        Ok(())
    }
}
