use camino::Utf8PathBuf;

use crate::config::{MODEL_FILES, SetupConfig};
use crate::error::SetupError;
use crate::fs_util;
use crate::store::ModelStore;
use crate::tools::Toolbox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    AlreadyPresent,
    Installed(InstallReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub database_path: Utf8PathBuf,
    pub database_bytes: u64,
    pub model_paths: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct Setup<T: Toolbox> {
    store: ModelStore,
    config: SetupConfig,
    tools: T,
}

impl<T: Toolbox> Setup<T> {
    pub fn new(store: ModelStore, config: SetupConfig, tools: T) -> Self {
        Self {
            store,
            config,
            tools,
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Builds the database and downloads the models unless both markers already exist.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<SetupOutcome, SetupError> {
        if self.store.is_present() {
            tracing::info!(dest = %self.store.dest_root(), "database and models already present");
            return Ok(SetupOutcome::AlreadyPresent);
        }
        self.install(sink).map(SetupOutcome::Installed)
    }

    fn install(&self, sink: &dyn ProgressSink) -> Result<InstallReport, SetupError> {
        self.store.ensure_roots()?;
        let archive = self.store.archive_path();
        let extracted = self.store.extracted_dir();
        let database = self.store.hmm_database_path();

        sink.event(ProgressEvent::new("[1] Downloading flat file database..."));
        // Leftovers from an aborted run must not be extracted or merged again.
        for path in [&archive, &extracted] {
            fs_util::remove_path(path.as_std_path()).map_err(|err| {
                SetupError::Filesystem(format!("remove stale {path}: {err}"))
            })?;
        }
        // Failure here is tolerated; a missing or broken archive fails extraction instead.
        if let Err(err) = self
            .tools
            .download(&self.config.archive_url, archive.as_std_path())
        {
            tracing::warn!(url = %self.config.archive_url, error = %err, "archive download failed");
        }

        sink.event(ProgressEvent::new("[2] Extracting database file..."));
        self.tools
            .extract(archive.as_std_path(), self.store.tmp_root().as_std_path())
            .map_err(|err| match err {
                SetupError::Extraction(reason) => SetupError::Extraction(reason),
                other => SetupError::Extraction(other.to_string()),
            })?;

        let database_bytes =
            fs_util::concatenate_dir(extracted.as_std_path(), database.as_std_path())?;
        tracing::info!(path = %database, bytes = database_bytes, "flat database written");

        sink.event(ProgressEvent::new("[3] Downloading models"));
        let model_paths = self.store.model_paths();
        for (file, path) in MODEL_FILES.iter().zip(&model_paths) {
            sink.event(ProgressEvent::new(format!(" - {file}")));
            let url = self.config.model_url(file);
            if let Err(err) = self.tools.download(&url, path.as_std_path()) {
                tracing::warn!(%url, error = %err, "model download failed");
            }
        }

        sink.event(ProgressEvent::new("[4] Compressing hmm database..."));
        if let Err(err) = self.tools.press(database.as_std_path()) {
            return Err(SetupError::IndexBuild {
                command: self.tools.press_command(database.as_std_path()),
                reason: err.to_string(),
            });
        }

        for path in [&extracted, &archive] {
            if let Err(err) = fs_util::remove_path(path.as_std_path()) {
                tracing::warn!(%path, error = %err, "failed to remove scratch file");
            }
        }

        sink.event(ProgressEvent::new("Done."));
        Ok(InstallReport {
            database_path: database,
            database_bytes,
            model_paths,
        })
    }
}
