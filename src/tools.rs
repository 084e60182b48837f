use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::SetupError;
use crate::fs_util;

/// External collaborators of a setup run: fetching a URL, unpacking the
/// profile archive, and pressing the flat HMM file into its binary index.
pub trait Toolbox {
    fn download(&self, url: &str, destination: &Path) -> Result<(), SetupError>;
    fn extract(&self, archive: &Path, target_dir: &Path) -> Result<(), SetupError>;
    fn press(&self, hmm_path: &Path) -> Result<(), SetupError>;
    /// Command line reported when `press` fails.
    fn press_command(&self, hmm_path: &Path) -> String;
}

pub struct SystemToolbox {
    client: Client,
    hmmpress: String,
}

impl SystemToolbox {
    pub fn new(hmmpress: impl Into<String>) -> Result<Self, SetupError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("marvel-models/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SetupError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30 * 60))
            .build()
            .map_err(|err| SetupError::Http(err.to_string()))?;
        Ok(Self {
            client,
            hmmpress: hmmpress.into(),
        })
    }

    fn write_response_to_file(
        &self,
        url: &str,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), SetupError> {
        if !response.status().is_success() {
            return Err(SetupError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let mut file = File::create(destination).map_err(|err| {
            SetupError::Filesystem(format!("create {}: {err}", destination.display()))
        })?;
        let bytes = std::io::copy(&mut response, &mut file).map_err(|err| SetupError::Download {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        tracing::debug!(url, bytes, path = %destination.display(), "download complete");
        Ok(())
    }

    fn resolve_hmmpress(&self) -> Result<PathBuf, SetupError> {
        let configured = PathBuf::from(&self.hmmpress);
        if configured.components().count() > 1 {
            return Ok(configured);
        }
        std::env::var_os("PATH")
            .and_then(|path_var| find_in_path(&self.hmmpress, &path_var))
            .ok_or_else(|| SetupError::MissingTool(self.hmmpress.clone()))
    }
}

impl Toolbox for SystemToolbox {
    fn download(&self, url: &str, destination: &Path) -> Result<(), SetupError> {
        tracing::debug!(url, path = %destination.display(), "downloading");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SetupError::Download {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        self.write_response_to_file(url, response, destination)
    }

    fn extract(&self, archive: &Path, target_dir: &Path) -> Result<(), SetupError> {
        fs_util::extract_tar_gz(archive, target_dir)
    }

    fn press(&self, hmm_path: &Path) -> Result<(), SetupError> {
        let program = self.resolve_hmmpress()?;
        let output = Command::new(&program)
            .arg(hmm_path)
            .output()
            .map_err(|err| SetupError::MissingTool(format!("{}: {err}", program.display())))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", program.display(), output.status)
        } else {
            stderr
        };
        Err(SetupError::ToolFailed(message))
    }

    fn press_command(&self, hmm_path: &Path) -> String {
        hmmpress_command_line(&self.hmmpress, hmm_path)
    }
}

pub fn hmmpress_command_line(program: &str, hmm_path: &Path) -> String {
    format!("{program} \"{}\"", hmm_path.display())
}

fn find_in_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    for path in std::env::split_paths(path_var) {
        #[cfg(windows)]
        {
            let exe = path.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}
