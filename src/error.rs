use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    #[error("Unable to extract database: {0}")]
    Extraction(String),

    #[error("Error using hmmer tools (hmmpress). Verify if it is installed!\n{command}")]
    #[diagnostic(help("{reason}"))]
    IndexBuild { command: String, reason: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("external tool failed: {0}")]
    ToolFailed(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),
}
