use std::path::{Path, is_separator};

pub const ARCHIVE_URL: &str =
    "http://projetos.lbi.iq.usp.br/metazoo/deyvid/datasets/AllvogHMMprofiles.tar.gz";
pub const MODEL_BASE_URL: &str =
    "https://github.com/quadram-institute-bioscience/MARVEL/raw/master/models/";

pub const ARCHIVE_NAME: &str = "AllvogHMMprofiles.tar.gz";
pub const ARCHIVE_DIR: &str = "AllvogHMMprofiles";
pub const HMM_DATABASE: &str = "all_vogs_hmm_profiles_feb2018.hmm";
/// Written by `hmmpress` next to the flat file; its presence marks a finished database.
pub const INDEX_MARKER_SUFFIX: &str = ".h3m";
pub const HMMPRESS: &str = "hmmpress";

pub const MODEL_FILES: [&str; 3] = [
    "pickle_model_rfc_trained_bins8k_refseq_all_3features_den_stran_prophitshmm.pkl",
    "pickle_model_rfc_trained_bins_refseq_until2015_3features_den_stran_prophitshmm.pkl",
    "pickle_model_rfc_trained_bins_refseq_until2015_4features_wt_outliers_even2.pkl",
];

pub const DEFAULT_DEST_SUBDIR: &str = "models";
pub const DEFAULT_TMP_DIR: &str = "/tmp/";

pub const ENV_ARCHIVE_URL: &str = "MARVEL_ARCHIVE_URL";
pub const ENV_MODELS_URL: &str = "MARVEL_MODELS_URL";
pub const ENV_HMMPRESS: &str = "MARVEL_HMMPRESS";

/// Remote sources and the indexer program used by a setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    pub archive_url: String,
    pub model_base_url: String,
    pub hmmpress: String,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            archive_url: ARCHIVE_URL.to_string(),
            model_base_url: MODEL_BASE_URL.to_string(),
            hmmpress: HMMPRESS.to_string(),
        }
    }
}

impl SetupConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            archive_url: read(ENV_ARCHIVE_URL).unwrap_or(defaults.archive_url),
            model_base_url: read(ENV_MODELS_URL).unwrap_or(defaults.model_base_url),
            hmmpress: read(ENV_HMMPRESS).unwrap_or(defaults.hmmpress),
        }
    }

    pub fn model_url(&self, file: &str) -> String {
        if self.model_base_url.ends_with('/') {
            format!("{}{file}", self.model_base_url)
        } else {
            format!("{}/{file}", self.model_base_url)
        }
    }
}

/// Destination and scratch directories, both separator-terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPaths {
    pub dest_dir: String,
    pub tmp_dir: String,
}

impl SetupPaths {
    pub fn resolve(dest: Option<&str>, tmp: Option<&str>, cwd: &Path) -> Self {
        let dest_dir = match dest {
            Some(dir) => normalize_dir(dir),
            None => normalize_dir(&cwd.join(DEFAULT_DEST_SUBDIR).to_string_lossy()),
        };
        let tmp_dir = normalize_dir(tmp.unwrap_or(DEFAULT_TMP_DIR));
        Self { dest_dir, tmp_dir }
    }
}

pub fn normalize_dir(dir: &str) -> String {
    if dir.chars().last().is_some_and(is_separator) {
        dir.to_string()
    } else {
        format!("{dir}{}", std::path::MAIN_SEPARATOR)
    }
}
