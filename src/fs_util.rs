use std::fs;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::SetupError;

pub fn extract_tar_gz(archive_path: &Path, target_dir: &Path) -> Result<(), SetupError> {
    let file = fs::File::open(archive_path).map_err(|err| {
        SetupError::Extraction(format!("open archive {}: {err}", archive_path.display()))
    })?;
    fs::create_dir_all(target_dir).map_err(|err| SetupError::Extraction(err.to_string()))?;

    let mut archive = Archive::new(GzDecoder::new(file));
    for entry in archive
        .entries()
        .map_err(|err| SetupError::Extraction(err.to_string()))?
    {
        let mut entry = entry.map_err(|err| SetupError::Extraction(err.to_string()))?;
        // unpack_in refuses entries escaping the target and reports them as false
        let unpacked = entry
            .unpack_in(target_dir)
            .map_err(|err| SetupError::Extraction(err.to_string()))?;
        if !unpacked {
            return Err(SetupError::Extraction(
                "archive entry path traversal detected".to_string(),
            ));
        }
    }
    Ok(())
}

/// Appends every regular file directly inside `source_dir` to `destination`, which is
/// truncated first. Files are taken in directory-listing order. Returns bytes written.
pub fn concatenate_dir(source_dir: &Path, destination: &Path) -> Result<u64, SetupError> {
    let entries = fs::read_dir(source_dir).map_err(|err| {
        SetupError::Filesystem(format!("read {}: {err}", source_dir.display()))
    })?;
    let mut output = fs::File::create(destination).map_err(|err| {
        SetupError::Filesystem(format!("create {}: {err}", destination.display()))
    })?;

    let mut total = 0u64;
    for entry in entries {
        let entry = entry.map_err(|err| SetupError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let mut fragment = fs::File::open(&path)
            .map_err(|err| SetupError::Filesystem(format!("open {}: {err}", path.display())))?;
        total += io::copy(&mut fragment, &mut output)
            .map_err(|err| SetupError::Filesystem(err.to_string()))?;
    }
    Ok(total)
}

/// Removes a file or directory tree. A path that is already gone is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
