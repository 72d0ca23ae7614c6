use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use coreshader::ImportedFile;

/// Reads a file from disk the way a picker would hand it over.
pub fn read_imported_file(path: &Path) -> Result<ImportedFile> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ImportedFile::new(name, bytes))
}

/// Reads every path, logging and skipping the ones that cannot be read.
pub fn read_imported_files<'a, I>(paths: I) -> Vec<ImportedFile>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .filter_map(|path| match read_imported_file(path) {
            Ok(file) => Some(file),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable file");
                None
            }
        })
        .collect()
}
