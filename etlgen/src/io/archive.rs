//! Zip packaging of a project directory.
//!
//! The archive is written next to the directory as `<dir>.zip`. Only regular
//! files are added, with symlinks followed; entry names are paths relative to
//! the directory and must be valid UTF-8. Entries are
//! stored uncompressed with a fixed timestamp so re-archiving an unchanged
//! directory yields identical bytes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime, ZipArchive, ZipWriter};

/// Path of the archive produced for `dir`: the directory path plus `.zip`.
pub fn archive_path_for(dir: &Path) -> PathBuf {
    match dir.file_name() {
        Some(name) => {
            let mut file_name = name.to_os_string();
            file_name.push(".zip");
            dir.with_file_name(file_name)
        }
        None => {
            let mut raw = dir.as_os_str().to_os_string();
            raw.push(".zip");
            PathBuf::from(raw)
        }
    }
}

/// Zip every regular file under `dir` into `<dir>.zip`, replacing any existing archive.
///
/// Returns the archive path.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn build_archive(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("cannot archive {}: not a directory", dir.display());
    }
    let rel_paths = list_relative_files(dir)?;
    let zip_path = archive_path_for(dir);

    let zip_file = fs::File::create(&zip_path)
        .with_context(|| format!("create archive {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(zip_file);
    let fixed_time = ZipDateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .map_err(|_| anyhow::anyhow!("invalid fixed archive timestamp"))?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(fixed_time)
        .unix_permissions(0o644);

    for rel in &rel_paths {
        let entry_name = rel
            .to_str()
            .with_context(|| format!("archive entry {} is not valid UTF-8", rel.display()))?
            .to_string();
        let full_path = dir.join(rel);
        let mut source = fs::File::open(&full_path)
            .with_context(|| format!("open {} for archiving", full_path.display()))?;
        zip.start_file(entry_name.as_str(), options)
            .with_context(|| format!("add {entry_name} to archive"))?;
        io::copy(&mut source, &mut zip).with_context(|| format!("write {entry_name} to archive"))?;
    }

    zip.finish().context("finalize archive")?;
    debug!(entries = rel_paths.len(), archive = %zip_path.display(), "archive written");
    Ok(zip_path)
}

/// Entry names of an archive in the order they are stored.
pub fn list_entries(zip_path: &Path) -> Result<Vec<String>> {
    let file =
        fs::File::open(zip_path).with_context(|| format!("open archive {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("read archive {}", zip_path.display()))?;

    let mut names = Vec::with_capacity(archive.len());
    for idx in 0..archive.len() {
        let entry = archive
            .by_index_raw(idx)
            .with_context(|| format!("read entry {idx} of {}", zip_path.display()))?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

/// Relative paths of every regular file under `base_dir`, in file-name order per directory.
fn list_relative_files(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut rel_paths = Vec::new();
    for entry in WalkDir::new(base_dir).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", base_dir.display()))?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(base_dir)
                .with_context(|| {
                    format!(
                        "relative path of {} under {}",
                        entry.path().display(),
                        base_dir.display()
                    )
                })?
                .to_path_buf();
            rel_paths.push(rel);
        }
    }
    Ok(rel_paths)
}
